use crate::classify::Classifier;
use crate::cli::CommonArgs;
use crate::config::Config;
use crate::git::{GitRepo, LogOptions};
use crate::model::{CommitRecord, DateRange};
use crate::parse::parse_log;
use crate::report::OutputDirs;
use anyhow::Context;
use std::path::PathBuf;
use std::time::Duration;

const MAX_LOGGED_WARNINGS: usize = 20;

/// Settings shared by every analysis of one invocation: the loaded config
/// with command-line overrides applied.
pub struct RunContext {
    pub config: Config,
    pub repo_path: Option<PathBuf>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub git_timeout: Duration,
    pub dirs: OutputDirs,
    pub classifier: Classifier,
}

/// An opened repository together with the resolved commit window.
pub struct GitSource {
    pub repo: GitRepo,
    pub range: DateRange,
}

impl RunContext {
    pub fn from_common(common: &CommonArgs) -> anyhow::Result<Self> {
        let config = Config::load(common.config.as_deref()).context("Failed to load configuration")?;

        let git_timeout = match common.git_timeout {
            Some(t) => t,
            None => config.git.timeout()?,
        };
        let repo_path = common.repo.clone().or_else(|| config.repository.path.clone());
        let output = common.output.clone().unwrap_or_else(|| config.output.dir.clone());
        let classifier = Classifier::with_priority(&config.classifier.priority)
            .context("Invalid classifier priority")?;

        tracing::debug!(
            repo = ?repo_path,
            output = %output.display(),
            ?git_timeout,
            order = ?classifier.order(),
            "run context ready"
        );

        Ok(Self {
            repo_path,
            since: common.since.clone(),
            until: common.until.clone(),
            git_timeout,
            dirs: OutputDirs::new(output),
            classifier,
            config,
        })
    }

    pub fn git(&self) -> anyhow::Result<GitSource> {
        let repo = GitRepo::open(self.repo_path.as_ref(), self.git_timeout)
            .context("Failed to open git repository")?
            .with_binary(self.config.git.binary.clone());
        let range = repo
            .resolve_range(self.since.as_deref(), self.until.as_deref())
            .context("Failed to resolve date range")?;
        Ok(GitSource { repo, range })
    }

    pub fn repository_name(&self) -> String {
        format!("{}/{}", self.config.repository.owner, self.config.repository.name)
    }
}

impl GitSource {
    /// Extract, parse and classify the commit log.
    pub fn fetch_commits(
        &self,
        classifier: &Classifier,
        numstat: bool,
        max_count: Option<usize>,
    ) -> anyhow::Result<Vec<CommitRecord>> {
        if !self.repo.has_commits()? {
            tracing::info!("repository has no commits yet");
            return Ok(Vec::new());
        }
        let opts = LogOptions {
            numstat,
            max_count,
            range: self.range.clone(),
        };
        let raw = self.repo.commit_log(&opts).context("Failed to read git log")?;

        let mut parsed = parse_log(&raw);
        for warning in parsed.warnings.iter().take(MAX_LOGGED_WARNINGS) {
            tracing::warn!("{warning}");
        }
        if parsed.warnings.len() > MAX_LOGGED_WARNINGS {
            tracing::warn!(
                "{} more log lines were skipped or defaulted",
                parsed.warnings.len() - MAX_LOGGED_WARNINGS
            );
        }

        classifier.apply(&mut parsed.commits);
        tracing::info!(commits = parsed.commits.len(), numstat, "parsed commit log");
        Ok(parsed.commits)
    }
}
