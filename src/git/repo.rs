use super::process::run_with_timeout;
use crate::error::{PulseError, Result};
use crate::model::DateRange;
use crate::parse::PRETTY_FORMAT;
use crate::util::spinner;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use gix::{discover, Repository};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, SystemTime};

/// Annotated tags are peeled so the date and subject are the tagged commit's.
pub const TAG_FORMAT: &str = "%(refname:short)|%(if)%(*objectname)%(then)%(*authordate:short)|%(*subject)%(else)%(authordate:short)|%(subject)%(end)";

/// What to ask `git log` for.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub numstat: bool,
    pub max_count: Option<usize>,
    pub range: DateRange,
}

pub struct GitRepo {
    repo: Repository,
    path: PathBuf,
    binary: String,
    timeout: Duration,
}

impl GitRepo {
    /// Open a repository at `path`, or current dir if `None`
    pub fn open<P: AsRef<Path>>(path: Option<P>, timeout: Duration) -> Result<Self> {
        let repo_path = match path {
            Some(p) => p.as_ref().to_path_buf(),
            None => std::env::current_dir()?,
        };
        if !repo_path.is_dir() {
            return Err(PulseError::RepoNotFound(repo_path));
        }

        let repo = discover(&repo_path)?;
        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();
        tracing::debug!(path = %path.display(), "opened repository");

        Ok(Self {
            repo,
            path,
            binary: "git".to_string(),
            timeout,
        })
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// False for a freshly initialised repository whose HEAD is unborn.
    pub fn has_commits(&self) -> Result<bool> {
        let head = self
            .repo
            .head()
            .map_err(|e| PulseError::GitCommand(format!("cannot read HEAD: {e}")))?;
        Ok(!head.is_unborn())
    }

    pub fn resolve_range(&self, since: Option<&str>, until: Option<&str>) -> Result<DateRange> {
        let mut range = DateRange::new();

        let since_dt = since.map(|s| self.parse_commit_or_date(s)).transpose()?;
        let until_dt = until.map(|u| self.parse_commit_or_date(u)).transpose()?;

        if let (Some(s), Some(u)) = (since_dt, until_dt) {
            if s > u {
                return Err(PulseError::InvalidDate(format!(
                    "Invalid range: since ({s}) is after until ({u})"
                )));
            }
        }

        if let Some(s) = since_dt {
            range = range.with_since(s);
        }
        if let Some(u) = until_dt {
            range = range.with_until(u);
        }

        Ok(range)
    }

    fn parse_commit_or_date(&self, input: &str) -> Result<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(dt.with_timezone(&Utc));
        }

        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            if let Some(datetime) = date.and_hms_opt(0, 0, 0) {
                return Ok(Utc.from_utc_datetime(&datetime));
            }
        }

        // "90d", "2 weeks ago", "6months"
        if let Some(duration) = parse_relative(input) {
            let target = SystemTime::now()
                .checked_sub(duration)
                .ok_or_else(|| PulseError::InvalidDate(format!("Duration overflow for '{input}'")))?;
            return Ok(DateTime::<Utc>::from(target));
        }

        let id = self
            .repo
            .rev_parse_single(input)
            .map_err(|e| PulseError::InvalidDate(format!("Invalid commit or date '{input}': {e}")))?;
        let commit = id
            .object()
            .map_err(|e| PulseError::Parse(e.to_string()))?
            .try_into_commit()
            .map_err(|_| PulseError::Parse(format!("Not a commit: {input}")))?;
        let secs = commit
            .time()
            .map_err(|e| PulseError::Parse(e.to_string()))?
            .seconds;

        DateTime::<Utc>::from_timestamp(secs, 0)
            .ok_or_else(|| PulseError::InvalidDate(format!("Invalid timestamp: {secs}")))
    }

    /// Run `git -C <repo> --no-pager <args>` under the configured timeout.
    pub fn run_git(&self, args: &[String]) -> Result<String> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-C").arg(&self.path).arg("--no-pager").args(args);
        let what = format!("git {}", args.first().map(String::as_str).unwrap_or(""));
        tracing::debug!(?args, "running git");
        run_with_timeout(cmd, self.timeout, what.trim())
    }

    /// Raw log text in the `%H|%an|%ad|%s` shape the parser expects.
    pub fn commit_log(&self, opts: &LogOptions) -> Result<String> {
        let mut args = vec![
            "log".to_string(),
            format!("--pretty=format:{PRETTY_FORMAT}"),
            "--date=short".to_string(),
        ];
        if opts.numstat {
            args.push("--numstat".to_string());
        }
        if let Some(n) = opts.max_count {
            args.push(format!("--max-count={n}"));
        }
        args.extend(opts.range.git_args());

        let pb = spinner(if opts.numstat {
            "Reading commit log with file stats..."
        } else {
            "Reading commit log..."
        });
        let out = self.run_git(&args);
        pb.finish_and_clear();
        out
    }

    pub fn commit_count(&self, range: &DateRange) -> Result<usize> {
        let mut args = vec!["rev-list".to_string(), "--count".to_string()];
        args.extend(range.git_args());
        args.push("HEAD".to_string());

        let out = self.run_git(&args)?;
        out.trim()
            .parse()
            .map_err(|_| PulseError::GitCommand(format!("unexpected rev-list output '{}'", out.trim())))
    }

    pub fn first_commit_date(&self, range: &DateRange) -> Result<Option<NaiveDate>> {
        let mut args = vec![
            "log".to_string(),
            "--reverse".to_string(),
            "--format=%ad".to_string(),
            "--date=short".to_string(),
        ];
        args.extend(range.git_args());
        let out = self.run_git(&args)?;
        Ok(out.lines().next().and_then(parse_short_date))
    }

    pub fn last_commit_date(&self, range: &DateRange) -> Result<Option<NaiveDate>> {
        let mut args = vec![
            "log".to_string(),
            "-1".to_string(),
            "--format=%ad".to_string(),
            "--date=short".to_string(),
        ];
        args.extend(range.git_args());
        let out = self.run_git(&args)?;
        Ok(out.lines().next().and_then(parse_short_date))
    }

    /// Tags oldest first, one `name|date|subject` line each.
    pub fn tag_lines(&self) -> Result<Vec<String>> {
        let args = vec![
            "for-each-ref".to_string(),
            "--sort=creatordate".to_string(),
            format!("--format={TAG_FORMAT}"),
            "refs/tags".to_string(),
        ];
        let out = self.run_git(&args)?;
        Ok(out
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect())
    }
}

fn parse_short_date(line: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(line.trim(), "%Y-%m-%d").ok()
}

fn parse_relative(input: &str) -> Option<Duration> {
    let input = input.trim().to_lowercase();
    let trimmed = input.strip_suffix("ago").unwrap_or(&input);
    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() || !compact.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    humantime::parse_duration(&compact).ok()
}
