use crate::context::RunContext;
use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "gitpulse")]
#[command(about = "Commit history, contributor, release and bug-fix statistics for a git project")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Debug, Default)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Path to git repository (defaults to config, then current dir)")]
    pub repo: Option<PathBuf>,

    #[arg(long, global = true, help = "Path to a gitpulse.toml config file")]
    pub config: Option<PathBuf>,

    #[arg(long, short, global = true, help = "Directory receiving data/, figures/ and reports/")]
    pub output: Option<PathBuf>,

    #[arg(long, global = true, help = "Start from this commit or date (RFC3339, YYYY-MM-DD, or e.g. '90d')")]
    pub since: Option<String>,

    #[arg(long, global = true, help = "End at this commit or date (RFC3339, YYYY-MM-DD, or e.g. '2 weeks ago')")]
    pub until: Option<String>,

    #[arg(long, global = true, value_parser = humantime::parse_duration, help = "Kill git commands running longer than this (e.g. 90s, 5m)")]
    pub git_timeout: Option<Duration>,

    #[arg(short, long, global = true, action = ArgAction::Count, help = "More log output (-v info, -vv debug)")]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Total commits, first and last commit date, time span
    Summary {
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// Commits per year, month, year-month and weekday
    Frequency {
        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,
    },
    /// Per-author activity, tiers and contribution concentration
    Contributors {
        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,

        #[arg(long, default_value_t = 20, help = "Authors shown in the terminal table")]
        top: usize,
    },
    /// Commit-type classification with file and change-size statistics
    Types {
        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,

        #[arg(long, help = "Analyse at most this many recent commits (config default: 500, 0 for all)")]
        max_count: Option<usize>,
    },
    /// Tag history, version kinds and release intervals
    Releases {
        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,
    },
    /// Closed bug issues from the issue tracker and their fix duration
    Bugs {
        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,

        #[arg(long, help = "Repository owner on the issue tracker")]
        owner: Option<String>,

        #[arg(long, help = "Repository name on the issue tracker")]
        name: Option<String>,

        #[arg(long, help = "Fetch at most this many result pages")]
        max_pages: Option<u32>,
    },
    /// Run every analysis, continuing past failures
    All {
        #[arg(long, help = "Skip the issue tracker analysis")]
        skip_bugs: bool,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        let ctx = RunContext::from_common(&self.common)?;

        match self.command {
            Commands::Summary { json } => crate::summary::exec(&ctx, json),
            Commands::Frequency { json, ndjson } => crate::frequency::exec(&ctx, json, ndjson),
            Commands::Contributors { json, ndjson, top } => {
                crate::contributors::exec(&ctx, json, ndjson, top)
            }
            Commands::Types { json, ndjson, max_count } => {
                crate::commit_types::exec(&ctx, json, ndjson, max_count)
            }
            Commands::Releases { json, ndjson } => crate::releases::exec(&ctx, json, ndjson),
            Commands::Bugs { json, ndjson, owner, name, max_pages } => {
                let target = crate::bugs::BugTarget { owner, name, max_pages };
                crate::bugs::exec(&ctx, json, ndjson, target)
            }
            Commands::All { skip_bugs } => run_all(&ctx, skip_bugs),
        }
    }
}

type Analysis<'a> = (&'static str, Box<dyn Fn() -> Result<()> + 'a>);

fn run_all(ctx: &RunContext, skip_bugs: bool) -> Result<()> {
    let mut analyses: Vec<Analysis> = Vec::new();
    analyses.push(("summary", Box::new(|| crate::summary::exec(ctx, false))));
    analyses.push(("frequency", Box::new(|| crate::frequency::exec(ctx, false, false))));
    analyses.push(("contributors", Box::new(|| crate::contributors::exec(ctx, false, false, 20))));
    analyses.push(("types", Box::new(|| crate::commit_types::exec(ctx, false, false, None))));
    analyses.push(("releases", Box::new(|| crate::releases::exec(ctx, false, false))));
    if !skip_bugs {
        let bugs = || crate::bugs::exec(ctx, false, false, crate::bugs::BugTarget::default());
        analyses.push(("bugs", Box::new(bugs)));
    }

    let mut failed = Vec::new();
    for (name, run) in &analyses {
        println!("\n{}", style(format!("== {name} ==")).cyan().bold());
        if let Err(e) = run() {
            tracing::error!(analysis = %name, "{e:#}");
            eprintln!("{} {name}: {e:#}", style("error:").red().bold());
            failed.push(*name);
        }
    }

    println!();
    if failed.is_empty() {
        println!(
            "{} results in {}",
            style("All analyses finished,").green(),
            ctx.dirs.root.display()
        );
        Ok(())
    } else {
        anyhow::bail!("{} of {} analyses failed: {}", failed.len(), analyses.len(), failed.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn common_flags_are_accepted_after_subcommand() {
        let cli = Cli::try_parse_from([
            "gitpulse", "types", "--max-count", "50", "--repo", "../flask", "--git-timeout", "90s", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.common.repo, Some(PathBuf::from("../flask")));
        assert_eq!(cli.common.git_timeout, Some(Duration::from_secs(90)));
        assert_eq!(cli.common.verbose, 2);
        assert!(matches!(cli.command, Commands::Types { max_count: Some(50), .. }));
    }
}
