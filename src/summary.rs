use crate::context::RunContext;
use crate::report::MarkdownDoc;
use anyhow::Context;
use chrono::{DateTime, Local, NaiveDate, Utc};
use console::style;
use serde::Serialize;

pub const REPORT_FILE: &str = "basic_commit_stats_report.md";

#[derive(Debug, Clone, Serialize)]
pub struct BasicStats {
    pub repository_path: String,
    pub generated_at: DateTime<Utc>,
    pub total_commits: usize,
    pub first_commit: Option<NaiveDate>,
    pub last_commit: Option<NaiveDate>,
    pub span_days: Option<i64>,
    pub span_years: Option<f64>,
}

impl BasicStats {
    pub fn new(
        repository_path: String,
        total_commits: usize,
        first_commit: Option<NaiveDate>,
        last_commit: Option<NaiveDate>,
    ) -> Self {
        let span_days = match (first_commit, last_commit) {
            (Some(first), Some(last)) => Some((last - first).num_days()),
            _ => None,
        };
        Self {
            repository_path,
            generated_at: Utc::now(),
            total_commits,
            first_commit,
            last_commit,
            span_days,
            span_years: span_days.map(|d| d as f64 / 365.25),
        }
    }
}

pub fn exec(ctx: &RunContext, json: bool) -> anyhow::Result<()> {
    let git = ctx.git()?;
    let total = if git.repo.has_commits()? {
        git.repo.commit_count(&git.range).context("Failed to count commits")?
    } else {
        0
    };
    if total == 0 {
        println!("No commits in the selected range.");
        return Ok(());
    }
    let first = git.repo.first_commit_date(&git.range).context("Failed to read first commit date")?;
    let last = git.repo.last_commit_date(&git.range).context("Failed to read last commit date")?;

    let stats = BasicStats::new(git.repo.path().display().to_string(), total, first, last);

    ctx.dirs.ensure().context("Failed to create output directories")?;
    let report = ctx.dirs.report_file(REPORT_FILE);
    render_report(&stats)
        .write_to(&report)
        .context("Failed to write summary report")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        output_table(&stats);
        println!("\nReport: {}", report.display());
    }
    Ok(())
}

fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "unknown".to_string())
}

pub fn render_report(stats: &BasicStats) -> MarkdownDoc {
    let mut doc = MarkdownDoc::new("Basic commit statistics")
        .heading("Statistics")
        .field(
            "Generated",
            stats.generated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
        )
        .field("Repository", &stats.repository_path)
        .field("Total commits", stats.total_commits)
        .field("First commit", fmt_date(stats.first_commit))
        .field("Last commit", fmt_date(stats.last_commit));

    doc = match (stats.span_days, stats.span_years) {
        (Some(days), Some(years)) => {
            doc.field("Time span", format!("{days} days (about {years:.1} years)"))
        }
        _ => doc.field("Time span", "cannot be computed"),
    };
    doc.gap()
}

fn output_table(stats: &BasicStats) {
    println!("{}", style("Repository summary").bold());
    println!("{}", "─".repeat(40));
    println!("{:<16} {}", "Repository", stats.repository_path);
    println!("{:<16} {}", "Total commits", style(stats.total_commits).green());
    println!("{:<16} {}", "First commit", fmt_date(stats.first_commit));
    println!("{:<16} {}", "Last commit", fmt_date(stats.last_commit));
    if let (Some(days), Some(years)) = (stats.span_days, stats.span_years) {
        println!("{:<16} {days} days ({years:.1} years)", "Time span");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_is_computed_from_dates() {
        let stats = BasicStats::new(
            "flask".into(),
            5000,
            NaiveDate::from_ymd_opt(2010, 4, 6),
            NaiveDate::from_ymd_opt(2024, 4, 6),
        );
        assert_eq!(stats.span_days, Some(5114));
        assert!((stats.span_years.unwrap() - 14.0).abs() < 0.01);
    }

    #[test]
    fn report_falls_back_without_dates() {
        let stats = BasicStats::new("flask".into(), 1, None, None);
        let doc = render_report(&stats);
        assert!(doc.as_str().contains("- **First commit**: unknown"));
        assert!(doc.as_str().contains("cannot be computed"));
    }
}
