use crate::context::RunContext;
use crate::issues::{bug_records, IssueClient, IssueQuery};
use crate::model::BugRecord;
use crate::report::chart::{histogram, DEFAULT_WIDTH};
use crate::report::csv::write_rows;
use crate::report::{write_text, MarkdownDoc};
use crate::util::{mean, median, shorten_name};
use anyhow::Context;
use chrono::Local;
use console::style;
use serde::Serialize;

pub const REPORT_FILE: &str = "bug_analysis_report.md";
pub const HISTOGRAM_BINS: usize = 20;

/// Which tracker repository to query; unset fields fall back to config.
#[derive(Debug, Clone, Default)]
pub struct BugTarget {
    pub owner: Option<String>,
    pub name: Option<String>,
    pub max_pages: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationStats {
    pub count: usize,
    pub mean_hours: f64,
    pub median_hours: f64,
    pub min_hours: f64,
    pub max_hours: f64,
}

pub fn duration_stats(bugs: &[BugRecord]) -> Option<DurationStats> {
    let hours: Vec<f64> = bugs.iter().map(|b| b.duration_hours).collect();
    Some(DurationStats {
        count: hours.len(),
        mean_hours: mean(&hours)?,
        median_hours: median(&hours)?,
        min_hours: hours.iter().copied().fold(f64::INFINITY, f64::min),
        max_hours: hours.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}

#[derive(Serialize)]
struct BugOutput<'a> {
    repository: String,
    stats: &'a DurationStats,
    bugs: &'a [BugRecord],
}

pub fn exec(ctx: &RunContext, json: bool, ndjson: bool, target: BugTarget) -> anyhow::Result<()> {
    let issues_cfg = &ctx.config.issues;
    let owner = target.owner.unwrap_or_else(|| ctx.config.repository.owner.clone());
    let name = target.name.unwrap_or_else(|| ctx.config.repository.name.clone());

    let mut query = IssueQuery::from_config(issues_cfg, &owner, &name);
    if let Some(pages) = target.max_pages {
        query.max_pages = pages.max(1);
    }

    let client = IssueClient::new(issues_cfg).context("Failed to build issue tracker client")?;
    let issues = client
        .fetch_issues(&query)
        .with_context(|| format!("Failed to fetch issues for {owner}/{name}"))?;
    let bugs = bug_records(&issues);
    tracing::info!(fetched = issues.len(), bugs = bugs.len(), "issues classified");

    let Some(stats) = duration_stats(&bugs) else {
        println!("No closed bug issues found.");
        return Ok(());
    };

    let repository = format!("{owner}/{name}");
    write_outputs(ctx, &repository, &bugs, &stats).context("Failed to write bug results")?;

    if json {
        let out = BugOutput { repository, stats: &stats, bugs: &bugs };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if ndjson {
        for b in &bugs {
            println!("{}", serde_json::to_string(b)?);
        }
    } else {
        output_table(&repository, &bugs, &stats);
    }
    Ok(())
}

fn write_outputs(ctx: &RunContext, repository: &str, bugs: &[BugRecord], stats: &DurationStats) -> anyhow::Result<()> {
    let dirs = &ctx.dirs;
    dirs.ensure()?;

    write_rows(&dirs.data_file("bugs.csv"), bugs)?;

    let hours: Vec<f64> = bugs.iter().map(|b| b.duration_hours).collect();
    let chart = histogram("Bug fix duration", &hours, HISTOGRAM_BINS, "h", DEFAULT_WIDTH);
    write_text(&dirs.figure_file("bug_fix_duration.txt"), &chart)?;

    render_report(repository, bugs, stats, &chart).write_to(&dirs.report_file(REPORT_FILE))?;
    Ok(())
}

fn render_report(repository: &str, bugs: &[BugRecord], stats: &DurationStats, chart: &str) -> MarkdownDoc {
    let mut slowest: Vec<&BugRecord> = bugs.iter().collect();
    slowest.sort_by(|a, b| b.duration_hours.total_cmp(&a.duration_hours));

    MarkdownDoc::new("Bug fix analysis")
        .paragraph(&format!("Generated {}", Local::now().format("%Y-%m-%d %H:%M:%S")))
        .heading("Overview")
        .field("Repository", repository)
        .field("Closed bug issues", stats.count)
        .field("Mean time to close", format_hours(stats.mean_hours))
        .field("Median time to close", format_hours(stats.median_hours))
        .field("Fastest", format_hours(stats.min_hours))
        .field("Slowest", format_hours(stats.max_hours))
        .gap()
        .heading("Longest-running bugs")
        .table(
            &["Issue", "Title", "Opened", "Closed", "Hours"],
            slowest.iter().take(10).map(|b| {
                vec![
                    format!("#{}", b.number),
                    shorten_name(&b.title, 60),
                    b.created_at.format("%Y-%m-%d").to_string(),
                    b.closed_at.format("%Y-%m-%d").to_string(),
                    format!("{:.1}", b.duration_hours),
                ]
            }),
        )
        .heading("Distribution")
        .code_block(chart)
}

/// `36.0` -> `"36.0 h (1.5 days)"`
fn format_hours(hours: f64) -> String {
    format!("{hours:.1} h ({:.1} days)", hours / 24.0)
}

fn output_table(repository: &str, bugs: &[BugRecord], stats: &DurationStats) {
    println!(
        "{:<8} {:<44} {:<12} {:>10}",
        style("Issue").bold(),
        style("Title").bold(),
        style("Closed").bold(),
        style("Hours").bold()
    );
    println!("{}", "─".repeat(77));
    for b in bugs.iter().take(30) {
        println!(
            "{:<8} {:<44} {:<12} {:>10.1}",
            format!("#{}", b.number),
            shorten_name(&b.title, 44),
            b.closed_at.format("%Y-%m-%d").to_string(),
            b.duration_hours
        );
    }
    if bugs.len() > 30 {
        println!("\n... and {} more", bugs.len() - 30);
    }
    println!("\n{} {}", style("Repository:").bold(), repository);
    println!("{} {}", style("Closed bugs:").bold(), stats.count);
    println!("{} {}", style("Mean time to close:").bold(), format_hours(stats.mean_hours));
    println!("{} {}", style("Median time to close:").bold(), format_hours(stats.median_hours));
}
