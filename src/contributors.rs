use crate::aggregate::{author_stats, contribution_patterns, percentage, tier_counts, AuthorStats, ContributionPatterns};
use crate::context::RunContext;
use crate::model::{CommitRecord, ContributorTier};
use crate::report::chart::{bar_chart, histogram, DEFAULT_WIDTH};
use crate::report::csv::{write_counts, write_rows};
use crate::report::{write_json, write_text, MarkdownDoc};
use crate::util::{mean, median, shorten_name};
use anyhow::Context;
use chrono::{Datelike, Local};
use console::style;
use serde::Serialize;

pub const REPORT_FILE: &str = "contributor_activity_report.md";
const TOP_CSV_ROWS: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct ContributorReport {
    pub authors: Vec<AuthorStats>,
    pub tiers: Vec<TierCount>,
    pub patterns: ContributionPatterns,
    pub health: HealthScore,
}

#[derive(Debug, Clone, Serialize)]
pub struct TierCount {
    pub tier: ContributorTier,
    pub authors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthScore {
    pub score: u32,
    pub indicators: Vec<String>,
}

pub fn exec(ctx: &RunContext, json: bool, ndjson: bool, top: usize) -> anyhow::Result<()> {
    let git = ctx.git()?;
    let commits = git.fetch_commits(&ctx.classifier, false, None)?;
    if commits.is_empty() {
        println!("No commits in the selected range.");
        return Ok(());
    }

    let report = analyze(&commits, Local::now().year());
    write_outputs(ctx, &report).context("Failed to write contributor results")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if ndjson {
        for a in &report.authors {
            println!("{}", serde_json::to_string(a)?);
        }
    } else {
        output_table(&report, top);
    }
    Ok(())
}

pub fn analyze(commits: &[CommitRecord], current_year: i32) -> ContributorReport {
    let authors = author_stats(commits);
    let patterns = contribution_patterns(commits, &authors, current_year);
    let tiers = tier_counts(&authors)
        .into_iter()
        .map(|(tier, authors)| TierCount { tier, authors })
        .collect();
    let health = health_score(&authors, &patterns);
    ContributorReport { authors, tiers, patterns, health }
}

/// Four indicators worth up to 25 points each: newcomer inflow, spread of
/// contributions, long-term contributors and depth of participation.
pub fn health_score(authors: &[AuthorStats], patterns: &ContributionPatterns) -> HealthScore {
    let mut score = 0;
    let mut indicators = Vec::new();
    let mut add = |points: u32, text: &str| {
        score += points;
        indicators.push(format!("{text} (+{points})"));
    };

    let new_per_year: Vec<usize> = patterns.yearly_new_authors.values().copied().collect();
    if new_per_year.len() >= 3 {
        let recent = new_per_year[new_per_year.len() - 3..].iter().sum::<usize>() as f64 / 3.0;
        match recent {
            r if r > 20.0 => add(25, "Strong newcomer growth"),
            r if r > 10.0 => add(15, "Steady newcomer growth"),
            _ => add(5, "Slow newcomer growth"),
        }
    }

    match patterns.top_20_percent_commits {
        p if p < 90.0 => add(25, "Contributions are spread out"),
        p if p < 95.0 => add(15, "Contributions are fairly concentrated"),
        _ => add(5, "Contributions are highly concentrated"),
    }

    let total = authors.len().max(1) as f64;
    let long_term = authors.iter().filter(|a| a.active_days > 365).count() as f64 / total;
    match long_term {
        r if r > 0.10 => add(25, "Healthy share of long-term contributors"),
        r if r > 0.05 => add(15, "Moderate share of long-term contributors"),
        _ => add(5, "Few long-term contributors"),
    }

    let one_time = authors.iter().filter(|a| a.commit_count == 1).count() as f64 / total;
    match one_time {
        r if r < 0.5 => add(25, "Good depth of participation"),
        r if r < 0.7 => add(15, "Average depth of participation"),
        _ => add(5, "Too many one-time contributors"),
    }

    HealthScore { score, indicators }
}

fn write_outputs(ctx: &RunContext, report: &ContributorReport) -> anyhow::Result<()> {
    let dirs = &ctx.dirs;
    dirs.ensure()?;
    let patterns = &report.patterns;

    write_rows(&dirs.data_file("contributor_stats.csv"), &report.authors)?;
    let top = &report.authors[..report.authors.len().min(TOP_CSV_ROWS)];
    write_rows(&dirs.data_file("top_100_contributors.csv"), top)?;
    write_counts(
        &dirs.data_file("yearly_new_contributors.csv"),
        ["year", "new_contributors"],
        &patterns.yearly_new_authors,
    )?;
    write_counts(
        &dirs.data_file("yearly_active_contributors.csv"),
        ["year", "active_contributors"],
        &patterns.yearly_active_authors,
    )?;
    write_counts(
        &dirs.data_file("retention_rates.csv"),
        ["year", "retention_rate"],
        patterns.retention_rates.iter().map(|(y, r)| (y, format!("{r:.2}"))),
    )?;
    write_json(&dirs.data_file("contribution_patterns.json"), patterns)?;

    let charts = charts(report);
    for (file, text) in &charts {
        write_text(&dirs.figure_file(file), text)?;
    }
    render_report(report, &charts).write_to(&dirs.report_file(REPORT_FILE))?;
    Ok(())
}

fn charts(report: &ContributorReport) -> Vec<(&'static str, String)> {
    let top20: Vec<(String, u64)> = report
        .authors
        .iter()
        .take(20)
        .map(|a| (shorten_name(&a.author, 20), a.commit_count as u64))
        .collect();
    let tiers: Vec<(String, u64)> = report
        .tiers
        .iter()
        .map(|t| (t.tier.to_string(), t.authors as u64))
        .collect();
    let new: Vec<(String, u64)> = report
        .patterns
        .yearly_new_authors
        .iter()
        .map(|(y, n)| (y.to_string(), *n as u64))
        .collect();
    let active: Vec<(String, u64)> = report
        .patterns
        .yearly_active_authors
        .iter()
        .map(|(y, n)| (y.to_string(), *n as u64))
        .collect();
    let durations: Vec<f64> = report
        .authors
        .iter()
        .filter(|a| a.active_days > 0)
        .map(|a| a.active_days as f64)
        .collect();

    vec![
        ("top_20_contributors.txt", bar_chart("Top 20 contributors by commits", &top20, DEFAULT_WIDTH)),
        ("contributor_type_distribution.txt", bar_chart("Contributors per tier", &tiers, DEFAULT_WIDTH)),
        ("yearly_new_contributors.txt", bar_chart("New contributors per year", &new, DEFAULT_WIDTH)),
        ("yearly_active_contributors.txt", bar_chart("Active contributors per year", &active, DEFAULT_WIDTH)),
        (
            "contributor_activity_duration.txt",
            histogram("Active days per contributor", &durations, 20, "d", DEFAULT_WIDTH),
        ),
    ]
}

fn render_report(report: &ContributorReport, charts: &[(&'static str, String)]) -> MarkdownDoc {
    let p = &report.patterns;
    let fmt_date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "N/A".into());

    let mut doc = MarkdownDoc::new("Contributor activity analysis")
        .paragraph(&format!("Generated {}", Local::now().format("%Y-%m-%d %H:%M:%S")))
        .heading("Overview")
        .field("Total contributors", p.total_authors)
        .field("Total commits", p.total_commits)
        .gap()
        .heading("Contributor tiers")
        .table(
            &["Tier", "Contributors", "Share"],
            report.tiers.iter().map(|t| {
                vec![
                    t.tier.to_string(),
                    t.authors.to_string(),
                    format!("{:.1}%", percentage(t.authors, p.total_authors)),
                ]
            }),
        )
        .heading("Concentration")
        .field("Top 10% of contributors", format!("{:.1}% of commits", p.top_10_percent_contribution))
        .field("Top 20% of contributors", format!("{:.1}% of commits", p.top_20_percent_commits))
        .field("Top 30% of contributors", format!("{:.1}% of commits", p.top_30_percent_commits))
        .field("Top 50% of contributors", format!("{:.1}% of commits", p.top_50_percent_commits))
        .gap()
        .subheading("Top 10 contributors")
        .table(
            &["#", "Author", "Commits", "Share", "First", "Last", "Active days", "Tier"],
            report.authors.iter().take(10).enumerate().map(|(i, a)| {
                vec![
                    (i + 1).to_string(),
                    a.author.clone(),
                    a.commit_count.to_string(),
                    format!("{:.1}%", a.commit_percentage),
                    fmt_date(a.first_commit),
                    fmt_date(a.last_commit),
                    a.active_days.to_string(),
                    a.tier.to_string(),
                ]
            }),
        )
        .heading("Contributor growth");

    let mut cumulative = 0;
    let growth_rows: Vec<Vec<String>> = p
        .yearly_new_authors
        .iter()
        .map(|(year, new)| {
            cumulative += new;
            vec![year.to_string(), new.to_string(), cumulative.to_string()]
        })
        .collect();
    doc = doc.table(&["Year", "New contributors", "Cumulative"], growth_rows);

    let retention: Vec<f64> = p.retention_rates.values().copied().collect();
    if retention.len() >= 3 {
        let recent = retention[retention.len() - 3..].iter().sum::<f64>() / 3.0;
        doc = doc.field("Average retention (last 3 years)", format!("{recent:.1}%"));
    }

    let durations: Vec<f64> = report
        .authors
        .iter()
        .filter(|a| a.active_days > 0)
        .map(|a| a.active_days as f64)
        .collect();
    if let (Some(med), Some(avg)) = (median(&durations), mean(&durations)) {
        let max = durations.iter().copied().fold(0.0, f64::max);
        doc = doc
            .field("Median active days", format!("{med:.0}"))
            .field("Mean active days", format!("{avg:.0}"))
            .field("Longest active span", format!("{max:.0} days"));
    }

    doc = doc
        .gap()
        .heading("Community health")
        .subheading(&format!("Score: {}/100", report.health.score));
    for indicator in &report.health.indicators {
        doc = doc.bullet(indicator);
    }
    let verdict = match report.health.score {
        s if s >= 80 => "Excellent: the contributor ecosystem is active and sustainable.",
        s if s >= 60 => "Good: stable overall, with room to improve.",
        _ => "Needs attention: retention and diversity of contributors are low.",
    };
    doc = doc.gap().paragraph(&format!("**Assessment**: {verdict}")).heading("Charts");
    for (_, text) in charts {
        doc = doc.code_block(text);
    }
    doc
}

fn output_table(report: &ContributorReport, top: usize) {
    println!(
        "{:<30} {:>8} {:>7} {:>12} {:>12} {:>11}",
        style("Author").bold(),
        style("Commits").bold(),
        style("Share").bold(),
        style("First").bold(),
        style("Last").bold(),
        style("Tier").bold()
    );
    println!("{}", "─".repeat(85));
    for a in report.authors.iter().take(top) {
        println!(
            "{:<30} {:>8} {:>6.1}% {:>12} {:>12} {:>11}",
            shorten_name(&a.author, 30),
            a.commit_count,
            a.commit_percentage,
            a.first_commit.map(|d| d.to_string()).unwrap_or_default(),
            a.last_commit.map(|d| d.to_string()).unwrap_or_default(),
            a.tier
        );
    }
    if report.authors.len() > top {
        println!("\n... and {} more contributors", report.authors.len() - top);
    }

    println!();
    for t in &report.tiers {
        println!("{:<12} {:>6}", t.tier.to_string(), t.authors);
    }
    println!(
        "\n{} top 20% of contributors made {:.1}% of commits",
        style("Concentration:").bold(),
        report.patterns.top_20_percent_commits
    );
    println!("{} {}/100", style("Community health:").bold(), report.health.score);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn commits(author: &str, year: i32, n: u32) -> Vec<CommitRecord> {
        (0..n)
            .map(|i| {
                CommitRecord::new(
                    format!("{author}{year}{i}"),
                    author.into(),
                    NaiveDate::from_ymd_opt(year, 1, 1 + i % 28),
                    "Fix".into(),
                )
            })
            .collect()
    }

    #[test]
    fn analysis_ranks_and_tiers_authors() {
        let mut all = commits("core", 2020, 60);
        all.extend(commits("core", 2022, 60));
        all.extend(commits("drive-by", 2021, 1));
        all.extend(commits("regular", 2021, 12));

        let report = analyze(&all, 2024);
        let names: Vec<&str> = report.authors.iter().map(|a| a.author.as_str()).collect();
        assert_eq!(names, vec!["core", "regular", "drive-by"]);
        assert_eq!(report.authors[0].tier, ContributorTier::Core);
        assert_eq!(report.authors[1].tier, ContributorTier::Regular);
        assert_eq!(report.authors[2].tier, ContributorTier::OneTime);
        assert_eq!(report.tiers.iter().map(|t| t.authors).sum::<usize>(), 3);
        assert_eq!(report.patterns.total_commits, 133);
    }

    #[test]
    fn health_score_adds_four_indicators() {
        let mut all = Vec::new();
        for (i, year) in [2019, 2020, 2021, 2022].iter().enumerate() {
            for k in 0..25 {
                all.extend(commits(&format!("dev{i}-{k}"), *year, 2));
            }
        }
        let report = analyze(&all, 2024);
        // 25 new authors a year, evenly spread, nobody active > 1 year, nobody one-time.
        assert_eq!(report.health.indicators.len(), 4);
        assert_eq!(report.health.score, 25 + 25 + 5 + 25);
    }
}
