use crate::aggregate::{count_by_month, count_by_weekday, count_by_year, count_by_year_month, percentage};
use crate::context::RunContext;
use crate::model::CommitRecord;
use crate::report::chart::{bar_chart, DEFAULT_WIDTH};
use crate::report::csv::write_counts;
use crate::report::{write_json, write_text, MarkdownDoc};
use crate::util::{month_name, weekday_name};
use anyhow::Context;
use chrono::{Datelike, Local, Weekday};
use console::style;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

pub const REPORT_FILE: &str = "commit_frequency_report.md";
const RECENT_MONTHS: usize = 36;

#[derive(Debug, Clone, Serialize)]
pub struct WeekdayCount {
    pub weekday: &'static str,
    pub commits: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrequencyStats {
    pub total_commits: usize,
    pub total_authors: usize,
    pub yearly: BTreeMap<i32, usize>,
    pub monthly: BTreeMap<u32, usize>,
    pub year_month: BTreeMap<String, usize>,
    pub weekday: Vec<WeekdayCount>,
    pub insights: FrequencyInsights,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DevelopmentStage {
    Early,
    RapidGrowth,
    StableMaintenance,
    MatureOrDeclining,
}

impl DevelopmentStage {
    pub fn label(&self) -> &'static str {
        match self {
            DevelopmentStage::Early => "early stage",
            DevelopmentStage::RapidGrowth => "rapid growth",
            DevelopmentStage::StableMaintenance => "stable maintenance",
            DevelopmentStage::MatureOrDeclining => "mature or declining",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FrequencyInsights {
    /// Change across the last three recorded years, last vs first, in percent.
    pub growth_rate: f64,
    pub busiest_quarter: u32,
    pub busiest_quarter_commits: usize,
    pub weekend_percentage: f64,
    pub project_age_years: i32,
    pub stage: DevelopmentStage,
    pub recent_commits: usize,
    pub older_commits: usize,
    pub busiest_year: Option<(i32, usize)>,
    pub quietest_year: Option<(i32, usize)>,
    pub busiest_month: Option<(u32, usize)>,
    pub quietest_month: Option<(u32, usize)>,
}

pub fn exec(ctx: &RunContext, json: bool, ndjson: bool) -> anyhow::Result<()> {
    let git = ctx.git()?;
    let commits = git.fetch_commits(&ctx.classifier, false, None)?;
    if commits.iter().all(|c| c.date.is_none()) {
        println!("No dated commits in the selected range.");
        return Ok(());
    }

    let stats = compute_frequency(&commits, Local::now().year());
    write_outputs(ctx, &stats).context("Failed to write frequency results")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else if ndjson {
        output_ndjson(&stats)?;
    } else {
        output_table(&stats);
    }
    Ok(())
}

pub fn compute_frequency(commits: &[CommitRecord], current_year: i32) -> FrequencyStats {
    let dated: Vec<&CommitRecord> = commits.iter().filter(|c| c.date.is_some()).collect();
    let yearly = count_by_year(commits);
    let monthly = count_by_month(commits);
    let weekday = count_by_weekday(commits);
    let authors: HashSet<&str> = dated.iter().map(|c| c.author.as_str()).collect();

    let insights = frequency_insights(dated.len(), &yearly, &monthly, &weekday, current_year);

    FrequencyStats {
        total_commits: dated.len(),
        total_authors: authors.len(),
        year_month: count_by_year_month(commits),
        weekday: weekday
            .iter()
            .map(|(day, commits)| WeekdayCount { weekday: weekday_name(*day), commits: *commits })
            .collect(),
        yearly,
        monthly,
        insights,
    }
}

pub fn frequency_insights(
    total: usize,
    yearly: &BTreeMap<i32, usize>,
    monthly: &BTreeMap<u32, usize>,
    weekday: &[(Weekday, usize)],
    current_year: i32,
) -> FrequencyInsights {
    let recent: Vec<usize> = yearly.values().rev().take(3).rev().copied().collect();
    let growth_rate = match (recent.first(), recent.last()) {
        (Some(&first), Some(&last)) if recent.len() >= 2 && first > 0 => {
            (last as f64 - first as f64) / first as f64 * 100.0
        }
        _ => 0.0,
    };

    let quarters: Vec<usize> = (0..4)
        .map(|q| (q * 3 + 1..=q * 3 + 3).map(|m| monthly.get(&m).copied().unwrap_or(0)).sum())
        .collect();
    let (busiest_quarter, busiest_quarter_commits) = quarters
        .iter()
        .enumerate()
        .fold((1, 0), |best, (i, &n)| if n > best.1 { (i as u32 + 1, n) } else { best });

    let weekend: usize = weekday
        .iter()
        .filter(|(d, _)| matches!(d, Weekday::Sat | Weekday::Sun))
        .map(|(_, n)| n)
        .sum();

    let project_age_years = match (yearly.keys().next(), yearly.keys().next_back()) {
        (Some(first), Some(last)) => last - first + 1,
        _ => 0,
    };
    let stage = if project_age_years < 3 {
        DevelopmentStage::Early
    } else if growth_rate > 10.0 {
        DevelopmentStage::RapidGrowth
    } else if growth_rate.abs() <= 10.0 {
        DevelopmentStage::StableMaintenance
    } else {
        DevelopmentStage::MatureOrDeclining
    };

    let recent_commits: usize = yearly
        .iter()
        .filter(|(y, _)| **y >= current_year - 2 && **y <= current_year)
        .map(|(_, n)| n)
        .sum();

    FrequencyInsights {
        growth_rate,
        busiest_quarter,
        busiest_quarter_commits,
        weekend_percentage: percentage(weekend, total),
        project_age_years,
        stage,
        recent_commits,
        older_commits: total.saturating_sub(recent_commits),
        busiest_year: extreme(yearly, true),
        quietest_year: extreme(yearly, false),
        busiest_month: extreme(monthly, true),
        quietest_month: extreme(monthly, false),
    }
}

/// Largest or smallest count; ties go to the earliest key.
fn extreme<K: Copy + Ord>(map: &BTreeMap<K, usize>, largest: bool) -> Option<(K, usize)> {
    let mut best: Option<(K, usize)> = None;
    for (&k, &v) in map {
        let better = match best {
            None => true,
            Some((_, b)) => (largest && v > b) || (!largest && v < b),
        };
        if better {
            best = Some((k, v));
        }
    }
    best
}

fn write_outputs(ctx: &RunContext, stats: &FrequencyStats) -> anyhow::Result<()> {
    let dirs = &ctx.dirs;
    dirs.ensure()?;

    write_counts(&dirs.data_file("yearly_commits.csv"), ["year", "count"], &stats.yearly)?;
    write_counts(&dirs.data_file("monthly_commits.csv"), ["month", "count"], &stats.monthly)?;
    write_counts(&dirs.data_file("year_month_commits.csv"), ["year_month", "count"], &stats.year_month)?;
    write_counts(
        &dirs.data_file("weekday_commits.csv"),
        ["weekday", "count"],
        stats.weekday.iter().map(|w| (w.weekday, w.commits)),
    )?;
    write_json(&dirs.data_file("frequency_insights.json"), &stats.insights)?;

    let charts = charts(stats);
    for (file, text) in &charts {
        write_text(&dirs.figure_file(file), text)?;
    }
    render_report(stats, &charts).write_to(&dirs.report_file(REPORT_FILE))?;
    Ok(())
}

fn charts(stats: &FrequencyStats) -> Vec<(&'static str, String)> {
    let yearly: Vec<(String, u64)> = stats.yearly.iter().map(|(y, n)| (y.to_string(), *n as u64)).collect();
    let monthly: Vec<(String, u64)> = stats
        .monthly
        .iter()
        .map(|(m, n)| (month_name(*m).to_string(), *n as u64))
        .collect();
    let skip = stats.year_month.len().saturating_sub(RECENT_MONTHS);
    let recent: Vec<(String, u64)> = stats
        .year_month
        .iter()
        .skip(skip)
        .map(|(k, n)| (k.clone(), *n as u64))
        .collect();
    let weekday: Vec<(String, u64)> = stats
        .weekday
        .iter()
        .map(|w| (w.weekday.to_string(), w.commits as u64))
        .collect();

    vec![
        ("yearly_commit_trend.txt", bar_chart("Commits per year", &yearly, DEFAULT_WIDTH)),
        ("monthly_commit_distribution.txt", bar_chart("Commits per month (all years)", &monthly, DEFAULT_WIDTH)),
        ("recent_36months_trend.txt", bar_chart("Commits per month (last 36 months)", &recent, DEFAULT_WIDTH)),
        ("weekday_commit_distribution.txt", bar_chart("Commits per weekday", &weekday, DEFAULT_WIDTH)),
    ]
}

fn render_report(stats: &FrequencyStats, charts: &[(&'static str, String)]) -> MarkdownDoc {
    let total = stats.total_commits;
    let ins = &stats.insights;
    let first_year = stats.yearly.keys().next().copied().unwrap_or_default();
    let last_year = stats.yearly.keys().next_back().copied().unwrap_or_default();

    let mut doc = MarkdownDoc::new("Commit frequency analysis")
        .paragraph(&format!("Generated {}", Local::now().format("%Y-%m-%d %H:%M:%S")))
        .heading("Key statistics")
        .field("Total commits", total)
        .field("Time span", format!("{first_year} - {last_year}"))
        .field("Authors", stats.total_authors)
        .field("Project age", format!("{} years", ins.project_age_years))
        .gap()
        .heading("Commits per year")
        .table(
            &["Year", "Commits", "Share"],
            stats.yearly.iter().map(|(y, n)| {
                vec![y.to_string(), n.to_string(), format!("{:.1}%", percentage(*n, total))]
            }),
        );

    if let (Some((by, bn)), Some((qy, qn))) = (ins.busiest_year, ins.quietest_year) {
        doc = doc
            .field("Most active year", format!("{by} ({bn} commits, {:.1}%)", percentage(bn, total)))
            .field("Least active year", format!("{qy} ({qn} commits)"));
    }
    if ins.growth_rate != 0.0 {
        let dir = if ins.growth_rate > 0.0 { "up" } else { "down" };
        doc = doc.field("Recent trend", format!("{dir} {:.1}% over the last three years", ins.growth_rate.abs()));
    }

    doc = doc
        .gap()
        .heading("Commits per month")
        .table(
            &["Month", "Commits", "Share"],
            stats.monthly.iter().map(|(m, n)| {
                vec![month_name(*m).to_string(), n.to_string(), format!("{:.1}%", percentage(*n, total))]
            }),
        )
        .heading("Commits per weekday")
        .table(
            &["Weekday", "Commits", "Share"],
            stats.weekday.iter().map(|w| {
                vec![w.weekday.to_string(), w.commits.to_string(), format!("{:.1}%", percentage(w.commits, total))]
            }),
        )
        .heading("Findings")
        .field(
            "Busiest quarter",
            format!(
                "Q{} ({} commits, {:.1}%)",
                ins.busiest_quarter,
                ins.busiest_quarter_commits,
                percentage(ins.busiest_quarter_commits, total)
            ),
        )
        .field("Weekend commits", format!("{:.1}%", ins.weekend_percentage))
        .field(
            "Last three calendar years",
            format!("{} commits, {} before", ins.recent_commits, ins.older_commits),
        )
        .field("Development stage", ins.stage.label());

    doc = match ins.weekend_percentage {
        p if p < 10.0 => doc.bullet("Few weekend commits: most work happens during the working week."),
        p if p > 20.0 => doc.bullet("Many weekend commits: a large share of contributions come from spare time."),
        _ => doc,
    };

    doc = doc.gap().heading("Charts");
    for (_, text) in charts {
        doc = doc.code_block(text);
    }
    doc
}

fn output_ndjson(stats: &FrequencyStats) -> anyhow::Result<()> {
    for (year, commits) in &stats.yearly {
        println!("{}", serde_json::json!({ "kind": "year", "key": year, "commits": commits }));
    }
    for (month, commits) in &stats.monthly {
        println!("{}", serde_json::json!({ "kind": "month", "key": month, "commits": commits }));
    }
    for (period, commits) in &stats.year_month {
        println!("{}", serde_json::json!({ "kind": "year_month", "key": period, "commits": commits }));
    }
    for w in &stats.weekday {
        println!("{}", serde_json::json!({ "kind": "weekday", "key": w.weekday, "commits": w.commits }));
    }
    Ok(())
}

fn output_table(stats: &FrequencyStats) {
    let total = stats.total_commits;
    println!("{:<8} {:>8} {:>8}", style("Year").bold(), style("Commits").bold(), style("Share").bold());
    println!("{}", "─".repeat(26));
    for (year, n) in &stats.yearly {
        println!("{:<8} {:>8} {:>7.1}%", year, n, percentage(*n, total));
    }

    println!();
    println!("{:<10} {:>8}", style("Weekday").bold(), style("Commits").bold());
    println!("{}", "─".repeat(19));
    for w in &stats.weekday {
        println!("{:<10} {:>8}", w.weekday, w.commits);
    }

    let ins = &stats.insights;
    println!();
    println!("{} {}", style("Total commits:").bold(), total);
    println!("{} {:.1}%", style("Growth (last 3 years):").bold(), ins.growth_rate);
    println!("{} Q{}", style("Busiest quarter:").bold(), ins.busiest_quarter);
    println!("{} {:.1}%", style("Weekend share:").bold(), ins.weekend_percentage);
    println!("{} {}", style("Stage:").bold(), ins.stage.label());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn commit(date: (i32, u32, u32), author: &str) -> CommitRecord {
        CommitRecord::new(
            format!("{date:?}"),
            author.into(),
            NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            "Update".into(),
        )
    }

    #[test]
    fn counts_and_insights() {
        // 2024-03-09 and 2024-03-10 are a weekend.
        let commits = vec![
            commit((2021, 1, 4), "a"),
            commit((2022, 2, 1), "a"),
            commit((2022, 2, 2), "b"),
            commit((2023, 3, 1), "b"),
            commit((2023, 3, 2), "c"),
            commit((2023, 3, 3), "c"),
            commit((2024, 3, 9), "c"),
            commit((2024, 3, 10), "c"),
        ];
        let stats = compute_frequency(&commits, 2024);

        assert_eq!(stats.total_commits, 8);
        assert_eq!(stats.total_authors, 3);
        assert_eq!(stats.monthly.len(), 12);
        assert_eq!(stats.monthly[&3], 5);
        assert_eq!(stats.weekday.len(), 7);
        assert_eq!(stats.year_month["2022-02"], 2);

        let ins = &stats.insights;
        // last three years: 2022=2, 2023=3, 2024=2 -> 0 %
        assert_eq!(ins.growth_rate, 0.0);
        assert_eq!(ins.busiest_quarter, 1);
        assert_eq!(ins.weekend_percentage, 25.0);
        assert_eq!(ins.project_age_years, 4);
        assert_eq!(ins.stage, DevelopmentStage::StableMaintenance);
        assert_eq!(ins.recent_commits, 7);
        assert_eq!(ins.older_commits, 1);
        assert_eq!(ins.busiest_year, Some((2023, 3)));
        assert_eq!(ins.quietest_year, Some((2021, 1)));
    }

    #[test]
    fn short_history_is_early_stage() {
        let commits = vec![commit((2023, 5, 1), "a"), commit((2024, 5, 1), "a"), commit((2024, 6, 1), "b")];
        let ins = compute_frequency(&commits, 2024).insights;
        assert_eq!(ins.project_age_years, 2);
        assert_eq!(ins.growth_rate, 100.0);
        assert_eq!(ins.stage, DevelopmentStage::Early);
    }

    #[test]
    fn growth_beyond_ten_percent_is_rapid() {
        let mut commits = vec![commit((2020, 1, 1), "a"), commit((2022, 1, 1), "a")];
        commits.extend((1..=5).map(|d| commit((2023, 1, d), "b")));
        let ins = compute_frequency(&commits, 2023).insights;
        assert_eq!(ins.growth_rate, 400.0);
        assert_eq!(ins.stage, DevelopmentStage::RapidGrowth);
    }
}
