use crate::aggregate::{change_size_breakdown, file_stats, percentage, type_stats, ChangeSizeBreakdown, FileStats, TypeStats};
use crate::context::RunContext;
use crate::model::{CommitRecord, CommitType};
use crate::report::chart::{bar_chart, DEFAULT_WIDTH};
use crate::report::csv::write_rows;
use crate::report::{write_text, MarkdownDoc};
use crate::util::shorten_path;
use anyhow::Context;
use chrono::{Local, NaiveDate};
use console::style;
use serde::Serialize;

pub const REPORT_FILE: &str = "commit_analysis_report.md";

#[derive(Debug, Clone, Serialize)]
pub struct TypeAnalysis {
    pub total_commits: usize,
    pub total_additions: u64,
    pub total_deletions: u64,
    pub total_changed_lines: u64,
    pub avg_changed_lines: f64,
    pub avg_files_per_commit: f64,
    pub types: Vec<TypeStats>,
    pub files: Vec<FileStats>,
    pub change_sizes: ChangeSizeBreakdown,
    pub findings: Vec<String>,
}

/// One row of `commits_summary.csv`.
#[derive(Debug, Serialize)]
struct CommitSummaryRow<'a> {
    hash: &'a str,
    author: &'a str,
    date: Option<NaiveDate>,
    subject: &'a str,
    commit_type: CommitType,
    additions: u64,
    deletions: u64,
    changed_lines: u64,
    file_count: usize,
}

impl<'a> From<&'a CommitRecord> for CommitSummaryRow<'a> {
    fn from(c: &'a CommitRecord) -> Self {
        Self {
            hash: &c.hash,
            author: &c.author,
            date: c.date,
            subject: &c.subject,
            commit_type: c.commit_type,
            additions: c.additions,
            deletions: c.deletions,
            changed_lines: c.changed_lines(),
            file_count: c.file_count(),
        }
    }
}

pub fn exec(ctx: &RunContext, json: bool, ndjson: bool, max_count: Option<usize>) -> anyhow::Result<()> {
    let max_count = match max_count.or(ctx.config.git.max_count) {
        Some(0) | None => None,
        Some(n) => Some(n),
    };

    let git = ctx.git()?;
    let commits = git.fetch_commits(&ctx.classifier, true, max_count)?;
    if commits.is_empty() {
        println!("No commits in the selected range.");
        return Ok(());
    }

    let analysis = analyze(&commits);
    write_outputs(ctx, &commits, &analysis).context("Failed to write commit type results")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else if ndjson {
        for t in &analysis.types {
            println!("{}", serde_json::to_string(t)?);
        }
    } else {
        output_table(&analysis);
    }
    Ok(())
}

pub fn analyze(commits: &[CommitRecord]) -> TypeAnalysis {
    let total_commits = commits.len();
    let total_additions: u64 = commits.iter().map(|c| c.additions).sum();
    let total_deletions: u64 = commits.iter().map(|c| c.deletions).sum();
    let total_changed_lines = total_additions + total_deletions;
    let total_files: usize = commits.iter().map(|c| c.file_count()).sum();
    let per_commit = |n: f64| if total_commits == 0 { 0.0 } else { n / total_commits as f64 };

    let types = type_stats(commits);
    let avg_changed_lines = per_commit(total_changed_lines as f64);
    let findings = key_findings(&types, avg_changed_lines);

    TypeAnalysis {
        total_commits,
        total_additions,
        total_deletions,
        total_changed_lines,
        avg_changed_lines,
        avg_files_per_commit: per_commit(total_files as f64),
        files: file_stats(commits),
        change_sizes: change_size_breakdown(commits),
        types,
        findings,
    }
}

pub fn key_findings(types: &[TypeStats], avg_changed_lines: f64) -> Vec<String> {
    let share = |ty: CommitType| {
        types
            .iter()
            .find(|t| t.commit_type == ty)
            .map(|t| t.percentage)
            .unwrap_or(0.0)
    };

    let mut findings = Vec::new();
    if share(CommitType::Bugfix) > 20.0 {
        findings.push("High share of bug fixes: the project is in a maintenance phase.".to_string());
    }
    if share(CommitType::Feature) > 30.0 {
        findings.push("Feature work is active: the project is under active development.".to_string());
    }
    if avg_changed_lines > 100.0 {
        findings.push("Commits are large on average: consider splitting them.".to_string());
    } else if avg_changed_lines < 50.0 {
        findings.push("Commits are small on average.".to_string());
    }
    findings
}

fn write_outputs(ctx: &RunContext, commits: &[CommitRecord], analysis: &TypeAnalysis) -> anyhow::Result<()> {
    let dirs = &ctx.dirs;
    dirs.ensure()?;

    let rows: Vec<CommitSummaryRow> = commits.iter().map(CommitSummaryRow::from).collect();
    write_rows(&dirs.data_file("commits_summary.csv"), &rows)?;
    write_rows(&dirs.data_file("file_statistics.csv"), &analysis.files)?;
    write_rows(&dirs.data_file("commit_types.csv"), &analysis.types)?;

    let charts = charts(analysis);
    for (file, text) in &charts {
        write_text(&dirs.figure_file(file), text)?;
    }
    render_report(analysis, &charts).write_to(&dirs.report_file(REPORT_FILE))?;
    Ok(())
}

fn charts(analysis: &TypeAnalysis) -> Vec<(&'static str, String)> {
    let types: Vec<(String, u64)> = analysis
        .types
        .iter()
        .map(|t| (t.commit_type.to_string(), t.count as u64))
        .collect();
    let sizes = analysis.change_sizes;
    let sizes = vec![
        ("small (<=10)".to_string(), sizes.small as u64),
        ("medium (11-100)".to_string(), sizes.medium as u64),
        ("large (>100)".to_string(), sizes.large as u64),
    ];
    let files: Vec<(String, u64)> = analysis
        .files
        .iter()
        .take(10)
        .map(|f| (shorten_path(&f.filename, 30), f.commit_count as u64))
        .collect();

    vec![
        ("commit_type_distribution.txt", bar_chart("Commits per type", &types, DEFAULT_WIDTH)),
        ("change_size_distribution.txt", bar_chart("Commits per change size", &sizes, DEFAULT_WIDTH)),
        ("top_files_changes.txt", bar_chart("Most frequently changed files", &files, DEFAULT_WIDTH)),
    ]
}

fn render_report(a: &TypeAnalysis, charts: &[(&'static str, String)]) -> MarkdownDoc {
    let total = a.total_commits;
    let sizes = a.change_sizes;

    let mut doc = MarkdownDoc::new("Commit type and code change analysis")
        .paragraph(&format!("Generated {}", Local::now().format("%Y-%m-%d %H:%M:%S")))
        .heading("Overview")
        .field("Commits analysed", total)
        .field("Lines added", a.total_additions)
        .field("Lines deleted", a.total_deletions)
        .field("Lines changed", a.total_changed_lines)
        .field("Average lines per commit", format!("{:.1}", a.avg_changed_lines))
        .field("Average files per commit", format!("{:.1}", a.avg_files_per_commit))
        .gap()
        .heading("Commit types")
        .table(
            &["Type", "Commits", "Share", "Changed lines", "Avg changed lines"],
            a.types.iter().map(|t| {
                vec![
                    t.commit_type.to_string(),
                    t.count.to_string(),
                    format!("{:.1}%", t.percentage),
                    t.total_changed_lines.to_string(),
                    format!("{:.1}", t.avg_changed_lines),
                ]
            }),
        )
        .heading("Most active files")
        .table(
            &["File", "Commits", "Changed lines", "Authors"],
            a.files.iter().take(10).map(|f| {
                vec![
                    shorten_path(&f.filename, 40),
                    f.commit_count.to_string(),
                    f.total_changed_lines.to_string(),
                    f.author_count.to_string(),
                ]
            }),
        )
        .heading("Change sizes")
        .field("Small (<= 10 lines)", format!("{} ({:.1}%)", sizes.small, percentage(sizes.small, total)))
        .field("Medium (11-100 lines)", format!("{} ({:.1}%)", sizes.medium, percentage(sizes.medium, total)))
        .field("Large (> 100 lines)", format!("{} ({:.1}%)", sizes.large, percentage(sizes.large, total)))
        .gap()
        .heading("Key findings");

    if a.findings.is_empty() {
        doc = doc.paragraph("Nothing stands out.");
    } else {
        for f in &a.findings {
            doc = doc.bullet(f);
        }
        doc = doc.gap();
    }

    doc = doc.heading("Charts");
    for (_, text) in charts {
        doc = doc.code_block(text);
    }
    doc
}

fn output_table(a: &TypeAnalysis) {
    println!(
        "{:<15} {:>8} {:>7} {:>14} {:>10}",
        style("Type").bold(),
        style("Commits").bold(),
        style("Share").bold(),
        style("Changed lines").bold(),
        style("Avg").bold()
    );
    println!("{}", "─".repeat(58));
    for t in &a.types {
        println!(
            "{:<15} {:>8} {:>6.1}% {:>14} {:>10.1}",
            t.commit_type.to_string(),
            t.count,
            t.percentage,
            t.total_changed_lines,
            t.avg_changed_lines
        );
    }

    println!();
    println!(
        "{:<40} {:>8} {:>14} {:>8}",
        style("File").bold(),
        style("Commits").bold(),
        style("Changed lines").bold(),
        style("Authors").bold()
    );
    println!("{}", "─".repeat(73));
    for f in a.files.iter().take(10) {
        println!(
            "{:<40} {:>8} {:>14} {:>8}",
            shorten_path(&f.filename, 40),
            f.commit_count,
            f.total_changed_lines,
            f.author_count
        );
    }

    let s = a.change_sizes;
    println!(
        "\n{} small {} / medium {} / large {}",
        style("Change sizes:").bold(),
        s.small,
        s.medium,
        s.large
    );
    for f in &a.findings {
        println!("{} {f}", style("*").cyan());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classifier;
    use crate::parse::parse_log;
    use pretty_assertions::assert_eq;

    const LOG: &str = "\
c4|Alice|2024-03-04|Add session backend
120\t5\tsrc/session.py
2\t0\tdocs/session.rst

c3|Bob|2024-03-03|Fix cookie expiry bug
3\t3\tsrc/session.py

c2|Alice|2024-03-02|Update docs for routing
20\t10\tdocs/routing.rst

c1|Carol|2024-03-01|Release 2.3
1\t1\tCHANGES.rst";

    fn commits() -> Vec<CommitRecord> {
        let mut parsed = parse_log(LOG);
        Classifier::default().apply(&mut parsed.commits);
        parsed.commits
    }

    #[test]
    fn aggregates_types_files_and_sizes() {
        let a = analyze(&commits());

        assert_eq!(a.total_commits, 4);
        assert_eq!(a.total_changed_lines, 165);
        assert_eq!(a.avg_files_per_commit, 1.25);
        assert_eq!(a.change_sizes, ChangeSizeBreakdown { small: 2, medium: 1, large: 1 });

        let types: Vec<(CommitType, usize)> = a.types.iter().map(|t| (t.commit_type, t.count)).collect();
        assert_eq!(
            types,
            vec![
                (CommitType::Feature, 1),
                (CommitType::Bugfix, 1),
                (CommitType::Documentation, 1),
                (CommitType::Other, 1),
            ]
        );

        assert_eq!(a.files[0].filename, "src/session.py");
        assert_eq!(a.files[0].commit_count, 2);
        assert_eq!(a.files[0].total_changed_lines, 131);
        assert_eq!(a.files[0].author_count, 2);
    }

    #[test]
    fn findings_follow_thresholds() {
        let a = analyze(&commits());
        // 25 % bug fixes, 25 % features, 41.25 lines per commit
        assert_eq!(
            a.findings,
            vec![
                "High share of bug fixes: the project is in a maintenance phase.".to_string(),
                "Commits are small on average.".to_string(),
            ]
        );
    }

    #[test]
    fn summary_rows_carry_totals() {
        let commits = commits();
        let row = CommitSummaryRow::from(&commits[0]);
        assert_eq!(row.changed_lines, 127);
        assert_eq!(row.file_count, 2);
        assert_eq!(row.commit_type, CommitType::Feature);
    }
}
