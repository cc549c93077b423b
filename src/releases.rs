use crate::aggregate::percentage;
use crate::context::RunContext;
use crate::model::{ReleaseRecord, Version, VersionKind};
use crate::report::chart::{bar_chart, DEFAULT_WIDTH};
use crate::report::csv::write_rows;
use crate::report::{write_json, write_text, MarkdownDoc};
use crate::util::{mean, median};
use anyhow::Context;
use chrono::{Datelike, Local, NaiveDate};
use console::style;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

pub const REPORT_FILE: &str = "release_analysis_report.md";

static SEMVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)\.(\d+)\.(\d+)(?:-([a-zA-Z0-9.-]+))?(?:\+([a-zA-Z0-9.-]+))?$")
        .expect("valid semver regex")
});
static MAJOR_MINOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\.(\d+)$").expect("valid version regex"));

/// Parse `v1.2.3`, `1.2.3-rc.1+build`, or `1.2` into a [`Version`].
pub fn parse_version(tag: &str) -> Version {
    let tag = tag.trim().trim_start_matches(['v', 'V']);

    if let Some(caps) = SEMVER.captures(tag) {
        let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
        let (major, minor, patch) = (num(1), num(2), num(3));
        let kind = if caps.get(4).is_some() {
            VersionKind::Prerelease
        } else if minor == Some(0) && patch == Some(0) {
            VersionKind::Major
        } else if patch == Some(0) {
            VersionKind::Minor
        } else {
            VersionKind::Patch
        };
        return Version { major, minor, patch, kind };
    }

    if let Some(caps) = MAJOR_MINOR.captures(tag) {
        let major = caps.get(1).and_then(|m| m.as_str().parse::<u64>().ok());
        let minor = caps.get(2).and_then(|m| m.as_str().parse::<u64>().ok());
        let kind = if minor.unwrap_or(0) > 0 { VersionKind::Minor } else { VersionKind::Major };
        return Version { major, minor, patch: Some(0), kind };
    }

    Version { major: None, minor: None, patch: None, kind: VersionKind::Unknown }
}

/// Parse one `name|YYYY-MM-DD|subject` line from `git for-each-ref`.
pub fn parse_tag_line(line: &str) -> Option<ReleaseRecord> {
    let mut parts = line.splitn(3, '|');
    let tag = parts.next()?.trim();
    let date = parts.next()?.trim();
    let subject = parts.next().unwrap_or("").trim();
    if tag.is_empty() {
        return None;
    }
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(ReleaseRecord {
        tag: tag.to_string(),
        date,
        subject: subject.to_string(),
        version: parse_version(tag),
        days_since_previous: None,
    })
}

/// Parse tag lines, order them by date and fill in the release intervals.
pub fn build_releases<S: AsRef<str>>(lines: &[S]) -> Vec<ReleaseRecord> {
    let mut releases = Vec::new();
    for line in lines {
        let line: &str = line.as_ref();
        match parse_tag_line(line) {
            Some(r) => releases.push(r),
            None => tracing::warn!(line, "skipping tag without a usable date"),
        }
    }
    releases.sort_by_key(|r| r.date);

    let mut prev: Option<NaiveDate> = None;
    for r in &mut releases {
        r.days_since_previous = prev.map(|p| (r.date - p).num_days());
        prev = Some(r.date);
    }
    releases
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KindShare {
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: i64,
    pub max: i64,
}

impl IntervalStats {
    fn from_days(days: &[i64]) -> Option<Self> {
        let values: Vec<f64> = days.iter().map(|d| *d as f64).collect();
        Some(Self {
            count: days.len(),
            mean: mean(&values)?,
            median: median(&values)?,
            min: *days.iter().min()?,
            max: *days.iter().max()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleasePatterns {
    pub total_releases: usize,
    pub first_release: Option<NaiveDate>,
    pub last_release: Option<NaiveDate>,
    pub version_types: BTreeMap<VersionKind, KindShare>,
    pub yearly_counts: BTreeMap<i32, usize>,
    pub major_versions: BTreeMap<u64, usize>,
    pub intervals: Option<IntervalStats>,
    pub interval_by_type: BTreeMap<VersionKind, IntervalStats>,
    pub findings: Vec<String>,
    pub suggestions: Vec<String>,
}

pub fn release_patterns(releases: &[ReleaseRecord]) -> ReleasePatterns {
    let total = releases.len();

    let mut kind_counts: BTreeMap<VersionKind, usize> = BTreeMap::new();
    let mut yearly_counts = BTreeMap::new();
    let mut major_versions = BTreeMap::new();
    let mut by_kind: BTreeMap<VersionKind, Vec<i64>> = BTreeMap::new();
    for r in releases {
        *kind_counts.entry(r.version.kind).or_insert(0) += 1;
        *yearly_counts.entry(r.date.year()).or_insert(0) += 1;
        if let Some(major) = r.version.major {
            *major_versions.entry(major).or_insert(0) += 1;
        }
        if let Some(days) = r.days_since_previous {
            by_kind.entry(r.version.kind).or_default().push(days);
        }
    }

    let version_types = kind_counts
        .into_iter()
        .map(|(kind, count)| (kind, KindShare { count, percentage: percentage(count, total) }))
        .collect();
    let all_days: Vec<i64> = releases.iter().filter_map(|r| r.days_since_previous).collect();
    let interval_by_type = by_kind
        .iter()
        .filter_map(|(kind, days)| IntervalStats::from_days(days).map(|s| (*kind, s)))
        .collect();

    let mut patterns = ReleasePatterns {
        total_releases: total,
        first_release: releases.first().map(|r| r.date),
        last_release: releases.last().map(|r| r.date),
        version_types,
        yearly_counts,
        major_versions,
        intervals: IntervalStats::from_days(&all_days),
        interval_by_type,
        findings: Vec::new(),
        suggestions: Vec::new(),
    };
    patterns.findings = findings(&patterns);
    patterns.suggestions = suggestions(&patterns);
    patterns
}

fn kind_share(p: &ReleasePatterns, kind: VersionKind) -> f64 {
    p.version_types.get(&kind).map(|s| s.percentage).unwrap_or(0.0)
}

fn findings(p: &ReleasePatterns) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(iv) = &p.intervals {
        let pace = match iv.mean {
            m if m < 30.0 => "High",
            m if m < 90.0 => "Moderate",
            _ => "Low",
        };
        out.push(format!("{pace} release frequency: one release every {:.0} days on average", iv.mean));
    }
    let major = kind_share(p, VersionKind::Major);
    if major > 20.0 {
        out.push(format!("Frequent major releases ({major:.1}%): the project may be evolving quickly"));
    }
    if p.yearly_counts.len() >= 3 {
        let recent: Vec<usize> = p.yearly_counts.values().rev().take(3).copied().collect();
        let avg = recent.iter().sum::<usize>() as f64 / recent.len() as f64;
        if avg > 10.0 {
            out.push(format!("Active recent releases: {avg:.1} per year"));
        } else if avg < 3.0 {
            out.push(format!("Few recent releases: {avg:.1} per year"));
        }
    }
    out
}

fn suggestions(p: &ReleasePatterns) -> Vec<String> {
    let mut out = Vec::new();
    if p.intervals.as_ref().is_some_and(|iv| iv.mean > 180.0) {
        out.push("Long gaps between releases: consider releasing more often".to_string());
    }
    if kind_share(p, VersionKind::Patch) > 70.0 {
        out.push("Most releases are patches: consider batching small changes into minor releases".to_string());
    }
    out
}

#[derive(Debug, Serialize)]
struct ReleaseRow<'a> {
    tag: &'a str,
    date: NaiveDate,
    year: i32,
    month: String,
    subject: &'a str,
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    version_type: VersionKind,
    days_since_previous: Option<i64>,
}

impl<'a> From<&'a ReleaseRecord> for ReleaseRow<'a> {
    fn from(r: &'a ReleaseRecord) -> Self {
        Self {
            tag: &r.tag,
            date: r.date,
            year: r.date.year(),
            month: r.date.format("%Y-%m").to_string(),
            subject: &r.subject,
            major: r.version.major,
            minor: r.version.minor,
            patch: r.version.patch,
            version_type: r.version.kind,
            days_since_previous: r.days_since_previous,
        }
    }
}

#[derive(Debug, Serialize)]
struct ReleaseOutput<'a> {
    releases: &'a [ReleaseRecord],
    patterns: &'a ReleasePatterns,
}

pub fn exec(ctx: &RunContext, json: bool, ndjson: bool) -> anyhow::Result<()> {
    let git = ctx.git()?;
    let lines = git.repo.tag_lines().context("Failed to list tags")?;
    let releases = build_releases(&lines);
    if releases.is_empty() {
        println!("No tags found in the repository.");
        return Ok(());
    }

    let patterns = release_patterns(&releases);
    write_outputs(ctx, &releases, &patterns).context("Failed to write release results")?;

    if json {
        let out = ReleaseOutput { releases: &releases, patterns: &patterns };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if ndjson {
        for r in &releases {
            println!("{}", serde_json::to_string(r)?);
        }
    } else {
        output_table(&releases, &patterns);
    }
    Ok(())
}

fn write_outputs(ctx: &RunContext, releases: &[ReleaseRecord], patterns: &ReleasePatterns) -> anyhow::Result<()> {
    let dirs = &ctx.dirs;
    dirs.ensure()?;

    let rows: Vec<ReleaseRow> = releases.iter().map(ReleaseRow::from).collect();
    write_rows(&dirs.data_file("releases_summary.csv"), &rows)?;
    write_json(&dirs.data_file("release_patterns.json"), patterns)?;

    let charts = charts(releases, patterns);
    for (file, text) in &charts {
        write_text(&dirs.figure_file(file), text)?;
    }
    render_report(patterns, &charts).write_to(&dirs.report_file(REPORT_FILE))?;
    Ok(())
}

fn charts(releases: &[ReleaseRecord], p: &ReleasePatterns) -> Vec<(&'static str, String)> {
    let yearly: Vec<(String, u64)> = p.yearly_counts.iter().map(|(y, n)| (y.to_string(), *n as u64)).collect();
    let kinds: Vec<(String, u64)> = p
        .version_types
        .iter()
        .map(|(k, s)| (k.to_string(), s.count as u64))
        .collect();
    let timeline: Vec<(String, u64)> = releases
        .iter()
        .filter_map(|r| r.days_since_previous.map(|d| (r.tag.clone(), d.max(0) as u64)))
        .collect();

    vec![
        ("yearly_releases.txt", bar_chart("Releases per year", &yearly, DEFAULT_WIDTH)),
        ("release_types.txt", bar_chart("Releases per version type", &kinds, DEFAULT_WIDTH)),
        ("release_timeline.txt", bar_chart("Days since previous release", &timeline, DEFAULT_WIDTH)),
    ]
}

fn render_report(p: &ReleasePatterns, charts: &[(&'static str, String)]) -> MarkdownDoc {
    let date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "N/A".into());

    let mut doc = MarkdownDoc::new("Release analysis")
        .paragraph(&format!("Generated {}", Local::now().format("%Y-%m-%d %H:%M:%S")))
        .heading("Overview")
        .field("Total releases", p.total_releases)
        .field("First release", date(p.first_release))
        .field("Last release", date(p.last_release))
        .gap()
        .heading("Version types")
        .table(
            &["Type", "Releases", "Share"],
            p.version_types
                .iter()
                .map(|(k, s)| vec![k.to_string(), s.count.to_string(), format!("{:.1}%", s.percentage)]),
        )
        .heading("Releases per year")
        .table(
            &["Year", "Releases"],
            p.yearly_counts.iter().map(|(y, n)| vec![y.to_string(), n.to_string()]),
        );

    if let Some(iv) = &p.intervals {
        doc = doc
            .heading("Release intervals")
            .field("Mean", format!("{:.1} days", iv.mean))
            .field("Median", format!("{:.1} days", iv.median))
            .field("Shortest", format!("{} days", iv.min))
            .field("Longest", format!("{} days", iv.max))
            .gap()
            .subheading("By version type")
            .table(
                &["Type", "Mean days", "Median days", "Releases"],
                p.interval_by_type.iter().map(|(k, s)| {
                    vec![k.to_string(), format!("{:.1}", s.mean), format!("{:.1}", s.median), s.count.to_string()]
                }),
            );
    }

    doc = doc.heading("Major versions").table(
        &["Major", "Releases"],
        p.major_versions.iter().map(|(m, n)| vec![format!("v{m}.x"), n.to_string()]),
    );

    doc = doc.heading("Key findings");
    for f in &p.findings {
        doc = doc.bullet(f);
    }
    doc = doc.gap().heading("Suggestions");
    if p.suggestions.is_empty() {
        doc = doc.bullet("Keep the current release cadence");
    }
    for s in &p.suggestions {
        doc = doc.bullet(s);
    }
    doc = doc.gap().heading("Charts");
    for (_, text) in charts {
        doc = doc.code_block(text);
    }
    doc
}

fn output_table(releases: &[ReleaseRecord], p: &ReleasePatterns) {
    println!(
        "{:<20} {:<12} {:<11} {:>8}",
        style("Tag").bold(),
        style("Date").bold(),
        style("Type").bold(),
        style("Days").bold()
    );
    println!("{}", "─".repeat(54));
    let skip = releases.len().saturating_sub(30);
    for r in releases.iter().skip(skip) {
        println!(
            "{:<20} {:<12} {:<11} {:>8}",
            r.tag,
            r.date.to_string(),
            r.version.kind.to_string(),
            r.days_since_previous.map(|d| d.to_string()).unwrap_or_default()
        );
    }
    if skip > 0 {
        println!("\n... {skip} older releases not shown");
    }
    println!("\n{} {}", style("Total releases:").bold(), p.total_releases);
    if let Some(iv) = &p.intervals {
        println!("{} {:.1} days (median {:.1})", style("Mean interval:").bold(), iv.mean, iv.median);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn versions_are_classified() {
        let kind = |t: &str| parse_version(t).kind;
        assert_eq!(kind("v2.0.0"), VersionKind::Major);
        assert_eq!(kind("2.3.0"), VersionKind::Minor);
        assert_eq!(kind("V2.3.1"), VersionKind::Patch);
        assert_eq!(kind("3.0.0-rc.1"), VersionKind::Prerelease);
        assert_eq!(kind("1.0.1+build.5"), VersionKind::Patch);
        assert_eq!(kind("0.10"), VersionKind::Minor);
        assert_eq!(kind("1.0"), VersionKind::Major);
        assert_eq!(kind("2.1"), VersionKind::Minor);
        assert_eq!(kind("1"), VersionKind::Unknown);
        assert_eq!(kind("nightly"), VersionKind::Unknown);

        let v = parse_version("v1.2.3");
        assert_eq!((v.major, v.minor, v.patch), (Some(1), Some(2), Some(3)));
        let v = parse_version("0.0");
        assert_eq!((v.major, v.patch, v.kind), (Some(0), Some(0), VersionKind::Major));
    }

    #[test]
    fn tag_lines_parse_and_skip_bad_dates() {
        let r = parse_tag_line("2.3.0|2023-04-25|Release 2.3.0 | final").unwrap();
        assert_eq!(r.tag, "2.3.0");
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2023, 4, 25).unwrap());
        assert_eq!(r.subject, "Release 2.3.0 | final");
        assert!(parse_tag_line("broken|someday|x").is_none());
        assert!(parse_tag_line("lonely").is_none());
    }

    #[test]
    fn intervals_overall_and_per_kind() {
        let releases = build_releases(&[
            "2.0.0|2021-05-11|Release 2.0.0",
            "1.1.0|2019-07-04|Release 1.1.0",
            "2.0.1|2021-05-21|Release 2.0.1",
            "2.0.2|2021-10-04|Release 2.0.2",
        ]);

        let tags: Vec<&str> = releases.iter().map(|r| r.tag.as_str()).collect();
        assert_eq!(tags, vec!["1.1.0", "2.0.0", "2.0.1", "2.0.2"]);
        assert_eq!(releases[0].days_since_previous, None);
        assert_eq!(releases[2].days_since_previous, Some(10));
        assert_eq!(releases[3].days_since_previous, Some(136));

        let p = release_patterns(&releases);
        assert_eq!(p.total_releases, 4);
        assert_eq!(p.version_types[&VersionKind::Patch].count, 2);
        assert_eq!(p.version_types[&VersionKind::Major].percentage, 25.0);
        assert_eq!(p.yearly_counts[&2021], 3);
        assert_eq!(p.major_versions[&2], 3);

        let iv = p.intervals.as_ref().unwrap();
        assert_eq!(iv.count, 3);
        assert_eq!(iv.min, 10);
        assert_eq!(iv.median, 136.0);
        let patch = &p.interval_by_type[&VersionKind::Patch];
        assert_eq!(patch.count, 2);
        assert_eq!(patch.mean, 73.0);
        assert!(!p.interval_by_type.contains_key(&VersionKind::Minor));
    }

    #[test]
    fn single_release_has_no_intervals() {
        let p = release_patterns(&build_releases(&["1.0|2010-04-16|Release 1.0"]));
        assert!(p.intervals.is_none());
        assert!(p.interval_by_type.is_empty());
        assert_eq!(p.suggestions, Vec::<String>::new());
    }
}
