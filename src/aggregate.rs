use crate::model::{CommitRecord, CommitType, ContributorTier};
use crate::util::{year_month_key, WEEKDAYS};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

pub fn count_by_year(commits: &[CommitRecord]) -> BTreeMap<i32, usize> {
    let mut map = BTreeMap::new();
    for date in commits.iter().filter_map(|c| c.date) {
        *map.entry(date.year()).or_insert(0) += 1;
    }
    map
}

/// Month-of-year counts with all twelve months present.
pub fn count_by_month(commits: &[CommitRecord]) -> BTreeMap<u32, usize> {
    let mut map: BTreeMap<u32, usize> = (1..=12).map(|m| (m, 0)).collect();
    for date in commits.iter().filter_map(|c| c.date) {
        *map.entry(date.month()).or_insert(0) += 1;
    }
    map
}

pub fn count_by_year_month(commits: &[CommitRecord]) -> BTreeMap<String, usize> {
    let mut map = BTreeMap::new();
    for date in commits.iter().filter_map(|c| c.date) {
        *map.entry(year_month_key(&date)).or_insert(0) += 1;
    }
    map
}

/// Weekday counts, Monday first, with all seven days present.
pub fn count_by_weekday(commits: &[CommitRecord]) -> Vec<(Weekday, usize)> {
    let mut counts: HashMap<Weekday, usize> = HashMap::new();
    for date in commits.iter().filter_map(|c| c.date) {
        *counts.entry(date.weekday()).or_insert(0) += 1;
    }
    WEEKDAYS
        .iter()
        .map(|day| (*day, counts.get(day).copied().unwrap_or(0)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorStats {
    pub author: String,
    pub first_commit: Option<NaiveDate>,
    pub last_commit: Option<NaiveDate>,
    pub commit_count: usize,
    pub active_years: usize,
    pub active_days: i64,
    pub monthly_avg: f64,
    pub commit_percentage: f64,
    pub cumulative_percentage: f64,
    pub tier: ContributorTier,
}

struct AuthorAccum {
    first: Option<NaiveDate>,
    last: Option<NaiveDate>,
    commits: usize,
    years: HashSet<i32>,
}

/// Per-author statistics sorted by commit count, busiest first.
pub fn author_stats(commits: &[CommitRecord]) -> Vec<AuthorStats> {
    let mut map: HashMap<&str, AuthorAccum> = HashMap::new();
    for commit in commits {
        let entry = map.entry(commit.author.as_str()).or_insert_with(|| AuthorAccum {
            first: None,
            last: None,
            commits: 0,
            years: HashSet::new(),
        });
        entry.commits += 1;
        if let Some(date) = commit.date {
            entry.first = Some(entry.first.map_or(date, |f| f.min(date)));
            entry.last = Some(entry.last.map_or(date, |l| l.max(date)));
            entry.years.insert(date.year());
        }
    }

    let total: usize = map.values().map(|a| a.commits).sum();
    let mut stats: Vec<AuthorStats> = map
        .into_iter()
        .map(|(author, acc)| {
            let active_days = match (acc.first, acc.last) {
                (Some(first), Some(last)) => (last - first).num_days().max(0),
                _ => 0,
            };
            let monthly_avg = if active_days > 0 {
                acc.commits as f64 / active_days as f64 * 30.0
            } else {
                0.0
            };
            AuthorStats {
                author: author.to_string(),
                first_commit: acc.first,
                last_commit: acc.last,
                commit_count: acc.commits,
                active_years: acc.years.len(),
                active_days,
                monthly_avg,
                commit_percentage: percentage(acc.commits, total),
                cumulative_percentage: 0.0,
                tier: ContributorTier::classify(acc.commits, active_days),
            }
        })
        .collect();

    stats.sort_by(|a, b| b.commit_count.cmp(&a.commit_count).then_with(|| a.author.cmp(&b.author)));

    let mut running = 0.0;
    for s in &mut stats {
        running += s.commit_percentage;
        s.cumulative_percentage = running;
    }
    stats
}

pub fn tier_counts(authors: &[AuthorStats]) -> Vec<(ContributorTier, usize)> {
    ContributorTier::ALL
        .iter()
        .map(|tier| (*tier, authors.iter().filter(|a| a.tier == *tier).count()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileStats {
    pub filename: String,
    pub commit_count: usize,
    pub total_changed_lines: u64,
    pub author_count: usize,
}

/// Per-file statistics sorted by how often the file was touched.
pub fn file_stats(commits: &[CommitRecord]) -> Vec<FileStats> {
    let mut map: HashMap<&str, (usize, u64, HashSet<&str>)> = HashMap::new();
    for commit in commits {
        for change in &commit.changed_files {
            let entry = map
                .entry(change.filename.as_str())
                .or_insert_with(|| (0, 0, HashSet::new()));
            entry.0 += 1;
            entry.1 += change.changed_lines();
            entry.2.insert(commit.author.as_str());
        }
    }

    let mut stats: Vec<FileStats> = map
        .into_iter()
        .map(|(filename, (commit_count, total_changed_lines, authors))| FileStats {
            filename: filename.to_string(),
            commit_count,
            total_changed_lines,
            author_count: authors.len(),
        })
        .collect();
    stats.sort_by(|a, b| b.commit_count.cmp(&a.commit_count).then_with(|| a.filename.cmp(&b.filename)));
    stats
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeStats {
    pub commit_type: CommitType,
    pub count: usize,
    pub percentage: f64,
    pub total_changed_lines: u64,
    pub avg_changed_lines: f64,
}

/// Per-type statistics for the types that occur, most frequent first.
pub fn type_stats(commits: &[CommitRecord]) -> Vec<TypeStats> {
    let mut map: BTreeMap<CommitType, (usize, u64)> = BTreeMap::new();
    for commit in commits {
        let entry = map.entry(commit.commit_type).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += commit.changed_lines();
    }

    let total = commits.len();
    let mut stats: Vec<TypeStats> = map
        .into_iter()
        .map(|(commit_type, (count, lines))| TypeStats {
            commit_type,
            count,
            percentage: percentage(count, total),
            total_changed_lines: lines,
            avg_changed_lines: lines as f64 / count as f64,
        })
        .collect();
    // Stable sort keeps taxonomy order among equal counts.
    stats.sort_by(|a, b| b.count.cmp(&a.count));
    stats
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ChangeSizeBreakdown {
    pub small: usize,
    pub medium: usize,
    pub large: usize,
}

pub fn change_size_breakdown(commits: &[CommitRecord]) -> ChangeSizeBreakdown {
    let mut out = ChangeSizeBreakdown::default();
    for commit in commits {
        match commit.changed_lines() {
            0..=10 => out.small += 1,
            11..=100 => out.medium += 1,
            _ => out.large += 1,
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionPatterns {
    pub total_commits: usize,
    pub total_authors: usize,
    pub top_10_percent_contribution: f64,
    pub top_20_percent_commits: f64,
    pub top_30_percent_commits: f64,
    pub top_50_percent_commits: f64,
    pub retention_rates: BTreeMap<i32, f64>,
    pub yearly_new_authors: BTreeMap<i32, usize>,
    pub yearly_active_authors: BTreeMap<i32, usize>,
    pub total_unique_authors: usize,
}

/// Concentration, retention and growth of the contributor base.
///
/// `authors` must be sorted busiest first, as returned by [`author_stats`].
/// Retention is computed for years up to `current_year`.
pub fn contribution_patterns(
    commits: &[CommitRecord],
    authors: &[AuthorStats],
    current_year: i32,
) -> ContributionPatterns {
    let total_commits: usize = authors.iter().map(|a| a.commit_count).sum();
    let total_authors = authors.len();

    let top_share = |percent: usize| -> f64 {
        let n = total_authors * percent / 100;
        if n == 0 {
            return 0.0;
        }
        let top: usize = authors.iter().take(n).map(|a| a.commit_count).sum();
        percentage(top, total_commits)
    };

    let mut by_year: BTreeMap<i32, BTreeSet<&str>> = BTreeMap::new();
    for commit in commits {
        if let Some(year) = commit.year() {
            by_year.entry(year).or_default().insert(commit.author.as_str());
        }
    }

    let mut retention_rates = BTreeMap::new();
    for (year, year_authors) in &by_year {
        if *year + 1 > current_year {
            continue;
        }
        let retained = by_year
            .get(&(year + 1))
            .map(|next| year_authors.intersection(next).count())
            .unwrap_or(0);
        retention_rates.insert(*year, percentage(retained, year_authors.len()));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut yearly_new_authors = BTreeMap::new();
    let mut yearly_active_authors = BTreeMap::new();
    for (year, year_authors) in &by_year {
        let new = year_authors.iter().filter(|a| seen.insert(**a)).count();
        yearly_new_authors.insert(*year, new);
        yearly_active_authors.insert(*year, year_authors.len());
    }

    ContributionPatterns {
        total_commits,
        total_authors,
        top_10_percent_contribution: top_share(10),
        top_20_percent_commits: top_share(20),
        top_30_percent_commits: top_share(30),
        top_50_percent_commits: top_share(50),
        retention_rates,
        yearly_new_authors,
        yearly_active_authors,
        total_unique_authors: seen.len(),
    }
}

pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileChange;
    use pretty_assertions::assert_eq;

    fn commit(author: &str, date: &str, ty: CommitType, files: &[(&str, u32, u32)]) -> CommitRecord {
        let mut c = CommitRecord::new(
            format!("{author}-{date}"),
            author.to_string(),
            NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
            String::new(),
        );
        c.commit_type = ty;
        for (name, add, del) in files {
            c.push_change(FileChange {
                filename: name.to_string(),
                additions: *add,
                deletions: *del,
                binary: false,
            });
        }
        c
    }

    fn sample() -> Vec<CommitRecord> {
        vec![
            commit("Alice", "2023-12-30", CommitType::Feature, &[("src/app.rs", 50, 10), ("README.md", 2, 0)]),
            commit("Bob", "2024-01-01", CommitType::Bugfix, &[("src/app.rs", 3, 3)]),
            commit("Alice", "2024-01-06", CommitType::Bugfix, &[("src/lib.rs", 100, 20)]),
            commit("Carol", "bogus", CommitType::Other, &[]),
        ]
    }

    #[test]
    fn date_groupings_skip_undated_commits() {
        let commits = sample();
        assert_eq!(count_by_year(&commits), BTreeMap::from([(2023, 1), (2024, 2)]));

        let months = count_by_month(&commits);
        assert_eq!(months.len(), 12);
        assert_eq!(months[&1], 2);
        assert_eq!(months[&12], 1);
        assert_eq!(months[&6], 0);

        let periods: Vec<_> = count_by_year_month(&commits).into_iter().collect();
        assert_eq!(periods, vec![("2023-12".to_string(), 1), ("2024-01".to_string(), 2)]);
    }

    #[test]
    fn weekdays_are_ordered_and_complete() {
        // 2023-12-30 is a Saturday, 2024-01-01 a Monday, 2024-01-06 a Saturday.
        let days = count_by_weekday(&sample());
        assert_eq!(days.len(), 7);
        assert_eq!(days[0], (Weekday::Mon, 1));
        assert_eq!(days[5], (Weekday::Sat, 2));
        assert_eq!(days[6], (Weekday::Sun, 0));
    }

    #[test]
    fn author_stats_track_span_and_share() {
        let stats = author_stats(&sample());
        assert_eq!(stats.len(), 3);

        let alice = &stats[0];
        assert_eq!(alice.author, "Alice");
        assert_eq!(alice.commit_count, 2);
        assert_eq!(alice.first_commit, NaiveDate::from_ymd_opt(2023, 12, 30));
        assert_eq!(alice.last_commit, NaiveDate::from_ymd_opt(2024, 1, 6));
        assert_eq!(alice.active_days, 7);
        assert_eq!(alice.active_years, 2);
        assert_eq!(alice.tier, ContributorTier::Occasional);
        assert!((alice.commit_percentage - 50.0).abs() < 1e-9);

        let carol = stats.iter().find(|s| s.author == "Carol").unwrap();
        assert_eq!(carol.first_commit, None);
        assert_eq!(carol.active_days, 0);
        assert_eq!(carol.monthly_avg, 0.0);
        assert_eq!(carol.tier, ContributorTier::OneTime);

        assert!((stats.last().unwrap().cumulative_percentage - 100.0).abs() < 1e-9);
    }

    #[test]
    fn tier_counts_cover_every_tier() {
        let counts = tier_counts(&author_stats(&sample()));
        assert_eq!(counts.len(), 5);
        assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), 3);
    }

    #[test]
    fn file_stats_count_commits_lines_and_authors() {
        let stats = file_stats(&sample());
        assert_eq!(
            stats[0],
            FileStats {
                filename: "src/app.rs".into(),
                commit_count: 2,
                total_changed_lines: 66,
                author_count: 2,
            }
        );
        assert_eq!(stats.len(), 3);
    }

    #[test]
    fn type_stats_report_share_and_average() {
        let stats = type_stats(&sample());
        assert_eq!(stats[0].commit_type, CommitType::Bugfix);
        assert_eq!(stats[0].count, 2);
        assert!((stats[0].percentage - 50.0).abs() < 1e-9);
        assert_eq!(stats[0].total_changed_lines, 126);
        assert!((stats[0].avg_changed_lines - 63.0).abs() < 1e-9);
        assert_eq!(stats.iter().map(|s| s.count).sum::<usize>(), 4);
    }

    #[test]
    fn change_sizes_use_inclusive_bounds() {
        let commits = vec![
            commit("a", "2024-01-01", CommitType::Other, &[("x", 10, 0)]),
            commit("a", "2024-01-01", CommitType::Other, &[("x", 11, 0)]),
            commit("a", "2024-01-01", CommitType::Other, &[("x", 50, 50)]),
            commit("a", "2024-01-01", CommitType::Other, &[("x", 101, 0)]),
        ];
        assert_eq!(
            change_size_breakdown(&commits),
            ChangeSizeBreakdown { small: 1, medium: 2, large: 1 }
        );
    }

    #[test]
    fn contribution_patterns_compute_retention_and_newcomers() {
        let commits = sample();
        let authors = author_stats(&commits);
        let patterns = contribution_patterns(&commits, &authors, 2024);

        assert_eq!(patterns.total_commits, 4);
        assert_eq!(patterns.total_authors, 3);
        // 10% of three authors truncates to zero authors.
        assert_eq!(patterns.top_10_percent_contribution, 0.0);
        assert!((patterns.top_50_percent_commits - 50.0).abs() < 1e-9);
        assert_eq!(patterns.retention_rates, BTreeMap::from([(2023, 100.0)]));
        assert_eq!(patterns.yearly_new_authors, BTreeMap::from([(2023, 1), (2024, 1)]));
        assert_eq!(patterns.yearly_active_authors, BTreeMap::from([(2023, 1), (2024, 2)]));
        assert_eq!(patterns.total_unique_authors, 2);
    }
}
