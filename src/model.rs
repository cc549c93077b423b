use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PulseError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub filename: String,
    pub additions: u32,
    pub deletions: u32,
    /// Set when git reported `-` instead of line counts.
    pub binary: bool,
}

impl FileChange {
    pub fn changed_lines(&self) -> u64 {
        self.additions as u64 + self.deletions as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub author: String,
    pub date: Option<NaiveDate>,
    pub subject: String,
    pub changed_files: Vec<FileChange>,
    pub additions: u64,
    pub deletions: u64,
    pub commit_type: CommitType,
}

impl CommitRecord {
    pub fn new(hash: String, author: String, date: Option<NaiveDate>, subject: String) -> Self {
        Self {
            hash,
            author,
            date,
            subject,
            changed_files: Vec::new(),
            additions: 0,
            deletions: 0,
            commit_type: CommitType::Other,
        }
    }

    /// Appends a file change and keeps the commit totals in step with it.
    pub fn push_change(&mut self, change: FileChange) {
        self.additions += change.additions as u64;
        self.deletions += change.deletions as u64;
        self.changed_files.push(change);
    }

    pub fn changed_lines(&self) -> u64 {
        self.additions + self.deletions
    }

    pub fn file_count(&self) -> usize {
        self.changed_files.len()
    }

    pub fn year(&self) -> Option<i32> {
        self.date.map(|d| d.year())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
    Feature,
    Bugfix,
    Refactor,
    Documentation,
    Test,
    Style,
    Chore,
    Performance,
    Other,
}

impl CommitType {
    /// Every category that has patterns, in the default matching priority.
    pub const PRIORITY: [CommitType; 8] = [
        CommitType::Feature,
        CommitType::Bugfix,
        CommitType::Refactor,
        CommitType::Documentation,
        CommitType::Test,
        CommitType::Style,
        CommitType::Chore,
        CommitType::Performance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommitType::Feature => "feature",
            CommitType::Bugfix => "bugfix",
            CommitType::Refactor => "refactor",
            CommitType::Documentation => "documentation",
            CommitType::Test => "test",
            CommitType::Style => "style",
            CommitType::Chore => "chore",
            CommitType::Performance => "performance",
            CommitType::Other => "other",
        }
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitType {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "feature" => Ok(CommitType::Feature),
            "bugfix" => Ok(CommitType::Bugfix),
            "refactor" => Ok(CommitType::Refactor),
            "documentation" => Ok(CommitType::Documentation),
            "test" => Ok(CommitType::Test),
            "style" => Ok(CommitType::Style),
            "chore" => Ok(CommitType::Chore),
            "performance" => Ok(CommitType::Performance),
            "other" => Ok(CommitType::Other),
            other => Err(PulseError::Parse(format!("Unknown commit type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContributorTier {
    Core,
    Active,
    Regular,
    Occasional,
    #[serde(rename = "One-time")]
    OneTime,
}

impl ContributorTier {
    pub const ALL: [ContributorTier; 5] = [
        ContributorTier::Core,
        ContributorTier::Active,
        ContributorTier::Regular,
        ContributorTier::Occasional,
        ContributorTier::OneTime,
    ];

    /// Thresholds are checked top to bottom; the first match wins.
    pub fn classify(commit_count: usize, active_days: i64) -> Self {
        if commit_count >= 100 && active_days >= 365 {
            ContributorTier::Core
        } else if commit_count >= 50 {
            ContributorTier::Active
        } else if commit_count >= 10 {
            ContributorTier::Regular
        } else if commit_count >= 2 {
            ContributorTier::Occasional
        } else {
            ContributorTier::OneTime
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContributorTier::Core => "Core",
            ContributorTier::Active => "Active",
            ContributorTier::Regular => "Regular",
            ContributorTier::Occasional => "Occasional",
            ContributorTier::OneTime => "One-time",
        }
    }
}

impl fmt::Display for ContributorTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionKind {
    Major,
    Minor,
    Patch,
    Prerelease,
    Unknown,
}

impl VersionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionKind::Major => "major",
            VersionKind::Minor => "minor",
            VersionKind::Patch => "patch",
            VersionKind::Prerelease => "prerelease",
            VersionKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for VersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: Option<u64>,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
    pub kind: VersionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub tag: String,
    pub date: NaiveDate,
    pub subject: String,
    pub version: Version,
    pub days_since_previous: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugRecord {
    pub number: u64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub duration_hours: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DateRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new() -> Self {
        Self { since: None, until: None }
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    /// `--since`/`--until` arguments understood by `git log` and `git rev-list`.
    pub fn git_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(since) = self.since {
            args.push(format!("--since={}", since.to_rfc3339()));
        }
        if let Some(until) = self.until {
            args.push(format!("--until={}", until.to_rfc3339()));
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn push_change_keeps_totals_in_sync() {
        let mut record = CommitRecord::new("abc".into(), "Alice".into(), None, "Fix".into());
        record.push_change(FileChange { filename: "a".into(), additions: 3, deletions: 1, binary: false });
        record.push_change(FileChange { filename: "b".into(), additions: 0, deletions: 0, binary: true });
        record.push_change(FileChange { filename: "c".into(), additions: 7, deletions: 4, binary: false });

        assert_eq!(record.additions, 10);
        assert_eq!(record.deletions, 5);
        assert_eq!(record.changed_lines(), 15);
        assert_eq!(record.file_count(), 3);
    }

    #[test]
    fn tiers_apply_thresholds_in_order() {
        assert_eq!(ContributorTier::classify(150, 400), ContributorTier::Core);
        // Plenty of commits but a short active window falls through to Active.
        assert_eq!(ContributorTier::classify(150, 100), ContributorTier::Active);
        assert_eq!(ContributorTier::classify(50, 0), ContributorTier::Active);
        assert_eq!(ContributorTier::classify(49, 2000), ContributorTier::Regular);
        assert_eq!(ContributorTier::classify(10, 0), ContributorTier::Regular);
        assert_eq!(ContributorTier::classify(2, 0), ContributorTier::Occasional);
        assert_eq!(ContributorTier::classify(1, 0), ContributorTier::OneTime);
    }

    #[test]
    fn tiers_are_total_over_commit_counts() {
        for commits in 1..=200 {
            for days in [0, 1, 364, 365, 3650] {
                let tier = ContributorTier::classify(commits, days);
                assert!(ContributorTier::ALL.contains(&tier));
                assert_eq!(tier, ContributorTier::classify(commits, days));
            }
        }
    }

    #[test]
    fn commit_type_round_trips_through_names() {
        for ty in CommitType::PRIORITY.iter().chain(std::iter::once(&CommitType::Other)) {
            assert_eq!(ty.as_str().parse::<CommitType>().unwrap(), *ty);
        }
        assert!("misc".parse::<CommitType>().is_err());
    }

    #[test]
    fn date_range_becomes_git_args() {
        let range = DateRange::new()
            .with_since(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .with_until(Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap());
        assert_eq!(
            range.git_args(),
            vec![
                "--since=2024-01-01T00:00:00+00:00".to_string(),
                "--until=2024-12-31T00:00:00+00:00".to_string(),
            ]
        );
        assert!(DateRange::new().git_args().is_empty());
    }
}
