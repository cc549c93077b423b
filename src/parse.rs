//! Lenient parser for `git log --pretty=format:%H|%an|%ad|%s --date=short --numstat`.
//!
//! Malformed input never aborts a run. Every line that had to be skipped or
//! defaulted is reported as a [`ParseWarning`] next to the parsed commits.

use crate::model::{CommitRecord, FileChange};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

pub const FIELD_SEPARATOR: char = '|';
pub const PRETTY_FORMAT: &str = "%H|%an|%ad|%s";
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const BINARY_PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    MalformedHeader { line: usize, fields: usize },
    MalformedStat { line: usize, fields: usize },
    InvalidNumber { line: usize, value: String },
    InvalidDate { line: usize, value: String },
    OrphanStat { line: usize },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::MalformedHeader { line, fields } => {
                write!(f, "line {line}: header has {fields} fields, expected 4")
            }
            ParseWarning::MalformedStat { line, fields } => {
                write!(f, "line {line}: stat line has {fields} fields, expected 3")
            }
            ParseWarning::InvalidNumber { line, value } => {
                write!(f, "line {line}: '{value}' is not a line count, using 0")
            }
            ParseWarning::InvalidDate { line, value } => {
                write!(f, "line {line}: '{value}' is not a date")
            }
            ParseWarning::OrphanStat { line } => {
                write!(f, "line {line}: stat line without a commit header")
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedLog {
    pub commits: Vec<CommitRecord>,
    pub warnings: Vec<ParseWarning>,
}

enum LineKind {
    Header,
    Stat,
    Ignored,
}

fn line_kind(line: &str) -> LineKind {
    if line.contains('\t') {
        LineKind::Stat
    } else if line.contains(FIELD_SEPARATOR) {
        LineKind::Header
    } else {
        LineKind::Ignored
    }
}

/// Parse raw log text into commit records, in input order.
pub fn parse_log(text: &str) -> ParsedLog {
    let mut parsed = ParsedLog::default();
    let mut current: Option<CommitRecord> = None;
    // Stat lines following a rejected header must not leak into the previous commit.
    let mut in_rejected_block = false;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }

        match line_kind(raw) {
            LineKind::Header => {
                if let Some(done) = current.take() {
                    parsed.commits.push(done);
                }
                match parse_header(raw, line_no, &mut parsed.warnings) {
                    Some(record) => {
                        current = Some(record);
                        in_rejected_block = false;
                    }
                    None => in_rejected_block = true,
                }
            }
            LineKind::Stat => match current.as_mut() {
                Some(record) => {
                    if let Some(change) = parse_stat(raw, line_no, &mut parsed.warnings) {
                        record.push_change(change);
                    }
                }
                None if in_rejected_block => {}
                None => parsed.warnings.push(ParseWarning::OrphanStat { line: line_no }),
            },
            LineKind::Ignored => {}
        }
    }

    if let Some(done) = current.take() {
        parsed.commits.push(done);
    }

    parsed
}

fn parse_header(line: &str, line_no: usize, warnings: &mut Vec<ParseWarning>) -> Option<CommitRecord> {
    let parts: Vec<&str> = line.splitn(4, FIELD_SEPARATOR).map(str::trim).collect();
    if parts.len() != 4 {
        warnings.push(ParseWarning::MalformedHeader { line: line_no, fields: parts.len() });
        return None;
    }

    let date = match NaiveDate::parse_from_str(parts[2], DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            warnings.push(ParseWarning::InvalidDate { line: line_no, value: parts[2].to_string() });
            None
        }
    };

    Some(CommitRecord::new(
        parts[0].to_string(),
        parts[1].to_string(),
        date,
        parts[3].to_string(),
    ))
}

fn parse_stat(line: &str, line_no: usize, warnings: &mut Vec<ParseWarning>) -> Option<FileChange> {
    let parts: Vec<&str> = line.trim().split('\t').collect();
    if parts.len() != 3 {
        warnings.push(ParseWarning::MalformedStat { line: line_no, fields: parts.len() });
        return None;
    }

    let binary = parts[0] == BINARY_PLACEHOLDER || parts[1] == BINARY_PLACEHOLDER;
    let additions = parse_count(parts[0], line_no, warnings);
    let deletions = parse_count(parts[1], line_no, warnings);

    Some(FileChange {
        filename: parts[2].to_string(),
        additions,
        deletions,
        binary,
    })
}

fn parse_count(value: &str, line_no: usize, warnings: &mut Vec<ParseWarning>) -> u32 {
    if value == BINARY_PLACEHOLDER {
        return 0;
    }
    match value.parse::<u32>() {
        Ok(n) => n,
        Err(_) => {
            warnings.push(ParseWarning::InvalidNumber { line: line_no, value: value.to_string() });
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_single_commit_with_numstat() {
        let parsed = parse_log("abc123|Alice|2024-01-05|Fix crash\n10\t2\tsrc/app.py\n");

        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.commits.len(), 1);
        let commit = &parsed.commits[0];
        assert_eq!(commit.hash, "abc123");
        assert_eq!(commit.author, "Alice");
        assert_eq!(commit.date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(commit.subject, "Fix crash");
        assert_eq!(
            commit.changed_files,
            vec![FileChange { filename: "src/app.py".into(), additions: 10, deletions: 2, binary: false }]
        );
        assert_eq!((commit.additions, commit.deletions), (10, 2));
    }

    #[test]
    fn one_record_per_header_in_input_order() {
        let text = "\
c3|Carol|2024-03-01|Third
1\t1\ta.txt

c2|Bob|2024-02-01|Second
c1|Alice|2024-01-01|First
4\t0\tb.txt
2\t5\tc.txt";
        let parsed = parse_log(text);
        let hashes: Vec<&str> = parsed.commits.iter().map(|c| c.hash.as_str()).collect();
        assert_eq!(hashes, vec!["c3", "c2", "c1"]);
        assert_eq!(parsed.commits[1].file_count(), 0);
        assert_eq!(parsed.commits[2].additions, 6);
        assert_eq!(parsed.commits[2].deletions, 5);
    }

    #[test]
    fn last_record_is_flushed_without_trailing_newline() {
        let parsed = parse_log("h1|A|2024-01-01|One\n3\t3\tx");
        assert_eq!(parsed.commits.len(), 1);
        assert_eq!(parsed.commits[0].changed_lines(), 6);
    }

    #[test]
    fn binary_placeholder_counts_as_zero() {
        let parsed = parse_log("h1|A|2024-01-01|Logo\n-\t-\tlogo.png\n5\t1\tREADME.md\n");
        let commit = &parsed.commits[0];
        assert!(parsed.warnings.is_empty());
        assert!(commit.changed_files[0].binary);
        assert_eq!(commit.changed_files[0].changed_lines(), 0);
        assert_eq!((commit.additions, commit.deletions), (5, 1));
    }

    #[test]
    fn garbage_numbers_default_to_zero_with_warning() {
        let parsed = parse_log("h1|A|2024-01-01|X\nabc\t4\tfile.rs\n");
        let change = &parsed.commits[0].changed_files[0];
        assert_eq!((change.additions, change.deletions, change.binary), (0, 4, false));
        assert_eq!(
            parsed.warnings,
            vec![ParseWarning::InvalidNumber { line: 2, value: "abc".into() }]
        );
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let text = "\
h1|A|2024-01-01|Good
1\t2
bad|header
9\t9\tignored.rs
h2|B|not-a-date|Still parsed
1\t1\tkept.rs";
        let parsed = parse_log(text);

        assert_eq!(parsed.commits.len(), 2);
        assert_eq!(parsed.commits[0].file_count(), 0);
        assert_eq!(parsed.commits[1].date, None);
        assert_eq!(parsed.commits[1].file_count(), 1);
        assert_eq!(
            parsed.warnings,
            vec![
                ParseWarning::MalformedStat { line: 2, fields: 2 },
                ParseWarning::MalformedHeader { line: 3, fields: 2 },
                ParseWarning::InvalidDate { line: 5, value: "not-a-date".into() },
            ]
        );
    }

    #[test]
    fn subject_keeps_extra_separators() {
        let parsed = parse_log("h1|A|2024-01-01|Merge a|b into c");
        assert_eq!(parsed.commits[0].subject, "Merge a|b into c");
    }

    #[test]
    fn stat_lines_before_any_header_are_reported() {
        let parsed = parse_log("1\t1\tearly.rs\nh1|A|2024-01-01|X");
        assert_eq!(parsed.commits.len(), 1);
        assert_eq!(parsed.warnings, vec![ParseWarning::OrphanStat { line: 1 }]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let parsed = parse_log("");
        assert!(parsed.commits.is_empty());
        assert!(parsed.warnings.is_empty());
    }
}
