use crate::error::{PulseError, Result};
use crate::model::{CommitRecord, CommitType};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

static DEFAULT_CLASSIFIER: Lazy<Classifier> = Lazy::new(Classifier::default);

fn patterns_for(commit_type: CommitType) -> &'static [&'static str] {
    match commit_type {
        CommitType::Feature => &[r"add\b", r"feat\b", r"feature\b", r"new\b", r"implement\b"],
        CommitType::Bugfix => &[r"fix\b", r"bug\b", r"issue\b", r"error\b", r"bugfix\b"],
        CommitType::Refactor => &[r"refactor\b", r"cleanup\b", r"clean\b", r"optimize\b"],
        CommitType::Documentation => &[r"docs?\b", r"documentation\b", r"readme\b", r"comment\b"],
        CommitType::Test => &[r"tests?\b", r"unit\b", r"coverage\b", r"fixture\b"],
        CommitType::Style => &[r"style\b", r"format\b", r"pep8\b", r"whitespace\b"],
        CommitType::Chore => &[r"chore\b", r"bump\b", r"update\b.*version", r"dependency\b"],
        CommitType::Performance => &[r"performance\b", r"optimization\b", r"speed\b"],
        CommitType::Other => &[],
    }
}

/// Greedy first-match classifier over ordered pattern groups.
///
/// A subject matching several groups gets the label of the group that comes
/// first in the priority list, so "Add fix for timeout" is a feature under
/// the default order.
#[derive(Debug, Clone)]
pub struct Classifier {
    groups: Vec<(CommitType, Vec<Regex>)>,
}

impl Classifier {
    /// Build a classifier whose groups are tried in `priority` order.
    ///
    /// Categories missing from `priority` are appended in their default
    /// order. `other` has no patterns and is ignored.
    pub fn with_priority(priority: &[CommitType]) -> Result<Self> {
        let mut seen = HashSet::new();
        for ty in priority {
            if !seen.insert(*ty) {
                return Err(PulseError::Config(format!(
                    "commit type '{ty}' appears twice in classifier priority"
                )));
            }
        }

        let order = priority
            .iter()
            .copied()
            .chain(CommitType::PRIORITY.iter().copied().filter(|ty| !priority.contains(ty)))
            .filter(|ty| *ty != CommitType::Other);

        let mut groups = Vec::new();
        for ty in order {
            let regexes = patterns_for(ty)
                .iter()
                .map(|p| {
                    RegexBuilder::new(p)
                        .case_insensitive(true)
                        .build()
                        .map_err(|e| PulseError::Parse(format!("bad pattern {p}: {e}")))
                })
                .collect::<Result<Vec<_>>>()?;
            groups.push((ty, regexes));
        }

        Ok(Self { groups })
    }

    pub fn order(&self) -> Vec<CommitType> {
        self.groups.iter().map(|(ty, _)| *ty).collect()
    }

    pub fn classify(&self, subject: &str) -> CommitType {
        if subject.trim().is_empty() {
            return CommitType::Other;
        }
        self.groups
            .iter()
            .find(|(_, regexes)| regexes.iter().any(|re| re.is_match(subject)))
            .map(|(ty, _)| *ty)
            .unwrap_or(CommitType::Other)
    }

    pub fn apply(&self, commits: &mut [CommitRecord]) {
        for commit in commits {
            commit.commit_type = self.classify(&commit.subject);
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::with_priority(&CommitType::PRIORITY).expect("valid default patterns")
    }
}

/// Classify with the default priority order.
pub fn classify_subject(subject: &str) -> CommitType {
    DEFAULT_CLASSIFIER.classify(subject)
}
