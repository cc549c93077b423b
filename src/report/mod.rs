//! Files written by the analyses: CSV tables and JSON dumps under `data/`,
//! text charts under `figures/`, markdown under `reports/`.

pub mod chart;
pub mod csv;
pub mod markdown;

use crate::error::Result;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub use markdown::MarkdownDoc;

#[derive(Debug, Clone)]
pub struct OutputDirs {
    pub root: PathBuf,
    pub data: PathBuf,
    pub figures: PathBuf,
    pub reports: PathBuf,
}

impl OutputDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            data: root.join("data"),
            figures: root.join("figures"),
            reports: root.join("reports"),
            root,
        }
    }

    /// Nothing touches the disk until an analysis has something to write.
    pub fn ensure(&self) -> Result<()> {
        for dir in [&self.data, &self.figures, &self.reports] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn data_file(&self, name: &str) -> PathBuf {
        self.data.join(name)
    }

    pub fn figure_file(&self, name: &str) -> PathBuf {
        self.figures.join(name)
    }

    pub fn report_file(&self, name: &str) -> PathBuf {
        self.reports.join(name)
    }
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text)?;
    tracing::info!(path = %path.display(), "wrote json");
    Ok(())
}

pub fn write_text(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text)?;
    tracing::info!(path = %path.display(), "wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdirectories_are_created_on_demand() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = OutputDirs::new(tmp.path().join("analysis"));
        assert!(!dirs.root.exists());

        dirs.ensure().unwrap();
        assert!(dirs.data.is_dir());
        assert!(dirs.figures.is_dir());
        assert!(dirs.reports.is_dir());
        assert_eq!(dirs.data_file("x.csv"), tmp.path().join("analysis/data/x.csv"));
    }

    #[test]
    fn json_is_pretty_printed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.json");
        write_json(&path, &serde_json::json!({"total": 3})).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"total\": 3"));
    }
}
