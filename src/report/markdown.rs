use crate::error::Result;
use std::fmt::Write as _;
use std::path::Path;

/// Small builder for the per-analysis markdown reports.
#[derive(Debug, Default, Clone)]
pub struct MarkdownDoc {
    buf: String,
}

impl MarkdownDoc {
    pub fn new(title: &str) -> Self {
        let mut doc = Self::default();
        let _ = writeln!(doc.buf, "# {title}\n");
        doc
    }

    pub fn heading(mut self, text: &str) -> Self {
        let _ = writeln!(self.buf, "## {text}\n");
        self
    }

    pub fn subheading(mut self, text: &str) -> Self {
        let _ = writeln!(self.buf, "### {text}\n");
        self
    }

    pub fn paragraph(mut self, text: &str) -> Self {
        let _ = writeln!(self.buf, "{text}\n");
        self
    }

    /// `- **label**: value`
    pub fn field(mut self, label: &str, value: impl std::fmt::Display) -> Self {
        let _ = writeln!(self.buf, "- **{label}**: {value}");
        self
    }

    pub fn bullet(mut self, text: &str) -> Self {
        let _ = writeln!(self.buf, "- {text}");
        self
    }

    /// Ends a run of `field`/`bullet` lines.
    pub fn gap(mut self) -> Self {
        self.buf.push('\n');
        self
    }

    pub fn table<R, C>(mut self, headers: &[&str], rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = String>,
    {
        let _ = writeln!(self.buf, "| {} |", headers.join(" | "));
        let _ = writeln!(self.buf, "|{}", "---|".repeat(headers.len()));
        for row in rows {
            let cells: Vec<String> = row.into_iter().map(|c| escape_cell(&c)).collect();
            let _ = writeln!(self.buf, "| {} |", cells.join(" | "));
        }
        self.buf.push('\n');
        self
    }

    pub fn code_block(mut self, text: &str) -> Self {
        let _ = writeln!(self.buf, "```text\n{}\n```\n", text.trim_end());
        self
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        super::write_text(path, &self.buf)
    }
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builds_sections_in_order() {
        let doc = MarkdownDoc::new("Basic commit statistics")
            .heading("Overview")
            .field("Total commits", 42)
            .field("First commit", "2010-04-06")
            .gap()
            .table(
                &["Year", "Commits"],
                vec![vec!["2010".to_string(), "40".to_string()], vec!["2011".to_string(), "2".to_string()]],
            );

        assert_eq!(
            doc.as_str(),
            "# Basic commit statistics\n\n## Overview\n\n\
             - **Total commits**: 42\n- **First commit**: 2010-04-06\n\n\
             | Year | Commits |\n|---|---|\n| 2010 | 40 |\n| 2011 | 2 |\n\n"
        );
    }

    #[test]
    fn pipes_in_cells_are_escaped() {
        let doc = MarkdownDoc::default().table(&["Subject"], vec![vec!["a|b".to_string()]]);
        assert!(doc.as_str().contains("| a\\|b |"));
    }
}
