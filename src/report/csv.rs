use crate::error::Result;
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;

/// One CSV row per item, header taken from the field names.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = ::csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    tracing::info!(path = %path.display(), rows = rows.len(), "wrote csv");
    Ok(())
}

/// Two-column `key,count` table.
pub fn write_counts<K: Display, V: Display>(
    path: &Path,
    headers: [&str; 2],
    rows: impl IntoIterator<Item = (K, V)>,
) -> Result<()> {
    let mut wtr = ::csv::Writer::from_path(path)?;
    wtr.write_record(headers)?;
    let mut n = 0usize;
    for (key, value) in rows {
        wtr.write_record([key.to_string(), value.to_string()])?;
        n += 1;
    }
    wtr.flush()?;
    tracing::info!(path = %path.display(), rows = n, "wrote csv");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Serialize)]
    struct Row {
        author: String,
        commits: usize,
    }

    #[test]
    fn serializes_structs_with_header() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("rows.csv");
        let rows = vec![
            Row { author: "Alice".into(), commits: 3 },
            Row { author: "Bob, Jr.".into(), commits: 1 },
        ];
        write_rows(&path, &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "author,commits\nAlice,3\n\"Bob, Jr.\",1\n");
    }

    #[test]
    fn writes_key_value_pairs() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("yearly.csv");
        write_counts(&path, ["year", "commits"], [(2023, 4), (2024, 9)]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "year,commits\n2023,4\n2024,9\n");
    }
}
