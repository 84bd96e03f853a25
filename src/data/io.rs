use anyhow::{Context as _, Result};
use polars::prelude::*;
use std::path::Path;

/// Reads a CSV file with a header row. Column types are whatever polars
/// infers; no date detection is attempted.
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    LazyCsvReader::new(path)
        .with_infer_schema_length(Some(10000))
        .with_has_header(true)
        .finish()?
        .collect()
        .with_context(|| format!("Failed to read CSV {}", path.display()))
}

pub fn save_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    CsvWriter::new(file)
        .include_header(true)
        .finish(df)
        .context("Failed to write CSV file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("data.csv");
        let mut df = df!("a" => &[1i64, 2], "b" => &["x", "y"])?;

        save_csv(&mut df, &path)?;
        let loaded = load_csv(&path)?;
        assert!(loaded.equals(&df));
        Ok(())
    }
}
