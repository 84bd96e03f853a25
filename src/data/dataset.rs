use super::profiler::{ColumnProfile, profile_frame};
use crate::config::EngineSettings;
use anyhow::Result;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde_json::{Value, json};
use std::collections::HashMap;

/// A table together with its column profiles and free-form metadata.
///
/// `columns` always describes `data`: every mutation of the table goes
/// through [`Dataset::replace_data`] (or [`Dataset::refresh_columns`]), which
/// re-profiles it.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub data: DataFrame,
    pub metadata: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub columns: Vec<ColumnProfile>,
}

impl Dataset {
    pub fn new(data: DataFrame, metadata: HashMap<String, Value>) -> Result<Self> {
        let columns = profile_frame(&data)?;
        let now = Utc::now();
        Ok(Self {
            data,
            metadata,
            created_at: now,
            modified_at: now,
            columns,
        })
    }

    /// Rebuilds a dataset from saved parts.
    ///
    /// Saved profiles are kept only if they name the table's columns in order;
    /// otherwise they are derived again.
    pub fn from_parts(
        data: DataFrame,
        metadata: HashMap<String, Value>,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
        columns: Vec<ColumnProfile>,
    ) -> Result<Self> {
        let matches = columns.len() == data.width()
            && columns
                .iter()
                .zip(data.get_column_names())
                .all(|(profile, name)| profile.name == name.as_str());

        let columns = if matches {
            columns
        } else {
            tracing::warn!("Saved column profiles do not match the table, re-profiling");
            profile_frame(&data)?
        };

        Ok(Self {
            data,
            metadata,
            created_at,
            modified_at,
            columns,
        })
    }

    /// Records shape and column types into `metadata`, merging `source_info`
    /// on top. Returns a copy of the resulting metadata.
    pub fn generate_metadata(
        &mut self,
        source_info: Option<&HashMap<String, Value>>,
    ) -> HashMap<String, Value> {
        let column_types: serde_json::Map<String, Value> = self
            .columns
            .iter()
            .map(|c| (c.name.clone(), json!(c.original_type)))
            .collect();

        self.metadata.insert("rows".to_owned(), json!(self.data.height()));
        self.metadata.insert("columns".to_owned(), json!(self.data.width()));
        self.metadata
            .insert("column_types".to_owned(), Value::Object(column_types));

        if let Some(info) = source_info {
            for (key, value) in info {
                self.metadata.insert(key.clone(), value.clone());
            }
        }

        self.modified_at = Utc::now();
        self.metadata.clone()
    }

    /// First `n` rows (fewer if the table is shorter).
    pub fn get_preview(&self, n: usize) -> DataFrame {
        self.data.head(Some(n))
    }

    pub fn preview(&self, settings: &EngineSettings) -> DataFrame {
        self.get_preview(settings.preview_rows)
    }

    /// Column names and storage dtypes, in table order.
    pub fn get_column_types(&self) -> Vec<(String, String)> {
        self.data
            .get_columns()
            .iter()
            .map(|c| (c.name().to_string(), c.dtype().to_string()))
            .collect()
    }

    pub fn get_column_by_name(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn refresh_columns(&mut self) -> Result<()> {
        self.columns = profile_frame(&self.data)?;
        self.modified_at = Utc::now();
        Ok(())
    }

    /// Swaps in a new table (e.g. a pipeline's output) and re-profiles it.
    pub fn replace_data(&mut self, data: DataFrame) -> Result<()> {
        self.data = data;
        self.refresh_columns()
    }

    pub fn row_count(&self) -> usize {
        self.data.height()
    }

    pub fn column_count(&self) -> usize {
        self.data.width()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::profiler::SemanticType;

    fn sample() -> Result<Dataset> {
        let df = df!(
            "id" => (1..=12).collect::<Vec<i64>>(),
            "name" => (1..=12).map(|i| format!("row{i}")).collect::<Vec<_>>()
        )?;
        Dataset::new(df, HashMap::new())
    }

    #[test]
    fn test_new_profiles_every_column() -> Result<()> {
        let ds = sample()?;
        assert_eq!(ds.row_count(), 12);
        assert_eq!(ds.column_count(), 2);
        assert_eq!(
            ds.get_column_types(),
            vec![
                ("id".to_owned(), "i64".to_owned()),
                ("name".to_owned(), "str".to_owned())
            ]
        );
        assert_eq!(ds.columns[0].data_type, SemanticType::Numeric);
        assert!(ds.get_column_by_name("id").is_some());
        assert!(ds.get_column_by_name("missing").is_none());
        Ok(())
    }

    #[test]
    fn test_preview_bounds() -> Result<()> {
        let ds = sample()?;
        assert_eq!(ds.preview(&EngineSettings::default()).height(), 10);
        assert_eq!(ds.get_preview(3).height(), 3);
        assert_eq!(ds.get_preview(100).height(), 12);
        Ok(())
    }

    #[test]
    fn test_generate_metadata_merges_source_info() -> Result<()> {
        let mut ds = sample()?;
        let source: HashMap<String, Value> =
            [("source".to_owned(), json!("test.csv"))].into_iter().collect();

        let meta = ds.generate_metadata(Some(&source));
        assert_eq!(meta["rows"], json!(12));
        assert_eq!(meta["columns"], json!(2));
        assert_eq!(meta["source"], json!("test.csv"));
        assert_eq!(meta["column_types"]["id"], json!("i64"));
        assert_eq!(ds.metadata, meta);
        assert!(ds.modified_at >= ds.created_at);
        Ok(())
    }

    #[test]
    fn test_from_parts_rejects_stale_profiles() -> Result<()> {
        let ds = sample()?;
        let mut stale = ds.columns.clone();
        stale.reverse();

        let rebuilt = Dataset::from_parts(
            ds.data.clone(),
            HashMap::new(),
            ds.created_at,
            ds.modified_at,
            stale,
        )?;
        assert_eq!(rebuilt.columns, ds.columns);

        let kept = Dataset::from_parts(
            ds.data.clone(),
            ds.metadata.clone(),
            ds.created_at,
            ds.modified_at,
            ds.columns.clone(),
        )?;
        assert_eq!(kept.columns, ds.columns);
        assert_eq!(kept.created_at, ds.created_at);
        Ok(())
    }

    #[test]
    fn test_replace_data_reprofiles() -> Result<()> {
        let mut ds = sample()?;
        let df = df!("score" => &[Some(1.5), None])?;
        ds.replace_data(df)?;

        assert_eq!(ds.column_count(), 1);
        let score = ds.get_column_by_name("score").map(|c| c.stats.null_count);
        assert_eq!(score, Some(1));
        Ok(())
    }
}
