use super::transformation::DataTransformation;
use crate::config::EngineSettings;
use anyhow::{Context as _, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// An ordered list of column transformations applied in sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformationPipeline {
    transformations: Vec<DataTransformation>,
}

impl TransformationPipeline {
    pub fn new(transformations: Vec<DataTransformation>) -> Self {
        Self { transformations }
    }

    pub fn add(&mut self, step: DataTransformation) {
        self.transformations.push(step);
    }

    /// Inserts before `index`, appending when `index` is past the end.
    pub fn insert(&mut self, index: usize, step: DataTransformation) {
        let index = index.min(self.transformations.len());
        self.transformations.insert(index, step);
    }

    /// Removes the step at `index`; out-of-range indices are ignored.
    pub fn remove_at(&mut self, index: usize) -> Option<DataTransformation> {
        (index < self.transformations.len()).then(|| self.transformations.remove(index))
    }

    pub fn clear(&mut self) {
        self.transformations.clear();
    }

    pub fn get(&self, index: usize) -> Option<&DataTransformation> {
        self.transformations.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut DataTransformation> {
        self.transformations.get_mut(index)
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.transformations
            .iter()
            .map(DataTransformation::get_description)
            .collect()
    }

    pub fn apply_all(&self, df: &DataFrame) -> DataFrame {
        self.apply_all_with(df, &EngineSettings::default())
    }

    /// Folds every step over `df` in order. The input is never modified.
    pub fn apply_all_with(&self, df: &DataFrame, settings: &EngineSettings) -> DataFrame {
        let mut result = df.clone();
        for (idx, step) in self.transformations.iter().enumerate() {
            tracing::debug!("Step {}: {}", idx + 1, step.get_description());
            result = step.apply_with(&result, settings);
        }

        if !self.transformations.is_empty() {
            tracing::info!(
                "Applied {} transformation(s), result has {} rows x {} columns",
                self.transformations.len(),
                result.height(),
                result.width()
            );
        }
        result
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize pipeline")
    }

    /// Loads a saved pipeline. Steps that do not parse (an unknown
    /// operation id, a malformed entry) are dropped with a warning.
    pub fn from_json(json: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Saved {
            #[serde(default)]
            transformations: Vec<serde_json::Value>,
        }

        let saved: Saved = serde_json::from_str(json).context("Failed to deserialize pipeline")?;
        let mut transformations = Vec::with_capacity(saved.transformations.len());
        for (idx, raw) in saved.transformations.into_iter().enumerate() {
            match serde_json::from_value::<DataTransformation>(raw) {
                Ok(step) => transformations.push(step),
                Err(e) => tracing::warn!("Dropping pipeline step {}: {e}", idx + 1),
            }
        }
        Ok(Self::new(transformations))
    }

    pub fn len(&self) -> usize {
        self.transformations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataTransformation> {
        self.transformations.iter()
    }
}
