use super::catalog::{ColumnOperation, OperationKind, Parameters};
use crate::config::EngineSettings;
use anyhow::{Context as _, Result, bail};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One pipeline step: an operation applied to a single named column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTransformation {
    pub column: String,
    pub operation: OperationKind,
    #[serde(default)]
    pub parameters: Parameters,
}

impl DataTransformation {
    pub fn new(column: impl Into<String>, operation: OperationKind, parameters: Parameters) -> Self {
        Self {
            column: column.into(),
            operation,
            parameters,
        }
    }

    /// A step pre-filled with the catalog's default parameters.
    pub fn with_defaults(
        column: impl Into<String>,
        operation: OperationKind,
        settings: &EngineSettings,
    ) -> Self {
        Self::new(column, operation, operation.default_parameters(settings))
    }

    pub fn set_parameter(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.parameters.insert(key.into(), value.into());
    }

    /// Applies the step with default settings.
    pub fn apply(&self, df: &DataFrame) -> DataFrame {
        self.apply_with(df, &EngineSettings::default())
    }

    /// Returns a new table with the target column replaced.
    ///
    /// A missing column, a malformed parameter or a failing operation all
    /// leave the table unchanged; the failure is logged as a warning.
    pub fn apply_with(&self, df: &DataFrame, settings: &EngineSettings) -> DataFrame {
        if df.column(&self.column).is_err() {
            tracing::debug!(
                "Skipping {} on '{}': column not found",
                self.operation,
                self.column
            );
            return df.clone();
        }

        match self.try_apply(df, settings) {
            Ok(out) => out,
            Err(e) => {
                tracing::warn!("{} left unchanged: {e:#}", self.get_description());
                df.clone()
            }
        }
    }

    fn try_apply(&self, df: &DataFrame, settings: &EngineSettings) -> Result<DataFrame> {
        let op = ColumnOperation::from_parameters(self.operation, &self.parameters, settings)
            .with_context(|| format!("Invalid parameters for {}", self.operation))?;

        let original = df.column(&self.column)?.as_materialized_series();
        let result = op.apply(original, settings)?;
        if result.len() != original.len() {
            bail!(
                "{} changed the length of '{}' from {} to {}",
                self.operation,
                self.column,
                original.len(),
                result.len()
            );
        }

        let mut out = df.clone();
        out.with_column(result.with_name(self.column.as_str().into()))?;
        Ok(out)
    }

    /// Human-readable summary, e.g. `Numeric Round on 'price' (decimals=2)`.
    ///
    /// Null, empty-string and default-valued parameters are left out; the
    /// rest are listed in key order.
    pub fn get_description(&self) -> String {
        let defaults = self.operation.default_parameters(&EngineSettings::default());
        let params: Vec<String> = self
            .parameters
            .iter()
            .filter(|(_, v)| !v.is_null() && v.as_str() != Some(""))
            .filter(|(k, v)| !defaults.get(*k).is_some_and(|d| same_value(d, v)))
            .map(|(k, v)| match v {
                Value::String(s) => format!("{k}={s}"),
                other => format!("{k}={other}"),
            })
            .collect();

        let mut description = format!("{} on '{}'", self.operation.display_name(), self.column);
        if !params.is_empty() {
            description.push_str(&format!(" ({})", params.join(", ")));
        }
        description
    }
}

/// JSON equality that treats `3` and `3.0` as the same number.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

impl std::fmt::Display for DataTransformation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get_description())
    }
}
