//! Single-column subsampling on the column's sorted distinct values, used to
//! thin out a chart's category axis.

use super::clause::FilterValue;
use super::engine::ClauseOutcome;
use super::mask::RowMask;
use crate::data::values::{Scalar, scalar_values, text_values};
use anyhow::{Result, anyhow};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisFilterKind {
    EveryNth,
    SpecificValues,
    FirstN,
    LastN,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisFilter {
    #[serde(rename = "type")]
    pub kind: AxisFilterKind,
    #[serde(default)]
    pub value: Option<FilterValue>,
}

impl AxisFilter {
    pub fn new(kind: AxisFilterKind, value: impl Into<FilterValue>) -> Self {
        Self {
            kind,
            value: Some(value.into()),
        }
    }

    /// Rows of `df` whose `column` value survives the filter. A filter that
    /// cannot be evaluated keeps every row.
    pub fn apply(&self, df: &DataFrame, column: &str) -> Result<DataFrame> {
        match self.evaluate(df, column) {
            ClauseOutcome::Mask(mask) => Ok(df.filter(&mask.to_chunked())?),
            ClauseOutcome::NoOp => Ok(df.clone()),
            ClauseOutcome::Skipped(reason) => {
                tracing::warn!("Skipping axis filter on '{column}': {reason}");
                Ok(df.clone())
            }
        }
    }

    pub fn evaluate(&self, df: &DataFrame, column: &str) -> ClauseOutcome {
        let Ok(col) = df.column(column) else {
            return ClauseOutcome::Skipped("column not found".to_owned());
        };
        let Some(value) = self.value.as_ref().filter(|v| !v.is_empty()) else {
            return ClauseOutcome::NoOp;
        };
        self.mask(col.as_materialized_series(), value)
            .unwrap_or_else(|e| ClauseOutcome::Skipped(format!("{e:#}")))
    }

    fn mask(&self, series: &Series, value: &FilterValue) -> Result<ClauseOutcome> {
        if self.kind == AxisFilterKind::SpecificValues {
            return specific_values(series, &value.as_text());
        }

        let n = value
            .as_f64()
            .ok_or_else(|| anyhow!("'{}' is not a count", value.as_text()))?;
        if n < 1.0 {
            return Ok(ClauseOutcome::NoOp);
        }
        let n = n.trunc() as usize;

        let cells = scalar_values(series)?;
        let distinct: Vec<&Scalar> = cells
            .iter()
            .flatten()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let selected: BTreeSet<&Scalar> = match self.kind {
            AxisFilterKind::EveryNth => distinct.iter().step_by(n).copied().collect(),
            AxisFilterKind::FirstN => distinct.iter().take(n).copied().collect(),
            AxisFilterKind::LastN => distinct
                .iter()
                .skip(distinct.len().saturating_sub(n))
                .copied()
                .collect(),
            AxisFilterKind::SpecificValues => BTreeSet::new(),
        };

        Ok(ClauseOutcome::Mask(RowMask::from_fn(cells.len(), |i| {
            cells[i].as_ref().is_some_and(|v| selected.contains(v))
        })))
    }
}

/// Comma list; compared as numbers when every entry is one, else as text.
fn specific_values(series: &Series, list: &str) -> Result<ClauseOutcome> {
    let entries: Vec<&str> = list.split(',').map(str::trim).collect();
    let numbers: Option<Vec<f64>> = entries.iter().map(|e| e.parse::<f64>().ok()).collect();

    let bits: Vec<bool> = match numbers {
        Some(numbers) => {
            let wanted: BTreeSet<Scalar> = numbers.into_iter().map(Scalar::Number).collect();
            scalar_values(series)?
                .iter()
                .map(|v| v.as_ref().is_some_and(|s| wanted.contains(s)))
                .collect()
        }
        None => text_values(series)?
            .iter()
            .map(|v| v.as_deref().is_some_and(|s| entries.contains(&s)))
            .collect(),
    };
    Ok(ClauseOutcome::Mask(bits.into()))
}
