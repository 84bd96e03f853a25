//! Column type inference and descriptive statistics.
//!
//! A [`ColumnProfile`] is a pure function of a column's current values: the
//! same column always yields the same profile, whether it was freshly imported
//! or reconstructed from a saved project.

use super::values::{ValueFamily, family_of, float_values};
use anyhow::{Context as _, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Semantic classification of a column, independent of its storage dtype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Numeric,
    Text,
    Date,
    Categorical,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Text => "text",
            Self::Date => "date",
            Self::Categorical => "categorical",
        }
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Summary statistics for numeric columns. Each field is `None` when the
/// column has no non-null values or the statistic is undefined (e.g. the
/// standard deviation of a single value).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Sample standard deviation (ddof = 1)
    pub std: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    /// Non-null values
    pub count: usize,
    /// Null, NaN or otherwise missing values
    pub null_count: usize,
    /// Distinct non-null values
    pub unique_count: usize,
    /// Present exactly when the column is numeric
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericStats>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub data_type: SemanticType,
    /// Storage dtype as rendered by polars (`i64`, `str`, `datetime[ms]`, ...)
    pub original_type: String,
    pub stats: ColumnStats,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ColumnProfile {
    pub fn is_numeric(&self) -> bool {
        self.data_type == SemanticType::Numeric
    }

    pub fn null_pct(&self) -> f64 {
        let total = self.stats.count + self.stats.null_count;
        if total > 0 {
            (self.stats.null_count as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Numeric dtype → numeric, datetime → date, categorical encoding →
/// categorical, anything else → text. Booleans count as numeric.
pub fn infer_semantic_type(dtype: &DataType) -> SemanticType {
    match family_of(dtype) {
        ValueFamily::Numeric | ValueFamily::Boolean => SemanticType::Numeric,
        ValueFamily::Temporal => SemanticType::Date,
        ValueFamily::Categorical => SemanticType::Categorical,
        ValueFamily::Text | ValueFamily::Other => SemanticType::Text,
    }
}

pub fn profile_column(series: &Series) -> Result<ColumnProfile> {
    let data_type = infer_semantic_type(series.dtype());
    let stats = if data_type == SemanticType::Numeric {
        numeric_column_stats(series)?
    } else {
        general_column_stats(series)?
    };

    Ok(ColumnProfile {
        name: series.name().to_string(),
        data_type,
        original_type: series.dtype().to_string(),
        stats,
        metadata: HashMap::new(),
    })
}

/// Profiles every column of `df`, in column order.
pub fn profile_frame(df: &DataFrame) -> Result<Vec<ColumnProfile>> {
    df.get_columns()
        .iter()
        .map(|c| {
            profile_column(c.as_materialized_series())
                .with_context(|| format!("Failed to profile column '{}'", c.name()))
        })
        .collect()
}

fn general_column_stats(series: &Series) -> Result<ColumnStats> {
    let null_count = series.null_count();
    let unique_count = series.drop_nulls().n_unique()?;
    Ok(ColumnStats {
        count: series.len() - null_count,
        null_count,
        unique_count,
        numeric: None,
    })
}

fn numeric_column_stats(series: &Series) -> Result<ColumnStats> {
    let present: Vec<f64> = float_values(series)?.into_iter().flatten().collect();

    // -0.0 and 0.0 are the same value
    let unique_count = present
        .iter()
        .map(|v| if *v == 0.0 { 0u64 } else { v.to_bits() })
        .collect::<HashSet<_>>()
        .len();

    Ok(ColumnStats {
        count: present.len(),
        null_count: series.len() - present.len(),
        unique_count,
        numeric: Some(describe(present)),
    })
}

/// Min/max/mean/median/sample std over already-cleaned values.
pub fn describe(values: Vec<f64>) -> NumericStats {
    if values.is_empty() {
        return NumericStats::default();
    }
    let ca = Float64Chunked::from_vec("values".into(), values);
    let defined = |v: Option<f64>| v.filter(|x| !x.is_nan());

    NumericStats {
        min: defined(ca.min()),
        max: defined(ca.max()),
        mean: defined(ca.mean()),
        median: defined(ca.median()),
        std: defined(ca.std(1)),
    }
}
