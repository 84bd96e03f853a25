//! Operation identifiers, their categories and default parameters, and the
//! typed [`ColumnOperation`] built from a parameter map.

use crate::config::EngineSettings;
use anyhow::{Context as _, Result, anyhow, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Parameter map attached to a transformation step. Ordered by key so that
/// descriptions and serialized pipelines are stable.
pub type Parameters = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformationCategory {
    MissingValues,
    TypeConversion,
    TextOperation,
    NumericOperation,
    OutlierHandling,
}

impl TransformationCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::MissingValues => "Missing Values",
            Self::TypeConversion => "Type Conversion",
            Self::TextOperation => "Text Operations",
            Self::NumericOperation => "Numeric Operations",
            Self::OutlierHandling => "Outlier Handling",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    RemoveMissing,
    ReplaceMean,
    ReplaceMedian,
    ReplaceMode,
    ReplaceCustom,
    ConvertToNumeric,
    ConvertToText,
    ConvertToDate,
    ConvertToCategorical,
    TextLowercase,
    TextUppercase,
    TextTrim,
    TextReplace,
    NumericRound,
    NumericNormalize,
    NumericStandardize,
    NumericLimitRange,
    OutlierRemove,
    OutlierWinsorize,
}

impl OperationKind {
    pub const ALL: [Self; 19] = [
        Self::RemoveMissing,
        Self::ReplaceMean,
        Self::ReplaceMedian,
        Self::ReplaceMode,
        Self::ReplaceCustom,
        Self::ConvertToNumeric,
        Self::ConvertToText,
        Self::ConvertToDate,
        Self::ConvertToCategorical,
        Self::TextLowercase,
        Self::TextUppercase,
        Self::TextTrim,
        Self::TextReplace,
        Self::NumericRound,
        Self::NumericNormalize,
        Self::NumericStandardize,
        Self::NumericLimitRange,
        Self::OutlierRemove,
        Self::OutlierWinsorize,
    ];

    /// Stable identifier, identical to the serialized form.
    pub fn id(&self) -> &'static str {
        match self {
            Self::RemoveMissing => "remove_missing",
            Self::ReplaceMean => "replace_mean",
            Self::ReplaceMedian => "replace_median",
            Self::ReplaceMode => "replace_mode",
            Self::ReplaceCustom => "replace_custom",
            Self::ConvertToNumeric => "convert_to_numeric",
            Self::ConvertToText => "convert_to_text",
            Self::ConvertToDate => "convert_to_date",
            Self::ConvertToCategorical => "convert_to_categorical",
            Self::TextLowercase => "text_lowercase",
            Self::TextUppercase => "text_uppercase",
            Self::TextTrim => "text_trim",
            Self::TextReplace => "text_replace",
            Self::NumericRound => "numeric_round",
            Self::NumericNormalize => "numeric_normalize",
            Self::NumericStandardize => "numeric_standardize",
            Self::NumericLimitRange => "numeric_limit_range",
            Self::OutlierRemove => "outlier_remove",
            Self::OutlierWinsorize => "outlier_winsorize",
        }
    }

    /// Humanized name, e.g. `"Replace Mean"`.
    pub fn display_name(&self) -> String {
        self.id()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn category(&self) -> TransformationCategory {
        match self {
            Self::RemoveMissing
            | Self::ReplaceMean
            | Self::ReplaceMedian
            | Self::ReplaceMode
            | Self::ReplaceCustom => TransformationCategory::MissingValues,
            Self::ConvertToNumeric
            | Self::ConvertToText
            | Self::ConvertToDate
            | Self::ConvertToCategorical => TransformationCategory::TypeConversion,
            Self::TextLowercase | Self::TextUppercase | Self::TextTrim | Self::TextReplace => {
                TransformationCategory::TextOperation
            }
            Self::NumericRound
            | Self::NumericNormalize
            | Self::NumericStandardize
            | Self::NumericLimitRange => TransformationCategory::NumericOperation,
            Self::OutlierRemove | Self::OutlierWinsorize => TransformationCategory::OutlierHandling,
        }
    }

    /// Parameters a freshly created step of this kind starts with.
    pub fn default_parameters(&self, settings: &EngineSettings) -> Parameters {
        let pairs: Vec<(&str, Value)> = match self {
            Self::ReplaceCustom => vec![("value", json!(""))],
            Self::ConvertToNumeric => vec![("errors", json!("coerce"))],
            Self::ConvertToDate => vec![("format", Value::Null), ("errors", json!("coerce"))],
            Self::TextReplace => vec![("pattern", json!("")), ("replacement", json!(""))],
            Self::NumericRound => vec![("decimals", json!(0))],
            Self::NumericLimitRange => vec![("min", Value::Null), ("max", Value::Null)],
            Self::OutlierRemove => vec![("threshold", json!(settings.default_outlier_threshold))],
            Self::OutlierWinsorize => vec![
                ("lower", json!(settings.default_winsorize_lower)),
                ("upper", json!(settings.default_winsorize_upper)),
            ],
            _ => Vec::new(),
        };
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect()
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for OperationKind {
    type Err = anyhow::Error;

    /// Accepts the snake_case id in any letter case (`replace_mean`, `REPLACE_MEAN`).
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.id() == wanted)
            .ok_or_else(|| anyhow!("Unknown transformation operation: {s}"))
    }
}

/// Policy for values that fail a type conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionErrors {
    /// Unparseable values become null
    #[default]
    Coerce,
    /// Any unparseable value fails the step
    Raise,
    /// Any unparseable value leaves the column untouched
    Ignore,
}

impl FromStr for ConversionErrors {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "coerce" => Ok(Self::Coerce),
            "raise" => Ok(Self::Raise),
            "ignore" => Ok(Self::Ignore),
            other => bail!("Unknown conversion error policy: {other}"),
        }
    }
}

/// One catalog entry with its parameters validated and typed.
#[derive(Debug, Clone)]
pub enum ColumnOperation {
    RemoveMissing,
    ReplaceMean,
    ReplaceMedian,
    ReplaceMode,
    ReplaceCustom { value: Value },
    ToNumeric { errors: ConversionErrors },
    ToText,
    ToDate { format: Option<String>, errors: ConversionErrors },
    ToCategorical,
    Lowercase,
    Uppercase,
    Trim,
    TextReplace { pattern: Regex, replacement: String },
    Round { decimals: i32 },
    Normalize,
    Standardize,
    Clip { min: Option<f64>, max: Option<f64> },
    OutlierRemove { threshold: f64 },
    Winsorize { lower: f64, upper: f64 },
}

impl ColumnOperation {
    /// Builds the typed operation, filling absent parameters from the
    /// catalog defaults. Malformed parameters are an error.
    pub fn from_parameters(
        kind: OperationKind,
        params: &Parameters,
        settings: &EngineSettings,
    ) -> Result<Self> {
        let defaults = kind.default_parameters(settings);
        let param = |key: &'static str| lookup(params, &defaults, key);

        let op = match kind {
            OperationKind::RemoveMissing => Self::RemoveMissing,
            OperationKind::ReplaceMean => Self::ReplaceMean,
            OperationKind::ReplaceMedian => Self::ReplaceMedian,
            OperationKind::ReplaceMode => Self::ReplaceMode,
            OperationKind::ReplaceCustom => Self::ReplaceCustom {
                value: param("value").cloned().unwrap_or_else(|| json!("")),
            },
            OperationKind::ConvertToNumeric => Self::ToNumeric {
                errors: errors_param(param("errors"))?,
            },
            OperationKind::ConvertToText => Self::ToText,
            OperationKind::ConvertToDate => Self::ToDate {
                format: param("format")
                    .map(|v| string_param("format", v))
                    .transpose()?
                    .filter(|f| !f.trim().is_empty()),
                errors: errors_param(param("errors"))?,
            },
            OperationKind::ConvertToCategorical => Self::ToCategorical,
            OperationKind::TextLowercase => Self::Lowercase,
            OperationKind::TextUppercase => Self::Uppercase,
            OperationKind::TextTrim => Self::Trim,
            OperationKind::TextReplace => {
                let pattern = param("pattern")
                    .map(|v| string_param("pattern", v))
                    .transpose()?
                    .unwrap_or_default();
                if pattern.is_empty() {
                    bail!("text_replace requires a non-empty 'pattern'");
                }
                let replacement = param("replacement")
                    .map(|v| string_param("replacement", v))
                    .transpose()?
                    .unwrap_or_default();
                Self::TextReplace {
                    pattern: Regex::new(&pattern)
                        .with_context(|| format!("Invalid pattern '{pattern}'"))?,
                    replacement,
                }
            }
            OperationKind::NumericRound => {
                let decimals = param("decimals")
                    .map(|v| number_param("decimals", v))
                    .transpose()?
                    .unwrap_or(0.0);
                if decimals.fract() != 0.0 || decimals.abs() > 15.0 {
                    bail!("'decimals' must be a small whole number, got {decimals}");
                }
                Self::Round {
                    decimals: decimals as i32,
                }
            }
            OperationKind::NumericNormalize => Self::Normalize,
            OperationKind::NumericStandardize => Self::Standardize,
            OperationKind::NumericLimitRange => Self::Clip {
                min: param("min").map(|v| number_param("min", v)).transpose()?,
                max: param("max").map(|v| number_param("max", v)).transpose()?,
            },
            OperationKind::OutlierRemove => Self::OutlierRemove {
                threshold: param("threshold")
                    .map(|v| number_param("threshold", v))
                    .transpose()?
                    .unwrap_or(settings.default_outlier_threshold),
            },
            OperationKind::OutlierWinsorize => {
                let lower = param("lower")
                    .map(|v| number_param("lower", v))
                    .transpose()?
                    .unwrap_or(settings.default_winsorize_lower);
                let upper = param("upper")
                    .map(|v| number_param("upper", v))
                    .transpose()?
                    .unwrap_or(settings.default_winsorize_upper);
                if !(0.0..=1.0).contains(&lower) || !(0.0..=1.0).contains(&upper) || lower > upper
                {
                    bail!("Winsorize percentiles must satisfy 0 <= lower <= upper <= 1");
                }
                Self::Winsorize { lower, upper }
            }
        };
        Ok(op)
    }
}

/// Explicit non-null parameter, else the catalog default.
fn lookup<'a>(params: &'a Parameters, defaults: &'a Parameters, key: &str) -> Option<&'a Value> {
    params
        .get(key)
        .filter(|v| !v.is_null())
        .or_else(|| defaults.get(key).filter(|v| !v.is_null()))
}

/// Numbers, or strings holding a number.
fn number_param(key: &str, value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| anyhow!("Parameter '{key}' is out of range")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .with_context(|| format!("Parameter '{key}' is not a number: '{s}'")),
        other => bail!("Parameter '{key}' must be a number, got {other}"),
    }
}

fn string_param(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => bail!("Parameter '{key}' must be a string, got {other}"),
    }
}

fn errors_param(value: Option<&Value>) -> Result<ConversionErrors> {
    match value {
        Some(v) => string_param("errors", v)?.parse::<ConversionErrors>(),
        None => Ok(ConversionErrors::default()),
    }
}
