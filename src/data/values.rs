//! Materialization helpers shared by the profiler, the transformation catalog
//! and the filter engine.
//!
//! Polars stores each column with a concrete dtype; most engine logic only
//! cares about a handful of value families. Floating point `NaN` is read as a
//! missing value everywhere, matching the null/NaN/missing equivalence the
//! statistics are defined over.

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::cmp::Ordering;

/// Coarse grouping of storage dtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFamily {
    Numeric,
    Boolean,
    Text,
    Categorical,
    Temporal,
    Other,
}

pub fn family_of(dtype: &DataType) -> ValueFamily {
    match dtype {
        DataType::Boolean => ValueFamily::Boolean,
        DataType::String => ValueFamily::Text,
        DataType::Categorical(..) | DataType::Enum(..) => ValueFamily::Categorical,
        DataType::Date | DataType::Datetime(..) => ValueFamily::Temporal,
        dt if dt.is_primitive_numeric() => ValueFamily::Numeric,
        _ => ValueFamily::Other,
    }
}

pub fn categorical_dtype() -> DataType {
    DataType::Categorical(None, Default::default())
}

/// A single cell value lifted out of a column.
///
/// Ordering ranks variants (numbers, booleans, text, timestamps) before
/// comparing payloads; numbers use `total_cmp` so the order is total.
#[derive(Debug, Clone)]
pub enum Scalar {
    Number(f64),
    Bool(bool),
    Text(String),
    /// Milliseconds since the Unix epoch
    Timestamp(i64),
}

impl Scalar {
    fn rank(&self) -> u8 {
        match self {
            Self::Number(_) => 0,
            Self::Bool(_) => 1,
            Self::Text(_) => 2,
            Self::Timestamp(_) => 3,
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            Self::Number(v) => format_number(*v),
            Self::Bool(b) => b.to_string(),
            Self::Text(s) => s.clone(),
            Self::Timestamp(ms) => DateTime::from_timestamp_millis(*ms)
                .map(|dt| dt.naive_utc().to_string())
                .unwrap_or_default(),
        }
    }

    /// Converts a JSON parameter into a scalar; `null` yields `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            other => Some(Self::Text(other.to_string())),
        }
    }
}

impl Ord for Scalar {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scalar {}

/// Renders integral floats without a trailing `.0`.
pub fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Reads any castable column as floats; nulls and `NaN` become `None`.
pub fn float_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Reads any column through its string representation.
pub fn text_values(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_owned))
        .collect())
}

/// Reads a Date/Datetime column as epoch milliseconds.
pub fn timestamp_values(series: &Series) -> PolarsResult<Vec<Option<i64>>> {
    let ms = series
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        .cast(&DataType::Int64)?;
    Ok(ms.i64()?.into_iter().collect())
}

pub fn bool_values(series: &Series) -> PolarsResult<Vec<Option<bool>>> {
    Ok(series.bool()?.into_iter().collect())
}

/// Reads every cell as a [`Scalar`] of the column's family.
pub fn scalar_values(series: &Series) -> Result<Vec<Option<Scalar>>> {
    let values = match family_of(series.dtype()) {
        ValueFamily::Numeric => float_values(series)?
            .into_iter()
            .map(|v| v.map(Scalar::Number))
            .collect(),
        ValueFamily::Boolean => bool_values(series)?
            .into_iter()
            .map(|v| v.map(Scalar::Bool))
            .collect(),
        ValueFamily::Text | ValueFamily::Categorical => text_values(series)?
            .into_iter()
            .map(|v| v.map(Scalar::Text))
            .collect(),
        ValueFamily::Temporal => timestamp_values(series)?
            .into_iter()
            .map(|v| v.map(Scalar::Timestamp))
            .collect(),
        ValueFamily::Other => bail!("Unsupported column type {}", series.dtype()),
    };
    Ok(values)
}

/// Parses a date/time string with RFC 3339 first, then each layout in order.
///
/// Layouts without a time component are tried as plain dates at midnight.
pub fn parse_datetime(value: &str, formats: &[String]) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    formats
        .iter()
        .find_map(|format| parse_with_format(value, format))
}

pub fn parse_with_format(value: &str, format: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Reads a column as date/times: temporal dtypes directly, text by parsing.
pub fn datetime_values(series: &Series, formats: &[String]) -> Result<Vec<Option<NaiveDateTime>>> {
    match family_of(series.dtype()) {
        ValueFamily::Temporal => Ok(timestamp_values(series)?
            .into_iter()
            .map(|v| v.and_then(millis_to_datetime))
            .collect()),
        ValueFamily::Text | ValueFamily::Categorical => Ok(text_values(series)?
            .into_iter()
            .map(|v| v.and_then(|s| parse_datetime(&s, formats)))
            .collect()),
        _ => Err(anyhow!(
            "Column '{}' of type {} does not hold dates",
            series.name(),
            series.dtype()
        )),
    }
}

pub fn millis_to_datetime(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

pub fn datetime_to_millis(dt: NaiveDateTime) -> i64 {
    dt.and_utc().timestamp_millis()
}

/// Builds a millisecond-precision Datetime series.
pub fn datetime_series(name: PlSmallStr, values: &[Option<NaiveDateTime>]) -> PolarsResult<Series> {
    let ms: Vec<Option<i64>> = values.iter().map(|v| v.map(datetime_to_millis)).collect();
    Series::new(name, ms).cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
}

/// Casts a float result back to the original integer dtype, if it had one.
pub fn restore_integer_dtype(result: Series, original: &DataType) -> PolarsResult<Series> {
    if original.is_integer() {
        result.cast(original)
    } else {
        Ok(result)
    }
}

/// Replaces nulls with `fill`, converting it to the column's family.
///
/// Integer columns stay integer when the fill value is integral; a fractional
/// fill widens them to `f64`.
pub fn fill_nulls(series: &Series, fill: &Scalar, formats: &[String]) -> Result<Series> {
    let name = series.name().clone();
    let dtype = series.dtype().clone();
    match family_of(&dtype) {
        ValueFamily::Numeric => {
            let v = match fill {
                Scalar::Number(v) => *v,
                Scalar::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| anyhow!("Cannot fill numeric column with '{s}'"))?,
                other => bail!("Cannot fill numeric column with {other:?}"),
            };
            let filled: Vec<Option<f64>> = float_values(series)?
                .into_iter()
                .map(|x| Some(x.unwrap_or(v)))
                .collect();
            let out = Series::new(name, filled);
            if v.fract() == 0.0 {
                Ok(restore_integer_dtype(out, &dtype)?)
            } else {
                Ok(out)
            }
        }
        ValueFamily::Boolean => {
            let b = match fill {
                Scalar::Bool(b) => *b,
                Scalar::Text(s) => match s.trim().to_lowercase().as_str() {
                    "true" => true,
                    "false" => false,
                    _ => bail!("Cannot fill boolean column with '{s}'"),
                },
                other => bail!("Cannot fill boolean column with {other:?}"),
            };
            let filled: Vec<Option<bool>> = bool_values(series)?
                .into_iter()
                .map(|x| Some(x.unwrap_or(b)))
                .collect();
            Ok(Series::new(name, filled))
        }
        ValueFamily::Text => Ok(fill_text(series, &fill.to_text())?),
        ValueFamily::Categorical => {
            let filled = fill_text(series, &fill.to_text())?;
            Ok(filled.cast(&categorical_dtype())?)
        }
        ValueFamily::Temporal => {
            let ms = match fill {
                Scalar::Timestamp(ms) => *ms,
                Scalar::Text(s) => parse_datetime(s, formats)
                    .map(datetime_to_millis)
                    .ok_or_else(|| anyhow!("Cannot parse '{s}' as a date"))?,
                other => bail!("Cannot fill date column with {other:?}"),
            };
            let filled: Vec<Option<i64>> = timestamp_values(series)?
                .into_iter()
                .map(|x| Some(x.unwrap_or(ms)))
                .collect();
            let out = Series::new(name, filled)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
                .cast(&dtype)?;
            Ok(out)
        }
        ValueFamily::Other => bail!("Cannot fill column of type {dtype}"),
    }
}

fn fill_text(series: &Series, fill: &str) -> PolarsResult<Series> {
    let filled: Vec<Option<String>> = text_values(series)?
        .into_iter()
        .map(|x| Some(x.unwrap_or_else(|| fill.to_owned())))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}
