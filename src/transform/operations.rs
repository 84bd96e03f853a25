use super::catalog::{ColumnOperation, ConversionErrors};
use crate::config::EngineSettings;
use crate::data::values::{
    Scalar, ValueFamily, categorical_dtype, datetime_series, fill_nulls, family_of, float_values,
    format_number, parse_datetime, parse_with_format, restore_integer_dtype, scalar_values,
    text_values,
};
use anyhow::{Result, bail};
use polars::prelude::*;
use regex::Regex;
use std::collections::BTreeMap;

impl ColumnOperation {
    /// Applies the operation to one column and returns the new column.
    ///
    /// Operations that do not fit the column's type return it unchanged;
    /// errors are left to the caller, which keeps the original column.
    pub fn apply(&self, series: &Series, settings: &EngineSettings) -> Result<Series> {
        let formats = &settings.date_formats;
        match self {
            Self::RemoveMissing => {
                tracing::warn!(
                    "remove_missing on '{}' keeps all rows; drop rows with a filter instead",
                    series.name()
                );
                Ok(series.clone())
            }
            Self::ReplaceMean => fill_with_statistic(series, |ca| ca.mean()),
            Self::ReplaceMedian => fill_with_statistic(series, |ca| ca.median()),
            Self::ReplaceMode => {
                let values = scalar_values(series)?;
                match mode(&values).or_else(|| values.first().cloned().flatten()) {
                    Some(fill) => fill_nulls(series, &fill, formats),
                    None => Ok(series.clone()),
                }
            }
            Self::ReplaceCustom { value } => match Scalar::from_json(value) {
                Some(fill) => fill_nulls(series, &fill, formats),
                None => Ok(series.clone()),
            },
            Self::ToNumeric { errors } => to_numeric(series, *errors),
            Self::ToText => Ok(series.cast(&DataType::String)?),
            Self::ToDate { format, errors } => to_date(series, format.as_deref(), *errors, formats),
            Self::ToCategorical => Ok(series
                .cast(&DataType::String)?
                .cast(&categorical_dtype())?),
            Self::Lowercase => map_text_expr(series, |e| e.str().to_lowercase()),
            Self::Uppercase => map_text_expr(series, |e| e.str().to_uppercase()),
            Self::Trim => map_text_expr(series, |e| e.str().strip_chars(lit(NULL))),
            Self::TextReplace {
                pattern,
                replacement,
            } => regex_replace(series, pattern, replacement),
            Self::Round { decimals } => round(series, *decimals),
            Self::Normalize => map_numeric_expr(series, |e| {
                (e.clone() - e.clone().min()) / (e.clone().max() - e.min())
            }),
            Self::Standardize => {
                map_numeric_expr(series, |e| (e.clone() - e.clone().mean()) / e.std(1))
            }
            Self::Clip { min, max } => clip(series, *min, *max),
            Self::OutlierRemove { threshold } => remove_outliers(series, *threshold),
            Self::Winsorize { lower, upper } => winsorize(series, *lower, *upper),
        }
    }
}

/// Numeric transforms exclude booleans.
fn is_numeric(series: &Series) -> bool {
    family_of(series.dtype()) == ValueFamily::Numeric
}

/// Evaluates `build(col)` over a one-column frame and returns the result
/// under the original name.
fn eval_expr(series: &Series, build: impl FnOnce(Expr) -> Expr) -> Result<Series> {
    let name = series.name().clone();
    let df = DataFrame::new(vec![Column::from(series.clone())])?;
    let out = df
        .lazy()
        .select([build(col(name.clone())).alias(name.clone())])
        .collect()?;
    Ok(out.column(name.as_str())?.as_materialized_series().clone())
}

fn map_text_expr(series: &Series, build: impl FnOnce(Expr) -> Expr) -> Result<Series> {
    match family_of(series.dtype()) {
        ValueFamily::Text => eval_expr(series, build),
        ValueFamily::Categorical => {
            let text = series.cast(&DataType::String)?;
            Ok(eval_expr(&text, build)?.cast(&categorical_dtype())?)
        }
        _ => Ok(series.clone()),
    }
}

fn map_numeric_expr(series: &Series, build: impl FnOnce(Expr) -> Expr) -> Result<Series> {
    if !is_numeric(series) {
        return Ok(series.clone());
    }
    eval_expr(series, |e| build(e.cast(DataType::Float64)))
}

fn float_chunked(series: &Series) -> Result<Float64Chunked> {
    let present: Vec<f64> = float_values(series)?.into_iter().flatten().collect();
    Ok(Float64Chunked::from_vec(series.name().clone(), present))
}

/// Mean/median fill. Numeric columns are filled as floats; any other column
/// falls back to its first value.
fn fill_with_statistic(
    series: &Series,
    statistic: impl FnOnce(&Float64Chunked) -> Option<f64>,
) -> Result<Series> {
    if !is_numeric(series) {
        let first = scalar_values(series)?.into_iter().next().flatten();
        return match first {
            Some(fill) => fill_nulls(series, &fill, &[]),
            None => Ok(series.clone()),
        };
    }

    match statistic(&float_chunked(series)?).filter(|v| !v.is_nan()) {
        Some(v) => {
            let as_float = series.cast(&DataType::Float64)?;
            fill_nulls(&as_float, &Scalar::Number(v), &[])
        }
        None => Ok(series.clone()),
    }
}

/// Most frequent value; ties resolve to the smallest.
fn mode(values: &[Option<Scalar>]) -> Option<Scalar> {
    let mut counts: BTreeMap<&Scalar, usize> = BTreeMap::new();
    for value in values.iter().flatten() {
        *counts.entry(value).or_default() += 1;
    }

    let mut best: Option<(&Scalar, usize)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.clone())
}

fn to_numeric(series: &Series, errors: ConversionErrors) -> Result<Series> {
    match family_of(series.dtype()) {
        ValueFamily::Numeric | ValueFamily::Boolean => return Ok(series.clone()),
        ValueFamily::Text | ValueFamily::Categorical => {}
        _ => bail!(
            "Cannot convert column '{}' of type {} to numbers",
            series.name(),
            series.dtype()
        ),
    }

    let name = series.name().clone();
    let texts = text_values(series)?;
    let present = || texts.iter().flatten().map(|s| s.trim());

    if present().all(|s| s.parse::<i64>().is_ok()) {
        let ints: Vec<Option<i64>> = texts
            .iter()
            .map(|v| v.as_deref().and_then(|s| s.trim().parse().ok()))
            .collect();
        return Ok(Series::new(name, ints));
    }

    let floats: Vec<Option<f64>> = texts
        .iter()
        .map(|v| v.as_deref().and_then(|s| s.trim().parse().ok()))
        .collect();
    let failed = present().count() - floats.iter().flatten().count();

    if failed > 0 {
        match errors {
            ConversionErrors::Coerce => {}
            ConversionErrors::Raise => {
                bail!("{failed} value(s) in '{name}' are not numbers")
            }
            ConversionErrors::Ignore => return Ok(series.clone()),
        }
    }
    Ok(Series::new(name, floats))
}

fn to_date(
    series: &Series,
    format: Option<&str>,
    errors: ConversionErrors,
    formats: &[String],
) -> Result<Series> {
    let texts = match family_of(series.dtype()) {
        ValueFamily::Temporal => {
            return Ok(series.cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?);
        }
        ValueFamily::Text | ValueFamily::Categorical => text_values(series)?,
        ValueFamily::Numeric if format.is_some() => float_values(series)?
            .into_iter()
            .map(|v| v.map(format_number))
            .collect(),
        _ => bail!(
            "Cannot convert column '{}' of type {} to dates without a format",
            series.name(),
            series.dtype()
        ),
    };

    let parsed: Vec<_> = texts
        .iter()
        .map(|v| {
            v.as_deref().and_then(|s| match format {
                Some(f) => parse_with_format(s, f),
                None => parse_datetime(s, formats),
            })
        })
        .collect();

    let failed = texts
        .iter()
        .zip(&parsed)
        .filter(|(raw, out)| raw.as_deref().is_some_and(|s| !s.trim().is_empty()) && out.is_none())
        .count();

    if failed > 0 {
        match errors {
            ConversionErrors::Coerce => {}
            ConversionErrors::Raise => {
                bail!("{failed} value(s) in '{}' are not dates", series.name())
            }
            ConversionErrors::Ignore => return Ok(series.clone()),
        }
    }
    Ok(datetime_series(series.name().clone(), &parsed)?)
}

fn regex_replace(series: &Series, pattern: &Regex, replacement: &str) -> Result<Series> {
    let family = family_of(series.dtype());
    if !matches!(family, ValueFamily::Text | ValueFamily::Categorical) {
        return Ok(series.clone());
    }
    let replaced: Vec<Option<String>> = text_values(series)?
        .into_iter()
        .map(|v| v.map(|s| pattern.replace_all(&s, replacement).into_owned()))
        .collect();
    let out = Series::new(series.name().clone(), replaced);
    if family == ValueFamily::Categorical {
        Ok(out.cast(&categorical_dtype())?)
    } else {
        Ok(out)
    }
}

fn round(series: &Series, decimals: i32) -> Result<Series> {
    if !is_numeric(series) || (series.dtype().is_integer() && decimals >= 0) {
        return Ok(series.clone());
    }
    let factor = 10f64.powi(decimals.abs());
    let rounded: Vec<Option<f64>> = float_values(series)?
        .into_iter()
        .map(|v| {
            v.map(|x| {
                if decimals >= 0 {
                    (x * factor).round_ties_even() / factor
                } else {
                    (x / factor).round_ties_even() * factor
                }
            })
        })
        .collect();
    Ok(Series::new(series.name().clone(), rounded).cast(series.dtype())?)
}

/// Clamps to `max` first and then to `min`.
fn clip(series: &Series, min: Option<f64>, max: Option<f64>) -> Result<Series> {
    if !is_numeric(series) || (min.is_none() && max.is_none()) {
        return Ok(series.clone());
    }
    let clipped: Vec<Option<f64>> = float_values(series)?
        .into_iter()
        .map(|v| {
            v.map(|mut x| {
                if let Some(hi) = max {
                    x = x.min(hi);
                }
                if let Some(lo) = min {
                    x = x.max(lo);
                }
                x
            })
        })
        .collect();

    let out = Series::new(series.name().clone(), clipped);
    let integral_bounds = [min, max].iter().flatten().all(|b| b.fract() == 0.0);
    if integral_bounds {
        Ok(restore_integer_dtype(out, series.dtype())?)
    } else {
        Ok(out)
    }
}

/// Nulls out values more than `threshold` sample standard deviations from the mean.
fn remove_outliers(series: &Series, threshold: f64) -> Result<Series> {
    if !is_numeric(series) {
        return Ok(series.clone());
    }
    let ca = float_chunked(series)?;
    let (Some(mean), Some(std)) = (ca.mean(), ca.std(1)) else {
        return Ok(series.clone());
    };
    if std.is_nan() {
        return Ok(series.clone());
    }

    let kept: Vec<Option<f64>> = float_values(series)?
        .into_iter()
        .map(|v| v.filter(|x| (x - mean).abs() <= threshold * std))
        .collect();
    Ok(Series::new(series.name().clone(), kept).cast(series.dtype())?)
}

/// Clamps values to the column's `lower`/`upper` linear percentiles, keeping
/// the storage type (integer columns truncate fractional bounds).
fn winsorize(series: &Series, lower: f64, upper: f64) -> Result<Series> {
    if !is_numeric(series) {
        return Ok(series.clone());
    }
    let ca = float_chunked(series)?;
    let (Some(lo), Some(hi)) = (
        ca.quantile(lower, QuantileMethod::Linear)?,
        ca.quantile(upper, QuantileMethod::Linear)?,
    ) else {
        return Ok(series.clone());
    };

    let clipped: Vec<Option<f64>> = float_values(series)?
        .into_iter()
        .map(|v| v.map(|x| x.clamp(lo, hi)))
        .collect();
    Ok(Series::new(series.name().clone(), clipped).cast(series.dtype())?)
}
