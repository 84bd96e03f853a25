use super::clause::{FilterClause, FilterLogic, FilterOperator, FilterType, FilterValue};
use super::mask::RowMask;
use crate::config::EngineSettings;
use crate::data::values::{
    ValueFamily, datetime_values, family_of, float_values, parse_datetime, text_values,
};
use anyhow::{Context as _, Result};
use regex::RegexBuilder;
use chrono::{Datelike as _, NaiveDateTime};
use polars::prelude::*;

/// Result of evaluating one clause against a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClauseOutcome {
    /// Rows matching the clause
    Mask(RowMask),
    /// Nothing to filter (missing operand, operator not valid for the type);
    /// every row is kept
    NoOp,
    /// The clause could not be evaluated and takes no part in the fold
    Skipped(String),
}

/// Evaluates clause lists against a table.
#[derive(Debug, Clone)]
pub struct FilterEngine {
    pub date_formats: Vec<String>,
    pub contains_case_sensitive: bool,
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::from_settings(&EngineSettings::default())
    }
}

impl FilterEngine {
    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            date_formats: settings.date_formats.clone(),
            contains_case_sensitive: settings.text_contains_case_sensitive,
        }
    }

    /// Rows of `df` selected by `clauses`, in their original order.
    ///
    /// An empty clause list, or one where no clause could be evaluated,
    /// returns the table unchanged.
    pub fn apply(&self, df: &DataFrame, clauses: &[FilterClause]) -> Result<DataFrame> {
        let Some(mask) = self.combined_mask(df, clauses) else {
            return Ok(df.clone());
        };
        let out = df.filter(&mask.to_chunked())?;
        tracing::info!(
            "Filter kept {} of {} rows ({} clause(s))",
            out.height(),
            df.height(),
            clauses.len()
        );
        Ok(out)
    }

    /// Folds the clause masks left to right.
    ///
    /// Each clause is evaluated against the full `df`. The first clause that
    /// evaluates seeds the result; each later one joins it with its own
    /// `logic`, so `A and B or C` reads as `(A and B) or C`. Returns `None`
    /// when no clause evaluated.
    pub fn combined_mask(&self, df: &DataFrame, clauses: &[FilterClause]) -> Option<RowMask> {
        let mut acc: Option<RowMask> = None;

        for (idx, clause) in clauses.iter().enumerate() {
            let mask = match self.evaluate_clause(df, clause) {
                ClauseOutcome::Mask(mask) => mask,
                ClauseOutcome::NoOp => RowMask::all(df.height(), true),
                ClauseOutcome::Skipped(reason) => {
                    tracing::warn!("Skipping filter clause {idx} on '{}': {reason}", clause.column);
                    continue;
                }
            };
            tracing::debug!(
                "Clause {idx} ({:?} {:?}) matches {} rows",
                clause.filter_type,
                clause.operator,
                mask.count()
            );

            acc = Some(match acc {
                None => mask,
                Some(prev) => match clause.logic {
                    FilterLogic::And => prev.and(&mask),
                    FilterLogic::Or => prev.or(&mask),
                },
            });
        }
        acc
    }

    pub fn evaluate_clause(&self, df: &DataFrame, clause: &FilterClause) -> ClauseOutcome {
        if clause.column.is_empty() {
            return ClauseOutcome::Skipped("no column given".to_owned());
        }
        let Ok(column) = df.column(&clause.column) else {
            return ClauseOutcome::Skipped("column not found".to_owned());
        };
        let series = column.as_materialized_series();

        let outcome = match clause.filter_type {
            FilterType::Text => self.text_mask(series, clause),
            FilterType::Numeric => numeric_mask(series, clause),
            FilterType::Date => self.date_mask(series, clause),
            FilterType::Year => year_mask(series, clause),
            FilterType::Unknown => return ClauseOutcome::Skipped("unknown filter type".to_owned()),
        };
        outcome.unwrap_or_else(|e| ClauseOutcome::Skipped(format!("{e:#}")))
    }

    fn text_mask(&self, series: &Series, clause: &FilterClause) -> Result<ClauseOutcome> {
        let Some(operand) = clause.operand() else {
            return Ok(ClauseOutcome::NoOp);
        };
        let needle = operand.as_text();
        let needle_lower = needle.to_lowercase();
        let allowed: Vec<&str> = needle.split(',').map(str::trim).collect();

        let matches: Box<dyn Fn(&str) -> bool + '_> = match clause.operator {
            // the operand is a regular expression searched anywhere in the cell
            FilterOperator::Contains => {
                let pattern = RegexBuilder::new(&needle)
                    .case_insensitive(!self.contains_case_sensitive)
                    .build()
                    .with_context(|| format!("invalid pattern '{needle}'"))?;
                Box::new(move |s: &str| pattern.is_match(s))
            }
            FilterOperator::Equals => Box::new(|s: &str| s.to_lowercase() == needle_lower),
            FilterOperator::StartsWith => Box::new(|s: &str| s.starts_with(needle.as_str())),
            FilterOperator::EndsWith => Box::new(|s: &str| s.ends_with(needle.as_str())),
            FilterOperator::SpecificValues => Box::new(|s: &str| allowed.iter().any(|a| *a == s)),
            _ => return Ok(ClauseOutcome::NoOp),
        };

        let bits: Vec<bool> = text_values(series)?
            .iter()
            .map(|v| v.as_deref().is_some_and(&matches))
            .collect();
        Ok(ClauseOutcome::Mask(bits.into()))
    }

    fn date_mask(&self, series: &Series, clause: &FilterClause) -> Result<ClauseOutcome> {
        let needs_second = clause.operator == FilterOperator::Between;
        if !matches!(
            clause.operator,
            FilterOperator::Equals
                | FilterOperator::After
                | FilterOperator::Before
                | FilterOperator::Between
        ) {
            return Ok(ClauseOutcome::NoOp);
        }
        let (Some(first), second) = (clause.operand(), clause.operand2()) else {
            return Ok(ClauseOutcome::NoOp);
        };
        if needs_second && second.is_none() {
            return Ok(ClauseOutcome::NoOp);
        }

        let parse = |v: &FilterValue| -> Result<NaiveDateTime> {
            let text = v.as_text();
            parse_datetime(&text, &self.date_formats)
                .ok_or_else(|| anyhow::anyhow!("'{text}' is not a date"))
        };
        let lo = parse(first)?;
        let hi = second.map(parse).transpose()?;

        let values = datetime_values(series, &self.date_formats)?;
        let bits = values
            .iter()
            .map(|v| {
                v.is_some_and(|d| match clause.operator {
                    FilterOperator::Equals => d == lo,
                    FilterOperator::After => d > lo,
                    FilterOperator::Before => d < lo,
                    _ => hi.is_some_and(|hi| d >= lo && d <= hi),
                })
            })
            .collect::<Vec<_>>();
        Ok(ClauseOutcome::Mask(bits.into()))
    }
}

/// Reads a column as numbers; text is parsed. Errors when a column with
/// values has none that read as a number.
fn numeric_column(series: &Series) -> Result<Vec<Option<f64>>> {
    let values = match family_of(series.dtype()) {
        ValueFamily::Numeric | ValueFamily::Boolean => float_values(series)?,
        ValueFamily::Text | ValueFamily::Categorical => text_values(series)?
            .into_iter()
            .map(|v| v.and_then(|s| s.trim().parse::<f64>().ok()).filter(|x| !x.is_nan()))
            .collect(),
        _ => anyhow::bail!("column of type {} is not numeric", series.dtype()),
    };
    if series.len() > series.null_count() && values.iter().all(Option::is_none) {
        anyhow::bail!("column holds no numbers");
    }
    Ok(values)
}

fn parse_operand(value: &FilterValue) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| anyhow::anyhow!("'{}' is not a number", value.as_text()))
}

/// Row count from an operand; `None` when it is not positive.
fn positive_count(value: f64) -> Option<usize> {
    (value >= 1.0).then(|| value.trunc() as usize)
}

fn compare_mask(
    values: &[Option<f64>],
    operator: FilterOperator,
    lo: f64,
    hi: Option<f64>,
) -> Option<RowMask> {
    let test: Box<dyn Fn(f64) -> bool> = match operator {
        FilterOperator::Equals => Box::new(move |x| x == lo),
        FilterOperator::GreaterThan => Box::new(move |x| x > lo),
        FilterOperator::LessThan => Box::new(move |x| x < lo),
        FilterOperator::Between => {
            let hi = hi?;
            Box::new(move |x| x >= lo && x <= hi)
        }
        _ => return None,
    };
    Some(
        values
            .iter()
            .map(|v| v.is_some_and(&test))
            .collect::<Vec<_>>()
            .into(),
    )
}

fn numeric_mask(series: &Series, clause: &FilterClause) -> Result<ClauseOutcome> {
    let Some(operand) = clause.operand() else {
        return Ok(ClauseOutcome::NoOp);
    };
    let value = parse_operand(operand)?;
    let value2 = clause.operand2().map(parse_operand).transpose()?;
    let len = series.len();

    // Positional operators look at row order only
    match clause.operator {
        FilterOperator::EveryNth => {
            return Ok(positive_count(value).map_or(ClauseOutcome::NoOp, |n| {
                ClauseOutcome::Mask(RowMask::from_fn(len, |i| i % n == 0))
            }));
        }
        FilterOperator::FirstN => {
            return Ok(positive_count(value).map_or(ClauseOutcome::NoOp, |n| {
                ClauseOutcome::Mask(RowMask::from_fn(len, |i| i < n))
            }));
        }
        FilterOperator::LastN => {
            return Ok(positive_count(value).map_or(ClauseOutcome::NoOp, |n| {
                let start = len.saturating_sub(n);
                ClauseOutcome::Mask(RowMask::from_fn(len, |i| i >= start))
            }));
        }
        _ => {}
    }

    let values = numeric_column(series)?;
    if clause.operator == FilterOperator::DivisibleBy {
        if value == 0.0 {
            return Ok(ClauseOutcome::Mask(RowMask::all(len, false)));
        }
        let bits: Vec<bool> = values
            .iter()
            .map(|v| v.is_some_and(|x| x % value == 0.0))
            .collect();
        return Ok(ClauseOutcome::Mask(bits.into()));
    }

    Ok(compare_mask(&values, clause.operator, value, value2)
        .map_or(ClauseOutcome::NoOp, ClauseOutcome::Mask))
}

fn year_mask(series: &Series, clause: &FilterClause) -> Result<ClauseOutcome> {
    let Some(operand) = clause.operand() else {
        return Ok(ClauseOutcome::NoOp);
    };
    let year = parse_operand(operand)?.trunc();
    let year2 = clause
        .operand2()
        .map(parse_operand)
        .transpose()?
        .map(f64::trunc);

    let values: Vec<Option<f64>> = if family_of(series.dtype()) == ValueFamily::Temporal {
        datetime_values(series, &[])?
            .into_iter()
            .map(|v| v.map(|d| f64::from(d.year())))
            .collect()
    } else {
        numeric_column(series)?
    };

    // first_n / last_n pick among the sorted distinct years, not rows
    let pick_distinct = |take_last: bool| -> ClauseOutcome {
        let Some(n) = positive_count(year) else {
            return ClauseOutcome::NoOp;
        };
        let mut distinct: Vec<f64> = values.iter().flatten().copied().collect();
        distinct.sort_by(f64::total_cmp);
        distinct.dedup();
        let chosen = if take_last {
            &distinct[distinct.len().saturating_sub(n)..]
        } else {
            &distinct[..n.min(distinct.len())]
        };
        let bits: Vec<bool> = values
            .iter()
            .map(|v| v.is_some_and(|x| chosen.contains(&x)))
            .collect();
        ClauseOutcome::Mask(bits.into())
    };

    Ok(match clause.operator {
        FilterOperator::FirstN => pick_distinct(false),
        FilterOperator::LastN => pick_distinct(true),
        op => compare_mask(&values, op, year, year2).map_or(ClauseOutcome::NoOp, ClauseOutcome::Mask),
    })
}

/// Filters with default settings.
pub fn apply_filters(df: &DataFrame, clauses: &[FilterClause]) -> Result<DataFrame> {
    FilterEngine::default().apply(df, clauses)
}
