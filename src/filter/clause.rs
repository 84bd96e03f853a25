use crate::data::values::format_number;
use serde::{Deserialize, Serialize};

/// Which operator family a clause belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    Text,
    Numeric,
    Date,
    Year,
    /// Any type this engine does not know; such clauses are skipped.
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Contains,
    Equals,
    StartsWith,
    EndsWith,
    SpecificValues,
    GreaterThan,
    LessThan,
    Between,
    DivisibleBy,
    EveryNth,
    FirstN,
    LastN,
    After,
    Before,
    #[default]
    #[serde(other)]
    Unknown,
}

/// How a clause's mask joins the masks of the clauses before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterLogic {
    #[default]
    And,
    Or,
}

/// A clause operand as it appears in saved chart configurations: either a
/// JSON number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Number(f64),
    Text(String),
}

impl FilterValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Self::Number(v) => format_number(*v),
            Self::Text(s) => s.clone(),
        }
    }

    /// True for strings that are empty or only whitespace.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// One column-scoped condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    #[serde(default)]
    pub column: String,
    #[serde(rename = "type", default)]
    pub filter_type: FilterType,
    #[serde(default)]
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: Option<FilterValue>,
    #[serde(default)]
    pub value2: Option<FilterValue>,
    /// Ignored on the first evaluated clause.
    #[serde(default)]
    pub logic: FilterLogic,
}

impl FilterClause {
    pub fn new(
        column: impl Into<String>,
        filter_type: FilterType,
        operator: FilterOperator,
    ) -> Self {
        Self {
            column: column.into(),
            filter_type,
            operator,
            value: None,
            value2: None,
            logic: FilterLogic::And,
        }
    }

    pub fn text(column: impl Into<String>, operator: FilterOperator, value: &str) -> Self {
        Self::new(column, FilterType::Text, operator).with_value(value)
    }

    pub fn numeric(column: impl Into<String>, operator: FilterOperator, value: f64) -> Self {
        Self::new(column, FilterType::Numeric, operator).with_value(value)
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<FilterValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_value2(mut self, value: impl Into<FilterValue>) -> Self {
        self.value2 = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_logic(mut self, logic: FilterLogic) -> Self {
        self.logic = logic;
        self
    }

    /// First operand, unless absent or blank.
    pub(crate) fn operand(&self) -> Option<&FilterValue> {
        self.value.as_ref().filter(|v| !v.is_empty())
    }

    pub(crate) fn operand2(&self) -> Option<&FilterValue> {
        self.value2.as_ref().filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_chart_config_clause() -> serde_json::Result<()> {
        let clause: FilterClause = serde_json::from_str(
            r#"{"column": "age", "type": "numeric", "operator": "between",
                "value": "18", "value2": 65, "logic": "or"}"#,
        )?;
        assert_eq!(clause.filter_type, FilterType::Numeric);
        assert_eq!(clause.operator, FilterOperator::Between);
        assert_eq!(clause.value.as_ref().and_then(FilterValue::as_f64), Some(18.0));
        assert_eq!(clause.value2, Some(FilterValue::Number(65.0)));
        assert_eq!(clause.logic, FilterLogic::Or);
        Ok(())
    }

    #[test]
    fn test_unknown_names_and_defaults() -> serde_json::Result<()> {
        let clause: FilterClause =
            serde_json::from_str(r#"{"column": "x", "type": "geo", "operator": "near"}"#)?;
        assert_eq!(clause.filter_type, FilterType::Unknown);
        assert_eq!(clause.operator, FilterOperator::Unknown);
        assert_eq!(clause.logic, FilterLogic::And);
        assert!(clause.operand().is_none());
        Ok(())
    }

    #[test]
    fn test_blank_operand_counts_as_missing() {
        let clause = FilterClause::text("name", FilterOperator::Contains, "   ");
        assert!(clause.operand().is_none());
        assert_eq!(FilterValue::Number(3.0).as_text(), "3");
    }
}
