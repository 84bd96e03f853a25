use super::*;
use crate::config::EngineSettings;
use anyhow::Result;
use polars::prelude::*;

fn ids(df: &DataFrame) -> Result<Vec<i64>> {
    Ok(df
        .column("id")?
        .as_materialized_series()
        .i64()?
        .into_iter()
        .flatten()
        .collect())
}

fn sample() -> Result<DataFrame> {
    Ok(df!(
        "id" => &[0i64, 1, 2, 3, 4, 5],
        "name" => &[Some("Alpha"), Some("beta"), Some("Gamma"), None, Some("alphabet"), Some("delta")],
        "score" => &[Some(10.0), Some(25.0), Some(40.0), Some(55.0), None, Some(70.0)],
        "year" => &[2019i64, 2020, 2020, 2021, 2022, 2022],
        "when" => &["2021-01-01", "2021-06-15", "bad", "2022-01-01", "2022-03-10", "2023-12-31"]
    )?)
}

#[test]
fn test_left_to_right_fold() -> Result<()> {
    let df = sample()?;
    // A = score < 30 -> {0, 1}; B = name contains "alpha" -> {0, 4}; C = id > 0
    let clauses = vec![
        FilterClause::numeric("score", FilterOperator::LessThan, 30.0),
        FilterClause::text("name", FilterOperator::Contains, "alpha").with_logic(FilterLogic::Or),
        FilterClause::numeric("id", FilterOperator::GreaterThan, 0.0).with_logic(FilterLogic::And),
    ];

    // (A or B) and C = {1, 4}; A or (B and C) would be {0, 1, 4}
    let out = apply_filters(&df, &clauses)?;
    assert_eq!(ids(&out)?, vec![1, 4]);
    Ok(())
}

#[test]
fn test_first_clause_logic_is_ignored() -> Result<()> {
    let df = sample()?;
    let clauses =
        vec![FilterClause::numeric("score", FilterOperator::GreaterThan, 50.0).with_logic(FilterLogic::Or)];
    assert_eq!(ids(&apply_filters(&df, &clauses)?)?, vec![3, 5]);
    Ok(())
}

#[test]
fn test_empty_clause_list_returns_table() -> Result<()> {
    let df = sample()?;
    let out = apply_filters(&df, &[])?;
    assert!(out.equals_missing(&df));
    Ok(())
}

#[test]
fn test_skipped_clauses_do_not_break_the_fold() -> Result<()> {
    let df = sample()?;
    let engine = FilterEngine::default();
    let clauses = vec![
        FilterClause::numeric("missing", FilterOperator::Equals, 1.0),
        FilterClause::numeric("score", FilterOperator::GreaterThan, 50.0),
        FilterClause::new("name", FilterType::Unknown, FilterOperator::Equals).with_value("x"),
        FilterClause::numeric("id", FilterOperator::Equals, 0.0).with_logic(FilterLogic::Or),
    ];
    assert!(matches!(
        engine.evaluate_clause(&df, &clauses[0]),
        ClauseOutcome::Skipped(_)
    ));
    assert_eq!(ids(&engine.apply(&df, &clauses)?)?, vec![0, 3, 5]);

    let all_skipped = &clauses[..1];
    assert!(engine.combined_mask(&df, all_skipped).is_none());
    Ok(())
}

#[test]
fn test_missing_operand_is_noop() -> Result<()> {
    let df = sample()?;
    let engine = FilterEngine::default();
    let blank = FilterClause::text("name", FilterOperator::Contains, "");
    assert_eq!(engine.evaluate_clause(&df, &blank), ClauseOutcome::NoOp);

    let between = FilterClause::numeric("score", FilterOperator::Between, 10.0);
    assert_eq!(engine.evaluate_clause(&df, &between), ClauseOutcome::NoOp);

    // a no-op keeps every row, so OR-ing it selects everything
    let clauses = vec![
        FilterClause::numeric("id", FilterOperator::Equals, 2.0),
        blank.with_logic(FilterLogic::Or),
    ];
    assert_eq!(engine.apply(&df, &clauses)?.height(), 6);

    // only no-op clauses: every row survives, in order
    let clauses = vec![
        FilterClause::text("name", FilterOperator::Contains, ""),
        FilterClause::numeric("score", FilterOperator::Between, 10.0).with_logic(FilterLogic::Or),
        FilterClause::new("when", FilterType::Date, FilterOperator::After),
    ];
    assert_eq!(
        engine.combined_mask(&df, &clauses),
        Some(RowMask::all(df.height(), true))
    );
    assert!(engine.apply(&df, &clauses)?.equals_missing(&df));
    Ok(())
}

#[test]
fn test_text_operators() -> Result<()> {
    let df = sample()?;
    let run = |op, value: &str| -> Result<Vec<i64>> {
        ids(&apply_filters(&df, &[FilterClause::text("name", op, value)])?)
    };

    assert_eq!(run(FilterOperator::Contains, "ALPHA")?, vec![0, 4]);
    assert_eq!(run(FilterOperator::Equals, "gamma")?, vec![2]);
    assert_eq!(run(FilterOperator::StartsWith, "alpha")?, vec![4]);
    assert_eq!(run(FilterOperator::EndsWith, "ta")?, vec![1, 5]);
    assert_eq!(run(FilterOperator::SpecificValues, "beta, delta ,none")?, vec![1, 5]);
    Ok(())
}

#[test]
fn test_contains_searches_a_pattern() -> Result<()> {
    let df = sample()?;
    let engine = FilterEngine::default();
    let run = |value: &str| -> Result<Vec<i64>> {
        ids(&engine.apply(&df, &[FilterClause::text("name", FilterOperator::Contains, value)])?)
    };

    assert_eq!(run("^al")?, vec![0, 4]);
    assert_eq!(run("a.p")?, vec![0, 4]);
    assert_eq!(run("ta$")?, vec![1, 5]);

    // an invalid pattern cannot be evaluated and leaves the table alone
    let broken = FilterClause::text("name", FilterOperator::Contains, "(al");
    assert!(matches!(
        engine.evaluate_clause(&df, &broken),
        ClauseOutcome::Skipped(_)
    ));
    assert_eq!(run("(al")?, vec![0, 1, 2, 3, 4, 5]);
    Ok(())
}

#[test]
fn test_case_sensitive_contains_setting() -> Result<()> {
    let df = sample()?;
    let settings = EngineSettings {
        text_contains_case_sensitive: true,
        ..Default::default()
    };
    let engine = FilterEngine::from_settings(&settings);
    let out = engine.apply(&df, &[FilterClause::text("name", FilterOperator::Contains, "Alpha")])?;
    assert_eq!(ids(&out)?, vec![0]);
    Ok(())
}

#[test]
fn test_numeric_operators() -> Result<()> {
    let df = sample()?;
    let run = |clause: FilterClause| -> Result<Vec<i64>> { ids(&apply_filters(&df, &[clause])?) };

    assert_eq!(run(FilterClause::numeric("score", FilterOperator::Equals, 40.0))?, vec![2]);
    assert_eq!(
        run(FilterClause::numeric("score", FilterOperator::Between, 25.0).with_value2(55))?,
        vec![1, 2, 3]
    );
    assert_eq!(run(FilterClause::numeric("score", FilterOperator::DivisibleBy, 20.0))?, vec![2]);
    assert_eq!(run(FilterClause::numeric("score", FilterOperator::DivisibleBy, 0.0))?, Vec::<i64>::new());
    assert_eq!(run(FilterClause::numeric("id", FilterOperator::FirstN, 2.0))?, vec![0, 1]);
    assert_eq!(run(FilterClause::numeric("id", FilterOperator::LastN, 2.5))?, vec![4, 5]);

    // operand given as a string
    let clause = FilterClause::new("score", FilterType::Numeric, FilterOperator::GreaterThan)
        .with_value("54.5");
    assert_eq!(run(clause)?, vec![3, 5]);
    Ok(())
}

#[test]
fn test_every_nth_is_positional() -> Result<()> {
    let df = df!("id" => (0..25).collect::<Vec<i64>>(), "v" => vec![1.0; 25])?;
    let out = apply_filters(&df, &[FilterClause::numeric("v", FilterOperator::EveryNth, 5.0)])?;
    assert_eq!(ids(&out)?, vec![0, 5, 10, 15, 20]);

    let zero = FilterClause::numeric("v", FilterOperator::EveryNth, 0.0);
    assert_eq!(FilterEngine::default().evaluate_clause(&df, &zero), ClauseOutcome::NoOp);
    Ok(())
}

#[test]
fn test_unparseable_operand_is_skipped() -> Result<()> {
    let df = sample()?;
    let clause = FilterClause::new("score", FilterType::Numeric, FilterOperator::Equals)
        .with_value("ten");
    assert!(matches!(
        FilterEngine::default().evaluate_clause(&df, &clause),
        ClauseOutcome::Skipped(_)
    ));

    // numeric comparison on a column with no numbers
    let clause = FilterClause::numeric("name", FilterOperator::GreaterThan, 1.0);
    assert!(matches!(
        FilterEngine::default().evaluate_clause(&df, &clause),
        ClauseOutcome::Skipped(_)
    ));
    Ok(())
}

#[test]
fn test_date_operators() -> Result<()> {
    let df = sample()?;
    let date = |op| FilterClause::new("when", FilterType::Date, op);

    let out = apply_filters(&df, &[date(FilterOperator::After).with_value("2022-01-01")])?;
    assert_eq!(ids(&out)?, vec![4, 5]);

    let out = apply_filters(&df, &[date(FilterOperator::Before).with_value("15.06.2021")])?;
    assert_eq!(ids(&out)?, vec![0]);

    let out = apply_filters(
        &df,
        &[date(FilterOperator::Between)
            .with_value("2021-06-15")
            .with_value2("2022-01-01")],
    )?;
    assert_eq!(ids(&out)?, vec![1, 3]);

    let out = apply_filters(&df, &[date(FilterOperator::Equals).with_value("2021-01-01")])?;
    assert_eq!(ids(&out)?, vec![0]);
    Ok(())
}

#[test]
fn test_date_column_with_temporal_dtype() -> Result<()> {
    let df = sample()?;
    let when = df.column("when")?.as_materialized_series().cast(&DataType::Date)?;
    let mut typed = df.clone();
    typed.with_column(when)?;

    let clause = FilterClause::new("when", FilterType::Date, FilterOperator::After)
        .with_value("2022-01-01");
    assert_eq!(ids(&apply_filters(&typed, &[clause])?)?, vec![4, 5]);

    let year = FilterClause::new("when", FilterType::Year, FilterOperator::Equals).with_value(2021);
    assert_eq!(ids(&apply_filters(&typed, &[year])?)?, vec![0, 1]);
    Ok(())
}

#[test]
fn test_year_operators() -> Result<()> {
    let df = sample()?;
    let year = |op, value: i32| FilterClause::new("year", FilterType::Year, op).with_value(value);

    assert_eq!(ids(&apply_filters(&df, &[year(FilterOperator::Equals, 2020)])?)?, vec![1, 2]);
    assert_eq!(ids(&apply_filters(&df, &[year(FilterOperator::LessThan, 2020)])?)?, vec![0]);
    assert_eq!(
        ids(&apply_filters(&df, &[year(FilterOperator::Between, 2020).with_value2("2021")])?)?,
        vec![1, 2, 3]
    );

    // first_n / last_n pick distinct years, then keep all their rows
    assert_eq!(ids(&apply_filters(&df, &[year(FilterOperator::FirstN, 2)])?)?, vec![0, 1, 2]);
    assert_eq!(ids(&apply_filters(&df, &[year(FilterOperator::LastN, 1)])?)?, vec![4, 5]);
    Ok(())
}

#[test]
fn test_axis_filters() -> Result<()> {
    let df = df!(
        "id" => &[0i64, 1, 2, 3, 4, 5, 6],
        "x" => &["c", "a", "b", "a", "d", "e", "c"],
        "n" => &[3.0, 1.0, 2.0, 1.0, 4.0, 5.0, 3.0]
    )?;

    // distinct sorted: a b c d e
    let every = AxisFilter::new(AxisFilterKind::EveryNth, 2);
    assert_eq!(ids(&every.apply(&df, "x")?)?, vec![0, 1, 3, 5, 6]);

    let first = AxisFilter::new(AxisFilterKind::FirstN, 2);
    assert_eq!(ids(&first.apply(&df, "n")?)?, vec![1, 2, 3]);

    let last = AxisFilter::new(AxisFilterKind::LastN, "1");
    assert_eq!(ids(&last.apply(&df, "x")?)?, vec![5]);

    let numeric = AxisFilter::new(AxisFilterKind::SpecificValues, "1, 4");
    assert_eq!(ids(&numeric.apply(&df, "n")?)?, vec![1, 3, 4]);

    let text = AxisFilter::new(AxisFilterKind::SpecificValues, "b,e");
    assert_eq!(ids(&text.apply(&df, "x")?)?, vec![2, 5]);

    let missing = AxisFilter::new(AxisFilterKind::FirstN, 2);
    assert_eq!(missing.apply(&df, "nope")?.height(), 7);

    let non_positive = AxisFilter::new(AxisFilterKind::EveryNth, 0);
    assert_eq!(non_positive.evaluate(&df, "x"), ClauseOutcome::NoOp);
    Ok(())
}

#[test]
fn test_clauses_from_json() -> Result<()> {
    let df = sample()?;
    let clauses: Vec<FilterClause> = serde_json::from_str(
        r#"[
            {"column": "score", "type": "numeric", "operator": "greater_than", "value": 20},
            {"column": "name", "type": "text", "operator": "equals", "value": "BETA", "logic": "and"}
        ]"#,
    )?;
    assert_eq!(ids(&apply_filters(&df, &clauses)?)?, vec![1]);
    Ok(())
}
