//! End-to-end tests over the public API: load a CSV, profile it, clean it
//! with a pipeline and narrow it down with filter clauses.

use anyhow::Result;
use datainspect::config::{EngineSettings, load_settings_from, save_settings_to};
use datainspect::data::io::{load_csv, save_csv};
use datainspect::data::{Dataset, SemanticType};
use datainspect::filter::{FilterClause, FilterEngine, FilterLogic, FilterOperator, FilterType};
use datainspect::transform::{DataTransformation, OperationKind, TransformationPipeline};
use polars::prelude::*;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;

const FRUIT_CSV: &str = "\
id,name,price,sold_on,region
1,Apple,1.5,2021-01-05,north
2,banana,,2021-06-10,south
3,Cherry,12.0,2022-02-01,north
4,date fruit,30.0,2022-08-15,east
5,Elder,,2023-03-03,south
";

fn write_fixture(dir: &Path) -> Result<std::path::PathBuf> {
    let path = dir.join("fruit.csv");
    std::fs::write(&path, FRUIT_CSV)?;
    Ok(path)
}

fn ids(df: &DataFrame) -> Result<Vec<i64>> {
    Ok(df
        .column("id")?
        .as_materialized_series()
        .i64()?
        .into_iter()
        .flatten()
        .collect())
}

#[test]
fn test_csv_profile_clean_filter() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_fixture(dir.path())?;

    let mut dataset = Dataset::new(load_csv(&path)?, HashMap::new())?;
    let metadata = dataset.generate_metadata(Some(&HashMap::from([(
        "source".to_owned(),
        json!("fruit.csv"),
    )])));
    assert_eq!(metadata["rows"], json!(5));
    assert_eq!(metadata["columns"], json!(5));
    assert_eq!(metadata["source"], json!("fruit.csv"));

    let price = dataset.get_column_by_name("price").expect("price profile");
    assert_eq!(price.data_type, SemanticType::Numeric);
    assert_eq!(price.stats.null_count, 2);
    assert_eq!(price.stats.count, 3);
    let name = dataset.get_column_by_name("name").expect("name profile");
    assert_eq!(name.data_type, SemanticType::Text);
    assert_eq!(name.stats.unique_count, 5);

    let mut pipeline = TransformationPipeline::default();
    pipeline.add(DataTransformation::new(
        "price",
        OperationKind::ReplaceMedian,
        Default::default(),
    ));
    pipeline.add(DataTransformation::new(
        "name",
        OperationKind::TextUppercase,
        Default::default(),
    ));
    let cleaned = pipeline.apply_all(&dataset.data);

    // the source table is left untouched
    assert_eq!(dataset.data.column("price")?.null_count(), 2);

    let prices: Vec<f64> = cleaned
        .column("price")?
        .as_materialized_series()
        .f64()?
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(prices, vec![1.5, 12.0, 12.0, 30.0, 12.0]);

    dataset.replace_data(cleaned)?;
    let price = dataset.get_column_by_name("price").expect("price profile");
    assert_eq!(price.stats.null_count, 0);

    // (price > 10 AND region = north) OR sold_on after 2023-01-01
    let clauses = vec![
        FilterClause::numeric("price", FilterOperator::GreaterThan, 10.0),
        FilterClause::text("region", FilterOperator::Equals, "north"),
        FilterClause::new("sold_on", FilterType::Date, FilterOperator::After)
            .with_value("2023-01-01")
            .with_logic(FilterLogic::Or),
    ];
    let filtered = FilterEngine::default().apply(&dataset.data, &clauses)?;
    assert_eq!(ids(&filtered)?, vec![3, 5]);

    let out = dir.path().join("filtered.csv");
    let mut to_save = filtered;
    save_csv(&mut to_save, &out)?;
    let reloaded = load_csv(&out)?;
    assert_eq!(ids(&reloaded)?, vec![3, 5]);
    assert_eq!(
        reloaded.column("name")?.as_materialized_series().str()?.get(1),
        Some("ELDER")
    );
    Ok(())
}

#[test]
fn test_all_null_numeric_column_profile() -> Result<()> {
    let df = df!("reading" => &[None::<f64>, None, None, None])?;
    let dataset = Dataset::new(df, HashMap::new())?;

    let profile = &dataset.columns[0];
    assert_eq!(profile.data_type, SemanticType::Numeric);
    assert_eq!(profile.stats.count, 0);
    assert_eq!(profile.stats.null_count, 4);
    assert_eq!(profile.stats.unique_count, 0);
    let numeric = profile.stats.numeric.as_ref().expect("numeric stats");
    assert!(numeric.mean.is_none());
    assert!(numeric.std.is_none());
    Ok(())
}

#[test]
fn test_pipeline_json_survives_a_round_trip_and_reapplies() -> Result<()> {
    let df = df!(
        "score" => &[Some(10.0), None, Some(30.0)],
        "label" => &["  a ", "b", " c"],
    )?;

    let mut pipeline = TransformationPipeline::default();
    pipeline.add(DataTransformation::new(
        "score",
        OperationKind::ReplaceCustom,
        [("value".to_owned(), json!(0))].into_iter().collect(),
    ));
    pipeline.add(DataTransformation::new(
        "label",
        OperationKind::TextTrim,
        Default::default(),
    ));

    let restored = TransformationPipeline::from_json(&pipeline.to_json()?)?;
    assert_eq!(restored, pipeline);
    assert!(restored.apply_all(&df).equals_missing(&pipeline.apply_all(&df)));
    Ok(())
}

#[test]
fn test_settings_shape_engine_behaviour() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("settings.json");

    let settings = EngineSettings {
        text_contains_case_sensitive: true,
        ..EngineSettings::default()
    };
    save_settings_to(&settings, &path)?;
    let loaded = load_settings_from(&path);
    assert!(loaded.text_contains_case_sensitive);

    let df = df!("id" => &[1i64, 2, 3], "name" => &["Alpha", "alphabet", "beta"])?;
    let clauses = vec![FilterClause::text("name", FilterOperator::Contains, "alpha")];

    let strict = FilterEngine::from_settings(&loaded).apply(&df, &clauses)?;
    assert_eq!(ids(&strict)?, vec![2]);
    let relaxed = FilterEngine::default().apply(&df, &clauses)?;
    assert_eq!(ids(&relaxed)?, vec![1, 2]);
    Ok(())
}
