use anyhow::Result;
use clap::{Parser, Subcommand};
use datainspect::config::{self, EngineSettings};
use datainspect::data::io::{load_csv, save_csv};
use datainspect::data::{ColumnProfile, Dataset};
use datainspect::error::{DataInspectError, ResultExt as _};
use datainspect::filter::{FilterClause, FilterEngine};
use datainspect::transform::{OperationKind, TransformationPipeline};
use datainspect::utils::fmt_opt;
use polars::prelude::DataFrame;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "datainspect",
    about = "Profile, transform and filter tabular data"
)]
pub struct Cli {
    /// Settings file (defaults to the platform config location)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log to the console only, without writing log files
    #[arg(long, global = true)]
    pub quiet_files: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the inferred type and statistics of each column
    Profile {
        /// CSV file to profile
        file: PathBuf,

        /// Only profile this column
        #[arg(short, long)]
        column: Option<String>,

        /// Emit the profiles as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply a saved transformation pipeline
    Transform {
        /// CSV file to transform
        file: PathBuf,

        /// Pipeline JSON file
        #[arg(short, long)]
        pipeline: PathBuf,

        /// Where to write the result. Prints a preview when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Keep the rows matching a list of filter clauses
    Filter {
        /// CSV file to filter
        file: PathBuf,

        /// JSON array of clauses
        #[arg(short, long)]
        clauses: PathBuf,

        /// Where to write the result. Prints a preview when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the available transformation operations
    Operations,
    /// Print the effective engine settings as JSON
    Settings {
        /// Also write them to the settings file, creating it if needed
        #[arg(long)]
        write: bool,
    },
}

pub fn run_command(cli: Cli) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => config::load_settings_from(path),
        None => config::load_settings(),
    };

    match cli.command {
        Commands::Profile { file, column, json } => {
            run_profile(&file, column.as_deref(), json, &settings)
        }
        Commands::Transform {
            file,
            pipeline,
            output,
        } => run_transform(&file, &pipeline, output.as_deref(), &settings),
        Commands::Filter {
            file,
            clauses,
            output,
        } => run_filter(&file, &clauses, output.as_deref(), &settings),
        Commands::Operations => {
            run_operations(&settings);
            Ok(())
        }
        Commands::Settings { write } => run_settings(&settings, write, cli.config.as_deref()),
    }
}

fn load_dataset(file: &Path) -> Result<Dataset> {
    let df = load_csv(file)?;
    let source: HashMap<String, serde_json::Value> = [(
        "source".to_owned(),
        serde_json::json!(file.display().to_string()),
    )]
    .into_iter()
    .collect();

    let mut dataset = Dataset::new(df, HashMap::new())?;
    dataset.generate_metadata(Some(&source));
    Ok(dataset)
}

fn run_profile(
    file: &Path,
    column: Option<&str>,
    json: bool,
    settings: &EngineSettings,
) -> Result<()> {
    let dataset = load_dataset(file)?;
    let profiles: Vec<&ColumnProfile> = match column {
        Some(name) => vec![
            dataset
                .get_column_by_name(name)
                .ok_or_else(|| DataInspectError::ColumnNotFound(name.to_owned()))?,
        ],
        None => dataset.columns.iter().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&profiles)?);
        return Ok(());
    }

    println!(
        "{} rows x {} columns ({})",
        dataset.row_count(),
        dataset.column_count(),
        file.display()
    );
    for profile in profiles {
        let stats = &profile.stats;
        println!(
            "\n{} [{} / {}]  count={} nulls={} ({:.1}%) unique={}",
            profile.name,
            profile.data_type,
            profile.original_type,
            stats.count,
            stats.null_count,
            profile.null_pct(),
            stats.unique_count
        );
        if let Some(n) = &stats.numeric {
            println!(
                "  min={} max={} mean={} median={} std={}",
                fmt_opt(n.min),
                fmt_opt(n.max),
                fmt_opt(n.mean),
                fmt_opt(n.median),
                fmt_opt(n.std)
            );
        }
    }

    println!("\n{}", dataset.preview(settings));
    Ok(())
}

fn run_transform(
    file: &Path,
    pipeline_path: &Path,
    output: Option<&Path>,
    settings: &EngineSettings,
) -> Result<()> {
    let json = std::fs::read_to_string(pipeline_path)
        .with_context(|| format!("Failed to read pipeline {}", pipeline_path.display()))?;
    let pipeline = TransformationPipeline::from_json(&json)?;
    let mut dataset = load_dataset(file)?;

    println!("Applying {} step(s):", pipeline.len());
    for (idx, description) in pipeline.descriptions().iter().enumerate() {
        println!("  {}. {description}", idx + 1);
    }

    let result = pipeline.apply_all_with(&dataset.data, settings);
    dataset.replace_data(result)?;
    finish(dataset.data, output, settings)
}

fn run_filter(
    file: &Path,
    clauses_path: &Path,
    output: Option<&Path>,
    settings: &EngineSettings,
) -> Result<()> {
    let clauses = read_clauses(clauses_path)?;
    let dataset = load_dataset(file)?;

    let result = FilterEngine::from_settings(settings).apply(&dataset.data, &clauses)?;
    println!(
        "{} of {} rows match {} clause(s)",
        result.height(),
        dataset.row_count(),
        clauses.len()
    );
    finish(result, output, settings)
}

fn read_clauses(path: &Path) -> datainspect::error::Result<Vec<FilterClause>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read filter clauses {}", path.display()))?;
    let clauses = serde_json::from_str(&json).context("Invalid filter clause JSON")?;
    Ok(clauses)
}

fn finish(mut df: DataFrame, output: Option<&Path>, settings: &EngineSettings) -> Result<()> {
    match output {
        Some(path) => {
            save_csv(&mut df, path)?;
            println!("Wrote {} rows to {}", df.height(), path.display());
        }
        None => println!("{}", df.head(Some(settings.preview_rows))),
    }
    Ok(())
}

fn run_operations(settings: &EngineSettings) {
    for kind in OperationKind::ALL {
        let defaults = kind.default_parameters(settings);
        let params = if defaults.is_empty() {
            String::new()
        } else {
            serde_json::Value::Object(defaults.into_iter().collect()).to_string()
        };
        println!(
            "{:<24} {:<20} {params}",
            kind.id(),
            kind.category().label()
        );
    }
}

fn run_settings(settings: &EngineSettings, write: bool, path: Option<&Path>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(settings)?);
    if write {
        match path {
            Some(path) => config::save_settings_to(settings, path)?,
            None => config::save_settings(settings)?,
        }
        tracing::info!("Settings saved");
    }
    Ok(())
}
