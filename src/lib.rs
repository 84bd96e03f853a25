//! # datainspect - column profiling, cleaning and filtering for tabular data
//!
//! datainspect loads a table into a Polars `DataFrame`, profiles each column,
//! runs ordered cleaning pipelines over it and narrows it down with composable
//! filter clauses. Every operation returns a new frame; the input is never
//! modified.
//!
//! ## Quick Start
//!
//! ```no_run
//! use datainspect::data::{Dataset, io::load_csv};
//! use datainspect::filter::{FilterClause, FilterEngine, FilterOperator};
//! use datainspect::transform::{DataTransformation, OperationKind, TransformationPipeline};
//! use std::collections::HashMap;
//!
//! # fn example() -> anyhow::Result<()> {
//! let df = load_csv("sales.csv".as_ref())?;
//! let dataset = Dataset::new(df, HashMap::new())?;
//! for col in &dataset.columns {
//!     println!("{}: {} ({} nulls)", col.name, col.data_type, col.stats.null_count);
//! }
//!
//! let mut pipeline = TransformationPipeline::default();
//! pipeline.add(DataTransformation::new("price", OperationKind::ReplaceMedian, Default::default()));
//! let cleaned = pipeline.apply_all(&dataset.data);
//!
//! let clauses = vec![FilterClause::numeric("price", FilterOperator::GreaterThan, 10.0)];
//! let expensive = FilterEngine::default().apply(&cleaned, &clauses)?;
//! println!("{} rows", expensive.height());
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`data`]: the [`Dataset`] container, column profiling and CSV I/O
//! - [`transform`]: the operation catalog, single-column transformations
//!   and pipelines
//! - [`filter`]: filter clauses, the left-to-right mask fold and axis
//!   subsampling
//! - [`config`]: persisted engine settings
//! - [`error`]: error types and handling utilities
//! - [`logging`]: tracing setup with rolling log files

#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod data;
pub mod error;
pub mod filter;
pub mod logging;
pub mod transform;
pub mod utils;

pub use config::EngineSettings;
pub use data::{ColumnProfile, Dataset, SemanticType};
pub use error::{DataInspectError, Result, ResultExt};
pub use filter::{FilterClause, FilterEngine, FilterLogic, FilterOperator, FilterType};
pub use transform::{DataTransformation, OperationKind, TransformationPipeline};
