//! Column transformation catalog and ordered pipelines.
//!
//! Every step is a pure column → column function selected by an
//! [`OperationKind`] and configured through a JSON parameter map. Applying a
//! step never fails: a missing column, malformed parameters or an operation
//! error leave the table as it was and emit a `tracing` warning.
//!
//! ```no_run
//! use datainspect::transform::{DataTransformation, OperationKind, TransformationPipeline};
//! use polars::prelude::*;
//!
//! let df = df!("price" => &[Some(1.0), None, Some(3.0)])?;
//! let mut pipeline = TransformationPipeline::default();
//! pipeline.add(DataTransformation::new("price", OperationKind::ReplaceMean, Default::default()));
//! let cleaned = pipeline.apply_all(&df);
//! assert_eq!(cleaned.column("price")?.null_count(), 0);
//! # Ok::<(), PolarsError>(())
//! ```

pub mod catalog;
mod operations;
pub mod pipeline;
pub mod transformation;

pub use catalog::{
    ColumnOperation, ConversionErrors, OperationKind, Parameters, TransformationCategory,
};
pub use pipeline::TransformationPipeline;
pub use transformation::DataTransformation;
