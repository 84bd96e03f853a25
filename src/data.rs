//! Datasets, column profiling and the value helpers shared across the engine.

pub mod dataset;
pub mod io;
pub mod profiler;
pub mod values;

pub use dataset::Dataset;
pub use profiler::{
    ColumnProfile, ColumnStats, NumericStats, SemanticType, infer_semantic_type, profile_column,
    profile_frame,
};
