//! Row filtering by composable per-column clauses.
//!
//! Clauses are evaluated independently against the same table and their row
//! masks are folded strictly left to right with each clause's own AND/OR
//! marker; there is no operator precedence.

pub mod axis;
pub mod clause;
pub mod engine;
pub mod mask;

pub use axis::{AxisFilter, AxisFilterKind};
pub use clause::{FilterClause, FilterLogic, FilterOperator, FilterType, FilterValue};
pub use engine::{ClauseOutcome, FilterEngine, apply_filters};
pub use mask::RowMask;

#[cfg(test)]
mod tests;
