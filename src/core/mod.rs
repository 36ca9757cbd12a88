// This module groups the infrastructure shared by every stage of the planner: the common
// error type and the small text-table reader used by the region table, the cache table
// and the memory profile. Everything here is independent of the trace format and of the
// region tree so that the loaders and the planner can share it without cycles.

//! Shared infrastructure for the loaders and the planner.
//!
//! # Key Components
//!
//! ## Errors (`error`)
//! - One [`PlanError`] enum for every fatal condition of a run
//! - [`PlanResult`] alias used throughout the crate
//!
//! ## Text tables (`text`)
//! - Line-oriented field splitting with line numbers for diagnostics
//! - Typed field parsing that reports the failing column

pub mod error;
pub mod text;

#[cfg(test)]
pub mod test_utils;

pub use error::{PlanError, PlanResult};
pub use text::{FieldSplit, TextLine};
