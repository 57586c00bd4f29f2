//! Run orchestration.
//!
//! This module ties the pieces together for a scheduled run:
//! - Cache gate per ticker (reuse or recompute)
//! - Provider fetch with failures isolated to the ticker
//! - Result set and run summary

pub mod pipeline;
pub mod results;

pub use pipeline::{fetch_and_evaluate, Runner};
pub use results::{ResultSet, RunSummary, TickerReport, TickerStatus};
