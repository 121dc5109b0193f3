//! CLI command implementations.
//!
//! Commands orchestrate the various library components to perform user tasks.

pub mod analyze;
pub mod models;

// Re-export main command functions
pub use analyze::{execute_analyze, execute_analyze_with, validate_args};
pub use models::{parse_threshold, AnalysisSummary, AnalyzeArgs};
