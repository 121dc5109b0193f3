//! Trace ingestion: frame tokens and stall log parsing.
//!
//! This module handles:
//! - Parsing frame tokens (bare and module-qualified addresses)
//! - Extracting `(duration, backtrace)` records from reactor log lines
//! - Trimming the stall detector's own frames off each backtrace

pub mod schema;
pub mod stall_log;

// Re-export main types
pub use schema::{Frame, StallTrace};
pub use stall_log::{parse_stall_line, trim_instrumentation, LineStats, StallLog, TraceFilter};
