//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors raised by the call-graph aggregator
#[derive(Error, Debug, PartialEq, Eq)]
pub enum GraphError {
    #[error("Invalid stall weight: {0} (must be non-negative)")]
    InvalidWeight(i64),
}

/// Errors that can occur while extracting a trace from a log line
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Line is not a stall report")]
    NotAStall,

    #[error("Invalid stall duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid frame address: {0}")]
    InvalidAddress(String),

    #[error("Stall report carries no backtrace")]
    EmptyBacktrace,
}

/// Errors inside a resolver session.
///
/// These never escape `resolve`; they move the session into its
/// unavailable state instead.
#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Resolver pipe error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resolver exited without answering")]
    Closed,
}

/// Errors that can occur during flamegraph generation
#[derive(Error, Debug)]
pub enum FlamegraphError {
    #[error("Empty stack data")]
    EmptyStacks,

    #[error("Failed to render flamegraph: {0}")]
    Render(String),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
