//! Stall Analyser
//!
//! Aggregates reactor stall backtraces into a weighted call graph and
//! prints it heaviest path first, optionally resolving addresses to
//! source locations through `addr2line`.
//!
//! This crate provides the core implementation for the
//! `stall-analyser` CLI tool.
//!
//! ## Getting Started
//!
//! ```bash
//! stall-analyser -e ./build/release/scylla --width 160 scylla.log
//! journalctl -u scylla | stall-analyser --direction top-down
//! ```

pub mod aggregator;
pub mod commands;
pub mod flamegraph;
pub mod output;
pub mod parser;
pub mod render;
pub mod resolver;
pub mod utils;
