//! Flamegraph generation using the inferno library.
//!
//! This module converts collapsed stall stacks into interactive SVG flamegraphs.
//! Flamegraphs provide a visual representation of where stall time accumulates.

pub mod generator;

// Re-export main types
pub use generator::{generate_flamegraph, FlamegraphConfig};
