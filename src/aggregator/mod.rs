//! Aggregation of stall traces into a call graph, collapsed stacks and metrics.
//!
//! This module transforms parsed stall traces into:
//! - A weighted caller/callee graph (for the tree report)
//! - Collapsed stack format (for flamegraph generation)
//! - Stall duration statistics

pub mod call_graph;
pub mod metrics;
pub mod stack_builder;

// Re-export main types and functions
pub use call_graph::{CallGraph, Link, Node, NodeId, HEAD, TAIL};
pub use metrics::{calculate_stall_distribution, StallDistribution};
pub use stack_builder::{CollapsedStack, StackBuilder};
