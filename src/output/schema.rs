//! JSON report schema.
//!
//! Schema is versioned to allow future evolution.

use crate::aggregator::{CallGraph, Link, NodeId, StallDistribution};
use crate::parser::Frame;
use crate::utils::config::SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level report structure written to JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Schema version for compatibility checking
    pub version: String,

    /// Timestamp when the report was generated (RFC 3339)
    pub generated_at: String,

    /// Number of traces aggregated into the graph
    pub stall_count: u64,

    /// Duration statistics over the aggregated traces
    pub distribution: StallDistribution,

    /// Frames never seen with a caller
    pub roots: Vec<Frame>,

    /// Frames never seen with a callee (where the stalls happened)
    pub leaves: Vec<Frame>,

    /// Every frame, in first-seen order
    pub nodes: Vec<NodeReport>,
}

/// One frame and its edges
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeReport {
    pub frame: Frame,
    pub total: u64,
    pub count: u64,
    pub callers: Vec<EdgeReport>,
    pub callees: Vec<EdgeReport>,
}

/// Weighted edge to a neighbouring frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeReport {
    pub frame: Frame,
    pub total: u64,
    pub count: u64,
}

/// Snapshot the graph into a serializable report
///
/// **Public** - used by commands before writing JSON
pub fn build_report(graph: &CallGraph, distribution: StallDistribution) -> Report {
    use chrono::Utc;

    let nodes = graph
        .node_ids()
        .map(|id| {
            let node = graph.node(id);
            NodeReport {
                frame: node.frame().clone(),
                total: node.total(),
                count: node.count(),
                callers: edges(graph, node.callers()),
                callees: edges(graph, node.callees()),
            }
        })
        .collect();

    Report {
        version: SCHEMA_VERSION.to_string(),
        generated_at: Utc::now().to_rfc3339(),
        stall_count: graph.trace_count(),
        distribution,
        roots: graph.roots().map(|id| graph.node(id).frame().clone()).collect(),
        leaves: graph.leaves().map(|id| graph.node(id).frame().clone()).collect(),
        nodes,
    }
}

/// Non-sentinel edges, heaviest first
///
/// **Private** - internal conversion
fn edges(graph: &CallGraph, links: &BTreeMap<NodeId, Link>) -> Vec<EdgeReport> {
    let mut edges: Vec<EdgeReport> = links
        .iter()
        .filter(|(id, _)| !graph.is_sentinel(**id))
        .map(|(id, link)| EdgeReport {
            frame: graph.node(*id).frame().clone(),
            total: link.total,
            count: link.count,
        })
        .collect();

    edges.sort_by(|a, b| b.total.cmp(&a.total).then(b.count.cmp(&a.count)));
    edges
}
