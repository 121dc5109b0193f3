//! Incremental call-graph aggregation of stall backtraces.
//!
//! Every distinct frame becomes one node in an arena, addressed by
//! [`NodeId`]. Nodes record weighted links to their callers and callees.
//! A link between two nodes is stored twice, once on each side, and both
//! copies are always updated together.
//!
//! Two sentinel nodes bound the graph: `head` calls every node that has
//! never been seen with a caller (the roots), and `tail` is called by
//! every node that has never been seen with a callee (the stall sites).
//! Both sets are maintained as traces arrive, never by rescanning.

use crate::parser::Frame;
use crate::utils::error::GraphError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Index of a node in the graph arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Sentinel calling every root
pub const HEAD: NodeId = NodeId(0);

/// Sentinel called by every leaf
pub const TAIL: NodeId = NodeId(1);

/// Cumulative weight of one directed edge endpoint.
///
/// Both fields saturate at `u64::MAX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Sum of the durations of all traces crossing this edge
    pub total: u64,

    /// Number of traces crossing this edge
    pub count: u64,
}

impl Link {
    fn add(&mut self, weight: u64) {
        self.total = self.total.saturating_add(weight);
        self.count = self.count.saturating_add(1);
    }
}

/// One distinct frame and its neighbourhood
#[derive(Debug, Clone)]
pub struct Node {
    frame: Frame,
    total: u64,
    count: u64,
    callers: BTreeMap<NodeId, Link>,
    callees: BTreeMap<NodeId, Link>,
}

impl Node {
    fn new(frame: Frame) -> Self {
        Self {
            frame,
            total: 0,
            count: 0,
            callers: BTreeMap::new(),
            callees: BTreeMap::new(),
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Sum of the durations of every trace mentioning this frame
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of times this frame was mentioned
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Rounded average stall duration through this frame
    pub fn average(&self) -> u64 {
        if self.count == 0 {
            return 0;
        }
        let (quotient, remainder) = (self.total / self.count, self.total % self.count);
        // Round half up without forming total + count / 2
        quotient + u64::from(remainder >= self.count - remainder)
    }

    /// Links to the frames calling this one (may include `HEAD`)
    pub fn callers(&self) -> &BTreeMap<NodeId, Link> {
        &self.callers
    }

    /// Links to the frames this one calls (may include `TAIL`)
    pub fn callees(&self) -> &BTreeMap<NodeId, Link> {
        &self.callees
    }

    fn has_real_callers(&self) -> bool {
        self.callers.keys().any(|id| *id != HEAD)
    }

    fn has_real_callees(&self) -> bool {
        self.callees.keys().any(|id| *id != TAIL)
    }
}

/// Aggregated call graph of all ingested stall traces
#[derive(Debug, Clone)]
pub struct CallGraph {
    nodes: Vec<Node>,
    index: HashMap<Frame, NodeId>,
    traces: u64,
}

impl Default for CallGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl CallGraph {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(Frame::sentinel()), Node::new(Frame::sentinel())],
            index: HashMap::new(),
            traces: 0,
        }
    }

    /// Fold one trace into the graph.
    ///
    /// `frames` runs innermost first. An empty trace is a no-op.
    ///
    /// # Errors
    /// * `GraphError::InvalidWeight` - `weight` is negative; the graph is untouched
    pub fn ingest(&mut self, weight: i64, frames: &[Frame]) -> Result<(), GraphError> {
        let weight = u64::try_from(weight).map_err(|_| GraphError::InvalidWeight(weight))?;

        let ids: Vec<NodeId> = frames.iter().map(|frame| self.intern(frame)).collect();
        let (Some(&innermost), Some(&outermost)) = (ids.first(), ids.last()) else {
            return Ok(());
        };

        for id in &ids {
            self.touch(*id, weight);
        }
        for pair in ids.windows(2) {
            self.link_frames(pair[1], pair[0], weight);
        }

        if !self.nodes[innermost.0].has_real_callees() {
            self.link(innermost, TAIL, weight);
        }
        if !self.nodes[outermost.0].has_real_callers() {
            self.link(HEAD, outermost, weight);
        }

        self.traces += 1;
        Ok(())
    }

    /// Get-or-create the node for `frame`
    fn intern(&mut self, frame: &Frame) -> NodeId {
        if let Some(id) = self.index.get(frame) {
            return *id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(frame.clone()));
        self.index.insert(frame.clone(), id);
        id
    }

    fn touch(&mut self, id: NodeId, weight: u64) {
        let node = &mut self.nodes[id.0];
        node.total = node.total.saturating_add(weight);
        node.count = node.count.saturating_add(1);
    }

    /// Record that `outer` called `inner`, retracting sentinel edges the
    /// new evidence contradicts
    fn link_frames(&mut self, outer: NodeId, inner: NodeId, weight: u64) {
        self.link(outer, inner, weight);
        self.unlink(HEAD, inner);
        self.unlink(outer, TAIL);
    }

    /// Add `weight` to both sides of the `caller -> callee` edge
    fn link(&mut self, caller: NodeId, callee: NodeId, weight: u64) {
        self.nodes[caller.0]
            .callees
            .entry(callee)
            .or_default()
            .add(weight);
        self.nodes[callee.0]
            .callers
            .entry(caller)
            .or_default()
            .add(weight);
    }

    /// Remove both sides of the `caller -> callee` edge, if present
    fn unlink(&mut self, caller: NodeId, callee: NodeId) {
        self.nodes[caller.0].callees.remove(&callee);
        self.nodes[callee.0].callers.remove(&caller);
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn head(&self) -> &Node {
        self.node(HEAD)
    }

    pub fn tail(&self) -> &Node {
        self.node(TAIL)
    }

    pub fn lookup(&self, frame: &Frame) -> Option<NodeId> {
        self.index.get(frame).copied()
    }

    pub fn find(&self, frame: &Frame) -> Option<&Node> {
        self.lookup(frame).map(|id| self.node(id))
    }

    pub fn is_sentinel(&self, id: NodeId) -> bool {
        id == HEAD || id == TAIL
    }

    /// Number of frame nodes, sentinels excluded
    pub fn len(&self) -> usize {
        self.nodes.len() - 2
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Arena size including the two sentinels
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Number of successfully ingested non-empty traces
    pub fn trace_count(&self) -> u64 {
        self.traces
    }

    /// Frame nodes in first-seen order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (2..self.nodes.len()).map(NodeId)
    }

    /// Nodes never observed with a caller
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.head().callees.keys().copied()
    }

    /// Nodes never observed with a callee
    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.tail().callers.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(addrs: &[&str]) -> Vec<Frame> {
        addrs.iter().map(|a| Frame::new(*a)).collect()
    }

    fn id(graph: &CallGraph, addr: &str) -> NodeId {
        graph.lookup(&Frame::new(addr)).unwrap()
    }

    #[test]
    fn test_single_frame_is_root_and_leaf() {
        let mut graph = CallGraph::new();
        graph.ingest(10, &trace(&["0x1"])).unwrap();

        let x = id(&graph, "0x1");
        assert_eq!(graph.roots().collect::<Vec<_>>(), vec![x]);
        assert_eq!(graph.leaves().collect::<Vec<_>>(), vec![x]);
        assert_eq!(graph.head().callees()[&x], Link { total: 10, count: 1 });
    }

    #[test]
    fn test_link_is_mirrored() {
        let mut graph = CallGraph::new();
        graph.ingest(7, &trace(&["0x1", "0x2"])).unwrap();
        graph.ingest(5, &trace(&["0x1", "0x2"])).unwrap();

        let inner = id(&graph, "0x1");
        let outer = id(&graph, "0x2");
        let expected = Link { total: 12, count: 2 };
        assert_eq!(graph.node(outer).callees()[&inner], expected);
        assert_eq!(graph.node(inner).callers()[&outer], expected);
    }

    #[test]
    fn test_negative_weight_rejected_without_mutation() {
        let mut graph = CallGraph::new();
        let result = graph.ingest(-1, &trace(&["0x1"]));
        assert_eq!(result, Err(GraphError::InvalidWeight(-1)));
        assert!(graph.is_empty());
        assert_eq!(graph.trace_count(), 0);
    }

    #[test]
    fn test_empty_trace_is_noop() {
        let mut graph = CallGraph::new();
        graph.ingest(10, &[]).unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.roots().count(), 0);
        assert_eq!(graph.leaves().count(), 0);
    }

    #[test]
    fn test_recursive_frame_is_neither_root_nor_leaf() {
        let mut graph = CallGraph::new();
        graph.ingest(3, &trace(&["0x1", "0x1"])).unwrap();

        let x = id(&graph, "0x1");
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.node(x).callees()[&x], Link { total: 3, count: 1 });
        assert_eq!(graph.roots().count(), 0);
        assert_eq!(graph.leaves().count(), 0);
    }

    #[test]
    fn test_node_average_rounds() {
        let mut graph = CallGraph::new();
        graph.ingest(10, &trace(&["0x1"])).unwrap();
        graph.ingest(5, &trace(&["0x1"])).unwrap();
        assert_eq!(graph.find(&Frame::new("0x1")).unwrap().average(), 8);
    }

    #[test]
    fn test_huge_weights_saturate() {
        let mut graph = CallGraph::new();
        for _ in 0..3 {
            graph.ingest(i64::MAX, &trace(&["0x1", "0x2"])).unwrap();
        }

        let x = id(&graph, "0x1");
        assert_eq!(graph.node(x).total(), u64::MAX);
        assert_eq!(graph.node(x).count(), 3);
        assert_eq!(graph.tail().callers()[&x].total, u64::MAX);
        assert_eq!(graph.node(x).average(), u64::MAX / 3);
    }
}
