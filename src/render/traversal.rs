//! Depth-first walk of the call graph from one of its sentinels.
//!
//! Siblings are visited by descending `(total, count)`, so the heaviest
//! and most frequent paths come first. Each node is expanded only on its
//! first visit; later visits are reported as revisits and not expanded,
//! which keeps recursive call relationships from producing unbounded output.

use crate::aggregator::{CallGraph, Link, NodeId, HEAD, TAIL};
use std::fmt;
use std::str::FromStr;

/// Which way to walk the graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    /// From the roots, following callees: outer frames before the frames they call
    TopDown,
    /// From the stall sites, following callers
    #[default]
    BottomUp,
}

impl Direction {
    fn start(self) -> NodeId {
        match self {
            Direction::TopDown => HEAD,
            Direction::BottomUp => TAIL,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::TopDown => f.write_str("top-down"),
            Direction::BottomUp => f.write_str("bottom-up"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top-down" => Ok(Direction::TopDown),
            "bottom-up" => Ok(Direction::BottomUp),
            other => Err(format!(
                "unknown direction '{}' (expected top-down or bottom-up)",
                other
            )),
        }
    }
}

/// Display position of a visited node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coordinate {
    /// Depth below the starting sentinel (0 = root or stall site)
    pub level: usize,
    /// Position among its siblings, heaviest first
    pub index: usize,
    /// Number of siblings, itself included
    pub siblings: usize,
}

/// One step of the walk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visit {
    pub node: NodeId,
    pub coordinate: Coordinate,
    /// The edge the walk arrived through
    pub link: Link,
    /// `link.total` as a fraction of the sum over all siblings (1.0 when that sum is 0)
    pub share: f64,
    /// The node was already expanded earlier in the walk
    pub revisit: bool,
}

impl Visit {
    /// Share as a rounded percentage
    pub fn percent(&self) -> u64 {
        (self.share * 100.0).round() as u64
    }
}

/// Neighbours of `id` in walk order, sentinels excluded
pub fn sorted_links(graph: &CallGraph, id: NodeId, direction: Direction) -> Vec<(NodeId, Link)> {
    let node = graph.node(id);
    let links = match direction {
        Direction::TopDown => node.callees(),
        Direction::BottomUp => node.callers(),
    };

    let mut sorted: Vec<(NodeId, Link)> = links
        .iter()
        .filter(|(neighbor, _)| !graph.is_sentinel(**neighbor))
        .map(|(neighbor, link)| (*neighbor, *link))
        .collect();

    // Stable: equal weights keep first-seen order
    sorted.sort_by(|(_, a), (_, b)| b.total.cmp(&a.total).then(b.count.cmp(&a.count)));
    sorted
}

/// Children of `id` as pending visits at `level`
fn children(graph: &CallGraph, id: NodeId, direction: Direction, level: usize) -> Vec<Visit> {
    let links = sorted_links(graph, id, direction);
    let siblings = links.len();
    let sum = links
        .iter()
        .fold(0u64, |acc, (_, link)| acc.saturating_add(link.total));

    links
        .into_iter()
        .enumerate()
        .map(|(index, (node, link))| Visit {
            node,
            coordinate: Coordinate {
                level,
                index,
                siblings,
            },
            link,
            share: if sum == 0 {
                1.0
            } else {
                link.total as f64 / sum as f64
            },
            revisit: false,
        })
        .collect()
}

/// Walk the graph in depth-first pre-order, calling `visit` at each step.
///
/// Stops at the first error returned by `visit`.
pub fn walk<E>(
    graph: &CallGraph,
    direction: Direction,
    mut visit: impl FnMut(&Visit) -> Result<(), E>,
) -> Result<(), E> {
    let mut expanded = vec![false; graph.arena_len()];

    let mut pending = children(graph, direction.start(), direction, 0);
    pending.reverse();

    while let Some(mut step) = pending.pop() {
        let seen = &mut expanded[step.node.index()];
        step.revisit = *seen;
        *seen = true;

        visit(&step)?;

        if !step.revisit {
            let mut next = children(graph, step.node, direction, step.coordinate.level + 1);
            next.reverse();
            pending.extend(next);
        }
    }

    Ok(())
}

/// Collect the whole walk
pub fn traverse(graph: &CallGraph, direction: Direction) -> Vec<Visit> {
    let mut visits = Vec::new();
    let _ = walk::<()>(graph, direction, |step| {
        visits.push(*step);
        Ok(())
    });
    visits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Frame;

    #[test]
    fn test_direction_round_trip_names() {
        assert_eq!("top-down".parse::<Direction>(), Ok(Direction::TopDown));
        assert_eq!(Direction::BottomUp.to_string(), "bottom-up");
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_zero_weight_siblings_share_everything() {
        let mut graph = CallGraph::new();
        graph.ingest(0, &[Frame::new("0x1")]).unwrap();
        let visits = traverse(&graph, Direction::BottomUp);
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].percent(), 100);
    }

    #[test]
    fn test_empty_graph_has_no_visits() {
        assert!(traverse(&CallGraph::new(), Direction::TopDown).is_empty());
    }
}
