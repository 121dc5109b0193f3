//! Build collapsed stack format from stall traces.
//!
//! Collapsed stacks are the input format for flamegraph generation.
//! Format: "outer;middle;inner weight"
//!
//! Example: "0x4010;0x4020;0x4030 120"
//! This means: 0x4010 called 0x4020 which called 0x4030, which stalled for 120 ms in total.

use crate::parser::Frame;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single collapsed stack entry
///
/// **Public** - used by flamegraph generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollapsedStack {
    /// Stack trace as semicolon-separated string, outermost first
    pub stack: String,

    /// Weight (summed stall duration of this stack)
    pub weight: u64,
}

impl CollapsedStack {
    pub fn new(stack: String, weight: u64) -> Self {
        Self { stack, weight }
    }

    /// Line in the folded format consumed by flamegraph tools
    pub fn to_line(&self) -> String {
        format!("{} {}", self.stack, self.weight)
    }
}

/// Accumulates traces into unique collapsed stacks
#[derive(Debug, Default)]
pub struct StackBuilder {
    stacks: HashMap<String, u64>,
}

impl StackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one trace (frames innermost first)
    pub fn add(&mut self, weight: u64, frames: &[Frame]) {
        if frames.is_empty() {
            return;
        }
        let stack = frames
            .iter()
            .rev()
            .map(|frame| frame.to_string())
            .collect::<Vec<_>>()
            .join(";");
        let total = self.stacks.entry(stack).or_insert(0);
        *total = total.saturating_add(weight);
    }

    /// Collapsed stacks sorted by weight (descending), then by stack text
    pub fn finish(self) -> Vec<CollapsedStack> {
        let mut stacks: Vec<CollapsedStack> = self
            .stacks
            .into_iter()
            .map(|(stack, weight)| CollapsedStack::new(stack, weight))
            .collect();

        stacks.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.stack.cmp(&b.stack)));
        debug!("Built {} unique collapsed stacks", stacks.len());

        stacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapsed_stack_to_line() {
        let stack = CollapsedStack::new("0x1;0x2;0x3".to_string(), 1000);
        assert_eq!(stack.to_line(), "0x1;0x2;0x3 1000");
    }

    #[test]
    fn test_builder_merges_and_orders_outermost_first() {
        let mut builder = StackBuilder::new();
        let frames = vec![Frame::new("0xa"), Frame::new("0xb")];
        builder.add(10, &frames);
        builder.add(15, &frames);
        builder.add(40, &[Frame::in_module("/lib/x.so", "0x10")]);

        let stacks = builder.finish();
        assert_eq!(stacks.len(), 2);
        assert_eq!(stacks[0], CollapsedStack::new("/lib/x.so+0x10".to_string(), 40));
        assert_eq!(stacks[1], CollapsedStack::new("0xb;0xa".to_string(), 25));
    }
}
