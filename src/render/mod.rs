//! Text rendering of the stall call graph.
//!
//! Each visited node is printed as
//!
//! ```text
//! ||[2#0/3 67%] addr=0x4a3b2c total=120 count=4 avg=30: fn() at file.cc:12
//! ```
//!
//! where the bars and the first number give the depth, `#0/3` is the
//! node's position among its 3 siblings (heaviest first), and the
//! percentage is the share of the edge leading to it among those siblings.
//! Node totals and counts are over every trace mentioning the frame.

pub mod printer;
pub mod traversal;

pub use printer::{smart_trim, Printer};
pub use traversal::{sorted_links, traverse, walk, Coordinate, Direction, Visit};

use crate::aggregator::CallGraph;
use crate::resolver::Symbolizer;
use std::io::{self, Write};

/// Print the whole graph.
///
/// When a symbolizer is given, each first visit is followed by the
/// source location of the frame. Inlined frames are listed outer to inner
/// in top-down mode and inner to outer in bottom-up mode.
pub fn render_graph<W: Write>(
    graph: &CallGraph,
    direction: Direction,
    mut symbolizer: Option<&mut dyn Symbolizer>,
    printer: &mut Printer<W>,
) -> io::Result<()> {
    walk(graph, direction, |step| {
        if printer.is_closed() {
            return Ok(());
        }

        let node = graph.node(step.node);
        let level = step.coordinate.level;
        if level == 0 {
            printer.blank()?;
        }

        let bars = "|".repeat(level);
        let label = format!(
            "{}[{}#{}/{} {}%] ",
            bars,
            level,
            step.coordinate.index,
            step.coordinate.siblings,
            step.percent()
        );
        let mut text = format!(
            "{}addr={} total={} count={} avg={}",
            label,
            node.frame(),
            node.total(),
            node.count(),
            node.average()
        );

        if step.revisit {
            printer.line(&text)?;
            return printer.line(&format!("{}(see above)", bars));
        }

        let mut continuation = Vec::new();
        if let Some(symbolizer) = symbolizer.as_mut() {
            let mut lines = symbolizer.resolve(node.frame());
            if direction == Direction::TopDown {
                lines.reverse();
            }

            let mut lines = lines.into_iter();
            if let Some(first) = lines.next() {
                text.push_str(": ");
                text.push_str(&first);
            }

            let indent = format!("{}{}", "|".repeat(level + 1), " ".repeat(label.len() - level - 1));
            continuation.extend(lines.map(|line| format!("{}{}", indent, line)));
        }

        printer.line(&text)?;
        for line in &continuation {
            printer.line(line)?;
        }
        Ok(())
    })?;

    printer.flush()
}
