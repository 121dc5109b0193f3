//! Symbol resolution through external `addr2line` processes.
//!
//! This module handles:
//! - One stateful resolver conversation per binary module
//! - Degrading to `"<module> <address>"` when a module cannot be resolved
//! - Caching sessions for the lifetime of the run

pub mod cache;
pub mod session;

use crate::parser::Frame;

// Re-export main types
pub use cache::BacktraceResolver;
pub use session::{fallback, ResolverConfig, Session, SessionState};

/// Turns a frame into human-readable source location lines.
///
/// Implementations never fail; they return fallback text instead.
pub trait Symbolizer {
    /// Lines for `frame`, innermost inlined function first
    fn resolve(&mut self, frame: &Frame) -> Vec<String>;
}
