//! Configuration and constants for the CLI.

/// Current JSON report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Addresses at or above this value are treated as instrumentation frames
/// (the stall detector's own backtrace machinery) and trimmed.
pub const DEFAULT_ADDRESS_THRESHOLD: u64 = 0x1_0000_0000;

/// Marker identifying a stall report line in the log
pub const STALL_MARKER: &str = "Reactor stall";

/// Marker preceding the backtrace addresses on a stall line
pub const BACKTRACE_MARKER: &str = "Backtrace:";

// Resolver process defaults
pub const DEFAULT_ADDR2LINE: &str = "addr2line";
pub const DEFAULT_DEMANGLER: &[&str] = &["c++filt", "-p"];
pub const DEBUG_INFO_PROBE: &str = "file";

/// Line addr2line prints for the empty request we send after every address.
/// Seeing it means the (possibly multi-line) answer is complete.
pub const RESOLVER_TERMINATOR: &str = "0x0000000000000000: ?? ??:0";

/// Narrowest non-zero display width that still fits an ellipsis and a location
pub const MIN_DISPLAY_WIDTH: usize = 16;

/// Unit used for stall durations in summaries and flamegraphs
pub const DURATION_UNIT: &str = "ms";
