use crate::flamegraph::FlamegraphConfig;
use crate::render::Direction;
use crate::resolver::ResolverConfig;
use crate::utils::config::DEFAULT_ADDRESS_THRESHOLD;
use std::path::PathBuf;

/// Arguments for the analyze command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    /// Stall log to read (stdin when `None`)
    pub input: Option<PathBuf>,

    /// Instrumentation address threshold (0 disables trimming)
    pub address_threshold: u64,

    /// Ignore stalls shorter than this many milliseconds
    pub minimum_duration: i64,

    /// Executable used to resolve bare addresses (no resolution when `None`)
    pub executable: Option<PathBuf>,

    /// How resolver processes are started
    pub resolver_config: ResolverConfig,

    /// Display width for smart trimming (0 = unlimited)
    pub width: usize,

    /// Traversal direction of the printed graph
    pub direction: Direction,

    /// Print the stall statistics block before the graph
    pub print_summary: bool,

    /// Output path for the JSON report (optional)
    pub output_json: Option<PathBuf>,

    /// Output path for the SVG flamegraph (optional)
    pub output_svg: Option<PathBuf>,

    /// Flamegraph configuration
    pub flamegraph_config: Option<FlamegraphConfig>,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            input: None,
            address_threshold: DEFAULT_ADDRESS_THRESHOLD,
            minimum_duration: 0,
            executable: None,
            resolver_config: ResolverConfig::default(),
            width: 0,
            direction: Direction::default(),
            print_summary: false,
            output_json: None,
            output_svg: None,
            flamegraph_config: None,
        }
    }
}

/// What an analysis run consumed and produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisSummary {
    /// Input lines read
    pub lines: u64,

    /// Stall reports found, accepted or not
    pub stalls: u64,

    /// Traces folded into the graph
    pub aggregated: u64,

    /// Distinct frames in the graph
    pub nodes: usize,

    /// The reader of the rendered graph hung up early
    pub output_closed: bool,
}

/// Parse a threshold given in hex (`0x...`) or decimal
pub fn parse_threshold(value: &str) -> Result<u64, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid address threshold '{}': {}", value, e))
}
