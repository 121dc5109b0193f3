//! Stall Analyser CLI
//!
//! Reads reactor stall reports from a log file (or stdin) and prints the
//! call graph of the stalling code paths.

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use std::path::PathBuf;

use stall_analyser::commands::{execute_analyze, parse_threshold, validate_args, AnalyzeArgs};
use stall_analyser::flamegraph::FlamegraphConfig;
use stall_analyser::render::Direction;
use stall_analyser::resolver::ResolverConfig;
use stall_analyser::utils::config::DEFAULT_ADDRESS_THRESHOLD;

/// Reactor stall backtrace graph analyser
///
/// Every printed node is prefixed with [level#index/siblings pct%]: its
/// depth in the graph, its rank among its siblings by total stall time,
/// and the share of the link leading to it among those siblings.
#[derive(Parser, Debug)]
#[command(name = "stall-analyser")]
#[command(version, about, long_about = None)]
struct Cli {
    /// File containing reactor stall backtraces (stdin when omitted)
    file: Option<PathBuf>,

    /// Skip the common backtrace prefix ending in addresses at or above this value (0 disables)
    #[arg(long, value_parser = parse_threshold, default_value_t = DEFAULT_ADDRESS_THRESHOLD)]
    address_threshold: u64,

    /// Ignore stalls shorter than this many milliseconds
    #[arg(long, default_value = "0")]
    minimum: i64,

    /// Decode addresses to source lines using this executable
    #[arg(short, long)]
    executable: Option<PathBuf>,

    /// Smart-trim long lines to this many characters (0 disables)
    #[arg(short, long, default_value = "0")]
    width: usize,

    /// Print from the stall sites up to their callers, or from the roots down
    #[arg(short, long, default_value = "bottom-up")]
    direction: Direction,

    /// Demangle with c++filt instead of addr2line
    #[arg(long)]
    concise: bool,

    /// Prefix each resolved location with its module and address
    #[arg(long)]
    show_addresses: bool,

    /// Print stall duration statistics before the graph
    #[arg(long)]
    summary: bool,

    /// Output path for a JSON report of the graph
    #[arg(long)]
    json: Option<PathBuf>,

    /// Output path for an SVG flamegraph of the stalls
    #[arg(long)]
    flamegraph: Option<PathBuf>,

    /// Flamegraph title
    #[arg(long)]
    title: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let args = analyze_args(cli);

    // Validate args first
    validate_args(&args)?;

    execute_analyze(&args)?;

    Ok(())
}

/// Map parsed flags onto the analyze command arguments
fn analyze_args(cli: Cli) -> AnalyzeArgs {
    let flamegraph_config = cli.flamegraph.as_ref().map(|_| {
        let config = FlamegraphConfig::new();
        match cli.title.clone() {
            Some(title) => config.with_title(title),
            None => config,
        }
    });

    AnalyzeArgs {
        input: cli.file,
        address_threshold: cli.address_threshold,
        minimum_duration: cli.minimum,
        executable: cli.executable,
        resolver_config: ResolverConfig {
            concise: cli.concise,
            verbose: cli.show_addresses,
            ..Default::default()
        },
        width: cli.width,
        direction: cli.direction,
        print_summary: cli.summary,
        output_json: cli.json,
        output_svg: cli.flamegraph,
        flamegraph_config,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> AnalyzeArgs {
        let argv = std::iter::once("stall-analyser").chain(argv.iter().copied());
        let cli = Cli::try_parse_from(argv).unwrap();
        analyze_args(cli)
    }

    #[test]
    fn test_verbose_logging_keeps_report_unchanged() {
        let args = parse(&["-v", "stalls.log"]);
        assert!(!args.resolver_config.verbose);
    }

    #[test]
    fn test_show_addresses_sets_resolver_prefix() {
        let args = parse(&["--show-addresses", "stalls.log"]);
        assert!(args.resolver_config.verbose);
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--address-threshold", "0x1000", "--flamegraph", "out.svg"]);
        assert_eq!(args.address_threshold, 0x1000);
        assert_eq!(args.direction, Direction::BottomUp);
        assert!(args.input.is_none());
        assert_eq!(
            args.flamegraph_config.map(|c| c.title),
            Some("Reactor Stalls".to_string())
        );
    }
}
