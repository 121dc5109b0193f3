//! Analyze command implementation.
//!
//! The analyze command:
//! 1. Reads stall reports and folds them into the call graph
//! 2. Prints the statistics summary (if requested)
//! 3. Prints the call graph, resolving addresses when an executable is given
//! 4. Writes the JSON report and SVG flamegraph (if requested)

use super::models::{AnalysisSummary, AnalyzeArgs};
use crate::aggregator::{calculate_stall_distribution, CallGraph, StackBuilder, StallDistribution};
use crate::flamegraph::generate_flamegraph;
use crate::output::{build_report, write_report, write_svg};
use crate::parser::{LineStats, StallLog, TraceFilter};
use crate::render::{render_graph, Printer};
use crate::resolver::{BacktraceResolver, Symbolizer};
use crate::utils::config::MIN_DISPLAY_WIDTH;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::time::Instant;

/// Execute the analyze command on the configured input, printing to stdout
///
/// **Public** - main entry point called from main.rs
pub fn execute_analyze(args: &AnalyzeArgs) -> Result<AnalysisSummary> {
    let input: Box<dyn BufRead> = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open stall log {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => {
            info!("Reading stall reports from stdin");
            Box::new(io::stdin().lock())
        }
    };

    execute_analyze_with(args, input, io::stdout().lock())
}

/// Execute the analyze command over explicit input and output streams
///
/// **Public** - used by `execute_analyze` and by tests
///
/// # Errors
/// * Input read failures
/// * Output write failures other than a closed pipe
/// * Report or flamegraph file write failures
pub fn execute_analyze_with<R: BufRead, W: Write>(
    args: &AnalyzeArgs,
    input: R,
    output: W,
) -> Result<AnalysisSummary> {
    let start_time = Instant::now();

    info!("Step 1/4: Aggregating stall traces...");
    let filter = TraceFilter {
        address_threshold: args.address_threshold,
        minimum_duration: args.minimum_duration,
    };
    let mut log = StallLog::new(input, filter);
    let mut graph = CallGraph::new();
    let mut stacks = StackBuilder::new();
    let mut durations = Vec::new();

    for trace in log.by_ref() {
        let trace = trace.context("Failed to read stall log")?;
        if let Err(e) = graph.ingest(trace.duration, &trace.frames) {
            warn!("Skipping trace: {}", e);
            continue;
        }
        let weight = trace.duration.unsigned_abs();
        stacks.add(weight, &trace.frames);
        durations.push(weight);
    }

    let stats = log.stats().clone();
    debug!(
        "Read {} lines, {} stall reports, {} frames in graph",
        stats.lines,
        stats.stalls,
        graph.len()
    );

    let distribution = calculate_stall_distribution(&durations);
    info!("Stall distribution: {}", distribution.summary());

    let mut printer = Printer::new(output, args.width);
    if args.print_summary {
        print_summary(&mut printer, &stats, &distribution).context("Failed to print summary")?;
    }

    info!("Step 2/4: Rendering {} call graph...", args.direction);
    let mut resolver = args.executable.as_ref().map(|exe| {
        BacktraceResolver::new(exe.to_string_lossy(), args.resolver_config.clone())
    });
    let symbolizer = resolver.as_mut().map(|r| r as &mut dyn Symbolizer);
    render_graph(&graph, args.direction, symbolizer, &mut printer)
        .context("Failed to render call graph")?;

    if let Some(path) = &args.output_json {
        info!("Step 3/4: Writing JSON report...");
        let report = build_report(&graph, distribution.clone());
        write_report(&report, path).context("Failed to write JSON report")?;
        info!("✓ Report written to: {}", path.display());
    } else {
        info!("Step 3/4: Skipping JSON report (not requested)");
    }

    if let Some(path) = &args.output_svg {
        info!("Step 4/4: Generating flamegraph...");
        let stacks = stacks.finish();
        if stacks.is_empty() {
            warn!("No stalls to draw, flamegraph not written");
        } else {
            let svg = generate_flamegraph(&stacks, args.flamegraph_config.as_ref())
                .context("Failed to generate flamegraph")?;
            write_svg(&svg, path).context("Failed to write flamegraph SVG")?;
            info!("✓ Flamegraph written to: {}", path.display());
        }
    } else {
        info!("Step 4/4: Skipping flamegraph generation (not requested)");
    }

    let elapsed = start_time.elapsed();
    info!("Analysis completed in {:.2}s", elapsed.as_secs_f64());

    Ok(AnalysisSummary {
        lines: stats.lines,
        stalls: stats.stalls,
        aggregated: graph.trace_count(),
        nodes: graph.len(),
        output_closed: printer.is_closed(),
    })
}

/// Print the statistics block
///
/// **Private** - internal helper for execute_analyze_with
fn print_summary<W: Write>(
    printer: &mut Printer<W>,
    stats: &LineStats,
    distribution: &StallDistribution,
) -> io::Result<()> {
    printer.line(&format!(
        "Processed {} lines: {} stall reports ({} malformed, {} below minimum, {} instrumentation only)",
        stats.lines, stats.stalls, stats.malformed, stats.below_minimum, stats.empty_after_trim
    ))?;
    printer.line(&distribution.summary())
}

/// Validate analyze arguments
///
/// **Public** - can be called before execute_analyze for early validation
pub fn validate_args(args: &AnalyzeArgs) -> Result<()> {
    if let Some(input) = &args.input {
        if input.as_os_str().is_empty() {
            anyhow::bail!("Input path cannot be empty");
        }

        let outputs = [&args.output_json, &args.output_svg];
        if outputs.iter().any(|out| out.as_ref() == Some(input)) {
            anyhow::bail!("Output path would overwrite the input {}", input.display());
        }
    }

    if let Some(executable) = &args.executable {
        if !executable.exists() {
            anyhow::bail!("Executable not found: {}", executable.display());
        }
    }

    if args.width != 0 && args.width < MIN_DISPLAY_WIDTH {
        anyhow::bail!(
            "Width must be 0 (unlimited) or at least {} columns",
            MIN_DISPLAY_WIDTH
        );
    }

    if args.minimum_duration < 0 {
        anyhow::bail!("Minimum stall duration cannot be negative");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_args_default() {
        assert!(validate_args(&AnalyzeArgs::default()).is_ok());
    }

    #[test]
    fn test_validate_args_narrow_width() {
        let args = AnalyzeArgs {
            width: 8,
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_output_overwrites_input() {
        let args = AnalyzeArgs {
            input: Some(PathBuf::from("stalls.log")),
            output_json: Some(PathBuf::from("stalls.log")),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_missing_executable() {
        let args = AnalyzeArgs {
            executable: Some(PathBuf::from("/nonexistent/scylla")),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }
}
