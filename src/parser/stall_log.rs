//! Lexical extraction of stall traces from reactor log lines.
//!
//! A stall report looks like:
//!
//! ```text
//! WARN  2024-03-01 10:00:00,000 [shard 0] seastar - Reactor stalled for 33 ms on shard 0. Backtrace: 0x3a7c4e5 0x3a7b8e0 /lib64/libc.so.6+0x3e9ff 0x3a4c1a5
//! ```
//!
//! Everything that is not a stall report is skipped. Malformed stall
//! reports are counted and dropped here, so the aggregator only ever
//! sees well-formed traces.

use super::schema::{Frame, StallTrace};
use crate::utils::config::{BACKTRACE_MARKER, DEFAULT_ADDRESS_THRESHOLD, STALL_MARKER};
use crate::utils::error::ParseError;
use log::debug;
use std::io::{self, BufRead};

/// Tokens between `Reactor` and the duration: `Reactor stalled for <N>`
const DURATION_OFFSET: usize = 3;

/// Tokens between the duration and the first address when the
/// `Backtrace:` marker cannot be found: `<N> ms on shard <S>. Backtrace: <addr>`
const LEGACY_BACKTRACE_OFFSET: usize = 6;

/// Parse a single log line into a stall trace
///
/// **Public** - the unit of trace ingestion
///
/// # Errors
/// * `ParseError::NotAStall` - the line is not a stall report
/// * `ParseError::InvalidDuration` - the duration token is not an integer
/// * `ParseError::EmptyBacktrace` - no frame token could be parsed
pub fn parse_stall_line(line: &str) -> Result<StallTrace, ParseError> {
    if !line.contains(STALL_MARKER) {
        return Err(ParseError::NotAStall);
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    let reactor = tokens
        .iter()
        .position(|t| *t == "Reactor")
        .ok_or(ParseError::NotAStall)?;

    let duration_index = reactor + DURATION_OFFSET;
    let duration_token = tokens
        .get(duration_index)
        .ok_or_else(|| ParseError::InvalidDuration(String::new()))?;
    let duration = duration_token
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidDuration(duration_token.to_string()))?;

    let backtrace_start = tokens[duration_index..]
        .iter()
        .position(|t| *t == BACKTRACE_MARKER)
        .map(|offset| duration_index + offset + 1)
        .unwrap_or(duration_index + LEGACY_BACKTRACE_OFFSET);

    let frames: Vec<Frame> = tokens
        .get(backtrace_start..)
        .unwrap_or_default()
        .iter()
        .filter_map(|token| token.parse::<Frame>().ok())
        .collect();

    if frames.is_empty() {
        return Err(ParseError::EmptyBacktrace);
    }

    Ok(StallTrace::new(duration, frames))
}

/// Drop the instrumentation prefix of a backtrace.
///
/// The innermost frames of every stall report belong to the stall
/// detector itself (signal handler, backtrace collection). They end with
/// one or more addresses at or above `threshold`. Everything up to and
/// including that run is removed. A threshold of zero disables trimming,
/// and a backtrace that never reaches the threshold is kept whole.
pub fn trim_instrumentation(frames: &[Frame], threshold: u64) -> &[Frame] {
    if threshold == 0 {
        return frames;
    }

    let above = |frame: &Frame| frame.absolute_address().is_some_and(|a| a >= threshold);

    let Some(first) = frames.iter().position(|f| above(f)) else {
        return frames;
    };
    let run = frames[first..].iter().take_while(|f| above(*f)).count();

    &frames[first + run..]
}

/// Filters applied to each parsed trace before it reaches the aggregator
#[derive(Debug, Clone, Copy)]
pub struct TraceFilter {
    /// See [`trim_instrumentation`]
    pub address_threshold: u64,

    /// Stalls shorter than this (in ms) are ignored
    pub minimum_duration: i64,
}

impl Default for TraceFilter {
    fn default() -> Self {
        Self {
            address_threshold: DEFAULT_ADDRESS_THRESHOLD,
            minimum_duration: 0,
        }
    }
}

/// Counters describing how the input lines were consumed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineStats {
    pub lines: u64,
    pub stalls: u64,
    pub malformed: u64,
    pub below_minimum: u64,
    pub empty_after_trim: u64,
}

/// Streaming reader yielding one accepted trace at a time
pub struct StallLog<R> {
    lines: io::Lines<R>,
    filter: TraceFilter,
    stats: LineStats,
}

impl<R: BufRead> StallLog<R> {
    pub fn new(reader: R, filter: TraceFilter) -> Self {
        Self {
            lines: reader.lines(),
            filter,
            stats: LineStats::default(),
        }
    }

    pub fn stats(&self) -> &LineStats {
        &self.stats
    }

    fn accept(&mut self, line: &str) -> Option<StallTrace> {
        let trace = match parse_stall_line(line) {
            Ok(trace) => trace,
            Err(ParseError::NotAStall) => return None,
            Err(e) => {
                self.stats.stalls += 1;
                self.stats.malformed += 1;
                debug!("Skipping line {}: {}", self.stats.lines, e);
                return None;
            }
        };
        self.stats.stalls += 1;

        if trace.duration < self.filter.minimum_duration {
            self.stats.below_minimum += 1;
            return None;
        }

        let frames = trim_instrumentation(&trace.frames, self.filter.address_threshold);
        if frames.is_empty() {
            self.stats.empty_after_trim += 1;
            debug!("Line {} has only instrumentation frames", self.stats.lines);
            return None;
        }

        Some(StallTrace::new(trace.duration, frames.to_vec()))
    }
}

impl<R: BufRead> Iterator for StallLog<R> {
    type Item = io::Result<StallTrace>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };
            self.stats.lines += 1;

            if let Some(trace) = self.accept(&line) {
                return Some(Ok(trace));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(tokens: &[&str]) -> Vec<Frame> {
        tokens.iter().map(|t| t.parse().unwrap()).collect()
    }

    #[test]
    fn test_trim_skips_instrumentation_run() {
        let trace = frames(&["0x1", "0x100000010", "0x100000020", "0x2", "0x3"]);
        let trimmed = trim_instrumentation(&trace, 0x100000000);
        assert_eq!(trimmed, &frames(&["0x2", "0x3"])[..]);
    }

    #[test]
    fn test_trim_keeps_trace_below_threshold() {
        let trace = frames(&["0x1", "0x2"]);
        assert_eq!(trim_instrumentation(&trace, 0x100000000).len(), 2);
    }

    #[test]
    fn test_trim_disabled_with_zero() {
        let trace = frames(&["0x100000010", "0x2"]);
        assert_eq!(trim_instrumentation(&trace, 0).len(), 2);
    }

    #[test]
    fn test_trim_ignores_module_offsets() {
        let trace = frames(&["/lib/libc.so+0x100000010", "0x2"]);
        assert_eq!(trim_instrumentation(&trace, 0x100000000).len(), 2);
    }
}
