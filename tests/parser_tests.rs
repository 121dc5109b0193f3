use pretty_assertions::assert_eq;
use stall_analyser::parser::{parse_stall_line, Frame, LineStats, StallLog, TraceFilter};
use stall_analyser::utils::error::ParseError;
use std::io::Cursor;

const STALL: &str = "WARN  2024-03-01 10:00:00,000 [shard 0] seastar - Reactor stalled for 33 ms on shard 0. Backtrace: 0x3a7c4e5 0x3a7b8e0 /lib64/libc.so.6+0x3e9ff 0x3a4c1a5";

fn frames(tokens: &[&str]) -> Vec<Frame> {
    tokens.iter().map(|t| t.parse().unwrap()).collect()
}

#[test]
fn test_parse_stall_line() {
    let trace = parse_stall_line(STALL).unwrap();
    assert_eq!(trace.duration, 33);
    assert_eq!(
        trace.frames,
        frames(&["0x3a7c4e5", "0x3a7b8e0", "/lib64/libc.so.6+0x3e9ff", "0x3a4c1a5"])
    );
}

#[test]
fn test_parse_line_with_scheduling_group() {
    let line = "Reactor stalled for 260 ms on shard 3, in scheduling group main. Backtrace: 0x10 0x20";
    let trace = parse_stall_line(line).unwrap();
    assert_eq!(trace.duration, 260);
    assert_eq!(trace.frames, frames(&["0x10", "0x20"]));
}

#[test]
fn test_parse_skips_unparseable_tokens() {
    let line = "Reactor stalled for 5 ms on shard 0. Backtrace: 0x10 kernel callstack: 0x20";
    let trace = parse_stall_line(line).unwrap();
    assert_eq!(trace.frames, frames(&["0x10", "0x20"]));
}

#[test]
fn test_parse_rejects_other_lines() {
    assert!(matches!(
        parse_stall_line("INFO  starting shard 0"),
        Err(ParseError::NotAStall)
    ));
    assert!(matches!(
        parse_stall_line("Reactor stalled for many ms on shard 0. Backtrace: 0x1"),
        Err(ParseError::InvalidDuration(_))
    ));
    assert!(matches!(
        parse_stall_line("Reactor stalled for 7 ms on shard 0. Backtrace:"),
        Err(ParseError::EmptyBacktrace)
    ));
}

#[test]
fn test_stall_log_filters_and_counts() {
    let log = [
        "INFO  starting",
        "Reactor stalled for 30 ms on shard 0. Backtrace: 0x100000010 0x100000020 0x1 0x2",
        "Reactor stalled for 2 ms on shard 0. Backtrace: 0x1 0x2",
        "Reactor stalled for x ms on shard 0. Backtrace: 0x1",
        "Reactor stalled for 40 ms on shard 0. Backtrace: 0x100000010",
        "Reactor stalled for 12 ms on shard 1. Backtrace: 0x3",
    ]
    .join("\n");

    let filter = TraceFilter {
        minimum_duration: 10,
        ..Default::default()
    };
    let mut reader = StallLog::new(Cursor::new(log), filter);
    let traces: Vec<_> = reader.by_ref().map(Result::unwrap).collect();

    assert_eq!(traces.len(), 2);
    assert_eq!(traces[0].duration, 30);
    assert_eq!(traces[0].frames, frames(&["0x1", "0x2"]));
    assert_eq!(traces[1].frames, frames(&["0x3"]));

    assert_eq!(
        reader.stats(),
        &LineStats {
            lines: 6,
            stalls: 5,
            malformed: 1,
            below_minimum: 1,
            empty_after_trim: 1,
        }
    );
}

#[test]
fn test_stall_log_without_trimming() {
    let log = "Reactor stalled for 30 ms on shard 0. Backtrace: 0x100000010 0x1\n";
    let filter = TraceFilter {
        address_threshold: 0,
        minimum_duration: 0,
    };
    let traces: Vec<_> = StallLog::new(Cursor::new(log), filter)
        .map(Result::unwrap)
        .collect();

    assert_eq!(traces[0].frames, frames(&["0x100000010", "0x1"]));
}
