use pretty_assertions::assert_eq;
use stall_analyser::aggregator::{calculate_stall_distribution, CallGraph};
use stall_analyser::output::{build_report, read_report, validate_path, write_report, write_svg, EdgeReport};
use stall_analyser::parser::Frame;
use stall_analyser::utils::config::SCHEMA_VERSION;
use tempfile::tempdir;

fn sample_graph() -> CallGraph {
    let mut graph = CallGraph::new();
    graph
        .ingest(100, &[Frame::new("0xa"), Frame::new("0xb"), Frame::new("0xc")])
        .unwrap();
    graph
        .ingest(50, &[Frame::new("0xa"), Frame::new("0xd"), Frame::new("0xc")])
        .unwrap();
    graph
}

#[test]
fn test_report_describes_graph() {
    let graph = sample_graph();
    let report = build_report(&graph, calculate_stall_distribution(&[100, 50]));

    assert_eq!(report.version, SCHEMA_VERSION);
    assert_eq!(report.stall_count, 2);
    assert_eq!(report.roots, vec![Frame::new("0xc")]);
    assert_eq!(report.leaves, vec![Frame::new("0xa")]);
    assert_eq!(report.nodes.len(), 4);

    let c = report.nodes.iter().find(|n| n.frame == Frame::new("0xc")).unwrap();
    assert_eq!(c.total, 150);
    assert!(c.callers.is_empty());
    assert_eq!(
        c.callees,
        vec![
            EdgeReport {
                frame: Frame::new("0xb"),
                total: 100,
                count: 1,
            },
            EdgeReport {
                frame: Frame::new("0xd"),
                total: 50,
                count: 1,
            },
        ]
    );
}

#[test]
fn test_report_round_trip_through_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reports").join("stalls.json");

    let graph = sample_graph();
    let report = build_report(&graph, calculate_stall_distribution(&[100, 50]));
    write_report(&report, &path).unwrap();

    assert!(path.exists());
    let loaded = read_report(&path).unwrap();
    assert_eq!(loaded.stall_count, report.stall_count);
    assert_eq!(loaded.distribution, report.distribution);
    assert_eq!(loaded.roots, report.roots);
    assert_eq!(loaded.nodes.len(), report.nodes.len());
}

#[test]
fn test_module_frames_serialize_with_module() {
    let mut graph = CallGraph::new();
    graph
        .ingest(5, &[Frame::in_module("/lib64/libc.so.6", "0x3e9ff")])
        .unwrap();
    let report = build_report(&graph, calculate_stall_distribution(&[5]));

    let json = serde_json::to_string(&report.leaves).unwrap();
    assert_eq!(json, r#"[{"module":"/lib64/libc.so.6","address":"0x3e9ff"}]"#);
}

#[test]
fn test_write_svg_creates_parent_dirs() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("stalls.svg");

    write_svg("<svg></svg>", &path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "<svg></svg>");
}

#[test]
fn test_validate_path() {
    let dir = tempdir().unwrap();
    assert!(validate_path(&dir.path().join("out.json")).is_ok());
    assert!(validate_path(dir.path()).is_err());
    assert!(validate_path(std::path::Path::new("")).is_err());
}

#[test]
fn test_read_report_rejects_garbage() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(read_report(&path).is_err());
}
