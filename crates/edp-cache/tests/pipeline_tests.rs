//! End-to-end pipeline tests against stub conversion processes
#![cfg(unix)]

mod common;

use common::{stub_converter, TWO_RECORD_BODY};
use edp_cache::pipeline::IngestPipeline;
use edp_cache::status::StatusCell;
use edp_cache::CacheError;
use std::time::Duration;

#[tokio::test]
async fn test_happy_path_coerces_and_counts() {
    let stub = stub_converter(TWO_RECORD_BODY);
    let status = StatusCell::new();
    let pipeline = IngestPipeline::new(stub.config.clone(), status.clone());

    let outcome = pipeline.run().await.unwrap();

    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.malformed_lines, 0);
    assert!(outcome.total_bytes > 0);

    // string "10" and number 20 both coerce to numbers
    assert_eq!(outcome.records[0].boxes, 10.0);
    assert_eq!(outcome.records[0].net_weight_kg, 5.5);
    assert_eq!(outcome.records[1].boxes, 20.0);
    assert_eq!(outcome.records[1].net_weight_kg, 11.0);

    // final telemetry: not loading, full count, exactly 100 percent
    let snapshot = status.snapshot();
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.loaded, 2);
    assert_eq!(snapshot.percentage, Some(100.0));
    assert!(snapshot.rate >= 0.0);
}

#[tokio::test]
async fn test_malformed_line_is_counted_not_fatal() {
    let stub = stub_converter(
        r#"printf 'this is not json\n'
printf '{"exporter":"Acme","boxes":1,"net_weight_kg":2}\n'
printf '__END__\n'"#,
    );
    let pipeline = IngestPipeline::new(stub.config.clone(), StatusCell::new());

    let outcome = pipeline.run().await.unwrap();
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.malformed_lines, 1);
    assert_eq!(outcome.records[0].exporter, "Acme");
}

#[tokio::test]
async fn test_nonzero_exit_surfaces_stderr() {
    let stub = stub_converter(
        r#"echo "disk error" >&2
exit 1"#,
    );
    let pipeline = IngestPipeline::new(stub.config.clone(), StatusCell::new());

    let err = pipeline.run().await.unwrap_err();
    match err {
        CacheError::ConversionFailed { code, stderr } => {
            assert_eq!(code, 1);
            assert!(stderr.contains("disk error"));
        },
        other => panic!("expected ConversionFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_zero_records_is_a_failure() {
    let stub = stub_converter(r#"printf '__END__\n'"#);
    let status = StatusCell::new();
    let pipeline = IngestPipeline::new(stub.config.clone(), status.clone());

    let err = pipeline.run().await.unwrap_err();
    assert_eq!(err, CacheError::EmptyResult);

    let snapshot = status.snapshot();
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.loaded, 0);
    assert_eq!(snapshot.percentage, None);
}

/// Whether the PID refers to a live, non-zombie process.
fn process_is_live(pid: u32) -> bool {
    let stat = match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat,
        Err(_) => return false,
    };
    // the state field follows the parenthesized command name
    let state = stat
        .rsplit(')')
        .next()
        .and_then(|rest| rest.split_whitespace().next());
    state != Some("Z")
}

#[tokio::test]
async fn test_byte_ceiling_terminates_the_run() {
    let pid_dir = tempfile::tempdir().unwrap();
    let pid_file = pid_dir.path().join("converter.pid");
    let mut stub = stub_converter(&format!(
        r#"echo $$ > "{}"
while :; do printf '{{"season":"2024","boxes":1,"net_weight_kg":1}}\n'; done"#,
        pid_file.display()
    ));
    stub.config.max_bytes = 2048;
    let status = StatusCell::new();
    let pipeline = IngestPipeline::new(stub.config.clone(), status.clone());

    let err = pipeline.run().await.unwrap_err();
    match err {
        CacheError::PayloadTooLarge {
            observed_bytes,
            ceiling_bytes,
        } => {
            assert!(observed_bytes > ceiling_bytes);
            assert_eq!(ceiling_bytes, 2048);
        },
        other => panic!("expected PayloadTooLarge, got {other:?}"),
    }

    // the process was killed and reaped, not merely left unread
    let pid: u32 = std::fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert!(!process_is_live(pid));

    // no partial collection is reported as a success
    assert!(!status.snapshot().is_loading);
}

#[tokio::test]
async fn test_timeout_terminates_the_run() {
    let mut stub = stub_converter("sleep 5");
    stub.config.timeout = Duration::from_millis(200);
    let pipeline = IngestPipeline::new(stub.config.clone(), StatusCell::new());

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, CacheError::Timeout { .. }));
}

#[tokio::test]
async fn test_missing_source_spawns_nothing() {
    let mut stub = stub_converter(TWO_RECORD_BODY);
    stub.config.source_path = stub.dir.path().join("nope.parquet");
    let pipeline = IngestPipeline::new(stub.config.clone(), StatusCell::new());

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, CacheError::SourceUnavailable { .. }));
    assert_eq!(common::invocation_count(&stub), 0);
}

#[tokio::test]
async fn test_residual_line_without_newline_still_counts() {
    // no trailing newline after the last record, and no sentinel
    let stub = stub_converter(r#"printf '{"exporter":"Tail","boxes":3,"net_weight_kg":4}'"#);
    let pipeline = IngestPipeline::new(stub.config.clone(), StatusCell::new());

    let outcome = pipeline.run().await.unwrap();
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].exporter, "Tail");
}
