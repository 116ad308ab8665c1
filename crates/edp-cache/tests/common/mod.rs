//! Shared test helpers: stub conversion executables
//!
//! The pipeline only cares that the configured executable writes NDJSON to
//! stdout, so tests substitute a small shell script for the real converter.
//! Each invocation appends one line to an invocation log, which lets tests
//! assert how many times the process was actually spawned.
#![allow(dead_code)]

use edp_cache::CacheConfig;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

pub struct StubConverter {
    // Keeps the scripts alive for the duration of the test.
    pub dir: TempDir,
    pub invocations: PathBuf,
    pub config: CacheConfig,
}

/// Build a stub converter whose body is the given shell fragment.
pub fn stub_converter(body: &str) -> StubConverter {
    let dir = tempfile::tempdir().unwrap();

    // The pipeline only checks that the source exists and is readable.
    let source = dir.path().join("dataset.parquet");
    fs::write(&source, b"stub parquet bytes").unwrap();

    let invocations = dir.path().join("invocations.log");
    let script = dir.path().join("converter.sh");
    let contents = format!(
        "#!/bin/sh\necho run >> \"{}\"\n{}\n",
        invocations.display(),
        body
    );
    fs::write(&script, contents).unwrap();
    let mut perms = fs::metadata(&script).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&script, perms).unwrap();

    let config = CacheConfig {
        source_path: source,
        python_bin: script.display().to_string(),
        max_bytes: 1024 * 1024,
        row_limit: None,
        select_columns: false,
        timeout: Duration::from_secs(10),
    };

    StubConverter {
        dir,
        invocations,
        config,
    }
}

/// How many times the stub converter has been spawned so far.
pub fn invocation_count(stub: &StubConverter) -> usize {
    fs::read_to_string(&stub.invocations)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

/// Stub body emitting the two-record happy-path stream.
pub const TWO_RECORD_BODY: &str = r#"printf '{"exporter":"Acme","boxes":"10","net_weight_kg":5.5}\n'
printf '{"exporter":"Acme","boxes":20,"net_weight_kg":11}\n'
printf '__END__\n'"#;
