//! Bounded ingestion pipeline
//!
//! One pipeline run owns the whole lifecycle of a dataset load: verify the
//! source, spawn the conversion process, frame and validate its NDJSON
//! output, enforce the byte ceiling and the run timeout, and publish live
//! telemetry. This module is the only place that spawns the process and the
//! only writer of [`LoadingStatus`] during a run.
//!
//! Per-row failures are counted and logged, never propagated; run-level
//! failures terminate the process and surface one [`CacheError`].

use crate::config::{CacheConfig, EXPORT_COLUMNS};
use crate::error::CacheError;
use crate::framing::{LineFramer, END_OF_STREAM_MARKER};
use crate::record::ExportRecord;
use crate::status::{LoadingStatus, StatusCell};
use serde_json::Value;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Log a progress line every this many records
const PROGRESS_LOG_INTERVAL: u64 = 50_000;

/// Log at most this many individual malformed lines per run
const MALFORMED_LOG_LIMIT: u64 = 5;

/// Horizon for the record-count projection: extrapolate the current rate
/// over this many seconds
const PROJECTION_HORIZON_SECS: f64 = 10.0;

/// Percentage cap while a run is still in flight
const LOADING_PERCENTAGE_CAP: f64 = 95.0;

const READ_BUF_SIZE: usize = 64 * 1024;
const BYTES_PER_MB: f64 = (1024 * 1024) as f64;

/// Result of one successful pipeline run
#[derive(Debug)]
pub struct IngestOutcome {
    pub records: Vec<ExportRecord>,
    /// Lines that failed JSON parsing or row validation and were skipped
    pub malformed_lines: u64,
    /// Cumulative bytes received from the conversion process
    pub total_bytes: u64,
}

/// Streaming loader for one dataset ingestion run
pub struct IngestPipeline {
    config: CacheConfig,
    status: StatusCell,
}

impl IngestPipeline {
    pub fn new(config: CacheConfig, status: StatusCell) -> Self {
        Self { config, status }
    }

    /// Run the full ingestion: spawn, stream, validate, finalize.
    pub async fn run(&self) -> Result<IngestOutcome, CacheError> {
        self.check_source().await?;

        let started = Instant::now();
        self.status.publish(LoadingStatus {
            is_loading: true,
            ..LoadingStatus::default()
        });

        info!(
            source = %self.config.source_path.display(),
            ceiling_bytes = self.config.max_bytes,
            "starting dataset load"
        );
        if let Some(limit) = self.config.row_limit {
            info!(rows = limit, "row-count ceiling enabled");
        }
        if self.config.select_columns {
            info!(columns = EXPORT_COLUMNS.len(), "column projection enabled");
        }

        let mut child = self.spawn_converter()?;

        let mut stdout = child.stdout.take().ok_or_else(|| {
            CacheError::Internal("conversion process stdout not captured".to_string())
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            CacheError::Internal("conversion process stderr not captured".to_string())
        })?;
        let stderr_task = tokio::spawn(async move {
            let mut text = String::new();
            let _ = stderr.read_to_string(&mut text).await;
            text
        });

        let deadline = tokio::time::sleep(self.config.timeout);
        tokio::pin!(deadline);

        let mut framer = LineFramer::new();
        let mut records: Vec<ExportRecord> = Vec::new();
        let mut total_bytes = 0u64;
        let mut malformed_lines = 0u64;
        let mut chunk = vec![0u8; READ_BUF_SIZE];

        loop {
            let n = tokio::select! {
                _ = &mut deadline => {
                    let error = CacheError::Timeout { secs: self.config.timeout.as_secs() };
                    return Err(self
                        .abort(&mut child, started, total_bytes, records.len() as u64, error)
                        .await);
                }
                read = stdout.read(&mut chunk) => read.map_err(|e| {
                    CacheError::Internal(format!("reading conversion output: {e}"))
                })?,
            };
            if n == 0 {
                break;
            }

            total_bytes += n as u64;
            if total_bytes > self.config.max_bytes {
                let error = CacheError::PayloadTooLarge {
                    observed_bytes: total_bytes,
                    ceiling_bytes: self.config.max_bytes,
                };
                return Err(self
                    .abort(&mut child, started, total_bytes, records.len() as u64, error)
                    .await);
            }

            for line in framer.push(&chunk[..n]) {
                if decode_line(&line, &mut records, &mut malformed_lines) {
                    let loaded = records.len() as u64;
                    self.publish_progress(started, total_bytes, loaded);
                    if loaded % PROGRESS_LOG_INTERVAL == 0 {
                        info!(
                            records = loaded,
                            bytes_mb = format_args!("{:.2}", total_bytes as f64 / BYTES_PER_MB),
                            "dataset load progress"
                        );
                    }
                }
            }
        }

        // Residual line without a trailing newline still counts as data.
        if let Some(line) = framer.finish() {
            if decode_line(&line, &mut records, &mut malformed_lines) {
                self.publish_progress(started, total_bytes, records.len() as u64);
            }
        }

        // Stdout is exhausted, but the run timeout still bounds process exit.
        let exit = tokio::select! {
            _ = &mut deadline => {
                let error = CacheError::Timeout { secs: self.config.timeout.as_secs() };
                return Err(self
                    .abort(&mut child, started, total_bytes, records.len() as u64, error)
                    .await);
            }
            exit = child.wait() => exit.map_err(|e| {
                CacheError::Internal(format!("waiting for conversion process: {e}"))
            })?,
        };

        let stderr_text = stderr_task.await.unwrap_or_default();

        if !exit.success() {
            self.finalize_failure(started, total_bytes, records.len() as u64);
            let code = exit.code().unwrap_or(-1);
            let stderr = stderr_text.trim().to_string();
            warn!(code, stderr = %stderr, "conversion process failed");
            return Err(CacheError::ConversionFailed { code, stderr });
        }

        if malformed_lines > 0 {
            warn!(malformed_lines, "skipped lines that failed to parse or validate");
        }

        // A zero-record outcome almost always means a misconfigured source;
        // never treat it as a valid empty cache state.
        if records.is_empty() {
            self.finalize_failure(started, total_bytes, 0);
            return Err(CacheError::EmptyResult);
        }

        let elapsed = started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            records.len() as f64 / elapsed
        } else {
            0.0
        };
        self.status.publish(LoadingStatus {
            is_loading: false,
            loaded: records.len() as u64,
            total_bytes,
            bytes_mb: total_bytes as f64 / BYTES_PER_MB,
            rate,
            estimated_total: Some(records.len() as u64),
            percentage: Some(100.0),
        });

        info!(
            records = records.len(),
            seconds = format_args!("{:.2}", elapsed),
            bytes_mb = format_args!("{:.2}", total_bytes as f64 / BYTES_PER_MB),
            rate = format_args!("{:.0}", rate),
            "dataset load completed"
        );

        Ok(IngestOutcome {
            records,
            malformed_lines,
            total_bytes,
        })
    }

    /// Fail fast before spawning anything if the source is missing or
    /// unreadable.
    async fn check_source(&self) -> Result<(), CacheError> {
        match tokio::fs::File::open(&self.config.source_path).await {
            Ok(_) => Ok(()),
            Err(_) => Err(CacheError::SourceUnavailable {
                path: self.config.source_path.display().to_string(),
            }),
        }
    }

    fn spawn_converter(&self) -> Result<Child, CacheError> {
        Command::new(&self.config.python_bin)
            .arg("-c")
            .arg(self.conversion_script())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CacheError::Internal(format!(
                    "failed to spawn conversion process {}: {e}",
                    self.config.python_bin
                ))
            })
    }

    /// Generated conversion program: columnar file in, NDJSON rows out,
    /// sentinel line last, diagnostics on stderr with a non-zero exit.
    fn conversion_script(&self) -> String {
        let row_limit = match self.config.row_limit {
            Some(limit) => limit.to_string(),
            None => "None".to_string(),
        };
        let columns = if self.config.select_columns {
            let quoted: Vec<String> = EXPORT_COLUMNS.iter().map(|c| format!("\"{c}\"")).collect();
            format!("[{}]", quoted.join(", "))
        } else {
            "None".to_string()
        };

        format!(
            r#"
import polars as pl
import json
import sys

ROW_LIMIT = {row_limit}
COLUMNS = {columns}

try:
    df = pl.read_parquet("{path}")
    if ROW_LIMIT:
        df = df.head(ROW_LIMIT)
    if COLUMNS:
        df = df.select(COLUMNS)
    for record in df.to_dicts():
        print(json.dumps(record), flush=True)
    print("{sentinel}", flush=True)
except Exception as e:
    print(json.dumps({{"error": str(e)}}), file=sys.stderr, flush=True)
    sys.exit(1)
"#,
            path = self.config.source_path.display(),
            sentinel = END_OF_STREAM_MARKER,
        )
    }

    /// Terminate the process (not merely stop reading it) and record the
    /// terminal failure status.
    async fn abort(
        &self,
        child: &mut Child,
        started: Instant,
        total_bytes: u64,
        loaded: u64,
        error: CacheError,
    ) -> CacheError {
        if let Err(e) = child.kill().await {
            debug!(error = %e, "failed to kill conversion process");
        }
        self.finalize_failure(started, total_bytes, loaded);
        warn!(error = %error, "aborting dataset load");
        error
    }

    fn publish_progress(&self, started: Instant, total_bytes: u64, loaded: u64) {
        let elapsed = started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            loaded as f64 / elapsed
        } else {
            0.0
        };
        let estimated_total = (rate > 0.0)
            .then(|| (rate * PROJECTION_HORIZON_SECS).floor().max(loaded as f64) as u64);
        let percentage = estimated_total
            .map(|total| ((loaded as f64 / total as f64) * 100.0).min(LOADING_PERCENTAGE_CAP));

        self.status.publish(LoadingStatus {
            is_loading: true,
            loaded,
            total_bytes,
            bytes_mb: total_bytes as f64 / BYTES_PER_MB,
            rate,
            estimated_total,
            percentage,
        });
    }

    /// Terminal status after a failed run: not loading, counts reached so
    /// far, no projection.
    fn finalize_failure(&self, started: Instant, total_bytes: u64, loaded: u64) {
        let elapsed = started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            loaded as f64 / elapsed
        } else {
            0.0
        };
        self.status.publish(LoadingStatus {
            is_loading: false,
            loaded,
            total_bytes,
            bytes_mb: total_bytes as f64 / BYTES_PER_MB,
            rate,
            estimated_total: None,
            percentage: None,
        });
    }
}

/// Decode one framed line into a record; returns whether a record was added.
///
/// Empty lines and the end-of-stream sentinel are discarded silently; parse
/// and validation failures bump the malformed counter.
fn decode_line(line: &str, records: &mut Vec<ExportRecord>, malformed: &mut u64) -> bool {
    if line.is_empty() || line == END_OF_STREAM_MARKER {
        return false;
    }

    let decoded = serde_json::from_str::<Value>(line)
        .map_err(|e| CacheError::MalformedRecord(e.to_string()))
        .and_then(|raw| ExportRecord::from_raw(&raw));

    match decoded {
        Ok(record) => {
            records.push(record);
            true
        },
        Err(error) => {
            *malformed += 1;
            if *malformed <= MALFORMED_LOG_LIMIT {
                let preview: String = line.chars().take(100).collect();
                warn!(error = %error, line = %preview, "failed to decode record line");
            }
            false
        },
    }
}
