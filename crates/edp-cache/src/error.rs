//! Error types for the dataset cache
//!
//! Run-level errors (`SourceUnavailable`, `ConversionFailed`,
//! `PayloadTooLarge`, `Timeout`, `EmptyResult`, `Internal`) propagate to
//! every caller awaiting the in-flight load and leave the cache empty so a
//! later call retries the whole pipeline. `MalformedRecord` is local to one
//! row: the pipeline counts and logs it, never aborts.
//!
//! The type is `Clone` because one load result is broadcast to every
//! concurrent waiter.

use thiserror::Error;

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Error type for dataset loading and caching
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error("source file missing or unreadable: {path}")]
    SourceUnavailable { path: String },

    #[error("conversion process failed with code {code}: {stderr}")]
    ConversionFailed { code: i32, stderr: String },

    #[error(
        "payload too large: {observed_bytes} bytes received, ceiling is {ceiling_bytes} bytes"
    )]
    PayloadTooLarge {
        observed_bytes: u64,
        ceiling_bytes: u64,
    },

    #[error("ingestion timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("no valid records decoded from source")]
    EmptyResult,

    #[error("internal load failure: {0}")]
    Internal(String),
}

impl CacheError {
    /// Stable machine-readable error kind, used by the HTTP facade
    pub fn kind(&self) -> &'static str {
        match self {
            CacheError::SourceUnavailable { .. } => "SOURCE_UNAVAILABLE",
            CacheError::ConversionFailed { .. } => "CONVERSION_FAILED",
            CacheError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            CacheError::Timeout { .. } => "TIMEOUT",
            CacheError::MalformedRecord(_) => "MALFORMED_RECORD",
            CacheError::EmptyResult => "EMPTY_RESULT",
            CacheError::Internal(_) => "INTERNAL",
        }
    }
}
