//! Cache configuration
//!
//! Environment-driven, with the same fallback policy as the upstream
//! dataset contract: a missing or unparseable variable silently falls back
//! to its default, so `from_env` never fails.

use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Cache Configuration Constants
// ============================================================================

/// Default source file location, relative to the working directory.
pub const DEFAULT_SOURCE_PATH: &str = "../data/dataset_dashboard_mvp.parquet";

/// Default conversion process executable.
pub const DEFAULT_PYTHON_BIN: &str = "python3";

/// Default byte ceiling for one ingestion run (512 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 512 * 1024 * 1024;

/// Default wall-clock ceiling for one ingestion run (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Columns projected when column selection is enabled.
pub const EXPORT_COLUMNS: [&str; 17] = [
    "season",
    "year",
    "week",
    "absolute_season_week",
    "region",
    "market",
    "country",
    "transport",
    "product",
    "variety",
    "importer",
    "exporter",
    "port_destination",
    "boxes",
    "net_weight_kg",
    "unit_weight_kg",
    "is_outlier",
];

/// Configuration for the dataset cache and its ingestion pipeline
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Columnar source file the conversion process reads
    pub source_path: PathBuf,
    /// Conversion process executable
    pub python_bin: String,
    /// Hard ceiling on cumulative bytes received in one run
    pub max_bytes: u64,
    /// Optional row-count ceiling applied inside the conversion process
    pub row_limit: Option<u64>,
    /// Whether the conversion process projects [`EXPORT_COLUMNS`] only
    pub select_columns: bool,
    /// Wall-clock ceiling for one run
    pub timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from(DEFAULT_SOURCE_PATH),
            python_bin: DEFAULT_PYTHON_BIN.to_string(),
            max_bytes: DEFAULT_MAX_BYTES,
            row_limit: None,
            select_columns: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl CacheConfig {
    /// Load configuration from environment variables
    ///
    /// - `EDP_DATA_PATH`: source file override
    /// - `EDP_PYTHON_BIN`: conversion executable override
    /// - `EDP_CACHE_MAX_BYTES`: byte ceiling override
    /// - `EDP_CACHE_ROW_LIMIT`: row-count ceiling (default: none)
    /// - `EDP_CACHE_SELECT_COLUMNS`: `true` enables column projection
    /// - `EDP_CACHE_TIMEOUT_SECS`: run timeout override
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            source_path: env_nonempty("EDP_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.source_path),
            python_bin: env_nonempty("EDP_PYTHON_BIN").unwrap_or(defaults.python_bin),
            max_bytes: env_positive("EDP_CACHE_MAX_BYTES").unwrap_or(defaults.max_bytes),
            row_limit: env_positive("EDP_CACHE_ROW_LIMIT"),
            select_columns: env_nonempty("EDP_CACHE_SELECT_COLUMNS")
                .map(|v| v == "true")
                .unwrap_or(false),
            timeout: env_positive("EDP_CACHE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an environment variable as a positive integer; anything else is
/// treated as unset.
fn env_positive(name: &str) -> Option<u64> {
    env_nonempty(name)
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|&v| v > 0)
}
