//! EDP Dataset Cache
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Streaming dataset loader and single-flight in-memory cache for export
//! transaction records.
//!
//! The dataset lives in a columnar file that is converted to an NDJSON
//! stream by an external process. [`cache::DataCache`] materializes that
//! stream into memory exactly once and serves it to any number of concurrent
//! readers:
//!
//! - [`record`] — the canonical [`record::ExportRecord`] shape and the
//!   validator that coerces one raw NDJSON row into it.
//! - [`framing`] — recovers discrete text lines from arbitrary byte chunks.
//! - [`pipeline`] — drives the conversion process with a byte ceiling, a
//!   wall-clock timeout, and live progress telemetry.
//! - [`cache`] — memoizes the collection and collapses concurrent first-load
//!   requests into one pipeline run.
//!
//! # Example
//!
//! ```no_run
//! use edp_cache::{CacheConfig, DataCache};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), edp_cache::CacheError> {
//!     let cache = DataCache::new(CacheConfig::from_env());
//!     let records = cache.get_data().await?;
//!     println!("loaded {} records", records.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod framing;
pub mod pipeline;
pub mod record;
pub mod status;

// Re-export commonly used types
pub use cache::DataCache;
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use record::ExportRecord;
pub use status::LoadingStatus;
