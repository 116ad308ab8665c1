//! EDP Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared ambient infrastructure for the EDP workspace members.
//!
//! Currently this is the structured logging setup used by the cache and the
//! HTTP facade. Components log with the `tracing` macros and the process
//! entry point initializes a subscriber once via [`logging::init_logging`].

pub mod logging;

pub use logging::{init_logging, LogConfig};
