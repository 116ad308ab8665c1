//! Live load telemetry
//!
//! [`LoadingStatus`] is a point-in-time snapshot of an in-progress or
//! finished load. The pipeline overwrites the snapshot as a whole value
//! after every decoded record; readers only ever copy it, so polling is safe
//! from any number of tasks while a load is running.

use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};

/// Point-in-time snapshot of the current (or last) dataset load
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingStatus {
    /// Whether a load is currently active
    pub is_loading: bool,
    /// Records materialized so far
    pub loaded: u64,
    /// Cumulative bytes received from the conversion process
    pub total_bytes: u64,
    /// `total_bytes` in megabytes
    #[serde(rename = "bytesMB")]
    pub bytes_mb: f64,
    /// Ingestion rate in records per second, wall-clock since load start
    pub rate: f64,
    /// Heuristic projection of the eventual record count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_total: Option<u64>,
    /// Completion percentage derived from the projection; capped below 100
    /// until the run actually finishes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

/// Shared cell holding the current status snapshot.
///
/// Writes replace the whole value; reads clone it. Reads never suspend.
#[derive(Debug, Clone, Default)]
pub struct StatusCell(Arc<RwLock<LoadingStatus>>);

impl StatusCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current snapshot
    pub fn snapshot(&self) -> LoadingStatus {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the snapshot wholesale
    pub(crate) fn publish(&self, status: LoadingStatus) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = status;
    }

    /// Reset to the empty snapshot
    pub(crate) fn reset(&self) {
        self.publish(LoadingStatus::default());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let cell = StatusCell::new();
        let status = cell.snapshot();
        assert!(!status.is_loading);
        assert_eq!(status.loaded, 0);
        assert_eq!(status.rate, 0.0);
        assert_eq!(status.percentage, None);
    }

    #[test]
    fn test_publish_replaces_whole_value() {
        let cell = StatusCell::new();
        cell.publish(LoadingStatus {
            is_loading: true,
            loaded: 10,
            total_bytes: 2048,
            bytes_mb: 2048.0 / (1024.0 * 1024.0),
            rate: 5.0,
            estimated_total: Some(50),
            percentage: Some(20.0),
        });

        let status = cell.snapshot();
        assert!(status.is_loading);
        assert_eq!(status.loaded, 10);
        assert_eq!(status.estimated_total, Some(50));

        cell.reset();
        assert_eq!(cell.snapshot(), LoadingStatus::default());
    }

    #[test]
    fn test_json_field_names_match_consumer_contract() {
        let status = LoadingStatus {
            is_loading: true,
            loaded: 1,
            total_bytes: 100,
            bytes_mb: 0.0001,
            rate: 1.0,
            estimated_total: Some(10),
            percentage: Some(10.0),
        };
        let value = serde_json::to_value(&status).unwrap();
        for key in [
            "isLoading",
            "loaded",
            "totalBytes",
            "bytesMB",
            "rate",
            "estimatedTotal",
            "percentage",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }

        // projection keys are omitted when absent
        let value = serde_json::to_value(LoadingStatus::default()).unwrap();
        assert!(value.get("estimatedTotal").is_none());
        assert!(value.get("percentage").is_none());
    }
}
