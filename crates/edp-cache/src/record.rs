//! Canonical export record model and row validator
//!
//! One `ExportRecord` is one export transaction line. Records are built
//! exclusively by [`ExportRecord::from_raw`] from a decoded NDJSON row and
//! are immutable afterwards.
//!
//! Coercion rules mirror the upstream dataset contract: text fields fall
//! back to the empty string, numeric fields fall back to 0 (independently
//! per field, so one malformed field never invalidates the row), and the
//! outlier flag accepts both the legacy `is_data_outlier` key and the
//! current `is_outlier` key.

use crate::error::CacheError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One export transaction line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub season: String,
    pub year: i32,
    pub week: i32,
    /// Monotonic ordering key computed upstream; spans the two calendar
    /// years covered by one season.
    pub absolute_season_week: i32,

    pub region: String,
    pub market: String,
    pub country: String,
    pub transport: String,
    pub product: String,
    pub variety: String,
    pub importer: String,
    pub exporter: String,
    pub port_destination: String,

    pub boxes: f64,
    pub net_weight_kg: f64,
    /// Value in USD, when the source row carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_usd: Option<f64>,

    // Derived / audit fields
    #[serde(default)]
    pub unit_weight_kg: f64,
    #[serde(default)]
    pub is_outlier: bool,
}

impl ExportRecord {
    /// Validate and coerce one raw decoded row into a record.
    ///
    /// Fails only when the row is not a JSON object; every field-level
    /// problem is absorbed by the per-field defaults.
    pub fn from_raw(raw: &Value) -> Result<Self, CacheError> {
        let obj = raw
            .as_object()
            .ok_or_else(|| CacheError::MalformedRecord("row is not a JSON object".to_string()))?;

        Ok(Self {
            season: coerce_string(obj.get("season")),
            year: coerce_i32(obj.get("year")),
            week: coerce_i32(obj.get("week")),
            absolute_season_week: coerce_i32(obj.get("absolute_season_week")),
            region: coerce_string(obj.get("region")),
            market: coerce_string(obj.get("market")),
            country: coerce_string(obj.get("country")),
            transport: coerce_string(obj.get("transport")),
            product: coerce_string(obj.get("product")),
            variety: coerce_string(obj.get("variety")),
            importer: coerce_string(obj.get("importer")),
            exporter: coerce_string(obj.get("exporter")),
            port_destination: coerce_string(obj.get("port_destination")),
            // Quantity fields never go negative.
            boxes: coerce_f64(obj.get("boxes")).max(0.0),
            net_weight_kg: coerce_f64(obj.get("net_weight_kg")).max(0.0),
            value_usd: coerce_opt_f64(obj.get("value_usd")),
            unit_weight_kg: coerce_f64(obj.get("unit_weight_kg")),
            // Both the legacy and the current source key mark an outlier.
            is_outlier: coerce_bool(obj.get("is_data_outlier"))
                || coerce_bool(obj.get("is_outlier")),
        })
    }
}

/// String coercion with empty-string fallback
fn coerce_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Numeric coercion; anything that is not a finite number becomes 0
fn coerce_f64(value: Option<&Value>) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        },
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

fn coerce_i32(value: Option<&Value>) -> i32 {
    coerce_f64(value) as i32
}

/// Optional numeric field: present and finite, or absent
fn coerce_opt_f64(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64().filter(|f| f.is_finite()),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Truthiness for flag fields: non-zero numbers and non-empty strings count
fn coerce_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty(),
        _ => false,
    }
}
