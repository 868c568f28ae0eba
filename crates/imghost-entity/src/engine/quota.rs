//! Engine capacity value object.

use serde::{Deserialize, Serialize};

/// Capacity information for a storage engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineQuota {
    /// Capacity limit in bytes (None = unlimited).
    pub max_capacity: Option<i64>,
    /// Currently used bytes.
    pub used_capacity: i64,
    /// Remaining bytes (None if unlimited).
    pub available_bytes: Option<i64>,
    /// Usage percentage (0.0 - 100.0, None if unlimited).
    pub usage_percent: Option<f64>,
}

impl EngineQuota {
    /// Create a quota from limit and used values.
    pub fn new(max_capacity: Option<i64>, used_capacity: i64) -> Self {
        let available_bytes = max_capacity.map(|max| (max - used_capacity).max(0));
        let usage_percent = max_capacity.map(|max| {
            if max <= 0 {
                0.0
            } else {
                ((used_capacity as f64 / max as f64) * 10_000.0).round() / 100.0
            }
        });

        Self {
            max_capacity,
            used_capacity,
            available_bytes,
            usage_percent,
        }
    }

    /// Check if storing `additional_bytes` more would exceed the limit.
    pub fn would_exceed(&self, additional_bytes: i64) -> bool {
        match self.max_capacity {
            Some(max) => self.used_capacity.saturating_add(additional_bytes) > max,
            None => false,
        }
    }
}
