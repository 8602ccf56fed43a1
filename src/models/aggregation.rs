// Aggregated results handed to the display layer: bucketed series and windowed rates.

use serde::{Deserialize, Serialize};

/// Fixed-length series over `[window_start, window_end)`, oldest bucket first.
/// A `None` bucket had no rows (rendered blank); `Some(0.0)` is a real zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketedSeries {
    pub window_start: i64,
    pub window_end: i64,
    pub bucket_width_secs: f64,
    pub buckets: Vec<Option<f64>>,
    /// Mean of the non-empty bucket values.
    pub average: Option<f64>,
    /// Largest single value in the window (not the largest bucket mean).
    pub peak: Option<f64>,
}

impl BucketedSeries {
    /// True when no bucket has data ("nothing to display yet").
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Option::is_none)
    }

    pub fn filled_buckets(&self) -> usize {
        self.buckets.iter().filter(|b| b.is_some()).count()
    }
}

/// Throughput derived from two snapshots of a cumulative counter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum WindowedRate {
    #[serde(rename_all = "camelCase")]
    Rate {
        bytes_per_sec: f64,
        from_ts: i64,
        to_ts: i64,
    },
    /// Fewer than two usable rows in the window.
    InsufficientData,
}

impl WindowedRate {
    pub fn bytes_per_sec(&self) -> Option<f64> {
        match self {
            WindowedRate::Rate { bytes_per_sec, .. } => Some(*bytes_per_sec),
            WindowedRate::InsufficientData => None,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self, WindowedRate::InsufficientData)
    }
}

/// Upload/download rates for one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatePair {
    pub tx: WindowedRate,
    pub rx: WindowedRate,
}

impl RatePair {
    /// tx + rx when both sides have data.
    pub fn total_bytes_per_sec(&self) -> Option<f64> {
        Some(self.tx.bytes_per_sec()? + self.rx.bytes_per_sec()?)
    }
}
