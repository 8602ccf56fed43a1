// Per-client bandwidth sample (one row per client MAC per collection pass)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientBandwidthSample {
    pub timestamp: i64,
    pub mac: String,
    /// Display label only; may change between samples for the same MAC.
    pub hostname: String,
    pub ip: String,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub wired_tx_bytes: u64,
    pub wired_rx_bytes: u64,
    /// Instantaneous transmit rate in bytes/sec (wireless + wired).
    pub tx_rate: f64,
    /// Instantaneous receive rate in bytes/sec (wireless + wired).
    pub rx_rate: f64,
    pub is_wired: bool,
}

/// Columns of `client_bandwidth` that can be aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMetric {
    TxBytes,
    RxBytes,
    WiredTxBytes,
    WiredRxBytes,
    /// tx_bytes + wired_tx_bytes
    TotalTxBytes,
    /// rx_bytes + wired_rx_bytes
    TotalRxBytes,
    TxRate,
    RxRate,
    /// tx_rate + rx_rate
    TotalRate,
}

impl ClientBandwidthSample {
    pub fn value(&self, metric: ClientMetric) -> f64 {
        match metric {
            ClientMetric::TxBytes => self.tx_bytes as f64,
            ClientMetric::RxBytes => self.rx_bytes as f64,
            ClientMetric::WiredTxBytes => self.wired_tx_bytes as f64,
            ClientMetric::WiredRxBytes => self.wired_rx_bytes as f64,
            ClientMetric::TotalTxBytes => self.total_tx_bytes() as f64,
            ClientMetric::TotalRxBytes => self.total_rx_bytes() as f64,
            ClientMetric::TxRate => self.tx_rate,
            ClientMetric::RxRate => self.rx_rate,
            ClientMetric::TotalRate => self.tx_rate + self.rx_rate,
        }
    }

    /// Cumulative counters a wired client reports on the wired pair, wireless on the plain pair.
    pub fn total_tx_bytes(&self) -> u64 {
        self.tx_bytes.saturating_add(self.wired_tx_bytes)
    }

    pub fn total_rx_bytes(&self) -> u64 {
        self.rx_bytes.saturating_add(self.wired_rx_bytes)
    }
}
