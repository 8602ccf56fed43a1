// WAN link sample (one row per collection pass; the site has a single WAN)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WanStatsSample {
    pub timestamp: i64,
    pub wan_ip: String,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub tx_rate: f64,
    pub rx_rate: f64,
    /// Gateway-reported latency in milliseconds.
    pub latency: u64,
    /// Connected client count at collection time.
    pub clients: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WanMetric {
    TxBytes,
    RxBytes,
    TxRate,
    RxRate,
    Latency,
    Clients,
}

impl WanStatsSample {
    pub fn value(&self, metric: WanMetric) -> f64 {
        match metric {
            WanMetric::TxBytes => self.tx_bytes as f64,
            WanMetric::RxBytes => self.rx_bytes as f64,
            WanMetric::TxRate => self.tx_rate,
            WanMetric::RxRate => self.rx_rate,
            WanMetric::Latency => self.latency as f64,
            WanMetric::Clients => self.clients as f64,
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.wan_ip.is_empty() && self.wan_ip != "N/A"
    }
}
