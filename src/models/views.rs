// Per-view payloads composed by the query facade

use serde::Serialize;

use super::{
    BucketedSeries, ClientBandwidthSample, DeviceHealthSample, RatePair, WanStatsSample,
};

/// Instantaneous rates from the most recent row ("real-time" view only).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeRate {
    pub timestamp: i64,
    pub tx_rate: f64,
    pub rx_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub window_secs: i64,
    pub wan_download: BucketedSeries,
    pub wan_upload: BucketedSeries,
    pub wan_latency: BucketedSeries,
    /// Site-wide client totals per collection instant.
    pub clients_download: BucketedSeries,
    pub clients_upload: BucketedSeries,
    pub latest_wan: Option<WanStatsSample>,
    /// Counts from the last collection pass inside the window; zero when it is older.
    pub active_clients: usize,
    pub devices: usize,
    pub devices_connected: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WanDetailView {
    pub window_secs: i64,
    pub download: BucketedSeries,
    pub upload: BucketedSeries,
    pub latency: BucketedSeries,
    pub rate_10m: RatePair,
    pub rate_1h: RatePair,
    pub realtime: Option<RealtimeRate>,
    pub latest: Option<WanStatsSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDetailView {
    pub device_mac: String,
    pub window_secs: i64,
    pub cpu: BucketedSeries,
    pub memory: BucketedSeries,
    pub temperature: BucketedSeries,
    pub latest: Option<DeviceHealthSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetailView {
    pub mac: String,
    pub window_secs: i64,
    pub download: BucketedSeries,
    pub upload: BucketedSeries,
    pub rate_10m: RatePair,
    pub rate_1h: RatePair,
    pub realtime: Option<RealtimeRate>,
    pub latest: Option<ClientBandwidthSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopConsumer {
    pub mac: String,
    /// Most recent hostname seen for this MAC.
    pub hostname: String,
    pub ip: String,
    pub is_wired: bool,
    pub rate: RatePair,
    pub total_bytes_per_sec: f64,
}
