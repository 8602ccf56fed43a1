// Sample kinds, the tagged sample variant, identity filters and per-tick batches

use serde::{Deserialize, Serialize};

use super::{ClientBandwidthSample, DeviceHealthSample, WanStatsSample};

/// The closed set of sample kinds; each maps to one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    ClientBandwidth,
    WanStats,
    DeviceHealth,
}

impl SampleKind {
    pub const ALL: [SampleKind; 3] = [
        SampleKind::ClientBandwidth,
        SampleKind::WanStats,
        SampleKind::DeviceHealth,
    ];

    pub fn table(self) -> &'static str {
        match self {
            SampleKind::ClientBandwidth => "client_bandwidth",
            SampleKind::WanStats => "wan_stats",
            SampleKind::DeviceHealth => "device_health",
        }
    }

    /// Stable identity column; `None` for the WAN singleton.
    pub fn identity_column(self) -> Option<&'static str> {
        match self {
            SampleKind::ClientBandwidth => Some("mac"),
            SampleKind::WanStats => None,
            SampleKind::DeviceHealth => Some("device_mac"),
        }
    }
}

impl std::fmt::Display for SampleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// One immutable row of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Sample {
    ClientBandwidth(ClientBandwidthSample),
    WanStats(WanStatsSample),
    DeviceHealth(DeviceHealthSample),
}

impl Sample {
    pub fn kind(&self) -> SampleKind {
        match self {
            Sample::ClientBandwidth(_) => SampleKind::ClientBandwidth,
            Sample::WanStats(_) => SampleKind::WanStats,
            Sample::DeviceHealth(_) => SampleKind::DeviceHealth,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Sample::ClientBandwidth(s) => s.timestamp,
            Sample::WanStats(s) => s.timestamp,
            Sample::DeviceHealth(s) => s.timestamp,
        }
    }
}

/// Which identities a range query covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityFilter {
    /// One client or device MAC.
    Identity(String),
    /// Every identity of the queried kind (cross-client aggregation).
    AllOfKind,
    /// The WAN singleton.
    Singleton,
}

impl IdentityFilter {
    pub fn identity(mac: impl Into<String>) -> Self {
        IdentityFilter::Identity(mac.into())
    }
}

/// Everything one successful fetch produced. All rows share `timestamp`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedBatch {
    pub timestamp: i64,
    pub clients: Vec<ClientBandwidthSample>,
    /// None when the site reported no gateway this pass.
    pub wan: Option<WanStatsSample>,
    pub devices: Vec<DeviceHealthSample>,
}

impl CollectedBatch {
    pub fn len(&self) -> usize {
        self.clients.len() + self.devices.len() + usize::from(self.wan.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows in write order; the collection timestamp is already stamped on each.
    pub fn into_samples(self) -> Vec<Sample> {
        let mut out = Vec::with_capacity(self.len());
        out.extend(self.clients.into_iter().map(Sample::ClientBandwidth));
        out.extend(self.wan.into_iter().map(Sample::WanStats));
        out.extend(self.devices.into_iter().map(Sample::DeviceHealth));
        out
    }
}
