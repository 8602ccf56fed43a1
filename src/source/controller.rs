// Controller export (clients, gateways, devices lists) and its mapping to sample rows.
// The controller is loose about types: counters arrive as numbers, floats or numeric strings,
// and optional sections may be missing or null.

use serde::{Deserialize, Deserializer};

use crate::error::{Result, StatsError};
use crate::models::{ClientBandwidthSample, CollectedBatch, DeviceHealthSample, WanStatsSample};

/// `{"clients": [..], "gateways": [..], "devices": [..]}`. Missing or null lists are empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ControllerExport {
    pub clients: Option<Vec<ClientEntry>>,
    pub gateways: Option<Vec<GatewayEntry>>,
    pub devices: Option<Vec<DeviceEntry>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClientEntry {
    #[serde(deserialize_with = "loose")]
    mac: Option<Loose>,
    #[serde(deserialize_with = "loose")]
    hostname: Option<Loose>,
    #[serde(deserialize_with = "loose")]
    name: Option<Loose>,
    #[serde(deserialize_with = "loose")]
    ip: Option<Loose>,
    #[serde(deserialize_with = "loose")]
    tx_bytes: Option<Loose>,
    #[serde(deserialize_with = "loose")]
    rx_bytes: Option<Loose>,
    #[serde(deserialize_with = "loose")]
    wired_tx_bytes: Option<Loose>,
    #[serde(deserialize_with = "loose")]
    wired_rx_bytes: Option<Loose>,
    #[serde(rename = "tx_bytes-r", deserialize_with = "loose")]
    tx_rate: Option<Loose>,
    #[serde(rename = "rx_bytes-r", deserialize_with = "loose")]
    rx_rate: Option<Loose>,
    #[serde(rename = "wired-tx_bytes-r", deserialize_with = "loose")]
    wired_tx_rate: Option<Loose>,
    #[serde(rename = "wired-rx_bytes-r", deserialize_with = "loose")]
    wired_rx_rate: Option<Loose>,
    #[serde(deserialize_with = "loose")]
    is_wired: Option<Loose>,
}

/// Gateway counters; the `uplink` block wins over the gateway's own fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GatewayEntry {
    wan1: Option<WanPort>,
    uplink: Option<Uplink>,
    #[serde(deserialize_with = "loose")]
    num_sta: Option<Loose>,
    #[serde(flatten)]
    own: Uplink,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WanPort {
    #[serde(deserialize_with = "loose")]
    ip: Option<Loose>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Uplink {
    #[serde(deserialize_with = "loose")]
    ip: Option<Loose>,
    #[serde(deserialize_with = "loose")]
    tx_bytes: Option<Loose>,
    #[serde(deserialize_with = "loose")]
    rx_bytes: Option<Loose>,
    #[serde(rename = "tx_bytes-r", deserialize_with = "loose")]
    tx_rate: Option<Loose>,
    #[serde(rename = "rx_bytes-r", deserialize_with = "loose")]
    rx_rate: Option<Loose>,
    #[serde(deserialize_with = "loose")]
    latency: Option<Loose>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeviceEntry {
    #[serde(deserialize_with = "loose")]
    mac: Option<Loose>,
    #[serde(deserialize_with = "loose")]
    name: Option<Loose>,
    #[serde(rename = "type", deserialize_with = "loose")]
    device_type: Option<Loose>,
    #[serde(deserialize_with = "loose")]
    state: Option<Loose>,
    #[serde(deserialize_with = "loose")]
    uptime: Option<Loose>,
    sys_stats: Option<SysStats>,
    #[serde(rename = "system-stats")]
    system_stats: Option<SysStats>,
    #[serde(deserialize_with = "loose")]
    general_temperature: Option<Loose>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SysStats {
    #[serde(deserialize_with = "loose")]
    cpu: Option<Loose>,
    #[serde(deserialize_with = "loose")]
    mem: Option<Loose>,
}

impl SysStats {
    fn is_empty(&self) -> bool {
        self.cpu.is_none() && self.mem.is_none()
    }
}

/// A scalar the controller may send as an integer, a float, a numeric string or a flag.
/// Anything else (objects, arrays) is kept as `Other` and reads as absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Loose {
    Int(u64),
    Float(f64),
    Flag(bool),
    Text(String),
    Other(serde::de::IgnoredAny),
}

fn loose<'de, D>(deserializer: D) -> std::result::Result<Option<Loose>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Loose>::deserialize(deserializer)
}

impl Loose {
    fn number(&self) -> Option<f64> {
        let n = match self {
            Loose::Int(n) => *n as f64,
            Loose::Float(n) => *n,
            Loose::Flag(b) => f64::from(u8::from(*b)),
            Loose::Text(s) => s.trim().parse().ok()?,
            Loose::Other(_) => return None,
        };
        n.is_finite().then_some(n)
    }

    fn counter(&self) -> u64 {
        match self {
            Loose::Int(n) => *n,
            other => other.number().map_or(0, to_counter),
        }
    }

    fn text(&self) -> Option<String> {
        match self {
            Loose::Text(s) => Some(s.clone()),
            Loose::Int(n) => Some(n.to_string()),
            Loose::Float(n) => Some(n.to_string()),
            Loose::Flag(_) | Loose::Other(_) => None,
        }
    }

    fn truthy(&self) -> bool {
        match self {
            Loose::Flag(b) => *b,
            Loose::Text(s) => matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
            other => other.number().is_some_and(|n| n != 0.0),
        }
    }
}

fn number(v: &Option<Loose>) -> Option<f64> {
    v.as_ref().and_then(Loose::number)
}

fn counter(v: &Option<Loose>) -> u64 {
    v.as_ref().map_or(0, Loose::counter)
}

fn text(v: &Option<Loose>) -> Option<String> {
    v.as_ref().and_then(Loose::text)
}

/// Uplink value if present, else the gateway's own.
fn pick<'a>(
    uplink: Option<&'a Uplink>,
    own: &'a Uplink,
    field: fn(&Uplink) -> &Option<Loose>,
) -> Option<&'a Loose> {
    uplink
        .and_then(|u| field(u).as_ref())
        .or_else(|| field(own).as_ref())
}

fn to_counter(n: f64) -> u64 {
    if n <= 0.0 { 0 } else { n as u64 }
}

/// Parses a raw export. A non-object payload or a non-array list is malformed.
pub fn parse_export(raw: &str) -> Result<ControllerExport> {
    serde_json::from_str(raw).map_err(|e| StatsError::fetch(format!("malformed export: {e}")))
}

impl ControllerExport {
    /// One batch with every row stamped `timestamp`; the first gateway supplies the WAN row.
    pub fn into_batch(self, timestamp: i64) -> CollectedBatch {
        CollectedBatch {
            timestamp,
            clients: self
                .clients
                .unwrap_or_default()
                .iter()
                .filter_map(|c| c.to_sample(timestamp))
                .collect(),
            wan: self
                .gateways
                .unwrap_or_default()
                .first()
                .map(|g| g.to_sample(timestamp)),
            devices: self
                .devices
                .unwrap_or_default()
                .iter()
                .filter_map(|d| d.to_sample(timestamp))
                .collect(),
        }
    }
}

impl ClientEntry {
    /// Clients without a MAC have no stable identity and are skipped.
    pub fn to_sample(&self, timestamp: i64) -> Option<ClientBandwidthSample> {
        let mac = text(&self.mac).filter(|m| !m.is_empty())?;
        Some(ClientBandwidthSample {
            timestamp,
            mac,
            hostname: text(&self.hostname)
                .or_else(|| text(&self.name))
                .unwrap_or_default(),
            ip: text(&self.ip).unwrap_or_default(),
            tx_bytes: counter(&self.tx_bytes),
            rx_bytes: counter(&self.rx_bytes),
            wired_tx_bytes: counter(&self.wired_tx_bytes),
            wired_rx_bytes: counter(&self.wired_rx_bytes),
            tx_rate: number(&self.tx_rate).unwrap_or(0.0)
                + number(&self.wired_tx_rate).unwrap_or(0.0),
            rx_rate: number(&self.rx_rate).unwrap_or(0.0)
                + number(&self.wired_rx_rate).unwrap_or(0.0),
            is_wired: self.is_wired.as_ref().is_some_and(Loose::truthy),
        })
    }
}

impl GatewayEntry {
    pub fn to_sample(&self, timestamp: i64) -> WanStatsSample {
        let field = |f: fn(&Uplink) -> &Option<Loose>| pick(self.uplink.as_ref(), &self.own, f);
        let wan_ip = self
            .wan1
            .as_ref()
            .and_then(|w| text(&w.ip))
            .or_else(|| self.uplink.as_ref().and_then(|u| text(&u.ip)))
            .unwrap_or_else(|| "N/A".to_string());

        WanStatsSample {
            timestamp,
            wan_ip,
            tx_bytes: field(|u| &u.tx_bytes).map_or(0, Loose::counter),
            rx_bytes: field(|u| &u.rx_bytes).map_or(0, Loose::counter),
            tx_rate: field(|u| &u.tx_rate).and_then(Loose::number).unwrap_or(0.0),
            rx_rate: field(|u| &u.rx_rate).and_then(Loose::number).unwrap_or(0.0),
            latency: field(|u| &u.latency).map_or(0, Loose::counter),
            clients: u32::try_from(counter(&self.num_sta)).unwrap_or(u32::MAX),
        }
    }
}

impl DeviceEntry {
    /// Devices without a MAC are skipped.
    pub fn to_sample(&self, timestamp: i64) -> Option<DeviceHealthSample> {
        let device_mac = text(&self.mac).filter(|m| !m.is_empty())?;
        let sys_stats = [&self.sys_stats, &self.system_stats]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty());

        Some(DeviceHealthSample {
            timestamp,
            device_name: text(&self.name).unwrap_or_else(|| "Unknown".to_string()),
            device_mac,
            device_type: text(&self.device_type).unwrap_or_default(),
            state: number(&self.state).map_or(0, |s| s as i64),
            cpu_usage: sys_stats.and_then(|s| number(&s.cpu)).unwrap_or(0.0),
            mem_usage: sys_stats.and_then(|s| number(&s.mem)).unwrap_or(0.0),
            uptime: counter(&self.uptime),
            temperature: number(&self.general_temperature),
        })
    }
}
