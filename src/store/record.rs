// Kind-specific row mapping: one SampleRecord impl per table.

use sqlx::Row;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};

use crate::models::{
    ClientBandwidthSample, ClientMetric, DeviceHealthSample, DeviceMetric, SampleKind,
    WanMetric, WanStatsSample,
};

/// Capability shared by the three sample kinds. Callers pick the kind by type parameter.
pub trait SampleRecord: Sized + Send + Unpin + 'static {
    /// Aggregatable columns of this kind.
    type Metric: Copy + std::fmt::Debug + Send + Sync + 'static;

    const KIND: SampleKind;

    fn timestamp(&self) -> i64;

    /// Stable identity; empty for the WAN singleton.
    fn identity(&self) -> &str;

    /// None when the row does not report this metric.
    fn metric_value(&self, metric: Self::Metric) -> Option<f64>;

    fn insert_query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>>;

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error>;
}

/// Counters are stored as INTEGER (i64); negative values only come from foreign writers.
fn get_u64(row: &SqliteRow, col: &str) -> Result<u64, sqlx::Error> {
    let v: Option<i64> = row.try_get(col)?;
    Ok(v.unwrap_or(0).max(0) as u64)
}

fn get_f64(row: &SqliteRow, col: &str) -> Result<f64, sqlx::Error> {
    let v: Option<f64> = row.try_get(col)?;
    Ok(v.unwrap_or(0.0))
}

fn get_string(row: &SqliteRow, col: &str) -> Result<String, sqlx::Error> {
    let v: Option<String> = row.try_get(col)?;
    Ok(v.unwrap_or_default())
}

impl SampleRecord for ClientBandwidthSample {
    type Metric = ClientMetric;
    const KIND: SampleKind = SampleKind::ClientBandwidth;

    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn identity(&self) -> &str {
        &self.mac
    }

    fn metric_value(&self, metric: ClientMetric) -> Option<f64> {
        Some(self.value(metric))
    }

    fn insert_query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>> {
        sqlx::query(
            "INSERT INTO client_bandwidth (timestamp, mac, hostname, ip, tx_bytes, rx_bytes, wired_tx_bytes, wired_rx_bytes, tx_rate, rx_rate, is_wired) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(self.timestamp)
        .bind(self.mac.as_str())
        .bind(self.hostname.as_str())
        .bind(self.ip.as_str())
        .bind(self.tx_bytes as i64)
        .bind(self.rx_bytes as i64)
        .bind(self.wired_tx_bytes as i64)
        .bind(self.wired_rx_bytes as i64)
        .bind(self.tx_rate)
        .bind(self.rx_rate)
        .bind(self.is_wired)
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let is_wired: Option<i64> = row.try_get("is_wired")?;
        Ok(Self {
            timestamp: row.try_get("timestamp")?,
            mac: row.try_get("mac")?,
            hostname: get_string(row, "hostname")?,
            ip: get_string(row, "ip")?,
            tx_bytes: get_u64(row, "tx_bytes")?,
            rx_bytes: get_u64(row, "rx_bytes")?,
            wired_tx_bytes: get_u64(row, "wired_tx_bytes")?,
            wired_rx_bytes: get_u64(row, "wired_rx_bytes")?,
            tx_rate: get_f64(row, "tx_rate")?,
            rx_rate: get_f64(row, "rx_rate")?,
            is_wired: is_wired.unwrap_or(0) != 0,
        })
    }
}

impl SampleRecord for WanStatsSample {
    type Metric = WanMetric;
    const KIND: SampleKind = SampleKind::WanStats;

    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn identity(&self) -> &str {
        ""
    }

    fn metric_value(&self, metric: WanMetric) -> Option<f64> {
        Some(self.value(metric))
    }

    fn insert_query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>> {
        sqlx::query(
            "INSERT INTO wan_stats (timestamp, wan_ip, tx_bytes, rx_bytes, tx_rate, rx_rate, latency, clients) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(self.timestamp)
        .bind(self.wan_ip.as_str())
        .bind(self.tx_bytes as i64)
        .bind(self.rx_bytes as i64)
        .bind(self.tx_rate)
        .bind(self.rx_rate)
        .bind(self.latency as i64)
        .bind(self.clients as i64)
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            timestamp: row.try_get("timestamp")?,
            wan_ip: get_string(row, "wan_ip")?,
            tx_bytes: get_u64(row, "tx_bytes")?,
            rx_bytes: get_u64(row, "rx_bytes")?,
            tx_rate: get_f64(row, "tx_rate")?,
            rx_rate: get_f64(row, "rx_rate")?,
            latency: get_u64(row, "latency")?,
            clients: get_u64(row, "clients")?.min(u32::MAX as u64) as u32,
        })
    }
}

impl SampleRecord for DeviceHealthSample {
    type Metric = DeviceMetric;
    const KIND: SampleKind = SampleKind::DeviceHealth;

    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn identity(&self) -> &str {
        &self.device_mac
    }

    fn metric_value(&self, metric: DeviceMetric) -> Option<f64> {
        self.value(metric)
    }

    fn insert_query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>> {
        sqlx::query(
            "INSERT INTO device_health (timestamp, device_name, device_mac, device_type, state, cpu_usage, mem_usage, uptime, temperature) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(self.timestamp)
        .bind(self.device_name.as_str())
        .bind(self.device_mac.as_str())
        .bind(self.device_type.as_str())
        .bind(self.state)
        .bind(self.cpu_usage)
        .bind(self.mem_usage)
        .bind(self.uptime as i64)
        .bind(self.temperature)
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let state: Option<i64> = row.try_get("state")?;
        Ok(Self {
            timestamp: row.try_get("timestamp")?,
            device_name: row.try_get("device_name")?,
            device_mac: row.try_get("device_mac")?,
            device_type: get_string(row, "device_type")?,
            state: state.unwrap_or(0),
            cpu_usage: get_f64(row, "cpu_usage")?,
            mem_usage: get_f64(row, "mem_usage")?,
            uptime: get_u64(row, "uptime")?,
            temperature: row.try_get("temperature")?,
        })
    }
}
