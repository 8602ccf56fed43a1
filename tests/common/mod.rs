// Shared test helpers
#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;
use unifi_stats::aggregator::Aggregator;
use unifi_stats::clock::ManualClock;
use unifi_stats::models::*;
use unifi_stats::store::{Store, StoreOptions};

pub fn client(ts: i64, mac: &str, tx_bytes: u64, rx_bytes: u64) -> ClientBandwidthSample {
    ClientBandwidthSample {
        timestamp: ts,
        mac: mac.into(),
        hostname: format!("host-{mac}"),
        ip: "10.0.0.2".into(),
        tx_bytes,
        rx_bytes,
        wired_tx_bytes: 0,
        wired_rx_bytes: 0,
        tx_rate: 0.0,
        rx_rate: 0.0,
        is_wired: false,
    }
}

pub fn client_with_rates(ts: i64, mac: &str, tx_rate: f64, rx_rate: f64) -> ClientBandwidthSample {
    ClientBandwidthSample {
        tx_rate,
        rx_rate,
        ..client(ts, mac, 0, 0)
    }
}

pub fn wan(ts: i64, tx_bytes: u64, rx_bytes: u64) -> WanStatsSample {
    WanStatsSample {
        timestamp: ts,
        wan_ip: "203.0.113.7".into(),
        tx_bytes,
        rx_bytes,
        tx_rate: 0.0,
        rx_rate: 0.0,
        latency: 10,
        clients: 3,
    }
}

pub fn wan_with_rx_rate(ts: i64, rx_rate: f64) -> WanStatsSample {
    WanStatsSample {
        rx_rate,
        ..wan(ts, 0, 0)
    }
}

pub fn device(ts: i64, mac: &str, cpu: f64, temperature: Option<f64>) -> DeviceHealthSample {
    DeviceHealthSample {
        timestamp: ts,
        device_name: format!("ap-{mac}"),
        device_mac: mac.into(),
        device_type: "uap".into(),
        state: DEVICE_STATE_CONNECTED,
        cpu_usage: cpu,
        mem_usage: 40.0,
        uptime: 3600,
        temperature,
    }
}

/// Fresh writer store in a temp dir. Keep the `TempDir` alive for the test's duration.
pub async fn temp_store() -> (TempDir, Arc<Store>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stats.db");
    let store = Store::connect(path.to_str().unwrap(), &StoreOptions::default())
        .await
        .unwrap();
    store.init().await.unwrap();
    (dir, Arc::new(store))
}

pub fn aggregator(store: &Arc<Store>, now: i64) -> (ManualClock, Aggregator) {
    let clock = ManualClock::new(now);
    let agg = Aggregator::new(store.clone(), Arc::new(clock.clone()));
    (clock, agg)
}
