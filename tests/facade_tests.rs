// Query facade tests: views read through a separate read-only handle, as a display process does

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use tempfile::TempDir;
use unifi_stats::clock::ManualClock;
use unifi_stats::error::StatsError;
use unifi_stats::facade::QueryFacade;
use unifi_stats::models::*;
use unifi_stats::store::{Store, StoreOptions};

const NOW: i64 = 1_700_000_000;
const HOUR: Duration = Duration::from_secs(3600);

async fn open_reader(dir: &TempDir) -> QueryFacade {
    open_reader_at(dir, NOW).await
}

async fn open_reader_at(dir: &TempDir, now: i64) -> QueryFacade {
    let path = dir.path().join("stats.db");
    QueryFacade::open(
        path.to_str().unwrap(),
        &StoreOptions::default(),
        Arc::new(ManualClock::new(now)),
    )
    .await
    .unwrap()
}

/// Two collections 30s apart: clients aa (10 B/s up), bb (40 B/s down), one AP and the WAN.
async fn seed(store: &Store) {
    for (i, ts) in [NOW - 30, NOW].into_iter().enumerate() {
        let i = i as u64;
        let mut aa = client(ts, "aa", 300 * i, 0);
        aa.tx_rate = 10.0;
        aa.hostname = if i == 0 { "old-name".into() } else { "laptop".into() };
        let mut bb = client(ts, "bb", 0, 1200 * i);
        bb.rx_rate = 40.0;
        bb.is_wired = true;
        let mut w = wan(ts, 3000 * i, 6000 * i);
        w.rx_rate = 200.0;
        w.tx_rate = 100.0;
        let mut ap = device(ts, "d1", 20.0 + i as f64 * 10.0, Some(50.0));
        if i == 1 {
            ap.state = 0;
        }
        let batch = CollectedBatch {
            timestamp: ts,
            clients: vec![aa, bb],
            wan: Some(w),
            devices: vec![ap, device(ts, "d2", 5.0, None)],
        };
        let report = store.append_batch(&batch).await;
        assert_eq!(report.failed, 0);
    }
}

#[tokio::test]
async fn facade_open_missing_store_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let err = QueryFacade::open(
        dir.path().join("nope.db").to_str().unwrap(),
        &StoreOptions::default(),
        Arc::new(ManualClock::new(NOW)),
    )
    .await
    .err()
    .unwrap();
    assert!(matches!(err, StatsError::StoreUnavailable { .. }));
}

#[tokio::test]
async fn dashboard_combines_wan_clients_and_devices() {
    let (dir, store) = temp_store().await;
    seed(&store).await;
    let facade = open_reader(&dir).await;

    let view = facade.dashboard(HOUR, 6).await.unwrap();
    assert_eq!(view.window_secs, 3600);
    assert_eq!(view.wan_download.buckets.len(), 6);
    // Row at NOW sits on the exclusive end; the NOW-30 row is in the last bucket
    assert_eq!(view.wan_download.buckets[5], Some(200.0));
    assert_eq!(view.wan_upload.peak, Some(100.0));
    assert_eq!(view.wan_latency.average, Some(10.0));
    assert_eq!(view.clients_download.peak, Some(40.0));
    assert_eq!(view.clients_upload.peak, Some(10.0));
    assert_eq!(view.latest_wan.as_ref().map(|w| w.timestamp), Some(NOW));
    assert_eq!(view.active_clients, 2);
    assert_eq!(view.devices, 2);
    assert_eq!(view.devices_connected, 1);
}

#[tokio::test]
async fn dashboard_on_empty_store_has_empty_series() {
    let (dir, _store) = temp_store().await;
    let facade = open_reader(&dir).await;

    let view = facade.dashboard(HOUR, 4).await.unwrap();
    assert!(view.wan_download.is_empty());
    assert!(view.clients_upload.is_empty());
    assert!(view.latest_wan.is_none());
    assert_eq!(view.active_clients, 0);
    assert_eq!(view.devices, 0);
}

#[tokio::test]
async fn dashboard_counts_nothing_current_after_collector_stops() {
    let (dir, store) = temp_store().await;
    seed(&store).await;

    // Last pass is two hours old: outside a one-hour dashboard
    let facade = open_reader_at(&dir, NOW + 2 * 3600).await;
    let view = facade.dashboard(HOUR, 4).await.unwrap();
    assert_eq!(view.active_clients, 0);
    assert_eq!(view.devices, 0);
    assert_eq!(view.devices_connected, 0);

    // A day-long dashboard still covers it
    let view = facade.dashboard(Duration::from_secs(86_400), 4).await.unwrap();
    assert_eq!(view.active_clients, 2);
    assert_eq!(view.devices, 2);
}

#[tokio::test]
async fn wan_detail_reports_rates_and_realtime() {
    let (dir, store) = temp_store().await;
    seed(&store).await;
    let facade = open_reader(&dir).await;

    let view = facade.wan_detail(HOUR, 12).await.unwrap();
    assert_eq!(view.rate_10m.tx.bytes_per_sec(), Some(100.0));
    assert_eq!(view.rate_10m.rx.bytes_per_sec(), Some(200.0));
    assert_eq!(view.rate_1h, view.rate_10m);
    let realtime = view.realtime.unwrap();
    assert_eq!((realtime.tx_rate, realtime.rx_rate), (100.0, 200.0));
    assert_eq!(realtime.timestamp, NOW);
    assert_eq!(view.download.buckets.len(), 12);
}

#[tokio::test]
async fn client_detail_uses_latest_hostname() {
    let (dir, store) = temp_store().await;
    seed(&store).await;
    let facade = open_reader(&dir).await;

    let view = facade.client_detail("aa", HOUR, 4).await.unwrap();
    assert_eq!(view.mac, "aa");
    assert_eq!(view.latest.as_ref().unwrap().hostname, "laptop");
    assert_eq!(view.rate_10m.tx.bytes_per_sec(), Some(10.0));
    assert_eq!(view.rate_10m.rx.bytes_per_sec(), Some(0.0));
    assert_eq!(view.upload.peak, Some(10.0));

    let unknown = facade.client_detail("zz", HOUR, 4).await.unwrap();
    assert!(unknown.latest.is_none());
    assert!(unknown.realtime.is_none());
    assert!(unknown.rate_1h.tx.is_insufficient());
    assert!(unknown.download.is_empty());
}

#[tokio::test]
async fn device_detail_series_and_missing_temperature() {
    let (dir, store) = temp_store().await;
    seed(&store).await;
    let facade = open_reader(&dir).await;

    let ap = facade.device_detail("d1", HOUR, 1).await.unwrap();
    // Only the NOW-30 row falls inside [NOW-3600, NOW)
    assert_eq!(ap.cpu.buckets, vec![Some(20.0)]);
    assert_eq!(ap.temperature.average, Some(50.0));
    assert_eq!(ap.latest.as_ref().map(|d| d.state), Some(0));

    let switch = facade.device_detail("d2", HOUR, 1).await.unwrap();
    assert!(switch.temperature.is_empty());
    assert_eq!(switch.memory.average, Some(40.0));
}

#[tokio::test]
async fn top_consumers_ranked_by_total_rate() {
    let (dir, store) = temp_store().await;
    seed(&store).await;
    // Same total as bb, sorts after it by MAC
    store.append(&client(NOW - 30, "cc", 0, 0)).await.unwrap();
    store.append(&client(NOW, "cc", 600, 600)).await.unwrap();
    // Single sample: not ranked
    store.append(&client(NOW, "dd", 1, 1)).await.unwrap();
    let facade = open_reader(&dir).await;

    let top = facade.top_consumers(Duration::from_secs(600), 10).await.unwrap();
    let macs: Vec<&str> = top.iter().map(|t| t.mac.as_str()).collect();
    assert_eq!(macs, vec!["bb", "cc", "aa"]);
    assert_eq!(top[0].total_bytes_per_sec, 40.0);
    assert!(top[0].is_wired);
    assert_eq!(top[2].hostname, "laptop");

    let top1 = facade.top_consumers(Duration::from_secs(600), 1).await.unwrap();
    assert_eq!(top1.len(), 1);
    assert_eq!(top1[0].mac, "bb");
}

#[tokio::test]
async fn views_serialize_camel_case() {
    let (dir, store) = temp_store().await;
    seed(&store).await;
    let facade = open_reader(&dir).await;

    let json = serde_json::to_value(facade.wan_detail(HOUR, 2).await.unwrap()).unwrap();
    assert!(json.get("windowSecs").is_some());
    assert_eq!(json["rate10m"]["tx"]["status"], "rate");
    assert_eq!(json["latest"]["wanIp"], "203.0.113.7");
}
