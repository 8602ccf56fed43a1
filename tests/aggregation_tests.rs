// Aggregator tests against a real store: bucketed series and windowed rates

mod common;

use std::time::Duration;

use common::*;
use unifi_stats::aggregator::CounterPair;
use unifi_stats::error::StatsError;
use unifi_stats::models::*;

const NOW: i64 = 1_700_000_000;
const DAY: Duration = Duration::from_secs(24 * 3600);

const WAN_BYTES: CounterPair<WanMetric> = CounterPair {
    tx: WanMetric::TxBytes,
    rx: WanMetric::RxBytes,
};

const CLIENT_BYTES: CounterPair<ClientMetric> = CounterPair {
    tx: ClientMetric::TotalTxBytes,
    rx: ClientMetric::TotalRxBytes,
};

#[tokio::test]
async fn hourly_rows_fill_one_bucket_each() {
    let (_dir, store) = temp_store().await;
    let start = NOW - 24 * 3600;
    for i in 0..24 {
        store
            .append(&wan_with_rx_rate(start + i * 3600, (i + 1) as f64 * 10.0))
            .await
            .unwrap();
    }
    let (_clock, agg) = aggregator(&store, NOW);

    let series = agg
        .bucketed_series::<WanStatsSample>(&IdentityFilter::Singleton, WanMetric::RxRate, DAY, 24)
        .await
        .unwrap();
    assert_eq!(series.buckets.len(), 24);
    assert_eq!(series.filled_buckets(), 24);
    assert_eq!(series.buckets[0], Some(10.0));
    assert_eq!(series.buckets[23], Some(240.0));
    assert_eq!(series.average, Some(125.0));
    assert_eq!(series.peak, Some(240.0));
    assert_eq!(series.bucket_width_secs, 3600.0);
    assert_eq!(series.window_start, start);
    assert_eq!(series.window_end, NOW);
}

#[tokio::test]
async fn empty_window_yields_all_empty_buckets() {
    let (_dir, store) = temp_store().await;
    // Outside the window on both sides
    store
        .append(&wan_with_rx_rate(NOW - DAY.as_secs() as i64 - 1, 5.0))
        .await
        .unwrap();
    store.append(&wan_with_rx_rate(NOW, 5.0)).await.unwrap();
    let (_clock, agg) = aggregator(&store, NOW);

    let series = agg
        .bucketed_series::<WanStatsSample>(&IdentityFilter::Singleton, WanMetric::RxRate, DAY, 12)
        .await
        .unwrap();
    assert_eq!(series.buckets.len(), 12);
    assert!(series.is_empty());
    assert_eq!(series.average, None);
    assert_eq!(series.peak, None);
}

#[tokio::test]
async fn sparse_buckets_average_only_filled_ones() {
    let (_dir, store) = temp_store().await;
    let start = NOW - 4 * 3600;
    // Bucket 0: two rows averaging 20; bucket 2: 100; buckets 1 and 3 empty
    store.append(&wan_with_rx_rate(start, 10.0)).await.unwrap();
    store.append(&wan_with_rx_rate(start + 60, 30.0)).await.unwrap();
    store.append(&wan_with_rx_rate(start + 2 * 3600, 100.0)).await.unwrap();
    let (_clock, agg) = aggregator(&store, NOW);

    let series = agg
        .bucketed_series::<WanStatsSample>(
            &IdentityFilter::Singleton,
            WanMetric::RxRate,
            Duration::from_secs(4 * 3600),
            4,
        )
        .await
        .unwrap();
    assert_eq!(series.buckets, vec![Some(20.0), None, Some(100.0), None]);
    assert_eq!(series.average, Some(60.0));
    assert_eq!(series.peak, Some(100.0));
}

#[tokio::test]
async fn zero_valued_bucket_is_not_empty() {
    let (_dir, store) = temp_store().await;
    store.append(&wan_with_rx_rate(NOW - 10, 0.0)).await.unwrap();
    let (_clock, agg) = aggregator(&store, NOW);

    let series = agg
        .bucketed_series::<WanStatsSample>(
            &IdentityFilter::Singleton,
            WanMetric::RxRate,
            Duration::from_secs(60),
            1,
        )
        .await
        .unwrap();
    assert_eq!(series.buckets, vec![Some(0.0)]);
    assert!(!series.is_empty());
}

#[tokio::test]
async fn series_is_deterministic_for_same_data_and_now() {
    let (_dir, store) = temp_store().await;
    for i in 0..50 {
        store
            .append(&client_with_rates(NOW - 3000 + i * 60, "aa", i as f64, 2.0 * i as f64))
            .await
            .unwrap();
    }
    let (_clock, agg) = aggregator(&store, NOW);
    let filter = IdentityFilter::identity("aa");
    let a = agg
        .bucketed_series::<ClientBandwidthSample>(
            &filter,
            ClientMetric::RxRate,
            Duration::from_secs(3600),
            7,
        )
        .await
        .unwrap();
    let b = agg
        .bucketed_series::<ClientBandwidthSample>(
            &filter,
            ClientMetric::RxRate,
            Duration::from_secs(3600),
            7,
        )
        .await
        .unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn all_of_kind_series_sums_clients_per_instant() {
    let (_dir, store) = temp_store().await;
    store.append(&client_with_rates(NOW - 100, "aa", 0.0, 10.0)).await.unwrap();
    store.append(&client_with_rates(NOW - 100, "bb", 0.0, 20.0)).await.unwrap();
    store.append(&client_with_rates(NOW - 70, "aa", 0.0, 5.0)).await.unwrap();
    let (_clock, agg) = aggregator(&store, NOW);

    let series = agg
        .bucketed_series::<ClientBandwidthSample>(
            &IdentityFilter::AllOfKind,
            ClientMetric::RxRate,
            Duration::from_secs(120),
            1,
        )
        .await
        .unwrap();
    // Instants: 30 and 5
    assert_eq!(series.buckets, vec![Some(17.5)]);
    assert_eq!(series.peak, Some(30.0));
}

#[tokio::test]
async fn missing_temperature_is_skipped_not_zeroed() {
    let (_dir, store) = temp_store().await;
    store.append(&device(NOW - 30, "d1", 10.0, Some(50.0))).await.unwrap();
    store.append(&device(NOW - 20, "d1", 10.0, None)).await.unwrap();
    store.append(&device(NOW - 10, "d1", 10.0, Some(60.0))).await.unwrap();
    let (_clock, agg) = aggregator(&store, NOW);

    let series = agg
        .bucketed_series::<DeviceHealthSample>(
            &IdentityFilter::identity("d1"),
            DeviceMetric::Temperature,
            Duration::from_secs(60),
            1,
        )
        .await
        .unwrap();
    assert_eq!(series.buckets, vec![Some(55.0)]);
}

#[tokio::test]
async fn zero_buckets_or_window_is_invalid_query() {
    let (_dir, store) = temp_store().await;
    let (_clock, agg) = aggregator(&store, NOW);
    let err = agg
        .bucketed_series::<WanStatsSample>(&IdentityFilter::Singleton, WanMetric::Latency, DAY, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, StatsError::InvalidQuery(_)));

    let err = agg
        .windowed_rate::<WanStatsSample>(&IdentityFilter::Singleton, WAN_BYTES, Duration::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, StatsError::InvalidQuery(_)));
}

#[tokio::test]
async fn wan_rate_between_two_collections() {
    let (_dir, store) = temp_store().await;
    store.append(&wan(NOW - 30, 1000, 500)).await.unwrap();
    store.append(&wan(NOW, 4000, 2000)).await.unwrap();
    let (_clock, agg) = aggregator(&store, NOW);

    let rate = agg
        .windowed_rate::<WanStatsSample>(
            &IdentityFilter::Singleton,
            WAN_BYTES,
            Duration::from_secs(600),
        )
        .await
        .unwrap();
    assert_eq!(
        rate.tx,
        WindowedRate::Rate {
            bytes_per_sec: 100.0,
            from_ts: NOW - 30,
            to_ts: NOW,
        }
    );
    assert_eq!(rate.rx.bytes_per_sec(), Some(50.0));
    assert_eq!(rate.total_bytes_per_sec(), Some(150.0));
}

#[tokio::test]
async fn rate_uses_run_after_counter_reset() {
    let (_dir, store) = temp_store().await;
    for (i, tx) in [100u64, 200, 50, 150].into_iter().enumerate() {
        store
            .append(&wan(NOW - 30 + i as i64 * 10, tx, 0))
            .await
            .unwrap();
    }
    let (_clock, agg) = aggregator(&store, NOW);

    let rate = agg
        .windowed_rate::<WanStatsSample>(
            &IdentityFilter::Singleton,
            WAN_BYTES,
            Duration::from_secs(60),
        )
        .await
        .unwrap();
    assert_eq!(
        rate.tx,
        WindowedRate::Rate {
            bytes_per_sec: 10.0,
            from_ts: NOW - 10,
            to_ts: NOW,
        }
    );
}

#[tokio::test]
async fn single_sample_rate_is_insufficient() {
    let (_dir, store) = temp_store().await;
    store.append(&wan(NOW - 5, 1000, 1000)).await.unwrap();
    let (_clock, agg) = aggregator(&store, NOW);

    let rate = agg
        .windowed_rate::<WanStatsSample>(
            &IdentityFilter::Singleton,
            WAN_BYTES,
            Duration::from_secs(600),
        )
        .await
        .unwrap();
    assert!(rate.tx.is_insufficient());
    assert!(rate.rx.is_insufficient());
    assert_eq!(rate.total_bytes_per_sec(), None);
}

#[tokio::test]
async fn rate_window_moves_with_clock() {
    let (_dir, store) = temp_store().await;
    store.append(&wan(NOW - 900, 0, 0)).await.unwrap();
    store.append(&wan(NOW - 300, 6000, 0)).await.unwrap();
    store.append(&wan(NOW, 9000, 0)).await.unwrap();
    let (clock, agg) = aggregator(&store, NOW);

    let rate = agg
        .windowed_rate::<WanStatsSample>(
            &IdentityFilter::Singleton,
            WAN_BYTES,
            Duration::from_secs(600),
        )
        .await
        .unwrap();
    // Only NOW-300 and NOW are inside the last 10 minutes
    assert_eq!(rate.tx.bytes_per_sec(), Some(10.0));

    clock.advance(400);
    let rate = agg
        .windowed_rate::<WanStatsSample>(
            &IdentityFilter::Singleton,
            WAN_BYTES,
            Duration::from_secs(600),
        )
        .await
        .unwrap();
    assert!(rate.tx.is_insufficient());
}

#[tokio::test]
async fn all_of_kind_rate_sums_per_client_rates() {
    let (_dir, store) = temp_store().await;
    store.append(&client(NOW - 30, "aa", 0, 0)).await.unwrap();
    store.append(&client(NOW, "aa", 300, 0)).await.unwrap();
    store.append(&client(NOW - 30, "bb", 1000, 0)).await.unwrap();
    store.append(&client(NOW, "bb", 1600, 0)).await.unwrap();
    // Only one sample: left out of the sum
    store.append(&client(NOW, "cc", 99_999, 0)).await.unwrap();
    let (_clock, agg) = aggregator(&store, NOW);

    let rate = agg
        .windowed_rate::<ClientBandwidthSample>(
            &IdentityFilter::AllOfKind,
            CLIENT_BYTES,
            Duration::from_secs(600),
        )
        .await
        .unwrap();
    assert_eq!(rate.tx.bytes_per_sec(), Some(30.0));
    // rx never moved: a flat counter is a zero rate, not missing data
    assert_eq!(rate.rx.bytes_per_sec(), Some(0.0));
}

#[tokio::test]
async fn rates_by_identity_carry_latest_row() {
    let (_dir, store) = temp_store().await;
    store.append(&client(NOW - 60, "aa", 0, 0)).await.unwrap();
    let mut renamed = client(NOW, "aa", 600, 1200);
    renamed.hostname = "laptop".into();
    store.append(&renamed).await.unwrap();
    store.append(&client(NOW, "bb", 5, 5)).await.unwrap();
    let (_clock, agg) = aggregator(&store, NOW);

    let rates = agg
        .windowed_rates_by_identity::<ClientBandwidthSample>(CLIENT_BYTES, Duration::from_secs(600))
        .await
        .unwrap();
    assert_eq!(rates.len(), 2);
    let (aa_rate, aa_last) = &rates[0];
    assert_eq!(aa_last.mac, "aa");
    assert_eq!(aa_last.hostname, "laptop");
    assert_eq!(aa_rate.tx.bytes_per_sec(), Some(10.0));
    assert_eq!(aa_rate.rx.bytes_per_sec(), Some(20.0));
    let (bb_rate, _) = &rates[1];
    assert!(bb_rate.tx.is_insufficient());
}
