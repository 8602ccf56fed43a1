// Query facade: one entry point per display view, composed from aggregator calls.
// Holds no state of its own beyond the aggregator handle.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::aggregator::{Aggregator, CounterPair};
use crate::clock::Clock;
use crate::error::Result;
use crate::models::{
    ClientBandwidthSample, ClientDetailView, ClientMetric, DashboardView, DeviceDetailView,
    DeviceHealthSample, DeviceMetric, IdentityFilter, RealtimeRate, TopConsumer, WanDetailView,
    WanMetric, WanStatsSample,
};
use crate::store::{SampleRecord, Store, StoreOptions};

/// Short toggle window for bandwidth rates.
pub const RATE_WINDOW_SHORT: Duration = Duration::from_secs(10 * 60);
/// Long toggle window for bandwidth rates.
pub const RATE_WINDOW_LONG: Duration = Duration::from_secs(60 * 60);
/// Default trend window for sparklines.
pub const TREND_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);
pub const TREND_BUCKETS: usize = 24;

const WAN_COUNTERS: CounterPair<WanMetric> = CounterPair {
    tx: WanMetric::TxBytes,
    rx: WanMetric::RxBytes,
};

const CLIENT_COUNTERS: CounterPair<ClientMetric> = CounterPair {
    tx: ClientMetric::TotalTxBytes,
    rx: ClientMetric::TotalRxBytes,
};

pub struct QueryFacade {
    aggregator: Aggregator,
}

impl QueryFacade {
    pub fn new(aggregator: Aggregator) -> Self {
        Self { aggregator }
    }

    /// Opens an existing store read-only, as a display process does.
    pub async fn open(path: &str, options: &StoreOptions, clock: Arc<dyn Clock>) -> Result<Self> {
        let store = Store::open_existing(path, options).await?;
        Ok(Self::new(Aggregator::new(Arc::new(store), clock)))
    }

    pub async fn dashboard(&self, window: Duration, buckets: usize) -> Result<DashboardView> {
        let agg = &self.aggregator;
        let wan = IdentityFilter::Singleton;
        let all = IdentityFilter::AllOfKind;

        let wan_download = agg
            .bucketed_series::<WanStatsSample>(&wan, WanMetric::RxRate, window, buckets)
            .await?;
        let wan_upload = agg
            .bucketed_series::<WanStatsSample>(&wan, WanMetric::TxRate, window, buckets)
            .await?;
        let wan_latency = agg
            .bucketed_series::<WanStatsSample>(&wan, WanMetric::Latency, window, buckets)
            .await?;
        let clients_download = agg
            .bucketed_series::<ClientBandwidthSample>(&all, ClientMetric::RxRate, window, buckets)
            .await?;
        let clients_upload = agg
            .bucketed_series::<ClientBandwidthSample>(&all, ClientMetric::TxRate, window, buckets)
            .await?;

        let store = agg.store();
        let latest_wan = store.latest::<WanStatsSample>(&wan).await?;
        let active_clients = self
            .latest_pass::<ClientBandwidthSample>(window)
            .await?
            .len();
        let devices = self.latest_pass::<DeviceHealthSample>(window).await?;

        Ok(DashboardView {
            window_secs: window.as_secs() as i64,
            wan_download,
            wan_upload,
            wan_latency,
            clients_download,
            clients_upload,
            latest_wan,
            active_clients,
            devices_connected: devices.iter().filter(|d| d.is_connected()).count(),
            devices: devices.len(),
        })
    }

    pub async fn wan_detail(&self, window: Duration, buckets: usize) -> Result<WanDetailView> {
        let agg = &self.aggregator;
        let wan = IdentityFilter::Singleton;

        let download = agg
            .bucketed_series::<WanStatsSample>(&wan, WanMetric::RxRate, window, buckets)
            .await?;
        let upload = agg
            .bucketed_series::<WanStatsSample>(&wan, WanMetric::TxRate, window, buckets)
            .await?;
        let latency = agg
            .bucketed_series::<WanStatsSample>(&wan, WanMetric::Latency, window, buckets)
            .await?;
        let rate_10m = agg
            .windowed_rate::<WanStatsSample>(&wan, WAN_COUNTERS, RATE_WINDOW_SHORT)
            .await?;
        let rate_1h = agg
            .windowed_rate::<WanStatsSample>(&wan, WAN_COUNTERS, RATE_WINDOW_LONG)
            .await?;
        let latest = agg.store().latest::<WanStatsSample>(&wan).await?;

        Ok(WanDetailView {
            window_secs: window.as_secs() as i64,
            download,
            upload,
            latency,
            rate_10m,
            rate_1h,
            realtime: latest.as_ref().map(|w| RealtimeRate {
                timestamp: w.timestamp,
                tx_rate: w.tx_rate,
                rx_rate: w.rx_rate,
            }),
            latest,
        })
    }

    pub async fn client_detail(
        &self,
        mac: &str,
        window: Duration,
        buckets: usize,
    ) -> Result<ClientDetailView> {
        let agg = &self.aggregator;
        let client = IdentityFilter::identity(mac);

        let download = agg
            .bucketed_series::<ClientBandwidthSample>(
                &client,
                ClientMetric::RxRate,
                window,
                buckets,
            )
            .await?;
        let upload = agg
            .bucketed_series::<ClientBandwidthSample>(
                &client,
                ClientMetric::TxRate,
                window,
                buckets,
            )
            .await?;
        let rate_10m = agg
            .windowed_rate::<ClientBandwidthSample>(&client, CLIENT_COUNTERS, RATE_WINDOW_SHORT)
            .await?;
        let rate_1h = agg
            .windowed_rate::<ClientBandwidthSample>(&client, CLIENT_COUNTERS, RATE_WINDOW_LONG)
            .await?;
        let latest = agg.store().latest::<ClientBandwidthSample>(&client).await?;

        Ok(ClientDetailView {
            mac: mac.to_string(),
            window_secs: window.as_secs() as i64,
            download,
            upload,
            rate_10m,
            rate_1h,
            realtime: latest.as_ref().map(|c| RealtimeRate {
                timestamp: c.timestamp,
                tx_rate: c.tx_rate,
                rx_rate: c.rx_rate,
            }),
            latest,
        })
    }

    pub async fn device_detail(
        &self,
        device_mac: &str,
        window: Duration,
        buckets: usize,
    ) -> Result<DeviceDetailView> {
        let agg = &self.aggregator;
        let device = IdentityFilter::identity(device_mac);

        let cpu = agg
            .bucketed_series::<DeviceHealthSample>(&device, DeviceMetric::Cpu, window, buckets)
            .await?;
        let memory = agg
            .bucketed_series::<DeviceHealthSample>(&device, DeviceMetric::Memory, window, buckets)
            .await?;
        let temperature = agg
            .bucketed_series::<DeviceHealthSample>(
                &device,
                DeviceMetric::Temperature,
                window,
                buckets,
            )
            .await?;
        let latest = agg.store().latest::<DeviceHealthSample>(&device).await?;

        Ok(DeviceDetailView {
            device_mac: device_mac.to_string(),
            window_secs: window.as_secs() as i64,
            cpu,
            memory,
            temperature,
            latest,
        })
    }

    /// Clients ranked by average total throughput over `window`, highest first.
    /// Clients without two usable samples in the window are not ranked.
    pub async fn top_consumers(&self, window: Duration, limit: usize) -> Result<Vec<TopConsumer>> {
        let rates = self
            .aggregator
            .windowed_rates_by_identity::<ClientBandwidthSample>(CLIENT_COUNTERS, window)
            .await?;
        let mut ranked: Vec<TopConsumer> = rates
            .into_iter()
            .filter_map(|(rate, last)| {
                let total = rate.total_bytes_per_sec()?;
                Some(TopConsumer {
                    mac: last.mac,
                    hostname: last.hostname,
                    ip: last.ip,
                    is_wired: last.is_wired,
                    rate,
                    total_bytes_per_sec: total,
                })
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.total_bytes_per_sec
                .partial_cmp(&a.total_bytes_per_sec)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.mac.cmp(&b.mac))
        });
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Rows of the most recent collection pass for a per-identity kind, if that pass
    /// falls inside `window`. A collector that stopped longer ago counts nothing as current.
    async fn latest_pass<S: SampleRecord>(&self, window: Duration) -> Result<Vec<S>> {
        let store = self.aggregator.store();
        let Some(latest) = store.latest::<S>(&IdentityFilter::AllOfKind).await? else {
            return Ok(Vec::new());
        };
        let ts = latest.timestamp();
        if ts < self.aggregator.now() - window.as_secs() as i64 {
            return Ok(Vec::new());
        }
        store
            .range_query::<S>(&IdentityFilter::AllOfKind, ts, ts + 1)
            .await
    }
}
