// Sampler: fixed-cadence collection loop. Each tick fetches from the metrics source and
// appends every row under one collection timestamp. A failed fetch skips the tick; a failed
// row is logged and its siblings are still written. Shutdown is only observed between
// ticks, so an in-flight tick always finishes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::Instrument;

use crate::clock::{Clock, Ticker};
use crate::error::{Result, StatsError};
use crate::source::MetricsSource;
use crate::store::{AppendReport, Store};

/// Counters shared by the sampler and sweeper, logged periodically.
#[derive(Debug, Default)]
pub struct CollectorStats {
    pub ticks_ok: AtomicU64,
    pub ticks_skipped: AtomicU64,
    pub rows_appended: AtomicU64,
    pub rows_failed: AtomicU64,
    pub rows_swept: AtomicU64,
}

impl CollectorStats {
    fn record_tick(&self, report: &AppendReport) {
        self.ticks_ok.fetch_add(1, Ordering::Relaxed);
        self.rows_appended
            .fetch_add(report.appended as u64, Ordering::Relaxed);
        self.rows_failed
            .fetch_add(report.failed as u64, Ordering::Relaxed);
    }

    fn log(&self) {
        tracing::info!(
            ticks_ok = self.ticks_ok.load(Ordering::Relaxed),
            ticks_skipped = self.ticks_skipped.load(Ordering::Relaxed),
            rows_appended = self.rows_appended.load(Ordering::Relaxed),
            rows_failed = self.rows_failed.load(Ordering::Relaxed),
            rows_swept = self.rows_swept.load(Ordering::Relaxed),
            "collector stats"
        );
    }
}

/// Source, store, clock and shutdown for the sampler.
pub struct SamplerDeps {
    pub source: Arc<dyn MetricsSource>,
    pub store: Arc<Store>,
    pub clock: Arc<dyn Clock>,
    pub stats: Arc<CollectorStats>,
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Sampler timing.
pub struct SamplerConfig {
    pub interval: Duration,
    /// Upper bound on one fetch; a slower source counts as a failed fetch.
    pub fetch_timeout: Duration,
    pub stats_log_interval: Duration,
}

/// One collection pass: stamp, fetch, append. `Err` only when the fetch failed, in which
/// case nothing was written.
pub async fn run_one_tick(
    source: &dyn MetricsSource,
    store: &Store,
    clock: &dyn Clock,
    fetch_timeout: Duration,
) -> Result<AppendReport> {
    let timestamp = clock.now_unix();
    let batch = match tokio::time::timeout(fetch_timeout, source.fetch(timestamp)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(StatsError::fetch(format!(
                "timed out after {}s",
                fetch_timeout.as_secs_f64()
            )));
        }
    };
    let report = store.append_batch(&batch).await;
    tracing::debug!(
        timestamp,
        clients = batch.clients.len(),
        devices = batch.devices.len(),
        wan = batch.wan.is_some(),
        appended = report.appended,
        failed = report.failed,
        "tick collected"
    );
    Ok(report)
}

pub fn spawn(deps: SamplerDeps, config: SamplerConfig) -> tokio::task::JoinHandle<()> {
    let SamplerDeps {
        source,
        store,
        clock,
        stats,
        mut shutdown_rx,
    } = deps;
    let SamplerConfig {
        interval: sample_interval,
        fetch_timeout,
        stats_log_interval,
    } = config;

    let sampler_span = tracing::debug_span!("sampler", interval_secs = sample_interval.as_secs());

    let task = async move {
        let mut ticker = Ticker::new(sample_interval);
        let mut stats_log_tick = interval(stats_log_interval);
        stats_log_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        stats_log_tick.tick().await;
        let mut missed_seen = 0u64;

        loop {
            if *shutdown_rx.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    // A dropped sender also means stop.
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if ticker.missed() > missed_seen {
                        tracing::warn!(
                            missed = ticker.missed() - missed_seen,
                            "tick overran the interval; skipped slots"
                        );
                        missed_seen = ticker.missed();
                    }
                    let outcome =
                        run_one_tick(source.as_ref(), &store, clock.as_ref(), fetch_timeout).await;
                    match outcome {
                        Ok(report) => stats.record_tick(&report),
                        Err(e) => {
                            stats.ticks_skipped.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(
                                error = %e,
                                operation = "fetch",
                                "collection failed; skipping tick"
                            );
                        }
                    }
                }
                _ = stats_log_tick.tick() => stats.log(),
            }
        }
        tracing::debug!("Sampler shutting down");
    };
    tokio::spawn(task.instrument(sampler_span))
}
