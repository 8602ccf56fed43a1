// Stateless read-side aggregation over the store: bucketed series and windowed rates.
// Every call reads the rows it needs and computes from scratch; no state survives a call.

pub mod bucket;
pub mod rate;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::error::{Result, StatsError};
use crate::models::{BucketedSeries, IdentityFilter, RatePair};
use crate::store::{SampleRecord, Store};
use tracing::instrument;

/// Cumulative tx/rx counter columns of one kind.
#[derive(Debug, Clone, Copy)]
pub struct CounterPair<M> {
    pub tx: M,
    pub rx: M,
}

pub struct Aggregator {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
}

impl Aggregator {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn now(&self) -> i64 {
        self.clock.now_unix()
    }

    /// `bucket_count` equal buckets over the `window` ending now, each the mean of `metric`
    /// in that bucket. With `AllOfKind`, rows sharing a collection timestamp are summed first.
    #[instrument(skip(self), fields(operation = "bucketed_series", table = S::KIND.table()))]
    pub async fn bucketed_series<S: SampleRecord>(
        &self,
        filter: &IdentityFilter,
        metric: S::Metric,
        window: Duration,
        bucket_count: usize,
    ) -> Result<BucketedSeries> {
        if bucket_count == 0 {
            return Err(StatsError::InvalidQuery("bucket_count must be > 0".into()));
        }
        let (from, to) = self.window_bounds(window)?;
        let rows: Vec<S> = self.store.range_query(filter, from, to).await?;
        let points = metric_points(&rows, metric);
        let points = match filter {
            IdentityFilter::AllOfKind => bucket::collapse_instants(&points),
            _ => points,
        };
        Ok(bucket::bucketize(&points, from, to, bucket_count))
    }

    /// Average tx/rx throughput over the `window` ending now, from cumulative counters.
    /// Rows stamped exactly "now" are included. With `AllOfKind`, per-identity rates are summed.
    #[instrument(skip(self), fields(operation = "windowed_rate", table = S::KIND.table()))]
    pub async fn windowed_rate<S: SampleRecord>(
        &self,
        filter: &IdentityFilter,
        counters: CounterPair<S::Metric>,
        window: Duration,
    ) -> Result<RatePair> {
        let (from, to) = self.window_bounds(window)?;
        let rows: Vec<S> = self.store.range_query(filter, from, to + 1).await?;
        Ok(match filter {
            IdentityFilter::AllOfKind => {
                let mut by_identity: BTreeMap<&str, Vec<&S>> = BTreeMap::new();
                for row in &rows {
                    by_identity.entry(row.identity()).or_default().push(row);
                }
                let per_identity: Vec<RatePair> = by_identity
                    .values()
                    .map(|group| rate_pair(group.iter().copied(), counters))
                    .collect();
                RatePair {
                    tx: rate::sum_rates(per_identity.iter().map(|p| p.tx)),
                    rx: rate::sum_rates(per_identity.iter().map(|p| p.rx)),
                }
            }
            _ => rate_pair(rows.iter(), counters),
        })
    }

    /// Per-identity rates over the `window` ending now, each with the identity's most recent
    /// row in the window. One range query serves every identity.
    #[instrument(skip(self), fields(operation = "windowed_rates_by_identity", table = S::KIND.table()))]
    pub async fn windowed_rates_by_identity<S: SampleRecord>(
        &self,
        counters: CounterPair<S::Metric>,
        window: Duration,
    ) -> Result<Vec<(RatePair, S)>> {
        let (from, to) = self.window_bounds(window)?;
        let rows: Vec<S> = self
            .store
            .range_query(&IdentityFilter::AllOfKind, from, to + 1)
            .await?;
        let mut by_identity: BTreeMap<String, Vec<S>> = BTreeMap::new();
        for row in rows {
            by_identity
                .entry(row.identity().to_string())
                .or_default()
                .push(row);
        }
        let mut out = Vec::with_capacity(by_identity.len());
        for (_identity, mut group) in by_identity {
            let pair = rate_pair(group.iter(), counters);
            if let Some(last) = group.pop() {
                out.push((pair, last));
            }
        }
        Ok(out)
    }

    fn window_bounds(&self, window: Duration) -> Result<(i64, i64)> {
        let secs = i64::try_from(window.as_secs())
            .map_err(|_| StatsError::InvalidQuery("window too large".into()))?;
        if secs == 0 {
            return Err(StatsError::InvalidQuery("window must be at least 1s".into()));
        }
        let now = self.now();
        Ok((now - secs, now))
    }
}

fn metric_points<S: SampleRecord>(rows: &[S], metric: S::Metric) -> Vec<(i64, f64)> {
    rows.iter()
        .filter_map(|r| r.metric_value(metric).map(|v| (r.timestamp(), v)))
        .collect()
}

fn rate_pair<'a, S: SampleRecord>(
    rows: impl Iterator<Item = &'a S> + Clone,
    counters: CounterPair<S::Metric>,
) -> RatePair {
    let series = |metric: S::Metric| -> Vec<(i64, f64)> {
        rows.clone()
            .filter_map(|r| r.metric_value(metric).map(|v| (r.timestamp(), v)))
            .collect()
    };
    RatePair {
        tx: rate::counter_rate(&series(counters.tx)),
        rx: rate::counter_rate(&series(counters.rx)),
    }
}

