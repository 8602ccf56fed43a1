// Retention sweeper: every sweep_interval, delete rows older than now - retention.
// VACUUM runs on a configurable schedule (cron expression or fixed interval).

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::clock::{Clock, Ticker};
use crate::error::Result;
use crate::sampler::CollectorStats;
use crate::store::Store;

/// Config for the retention sweeper.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub retention: Duration,
    pub sweep_interval: Duration,
    /// Optional cron expression for VACUUM (e.g. "0 0 3 * * *" = 03:00 daily). Uses local time.
    pub vacuum_schedule: Option<String>,
    /// Run VACUUM every this often when vacuum_schedule is not set.
    pub vacuum_interval: Duration,
}

/// One sweep. The horizon is fixed before the delete starts, so rows at or after it
/// are never removed no matter how long the delete takes.
pub async fn sweep_once(store: &Store, clock: &dyn Clock, retention: Duration) -> Result<u64> {
    let horizon = clock.now_unix() - retention.as_secs() as i64;
    let removed = store.delete_older_than(horizon).await?;
    if removed > 0 {
        info!(removed, horizon, "retention sweep");
    }
    Ok(removed)
}

/// Spawns the sweeper. Returns a join handle that completes after shutdown.
pub fn spawn(
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    config: SweeperConfig,
    stats: Arc<CollectorStats>,
    shutdown_rx: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(store, clock, config, stats, shutdown_rx).await;
    })
}

#[instrument(skip_all, fields(sweep_interval_secs = config.sweep_interval.as_secs()))]
async fn run(
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    config: SweeperConfig,
    stats: Arc<CollectorStats>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = Ticker::new(config.sweep_interval);
    let mut vacuum = VacuumPlan::from_config(&config);

    loop {
        if *shutdown_rx.borrow() {
            break;
        }
        tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                match sweep_once(&store, clock.as_ref(), config.retention).await {
                    Ok(removed) => {
                        stats.rows_swept.fetch_add(removed, Ordering::Relaxed);
                    }
                    Err(e) => warn!(error = %e, operation = "sweep", "retention sweep failed"),
                }
            }
            _ = vacuum.due() => {
                if let Err(e) = store.vacuum().await {
                    warn!(error = %e, "vacuum failed");
                } else {
                    info!("vacuum complete");
                }
            }
        }
    }
    tracing::debug!("Sweeper shutting down");
}

/// When VACUUM runs: cron times in local time, a fixed interval, or never.
enum VacuumPlan {
    Cron(cron::Schedule),
    Every(Ticker),
    Off,
}

impl VacuumPlan {
    fn from_config(config: &SweeperConfig) -> Self {
        match &config.vacuum_schedule {
            Some(expr) => match cron::Schedule::from_str(expr) {
                Ok(schedule) => VacuumPlan::Cron(schedule),
                Err(e) => {
                    warn!(cron = %expr, error = %e, "invalid vacuum_schedule; VACUUM will not run");
                    VacuumPlan::Off
                }
            },
            // No VACUUM at startup: first run is one interval in.
            None => VacuumPlan::Every(Ticker::starting_at(
                Instant::now() + config.vacuum_interval,
                config.vacuum_interval,
            )),
        }
    }

    /// Completes at the next VACUUM time. Cancel-safe: a dropped wait is recomputed
    /// on the next call. Never completes when VACUUM is off.
    async fn due(&mut self) {
        match self {
            VacuumPlan::Cron(schedule) => {
                let now = chrono::Local::now();
                match schedule.after(&now).next() {
                    Some(next) => {
                        let delay = (next - now).to_std().unwrap_or(Duration::ZERO);
                        tokio::time::sleep(delay).await;
                    }
                    None => std::future::pending().await,
                }
            }
            VacuumPlan::Every(ticker) => {
                ticker.tick().await;
            }
            VacuumPlan::Off => std::future::pending().await,
        }
    }
}
