use anyhow::Result;
use chrono::SecondsFormat;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use unifi_stats::*;

/// Log timestamps in local time; the vacuum schedule is local time too.
struct LocalRfc3339;

impl FormatTime for LocalRfc3339 {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Local::now().to_rfc3339_opts(SecondsFormat::Millis, false);
        write!(w, "{now}")
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalRfc3339)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        version = version::VERSION,
        db = %app_config.database.path,
        interval_secs = app_config.sampler.interval_secs,
        retention_days = app_config.database.retention_days,
        "Starting {}",
        version::NAME
    );

    let store = Arc::new(
        store::Store::connect(&app_config.database.path, &app_config.store_options()).await?,
    );
    store.init().await?;

    let clock: Arc<dyn clock::Clock> = Arc::new(clock::SystemClock);
    let source: Arc<dyn source::MetricsSource> = Arc::new(source::JsonFileSource::new(
        &app_config.source.snapshot_path,
        app_config.source_max_age(),
    ));
    let stats = Arc::new(sampler::CollectorStats::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sampler_handle = sampler::spawn(
        sampler::SamplerDeps {
            source,
            store: store.clone(),
            clock: clock.clone(),
            stats: stats.clone(),
            shutdown_rx: shutdown_rx.clone(),
        },
        app_config.sampler_config(),
    );
    let sweeper_handle = sweeper::spawn(
        store.clone(),
        clock,
        app_config.sweeper_config(),
        stats,
        shutdown_rx,
    );

    let signal = shutdown_signal().await;
    tracing::info!(signal, "Stopping collector");
    let _ = shutdown_tx.send(true);
    let _ = sampler_handle.await;
    let _ = sweeper_handle.await;
    store.close().await;

    Ok(())
}

/// Waits for Ctrl-C, or SIGTERM on unix, and names the one that arrived.
async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                _ = tokio::signal::ctrl_c() => "ctrl-c",
                _ = sigterm.recv() => "sigterm",
            },
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable; waiting for ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
                "ctrl-c"
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        "ctrl-c"
    }
}
