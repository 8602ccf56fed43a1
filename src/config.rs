use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::sampler::SamplerConfig;
use crate::store::StoreOptions;
use crate::sweeper::SweeperConfig;

const SECS_PER_DAY: u64 = 86_400;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sampler: SamplerSettings,
    #[serde(default)]
    pub retention: RetentionSettings,
    pub source: SourceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
}

fn default_retention_days() -> u32 {
    7
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_max_pool_size() -> u32 {
    4
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplerSettings {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Upper bound on one controller fetch; must fit inside one interval.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// How often to log collector stats (ticks, rows appended/failed/swept) at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            stats_log_interval_secs: default_stats_log_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    30
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_stats_log_interval_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetentionSettings {
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Cron expression for VACUUM in local time (seconds field first, e.g. "0 0 3 * * *").
    #[serde(default)]
    pub vacuum_schedule: Option<String>,
    #[serde(default = "default_vacuum_interval_secs")]
    pub vacuum_interval_secs: u64,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            vacuum_schedule: None,
            vacuum_interval_secs: default_vacuum_interval_secs(),
        }
    }
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

fn default_vacuum_interval_secs() -> u64 {
    SECS_PER_DAY
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// JSON export written by the controller client.
    pub snapshot_path: String,
    /// Exports older than this are a failed fetch. Unset disables the check.
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(u64::from(self.database.retention_days) * SECS_PER_DAY)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            busy_timeout: Duration::from_millis(self.database.busy_timeout_ms),
            max_connections: self.database.max_pool_size,
        }
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            interval: Duration::from_secs(self.sampler.interval_secs),
            fetch_timeout: Duration::from_secs(self.sampler.fetch_timeout_secs),
            stats_log_interval: Duration::from_secs(self.sampler.stats_log_interval_secs),
        }
    }

    pub fn sweeper_config(&self) -> SweeperConfig {
        SweeperConfig {
            retention: self.retention(),
            sweep_interval: Duration::from_secs(self.retention.sweep_interval_secs),
            vacuum_schedule: self.retention.vacuum_schedule.clone(),
            vacuum_interval: Duration::from_secs(self.retention.vacuum_interval_secs),
        }
    }

    pub fn source_max_age(&self) -> Option<Duration> {
        self.source.max_age_secs.map(Duration::from_secs)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.retention_days > 0,
            "database.retention_days must be > 0, got {}",
            self.database.retention_days
        );
        anyhow::ensure!(
            self.database.busy_timeout_ms > 0,
            "database.busy_timeout_ms must be > 0, got {}",
            self.database.busy_timeout_ms
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.sampler.interval_secs > 0,
            "sampler.interval_secs must be > 0, got {}",
            self.sampler.interval_secs
        );
        anyhow::ensure!(
            self.sampler.fetch_timeout_secs > 0
                && self.sampler.fetch_timeout_secs <= self.sampler.interval_secs,
            "sampler.fetch_timeout_secs must be between 1 and interval_secs ({}), got {}",
            self.sampler.interval_secs,
            self.sampler.fetch_timeout_secs
        );
        anyhow::ensure!(
            self.sampler.stats_log_interval_secs > 0,
            "sampler.stats_log_interval_secs must be > 0, got {}",
            self.sampler.stats_log_interval_secs
        );
        let max_sweep = self.retention().as_secs() / 10;
        anyhow::ensure!(
            self.retention.sweep_interval_secs > 0
                && self.retention.sweep_interval_secs <= max_sweep,
            "retention.sweep_interval_secs must be between 1 and {} (retention / 10), got {}",
            max_sweep,
            self.retention.sweep_interval_secs
        );
        anyhow::ensure!(
            self.retention.vacuum_interval_secs > 0,
            "retention.vacuum_interval_secs must be > 0, got {}",
            self.retention.vacuum_interval_secs
        );
        if let Some(ref cron_str) = self.retention.vacuum_schedule {
            cron::Schedule::from_str(cron_str).map_err(|e| {
                anyhow::anyhow!("retention.vacuum_schedule {:?} is invalid: {}", cron_str, e)
            })?;
        }
        anyhow::ensure!(
            !self.source.snapshot_path.is_empty(),
            "source.snapshot_path must be non-empty"
        );
        Ok(())
    }
}
