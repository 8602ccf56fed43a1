// Metrics source: the collaborator the sampler pulls from each tick.
// The controller client (auth, HTTP) lives outside this crate; it hands over its latest
// responses as a JSON export which `JsonFileSource` reads and maps.

pub mod controller;

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use crate::error::{Result, StatsError};
use crate::models::CollectedBatch;

#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Current metrics with every row stamped `timestamp`. Any error skips the whole tick.
    async fn fetch(&self, timestamp: i64) -> Result<CollectedBatch>;
}

/// Reads the controller export written by the API client.
pub struct JsonFileSource {
    path: PathBuf,
    /// Exports older than this are treated as a failed fetch rather than re-recorded.
    max_age: Option<Duration>,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>, max_age: Option<Duration>) -> Self {
        Self {
            path: path.into(),
            max_age,
        }
    }

    async fn check_fresh(&self) -> Result<()> {
        let Some(max_age) = self.max_age else {
            return Ok(());
        };
        let modified = tokio::fs::metadata(&self.path)
            .await
            .and_then(|m| m.modified())
            .map_err(|e| StatsError::fetch(format!("{}: {}", self.path.display(), e)))?;
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age > max_age {
            return Err(StatsError::fetch(format!(
                "{} is stale ({}s old)",
                self.path.display(),
                age.as_secs()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MetricsSource for JsonFileSource {
    async fn fetch(&self, timestamp: i64) -> Result<CollectedBatch> {
        self.check_fresh().await?;
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| StatsError::fetch(format!("{}: {}", self.path.display(), e)))?;
        let export = controller::parse_export(&raw)?;
        Ok(export.into_batch(timestamp))
    }
}
