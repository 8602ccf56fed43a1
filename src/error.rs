// Error taxonomy for collection, storage and queries.
// "No data in range" is not an error: see WindowedRate::InsufficientData and BucketedSeries::is_empty.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StatsError>;

#[derive(Error, Debug)]
pub enum StatsError {
    /// Controller unreachable, timed out, or returned malformed data. The tick is skipped.
    #[error("fetch failed: {reason}")]
    Fetch { reason: String },

    /// One row could not be appended. Sibling rows are still attempted.
    #[error("write to {table} failed: {source}")]
    Write {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// Store missing, unreadable, or without the expected schema. Fatal at startup.
    #[error("store unavailable at {path}: {reason}")]
    StoreUnavailable { path: String, reason: String },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StatsError {
    pub fn fetch(reason: impl std::fmt::Display) -> Self {
        StatsError::Fetch {
            reason: reason.to_string(),
        }
    }

    pub fn store_unavailable(path: &str, reason: impl std::fmt::Display) -> Self {
        StatsError::StoreUnavailable {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}
