// SQLite time-series store shared by one writer process (sampler + sweeper) and any number
// of reader processes (query facade). WAL journal: readers never wait on the writer beyond
// SQLite's own lock windows, and every row insert is a single atomic statement.

mod record;
mod schema;

pub use record::SampleRecord;

use crate::error::{Result, StatsError};
use crate::models::{CollectedBatch, IdentityFilter, Sample, SampleKind};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{instrument, warn};

/// Connection tuning shared by writer and readers.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Upper bound on waiting for a lock held by another connection (e.g. a sweep).
    pub busy_timeout: Duration,
    pub max_connections: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            max_connections: 4,
        }
    }
}

/// Outcome of appending one tick's rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendReport {
    pub appended: usize,
    pub failed: usize,
}

pub struct Store {
    pool: SqlitePool,
    path: String,
}

impl Store {
    /// Opens (creating if needed) the store for the writer process. Call `init` next.
    pub async fn connect(path: &str, options: &StoreOptions) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| StatsError::store_unavailable(path, e))?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))
            .map_err(|e| StatsError::store_unavailable(path, e))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(options.busy_timeout)
            // FULL: a row is on disk before append returns.
            .synchronous(SqliteSynchronous::Full);
        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.busy_timeout)
            .connect_with(opts)
            .await
            .map_err(|e| StatsError::store_unavailable(path, e))?;
        Ok(Self {
            pool,
            path: path.to_string(),
        })
    }

    /// Opens an existing store read-only for a reader process.
    /// Fails with `StoreUnavailable` if the file or schema is missing; never creates or repairs.
    pub async fn open_existing(path: &str, options: &StoreOptions) -> Result<Self> {
        if !Path::new(path).is_file() {
            return Err(StatsError::store_unavailable(path, "file not found"));
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))
            .map_err(|e| StatsError::store_unavailable(path, e))?
            .create_if_missing(false)
            .read_only(true)
            .busy_timeout(options.busy_timeout);
        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.busy_timeout)
            .connect_with(opts)
            .await
            .map_err(|e| StatsError::store_unavailable(path, e))?;
        let store = Self {
            pool,
            path: path.to_string(),
        };
        store.verify_schema().await?;
        Ok(store)
    }

    pub async fn init(&self) -> Result<()> {
        schema::create_tables(&self.pool, &self.path).await?;
        self.verify_schema().await
    }

    pub async fn verify_schema(&self) -> Result<()> {
        schema::verify(&self.pool, &self.path).await
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Inserts one row. Durable on return.
    #[instrument(skip(self, sample), fields(repo = "store", operation = "append", table = S::KIND.table()))]
    pub async fn append<S: SampleRecord>(&self, sample: &S) -> Result<()> {
        sample
            .insert_query()
            .execute(&self.pool)
            .await
            .map_err(|source| StatsError::Write {
                table: S::KIND.table(),
                source,
            })?;
        Ok(())
    }

    pub async fn append_sample(&self, sample: &Sample) -> Result<()> {
        match sample {
            Sample::ClientBandwidth(s) => self.append(s).await,
            Sample::WanStats(s) => self.append(s).await,
            Sample::DeviceHealth(s) => self.append(s).await,
        }
    }

    /// Appends every row of a tick individually; one failure does not stop the rest.
    #[instrument(skip(self, batch), fields(repo = "store", operation = "append_batch", rows = batch.len()))]
    pub async fn append_batch(&self, batch: &CollectedBatch) -> AppendReport {
        let mut report = AppendReport::default();
        for client in &batch.clients {
            record_append(self.append(client).await, client.mac.as_str(), &mut report);
        }
        if let Some(wan) = &batch.wan {
            record_append(self.append(wan).await, "wan", &mut report);
        }
        for device in &batch.devices {
            record_append(
                self.append(device).await,
                device.device_mac.as_str(),
                &mut report,
            );
        }
        report
    }

    /// Rows of kind `S` with `from <= timestamp < to`, ascending by timestamp.
    #[instrument(skip(self), fields(repo = "store", operation = "range_query", table = S::KIND.table()))]
    pub async fn range_query<S: SampleRecord>(
        &self,
        filter: &IdentityFilter,
        from: i64,
        to: i64,
    ) -> Result<Vec<S>> {
        let cols = schema::columns(S::KIND).join(", ");
        let rows = match identity_column::<S>(filter)? {
            Some((col, identity)) => {
                let sql = format!(
                    "SELECT {cols} FROM {} WHERE {col} = $1 AND timestamp >= $2 AND timestamp < $3 ORDER BY timestamp ASC, id ASC",
                    S::KIND.table()
                );
                sqlx::query(&sql)
                    .bind(identity)
                    .bind(from)
                    .bind(to)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {cols} FROM {} WHERE timestamp >= $1 AND timestamp < $2 ORDER BY timestamp ASC, id ASC",
                    S::KIND.table()
                );
                sqlx::query(&sql)
                    .bind(from)
                    .bind(to)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(S::from_row(row)?);
        }
        Ok(out)
    }

    /// Most recent row for the filter, if any.
    #[instrument(skip(self), fields(repo = "store", operation = "latest", table = S::KIND.table()))]
    pub async fn latest<S: SampleRecord>(&self, filter: &IdentityFilter) -> Result<Option<S>> {
        let cols = schema::columns(S::KIND).join(", ");
        let row = match identity_column::<S>(filter)? {
            Some((col, identity)) => {
                let sql = format!(
                    "SELECT {cols} FROM {} WHERE {col} = $1 ORDER BY timestamp DESC, id DESC LIMIT 1",
                    S::KIND.table()
                );
                sqlx::query(&sql)
                    .bind(identity)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {cols} FROM {} ORDER BY timestamp DESC, id DESC LIMIT 1",
                    S::KIND.table()
                );
                sqlx::query(&sql).fetch_optional(&self.pool).await?
            }
        };
        row.as_ref().map(S::from_row).transpose().map_err(Into::into)
    }

    /// Distinct identities with at least one row in `[from, to)`, sorted.
    pub async fn identities(&self, kind: SampleKind, from: i64, to: i64) -> Result<Vec<String>> {
        let Some(col) = kind.identity_column() else {
            return Err(StatsError::InvalidQuery(format!(
                "{} has no identity column",
                kind.table()
            )));
        };
        let sql = format!(
            "SELECT DISTINCT {col} FROM {} WHERE timestamp >= $1 AND timestamp < $2 ORDER BY {col} ASC",
            kind.table()
        );
        let ids = sqlx::query_scalar::<_, String>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    /// Deletes rows of every kind with `timestamp < horizon` in one transaction.
    /// Readers see either all pre-sweep or all post-sweep rows. Returns rows removed.
    #[instrument(skip(self), fields(repo = "store", operation = "delete_older_than"))]
    pub async fn delete_older_than(&self, horizon: i64) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0u64;
        for kind in SampleKind::ALL {
            let sql = format!("DELETE FROM {} WHERE timestamp < $1", kind.table());
            let r = sqlx::query(&sql).bind(horizon).execute(&mut *tx).await?;
            removed += r.rows_affected();
        }
        tx.commit().await?;
        Ok(removed)
    }

    pub async fn row_count(&self, kind: SampleKind) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
        Ok(sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&self.pool)
            .await?)
    }

    /// Reclaim space after sweeps.
    #[instrument(skip(self), fields(repo = "store", operation = "vacuum"))]
    pub async fn vacuum(&self) -> Result<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn record_append(result: Result<()>, identity: &str, report: &mut AppendReport) {
    match result {
        Ok(()) => report.appended += 1,
        Err(e) => {
            warn!(error = %e, identity, operation = "append", "row append failed");
            report.failed += 1;
        }
    }
}

/// Resolves a filter to an optional `column = value` restriction for kind `S`.
fn identity_column<'f, S: SampleRecord>(
    filter: &'f IdentityFilter,
) -> Result<Option<(&'static str, &'f str)>> {
    match (S::KIND.identity_column(), filter) {
        (Some(col), IdentityFilter::Identity(id)) => Ok(Some((col, id.as_str()))),
        (Some(_), IdentityFilter::AllOfKind) => Ok(None),
        (None, IdentityFilter::AllOfKind | IdentityFilter::Singleton) => Ok(None),
        (Some(_), IdentityFilter::Singleton) => Err(StatsError::InvalidQuery(format!(
            "{} is keyed by identity, not a singleton",
            S::KIND.table()
        ))),
        (None, IdentityFilter::Identity(_)) => Err(StatsError::InvalidQuery(format!(
            "{} is a singleton and has no identities",
            S::KIND.table()
        ))),
    }
}
