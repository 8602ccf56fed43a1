// Schema for the three sample tables: creation (writer) and verification (writer + readers).
// Column layout is the existing stats.db layout. Databases written by the earlier collector
// have no row-key indexes and may hold duplicate keys; `create_tables` keeps the first row of
// each duplicate group before building the unique index.

use sqlx::SqlitePool;
use tracing::warn;

use crate::error::{Result, StatsError};
use crate::models::SampleKind;

pub(super) const CLIENT_COLUMNS: &[&str] = &[
    "timestamp",
    "mac",
    "hostname",
    "ip",
    "tx_bytes",
    "rx_bytes",
    "wired_tx_bytes",
    "wired_rx_bytes",
    "tx_rate",
    "rx_rate",
    "is_wired",
];

pub(super) const WAN_COLUMNS: &[&str] = &[
    "timestamp",
    "wan_ip",
    "tx_bytes",
    "rx_bytes",
    "tx_rate",
    "rx_rate",
    "latency",
    "clients",
];

pub(super) const DEVICE_COLUMNS: &[&str] = &[
    "timestamp",
    "device_name",
    "device_mac",
    "device_type",
    "state",
    "cpu_usage",
    "mem_usage",
    "uptime",
    "temperature",
];

pub(super) fn columns(kind: SampleKind) -> &'static [&'static str] {
    match kind {
        SampleKind::ClientBandwidth => CLIENT_COLUMNS,
        SampleKind::WanStats => WAN_COLUMNS,
        SampleKind::DeviceHealth => DEVICE_COLUMNS,
    }
}

/// Row-key indexes: (index name, table, key columns).
const ROW_KEYS: &[(&str, &str, &str)] = &[
    ("ux_client_mac_timestamp", "client_bandwidth", "mac, timestamp"),
    ("ux_wan_timestamp", "wan_stats", "timestamp"),
    ("ux_device_mac_timestamp", "device_health", "device_mac, timestamp"),
];

/// Creates tables and indexes if not present. Safe to run on every start.
/// Any DDL failure leaves the writer without a usable store.
pub(super) async fn create_tables(pool: &SqlitePool, path: &str) -> Result<()> {
    create_all(pool)
        .await
        .map_err(|e| StatsError::store_unavailable(path, e))
}

async fn create_all(pool: &SqlitePool) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS client_bandwidth (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            mac TEXT NOT NULL,
            hostname TEXT,
            ip TEXT,
            tx_bytes INTEGER DEFAULT 0,
            rx_bytes INTEGER DEFAULT 0,
            wired_tx_bytes INTEGER DEFAULT 0,
            wired_rx_bytes INTEGER DEFAULT 0,
            tx_rate REAL DEFAULT 0,
            rx_rate REAL DEFAULT 0,
            is_wired INTEGER DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wan_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            wan_ip TEXT,
            tx_bytes INTEGER DEFAULT 0,
            rx_bytes INTEGER DEFAULT 0,
            tx_rate REAL DEFAULT 0,
            rx_rate REAL DEFAULT 0,
            latency INTEGER DEFAULT 0,
            clients INTEGER DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS device_health (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            device_name TEXT NOT NULL,
            device_mac TEXT NOT NULL,
            device_type TEXT,
            state INTEGER,
            cpu_usage REAL,
            mem_usage REAL,
            uptime INTEGER,
            temperature REAL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Timestamp indexes serve the sweeper and cross-identity queries.
    for ddl in [
        "CREATE INDEX IF NOT EXISTS idx_client_timestamp ON client_bandwidth(timestamp)",
        "CREATE INDEX IF NOT EXISTS idx_device_timestamp ON device_health(timestamp)",
    ] {
        sqlx::query(ddl).execute(pool).await?;
    }

    for &(index, table, key) in ROW_KEYS {
        create_row_key(pool, index, table, key).await?;
    }

    Ok(())
}

/// Builds one unique (identity, timestamp) index. When the index is new, duplicate keys
/// already in the table are collapsed to their lowest id in the same transaction.
async fn create_row_key(
    pool: &SqlitePool,
    index: &str,
    table: &str,
    key: &str,
) -> sqlx::Result<()> {
    let exists: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'index' AND name = $1")
            .bind(index)
            .fetch_optional(pool)
            .await?;
    if exists.is_some() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    let removed = sqlx::query(&format!(
        "DELETE FROM {table} WHERE id NOT IN (SELECT MIN(id) FROM {table} GROUP BY {key})"
    ))
    .execute(&mut *tx)
    .await?
    .rows_affected();
    sqlx::query(&format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {index} ON {table}({key})"
    ))
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    if removed > 0 {
        warn!(table, index, removed, "collapsed duplicate row keys");
    }
    Ok(())
}

/// Checks every table has every required column. Never creates or repairs anything.
pub(super) async fn verify(pool: &SqlitePool, path: &str) -> Result<()> {
    for kind in SampleKind::ALL {
        let present: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info($1)")
                .bind(kind.table())
                .fetch_all(pool)
                .await
                .map_err(|e| StatsError::store_unavailable(path, e))?;
        if present.is_empty() {
            return Err(StatsError::store_unavailable(
                path,
                format!("table {} is missing", kind.table()),
            ));
        }
        let missing: Vec<&str> = columns(kind)
            .iter()
            .copied()
            .filter(|c| !present.iter().any(|p| p == c))
            .collect();
        if !missing.is_empty() {
            return Err(StatsError::store_unavailable(
                path,
                format!(
                    "table {} is missing columns: {}",
                    kind.table(),
                    missing.join(", ")
                ),
            ));
        }
    }
    Ok(())
}
