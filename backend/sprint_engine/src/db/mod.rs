//! Database layer: pool setup, migrations and typed queries.
//!
//! Every state change the engine makes is a single conditional statement
//! (or one short transaction) whose `WHERE` clause repeats the guard the
//! caller already checked. A caller that loses a race sees zero rows
//! affected and reports it; nothing is overwritten.
//!
//! Instants are stored as unix seconds.

pub mod enrollments;
pub mod progress;
pub mod rewards;
pub mod word_wars;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::errors::Result;

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    // Make sure the file is created if it doesn't exist yet. WAL lets
    // readers proceed while another connection writes.
    let options = SqliteConnectOptions::from_str(&url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied successfully");
    Ok(())
}

pub(crate) fn to_ts(at: DateTime<Utc>) -> i64 {
    at.timestamp()
}

pub(crate) fn from_ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Reject a stored enum string the code does not know.
pub(crate) fn decode_error(column: &str, value: &str) -> sqlx::Error {
    sqlx::Error::Decode(format!("unexpected {column} value {value:?}").into())
}

/// A migrated in-memory database. One connection that never idles out, so
/// every query sees the same database.
#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    migrate(&pool).await.unwrap();
    pool
}

/// A migrated database file with several connections, for tests where
/// concurrent callers must really run on separate connections. Keep the
/// directory alive as long as the pool.
#[cfg(test)]
pub(crate) async fn file_pool() -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("sprint_engine.db");
    let pool = init_pool(&path.to_string_lossy(), 4).await.unwrap();
    (dir, pool)
}
