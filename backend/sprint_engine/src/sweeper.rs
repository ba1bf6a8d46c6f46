//! Background task that closes word wars whose time has run out.

use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::word_wars;

/// Sweep every `interval_secs` until cancelled.
pub async fn run(pool: SqlitePool, interval_secs: u64, cancel: CancellationToken) {
    info!("Word war sweeper starting, interval {interval_secs}s");

    loop {
        match word_wars::sweep_expired(&pool, Utc::now(), &cancel).await {
            Ok(0) => {}
            Ok(n) => info!("Sweeper closed {n} word war(s)"),
            Err(e) => error!("Sweeper error: {e}"),
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(interval_secs.max(1))) => {}
        }
    }

    info!("Word war sweeper stopped");
}
