//! Shared handle the binary (or an outer adapter) holds: the pool, the
//! loaded configuration and the publishing side of the progress bus.

use chrono::{DateTime, Utc};
use sprint_rules::ProgressChanged;
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::bus::{self, ProgressBus};
use crate::config::Config;
use crate::enrollment::{self, EnrollmentStatus};
use crate::errors::Result;
use crate::reactors;

#[derive(Debug, Clone)]
pub struct Engine {
    pub pool: SqlitePool,
    pub config: Config,
    bus: ProgressBus,
}

impl Engine {
    /// The receiver is handed to [`bus::run_worker`].
    pub fn new(pool: SqlitePool, config: Config) -> (Self, mpsc::Receiver<ProgressChanged>) {
        let (bus, rx) = bus::channel(config.progress_queue_capacity);
        (Engine { pool, config, bus }, rx)
    }

    /// Record progress and queue the signal for the reactors. The entry is
    /// kept even if the worker has stopped.
    pub async fn record_progress(
        &self,
        user_id: i64,
        project_id: i64,
        amount: i64,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<ProgressChanged> {
        let signal =
            reactors::record_progress(&self.pool, user_id, project_id, amount, now, cancel).await?;
        self.bus.publish(signal.clone()).await;
        Ok(signal)
    }

    /// Status view with the configured validation sources.
    pub async fn enrollment_status(
        &self,
        user_id: i64,
        event_id: i64,
        project_id: i64,
        now: DateTime<Utc>,
    ) -> Result<EnrollmentStatus> {
        enrollment::enrollment_status(
            &self.pool,
            user_id,
            event_id,
            project_id,
            &self.config.allowed_sources,
            now,
        )
        .await
    }
}
