//! In-process delivery of progress-changed signals to the reactors.

use chrono::Utc;
use sprint_rules::ProgressChanged;
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::reactors;

/// Publishing half. Cheap to clone; the worker stops once every clone is
/// dropped and the queue is drained.
#[derive(Debug, Clone)]
pub struct ProgressBus {
    tx: mpsc::Sender<ProgressChanged>,
}

pub fn channel(capacity: usize) -> (ProgressBus, mpsc::Receiver<ProgressChanged>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ProgressBus { tx }, rx)
}

impl ProgressBus {
    /// Waits while the queue is full. Returns `false` if the worker is gone.
    pub async fn publish(&self, signal: ProgressChanged) -> bool {
        let project_id = signal.project_id;
        match self.tx.send(signal).await {
            Ok(()) => true,
            Err(_) => {
                warn!("Progress worker stopped; dropping signal for project {project_id}");
                false
            }
        }
    }
}

/// Run every reactor for each signal until the bus closes. On cancellation
/// the queue stops accepting signals and the ones already queued are still
/// dispatched before the worker returns.
pub async fn run_worker(
    pool: SqlitePool,
    mut rx: mpsc::Receiver<ProgressChanged>,
    cancel: CancellationToken,
) {
    info!("Progress worker starting");

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => {
                rx.close();
                break;
            }
            next = rx.recv() => next,
        };
        match next {
            Some(signal) => dispatch(&pool, &signal).await,
            None => break,
        }
    }

    let mut drained = 0usize;
    while let Some(signal) = rx.recv().await {
        dispatch(&pool, &signal).await;
        drained += 1;
    }
    if drained > 0 {
        info!("Progress worker drained {drained} queued signals");
    }

    info!("Progress worker stopped");
}

async fn dispatch(pool: &SqlitePool, signal: &ProgressChanged) {
    let report = reactors::dispatch(pool, signal, Utc::now()).await;
    debug!(
        "Dispatched progress for project {}: {:?}",
        signal.project_id, report
    );
}

#[cfg(test)]
mod tests {
    use sprint_rules::GoalUnit;

    use super::*;
    use crate::db::enrollments::insert_project;
    use crate::db::{progress, rewards, test_pool};

    #[tokio::test]
    async fn worker_drains_queue_then_stops_when_bus_closes() {
        let pool = test_pool().await;
        let project = insert_project(&pool, 3, "Novel", None, GoalUnit::Words).await.unwrap();
        progress::insert_entry(&pool, project, 20, Utc::now()).await.unwrap();

        let (bus, rx) = channel(4);
        let worker = tokio::spawn(run_worker(pool.clone(), rx, CancellationToken::new()));

        let signal = ProgressChanged {
            project_id: project,
            user_id: 3,
            new_total: 20,
            goal_unit: GoalUnit::Words,
        };
        assert!(bus.publish(signal.clone()).await);
        assert!(bus.publish(signal).await);
        drop(bus);
        worker.await.unwrap();

        let held = rewards::badges_for_project(&pool, project).await.unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].name, "first_step");
    }

    #[tokio::test]
    async fn cancelled_worker_stops_and_publish_reports_it() {
        let pool = test_pool().await;
        let (bus, rx) = channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        run_worker(pool, rx, cancel).await;

        let signal = ProgressChanged {
            project_id: 1,
            user_id: 1,
            new_total: 0,
            goal_unit: GoalUnit::Words,
        };
        assert!(!bus.publish(signal).await);
    }

    #[tokio::test]
    async fn cancelled_worker_still_dispatches_queued_signals() {
        let pool = test_pool().await;
        let project = insert_project(&pool, 3, "Novel", None, GoalUnit::Words).await.unwrap();
        progress::insert_entry(&pool, project, 20, Utc::now()).await.unwrap();

        let (bus, rx) = channel(4);
        let signal = ProgressChanged {
            project_id: project,
            user_id: 3,
            new_total: 20,
            goal_unit: GoalUnit::Words,
        };
        assert!(bus.publish(signal.clone()).await);

        let cancel = CancellationToken::new();
        cancel.cancel();
        run_worker(pool.clone(), rx, cancel).await;

        let held = rewards::badges_for_project(&pool, project).await.unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].name, "first_step");
        assert!(!bus.publish(signal).await);
    }
}
