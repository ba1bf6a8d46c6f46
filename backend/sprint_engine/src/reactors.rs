//! Handlers run for every progress-changed signal.
//!
//! Reactors are idempotent, so a signal delivered twice is harmless. The
//! list is fixed; each reactor runs in order and a failure in one is logged
//! without stopping the rest.

use chrono::{DateTime, Utc};
use sprint_rules::badges::{self, BadgeContext};
use sprint_rules::{milestones, ProgressChanged};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::db::{enrollments, progress, rewards};
use crate::errors::Result;
use crate::guard::{ensure_owner, found, non_negative, not_cancelled, positive_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reactor {
    BadgeAssignment,
    MilestoneCompletion,
}

/// Dispatch order.
pub const REACTORS: [Reactor; 2] = [Reactor::BadgeAssignment, Reactor::MilestoneCompletion];

impl Reactor {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BadgeAssignment => "badge_assignment",
            Self::MilestoneCompletion => "milestone_completion",
        }
    }

    /// Returns how many rows the reactor wrote.
    pub async fn handle(
        &self,
        pool: &SqlitePool,
        signal: &ProgressChanged,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        match self {
            Self::BadgeAssignment => assign_badges(pool, signal, now).await,
            Self::MilestoneCompletion => complete_milestones(pool, signal, now).await,
        }
    }
}

/// Award every badge the project's history now earns.
///
/// A project that is gone or not owned by the signalling user is skipped.
pub async fn assign_badges(
    pool: &SqlitePool,
    signal: &ProgressChanged,
    now: DateTime<Utc>,
) -> Result<usize> {
    let Some(project) = enrollments::get_project(pool, signal.project_id).await? else {
        debug!("Skipping badges: project {} not found", signal.project_id);
        return Ok(0);
    };
    if ensure_owner(&project, signal.user_id).is_err() {
        debug!(
            "Skipping badges: project {} is not owned by user {}",
            project.id, signal.user_id
        );
        return Ok(0);
    }

    let entries = progress::entries_for_project(pool, project.id).await?;
    let held = rewards::project_badge_names(pool, project.id).await?;

    let ctx = BadgeContext {
        entries: &entries,
        new_total: signal.new_total,
        goal_amount: project.goal_amount,
        goal_unit: signal.goal_unit,
        today: now.date_naive(),
    };
    let earned = badges::evaluate(&ctx, &held);

    let awarded = rewards::insert_badges(pool, project.id, None, &earned, now).await?;
    if awarded > 0 {
        info!("Awarded {awarded} badge(s) to project {}", project.id);
    }
    Ok(awarded)
}

/// Complete each milestone the new total has reached.
pub async fn complete_milestones(
    pool: &SqlitePool,
    signal: &ProgressChanged,
    now: DateTime<Utc>,
) -> Result<usize> {
    let open = rewards::incomplete_milestones(pool, signal.project_id).await?;

    let mut completed = 0;
    for milestone in milestones::reached(&open, signal.new_total) {
        if rewards::complete_milestone(pool, milestone.id, now).await? {
            info!(
                "Project {} reached milestone {:?} ({})",
                signal.project_id, milestone.name, milestone.target_amount
            );
            completed += 1;
        }
    }
    Ok(completed)
}

/// Outcome of one dispatch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub writes: Vec<(&'static str, usize)>,
    pub failed: Vec<&'static str>,
}

pub async fn dispatch(pool: &SqlitePool, signal: &ProgressChanged, now: DateTime<Utc>) -> DispatchReport {
    let mut report = DispatchReport::default();
    for reactor in REACTORS {
        match reactor.handle(pool, signal, now).await {
            Ok(writes) => report.writes.push((reactor.name(), writes)),
            Err(e) => {
                error!(
                    "Reactor {} failed for project {}: {e}",
                    reactor.name(),
                    signal.project_id
                );
                report.failed.push(reactor.name());
            }
        }
    }
    report
}

/// Append a progress entry and build the signal to publish for it.
pub async fn record_progress(
    pool: &SqlitePool,
    user_id: i64,
    project_id: i64,
    amount: i64,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> Result<ProgressChanged> {
    positive_id("ProjectId", project_id)?;
    non_negative("progress amount", amount)?;
    let project = found("project", project_id, enrollments::get_project(pool, project_id).await?)?;
    ensure_owner(&project, user_id)?;

    not_cancelled(cancel)?;
    progress::insert_entry(pool, project.id, amount, now).await?;
    let new_total = progress::total_for_project(pool, project.id).await?;
    debug!("Project {} progress now {new_total} {}", project.id, project.goal_unit.as_str());

    Ok(ProgressChanged {
        project_id: project.id,
        user_id,
        new_total,
        goal_unit: project.goal_unit,
    })
}
