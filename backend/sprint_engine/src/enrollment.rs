//! Joining and leaving events, and the status view a writer sees for one
//! enrollment.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sprint_rules::eligibility::{evaluate_certificate, evaluate_goodies, Eligibility};
use sprint_rules::progress::{calculate, effective_target, resolve_window_end_exclusive, ProgressSummary};
use sprint_rules::window::{resolve_validation_window, ValidationWindow};
use sprint_rules::{Enrollment, Event, Project, ValidationSource};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::db::{enrollments, progress};
use crate::errors::{EngineError, Result};
use crate::guard::{ensure_owner, found, non_negative, not_cancelled, positive_id};

/// Event and project loaded for a command issued by `user_id`.
async fn owned_context(
    pool: &SqlitePool,
    user_id: i64,
    event_id: i64,
    project_id: i64,
) -> Result<(Event, Project)> {
    positive_id("UserId", user_id)?;
    positive_id("ProjectId", project_id)?;
    positive_id("EventId", event_id)?;

    let event = found("event", event_id, enrollments::get_event(pool, event_id).await?)?;
    let project = found("project", project_id, enrollments::get_project(pool, project_id).await?)?;
    ensure_owner(&project, user_id)?;
    Ok((event, project))
}

async fn existing_enrollment(pool: &SqlitePool, project_id: i64, event_id: i64) -> Result<Enrollment> {
    enrollments::get_enrollment(pool, project_id, event_id)
        .await?
        .ok_or_else(|| {
            EngineError::rule(format!("project {project_id} is not enrolled in event {event_id}"))
        })
}

/// Enroll a project, or update the target of an existing enrollment. A
/// missing target keeps the stored one. Validated enrollments are frozen.
pub async fn join_event(
    pool: &SqlitePool,
    user_id: i64,
    event_id: i64,
    project_id: i64,
    target_words: Option<i64>,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> Result<Enrollment> {
    let (event, project) = owned_context(pool, user_id, event_id, project_id).await?;
    if let Some(target) = target_words {
        non_negative("target word count", target)?;
    }
    if !event.is_active {
        return Err(EngineError::rule(format!("event {} is not open for enrollment", event.slug)));
    }

    if let Some(existing) = enrollments::get_enrollment(pool, project.id, event.id).await? {
        if existing.is_validated() {
            return Err(validated_is_permanent(&existing));
        }
    }

    not_cancelled(cancel)?;
    let enrollment =
        match enrollments::upsert_enrollment(pool, project.id, event.id, target_words, now).await? {
            Some(enrollment) => enrollment,
            None => {
                // Validated between the read and the write.
                return Err(EngineError::rule(format!(
                    "enrollment of project {} in event {} is validated and can no longer change",
                    project.id, event.slug
                )));
            }
        };
    info!("Project {} enrolled in event {}", project.id, event.slug);
    Ok(enrollment)
}

/// Record the word count a writer reports at the end of the event.
pub async fn record_final_count(
    pool: &SqlitePool,
    user_id: i64,
    event_id: i64,
    project_id: i64,
    words: i64,
    cancel: &CancellationToken,
) -> Result<()> {
    let (event, project) = owned_context(pool, user_id, event_id, project_id).await?;
    non_negative("final word count", words)?;
    let enrollment = existing_enrollment(pool, project.id, event.id).await?;

    not_cancelled(cancel)?;
    enrollments::set_final_word_count(pool, enrollment.id, words).await
}

/// Withdraw a project. Validated participation is a permanent record and
/// cannot be withdrawn.
pub async fn leave_event(
    pool: &SqlitePool,
    user_id: i64,
    event_id: i64,
    project_id: i64,
    cancel: &CancellationToken,
) -> Result<()> {
    let (event, project) = owned_context(pool, user_id, event_id, project_id).await?;
    let enrollment = existing_enrollment(pool, project.id, event.id).await?;
    if enrollment.is_validated() {
        return Err(validated_is_permanent(&enrollment));
    }

    not_cancelled(cancel)?;
    if !enrollments::delete_unvalidated_enrollment(pool, enrollment.id).await? {
        // Validated between the read and the delete.
        return Err(validated_is_permanent(&enrollment));
    }
    info!("Project {} left event {}", project.id, event.slug);
    Ok(())
}

fn validated_is_permanent(enrollment: &Enrollment) -> EngineError {
    EngineError::rule(format!(
        "enrollment {} is validated and can no longer change",
        enrollment.id
    ))
}

/// Everything a writer needs to know about one enrollment.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentStatus {
    pub enrollment: Enrollment,
    pub progress: ProgressSummary,
    pub window: ValidationWindow,
    pub validation_open: bool,
    pub goodies: Eligibility,
    pub certificate: Eligibility,
    pub allowed_sources: Vec<ValidationSource>,
}

/// Derive the status view from current rows.
///
/// The scored total is the validated count once there is one, then the
/// reported final count, then the project's cumulative progress.
pub async fn enrollment_status(
    pool: &SqlitePool,
    user_id: i64,
    event_id: i64,
    project_id: i64,
    allowed_sources: &[ValidationSource],
    now: DateTime<Utc>,
) -> Result<EnrollmentStatus> {
    let (event, project) = owned_context(pool, user_id, event_id, project_id).await?;
    let enrollment = existing_enrollment(pool, project.id, event.id).await?;

    let window = resolve_validation_window(
        event.starts_at,
        event.ends_at,
        event.validation_starts_at,
        event.validation_ends_at,
    )?;

    let total = match (&enrollment.validation, enrollment.final_word_count) {
        (Some(v), _) => v.validated_words,
        (None, Some(words)) => words,
        (None, None) => progress::total_for_project(pool, project.id).await?,
    };
    let target = effective_target(enrollment.target_words, event.default_target_words);
    let summary = calculate(Some(target), Some(total));

    let goodies = evaluate_goodies(
        now,
        resolve_window_end_exclusive(event.ends_at),
        target,
        summary.total,
        enrollment.is_validated(),
        enrollment.won(),
    );
    let certificate = evaluate_certificate(enrollment.is_validated(), enrollment.won());

    Ok(EnrollmentStatus {
        validation_open: window.is_open(now),
        enrollment,
        progress: summary,
        window,
        goodies,
        certificate,
        allowed_sources: allowed_sources.to_vec(),
    })
}
