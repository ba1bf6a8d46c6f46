//! One-time winner validation of a project's participation in an event.

use chrono::{DateTime, Utc};
use sprint_rules::progress::effective_target;
use sprint_rules::window::normalize_source;
use sprint_rules::ValidationRecord;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::db::enrollments;
use crate::errors::{EngineError, Result};
use crate::guard::{ensure_owner, found, non_negative, not_cancelled};

#[derive(Debug, Clone)]
pub struct ValidateCommand {
    pub current_user_id: i64,
    pub event_id: i64,
    pub project_id: i64,
    pub submitted_words: i64,
    /// Free-form; normalized before it is stored.
    pub source: Option<String>,
}

/// Certify `submitted_words` against the enrollment's effective target.
///
/// The write is conditioned on the enrollment not being validated yet. A
/// second attempt, sequential or concurrent, gets
/// [`EngineError::AlreadyValidated`] and leaves the first result in place.
/// The winner badge is written in the same transaction as the validation.
pub async fn validate(
    pool: &SqlitePool,
    cmd: &ValidateCommand,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> Result<()> {
    let event = found("event", cmd.event_id, enrollments::get_event(pool, cmd.event_id).await?)?;
    let project = found(
        "project",
        cmd.project_id,
        enrollments::get_project(pool, cmd.project_id).await?,
    )?;
    ensure_owner(&project, cmd.current_user_id)?;

    let enrollment = enrollments::get_enrollment(pool, project.id, event.id)
        .await?
        .ok_or_else(|| {
            EngineError::rule(format!(
                "project {} is not enrolled in event {}",
                project.id, event.id
            ))
        })?;

    if enrollment.is_validated() {
        return Err(EngineError::AlreadyValidated {
            enrollment_id: enrollment.id,
        });
    }

    non_negative("submitted word count", cmd.submitted_words)?;
    let target = effective_target(enrollment.target_words, event.default_target_words);
    if cmd.submitted_words < target {
        return Err(EngineError::rule(format!(
            "validation rejected: {} words is below the target of {target}",
            cmd.submitted_words
        )));
    }

    let record = ValidationRecord {
        validated_at: now,
        validated_words: cmd.submitted_words,
        source: normalize_source(cmd.source.as_deref()),
        won: true,
    };

    not_cancelled(cancel)?;
    if !enrollments::mark_validated(pool, &enrollment, &record).await? {
        warn!(
            "Enrollment {} was validated concurrently; keeping the first result",
            enrollment.id
        );
        return Err(EngineError::AlreadyValidated {
            enrollment_id: enrollment.id,
        });
    }

    info!(
        "Validated project {} in event {} with {} words (target {target}, source {})",
        project.id, event.id, record.validated_words, record.source
    );

    Ok(())
}
