//! Events, projects, and project-event enrollments.

use chrono::{DateTime, Utc};
use sprint_rules::badges::EVENT_WINNER;
use sprint_rules::{Enrollment, Event, EventKind, GoalUnit, Project, ValidationRecord};
use sqlx::SqlitePool;

use super::{decode_error, from_ts, rewards, to_ts};
use crate::errors::Result;

// ─────────────────────────────────────────────────────────
// Row shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, sqlx::FromRow)]
struct EventRow {
    id: i64,
    name: String,
    slug: String,
    kind: String,
    starts_at: i64,
    ends_at: i64,
    default_target_words: Option<i64>,
    is_active: bool,
    validation_starts_at: Option<i64>,
    validation_ends_at: Option<i64>,
}

impl TryFrom<EventRow> for Event {
    type Error = sqlx::Error;

    fn try_from(row: EventRow) -> std::result::Result<Self, Self::Error> {
        let kind = EventKind::parse(&row.kind).ok_or_else(|| decode_error("events.kind", &row.kind))?;
        Ok(Event {
            id: row.id,
            name: row.name,
            slug: row.slug,
            kind,
            starts_at: from_ts(row.starts_at),
            ends_at: from_ts(row.ends_at),
            default_target_words: row.default_target_words,
            is_active: row.is_active,
            validation_starts_at: row.validation_starts_at.map(from_ts),
            validation_ends_at: row.validation_ends_at.map(from_ts),
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ProjectRow {
    id: i64,
    user_id: i64,
    title: String,
    goal_amount: Option<i64>,
    goal_unit: String,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            goal_amount: row.goal_amount,
            goal_unit: GoalUnit::parse(&row.goal_unit),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct EnrollmentRow {
    id: i64,
    project_id: i64,
    event_id: i64,
    target_words: Option<i64>,
    final_word_count: Option<i64>,
    joined_at: i64,
    validated_at: Option<i64>,
    won: bool,
    validated_words: Option<i64>,
    validation_source: Option<String>,
}

impl From<EnrollmentRow> for Enrollment {
    fn from(row: EnrollmentRow) -> Self {
        // The conditional write sets all three columns at once.
        let validation = match (row.validated_at, row.validated_words, row.validation_source) {
            (Some(at), Some(words), Some(source)) => Some(ValidationRecord {
                validated_at: from_ts(at),
                validated_words: words,
                source,
                won: row.won,
            }),
            _ => None,
        };
        Enrollment {
            id: row.id,
            project_id: row.project_id,
            event_id: row.event_id,
            target_words: row.target_words,
            final_word_count: row.final_word_count,
            joined_at: from_ts(row.joined_at),
            validation,
        }
    }
}

const ENROLLMENT_COLUMNS: &str = "id, project_id, event_id, target_words, final_word_count, \
     joined_at, validated_at, won, validated_words, validation_source";

// ─────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────

/// Fields of an event as an administrator creates it.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub name: String,
    pub slug: String,
    pub kind: EventKind,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub default_target_words: Option<i64>,
    pub is_active: bool,
    pub validation_starts_at: Option<DateTime<Utc>>,
    pub validation_ends_at: Option<DateTime<Utc>>,
}

pub async fn insert_event(pool: &SqlitePool, event: &NewEvent) -> Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO events
            (name, slug, kind, starts_at, ends_at, default_target_words, is_active,
             validation_starts_at, validation_ends_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&event.name)
    .bind(&event.slug)
    .bind(event.kind.as_str())
    .bind(to_ts(event.starts_at))
    .bind(to_ts(event.ends_at))
    .bind(event.default_target_words)
    .bind(event.is_active)
    .bind(event.validation_starts_at.map(to_ts))
    .bind(event.validation_ends_at.map(to_ts))
    .execute(pool)
    .await?
    .last_insert_rowid();
    Ok(id)
}

pub async fn get_event(pool: &SqlitePool, id: i64) -> Result<Option<Event>> {
    let row = sqlx::query_as::<_, EventRow>(
        r#"
        SELECT id, name, slug, kind, starts_at, ends_at, default_target_words, is_active,
               validation_starts_at, validation_ends_at
        FROM   events
        WHERE  id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Event::try_from).transpose()?)
}

// ─────────────────────────────────────────────────────────
// Projects (read-mostly; written by the profile/project layer)
// ─────────────────────────────────────────────────────────

pub async fn insert_project(
    pool: &SqlitePool,
    user_id: i64,
    title: &str,
    goal_amount: Option<i64>,
    goal_unit: GoalUnit,
) -> Result<i64> {
    let id = sqlx::query(
        "INSERT INTO projects (user_id, title, goal_amount, goal_unit) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(user_id)
    .bind(title)
    .bind(goal_amount)
    .bind(goal_unit.as_str())
    .execute(pool)
    .await?
    .last_insert_rowid();
    Ok(id)
}

pub async fn get_project(pool: &SqlitePool, id: i64) -> Result<Option<Project>> {
    let row = sqlx::query_as::<_, ProjectRow>(
        "SELECT id, user_id, title, goal_amount, goal_unit FROM projects WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Project::from))
}

// ─────────────────────────────────────────────────────────
// Enrollments
// ─────────────────────────────────────────────────────────

pub async fn get_enrollment(
    pool: &SqlitePool,
    project_id: i64,
    event_id: i64,
) -> Result<Option<Enrollment>> {
    let row = sqlx::query_as::<_, EnrollmentRow>(&format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM project_events WHERE project_id = ?1 AND event_id = ?2"
    ))
    .bind(project_id)
    .bind(event_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Enrollment::from))
}

/// Create the enrollment, or update the target of an existing one. A missing
/// target keeps the stored one. Returns `None` when the existing enrollment
/// is validated, which is left exactly as it was.
pub async fn upsert_enrollment(
    pool: &SqlitePool,
    project_id: i64,
    event_id: i64,
    target_words: Option<i64>,
    joined_at: DateTime<Utc>,
) -> Result<Option<Enrollment>> {
    let row = sqlx::query_as::<_, EnrollmentRow>(&format!(
        r#"
        INSERT INTO project_events (project_id, event_id, target_words, joined_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (project_id, event_id) DO UPDATE
            SET   target_words = COALESCE(excluded.target_words, project_events.target_words)
            WHERE project_events.validated_at IS NULL
        RETURNING {ENROLLMENT_COLUMNS}
        "#
    ))
    .bind(project_id)
    .bind(event_id)
    .bind(target_words)
    .bind(to_ts(joined_at))
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Enrollment::from))
}

pub async fn set_final_word_count(pool: &SqlitePool, enrollment_id: i64, words: i64) -> Result<()> {
    sqlx::query("UPDATE project_events SET final_word_count = ?1 WHERE id = ?2")
        .bind(words)
        .bind(enrollment_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Remove an enrollment that was never validated. Returns `false` when the
/// row is validated (and therefore permanent) or already gone.
pub async fn delete_unvalidated_enrollment(pool: &SqlitePool, enrollment_id: i64) -> Result<bool> {
    let rows = sqlx::query("DELETE FROM project_events WHERE id = ?1 AND validated_at IS NULL")
        .bind(enrollment_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(rows == 1)
}

/// Set every validation field, only if none is set yet, and award the
/// event's winner badge in the same transaction. Returns `false`, with
/// nothing written, when another validation got there first.
pub async fn mark_validated(
    pool: &SqlitePool,
    enrollment: &Enrollment,
    record: &ValidationRecord,
) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let rows = sqlx::query(
        r#"
        UPDATE project_events
        SET    won = ?1, validated_at = ?2, validated_words = ?3, validation_source = ?4
        WHERE  id = ?5 AND validated_at IS NULL
        "#,
    )
    .bind(record.won)
    .bind(to_ts(record.validated_at))
    .bind(record.validated_words)
    .bind(&record.source)
    .bind(enrollment.id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if rows == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    if record.won {
        rewards::insert_badge(
            &mut tx,
            enrollment.project_id,
            Some(enrollment.event_id),
            &EVENT_WINNER,
            record.validated_at,
        )
        .await?;
    }

    tx.commit().await?;
    Ok(true)
}
