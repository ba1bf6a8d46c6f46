//! Word wars and their participants.
//!
//! Status changes are compare-and-swap updates on `status`. Participant
//! writes embed the war's status check in the same statement, so a row can
//! never be added or scored after the war has moved past the state that
//! allows it.

use chrono::{DateTime, Utc};
use sprint_rules::word_war::{rank_participants, Participant, WordWar};
use sprint_rules::WarStatus;
use sqlx::SqlitePool;

use super::{decode_error, from_ts, to_ts};
use crate::errors::Result;

// ─────────────────────────────────────────────────────────
// Row shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, sqlx::FromRow)]
struct WarRow {
    id: i64,
    event_id: i64,
    creator_id: i64,
    status: String,
    duration_minutes: i64,
    starts_at: i64,
    ends_at: i64,
    finished_at: Option<i64>,
    created_at: i64,
}

impl TryFrom<WarRow> for WordWar {
    type Error = sqlx::Error;

    fn try_from(row: WarRow) -> std::result::Result<Self, Self::Error> {
        let status =
            WarStatus::parse(&row.status).ok_or_else(|| decode_error("word_wars.status", &row.status))?;
        Ok(WordWar {
            id: row.id,
            event_id: row.event_id,
            creator_id: row.creator_id,
            status,
            duration_minutes: row.duration_minutes,
            starts_at: from_ts(row.starts_at),
            ends_at: from_ts(row.ends_at),
            finished_at: row.finished_at.map(from_ts),
            created_at: from_ts(row.created_at),
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ParticipantRow {
    id: i64,
    war_id: i64,
    user_id: i64,
    project_id: i64,
    joined_at: i64,
    words_in_round: i64,
    last_checkpoint_at: Option<i64>,
    final_rank: Option<i64>,
}

impl From<ParticipantRow> for Participant {
    fn from(row: ParticipantRow) -> Self {
        Participant {
            id: row.id,
            war_id: row.war_id,
            user_id: row.user_id,
            project_id: row.project_id,
            joined_at: from_ts(row.joined_at),
            words_in_round: row.words_in_round,
            last_checkpoint_at: row.last_checkpoint_at.map(from_ts),
            final_rank: row.final_rank,
        }
    }
}

const WAR_COLUMNS: &str =
    "id, event_id, creator_id, status, duration_minutes, starts_at, ends_at, finished_at, created_at";

const PARTICIPANT_COLUMNS: &str =
    "id, war_id, user_id, project_id, joined_at, words_in_round, last_checkpoint_at, final_rank";

// ─────────────────────────────────────────────────────────
// Wars
// ─────────────────────────────────────────────────────────

pub async fn insert_war(
    pool: &SqlitePool,
    event_id: i64,
    creator_id: i64,
    duration_minutes: i64,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
) -> Result<WordWar> {
    let row = sqlx::query_as::<_, WarRow>(&format!(
        r#"
        INSERT INTO word_wars
            (event_id, creator_id, status, duration_minutes, starts_at, ends_at, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING {WAR_COLUMNS}
        "#
    ))
    .bind(event_id)
    .bind(creator_id)
    .bind(WarStatus::Scheduled.as_str())
    .bind(duration_minutes)
    .bind(to_ts(starts_at))
    .bind(to_ts(ends_at))
    .bind(to_ts(created_at))
    .fetch_one(pool)
    .await?;
    Ok(WordWar::try_from(row)?)
}

pub async fn get_war(pool: &SqlitePool, id: i64) -> Result<Option<WordWar>> {
    let row = sqlx::query_as::<_, WarRow>(&format!("SELECT {WAR_COLUMNS} FROM word_wars WHERE id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(WordWar::try_from).transpose()?)
}

/// `scheduled → running` with authoritative bounds. Exactly one concurrent
/// caller sees `true`.
pub async fn mark_running(
    pool: &SqlitePool,
    id: i64,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> Result<bool> {
    let rows = sqlx::query(
        "UPDATE word_wars SET status = ?1, starts_at = ?2, ends_at = ?3 WHERE id = ?4 AND status = ?5",
    )
    .bind(WarStatus::Running.as_str())
    .bind(to_ts(starts_at))
    .bind(to_ts(ends_at))
    .bind(id)
    .bind(WarStatus::Scheduled.as_str())
    .execute(pool)
    .await?
    .rows_affected();
    Ok(rows == 1)
}

/// `running → finished` and freeze every participant's rank, in one
/// transaction. Returns the `(participant_id, rank)` pairs, or `None` when
/// the war was not running.
pub async fn finish_and_rank(
    pool: &SqlitePool,
    id: i64,
    finished_at: DateTime<Utc>,
) -> Result<Option<Vec<(i64, i64)>>> {
    let mut tx = pool.begin().await?;

    let rows = sqlx::query("UPDATE word_wars SET status = ?1, finished_at = ?2 WHERE id = ?3 AND status = ?4")
        .bind(WarStatus::Finished.as_str())
        .bind(to_ts(finished_at))
        .bind(id)
        .bind(WarStatus::Running.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if rows == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    let participants: Vec<Participant> = sqlx::query_as::<_, ParticipantRow>(&format!(
        "SELECT {PARTICIPANT_COLUMNS} FROM word_war_participants WHERE war_id = ?1"
    ))
    .bind(id)
    .fetch_all(&mut *tx)
    .await?
    .into_iter()
    .map(Participant::from)
    .collect();

    let ranks = rank_participants(&participants);
    for &(participant_id, rank) in &ranks {
        sqlx::query("UPDATE word_war_participants SET final_rank = ?1 WHERE id = ?2")
            .bind(rank)
            .bind(participant_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(Some(ranks))
}

/// Ids of running wars whose end time has passed.
pub async fn expired_running_wars(pool: &SqlitePool, now: DateTime<Utc>) -> Result<Vec<i64>> {
    let rows: Vec<(i64,)> =
        sqlx::query_as("SELECT id FROM word_wars WHERE status = ?1 AND ends_at <= ?2 ORDER BY ends_at ASC, id ASC")
            .bind(WarStatus::Running.as_str())
            .bind(to_ts(now))
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

// ─────────────────────────────────────────────────────────
// Participants
// ─────────────────────────────────────────────────────────

/// Add a zero-progress participant while the war is scheduled or running.
/// An existing participant is left untouched. Returns `true` if a row was
/// inserted.
pub async fn insert_participant_if_open(
    pool: &SqlitePool,
    war_id: i64,
    user_id: i64,
    project_id: i64,
    joined_at: DateTime<Utc>,
) -> Result<bool> {
    let rows = sqlx::query(
        r#"
        INSERT OR IGNORE INTO word_war_participants (war_id, user_id, project_id, joined_at, words_in_round)
        SELECT ?1, ?2, ?3, ?4, 0
        WHERE  EXISTS (SELECT 1 FROM word_wars WHERE id = ?1 AND status IN (?5, ?6))
        "#,
    )
    .bind(war_id)
    .bind(user_id)
    .bind(project_id)
    .bind(to_ts(joined_at))
    .bind(WarStatus::Scheduled.as_str())
    .bind(WarStatus::Running.as_str())
    .execute(pool)
    .await?
    .rows_affected();
    Ok(rows == 1)
}

/// Remove a participant while the war is not finished. Returns `true` if a
/// row was deleted.
pub async fn delete_participant_if_open(pool: &SqlitePool, war_id: i64, user_id: i64) -> Result<bool> {
    let rows = sqlx::query(
        r#"
        DELETE FROM word_war_participants
        WHERE  war_id = ?1 AND user_id = ?2
          AND  EXISTS (SELECT 1 FROM word_wars WHERE id = ?1 AND status != ?3)
        "#,
    )
    .bind(war_id)
    .bind(user_id)
    .bind(WarStatus::Finished.as_str())
    .execute(pool)
    .await?
    .rows_affected();
    Ok(rows == 1)
}

/// Overwrite a participant's round count while the war is running. Last
/// write wins. Returns `false` if the participant is missing or the war is
/// not running.
pub async fn update_checkpoint_if_running(
    pool: &SqlitePool,
    war_id: i64,
    user_id: i64,
    words_in_round: i64,
    at: DateTime<Utc>,
) -> Result<bool> {
    let rows = sqlx::query(
        r#"
        UPDATE word_war_participants
        SET    words_in_round = ?1, last_checkpoint_at = ?2
        WHERE  war_id = ?3 AND user_id = ?4
          AND  EXISTS (SELECT 1 FROM word_wars WHERE id = ?3 AND status = ?5)
        "#,
    )
    .bind(words_in_round)
    .bind(to_ts(at))
    .bind(war_id)
    .bind(user_id)
    .bind(WarStatus::Running.as_str())
    .execute(pool)
    .await?
    .rows_affected();
    Ok(rows == 1)
}

pub async fn get_participant(pool: &SqlitePool, war_id: i64, user_id: i64) -> Result<Option<Participant>> {
    let row = sqlx::query_as::<_, ParticipantRow>(&format!(
        "SELECT {PARTICIPANT_COLUMNS} FROM word_war_participants WHERE war_id = ?1 AND user_id = ?2"
    ))
    .bind(war_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Participant::from))
}

pub async fn participants(pool: &SqlitePool, war_id: i64) -> Result<Vec<Participant>> {
    let rows = sqlx::query_as::<_, ParticipantRow>(&format!(
        "SELECT {PARTICIPANT_COLUMNS} FROM word_war_participants WHERE war_id = ?1 ORDER BY id ASC"
    ))
    .bind(war_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Participant::from).collect())
}
