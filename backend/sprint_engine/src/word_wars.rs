//! Word war commands.
//!
//! Each command checks the transition table against the war it just read,
//! then issues a write whose `WHERE` clause repeats the status check. When
//! the write matches nothing, another caller moved the war first; the war is
//! re-read and the caller gets the transition error for its current status.

use chrono::{DateTime, Utc};
use sprint_rules::word_war::{self, ensure_transition, sprint_bounds, Participant, Scoreboard, WordWar};
use sprint_rules::{WarCommand, WarStatus, MAX_WAR_MINUTES};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::db::{enrollments, word_wars};
use crate::errors::{EngineError, Result};
use crate::guard::{ensure_owner, found, non_negative, not_cancelled, positive_id};

#[derive(Debug, Clone)]
pub struct CreateWar {
    pub event_id: i64,
    pub creator_id: i64,
    pub duration_minutes: i64,
    /// Defaults to the creation time.
    pub scheduled_start: Option<DateTime<Utc>>,
}

async fn load_war(pool: &SqlitePool, war_id: i64) -> Result<WordWar> {
    found("word war", war_id, word_wars::get_war(pool, war_id).await?)
}

fn bounds(start: DateTime<Utc>, duration_minutes: i64) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    sprint_bounds(start, duration_minutes).ok_or_else(|| {
        EngineError::rule(format!("a {duration_minutes} minute war starting at {start} ends out of range"))
    })
}

/// The error for a conditional write that matched no row.
async fn lost_race(pool: &SqlitePool, war_id: i64, command: WarCommand) -> EngineError {
    match load_war(pool, war_id).await {
        Ok(war) => {
            debug!("Word war {war_id} moved to {} before {command}", war.status);
            EngineError::InvalidStateTransition {
                from: war.status,
                command,
            }
        }
        Err(e) => e,
    }
}

pub async fn create(
    pool: &SqlitePool,
    cmd: &CreateWar,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> Result<WordWar> {
    positive_id("CreatorId", cmd.creator_id)?;
    if !(1..=MAX_WAR_MINUTES).contains(&cmd.duration_minutes) {
        return Err(EngineError::rule(format!(
            "duration must be between 1 and {MAX_WAR_MINUTES} minutes, got {}",
            cmd.duration_minutes
        )));
    }

    let event = found("event", cmd.event_id, enrollments::get_event(pool, cmd.event_id).await?)?;
    if !event.is_active {
        return Err(EngineError::rule(format!("event {} is not active", event.slug)));
    }

    let (starts_at, ends_at) = bounds(cmd.scheduled_start.unwrap_or(now), cmd.duration_minutes)?;

    not_cancelled(cancel)?;
    let war = word_wars::insert_war(
        pool,
        event.id,
        cmd.creator_id,
        cmd.duration_minutes,
        starts_at,
        ends_at,
        now,
    )
    .await?;
    info!(
        "Word war {} created in event {} ({} min, starts {starts_at})",
        war.id, event.slug, war.duration_minutes
    );
    Ok(war)
}

/// Begin the sprint now. The stored bounds are reset to `now` and
/// `now + duration`.
pub async fn start(
    pool: &SqlitePool,
    war_id: i64,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> Result<WordWar> {
    let war = load_war(pool, war_id).await?;
    ensure_transition(war.status, WarCommand::Start)?;

    let (starts_at, ends_at) = bounds(now, war.duration_minutes)?;

    not_cancelled(cancel)?;
    if !word_wars::mark_running(pool, war.id, starts_at, ends_at).await? {
        return Err(lost_race(pool, war.id, WarCommand::Start).await);
    }
    info!("Word war {} started, ends at {ends_at}", war.id);

    Ok(WordWar {
        status: WarStatus::Running,
        starts_at,
        ends_at,
        ..war
    })
}

/// Add the user with zero words. Joining again returns the existing row.
pub async fn join(
    pool: &SqlitePool,
    war_id: i64,
    user_id: i64,
    project_id: i64,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> Result<Participant> {
    let war = load_war(pool, war_id).await?;
    ensure_transition(war.status, WarCommand::Join)?;

    let project = found("project", project_id, enrollments::get_project(pool, project_id).await?)?;
    ensure_owner(&project, user_id)?;

    if let Some(existing) = word_wars::get_participant(pool, war.id, user_id).await? {
        return Ok(existing);
    }

    not_cancelled(cancel)?;
    if word_wars::insert_participant_if_open(pool, war.id, user_id, project.id, now).await? {
        info!("User {user_id} joined word war {}", war.id);
    }

    // Either our row, or one a concurrent join for the same user inserted.
    match word_wars::get_participant(pool, war.id, user_id).await? {
        Some(participant) => Ok(participant),
        None => Err(lost_race(pool, war.id, WarCommand::Join).await),
    }
}

/// Remove the user from a war that has not finished. Returns `false` when
/// the user was not taking part.
pub async fn leave(
    pool: &SqlitePool,
    war_id: i64,
    user_id: i64,
    cancel: &CancellationToken,
) -> Result<bool> {
    let war = load_war(pool, war_id).await?;
    ensure_transition(war.status, WarCommand::Leave)?;

    not_cancelled(cancel)?;
    if word_wars::delete_participant_if_open(pool, war.id, user_id).await? {
        info!("User {user_id} left word war {}", war.id);
        return Ok(true);
    }

    let current = load_war(pool, war.id).await?;
    ensure_transition(current.status, WarCommand::Leave)?;
    Ok(false)
}

/// Record the user's absolute word count for the round.
pub async fn submit_checkpoint(
    pool: &SqlitePool,
    war_id: i64,
    user_id: i64,
    words_in_round: i64,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> Result<Participant> {
    non_negative("words in round", words_in_round)?;
    let war = load_war(pool, war_id).await?;
    ensure_transition(war.status, WarCommand::Checkpoint)?;
    found(
        "participant",
        user_id,
        word_wars::get_participant(pool, war.id, user_id).await?,
    )?;

    not_cancelled(cancel)?;
    if !word_wars::update_checkpoint_if_running(pool, war.id, user_id, words_in_round, now).await? {
        let current = load_war(pool, war.id).await?;
        if current.status != WarStatus::Running {
            warn!("Checkpoint from user {user_id} arrived after word war {} ended", war.id);
            return Err(EngineError::InvalidStateTransition {
                from: current.status,
                command: WarCommand::Checkpoint,
            });
        }
        // Left between the read and the write.
        return Err(EngineError::not_found("participant", user_id));
    }
    debug!("Checkpoint: user {user_id} at {words_in_round} words in word war {}", war.id);

    found(
        "participant",
        user_id,
        word_wars::get_participant(pool, war.id, user_id).await?,
    )
}

/// End the sprint and freeze the ranking.
pub async fn finish(
    pool: &SqlitePool,
    war_id: i64,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> Result<Scoreboard> {
    let war = load_war(pool, war_id).await?;
    ensure_transition(war.status, WarCommand::Finish)?;

    not_cancelled(cancel)?;
    let Some(ranks) = word_wars::finish_and_rank(pool, war.id, now).await? else {
        return Err(lost_race(pool, war.id, WarCommand::Finish).await);
    };
    info!("Word war {} finished with {} participants", war.id, ranks.len());

    scoreboard(pool, war.id, now).await
}

pub async fn scoreboard(pool: &SqlitePool, war_id: i64, now: DateTime<Utc>) -> Result<Scoreboard> {
    let war = load_war(pool, war_id).await?;
    let participants = word_wars::participants(pool, war.id).await?;
    Ok(word_war::scoreboard(&war, participants, now))
}

/// Finish every running war whose end time has passed. Returns how many
/// this call finished.
pub async fn sweep_expired(
    pool: &SqlitePool,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> Result<usize> {
    let expired = word_wars::expired_running_wars(pool, now).await?;
    let mut finished = 0;

    for war_id in expired {
        if cancel.is_cancelled() {
            break;
        }
        match word_wars::finish_and_rank(pool, war_id, now).await? {
            Some(ranks) => {
                info!("Word war {war_id} expired and was closed ({} ranked)", ranks.len());
                finished += 1;
            }
            None => debug!("Word war {war_id} was finished by another caller"),
        }
    }

    Ok(finished)
}
