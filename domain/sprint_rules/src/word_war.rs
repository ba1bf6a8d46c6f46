//! # Word wars
//!
//! A word war is a short timed sprint inside an event. [`WarStatus`] is a
//! forward-only state machine:
//!
//! ```text
//! Scheduled ──start──► Running ──finish──► Finished
//! ```
//!
//! `join` and `leave` are accepted in either non-terminal state and
//! checkpoints only while running. [`ensure_transition`] is the single table
//! every command consults before it touches storage; storage then repeats the
//! same guard as a conditional write.
//!
//! Standings are never stored incrementally. [`scoreboard`] derives them from
//! the current participant rows at read time and [`rank_participants`]
//! freezes them once, when the war finishes.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, RulesError};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarStatus {
    Scheduled,
    Running,
    Finished,
}

impl WarStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Running => "running",
            Self::Finished => "finished",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "scheduled" => Some(Self::Scheduled),
            "running" => Some(Self::Running),
            "finished" => Some(Self::Finished),
            _ => None,
        }
    }
}

impl fmt::Display for WarStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commands a caller can issue against a war.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarCommand {
    Start,
    Join,
    Leave,
    Checkpoint,
    Finish,
}

impl fmt::Display for WarCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Checkpoint => "submit a checkpoint to",
            Self::Finish => "finish",
        })
    }
}

/// Status the war is in after `command` succeeds from `from`.
pub fn ensure_transition(from: WarStatus, command: WarCommand) -> Result<WarStatus> {
    use WarCommand::*;
    use WarStatus::*;

    match (from, command) {
        (Scheduled, Start) => Ok(Running),
        (Running, Finish) => Ok(Finished),
        (Running, Checkpoint) => Ok(Running),
        (Scheduled | Running, Join | Leave) => Ok(from),
        _ => Err(RulesError::InvalidTransition { from, command }),
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct WordWar {
    pub id: i64,
    pub event_id: i64,
    pub creator_id: i64,
    pub status: WarStatus,
    pub duration_minutes: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl WordWar {
    /// Zero once finished, even when the war was closed before `ends_at`.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        if self.status == WarStatus::Finished {
            return 0;
        }
        (self.ends_at - now).num_seconds().max(0)
    }
}

/// `(starts_at, ends_at)` for a war of `duration_minutes` beginning at
/// `start`, or `None` when the end is not representable.
pub fn sprint_bounds(
    start: DateTime<Utc>,
    duration_minutes: i64,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let end = start.checked_add_signed(Duration::try_minutes(duration_minutes)?)?;
    Some((start, end))
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: i64,
    pub war_id: i64,
    pub user_id: i64,
    pub project_id: i64,
    pub joined_at: DateTime<Utc>,
    /// Absolute count for the round, not a delta.
    pub words_in_round: i64,
    pub last_checkpoint_at: Option<DateTime<Utc>>,
    pub final_rank: Option<i64>,
}

/// Most words first; earlier joiners win exact ties, then lower row id.
pub fn standing_order(a: &Participant, b: &Participant) -> Ordering {
    b.words_in_round
        .cmp(&a.words_in_round)
        .then_with(|| a.joined_at.cmp(&b.joined_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// `(participant_id, rank)` pairs, rank 1 being the leader.
pub fn rank_participants(participants: &[Participant]) -> Vec<(i64, i64)> {
    let mut ordered: Vec<&Participant> = participants.iter().collect();
    ordered.sort_by(|a, b| standing_order(a, b));
    ordered
        .into_iter()
        .zip(1..)
        .map(|(p, rank)| (p.id, rank))
        .collect()
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ScoreboardEntry {
    pub position: i64,
    pub participant_id: i64,
    pub user_id: i64,
    pub project_id: i64,
    pub words_in_round: i64,
    pub joined_at: DateTime<Utc>,
    pub last_checkpoint_at: Option<DateTime<Utc>>,
    pub final_rank: Option<i64>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub war_id: i64,
    pub status: WarStatus,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub remaining_seconds: i64,
    pub entries: Vec<ScoreboardEntry>,
}

/// Read-time snapshot of the standings.
pub fn scoreboard(war: &WordWar, mut participants: Vec<Participant>, now: DateTime<Utc>) -> Scoreboard {
    participants.sort_by(standing_order);

    let entries = participants
        .into_iter()
        .zip(1..)
        .map(|(p, position)| ScoreboardEntry {
            position,
            participant_id: p.id,
            user_id: p.user_id,
            project_id: p.project_id,
            words_in_round: p.words_in_round,
            joined_at: p.joined_at,
            last_checkpoint_at: p.last_checkpoint_at,
            final_rank: p.final_rank,
        })
        .collect();

    Scoreboard {
        war_id: war.id,
        status: war.status,
        starts_at: war.starts_at,
        ends_at: war.ends_at,
        remaining_seconds: war.remaining_seconds(now),
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(min: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 11, 14, 20, 0, 0).unwrap() + Duration::minutes(min)
    }

    fn participant(id: i64, words: i64, joined_min: i64) -> Participant {
        Participant {
            id,
            war_id: 1,
            user_id: 100 + id,
            project_id: 200 + id,
            joined_at: t(joined_min),
            words_in_round: words,
            last_checkpoint_at: None,
            final_rank: None,
        }
    }

    fn war(status: WarStatus) -> WordWar {
        WordWar {
            id: 1,
            event_id: 9,
            creator_id: 101,
            status,
            duration_minutes: 15,
            starts_at: t(0),
            ends_at: t(15),
            finished_at: None,
            created_at: t(-5),
        }
    }

    #[test]
    fn transition_table() {
        use WarCommand::*;
        use WarStatus::*;

        assert_eq!(ensure_transition(Scheduled, Start), Ok(Running));
        assert_eq!(ensure_transition(Running, Finish), Ok(Finished));
        assert_eq!(ensure_transition(Running, Checkpoint), Ok(Running));
        assert_eq!(ensure_transition(Scheduled, Join), Ok(Scheduled));
        assert_eq!(ensure_transition(Running, Leave), Ok(Running));

        for (from, command) in [
            (Running, Start),
            (Finished, Start),
            (Scheduled, Finish),
            (Finished, Finish),
            (Scheduled, Checkpoint),
            (Finished, Checkpoint),
            (Finished, Join),
            (Finished, Leave),
        ] {
            assert_eq!(
                ensure_transition(from, command),
                Err(RulesError::InvalidTransition { from, command })
            );
        }
    }

    #[test]
    fn invalid_transition_message_reads_naturally() {
        let err = ensure_transition(WarStatus::Running, WarCommand::Start).unwrap_err();
        assert_eq!(err.to_string(), "cannot start a word war that is running");
    }

    #[test]
    fn status_round_trips_through_storage_text() {
        for s in [WarStatus::Scheduled, WarStatus::Running, WarStatus::Finished] {
            assert_eq!(WarStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(WarStatus::parse("paused"), None);
    }

    #[test]
    fn ranks_descend_by_words_with_join_time_tiebreak() {
        let ps = vec![
            participant(1, 500, 2),
            participant(2, 900, 3),
            participant(3, 500, 1),
            participant(4, 0, 0),
        ];
        let ranks = rank_participants(&ps);
        assert_eq!(ranks, vec![(2, 1), (3, 2), (1, 3), (4, 4)]);
    }

    #[test]
    fn identical_rows_fall_back_to_id() {
        let ps = vec![participant(7, 300, 0), participant(5, 300, 0)];
        assert_eq!(rank_participants(&ps), vec![(5, 1), (7, 2)]);
    }

    #[test]
    fn ranking_an_empty_war_is_empty() {
        assert!(rank_participants(&[]).is_empty());
    }

    #[test]
    fn scoreboard_orders_and_computes_remaining_time() {
        let ps = vec![participant(1, 10, 0), participant(2, 20, 1)];
        let board = scoreboard(&war(WarStatus::Running), ps, t(5));
        assert_eq!(board.remaining_seconds, 600);
        assert_eq!(board.entries[0].participant_id, 2);
        assert_eq!(board.entries[0].position, 1);
        assert_eq!(board.entries[1].participant_id, 1);
        assert_eq!(board.entries[1].position, 2);
    }

    #[test]
    fn remaining_time_never_goes_negative() {
        let board = scoreboard(&war(WarStatus::Running), vec![], t(40));
        assert_eq!(board.remaining_seconds, 0);
    }

    #[test]
    fn scoreboard_exposes_one_remaining_field() {
        let board = scoreboard(&war(WarStatus::Scheduled), vec![], t(0));
        let json = serde_json::to_value(&board).unwrap();
        let keys: Vec<_> = json
            .as_object()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with("remaining"))
            .cloned()
            .collect();
        assert_eq!(keys, vec!["remaining_seconds".to_string()]);
    }

    #[test]
    fn finished_war_has_no_time_left() {
        let mut closed_early = war(WarStatus::Finished);
        closed_early.finished_at = Some(t(3));
        assert_eq!(closed_early.remaining_seconds(t(3)), 0);
        assert_eq!(war(WarStatus::Running).remaining_seconds(t(3)), 12 * 60);
    }

    #[test]
    fn sprint_bounds_add_duration() {
        let (start, end) = sprint_bounds(t(0), 25).unwrap();
        assert_eq!(start, t(0));
        assert_eq!(end, t(25));
    }

    #[test]
    fn sprint_bounds_past_the_calendar_end_is_none() {
        assert_eq!(sprint_bounds(DateTime::<Utc>::MAX_UTC, 1), None);
        assert_eq!(sprint_bounds(t(0), i64::MAX), None);
    }
}
