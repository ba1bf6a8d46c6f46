//! # Types
//!
//! Shared data structures used across all modules of the sprint rules.
//!
//! ## Design decisions
//!
//! ### Optional numbers stay optional
//!
//! Target word counts and final word counts are `Option<i64>`. Fallback
//! resolution happens in exactly one place ([`crate::progress::effective_target`])
//! instead of zero-defaulting at the edges.
//!
//! ### Validation as one value
//!
//! The four validation fields of an enrollment are grouped in
//! [`ValidationRecord`] so that "all set or all unset" is a property of the
//! type rather than a runtime check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a time-boxed challenge.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    StandardChallenge,
    SanctionedMarathon,
    Official,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StandardChallenge => "standard_challenge",
            Self::SanctionedMarathon => "sanctioned_marathon",
            Self::Official => "official",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "standard_challenge" => Some(Self::StandardChallenge),
            "sanctioned_marathon" => Some(Self::SanctionedMarathon),
            "official" => Some(Self::Official),
            _ => None,
        }
    }
}

/// A named, time-boxed challenge projects can enroll in.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub kind: EventKind,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub default_target_words: Option<i64>,
    pub is_active: bool,
    /// Per-event override of the validation window start.
    pub validation_starts_at: Option<DateTime<Utc>>,
    /// Per-event override of the validation window end.
    pub validation_ends_at: Option<DateTime<Utc>>,
}

/// Unit a project measures its goal in.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalUnit {
    #[default]
    Words,
    Pages,
    Minutes,
    Chapters,
}

impl GoalUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Words => "words",
            Self::Pages => "pages",
            Self::Minutes => "minutes",
            Self::Chapters => "chapters",
        }
    }

    /// Unknown units are read as words, the unit every event scores in.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "pages" => Self::Pages,
            "minutes" => Self::Minutes,
            "chapters" => Self::Chapters,
            _ => Self::Words,
        }
    }
}

/// The slice of a writing project the engine needs. Projects are owned by
/// an external CRUD layer; the engine never mutates them.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub goal_amount: Option<i64>,
    pub goal_unit: GoalUnit,
}

/// Where a validated word count came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationSource {
    /// Current cumulative progress of the project.
    Current,
    /// Manuscript text pasted for counting.
    Paste,
    /// Number typed in by the writer.
    Manual,
}

impl ValidationSource {
    pub const ALL: [ValidationSource; 3] = [Self::Current, Self::Paste, Self::Manual];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Paste => "paste",
            Self::Manual => "manual",
        }
    }

    /// Parse an already-normalized token.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == token)
    }
}

/// The atomic outcome of a winner validation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub validated_at: DateTime<Utc>,
    pub validated_words: i64,
    pub source: String,
    pub won: bool,
}

/// A project's participation in an event.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub project_id: i64,
    pub event_id: i64,
    pub target_words: Option<i64>,
    pub final_word_count: Option<i64>,
    pub joined_at: DateTime<Utc>,
    pub validation: Option<ValidationRecord>,
}

impl Enrollment {
    pub fn is_validated(&self) -> bool {
        self.validation.is_some()
    }

    pub fn won(&self) -> bool {
        self.validation.as_ref().is_some_and(|v| v.won)
    }
}

/// One row of a project's progress history.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub id: i64,
    pub project_id: i64,
    pub amount: i64,
    pub recorded_at: DateTime<Utc>,
}

/// An achievement awarded to a project, optionally scoped to an event.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: i64,
    pub project_id: i64,
    pub event_id: Option<i64>,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub awarded_at: DateTime<Utc>,
}

/// A project-defined target amount.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub target_amount: i64,
    pub position: i64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Signal emitted whenever a project's cumulative progress changes.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProgressChanged {
    pub project_id: i64,
    pub user_id: i64,
    pub new_total: i64,
    pub goal_unit: GoalUnit,
}
