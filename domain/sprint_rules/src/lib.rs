//! # Sprint Rules
//!
//! Decision logic for event participation and competitive word-war sprints.
//! Everything here is synchronous and side-effect free: callers pass the
//! current instant and the rows they loaded, and get back a decision.
//!
//! | Concern              | Entry point(s)                                              |
//! |----------------------|-------------------------------------------------------------|
//! | Validation window    | [`window::resolve_validation_window`], [`window::parse_allowed_sources`] |
//! | Progress scoring     | [`progress::calculate`], [`progress::resolve_window_end_exclusive`] |
//! | Reward eligibility   | [`eligibility::evaluate_goodies`], [`eligibility::evaluate_certificate`] |
//! | Word-war lifecycle   | [`word_war::ensure_transition`], [`word_war::rank_participants`], [`word_war::scoreboard`] |
//! | Progress reactors    | [`badges::evaluate`], [`milestones::reached`]               |
//!
//! ## Architecture
//!
//! Storage and transport live in the `sprint_engine` crate. This crate owns
//! the process-wide constants and the error type for the only two ways a
//! rule can refuse: a malformed window configuration and an illegal
//! word-war transition.

pub mod badges;
pub mod eligibility;
pub mod milestones;
pub mod progress;
pub mod types;
pub mod window;
pub mod word_war;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_scenarios;

use thiserror::Error;

pub use types::{
    Badge, Enrollment, Event, EventKind, GoalUnit, Milestone, ProgressChanged, ProgressEntry,
    Project, ValidationRecord, ValidationSource,
};
pub use word_war::{WarCommand, WarStatus};

/// Target used when neither the enrollment nor the event sets one.
pub const DEFAULT_TARGET_WORDS: i64 = 50_000;

/// Source recorded when a validation request names none.
pub const DEFAULT_VALIDATION_SOURCE: ValidationSource = ValidationSource::Manual;

/// Allowed validation sources, in display order, when configuration names none.
pub const DEFAULT_ALLOWED_SOURCES: [ValidationSource; 3] = ValidationSource::ALL;

/// Longest word war that can be scheduled.
pub const MAX_WAR_MINUTES: i64 = 240;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RulesError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("cannot {command} a word war that is {from}")]
    InvalidTransition { from: WarStatus, command: WarCommand },
}

pub type Result<T> = std::result::Result<T, RulesError>;
