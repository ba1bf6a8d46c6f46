//! Reward and certificate eligibility.
//!
//! Both classifiers are decision tables; rows are checked top to bottom and
//! the first match wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityStatus {
    InvalidTarget,
    Eligible,
    PendingValidation,
    InProgress,
    NotEligible,
}

impl EligibilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidTarget => "invalid_target",
            Self::Eligible => "eligible",
            Self::PendingValidation => "pending_validation",
            Self::InProgress => "in_progress",
            Self::NotEligible => "not_eligible",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Eligibility {
    pub status: EligibilityStatus,
    pub is_eligible: bool,
    pub can_validate: bool,
    pub message: &'static str,
}

impl Eligibility {
    const fn new(
        status: EligibilityStatus,
        is_eligible: bool,
        can_validate: bool,
        message: &'static str,
    ) -> Self {
        Self {
            status,
            is_eligible,
            can_validate,
            message,
        }
    }
}

/// Classify whether badges and the certificate ("goodies") can be unlocked.
pub fn evaluate_goodies(
    now: DateTime<Utc>,
    event_ends_at: DateTime<Utc>,
    target_words: i64,
    total_words: i64,
    is_validated: bool,
    won: bool,
) -> Eligibility {
    use EligibilityStatus::*;

    if target_words <= 0 {
        Eligibility::new(InvalidTarget, false, false, "The target word count is not valid.")
    } else if is_validated && won {
        Eligibility::new(Eligible, true, false, "Congratulations! Your rewards are unlocked.")
    } else if total_words >= target_words {
        Eligibility::new(
            PendingValidation,
            false,
            true,
            "Target reached. Validate your word count to unlock your rewards.",
        )
    } else if now < event_ends_at {
        Eligibility::new(InProgress, false, false, "Keep writing! The event is still running.")
    } else {
        Eligibility::new(NotEligible, false, false, "The target was not reached before the event ended.")
    }
}

/// Classify whether the winner certificate can be released.
pub fn evaluate_certificate(is_validated: bool, won: bool) -> Eligibility {
    if is_validated && won {
        Eligibility::new(EligibilityStatus::Eligible, true, false, "Your winner certificate is ready.")
    } else {
        Eligibility::new(
            EligibilityStatus::NotEligible,
            false,
            false,
            "The certificate is available once your win has been validated.",
        )
    }
}
