//! Progress scoring against a word target.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DEFAULT_TARGET_WORDS;

/// Where a project stands against its target.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub target: i64,
    pub total: i64,
    /// Rounded half away from zero; exceeds 100 once the target is passed.
    pub percent: i64,
    pub remaining: i64,
    pub won: bool,
}

/// First strictly positive candidate, else [`DEFAULT_TARGET_WORDS`].
pub fn effective_target(enrollment_target: Option<i64>, event_default: Option<i64>) -> i64 {
    [enrollment_target, event_default]
        .into_iter()
        .flatten()
        .find(|t| *t > 0)
        .unwrap_or(DEFAULT_TARGET_WORDS)
}

pub fn calculate(target_words: Option<i64>, total_written: Option<i64>) -> ProgressSummary {
    let target = effective_target(target_words, None);
    let total = total_written.unwrap_or(0).max(0);

    ProgressSummary {
        target,
        total,
        percent: rounded_percent(total, target),
        remaining: (target - total).max(0),
        won: total >= target,
    }
}

/// `round(total * 100 / target)` in integer arithmetic. Both operands are
/// non-negative here, so adding half the divisor rounds half away from zero.
fn rounded_percent(total: i64, target: i64) -> i64 {
    let numerator = i128::from(total) * 200 + i128::from(target);
    let denominator = i128::from(target) * 2;
    i64::try_from(numerator / denominator).unwrap_or(i64::MAX)
}

/// Midnight UTC at the start of the day after `ends_at`, so a day-granular
/// cutoff includes all of its last day.
pub fn resolve_window_end_exclusive(ends_at: DateTime<Utc>) -> DateTime<Utc> {
    let next_day = ends_at.date_naive().succ_opt().unwrap_or(NaiveDate::MAX);
    next_day.and_time(NaiveTime::MIN).and_utc()
}
