//! Badge rules evaluated after every progress change.
//!
//! Rules are independent of each other and of evaluation order. A rule only
//! produces a badge whose name the project does not already hold, so running
//! the evaluation twice over the same history yields nothing the second time.

use std::collections::{BTreeSet, HashSet};

use chrono::{Days, NaiveDate};

use crate::types::{GoalUnit, ProgressEntry};

/// Static description of an awardable badge.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct BadgeSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

pub const FIRST_STEP: BadgeSpec = BadgeSpec {
    name: "first_step",
    description: "Logged your first writing session.",
    icon: "footprints",
};

pub const HUNDRED_WORDS: BadgeSpec = BadgeSpec {
    name: "hundred_words",
    description: "Wrote at least 100 words in a single session.",
    icon: "feather",
};

pub const TEN_DAYS: BadgeSpec = BadgeSpec {
    name: "ten_days",
    description: "Wrote on 10 different days.",
    icon: "calendar",
};

pub const GOAL_REACHED: BadgeSpec = BadgeSpec {
    name: "goal_reached",
    description: "Reached the project goal.",
    icon: "trophy",
};

/// Awarded once per event when a win is validated.
pub const EVENT_WINNER: BadgeSpec = BadgeSpec {
    name: "winner",
    description: "Validated a win in this event.",
    icon: "crown",
};

/// `(threshold in days, badge)`; every threshold reached is awarded.
pub const STREAK_BADGES: [(u32, BadgeSpec); 4] = [
    (
        5,
        BadgeSpec {
            name: "streak_5",
            description: "Wrote 5 days in a row.",
            icon: "flame",
        },
    ),
    (
        7,
        BadgeSpec {
            name: "streak_7",
            description: "Wrote 7 days in a row.",
            icon: "flame",
        },
    ),
    (
        14,
        BadgeSpec {
            name: "streak_14",
            description: "Wrote 14 days in a row.",
            icon: "fire",
        },
    ),
    (
        30,
        BadgeSpec {
            name: "streak_30",
            description: "Wrote 30 days in a row.",
            icon: "volcano",
        },
    ),
];

const SINGLE_ENTRY_WORDS: i64 = 100;
const DISTINCT_DAYS: usize = 10;

/// Everything the rules look at for one project.
#[derive(Clone, Copy, Debug)]
pub struct BadgeContext<'a> {
    pub entries: &'a [ProgressEntry],
    pub new_total: i64,
    pub goal_amount: Option<i64>,
    pub goal_unit: GoalUnit,
    pub today: NaiveDate,
}

/// UTC calendar days that have at least one entry.
pub fn active_days(entries: &[ProgressEntry]) -> BTreeSet<NaiveDate> {
    entries.iter().map(|e| e.recorded_at.date_naive()).collect()
}

/// Consecutive active days counted backward from `today`. Zero when
/// nothing was recorded today.
pub fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut day = Some(today);
    while let Some(d) = day.filter(|d| days.contains(d)) {
        streak += 1;
        day = d.checked_sub_days(Days::new(1));
    }
    streak
}

/// Badges earned by `ctx` that are not in `already_awarded`.
pub fn evaluate(ctx: &BadgeContext<'_>, already_awarded: &HashSet<String>) -> Vec<BadgeSpec> {
    let days = active_days(ctx.entries);
    let streak = current_streak(&days, ctx.today);

    let mut earned = Vec::new();

    if !ctx.entries.is_empty() {
        earned.push(FIRST_STEP);
    }
    if ctx.goal_unit == GoalUnit::Words
        && ctx.entries.iter().any(|e| e.amount >= SINGLE_ENTRY_WORDS)
    {
        earned.push(HUNDRED_WORDS);
    }
    if days.len() >= DISTINCT_DAYS {
        earned.push(TEN_DAYS);
    }
    earned.extend(
        STREAK_BADGES
            .iter()
            .filter(|(threshold, _)| streak >= *threshold)
            .map(|(_, badge)| *badge),
    );
    if ctx.goal_amount.is_some_and(|goal| goal > 0 && ctx.new_total >= goal) {
        earned.push(GOAL_REACHED);
    }

    earned.retain(|b| !already_awarded.contains(b.name));
    earned
}
