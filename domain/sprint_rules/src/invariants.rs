#![allow(dead_code)]

use crate::progress::ProgressSummary;
use crate::types::Enrollment;
use crate::window::ValidationWindow;
use crate::word_war::{Participant, WarStatus};

/// INV-1: a resolved window never ends before it starts.
pub fn assert_window_ordered(window: &ValidationWindow) {
    assert!(
        window.ends_at >= window.starts_at,
        "INV-1 violated: window ends at {} before start {}",
        window.ends_at,
        window.starts_at
    );
}

/// INV-2: progress summaries are internally consistent.
pub fn assert_summary_consistent(p: &ProgressSummary) {
    assert!(p.target > 0, "INV-2 violated: non-positive target {}", p.target);
    assert!(p.total >= 0, "INV-2 violated: negative total {}", p.total);
    assert_eq!(
        p.remaining,
        (p.target - p.total).max(0),
        "INV-2 violated: remaining does not match target and total"
    );
    assert_eq!(p.won, p.total >= p.target, "INV-2 violated: won flag mismatch");
}

/// INV-3: validation fields of an enrollment never change once set.
pub fn assert_validation_unchanged(before: &Enrollment, after: &Enrollment) {
    if before.validation.is_some() {
        assert_eq!(
            before.validation, after.validation,
            "INV-3 violated: enrollment {} re-validated",
            before.id
        );
    }
}

/// INV-4: only forward word-war transitions.
pub fn assert_forward_transition(from: WarStatus, to: WarStatus) {
    let valid = matches!(
        (from, to),
        (WarStatus::Scheduled, WarStatus::Running) | (WarStatus::Running, WarStatus::Finished)
    ) || from == to && from != WarStatus::Finished;

    assert!(
        valid,
        "INV-4 violated: invalid word war transition from {:?} to {:?}",
        from, to
    );
}

/// INV-5: ranks are 1..=n, and more words never rank below fewer words.
pub fn assert_ranks_consistent(participants: &[Participant], ranks: &[(i64, i64)]) {
    let mut seen: Vec<i64> = ranks.iter().map(|(_, r)| *r).collect();
    seen.sort_unstable();
    let expected: Vec<i64> = (1..=participants.len() as i64).collect();
    assert_eq!(seen, expected, "INV-5 violated: ranks are not 1..=n");

    let rank_of = |id: i64| ranks.iter().find(|(p, _)| *p == id).map(|(_, r)| *r);
    for a in participants {
        for b in participants {
            if a.words_in_round > b.words_in_round {
                assert!(
                    rank_of(a.id) < rank_of(b.id),
                    "INV-5 violated: participant {} outranked by {} with fewer words",
                    a.id,
                    b.id
                );
            }
        }
    }
}
