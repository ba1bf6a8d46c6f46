//! Cross-module scenarios: a project moving through an event and a full
//! word war, checked against the invariants in `invariants.rs`.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::eligibility::{evaluate_certificate, evaluate_goodies, EligibilityStatus};
use crate::invariants::*;
use crate::progress::{calculate, effective_target, resolve_window_end_exclusive};
use crate::types::{Enrollment, ValidationRecord};
use crate::window::{normalize_source, resolve_validation_window};
use crate::word_war::{ensure_transition, rank_participants, Participant, WarCommand, WarStatus};

fn nov(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 11, day, hour, 0, 0).unwrap()
}

fn enrollment(target: Option<i64>) -> Enrollment {
    Enrollment {
        id: 1,
        project_id: 10,
        event_id: 20,
        target_words: target,
        final_word_count: None,
        joined_at: nov(1, 8),
        validation: None,
    }
}

#[test]
fn project_moves_from_in_progress_to_eligible() {
    let window = resolve_validation_window(nov(1, 0), nov(30, 23), Some(nov(20, 0)), None).unwrap();
    assert_window_ordered(&window);
    let cutoff = resolve_window_end_exclusive(window.ends_at);

    let mut e = enrollment(None);
    let target = effective_target(e.target_words, Some(50_000));

    let early = calculate(Some(target), Some(12_000));
    assert_summary_consistent(&early);
    let status = evaluate_goodies(nov(10, 12), cutoff, target, early.total, false, false);
    assert_eq!(status.status, EligibilityStatus::InProgress);

    let done = calculate(Some(target), Some(50_312));
    assert_summary_consistent(&done);
    let status = evaluate_goodies(nov(28, 12), cutoff, target, done.total, false, false);
    assert_eq!(status.status, EligibilityStatus::PendingValidation);
    assert!(status.can_validate);

    let before = e.clone();
    e.validation = Some(ValidationRecord {
        validated_at: nov(28, 12),
        validated_words: done.total,
        source: normalize_source(Some(" Paste")),
        won: true,
    });
    assert_validation_unchanged(&before, &e);

    let status = evaluate_goodies(nov(28, 13), cutoff, target, done.total, e.is_validated(), e.won());
    assert_eq!(status.status, EligibilityStatus::Eligible);
    assert!(evaluate_certificate(e.is_validated(), e.won()).is_eligible);
}

#[test]
fn missed_target_is_not_eligible_after_last_day() {
    let window = resolve_validation_window(nov(1, 0), nov(30, 9), None, None).unwrap();
    let cutoff = resolve_window_end_exclusive(window.ends_at);

    // Still the last day: the event counts as running.
    let status = evaluate_goodies(nov(30, 22), cutoff, 50_000, 31_000, false, false);
    assert_eq!(status.status, EligibilityStatus::InProgress);

    let status = evaluate_goodies(cutoff + Duration::minutes(1), cutoff, 50_000, 31_000, false, false);
    assert_eq!(status.status, EligibilityStatus::NotEligible);
    assert!(!evaluate_certificate(false, false).is_eligible);
}

#[test]
fn full_word_war_lifecycle() {
    let mut status = WarStatus::Scheduled;
    for command in [WarCommand::Join, WarCommand::Start, WarCommand::Checkpoint, WarCommand::Finish] {
        let next = ensure_transition(status, command).unwrap();
        assert_forward_transition(status, next);
        status = next;
    }
    assert_eq!(status, WarStatus::Finished);
    assert!(ensure_transition(status, WarCommand::Start).is_err());

    let start = nov(14, 20);
    let participants: Vec<Participant> = [(1, 820, 0), (2, 1_140, 1), (3, 820, -2), (4, 15, 3)]
        .into_iter()
        .map(|(id, words, joined)| Participant {
            id,
            war_id: 1,
            user_id: id * 10,
            project_id: id * 100,
            joined_at: start + Duration::seconds(joined),
            words_in_round: words,
            last_checkpoint_at: Some(start + Duration::minutes(15)),
            final_rank: None,
        })
        .collect();

    let ranks = rank_participants(&participants);
    assert_ranks_consistent(&participants, &ranks);
    assert_eq!(ranks[0], (2, 1));
    assert_eq!(ranks[1], (3, 2));
}
