//! Milestone completion. Completion is monotonic: a completed milestone is
//! never selected again, whatever the new total.

use crate::types::Milestone;

/// Incomplete milestones whose target `new_total` has reached, in position order.
pub fn reached(milestones: &[Milestone], new_total: i64) -> Vec<&Milestone> {
    let mut hit: Vec<&Milestone> = milestones
        .iter()
        .filter(|m| !m.completed && m.target_amount <= new_total)
        .collect();
    hit.sort_by_key(|m| (m.position, m.id));
    hit
}
