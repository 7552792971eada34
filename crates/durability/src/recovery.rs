//! Recovery: pick the newest committed slot
//!
//! Slots without a committed header are skipped. Among the rest the
//! strictly greatest version wins; on a tie the lowest slot index wins.
//! Writing resumes in the slot after the winner so the winner stays
//! untouched until two more slots have been committed.

use crate::paths::{next_slot, SLOT_COUNT};
use crate::slot::RecoveredSlot;

/// Where a reopened store resumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPlan {
    /// Slot the next write goes to
    pub cursor: usize,
    /// Version counter to resume from
    pub version: i64,
    /// Winning slot and its payload, if any slot held committed data
    pub winner: Option<(usize, Vec<u8>)>,
}

impl RecoveryPlan {
    /// Plan for a directory with no committed slot
    pub fn fresh() -> Self {
        RecoveryPlan {
            cursor: 0,
            version: 0,
            winner: None,
        }
    }
}

/// Index of the slot holding the newest committed version
pub fn select_newest(candidates: &[Option<RecoveredSlot>]) -> Option<usize> {
    let mut best: Option<(usize, i32)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let Some(slot) = candidate else { continue };
        match best {
            Some((_, version)) if slot.version <= version => {}
            _ => best = Some((index, slot.version)),
        }
    }
    best.map(|(index, _)| index)
}

/// Build the resume plan from the three slots' open results
pub fn plan_recovery(mut candidates: [Option<RecoveredSlot>; SLOT_COUNT]) -> RecoveryPlan {
    let Some(index) = select_newest(&candidates) else {
        return RecoveryPlan::fresh();
    };
    match candidates[index].take() {
        Some(slot) => RecoveryPlan {
            cursor: next_slot(index),
            version: i64::from(slot.version),
            winner: Some((index, slot.payload)),
        },
        None => RecoveryPlan::fresh(),
    }
}
