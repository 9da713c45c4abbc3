//! The branch lifecycle state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A branch's writability state.
///
/// Transitions: `Active` → `LockedForMerge` (merge in progress) →
/// `Active` (merge finished); `Active` → `Frozen` (freeze) → `Active`
/// (unfreeze); `Active` → `Archived` (terminal, irreversible).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BranchState {
    /// Open for reads and writes.
    Active,
    /// A merge is in progress; writes are rejected until it completes.
    LockedForMerge,
    /// Deliberately made read-only by an operator; reversible.
    Frozen,
    /// Permanently retired; reversible only by never (terminal).
    Archived,
}

impl BranchState {
    /// Whether a branch in this state accepts new version writes.
    pub fn is_writable(&self) -> bool {
        matches!(self, BranchState::Active)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(&self, next: BranchState) -> bool {
        use BranchState::*;
        matches!(
            (self, next),
            (Active, LockedForMerge)
                | (LockedForMerge, Active)
                | (Active, Frozen)
                | (Frozen, Active)
                | (Active, Archived)
        )
    }
}

impl fmt::Display for BranchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BranchState::Active => "ACTIVE",
            BranchState::LockedForMerge => "LOCKED_FOR_MERGE",
            BranchState::Frozen => "FROZEN",
            BranchState::Archived => "ARCHIVED",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions_are_allowed() {
        assert!(BranchState::Active.can_transition_to(BranchState::LockedForMerge));
        assert!(BranchState::LockedForMerge.can_transition_to(BranchState::Active));
        assert!(BranchState::Active.can_transition_to(BranchState::Frozen));
        assert!(BranchState::Frozen.can_transition_to(BranchState::Active));
        assert!(BranchState::Active.can_transition_to(BranchState::Archived));
    }

    #[test]
    fn archived_is_terminal() {
        assert!(!BranchState::Archived.can_transition_to(BranchState::Active));
        assert!(!BranchState::Archived.can_transition_to(BranchState::Frozen));
    }

    #[test]
    fn non_active_states_are_not_writable() {
        assert!(BranchState::Active.is_writable());
        assert!(!BranchState::LockedForMerge.is_writable());
        assert!(!BranchState::Frozen.is_writable());
        assert!(!BranchState::Archived.is_writable());
    }
}
