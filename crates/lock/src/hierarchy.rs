//! Lock scopes and the hierarchy rule that prevents deadlocks between them.
//!
//! Three scopes nest: a branch contains resource types, which contain
//! individual resources. Acquiring a broader-scoped lock while already
//! holding a narrower one is how two callers can deadlock against each
//! other by locking the same scopes in opposite orders — so it is rejected
//! outright rather than detected after the fact.

use std::fmt;
use thiserror::Error;

/// The granularity a lock is held at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockScope {
    /// An entire branch.
    Branch,
    /// Every resource of one type on a branch (e.g. all object types).
    ResourceType,
    /// A single resource.
    Resource,
}

impl LockScope {
    /// Numeric hierarchy level: smaller is broader. `Branch` = 1,
    /// `ResourceType` = 2, `Resource` = 3.
    pub fn level(&self) -> u8 {
        match self {
            LockScope::Branch => 1,
            LockScope::ResourceType => 2,
            LockScope::Resource => 3,
        }
    }
}

impl fmt::Display for LockScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LockScope::Branch => "branch",
            LockScope::ResourceType => "resource_type",
            LockScope::Resource => "resource",
        };
        write!(f, "{s}")
    }
}

/// Whether a lock excludes other holders (`Exclusive`) or merely registers
/// concurrent interest (`Shared`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Shared: many holders may hold this key at once.
    Shared,
    /// Exclusive: only one holder at a time.
    Exclusive,
}

/// Acquiring `requested` while already holding `held` would invert lock
/// acquisition order versus some other caller locking narrow-then-broad,
/// and is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cannot acquire {requested}-scoped lock while holding {held}-scoped lock '{held_key}'")]
pub struct HierarchyViolation {
    /// The scope being requested.
    pub requested: LockScope,
    /// The scope already held.
    pub held: LockScope,
    /// The key of the already-held lock.
    pub held_key: String,
}

/// Validate that acquiring `requested` is consistent with the scopes in
/// `held`. A request is rejected if its level is *less* than (broader than)
/// any currently held lock's level.
pub fn validate_hierarchy(
    requested: LockScope,
    held: &[(LockScope, String)],
) -> Result<(), HierarchyViolation> {
    for (held_scope, held_key) in held {
        if requested.level() < held_scope.level() {
            return Err(HierarchyViolation {
                requested,
                held: *held_scope,
                held_key: held_key.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowing_is_allowed() {
        let held = vec![(LockScope::Branch, "main".to_string())];
        assert!(validate_hierarchy(LockScope::Resource, &held).is_ok());
    }

    #[test]
    fn widening_is_rejected() {
        let held = vec![(LockScope::Resource, "main/object_type/User".to_string())];
        let err = validate_hierarchy(LockScope::Branch, &held).unwrap_err();
        assert_eq!(err.requested, LockScope::Branch);
        assert_eq!(err.held, LockScope::Resource);
    }

    #[test]
    fn same_level_is_allowed() {
        let held = vec![(LockScope::ResourceType, "main/object_type".to_string())];
        assert!(validate_hierarchy(LockScope::ResourceType, &held).is_ok());
    }
}
