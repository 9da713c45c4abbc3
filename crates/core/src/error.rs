//! Unified error taxonomy.
//!
//! Every `oms-*` crate defines its own narrow error type for the failures
//! specific to its concern (lock hierarchy violations, merge conflicts,
//! consumer retries, ...) and converts into [`OmsError`] at the boundary, so
//! the coordinator and any HTTP/CLI layer above it only ever has to handle
//! one error type.
use crate::resource::ResourceRef;
use thiserror::Error;

/// The crate-wide result alias.
pub type Result<T> = std::result::Result<T, OmsError>;

/// Unified error type for the ontology management core.
#[derive(Debug, Error)]
pub enum OmsError {
    /// The referenced resource does not exist (on this branch, or at all).
    #[error("not found: {resource}")]
    NotFound {
        /// The resource that was looked up.
        resource: ResourceRef,
    },

    /// A create operation targeted a resource id that already exists.
    #[error("already exists: {resource}")]
    AlreadyExists {
        /// The resource that already exists.
        resource: ResourceRef,
    },

    /// An `If-Match` / expected-version check failed.
    ///
    /// Retryable: the caller should re-read the current version and reapply.
    #[error("precondition failed on {resource}: expected version {expected}, actual {actual}")]
    PreconditionFailed {
        /// The resource whose version did not match.
        resource: ResourceRef,
        /// The version the caller expected.
        expected: u64,
        /// The version actually stored.
        actual: u64,
    },

    /// Schema or naming validation rejected the proposed content.
    #[error("validation failed on {resource}: {reason}")]
    ValidationFailed {
        /// The resource that failed validation.
        resource: ResourceRef,
        /// A human-readable description of the violation.
        reason: String,
    },

    /// The branch is not in a state that accepts writes
    /// (`LOCKED_FOR_MERGE`, `FROZEN`, or `ARCHIVED`).
    #[error("branch '{branch}' is not writable: {status}")]
    BranchNotWritable {
        /// The branch name.
        branch: String,
        /// Its current status.
        status: String,
    },

    /// An attempt to acquire a lock violated the hierarchy rule: a
    /// broader-scoped lock was requested while a narrower-scoped lock was
    /// already held.
    #[error("lock hierarchy violation: cannot acquire {requested} while holding {held}")]
    HierarchyViolation {
        /// The scope being requested.
        requested: String,
        /// The scope already held.
        held: String,
    },

    /// A lock is held by another owner and could not be acquired before
    /// `wait_timeout` elapsed.
    ///
    /// Retryable.
    #[error("lock conflict on {key}: held by {owner}")]
    LockConflict {
        /// The lock key.
        key: String,
        /// The current holder.
        owner: String,
    },

    /// A lock held by the caller expired (TTL elapsed) before release.
    #[error("lock expired on {key}")]
    LockExpired {
        /// The lock key.
        key: String,
    },

    /// A merge could not complete because one or more conflicts were left
    /// unresolved at `BLOCK` severity.
    #[error("merge unresolved: {conflict_count} blocking conflict(s)")]
    MergeUnresolved {
        /// Number of blocking conflicts.
        conflict_count: usize,
    },

    /// A storage/lock/event backend dependency was unreachable.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// An operation exceeded its allotted time budget.
    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// An invariant the system assumes was violated; indicates a bug.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OmsError {
    /// Whether retrying the same operation (after re-reading current state,
    /// where relevant) may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OmsError::PreconditionFailed { .. } | OmsError::LockConflict { .. }
        )
    }

    /// Whether this error indicates a bug or data-integrity problem that
    /// should be logged and alerted on rather than silently retried.
    pub fn is_serious(&self) -> bool {
        matches!(self, OmsError::Internal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{BranchName, ResourceType};

    #[test]
    fn precondition_failed_is_retryable() {
        let err = OmsError::PreconditionFailed {
            resource: ResourceRef::new(ResourceType::ObjectType, "User", BranchName::main()),
            expected: 1,
            actual: 2,
        };
        assert!(err.is_retryable());
        assert!(!err.is_serious());
    }

    #[test]
    fn internal_errors_are_serious() {
        assert!(OmsError::Internal("unreachable state".into()).is_serious());
    }
}
