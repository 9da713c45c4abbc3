//! Hierarchical, TTL-bound distributed lock manager.
//!
//! Locks nest `Branch > ResourceType > Resource`. Acquiring a broader scope
//! while a narrower one is already held is rejected up front
//! ([`hierarchy::validate_hierarchy`]) rather than allowed to deadlock
//! against a caller that locks the same scopes in the opposite order.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod hierarchy;
pub mod manager;

pub use hierarchy::{validate_hierarchy, HierarchyViolation, LockMode, LockScope};
pub use manager::{LockContext, LockHandle, LockManager, LockManagerConfig};
