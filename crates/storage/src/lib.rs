//! Storage abstraction for the ontology management core.
//!
//! Every stateful component above this crate (the version store, the lock
//! manager, the outbox) is written against a trait here, not against a
//! concrete backend. This crate also ships the in-memory reference
//! implementation used by tests and by any deployment that does not need a
//! durable backend swapped in.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lock_backend;
pub mod outbox_backend;
pub mod version_store;

pub use lock_backend::{InMemoryLockBackend, LockBackend, LockRecord};
pub use outbox_backend::{InMemoryOutboxBackend, OutboxBackend, StoredEnvelope};
pub use version_store::{InMemoryVersionStore, VersionStore};
