//! # OMS Core
//!
//! A metadata plane for versioned schema definitions — object types, link
//! types, properties, action types, struct types, semantic types — under
//! Git-style branching and three-way merge.
//!
//! This crate is a thin facade over a workspace of small, single-concern
//! crates (content hashing and the shared contract types, the version
//! store, the hierarchical lock manager, the validator pipeline, the
//! branch registry, the merge engine, the transactional outbox, the
//! idempotent consumer framework, the temporal query engine, and the
//! coordinator that wires them into one atomic mutation pipeline). Only
//! the surface re-exported here is considered stable; the sub-crates
//! themselves may be depended on directly by callers that need finer
//! control over which backends they wire in.
//!
//! # Quick start
//!
//! ```no_run
//! use oms_core_service::{
//!     BranchRegistry, Coordinator, CoordinatorConfig, MutationRequest,
//! };
//! use oms_core_service::core::content::Content;
//! use oms_core_service::core::resource::{BranchName, ResourceRef, ResourceType};
//! use oms_core_service::core::timestamp::Timestamp;
//! use oms_core_service::core::version::ChangeType;
//! use oms_core_service::storage::{InMemoryLockBackend, InMemoryOutboxBackend, InMemoryVersionStore};
//! use oms_core_service::validate::ValidationPipeline;
//! use std::collections::HashSet;
//! use std::sync::Arc;
//!
//! fn main() -> oms_core_service::core::Result<()> {
//!     let now = Timestamp::now();
//!     let branches = Arc::new(BranchRegistry::new("system", now));
//!     let coordinator = Coordinator::new(
//!         Arc::new(InMemoryLockBackend::new()),
//!         Arc::new(InMemoryVersionStore::new()),
//!         branches,
//!         Arc::new(InMemoryOutboxBackend::new()),
//!         ValidationPipeline::new(),
//!         CoordinatorConfig::default(),
//!         HashSet::new(),
//!     );
//!
//!     let resource = ResourceRef::new(ResourceType::ObjectType, "User", BranchName::main());
//!     let content = Content::new(serde_json::json!({ "name": "User" }))
//!         .expect("content within limits");
//!     let outcome = coordinator.mutate(
//!         MutationRequest {
//!             resource,
//!             content,
//!             change_type: ChangeType::Created,
//!             actor: "system".to_string(),
//!             if_match: None,
//!             fields_changed: vec!["name".to_string()],
//!             change_summary: Some("initial definition".to_string()),
//!             correlation_id: None,
//!         },
//!         now,
//!     )?;
//!     assert_eq!(outcome.version.version, 1);
//!     Ok(())
//! }
//! ```

pub use oms_branch as branch;
pub use oms_consumer as consumer;
pub use oms_core as core;
pub use oms_coordinator as coordinator;
pub use oms_merge as merge;
pub use oms_outbox as outbox;
pub use oms_storage as storage;
pub use oms_temporal as temporal;
pub use oms_validate as validate;
pub use oms_version as version;

pub use oms_branch::{Branch, BranchRegistry};
pub use oms_coordinator::{Coordinator, CoordinatorConfig, MutationOutcome, MutationRequest};
pub use oms_core::error::{OmsError, Result};
