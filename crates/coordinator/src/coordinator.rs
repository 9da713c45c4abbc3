//! The coordinator: the single entry point that owns every component
//! needed to apply a mutation safely across locking, versioning,
//! validation, branching, and the outbox.

use crate::config::CoordinatorConfig;
use oms_branch::BranchRegistry;
use oms_lock::LockManager;
use oms_storage::{LockBackend, OutboxBackend, VersionStore};
use oms_validate::ValidationPipeline;
use oms_version::VersionService;
use std::collections::HashSet;
use std::sync::Arc;

/// Wires the per-resource mutation pipeline (C10) together. Generic over
/// the lock and outbox storage backends so callers can swap in-memory or
/// persistent implementations without touching the pipeline itself.
pub struct Coordinator<L: LockBackend, V: VersionStore, O: OutboxBackend> {
    pub(crate) lock_manager: LockManager<L>,
    pub(crate) version_service: VersionService<V>,
    pub(crate) branches: Arc<BranchRegistry>,
    pub(crate) outbox: Arc<O>,
    pub(crate) validators: ValidationPipeline,
    pub(crate) config: CoordinatorConfig,
    pub(crate) masked_fields: HashSet<String>,
}

impl<L: LockBackend, V: VersionStore, O: OutboxBackend> Coordinator<L, V, O> {
    /// Assemble a coordinator from its component services.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lock_backend: Arc<L>,
        version_store: Arc<V>,
        branches: Arc<BranchRegistry>,
        outbox: Arc<O>,
        validators: ValidationPipeline,
        config: CoordinatorConfig,
        masked_fields: HashSet<String>,
    ) -> Self {
        let lock_manager = LockManager::new(lock_backend, config.lock.to_lock_manager_config());
        let version_service = VersionService::new(version_store);
        Coordinator { lock_manager, version_service, branches, outbox, validators, config, masked_fields }
    }

    /// The branch registry this coordinator mutates. Exposed read-only so
    /// callers (the CLI, the merge-apply path) can resolve branch state
    /// without duplicating a registry handle.
    pub fn branches(&self) -> &Arc<BranchRegistry> {
        &self.branches
    }

    /// The current head version of a resource, if one has ever been
    /// written. Exposed so callers can assemble real [`oms_merge::ResourceState`]
    /// slices (a merge's base/left/right sides) from this coordinator's own
    /// version store, rather than from a side channel.
    pub fn resource_version(
        &self,
        resource: &oms_core::resource::ResourceRef,
    ) -> oms_core::Result<Option<oms_core::version::ResourceVersion>> {
        self.version_service.get_resource_version(resource)
    }
}
