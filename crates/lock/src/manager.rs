//! The lock manager: hierarchy-checked acquisition, TTL leases, and
//! CAS-based release, backed by an [`oms_storage::LockBackend`].

use crate::hierarchy::{validate_hierarchy, HierarchyViolation, LockMode, LockScope};
use oms_core::timestamp::Timestamp;
use oms_core::{OmsError, Result};
use oms_storage::{LockBackend, LockRecord};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Tuning knobs for lock acquisition, mirroring the defaults of the system
/// this was modeled on: a 300-second lease, 100ms retry spacing, and a
/// 30-second wait budget before giving up.
#[derive(Debug, Clone)]
pub struct LockManagerConfig {
    /// Default lease length for a newly acquired lock.
    pub default_ttl: Duration,
    /// Delay between acquisition retries.
    pub retry_delay: Duration,
    /// Total time to keep retrying before returning [`OmsError::LockConflict`].
    pub wait_timeout: Duration,
}

impl Default for LockManagerConfig {
    fn default() -> Self {
        LockManagerConfig {
            default_ttl: Duration::from_secs(300),
            retry_delay: Duration::from_millis(100),
            wait_timeout: Duration::from_secs(30),
        }
    }
}

/// A token representing a lock this caller currently holds. Presented back
/// to [`LockManager::release`]; dropping it without releasing leaves the
/// lock held until its TTL expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    /// Opaque id identifying this specific acquisition.
    pub lock_id: String,
    /// The key locked.
    pub key: String,
    /// The scope the lock was acquired at.
    pub scope: LockScope,
    /// Shared or exclusive.
    pub mode: LockMode,
}

/// Tracks the locks held within one logical chain of operations (e.g. one
/// mutation request), so hierarchy violations within that chain can be
/// caught before they reach the backend.
///
/// This is the explicit, passed-by-reference analogue of task-local lock
/// tracking: the caller threads one `LockContext` through every lock
/// acquisition that should be checked against the others.
#[derive(Debug, Default)]
pub struct LockContext {
    held: Vec<LockHandle>,
}

impl LockContext {
    /// An empty context, holding no locks.
    pub fn new() -> Self {
        LockContext { held: Vec::new() }
    }

    /// The locks currently tracked as held in this context.
    pub fn held(&self) -> &[LockHandle] {
        &self.held
    }
}

/// Hierarchical, TTL-bound lock manager.
pub struct LockManager<B: LockBackend> {
    backend: Arc<B>,
    config: LockManagerConfig,
}

impl<B: LockBackend> LockManager<B> {
    /// Construct a manager over `backend` with `config`.
    pub fn new(backend: Arc<B>, config: LockManagerConfig) -> Self {
        LockManager { backend, config }
    }

    /// Acquire a lock on `key` at `scope`, in `mode`, on behalf of
    /// `owner_id`.
    ///
    /// Retries every `retry_delay` until `wait_timeout` elapses, at which
    /// point [`OmsError::LockConflict`] is returned. Rejects outright (no
    /// retry) if doing so would violate [`validate_hierarchy`] against
    /// locks already tracked in `ctx`.
    pub fn acquire(
        &self,
        ctx: &mut LockContext,
        key: &str,
        scope: LockScope,
        mode: LockMode,
        owner_id: &str,
    ) -> Result<LockHandle> {
        let held_scopes: Vec<(LockScope, String)> = ctx
            .held
            .iter()
            .map(|h| (h.scope, h.key.clone()))
            .collect();
        validate_hierarchy(scope, &held_scopes).map_err(hierarchy_to_oms_error)?;

        let lock_id = Uuid::new_v4().to_string();
        let deadline = std::time::Instant::now() + self.config.wait_timeout;
        loop {
            let record = LockRecord {
                lock_id: lock_id.clone(),
                key: key.to_string(),
                owner_id: owner_id.to_string(),
                shared: matches!(mode, LockMode::Shared),
                acquired_at: Timestamp::now(),
                ttl_seconds: self.config.default_ttl.as_secs(),
            };
            let acquired = match mode {
                LockMode::Exclusive => self.backend.try_acquire_exclusive(key, record)?,
                LockMode::Shared => self.backend.try_acquire_shared(key, record)?,
            };
            if acquired {
                let handle = LockHandle {
                    lock_id: lock_id.clone(),
                    key: key.to_string(),
                    scope,
                    mode,
                };
                ctx.held.push(handle.clone());
                tracing::debug!(key, scope = %scope, owner = owner_id, "lock acquired");
                return Ok(handle);
            }
            if std::time::Instant::now() >= deadline {
                return Err(OmsError::LockConflict {
                    key: key.to_string(),
                    owner: self
                        .backend
                        .get(key)?
                        .first()
                        .map(|r| r.owner_id.clone())
                        .unwrap_or_else(|| "unknown".to_string()),
                });
            }
            std::thread::sleep(self.config.retry_delay);
        }
    }

    /// Release a previously acquired lock, removing it from `ctx`.
    pub fn release(&self, ctx: &mut LockContext, handle: &LockHandle) -> Result<()> {
        self.backend.release(&handle.key, &handle.lock_id)?;
        ctx.held.retain(|h| h.lock_id != handle.lock_id);
        tracing::debug!(key = %handle.key, "lock released");
        Ok(())
    }

    /// Extend a held lock's lease by `additional`.
    pub fn extend_ttl(&self, handle: &LockHandle, additional: Duration) -> Result<bool> {
        self.backend
            .extend_ttl(&handle.key, &handle.lock_id, additional.as_secs())
    }

    /// Every lock record currently held on `key`.
    pub fn get_lock_info(&self, key: &str) -> Result<Vec<LockRecord>> {
        self.backend.get(key)
    }

    /// Every lock currently held, across all keys — an operator
    /// introspection surface.
    pub fn list_locks(&self) -> Result<Vec<LockRecord>> {
        self.backend.list_all()
    }

    /// Forcibly remove every lock on `key`, bypassing ownership checks. An
    /// operator escape hatch for a stuck lock whose holder has crashed.
    pub fn force_unlock(&self, key: &str) -> Result<Vec<LockRecord>> {
        tracing::warn!(key, "force-unlocking key via operator override");
        self.backend.force_unlock(key)
    }

    /// Sweep and remove every lock whose TTL has elapsed.
    pub fn sweep_expired(&self) -> Result<Vec<LockRecord>> {
        self.backend.sweep_expired(Timestamp::now())
    }
}

fn hierarchy_to_oms_error(violation: HierarchyViolation) -> OmsError {
    OmsError::HierarchyViolation {
        requested: violation.requested.to_string(),
        held: format!("{} ({})", violation.held, violation.held_key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oms_storage::InMemoryLockBackend;

    fn manager() -> LockManager<InMemoryLockBackend> {
        LockManager::new(
            Arc::new(InMemoryLockBackend::new()),
            LockManagerConfig {
                default_ttl: Duration::from_secs(60),
                retry_delay: Duration::from_millis(5),
                wait_timeout: Duration::from_millis(50),
            },
        )
    }

    #[test]
    fn acquire_then_release_round_trips() {
        let mgr = manager();
        let mut ctx = LockContext::new();
        let handle = mgr
            .acquire(&mut ctx, "main", LockScope::Branch, LockMode::Exclusive, "alice")
            .unwrap();
        assert_eq!(ctx.held().len(), 1);
        mgr.release(&mut ctx, &handle).unwrap();
        assert!(ctx.held().is_empty());
    }

    #[test]
    fn hierarchy_violation_is_rejected_without_touching_backend() {
        let mgr = manager();
        let mut ctx = LockContext::new();
        mgr.acquire(
            &mut ctx,
            "main/object_type/User",
            LockScope::Resource,
            LockMode::Exclusive,
            "alice",
        )
        .unwrap();
        let err = mgr
            .acquire(&mut ctx, "main", LockScope::Branch, LockMode::Exclusive, "alice")
            .unwrap_err();
        assert!(matches!(err, OmsError::HierarchyViolation { .. }));
    }

    #[test]
    fn exclusive_conflict_times_out() {
        let mgr = manager();
        let mut ctx_a = LockContext::new();
        let mut ctx_b = LockContext::new();
        mgr.acquire(&mut ctx_a, "k", LockScope::Resource, LockMode::Exclusive, "alice")
            .unwrap();
        let err = mgr
            .acquire(&mut ctx_b, "k", LockScope::Resource, LockMode::Exclusive, "bob")
            .unwrap_err();
        assert!(matches!(err, OmsError::LockConflict { .. }));
    }

    #[test]
    fn force_unlock_clears_a_stuck_lock() {
        let mgr = manager();
        let mut ctx = LockContext::new();
        mgr.acquire(&mut ctx, "k", LockScope::Resource, LockMode::Exclusive, "alice")
            .unwrap();
        let removed = mgr.force_unlock("k").unwrap();
        assert_eq!(removed.len(), 1);
        assert!(mgr.get_lock_info("k").unwrap().is_empty());
    }
}
