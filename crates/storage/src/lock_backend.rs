//! Raw lock storage: NX-style exclusive locks and counted shared locks,
//! both TTL-bound.
//!
//! This module is deliberately policy-free — hierarchy validation, retry
//! backoff, and task-local lock tracking belong to the lock manager built
//! on top of it. This is just the compare-and-swap primitive it needs.

use dashmap::DashMap;
use oms_core::timestamp::Timestamp;
use oms_core::Result;
use std::collections::BTreeMap;

/// A single held lock.
#[derive(Debug, Clone, PartialEq)]
pub struct LockRecord {
    /// Opaque id identifying the specific acquisition (used for CAS release).
    pub lock_id: String,
    /// The resource key this lock guards.
    pub key: String,
    /// Identity of whoever holds the lock.
    pub owner_id: String,
    /// Whether this is a shared (read) lock; exclusive otherwise.
    pub shared: bool,
    /// When the lock was acquired.
    pub acquired_at: Timestamp,
    /// Lease length, in seconds, from `acquired_at`.
    pub ttl_seconds: u64,
}

impl LockRecord {
    /// Whether this record's TTL has elapsed as of `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        let expires_at = self
            .acquired_at
            .as_datetime()
            .checked_add_signed(chrono::Duration::seconds(self.ttl_seconds as i64));
        match expires_at {
            Some(expiry) => now.as_datetime() >= expiry,
            None => false,
        }
    }
}

/// Raw lock storage backend.
pub trait LockBackend: Send + Sync {
    /// Attempt to acquire an exclusive lock on `key` (`SET NX PX` semantics).
    /// Returns `true` if acquired, `false` if already held by someone else.
    fn try_acquire_exclusive(&self, key: &str, record: LockRecord) -> Result<bool>;

    /// Acquire a shared lock on `key`. Fails (`Ok(false)`) if an exclusive
    /// lock is currently held on the key.
    fn try_acquire_shared(&self, key: &str, record: LockRecord) -> Result<bool>;

    /// Release a lock by `(key, lock_id)`, compare-and-swap style: only the
    /// holder that presents the matching `lock_id` can release it. Returns
    /// `true` if a lock was actually removed.
    fn release(&self, key: &str, lock_id: &str) -> Result<bool>;

    /// Extend the TTL of a currently held lock. Returns `false` if no lock
    /// with that `(key, lock_id)` is held.
    fn extend_ttl(&self, key: &str, lock_id: &str, additional_seconds: u64) -> Result<bool>;

    /// All lock records currently held on `key` (zero or one for exclusive,
    /// zero or more for shared).
    fn get(&self, key: &str) -> Result<Vec<LockRecord>>;

    /// Every lock currently held, across all keys.
    fn list_all(&self) -> Result<Vec<LockRecord>>;

    /// Forcibly remove every lock on `key`, bypassing ownership. An
    /// operator escape hatch, not part of normal lock release.
    fn force_unlock(&self, key: &str) -> Result<Vec<LockRecord>>;

    /// Remove and return every lock whose TTL has elapsed as of `now`.
    fn sweep_expired(&self, now: Timestamp) -> Result<Vec<LockRecord>>;
}

#[derive(Debug, Default)]
struct KeyState {
    exclusive: Option<LockRecord>,
    shared: BTreeMap<String, LockRecord>,
}

/// `DashMap`-backed in-memory [`LockBackend`].
#[derive(Debug, Default)]
pub struct InMemoryLockBackend {
    keys: DashMap<String, KeyState>,
}

impl InMemoryLockBackend {
    /// An empty backend.
    pub fn new() -> Self {
        InMemoryLockBackend {
            keys: DashMap::new(),
        }
    }
}

impl LockBackend for InMemoryLockBackend {
    fn try_acquire_exclusive(&self, key: &str, record: LockRecord) -> Result<bool> {
        let mut state = self.keys.entry(key.to_string()).or_default();
        if state.exclusive.is_some() || !state.shared.is_empty() {
            return Ok(false);
        }
        state.exclusive = Some(record);
        Ok(true)
    }

    fn try_acquire_shared(&self, key: &str, record: LockRecord) -> Result<bool> {
        let mut state = self.keys.entry(key.to_string()).or_default();
        if state.exclusive.is_some() {
            return Ok(false);
        }
        state.shared.insert(record.lock_id.clone(), record);
        Ok(true)
    }

    fn release(&self, key: &str, lock_id: &str) -> Result<bool> {
        let Some(mut state) = self.keys.get_mut(key) else {
            return Ok(false);
        };
        if let Some(exclusive) = &state.exclusive {
            if exclusive.lock_id == lock_id {
                state.exclusive = None;
                return Ok(true);
            }
        }
        Ok(state.shared.remove(lock_id).is_some())
    }

    fn extend_ttl(&self, key: &str, lock_id: &str, additional_seconds: u64) -> Result<bool> {
        let Some(mut state) = self.keys.get_mut(key) else {
            return Ok(false);
        };
        if let Some(exclusive) = &mut state.exclusive {
            if exclusive.lock_id == lock_id {
                exclusive.ttl_seconds += additional_seconds;
                return Ok(true);
            }
        }
        if let Some(shared) = state.shared.get_mut(lock_id) {
            shared.ttl_seconds += additional_seconds;
            return Ok(true);
        }
        Ok(false)
    }

    fn get(&self, key: &str) -> Result<Vec<LockRecord>> {
        let Some(state) = self.keys.get(key) else {
            return Ok(Vec::new());
        };
        let mut records: Vec<LockRecord> = state.shared.values().cloned().collect();
        if let Some(exclusive) = &state.exclusive {
            records.push(exclusive.clone());
        }
        Ok(records)
    }

    fn list_all(&self) -> Result<Vec<LockRecord>> {
        let mut all = Vec::new();
        for entry in self.keys.iter() {
            all.extend(entry.value().shared.values().cloned());
            if let Some(exclusive) = &entry.value().exclusive {
                all.push(exclusive.clone());
            }
        }
        Ok(all)
    }

    fn force_unlock(&self, key: &str) -> Result<Vec<LockRecord>> {
        let Some((_, mut state)) = self.keys.remove(key) else {
            return Ok(Vec::new());
        };
        let mut removed: Vec<LockRecord> = std::mem::take(&mut state.shared)
            .into_iter()
            .map(|(_, v)| v)
            .collect();
        if let Some(exclusive) = state.exclusive.take() {
            removed.push(exclusive);
        }
        Ok(removed)
    }

    fn sweep_expired(&self, now: Timestamp) -> Result<Vec<LockRecord>> {
        let mut expired = Vec::new();
        for mut entry in self.keys.iter_mut() {
            if let Some(exclusive) = &entry.exclusive {
                if exclusive.is_expired(now) {
                    expired.push(exclusive.clone());
                    entry.exclusive = None;
                }
            }
            let expired_shared: Vec<String> = entry
                .shared
                .values()
                .filter(|r| r.is_expired(now))
                .map(|r| r.lock_id.clone())
                .collect();
            for id in expired_shared {
                if let Some(r) = entry.shared.remove(&id) {
                    expired.push(r);
                }
            }
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(lock_id: &str, owner: &str, shared: bool, ttl: u64) -> LockRecord {
        LockRecord {
            lock_id: lock_id.into(),
            key: "branch/main".into(),
            owner_id: owner.into(),
            shared,
            acquired_at: Timestamp::now(),
            ttl_seconds: ttl,
        }
    }

    #[test]
    fn exclusive_lock_excludes_everything() {
        let backend = InMemoryLockBackend::new();
        assert!(backend
            .try_acquire_exclusive("k", record("a", "alice", false, 30))
            .unwrap());
        assert!(!backend
            .try_acquire_exclusive("k", record("b", "bob", false, 30))
            .unwrap());
        assert!(!backend
            .try_acquire_shared("k", record("c", "carol", true, 30))
            .unwrap());
    }

    #[test]
    fn shared_locks_coexist() {
        let backend = InMemoryLockBackend::new();
        assert!(backend
            .try_acquire_shared("k", record("a", "alice", true, 30))
            .unwrap());
        assert!(backend
            .try_acquire_shared("k", record("b", "bob", true, 30))
            .unwrap());
        assert_eq!(backend.get("k").unwrap().len(), 2);
    }

    #[test]
    fn release_requires_matching_lock_id() {
        let backend = InMemoryLockBackend::new();
        backend
            .try_acquire_exclusive("k", record("a", "alice", false, 30))
            .unwrap();
        assert!(!backend.release("k", "wrong-id").unwrap());
        assert!(backend.release("k", "a").unwrap());
        assert!(backend
            .try_acquire_exclusive("k", record("b", "bob", false, 30))
            .unwrap());
    }

    #[test]
    fn sweep_expired_removes_stale_locks() {
        let backend = InMemoryLockBackend::new();
        let mut stale = record("a", "alice", false, 1);
        stale.acquired_at = Timestamp::from_micros(0);
        backend.try_acquire_exclusive("k", stale).unwrap();
        let removed = backend.sweep_expired(Timestamp::now()).unwrap();
        assert_eq!(removed.len(), 1);
        assert!(backend.get("k").unwrap().is_empty());
    }
}
