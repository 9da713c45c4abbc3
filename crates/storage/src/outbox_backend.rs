//! Raw storage for the transactional outbox: a sequenced, append-only log
//! of event payloads awaiting dispatch.

use dashmap::DashMap;
use oms_core::timestamp::Timestamp;
use oms_core::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Dispatch status of a stored envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStatus {
    /// Not yet dispatched.
    Pending,
    /// Successfully dispatched to every subscriber.
    Dispatched,
    /// Dispatch failed; will be retried at `next_attempt_at`.
    Failed,
    /// Exceeded `max_attempts`; parked for operator review.
    DeadLetter,
}

/// A stored outbox entry: the raw event payload plus its dispatch state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEnvelope {
    /// Monotonic sequence number, assigned on append.
    pub sequence: u64,
    /// The serialized event envelope (a CloudEvents-shaped document).
    pub payload: serde_json::Value,
    /// Current dispatch status.
    pub status: EnvelopeStatus,
    /// Number of dispatch attempts made so far.
    pub attempts: u32,
    /// When this entry was appended.
    pub created_at: Timestamp,
    /// Earliest time the next dispatch attempt may run.
    pub next_attempt_at: Timestamp,
    /// The most recent dispatch error, if any.
    pub last_error: Option<String>,
}

/// Raw outbox storage backend.
pub trait OutboxBackend: Send + Sync {
    /// Append a new envelope payload, assigning it the next sequence number.
    fn append(&self, payload: serde_json::Value, now: Timestamp) -> Result<u64>;

    /// Fetch a single entry by sequence number.
    fn get(&self, sequence: u64) -> Result<Option<StoredEnvelope>>;

    /// Entries eligible for dispatch right now: `Pending`, or `Failed` with
    /// `next_attempt_at <= now`. Ordered by sequence number, capped at
    /// `limit`.
    fn list_ready(&self, now: Timestamp, limit: usize) -> Result<Vec<StoredEnvelope>>;

    /// Mark an entry dispatched.
    fn mark_dispatched(&self, sequence: u64) -> Result<bool>;

    /// Record a failed dispatch attempt and schedule the next retry.
    fn mark_failed(&self, sequence: u64, error: String, next_attempt_at: Timestamp) -> Result<bool>;

    /// Move an entry to the dead-letter state.
    fn mark_dead_letter(&self, sequence: u64, error: String) -> Result<bool>;

    /// Every entry currently in the dead-letter state.
    fn list_dead_letter(&self) -> Result<Vec<StoredEnvelope>>;
}

/// In-memory [`OutboxBackend`].
#[derive(Debug, Default)]
pub struct InMemoryOutboxBackend {
    next_sequence: AtomicU64,
    entries: DashMap<u64, RwLock<StoredEnvelope>>,
}

impl InMemoryOutboxBackend {
    /// An empty backend, sequence numbers starting at 1.
    pub fn new() -> Self {
        InMemoryOutboxBackend {
            next_sequence: AtomicU64::new(1),
            entries: DashMap::new(),
        }
    }
}

impl OutboxBackend for InMemoryOutboxBackend {
    fn append(&self, payload: serde_json::Value, now: Timestamp) -> Result<u64> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(
            sequence,
            RwLock::new(StoredEnvelope {
                sequence,
                payload,
                status: EnvelopeStatus::Pending,
                attempts: 0,
                created_at: now,
                next_attempt_at: now,
                last_error: None,
            }),
        );
        Ok(sequence)
    }

    fn get(&self, sequence: u64) -> Result<Option<StoredEnvelope>> {
        Ok(self.entries.get(&sequence).map(|e| e.read().clone()))
    }

    fn list_ready(&self, now: Timestamp, limit: usize) -> Result<Vec<StoredEnvelope>> {
        let mut ready: Vec<StoredEnvelope> = self
            .entries
            .iter()
            .map(|entry| entry.value().read().clone())
            .filter(|e| {
                matches!(e.status, EnvelopeStatus::Pending)
                    || (matches!(e.status, EnvelopeStatus::Failed) && e.next_attempt_at <= now)
            })
            .collect();
        ready.sort_by_key(|e| e.sequence);
        ready.truncate(limit);
        Ok(ready)
    }

    fn mark_dispatched(&self, sequence: u64) -> Result<bool> {
        let Some(entry) = self.entries.get(&sequence) else {
            return Ok(false);
        };
        let mut guard = entry.write();
        guard.status = EnvelopeStatus::Dispatched;
        guard.attempts += 1;
        Ok(true)
    }

    fn mark_failed(&self, sequence: u64, error: String, next_attempt_at: Timestamp) -> Result<bool> {
        let Some(entry) = self.entries.get(&sequence) else {
            return Ok(false);
        };
        let mut guard = entry.write();
        guard.status = EnvelopeStatus::Failed;
        guard.attempts += 1;
        guard.next_attempt_at = next_attempt_at;
        guard.last_error = Some(error);
        Ok(true)
    }

    fn mark_dead_letter(&self, sequence: u64, error: String) -> Result<bool> {
        let Some(entry) = self.entries.get(&sequence) else {
            return Ok(false);
        };
        let mut guard = entry.write();
        guard.status = EnvelopeStatus::DeadLetter;
        guard.attempts += 1;
        guard.last_error = Some(error);
        Ok(true)
    }

    fn list_dead_letter(&self) -> Result<Vec<StoredEnvelope>> {
        let mut dead: Vec<StoredEnvelope> = self
            .entries
            .iter()
            .map(|entry| entry.value().read().clone())
            .filter(|e| matches!(e.status, EnvelopeStatus::DeadLetter))
            .collect();
        dead.sort_by_key(|e| e.sequence);
        Ok(dead)
    }
}
