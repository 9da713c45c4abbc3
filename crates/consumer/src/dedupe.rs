//! The `(consumer_id, event_id) -> result_summary` dedupe table that gives
//! the framework its at-most-once-commit guarantee.

use oms_core::timestamp::Timestamp;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Default dedupe retention: re-delivery beyond this window is no longer
/// recognized as a duplicate and will be re-applied as new.
pub const DEFAULT_DEDUPE_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// The recorded outcome of handling one event, replayed verbatim on
/// duplicate delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResult {
    /// Whether the handler succeeded.
    pub success: bool,
    /// The state commit hash produced by this event (unchanged by replay).
    pub state_commit_hash: String,
    /// The handler's result payload.
    pub result: Value,
    /// Set to `true` only on the replay path, never on the original call.
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub was_duplicate: bool,
}

struct Entry {
    result: EventResult,
    recorded_at: Timestamp,
}

/// An append-mostly table recording one [`EventResult`] per
/// `(consumer_id, event_id)`, expiring entries older than its TTL.
pub struct DedupeTable {
    ttl_secs: i64,
    entries: RwLock<HashMap<(String, String), Entry>>,
}

impl DedupeTable {
    /// A dedupe table retaining entries for `ttl_secs` seconds.
    pub fn new(ttl_secs: i64) -> Self {
        DedupeTable {
            ttl_secs,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a prior result for `(consumer_id, event_id)`, dropping it
    /// (treating it as expired) if older than the TTL.
    pub fn lookup(&self, consumer_id: &str, event_id: &str, now: Timestamp) -> Option<EventResult> {
        let key = (consumer_id.to_string(), event_id.to_string());
        let expired = {
            let guard = self.entries.read();
            match guard.get(&key) {
                Some(entry) => now.as_micros() - entry.recorded_at.as_micros()
                    > self.ttl_secs * 1_000_000,
                None => return None,
            }
        };
        if expired {
            self.entries.write().remove(&key);
            return None;
        }
        self.entries.read().get(&key).map(|e| e.result.clone())
    }

    /// Record the result of handling `(consumer_id, event_id)`.
    pub fn record(&self, consumer_id: &str, event_id: &str, result: EventResult, now: Timestamp) {
        self.entries.write().insert(
            (consumer_id.to_string(), event_id.to_string()),
            Entry { result, recorded_at: now },
        );
    }

    /// Drop every entry older than the TTL relative to `now`. Intended to
    /// be called periodically rather than on every lookup, to bound table
    /// growth independent of read traffic.
    pub fn sweep_expired(&self, now: Timestamp) -> usize {
        let mut guard = self.entries.write();
        let before = guard.len();
        guard.retain(|_, entry| now.as_micros() - entry.recorded_at.as_micros() <= self.ttl_secs * 1_000_000);
        before - guard.len()
    }

    /// Number of entries currently tracked, expired or not.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_result(hash: &str) -> EventResult {
        EventResult {
            success: true,
            state_commit_hash: hash.to_string(),
            result: json!({"ok": true}),
            was_duplicate: false,
        }
    }

    #[test]
    fn records_and_looks_up_within_ttl() {
        let table = DedupeTable::new(DEFAULT_DEDUPE_TTL_SECS);
        let now = Timestamp::from_micros(0);
        table.record("c1", "evt-1", sample_result("h1"), now);
        let later = Timestamp::from_micros(1_000_000);
        let found = table.lookup("c1", "evt-1", later).unwrap();
        assert_eq!(found.state_commit_hash, "h1");
    }

    #[test]
    fn entries_expire_after_ttl() {
        let table = DedupeTable::new(60);
        let now = Timestamp::from_micros(0);
        table.record("c1", "evt-1", sample_result("h1"), now);
        let way_later = Timestamp::from_micros(120 * 1_000_000);
        assert!(table.lookup("c1", "evt-1", way_later).is_none());
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let table = DedupeTable::new(60);
        table.record("c1", "evt-1", sample_result("h1"), Timestamp::from_micros(0));
        table.record("c1", "evt-2", sample_result("h2"), Timestamp::from_micros(200 * 1_000_000));
        let removed = table.sweep_expired(Timestamp::from_micros(200 * 1_000_000));
        assert_eq!(removed, 1);
        assert_eq!(table.len(), 1);
    }
}
