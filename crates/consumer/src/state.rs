//! Per-partition consumer state: health counters plus the commit-hash chain
//! binding every successfully handled event to the projection it produced.

use oms_core::hash::content_hash;
use oms_core::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// State owned by one consumer partition (one `consumer_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerState {
    /// Identifies the partition. Two consumers sharing an id must never
    /// run concurrently.
    pub consumer_id: String,
    /// Version of the handler code that last advanced this state, so a
    /// rolling deploy can detect it is resuming behind newer logic.
    pub consumer_version: String,
    /// The last event this consumer successfully applied (not counting
    /// duplicates).
    pub last_processed_event_id: Option<String>,
    /// The last `sequence_number` accepted, establishing the next expected
    /// value for gap detection.
    pub last_sequence_number: u64,
    /// Count of events that advanced the projection.
    pub events_processed: u64,
    /// Count of events recognized as duplicates and skipped.
    pub events_skipped: u64,
    /// Count of handler invocations that failed.
    pub events_failed: u64,
    /// Consecutive handler failures since the last success, reset on any
    /// successful handle.
    pub consecutive_failures: u32,
    /// Chained hash binding this state to every event that produced it.
    pub state_commit_hash: String,
    /// When this state was last durably checkpointed.
    pub last_checkpoint_at: Option<Timestamp>,
    /// The consumer's own projection of the event stream, as JSON.
    pub projection: Value,
}

impl ConsumerState {
    /// A fresh, empty state for a new partition.
    pub fn new(consumer_id: impl Into<String>, consumer_version: impl Into<String>) -> Self {
        ConsumerState {
            consumer_id: consumer_id.into(),
            consumer_version: consumer_version.into(),
            last_processed_event_id: None,
            last_sequence_number: 0,
            events_processed: 0,
            events_skipped: 0,
            events_failed: 0,
            consecutive_failures: 0,
            state_commit_hash: String::new(),
            last_checkpoint_at: None,
            projection: json!({}),
        }
    }

    /// Whether this partition is parked awaiting operator acknowledgment
    /// after exhausting its retry budget.
    pub fn is_parked(&self, max_retries: u32) -> bool {
        self.consecutive_failures >= max_retries
    }

    /// Operator acknowledgment: clears the failure streak so processing can
    /// resume. Does not retry the failed event; the operator is expected to
    /// have already resolved or skipped it out of band.
    pub fn acknowledge(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Chain `event_id` and the new projection's content hash onto the
    /// current `state_commit_hash`, returning the next chain value without
    /// mutating `self`.
    pub fn next_commit_hash(&self, event_id: &str, new_projection: &Value) -> String {
        let new_state_content_hash = content_hash(new_projection);
        content_hash(&json!({
            "old": self.state_commit_hash,
            "event_id": event_id,
            "state": new_state_content_hash,
        }))
    }
}
