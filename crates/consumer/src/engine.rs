//! The idempotent consumer engine: ties the dedupe table, ordering check,
//! handler registry, and state chain together into one `process_event`
//! entry point per partition.

use crate::dedupe::{DedupeTable, EventResult, DEFAULT_DEDUPE_TTL_SECS};
use crate::error::ConsumerError;
use crate::handler::{ConsumerEvent, HandlerRegistry};
use crate::state::ConsumerState;
use oms_core::timestamp::Timestamp;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Tuning knobs for one consumer partition.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Consecutive handler failures on one event before the partition
    /// parks awaiting operator acknowledgment.
    pub max_retries: u32,
    /// Wall-clock budget for one handler invocation.
    pub handler_timeout: Duration,
    /// Events between durable checkpoints of consumer state.
    pub checkpoint_interval: u64,
    /// Dedupe table retention.
    pub dedupe_ttl_secs: i64,
    /// If `true`, a sequence gap advances anyway rather than being
    /// rejected; used for backfills where some events are deliberately
    /// filtered upstream.
    pub allow_gaps: bool,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        ConsumerConfig {
            max_retries: 3,
            handler_timeout: Duration::from_secs(5),
            checkpoint_interval: 50,
            dedupe_ttl_secs: DEFAULT_DEDUPE_TTL_SECS,
            allow_gaps: false,
        }
    }
}

/// Read-only health and throughput snapshot, mirroring an operator-facing
/// stats surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerInfo {
    /// The partition id.
    pub consumer_id: String,
    /// The handler code version currently applying events.
    pub consumer_version: String,
    /// Count of events that advanced the projection.
    pub events_processed: u64,
    /// Count of events recognized as duplicates.
    pub events_skipped: u64,
    /// Count of handler invocations that failed.
    pub events_failed: u64,
    /// The last event id applied (not counting duplicates).
    pub last_processed_event_id: Option<String>,
    /// Whether the partition is currently accepting new events.
    pub is_healthy: bool,
    /// Consecutive failures since the last success.
    pub error_count: u32,
    /// The current chained state hash.
    pub state_commit_hash: String,
}

/// One partition of the idempotent consumer framework: owns its state,
/// its dedupe table, and the handlers registered for the event types it
/// projects.
pub struct IdempotentConsumer {
    consumer_id: String,
    config: ConsumerConfig,
    state: RwLock<ConsumerState>,
    dedupe: DedupeTable,
    handlers: HandlerRegistry,
}

impl IdempotentConsumer {
    /// A fresh consumer partition with no prior state.
    pub fn new(
        consumer_id: impl Into<String>,
        consumer_version: impl Into<String>,
        config: ConsumerConfig,
        handlers: HandlerRegistry,
    ) -> Self {
        let consumer_id = consumer_id.into();
        let state = ConsumerState::new(consumer_id.clone(), consumer_version);
        IdempotentConsumer {
            consumer_id,
            dedupe: DedupeTable::new(config.dedupe_ttl_secs),
            config,
            state: RwLock::new(state),
            handlers,
        }
    }

    /// Resume a partition from previously checkpointed state.
    pub fn resume(config: ConsumerConfig, state: ConsumerState, handlers: HandlerRegistry) -> Self {
        IdempotentConsumer {
            consumer_id: state.consumer_id.clone(),
            dedupe: DedupeTable::new(config.dedupe_ttl_secs),
            config,
            state: RwLock::new(state),
            handlers,
        }
    }

    /// Process one event, returning its result. Re-delivery of an event
    /// already recorded in the dedupe table returns the prior result with
    /// `was_duplicate = true` and performs no further state change.
    pub fn process_event(&self, event: ConsumerEvent, now: Timestamp) -> Result<EventResult, ConsumerError> {
        if let Some(mut prior) = self.dedupe.lookup(&self.consumer_id, &event.event_id, now) {
            prior.was_duplicate = true;
            self.state.write().events_skipped += 1;
            tracing::warn!(
                consumer_id = %self.consumer_id,
                event_id = %event.event_id,
                "duplicate event delivery"
            );
            return Ok(prior);
        }

        {
            let state = self.state.read();
            if state.is_parked(self.config.max_retries) {
                return Err(ConsumerError::Parked {
                    consumer_id: self.consumer_id.clone(),
                    event_id: event.event_id.clone(),
                });
            }
            let expected = state.last_sequence_number + 1;
            if !self.config.allow_gaps && event.sequence_number != expected {
                return Err(ConsumerError::SequenceGap {
                    consumer_id: self.consumer_id.clone(),
                    expected,
                    actual: event.sequence_number,
                });
            }
        }

        let Some(handler) = self.handlers.get(&event.event_type) else {
            return Err(ConsumerError::UnhandledEventType(event.event_type.clone()));
        };

        let projection = self.state.read().projection.clone();
        let started = Instant::now();
        let outcome = handler.handle(&event, &projection);
        let elapsed = started.elapsed();

        if elapsed > self.config.handler_timeout {
            self.record_failure(&event.event_id);
            self.state.write().events_failed += 1;
            return Err(ConsumerError::HandlerTimeout(elapsed, self.consumer_id.clone()));
        }

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                self.record_failure(&event.event_id);
                self.state.write().events_failed += 1;
                tracing::error!(
                    consumer_id = %self.consumer_id,
                    event_id = %event.event_id,
                    error = %err,
                    "handler failed"
                );
                return Err(err);
            }
        };

        let result = {
            let mut state = self.state.write();
            let new_commit_hash = state.next_commit_hash(&event.event_id, &outcome.new_projection);
            state.projection = outcome.new_projection;
            state.state_commit_hash = new_commit_hash.clone();
            state.last_sequence_number = event.sequence_number;
            state.last_processed_event_id = Some(event.event_id.clone());
            state.events_processed += 1;
            state.consecutive_failures = 0;
            if state.events_processed % self.config.checkpoint_interval == 0 {
                state.last_checkpoint_at = Some(now);
                tracing::info!(consumer_id = %self.consumer_id, events_processed = state.events_processed, "checkpoint");
            }
            EventResult {
                success: true,
                state_commit_hash: new_commit_hash,
                result: outcome.result,
                was_duplicate: false,
            }
        };

        self.dedupe.record(&self.consumer_id, &event.event_id, result.clone(), now);
        tracing::info!(consumer_id = %self.consumer_id, event_id = %event.event_id, "event applied");
        Ok(result)
    }

    /// Process a batch of events in order, stopping at the first error.
    pub fn process_batch(&self, events: Vec<ConsumerEvent>, now: Timestamp) -> Result<Vec<EventResult>, ConsumerError> {
        let mut results = Vec::with_capacity(events.len());
        for event in events {
            results.push(self.process_event(event, now)?);
        }
        Ok(results)
    }

    /// Operator acknowledgment: clear a parked partition's failure streak
    /// so it resumes accepting new events. Does not retry the event that
    /// parked it.
    pub fn acknowledge(&self) {
        self.state.write().acknowledge();
    }

    /// Drop dedupe entries older than the configured TTL.
    pub fn sweep_dedupe(&self, now: Timestamp) -> usize {
        self.dedupe.sweep_expired(now)
    }

    /// A snapshot of this partition's current state, for checkpointing.
    pub fn snapshot_state(&self) -> ConsumerState {
        self.state.read().clone()
    }

    /// An operator-facing health and throughput summary.
    pub fn info(&self) -> ConsumerInfo {
        let state = self.state.read();
        ConsumerInfo {
            consumer_id: state.consumer_id.clone(),
            consumer_version: state.consumer_version.clone(),
            events_processed: state.events_processed,
            events_skipped: state.events_skipped,
            events_failed: state.events_failed,
            last_processed_event_id: state.last_processed_event_id.clone(),
            is_healthy: !state.is_parked(self.config.max_retries),
            error_count: state.consecutive_failures,
            state_commit_hash: state.state_commit_hash.clone(),
        }
    }

    fn record_failure(&self, _event_id: &str) {
        self.state.write().consecutive_failures += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{ConsumerHandler, HandlerOutcome};
    use serde_json::json;

    struct CountingHandler;
    impl ConsumerHandler for CountingHandler {
        fn handle(&self, event: &ConsumerEvent, projection: &serde_json::Value) -> Result<HandlerOutcome, ConsumerError> {
            let mut count = projection.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
            count += 1;
            Ok(HandlerOutcome {
                new_projection: json!({"count": count}),
                result: json!({"event_id": event.event_id, "count": count}),
            })
        }
    }

    struct FailingHandler;
    impl ConsumerHandler for FailingHandler {
        fn handle(&self, event: &ConsumerEvent, _projection: &serde_json::Value) -> Result<HandlerOutcome, ConsumerError> {
            Err(ConsumerError::HandlerFailed {
                consumer_id: "c".into(),
                event_id: event.event_id.clone(),
                reason: "boom".into(),
            })
        }
    }

    fn event(id: &str, seq: u64) -> ConsumerEvent {
        ConsumerEvent {
            event_id: id.to_string(),
            event_type: "object_type.created".to_string(),
            sequence_number: seq,
            payload: json!({}),
        }
    }

    fn consumer_with(handler: Box<dyn ConsumerHandler>, config: ConsumerConfig) -> IdempotentConsumer {
        let mut registry = HandlerRegistry::new();
        registry.register("object_type.created", handler);
        IdempotentConsumer::new("c1", "1.0.0", config, registry)
    }

    #[test]
    fn duplicate_delivery_replays_prior_result_without_reapplying() {
        let consumer = consumer_with(Box::new(CountingHandler), ConsumerConfig::default());
        let now = Timestamp::from_micros(0);
        let first = consumer.process_event(event("e1", 1), now).unwrap();
        assert!(!first.was_duplicate);
        assert_eq!(consumer.info().events_processed, 1);

        let second = consumer.process_event(event("e1", 1), now).unwrap();
        assert!(second.was_duplicate);
        assert_eq!(second.state_commit_hash, first.state_commit_hash);
        assert_eq!(consumer.info().events_processed, 1);
        assert_eq!(consumer.info().events_skipped, 1);
    }

    #[test]
    fn sequence_gap_is_rejected() {
        let consumer = consumer_with(Box::new(CountingHandler), ConsumerConfig::default());
        let now = Timestamp::from_micros(0);
        consumer.process_event(event("e1", 1), now).unwrap();
        let err = consumer.process_event(event("e3", 3), now).unwrap_err();
        assert!(matches!(err, ConsumerError::SequenceGap { expected: 2, actual: 3, .. }));
    }

    #[test]
    fn parks_after_max_retries_and_resumes_on_ack() {
        let config = ConsumerConfig { max_retries: 2, ..Default::default() };
        let consumer = consumer_with(Box::new(FailingHandler), config);
        let now = Timestamp::from_micros(0);
        assert!(consumer.process_event(event("e1", 1), now).is_err());
        assert!(consumer.process_event(event("e2", 2), now).is_err());

        let err = consumer.process_event(event("e3", 3), now).unwrap_err();
        assert!(matches!(err, ConsumerError::Parked { .. }));

        consumer.acknowledge();
        assert!(consumer.info().is_healthy);
    }

    #[test]
    fn unhandled_event_type_is_rejected() {
        let consumer = consumer_with(Box::new(CountingHandler), ConsumerConfig::default());
        let mut unhandled = event("e1", 1);
        unhandled.event_type = "link_type.created".to_string();
        let err = consumer.process_event(unhandled, Timestamp::from_micros(0)).unwrap_err();
        assert!(matches!(err, ConsumerError::UnhandledEventType(_)));
    }
}
