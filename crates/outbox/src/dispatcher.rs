//! Background dispatch: drains ready envelopes to the event bus, retrying
//! with capped exponential backoff and moving exhausted entries to the
//! dead-letter partition.

use oms_core::timestamp::Timestamp;
use oms_core::Result;
use oms_storage::outbox_backend::{OutboxBackend, StoredEnvelope};
use std::sync::Arc;

/// Publishes envelopes to the event stream.
///
/// Implemented by whatever transport sits behind the outbox (NATS, a
/// message broker, or an in-process bus in tests); the dispatcher itself
/// only knows about retry/backoff/DLQ bookkeeping.
pub trait EventPublisher: Send + Sync {
    /// Publish one envelope. An `Err` means the attempt failed and should
    /// be retried per the backoff policy.
    fn publish(&self, envelope: &StoredEnvelope) -> Result<()>;
}

/// Backoff and retry policy for outbox dispatch.
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Attempts made before an envelope is moved to the dead-letter partition.
    pub max_attempts: u32,
    /// Base backoff delay in seconds, doubled on each attempt up to `max_backoff_secs`.
    pub base_backoff_secs: i64,
    /// Ceiling on the computed backoff delay.
    pub max_backoff_secs: i64,
    /// How many ready envelopes to drain per sweep.
    pub batch_size: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            max_attempts: 5,
            base_backoff_secs: 1,
            max_backoff_secs: 300,
            batch_size: 100,
        }
    }
}

/// Capped exponential backoff: `base * 2^attempts`, clamped to `max`.
pub fn backoff_delay(config: &DispatchConfig, attempts: u32) -> i64 {
    let raw = config.base_backoff_secs.saturating_mul(1i64 << attempts.min(20));
    raw.min(config.max_backoff_secs)
}

/// Drain one batch of ready envelopes, publishing each and updating its
/// dispatch state per the outcome.
pub struct OutboxDispatcher<B: OutboxBackend, P: EventPublisher> {
    backend: Arc<B>,
    publisher: Arc<P>,
    config: DispatchConfig,
}

impl<B: OutboxBackend, P: EventPublisher> OutboxDispatcher<B, P> {
    /// Build a dispatcher over `backend`, publishing through `publisher`.
    pub fn new(backend: Arc<B>, publisher: Arc<P>, config: DispatchConfig) -> Self {
        OutboxDispatcher {
            backend,
            publisher,
            config,
        }
    }

    /// Run one dispatch sweep: attempt every currently-ready envelope,
    /// returning the number successfully published.
    pub fn run_once(&self, now: Timestamp) -> Result<usize> {
        let ready = self.backend.list_ready(now, self.config.batch_size)?;
        let mut published = 0;
        for envelope in ready {
            match self.publisher.publish(&envelope) {
                Ok(()) => {
                    self.backend.mark_dispatched(envelope.sequence)?;
                    published += 1;
                    tracing::debug!(sequence = envelope.sequence, "envelope published");
                }
                Err(err) => {
                    let next_attempts = envelope.attempts + 1;
                    if next_attempts >= self.config.max_attempts {
                        self.backend.mark_dead_letter(envelope.sequence, err.to_string())?;
                        tracing::warn!(sequence = envelope.sequence, error = %err, "envelope moved to dead letter");
                    } else {
                        let delay = backoff_delay(&self.config, next_attempts);
                        let next_attempt_at =
                            Timestamp::from_micros(now.as_micros() + delay.saturating_mul(1_000_000));
                        self.backend
                            .mark_failed(envelope.sequence, err.to_string(), next_attempt_at)?;
                        tracing::warn!(sequence = envelope.sequence, error = %err, delay, "envelope dispatch failed, will retry");
                    }
                }
            }
        }
        Ok(published)
    }

    /// Every envelope currently parked in the dead-letter partition.
    pub fn dead_letter(&self) -> Result<Vec<StoredEnvelope>> {
        self.backend.list_dead_letter()
    }
}
