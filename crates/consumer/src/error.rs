//! Consumer-specific failure modes, converted into [`oms_core::OmsError`]
//! at the point a consumer call returns to its caller.

use oms_core::OmsError;
use thiserror::Error;

/// Failures specific to idempotent event consumption.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsumerError {
    /// The event's `sequence_number` is not the next expected one for this
    /// partition and out-of-order delivery is not configured.
    #[error("sequence gap on consumer '{consumer_id}': expected {expected}, got {actual}")]
    SequenceGap {
        /// The consumer partition.
        consumer_id: String,
        /// The sequence number the consumer was waiting for.
        expected: u64,
        /// The sequence number actually delivered.
        actual: u64,
    },

    /// The consumer has been parked after exhausting `max_retries` on one
    /// event and requires an operator to acknowledge before resuming.
    #[error("consumer '{consumer_id}' is parked awaiting operator ack on event '{event_id}'")]
    Parked {
        /// The consumer partition.
        consumer_id: String,
        /// The event it is stuck on.
        event_id: String,
    },

    /// A handler invocation exceeded its configured timeout.
    #[error("handler timed out after {0:?} on consumer '{1}'")]
    HandlerTimeout(std::time::Duration, String),

    /// A handler returned an application-level failure.
    #[error("handler failed on consumer '{consumer_id}' for event '{event_id}': {reason}")]
    HandlerFailed {
        /// The consumer partition.
        consumer_id: String,
        /// The event that failed.
        event_id: String,
        /// The failure reason.
        reason: String,
    },

    /// No handler is registered for the event's type.
    #[error("no handler registered for event type '{0}'")]
    UnhandledEventType(String),
}

/// Convert a consumer-local failure into the crate-wide error type.
pub fn consumer_error_to_oms_error(err: ConsumerError) -> OmsError {
    match err {
        ConsumerError::HandlerTimeout(d, _) => OmsError::Timeout(d),
        other => OmsError::Internal(other.to_string()),
    }
}
