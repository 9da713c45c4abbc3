//! Transactional outbox (C7): CloudEvents-shaped envelopes, field masking,
//! and retry/backoff/dead-letter dispatch on top of [`oms_storage`]'s raw
//! outbox log.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dispatcher;
pub mod envelope;
pub mod masking;

pub use dispatcher::{backoff_delay, DispatchConfig, EventPublisher, OutboxDispatcher};
pub use envelope::{
    build_envelope_payload, lifecycle_event_type, source_uri, EnvelopeDraft, EventEnvelope,
    SPEC_VERSION,
};
pub use masking::{mask_fields, MASK_MARKER};
