//! Event handlers: a capability interface keyed by event type, dispatched
//! through a plain string-keyed registry rather than a class hierarchy.

use crate::error::ConsumerError;
use serde_json::Value;
use std::collections::HashMap;

/// One event delivered to a consumer.
#[derive(Debug, Clone)]
pub struct ConsumerEvent {
    /// Globally unique event id, the dedupe key's second component.
    pub event_id: String,
    /// Reverse-domain event type, used to select a handler.
    pub event_type: String,
    /// Per-partition monotonic sequence number.
    pub sequence_number: u64,
    /// The event payload.
    pub payload: Value,
}

/// What a successful handler invocation produced.
#[derive(Debug, Clone)]
pub struct HandlerOutcome {
    /// The projection after applying this event.
    pub new_projection: Value,
    /// A summary of the effect, returned to the caller and replayed
    /// verbatim on duplicate delivery.
    pub result: Value,
}

/// A projector for one family of event types.
///
/// Implementations read `payload` and the current `projection`, and return
/// the updated projection plus a result summary. Handlers must be pure
/// functions of `(payload, projection)` — any side effect with its own
/// idempotence requirement (e.g. re-indexing) belongs behind the same
/// dedupe boundary as the projection update, not layered independently.
pub trait ConsumerHandler: Send + Sync {
    /// Apply `event` against `projection`, producing the next projection.
    fn handle(&self, event: &ConsumerEvent, projection: &Value) -> Result<HandlerOutcome, ConsumerError>;
}

/// Maps event type strings to their handler. Selection is a lookup, never
/// a virtual dispatch chain.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Box<dyn ConsumerHandler>>,
}

impl HandlerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        HandlerRegistry { handlers: HashMap::new() }
    }

    /// Register `handler` for `event_type`, replacing any prior handler
    /// for the same type.
    pub fn register(&mut self, event_type: impl Into<String>, handler: Box<dyn ConsumerHandler>) {
        self.handlers.insert(event_type.into(), handler);
    }

    /// Look up the handler for `event_type`, if any is registered.
    pub fn get(&self, event_type: &str) -> Option<&dyn ConsumerHandler> {
        self.handlers.get(event_type).map(|h| h.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;
    impl ConsumerHandler for Echo {
        fn handle(&self, event: &ConsumerEvent, projection: &Value) -> Result<HandlerOutcome, ConsumerError> {
            let mut next = projection.clone();
            next[event.event_id.clone()] = event.payload.clone();
            Ok(HandlerOutcome { new_projection: next, result: json!({"echoed": true}) })
        }
    }

    #[test]
    fn registry_dispatches_by_event_type() {
        let mut registry = HandlerRegistry::new();
        registry.register("object_type.created", Box::new(Echo));
        assert!(registry.get("object_type.created").is_some());
        assert!(registry.get("link_type.created").is_none());
    }
}
