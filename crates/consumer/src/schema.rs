//! Concrete projection handlers for schema lifecycle events: the same
//! object/link type creation, update, and deletion events the outbox
//! emits, folded into a denormalized read model.

use crate::error::ConsumerError;
use crate::handler::{ConsumerEvent, ConsumerHandler, HandlerOutcome};
use serde_json::{json, Map, Value};

fn as_object(projection: &Value) -> Map<String, Value> {
    projection.as_object().cloned().unwrap_or_default()
}

fn counts(projection: &Map<String, Value>) -> (usize, usize) {
    let object_types = projection
        .get("object_types")
        .and_then(|v| v.as_object())
        .map(|m| m.len())
        .unwrap_or(0);
    let link_types = projection
        .get("link_types")
        .and_then(|v| v.as_object())
        .map(|m| m.len())
        .unwrap_or(0);
    (object_types, link_types)
}

/// Handles `object_type.created` and `link_type.created`.
pub struct TypeCreatedHandler {
    collection: &'static str,
}

impl TypeCreatedHandler {
    /// A handler projecting into the `object_types` map.
    pub fn object_type() -> Self {
        TypeCreatedHandler { collection: "object_types" }
    }

    /// A handler projecting into the `link_types` map.
    pub fn link_type() -> Self {
        TypeCreatedHandler { collection: "link_types" }
    }
}

impl ConsumerHandler for TypeCreatedHandler {
    fn handle(&self, event: &ConsumerEvent, projection: &Value) -> Result<HandlerOutcome, ConsumerError> {
        let type_id = event
            .payload
            .get("type_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ConsumerError::HandlerFailed {
                consumer_id: "schema_consumer".into(),
                event_id: event.event_id.clone(),
                reason: "missing type_id in payload".into(),
            })?;
        let type_data = event.payload.get("type_data").cloned().unwrap_or(json!({}));

        let mut root = as_object(projection);
        let mut collection = root
            .get(self.collection)
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();
        collection.insert(type_id.to_string(), type_data);
        root.insert(self.collection.to_string(), Value::Object(collection));

        Ok(HandlerOutcome {
            new_projection: Value::Object(root),
            result: json!({"type_id": type_id, "created": true}),
        })
    }
}

/// Handles `object_type.updated` and `link_type.updated`: merges the
/// incoming fields into the existing entry rather than replacing it.
pub struct TypeUpdatedHandler {
    collection: &'static str,
}

impl TypeUpdatedHandler {
    /// A handler updating entries in `object_types`.
    pub fn object_type() -> Self {
        TypeUpdatedHandler { collection: "object_types" }
    }

    /// A handler updating entries in `link_types`.
    pub fn link_type() -> Self {
        TypeUpdatedHandler { collection: "link_types" }
    }
}

impl ConsumerHandler for TypeUpdatedHandler {
    fn handle(&self, event: &ConsumerEvent, projection: &Value) -> Result<HandlerOutcome, ConsumerError> {
        let type_id = event
            .payload
            .get("type_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ConsumerError::HandlerFailed {
                consumer_id: "schema_consumer".into(),
                event_id: event.event_id.clone(),
                reason: "missing type_id in payload".into(),
            })?;
        let type_data = event.payload.get("type_data").and_then(|v| v.as_object()).cloned().unwrap_or_default();
        let changes: Vec<String> = event
            .payload
            .get("changes")
            .and_then(|v| v.as_object())
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();

        let mut root = as_object(projection);
        let mut collection = root
            .get(self.collection)
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();
        let mut existing = collection.get(type_id).and_then(|v| v.as_object()).cloned().unwrap_or_default();
        for (k, v) in type_data {
            existing.insert(k, v);
        }
        collection.insert(type_id.to_string(), Value::Object(existing));
        root.insert(self.collection.to_string(), Value::Object(collection));

        Ok(HandlerOutcome {
            new_projection: Value::Object(root),
            result: json!({"type_id": type_id, "updated": true, "fields_changed": changes}),
        })
    }
}

/// Handles `object_type.deleted` and `link_type.deleted`.
pub struct TypeDeletedHandler {
    collection: &'static str,
}

impl TypeDeletedHandler {
    /// A handler removing entries from `object_types`.
    pub fn object_type() -> Self {
        TypeDeletedHandler { collection: "object_types" }
    }

    /// A handler removing entries from `link_types`.
    pub fn link_type() -> Self {
        TypeDeletedHandler { collection: "link_types" }
    }
}

impl ConsumerHandler for TypeDeletedHandler {
    fn handle(&self, event: &ConsumerEvent, projection: &Value) -> Result<HandlerOutcome, ConsumerError> {
        let type_id = event
            .payload
            .get("type_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ConsumerError::HandlerFailed {
                consumer_id: "schema_consumer".into(),
                event_id: event.event_id.clone(),
                reason: "missing type_id in payload".into(),
            })?;

        let mut root = as_object(projection);
        let mut collection = root
            .get(self.collection)
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();
        let removed = collection.remove(type_id).is_some();
        root.insert(self.collection.to_string(), Value::Object(collection));

        if !removed {
            tracing::warn!(type_id, collection = self.collection, "type not found for deletion");
        }

        Ok(HandlerOutcome {
            new_projection: Value::Object(root),
            result: json!({"type_id": type_id, "deleted": removed}),
        })
    }
}

/// Handles `schema.reset`: clears both collections back to empty.
pub struct SchemaResetHandler;

impl ConsumerHandler for SchemaResetHandler {
    fn handle(&self, _event: &ConsumerEvent, projection: &Value) -> Result<HandlerOutcome, ConsumerError> {
        let root = as_object(projection);
        let (object_types_removed, link_types_removed) = counts(&root);
        Ok(HandlerOutcome {
            new_projection: json!({"object_types": {}, "link_types": {}}),
            result: json!({
                "object_types_removed": object_types_removed,
                "link_types_removed": link_types_removed,
            }),
        })
    }
}

/// Register the full set of schema projection handlers under their
/// conventional event type names.
pub fn register_schema_handlers(registry: &mut crate::handler::HandlerRegistry) {
    registry.register("object_type.created", Box::new(TypeCreatedHandler::object_type()));
    registry.register("object_type.updated", Box::new(TypeUpdatedHandler::object_type()));
    registry.register("object_type.deleted", Box::new(TypeDeletedHandler::object_type()));
    registry.register("link_type.created", Box::new(TypeCreatedHandler::link_type()));
    registry.register("link_type.updated", Box::new(TypeUpdatedHandler::link_type()));
    registry.register("link_type.deleted", Box::new(TypeDeletedHandler::link_type()));
    registry.register("schema.reset", Box::new(SchemaResetHandler));
}
