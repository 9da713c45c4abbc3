//! CloudEvents-shaped event envelopes.

use oms_core::resource::ResourceRef;
use oms_core::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The fixed `specversion` this system emits.
pub const SPEC_VERSION: &str = "1.0";

/// An immutable event envelope, CloudEvents-shaped with OMS extension
/// attributes for correlation and provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Globally unique event id.
    pub event_id: String,
    /// Fixed CloudEvents spec version.
    pub specversion: String,
    /// Reverse-domain event type, e.g. `com.oms.object_type.created`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// URI identifying the emitting service and branch.
    pub source: String,
    /// The affected resource, as a string reference.
    pub subject: String,
    /// When the event was created.
    pub time: Timestamp,
    /// The structured payload.
    pub data: Value,
    /// SHA-256 hash of the (possibly masked) payload bytes.
    pub payload_hash: String,
    /// The branch this event concerns.
    pub ce_branch: String,
    /// The commit hash that produced this event.
    pub ce_commit: String,
    /// Who made the change.
    pub ce_author: String,
    /// Correlates events belonging to the same logical operation.
    pub ce_correlationid: String,
    /// The event (if any) whose handling caused this one to be emitted.
    pub ce_causationid: Option<String>,
    /// Per-partition monotonic sequence number, assigned by the outbox.
    pub sequence_number: u64,
}

impl EventEnvelope {
    /// The NATS-style streaming subject this event publishes under:
    /// `oms.<type-path-segments joined by dots>`.
    pub fn streaming_subject(&self) -> String {
        format!("oms.{}", self.event_type)
    }
}

/// Build the reverse-domain event type for a resource lifecycle event,
/// e.g. `object_type.created`.
pub fn lifecycle_event_type(resource_type: &oms_core::resource::ResourceType, change_type: &oms_core::version::ChangeType) -> String {
    let verb = match change_type {
        oms_core::version::ChangeType::Created => "created",
        oms_core::version::ChangeType::Updated => "updated",
        oms_core::version::ChangeType::Deleted => "deleted",
    };
    format!("{}.{}", resource_type.as_str(), verb)
}

/// Construct an envelope's source URI for a given branch.
pub fn source_uri(branch: &oms_core::resource::BranchName) -> String {
    format!("urn:oms:branch:{branch}")
}

/// Everything needed to build an [`EventEnvelope`] for one resource change,
/// before sequence assignment (which only the outbox storage layer knows).
pub struct EnvelopeDraft {
    /// The event id.
    pub event_id: String,
    /// The resource the event concerns.
    pub resource: ResourceRef,
    /// The kind of change.
    pub change_type: oms_core::version::ChangeType,
    /// The payload, already masked if masking applies.
    pub data: Value,
    /// The commit hash that produced this event.
    pub commit_hash: String,
    /// Who made the change.
    pub author: String,
    /// The correlation id for the owning logical operation.
    pub correlation_id: String,
    /// The causing event, if this event is a side effect of handling another.
    pub causation_id: Option<String>,
    /// When the event was created.
    pub time: Timestamp,
}

/// Render a draft into the payload that will be appended to the outbox.
/// The outbox storage layer assigns `sequence_number` on append; this
/// function leaves it at `0` as a placeholder the dispatcher fills in
/// before publishing.
pub fn build_envelope_payload(draft: &EnvelopeDraft) -> Value {
    let envelope = EventEnvelope {
        event_id: draft.event_id.clone(),
        specversion: SPEC_VERSION.to_string(),
        event_type: lifecycle_event_type(&draft.resource.resource_type, &draft.change_type),
        source: source_uri(&draft.resource.branch),
        subject: draft.resource.storage_key(),
        time: draft.time,
        payload_hash: oms_core::hash::content_hash(&draft.data),
        data: draft.data.clone(),
        ce_branch: draft.resource.branch.to_string(),
        ce_commit: draft.commit_hash.clone(),
        ce_author: draft.author.clone(),
        ce_correlationid: draft.correlation_id.clone(),
        ce_causationid: draft.causation_id.clone(),
        sequence_number: 0,
    };
    serde_json::to_value(envelope).expect("envelope is always serializable")
}

#[cfg(test)]
mod tests {
    use super::*;
    use oms_core::resource::{BranchName, ResourceType};
    use serde_json::json;

    #[test]
    fn lifecycle_event_type_matches_reverse_domain_convention() {
        let t = lifecycle_event_type(&ResourceType::ObjectType, &oms_core::version::ChangeType::Created);
        assert_eq!(t, "object_type.created");
    }

    #[test]
    fn build_envelope_payload_is_well_formed() {
        let draft = EnvelopeDraft {
            event_id: "evt-1".to_string(),
            resource: ResourceRef::new(ResourceType::ObjectType, "Employee", BranchName::main()),
            change_type: oms_core::version::ChangeType::Created,
            data: json!({"id": "Employee"}),
            commit_hash: "h1".to_string(),
            author: "alice".to_string(),
            correlation_id: "corr-1".to_string(),
            causation_id: None,
            time: Timestamp::from_micros(1),
        };
        let payload = build_envelope_payload(&draft);
        let envelope: EventEnvelope = serde_json::from_value(payload).unwrap();
        assert_eq!(envelope.event_type, "object_type.created");
        assert_eq!(envelope.streaming_subject(), "oms.object_type.created");
        assert_eq!(envelope.subject, "main/object_type/Employee");
    }
}
