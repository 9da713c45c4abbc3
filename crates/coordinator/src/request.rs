//! Inputs and outputs of the coordinator's mutation entry point.

use oms_core::content::Content;
use oms_core::resource::ResourceRef;
use oms_core::version::{ChangeType, ResourceVersion};

/// A proposed change to one resource.
#[derive(Debug, Clone)]
pub struct MutationRequest {
    /// The resource targeted.
    pub resource: ResourceRef,
    /// The proposed document (ignored for `Deleted`, where the prior
    /// content is retained as the tombstone's recorded content).
    pub content: Content,
    /// What kind of change this is.
    pub change_type: ChangeType,
    /// Who is making the change.
    pub actor: String,
    /// The `If-Match` ETag the caller last observed, if any.
    pub if_match: Option<String>,
    /// Field names the caller reports as changed, for audit purposes.
    pub fields_changed: Vec<String>,
    /// A free-form summary of the change.
    pub change_summary: Option<String>,
    /// Correlates this mutation with others in the same logical operation.
    pub correlation_id: Option<String>,
}

/// The result of a successful mutation: the new version plus its ETag.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    /// The version record just written.
    pub version: ResourceVersion,
    /// Its weak ETag, ready for the caller's next `If-Match`.
    pub etag: String,
    /// The outbox sequence number the change's event was appended under.
    pub outbox_sequence: u64,
}
