//! Merge conflict records and their severity/resolution taxonomy.

use oms_core::resource::ResourceRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How serious a merge conflict is.
///
/// `Block` is strictly worse than `Error` for merge purposes: both prevent
/// an automatic merge, but `Block` additionally indicates there is no
/// sensible migration path at all (e.g. a required field was removed on
/// one side), whereas `Error` just means this system declines to guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    /// Advisory; always auto-resolvable.
    Info,
    /// Surfaced but auto-resolvable.
    Warn,
    /// Not auto-resolvable; blocks the merge.
    Error,
    /// Not auto-resolvable and has no safe migration; blocks the merge.
    Block,
}

impl ConflictSeverity {
    /// Whether a conflict at this severity can stop an `auto_resolve=true`
    /// merge from completing.
    pub fn blocks_merge(&self) -> bool {
        matches!(self, ConflictSeverity::Error | ConflictSeverity::Block)
    }
}

/// The kind of divergence a conflict represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// A property's declared type changed differently on each side.
    PropertyTypeChange,
    /// A constraint (e.g. `max_length`) was added or tightened on one or
    /// both sides.
    ConstraintConflict,
    /// One side deleted the entity, the other modified it.
    DeleteAfterModify,
    /// Both sides added a property/field with the same name.
    NameCollision,
    /// A link's cardinality changed on one or both sides.
    CardinalityChange,
    /// The two sides' types cannot be reconciled by widening.
    IncompatibleTypes,
    /// A required field present at the merge base was removed on a side.
    RequiredFieldRemoved,
}

impl ConflictType {
    /// The severity this conflict type carries before resolution is attempted.
    pub fn base_severity(&self) -> ConflictSeverity {
        match self {
            ConflictType::PropertyTypeChange => ConflictSeverity::Warn,
            ConflictType::ConstraintConflict => ConflictSeverity::Warn,
            ConflictType::DeleteAfterModify => ConflictSeverity::Warn,
            ConflictType::NameCollision => ConflictSeverity::Warn,
            ConflictType::CardinalityChange => ConflictSeverity::Info,
            ConflictType::IncompatibleTypes => ConflictSeverity::Error,
            ConflictType::RequiredFieldRemoved => ConflictSeverity::Block,
        }
    }
}

/// One point of divergence between two branches relative to their common
/// ancestor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    /// Content-derived identifier: stable across re-runs on identical
    /// inputs, so merge outcomes are deterministic and auditable.
    pub id: String,
    /// The kind of divergence.
    pub conflict_type: ConflictType,
    /// How serious it is.
    pub severity: ConflictSeverity,
    /// The resource this conflict concerns.
    pub entity_ref: ResourceRef,
    /// The field within the resource's content this conflict is scoped to
    /// (a top-level key), or `None` when the conflict is over the whole
    /// resource value (a scalar resource, or a delete-vs-modify conflict).
    pub field: Option<String>,
    /// The field value on branch A, if applicable.
    pub branch_a_value: Option<Value>,
    /// The field value on branch B, if applicable.
    pub branch_b_value: Option<Value>,
    /// The field value at the merge base, if applicable.
    pub base_value: Option<Value>,
    /// What this system would do automatically, if anything.
    pub suggested_resolution: Option<Resolution>,
    /// Whether [`Conflict::suggested_resolution`] is safe to apply without
    /// human review.
    pub auto_resolvable: bool,
}

/// The action taken (or suggested) to resolve a conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    /// A short description of the strategy applied (e.g. `"type_widen"`,
    /// `"constraint_union"`).
    pub action: String,
    /// The merged value, when resolution produces one.
    pub resolved_value: Option<Value>,
    /// Free-form notes about manual follow-up the resolution implies (e.g.
    /// a junction table needed for a cardinality expansion). Never
    /// executed automatically.
    pub migration_notes: Option<String>,
}

/// Derive a conflict's content-derived id from the fields that determine
/// its identity: the entity, the field within it, the conflict type, and
/// the three values in play. Two merges over identical inputs always
/// produce the same id; two fields conflicting on the same resource get
/// distinct ids.
pub fn conflict_id(
    entity: &ResourceRef,
    field: Option<&str>,
    conflict_type: ConflictType,
    base: &Option<Value>,
    a: &Option<Value>,
    b: &Option<Value>,
) -> String {
    let payload = serde_json::json!({
        "entity": entity.storage_key(),
        "field": field,
        "type": conflict_type,
        "base": base,
        "a": a,
        "b": b,
    });
    oms_core::hash::content_hash(&payload)
}
