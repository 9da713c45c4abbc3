//! The merge engine: three-way merge orchestration over a resource set.

use crate::conflict::{conflict_id, Conflict, ConflictSeverity, ConflictType};
use crate::diff3::{classify, DiffCategory, ResourceState};
use crate::resolver::resolve;
use oms_core::resource::ResourceRef;
use oms_core::version::ChangeType;
use serde_json::Value;

/// One resource's resolved outcome from a completed merge.
#[derive(Debug, Clone)]
pub struct MergedResource {
    /// The resource affected.
    pub resource: ResourceRef,
    /// What kind of change this produces on the target branch.
    pub change_type: ChangeType,
    /// The resolved content to write, or `None` for a deletion.
    pub content: Option<Value>,
}

/// The result of attempting a merge.
#[derive(Debug, Clone, Default)]
pub struct MergePlan {
    /// Every conflict raised during classification, resolved or not.
    pub conflicts: Vec<Conflict>,
    /// Resources ready to write — populated only when no conflict exceeds
    /// `Warn` severity.
    pub resolved: Vec<MergedResource>,
}

impl MergePlan {
    /// Whether this plan has any conflict severe enough to block the merge.
    pub fn is_blocked(&self) -> bool {
        self.conflicts.iter().any(|c| c.severity.blocks_merge())
    }
}

/// Run a three-way merge over the union of resources touched on either
/// branch since `base`.
///
/// Returns a [`MergePlan`]. If [`MergePlan::is_blocked`] is true, the
/// caller (the coordinator) must not write anything — per spec, a merge
/// with any `ERROR`/`BLOCK` conflict writes nothing at all.
pub fn merge(
    base: &[ResourceState],
    branch_a: &[ResourceState],
    branch_b: &[ResourceState],
) -> MergePlan {
    let mut plan = MergePlan::default();
    let classified = classify(base, branch_a, branch_b);

    fn find<'a>(states: &'a [ResourceState], r: &ResourceRef) -> Option<&'a ResourceState> {
        states.iter().find(|s| &s.resource == r)
    }

    for (resource, category) in classified {
        let base_state = find(base, &resource);
        let a_state = find(branch_a, &resource);
        let b_state = find(branch_b, &resource);

        match category {
            DiffCategory::Unchanged => continue,
            DiffCategory::OnlyInA => plan.resolved.push(MergedResource {
                resource,
                change_type: ChangeType::Created,
                content: a_state.and_then(|s| s.content.clone()),
            }),
            DiffCategory::OnlyInB => plan.resolved.push(MergedResource {
                resource,
                change_type: ChangeType::Created,
                content: b_state.and_then(|s| s.content.clone()),
            }),
            DiffCategory::ModifiedOnOneSide => {
                let content = a_state
                    .and_then(|s| s.content.clone())
                    .or_else(|| b_state.and_then(|s| s.content.clone()));
                plan.resolved.push(MergedResource {
                    resource,
                    change_type: ChangeType::Updated,
                    content,
                });
            }
            DiffCategory::DeletedInAModifiedInB | DiffCategory::DeletedInBModifiedInA => {
                let (deleted_side_is_a, modified_state) = match category {
                    DiffCategory::DeletedInAModifiedInB => (true, b_state),
                    _ => (false, a_state),
                };
                let base_value = base_state.and_then(|s| s.content.clone());
                let modified_value = modified_state.and_then(|s| s.content.clone());
                let mut conflict = Conflict {
                    id: String::new(),
                    conflict_type: ConflictType::DeleteAfterModify,
                    severity: ConflictSeverity::Warn,
                    entity_ref: resource.clone(),
                    field: None,
                    branch_a_value: if deleted_side_is_a { None } else { modified_value.clone() },
                    branch_b_value: if deleted_side_is_a { modified_value.clone() } else { None },
                    base_value: base_value.clone(),
                    suggested_resolution: None,
                    auto_resolvable: false,
                };
                conflict.id = conflict_id(
                    &resource,
                    None,
                    conflict.conflict_type,
                    &conflict.base_value,
                    &conflict.branch_a_value,
                    &conflict.branch_b_value,
                );
                let resolution = resolve(&conflict);
                conflict.auto_resolvable = resolution.is_some();
                conflict.suggested_resolution = resolution.clone();
                plan.conflicts.push(conflict);

                if let Some(res) = resolution {
                    let change_type = if res.resolved_value.is_none() {
                        ChangeType::Deleted
                    } else {
                        ChangeType::Updated
                    };
                    plan.resolved.push(MergedResource {
                        resource,
                        change_type,
                        content: res.resolved_value,
                    });
                }
            }
            DiffCategory::BothModified => {
                let base_value = base_state.and_then(|s| s.content.clone());
                let a_value = a_state.and_then(|s| s.content.clone());
                let b_value = b_state.and_then(|s| s.content.clone());

                let (conflicts, resolved_content) = diff_fields(&resource, base_value, a_value, b_value);
                let blocked = conflicts.iter().any(|c| c.severity.blocks_merge());
                plan.conflicts.extend(conflicts);

                if !blocked {
                    if let Some(content) = resolved_content {
                        plan.resolved.push(MergedResource {
                            resource,
                            change_type: ChangeType::Updated,
                            content: Some(content),
                        });
                    }
                }
            }
        }
    }

    plan
}

/// Decompose a both-modified resource into independent per-field conflicts.
///
/// When both sides' content are JSON objects, each top-level key that
/// disagrees between the two branches is classified and resolved on its
/// own — a single resource can surface more than one conflict this way
/// (e.g. a type change on one field and a constraint conflict on
/// another). Non-object content (or content where either side is not an
/// object) falls back to treating the whole value as one field, matching
/// the behavior for scalar-valued resources.
///
/// Returns every conflict raised and, unless any field went unresolved,
/// the merged content ready to write.
fn diff_fields(
    resource: &ResourceRef,
    base_value: Option<Value>,
    a_value: Option<Value>,
    b_value: Option<Value>,
) -> (Vec<Conflict>, Option<Value>) {
    match (&a_value, &b_value) {
        (Some(Value::Object(a_obj)), Some(Value::Object(b_obj))) => {
            let base_obj = base_value.as_ref().and_then(Value::as_object);
            let mut keys: Vec<&String> = a_obj.keys().chain(b_obj.keys()).collect();
            keys.sort();
            keys.dedup();

            let mut conflicts = Vec::new();
            let mut merged = serde_json::Map::new();
            let mut unresolved = false;

            for key in keys {
                let base_v = base_obj.and_then(|m| m.get(key)).cloned();
                let a_v = a_obj.get(key).cloned();
                let b_v = b_obj.get(key).cloned();
                if a_v == b_v {
                    if let Some(v) = a_v.or(b_v) {
                        merged.insert(key.clone(), v);
                    }
                    continue;
                }
                if a_v == base_v {
                    // Only B touched this field; nothing to reconcile.
                    if let Some(v) = b_v {
                        merged.insert(key.clone(), v);
                    }
                    continue;
                }
                if b_v == base_v {
                    // Only A touched this field; nothing to reconcile.
                    if let Some(v) = a_v {
                        merged.insert(key.clone(), v);
                    }
                    continue;
                }
                let mut conflict = build_field_conflict(resource, Some(key.clone()), base_v, a_v, b_v);
                let resolution = resolve(&conflict);
                conflict.auto_resolvable = resolution.is_some();
                conflict.suggested_resolution = resolution.clone();
                match resolution.and_then(|r| r.resolved_value) {
                    Some(value) => {
                        merged.insert(key.clone(), value);
                    }
                    None => unresolved = true,
                }
                conflicts.push(conflict);
            }

            let blocked = conflicts.iter().any(|c| c.severity.blocks_merge());
            let resolved_content = if blocked || unresolved { None } else { Some(Value::Object(merged)) };
            (conflicts, resolved_content)
        }
        _ => {
            let mut conflict = build_field_conflict(resource, None, base_value, a_value, b_value);
            let resolution = resolve(&conflict);
            conflict.auto_resolvable = resolution.is_some();
            conflict.suggested_resolution = resolution.clone();
            let resolved_content = if conflict.severity.blocks_merge() { None } else { resolution.and_then(|r| r.resolved_value) };
            (vec![conflict], resolved_content)
        }
    }
}

fn build_field_conflict(
    resource: &ResourceRef,
    field: Option<String>,
    base_value: Option<Value>,
    a_value: Option<Value>,
    b_value: Option<Value>,
) -> Conflict {
    let conflict_type = classify_field_conflict(&base_value, &a_value, &b_value);
    let id = conflict_id(resource, field.as_deref(), conflict_type, &base_value, &a_value, &b_value);
    Conflict {
        id,
        conflict_type,
        severity: conflict_type.base_severity(),
        entity_ref: resource.clone(),
        field,
        branch_a_value: a_value,
        branch_b_value: b_value,
        base_value,
        suggested_resolution: None,
        auto_resolvable: false,
    }
}

/// Best-effort classification of one field's conflict into one of the
/// taxonomy's field-level conflict types, from the shape of the values
/// alone (the coordinator's caller is expected to pass richer structured
/// diffs where the distinction matters; this handles the common cases).
fn classify_field_conflict(base: &Option<Value>, a: &Option<Value>, b: &Option<Value>) -> ConflictType {
    match (a, b) {
        (Some(Value::String(_)), Some(Value::String(_))) => ConflictType::PropertyTypeChange,
        (Some(Value::Object(a_obj)), Some(Value::Object(b_obj))) => {
            let base_obj = base.as_ref().and_then(Value::as_object);
            let a_new: Vec<&String> = a_obj.keys().filter(|k| base_obj.map(|bo| !bo.contains_key(*k)).unwrap_or(true)).collect();
            let b_new: Vec<&String> = b_obj.keys().filter(|k| base_obj.map(|bo| !bo.contains_key(*k)).unwrap_or(true)).collect();
            if !a_new.is_empty() && !b_new.is_empty() {
                ConflictType::NameCollision
            } else {
                ConflictType::ConstraintConflict
            }
        }
        _ => ConflictType::IncompatibleTypes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oms_core::resource::{BranchName, ResourceType};
    use serde_json::json;

    fn state(id: &str, hash: &str, content: Value) -> ResourceState {
        ResourceState {
            resource: ResourceRef::new(ResourceType::Property, id, BranchName::main()),
            content_hash: Some(hash.to_string()),
            content: Some(content),
        }
    }

    #[test]
    fn auto_resolved_merge_widens_type_and_keeps_constraint() {
        // Both branches widen `type` away from the base, to a compatible
        // pair, and both independently loosen `constraints` — two
        // unrelated fields on one resource, two independent conflicts,
        // both auto-resolved.
        let base = vec![state("name", "h0", json!({"type": "int", "constraints": {"max_length": 50}}))];
        let a = vec![state("name", "h1", json!({"type": "string", "constraints": {"max_length": 80}}))];
        let b = vec![state("name", "h2", json!({"type": "text", "constraints": {"max_length": 100}}))];

        let plan = merge(&base, &a, &b);
        assert!(!plan.is_blocked());
        assert_eq!(plan.conflicts.len(), 2);
        assert!(plan.conflicts.iter().all(|c| c.auto_resolvable));
        assert!(plan.conflicts.iter().any(|c| c.field.as_deref() == Some("type") && c.conflict_type == ConflictType::PropertyTypeChange));
        assert!(plan.conflicts.iter().any(|c| c.field.as_deref() == Some("constraints") && c.conflict_type == ConflictType::ConstraintConflict));
        assert_eq!(plan.resolved.len(), 1);
        assert_eq!(
            plan.resolved[0].content,
            Some(json!({"type": "text", "constraints": {"max_length": 100.0}}))
        );
    }

    #[test]
    fn both_modified_resource_with_disjoint_field_changes_has_no_conflict() {
        // Branch A only touches `type`, branch B only touches `label` —
        // the resource as a whole is "both modified", but no single field
        // was changed on both sides, so nothing actually conflicts.
        let base = vec![state("name", "h0", json!({"type": "string", "label": "Name"}))];
        let a = vec![state("name", "h1", json!({"type": "text", "label": "Name"}))];
        let b = vec![state("name", "h2", json!({"type": "string", "label": "Full name"}))];

        let plan = merge(&base, &a, &b);
        assert!(!plan.is_blocked());
        assert!(plan.conflicts.is_empty());
        assert_eq!(
            plan.resolved[0].content,
            Some(json!({"type": "text", "label": "Full name"}))
        );
    }

    #[test]
    fn only_in_a_applies_cleanly_with_no_conflict() {
        let base: Vec<ResourceState> = vec![];
        let a = vec![state("new_field", "h1", json!({"type": "string"}))];
        let b: Vec<ResourceState> = vec![];
        let plan = merge(&base, &a, &b);
        assert!(plan.conflicts.is_empty());
        assert_eq!(plan.resolved.len(), 1);
        assert_eq!(plan.resolved[0].change_type, ChangeType::Created);
    }

    #[test]
    fn incompatible_types_blocks_the_merge() {
        let base = vec![state("field", "h0", json!("string"))];
        let a = vec![state("field", "h1", json!(42))];
        let b = vec![state("field", "h2", json!(true))];
        let plan = merge(&base, &a, &b);
        assert!(plan.is_blocked());
        assert!(plan.resolved.is_empty());
    }

    #[test]
    fn deterministic_conflict_ids_across_runs() {
        let base = vec![state("name", "h0", json!("string"))];
        let a = vec![state("name", "h1", json!("text"))];
        let b = vec![state("name", "h2", json!("string"))];
        let plan1 = merge(&base, &a, &b);
        let plan2 = merge(&base, &a, &b);
        assert_eq!(plan1.conflicts[0].id, plan2.conflicts[0].id);
    }
}
