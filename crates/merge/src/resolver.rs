//! Resolution strategies for the conflict taxonomy.

use crate::conflict::{Conflict, ConflictType, Resolution};
use serde_json::Value;

/// Type widenings considered safe to apply automatically, read as
/// `(narrower, wider)`. A `property_type_change` conflict resolves
/// automatically only when the pair is one of these, in either direction.
const SAFE_WIDENINGS: &[(&str, &str)] = &[
    ("string", "text"),
    ("int", "long"),
    ("float", "double"),
    ("string", "json"),
];

fn widened_type(a: &str, b: &str) -> Option<String> {
    SAFE_WIDENINGS.iter().find_map(|(narrow, wide)| {
        if (a == *narrow && b == *wide) || (a == *wide && b == *narrow) {
            Some(wide.to_string())
        } else {
            None
        }
    })
}

/// Cardinality widening order: each step is considered a safe expansion.
const CARDINALITY_ORDER: &[&str] = &["one_to_one", "one_to_many", "many_to_many"];

fn wider_cardinality(a: &str, b: &str) -> Option<String> {
    let ia = CARDINALITY_ORDER.iter().position(|c| *c == a)?;
    let ib = CARDINALITY_ORDER.iter().position(|c| *c == b)?;
    Some(CARDINALITY_ORDER[ia.max(ib)].to_string())
}

/// Attempt to auto-resolve a conflict, returning the resolution to apply
/// if one exists. Conflicts at `Error`/`Block` severity never resolve.
pub fn resolve(conflict: &Conflict) -> Option<Resolution> {
    match conflict.conflict_type {
        ConflictType::PropertyTypeChange => {
            let a = conflict.branch_a_value.as_ref()?.as_str()?;
            let b = conflict.branch_b_value.as_ref()?.as_str()?;
            let widened = widened_type(a, b)?;
            Some(Resolution {
                action: "type_widen".to_string(),
                resolved_value: Some(Value::String(widened)),
                migration_notes: None,
            })
        }
        ConflictType::ConstraintConflict => {
            let a = conflict.branch_a_value.as_ref()?;
            let b = conflict.branch_b_value.as_ref()?;
            let merged = union_constraints(a, b)?;
            Some(Resolution {
                action: "constraint_union".to_string(),
                resolved_value: Some(merged),
                migration_notes: None,
            })
        }
        ConflictType::DeleteAfterModify => {
            // Prefer the modification unless the base marks the entity
            // deprecated, in which case the delete wins.
            let base_deprecated = conflict
                .base_value
                .as_ref()
                .and_then(|v| v.get("deprecated"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if base_deprecated {
                Some(Resolution {
                    action: "prefer_delete".to_string(),
                    resolved_value: None,
                    migration_notes: None,
                })
            } else {
                let modified = conflict
                    .branch_a_value
                    .clone()
                    .or_else(|| conflict.branch_b_value.clone())?;
                Some(Resolution {
                    action: "prefer_modification".to_string(),
                    resolved_value: Some(modified),
                    migration_notes: None,
                })
            }
        }
        ConflictType::NameCollision => {
            let a = conflict.branch_a_value.as_ref()?.as_object()?;
            let b = conflict.branch_b_value.as_ref()?.as_object()?;
            let mut merged = a.clone();
            for (key, value) in b {
                if let Some(existing) = merged.get(key) {
                    if existing != value {
                        // Common property with conflicting definitions: cannot resolve.
                        return None;
                    }
                } else {
                    merged.insert(key.clone(), value.clone());
                }
            }
            Some(Resolution {
                action: "property_set_merge".to_string(),
                resolved_value: Some(Value::Object(merged)),
                migration_notes: None,
            })
        }
        ConflictType::CardinalityChange => {
            let a = conflict.branch_a_value.as_ref()?.as_str()?;
            let b = conflict.branch_b_value.as_ref()?.as_str()?;
            let wider = wider_cardinality(a, b)?;
            let notes = if wider == "many_to_many" && (a != "many_to_many" && b != "many_to_many") {
                Some("expanding to many_to_many requires a junction table; not created automatically".to_string())
            } else {
                None
            };
            Some(Resolution {
                action: "cardinality_expand".to_string(),
                resolved_value: Some(Value::String(wider)),
                migration_notes: notes,
            })
        }
        ConflictType::IncompatibleTypes | ConflictType::RequiredFieldRemoved => None,
    }
}

/// Merge two constraint objects, keeping the more permissive bound per
/// overlapping key (larger `max_length`/`max`, smaller `min_length`/`min`);
/// keys present in only one side pass through unchanged.
fn union_constraints(a: &Value, b: &Value) -> Option<Value> {
    let a = a.as_object()?;
    let b = b.as_object()?;
    let mut merged = a.clone();
    for (key, b_value) in b {
        match merged.get(key) {
            None => {
                merged.insert(key.clone(), b_value.clone());
            }
            Some(a_value) => {
                let more_permissive = if key.starts_with("max") {
                    pick_numeric(a_value, b_value, f64::max)
                } else if key.starts_with("min") {
                    pick_numeric(a_value, b_value, f64::min)
                } else {
                    a_value.clone()
                };
                merged.insert(key.clone(), more_permissive);
            }
        }
    }
    Some(Value::Object(merged))
}

fn pick_numeric(a: &Value, b: &Value, combine: impl Fn(f64, f64) -> f64) -> Value {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => serde_json::json!(combine(x, y)),
        _ => a.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::ConflictSeverity;
    use oms_core::resource::{BranchName, ResourceRef, ResourceType};
    use serde_json::json;

    fn base_conflict(conflict_type: ConflictType, a: Value, b: Value) -> Conflict {
        Conflict {
            id: "c1".to_string(),
            conflict_type,
            severity: conflict_type.base_severity(),
            entity_ref: ResourceRef::new(ResourceType::Property, "email", BranchName::main()),
            field: None,
            branch_a_value: Some(a),
            branch_b_value: Some(b),
            base_value: None,
            suggested_resolution: None,
            auto_resolvable: false,
        }
    }

    #[test]
    fn safe_type_widening_resolves() {
        let c = base_conflict(ConflictType::PropertyTypeChange, json!("string"), json!("text"));
        let res = resolve(&c).unwrap();
        assert_eq!(res.resolved_value, Some(json!("text")));
    }

    #[test]
    fn unsafe_type_change_does_not_resolve() {
        let c = base_conflict(ConflictType::PropertyTypeChange, json!("string"), json!("boolean"));
        assert!(resolve(&c).is_none());
    }

    #[test]
    fn constraint_union_keeps_more_permissive_bound() {
        let c = base_conflict(
            ConflictType::ConstraintConflict,
            json!({"max_length": 50}),
            json!({"max_length": 100}),
        );
        let res = resolve(&c).unwrap();
        assert_eq!(res.resolved_value, Some(json!({"max_length": 100.0})));
    }

    #[test]
    fn name_collision_merges_disjoint_sets() {
        let c = base_conflict(
            ConflictType::NameCollision,
            json!({"email": "string"}),
            json!({"phone": "string"}),
        );
        let res = resolve(&c).unwrap();
        assert_eq!(res.resolved_value, Some(json!({"email": "string", "phone": "string"})));
    }

    #[test]
    fn name_collision_with_conflicting_common_property_does_not_resolve() {
        let c = base_conflict(
            ConflictType::NameCollision,
            json!({"email": "string"}),
            json!({"email": "text"}),
        );
        assert!(resolve(&c).is_none());
    }

    #[test]
    fn cardinality_expands_to_more_permissive() {
        let c = base_conflict(ConflictType::CardinalityChange, json!("one_to_one"), json!("one_to_many"));
        let res = resolve(&c).unwrap();
        assert_eq!(res.resolved_value, Some(json!("one_to_many")));
    }

    #[test]
    fn incompatible_types_never_resolve() {
        let mut c = base_conflict(ConflictType::IncompatibleTypes, json!("string"), json!(42));
        c.severity = ConflictSeverity::Error;
        assert!(resolve(&c).is_none());
    }

    #[test]
    fn required_field_removed_never_resolves() {
        let mut c = base_conflict(ConflictType::RequiredFieldRemoved, json!(true), json!(false));
        c.severity = ConflictSeverity::Block;
        assert!(resolve(&c).is_none());
    }
}
