//! Structural validation: required fields, primitive-type conformance,
//! enum membership, and referential validity.

use crate::issue::{Severity, ValidationIssue};
use oms_core::patch::JsonPointer;
use serde_json::Value;
use std::collections::HashSet;

/// The primitive JSON-level shape a field is expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    /// A JSON string.
    String,
    /// A JSON number.
    Number,
    /// A JSON boolean.
    Boolean,
    /// A JSON object.
    Object,
    /// A JSON array.
    Array,
}

impl PrimitiveType {
    fn matches(&self, value: &Value) -> bool {
        match self {
            PrimitiveType::String => value.is_string(),
            PrimitiveType::Number => value.is_number(),
            PrimitiveType::Boolean => value.is_boolean(),
            PrimitiveType::Object => value.is_object(),
            PrimitiveType::Array => value.is_array(),
        }
    }
}

/// The shape a document is expected to have: which top-level fields are
/// required, what primitive type each known field must be, and which
/// fields are constrained to an enumerated set of values.
#[derive(Debug, Clone, Default)]
pub struct StructuralSchema {
    /// Fields that must be present.
    pub required_fields: Vec<String>,
    /// Expected primitive type per field, where known.
    pub field_types: Vec<(String, PrimitiveType)>,
    /// Allowed values per field, where the field is an enum.
    pub enum_fields: Vec<(String, HashSet<String>)>,
}

/// Resolves whether a referenced entity id exists, for referential-validity
/// checks on fields like `data_type_id` / `semantic_type_id` / `struct_type_id`.
///
/// Implemented by the coordinator layer against the branch's resource set;
/// the validator itself has no storage access.
pub trait ReferenceResolver {
    /// Whether an entity of `resource_type` with id `resource_id` exists in
    /// the scope being validated against.
    fn exists(&self, resource_type: &str, resource_id: &str) -> bool;
}

/// Fields whose value is expected to reference another entity, keyed by
/// field name, with the resource type the reference must resolve against.
#[derive(Debug, Clone, Default)]
pub struct ReferenceFields(pub Vec<(String, String)>);

/// Validate `doc` against a [`StructuralSchema`], optionally checking
/// referential fields against a [`ReferenceResolver`].
pub fn validate_structure(
    doc: &Value,
    schema: &StructuralSchema,
    references: &ReferenceFields,
    resolver: Option<&dyn ReferenceResolver>,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let Value::Object(map) = doc else {
        issues.push(ValidationIssue::new(
            Severity::Error,
            "structural.not_an_object",
            "document must be a JSON object",
        ));
        return issues;
    };

    for field in &schema.required_fields {
        if !map.contains_key(field) {
            issues.push(
                ValidationIssue::new(
                    Severity::Error,
                    "structural.required_field_missing",
                    format!("required field '{field}' is missing"),
                )
                .with_path(JsonPointer::from_segments(vec![field.clone()])),
            );
        }
    }

    for (field, expected) in &schema.field_types {
        if let Some(value) = map.get(field) {
            if !expected.matches(value) {
                issues.push(
                    ValidationIssue::new(
                        Severity::Error,
                        "structural.type_mismatch",
                        format!("field '{field}' must be {expected:?}"),
                    )
                    .with_path(JsonPointer::from_segments(vec![field.clone()])),
                );
            }
        }
    }

    for (field, allowed) in &schema.enum_fields {
        if let Some(Value::String(s)) = map.get(field) {
            if !allowed.contains(s) {
                issues.push(
                    ValidationIssue::new(
                        Severity::Error,
                        "structural.enum_violation",
                        format!("field '{field}' value '{s}' is not one of the allowed values"),
                    )
                    .with_path(JsonPointer::from_segments(vec![field.clone()])),
                );
            }
        }
    }

    if let Some(resolver) = resolver {
        for (field, resource_type) in &references.0 {
            if let Some(Value::String(id)) = map.get(field) {
                if !resolver.exists(resource_type, id) {
                    issues.push(
                        ValidationIssue::new(
                            Severity::Error,
                            "structural.dangling_reference",
                            format!("field '{field}' references nonexistent {resource_type} '{id}'"),
                        )
                        .with_path(JsonPointer::from_segments(vec![field.clone()])),
                    );
                }
            }
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedResolver(HashSet<(String, String)>);
    impl ReferenceResolver for FixedResolver {
        fn exists(&self, resource_type: &str, resource_id: &str) -> bool {
            self.0
                .contains(&(resource_type.to_string(), resource_id.to_string()))
        }
    }

    #[test]
    fn missing_required_field_is_reported() {
        let schema = StructuralSchema {
            required_fields: vec!["name".to_string()],
            ..Default::default()
        };
        let issues = validate_structure(&json!({}), &schema, &ReferenceFields::default(), None);
        assert!(issues.iter().any(|i| i.code == "structural.required_field_missing"));
    }

    #[test]
    fn type_mismatch_is_reported() {
        let schema = StructuralSchema {
            field_types: vec![("age".to_string(), PrimitiveType::Number)],
            ..Default::default()
        };
        let issues = validate_structure(&json!({"age": "old"}), &schema, &ReferenceFields::default(), None);
        assert!(issues.iter().any(|i| i.code == "structural.type_mismatch"));
    }

    #[test]
    fn enum_violation_is_reported() {
        let allowed: HashSet<String> = ["string", "int"].iter().map(|s| s.to_string()).collect();
        let schema = StructuralSchema {
            enum_fields: vec![("data_type".to_string(), allowed)],
            ..Default::default()
        };
        let issues = validate_structure(
            &json!({"data_type": "complex_number"}),
            &schema,
            &ReferenceFields::default(),
            None,
        );
        assert!(issues.iter().any(|i| i.code == "structural.enum_violation"));
    }

    #[test]
    fn dangling_reference_is_reported() {
        let refs = ReferenceFields(vec![("semantic_type_id".to_string(), "semantic_type".to_string())]);
        let resolver = FixedResolver(HashSet::new());
        let issues = validate_structure(
            &json!({"semantic_type_id": "missing"}),
            &StructuralSchema::default(),
            &refs,
            Some(&resolver),
        );
        assert!(issues.iter().any(|i| i.code == "structural.dangling_reference"));
    }
}
