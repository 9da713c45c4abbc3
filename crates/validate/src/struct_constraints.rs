//! Struct-type constraints: no nested structs, no duplicate field names,
//! required fields present.

use crate::issue::{Severity, ValidationIssue};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One field of a struct type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructField {
    /// The field's name.
    pub name: String,
    /// The data type id it references (never another struct type).
    pub data_type_id: String,
    /// Whether the field must be present on instances.
    pub required: bool,
    /// Whether `data_type_id` itself refers to a struct type, which is
    /// forbidden — struct types cannot nest.
    pub references_struct_type: bool,
}

/// Validate a struct type's field list.
pub fn validate_struct_fields(fields: &[StructField]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();

    for field in fields {
        if !seen.insert(field.name.clone()) {
            issues.push(ValidationIssue::new(
                Severity::Error,
                "struct.duplicate_field",
                format!("duplicate field name '{}'", field.name),
            ));
        }
        if field.references_struct_type {
            issues.push(ValidationIssue::new(
                Severity::Error,
                "struct.nested_struct_forbidden",
                format!(
                    "field '{}' references another struct type; structs cannot nest",
                    field.name
                ),
            ));
        }
    }

    issues
}

/// Validate that every field an instance declares as required is present
/// in the instance's content.
pub fn validate_required_fields_present(
    fields: &[StructField],
    content: &serde_json::Map<String, serde_json::Value>,
) -> Vec<ValidationIssue> {
    fields
        .iter()
        .filter(|f| f.required && !content.contains_key(&f.name))
        .map(|f| {
            ValidationIssue::new(
                Severity::Error,
                "struct.required_field_missing",
                format!("required field '{}' is missing", f.name),
            )
        })
        .collect()
}
