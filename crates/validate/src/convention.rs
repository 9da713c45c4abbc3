//! Validation of a naming-convention document itself, as ingested by a
//! tenant: its shape must carry a version, id, a rule map, a reserved-word
//! set, and timestamps before the coordinator will accept it as the active
//! rule set for a branch.

use crate::issue::{Severity, ValidationIssue};
use serde_json::Value;

const REQUIRED_TOP_LEVEL_FIELDS: &[&str] = &["version", "id", "rules", "reserved_words", "created_at"];

/// Validate the shape of a naming-convention document.
///
/// This does not validate the naming rules it contains against real
/// entities — only that the document itself is well-formed enough to be
/// loaded as a rule set.
pub fn validate_convention_document(doc: &Value) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let Value::Object(map) = doc else {
        issues.push(ValidationIssue::new(
            Severity::Error,
            "convention.not_an_object",
            "naming-convention document must be a JSON object",
        ));
        return issues;
    };

    for field in REQUIRED_TOP_LEVEL_FIELDS {
        if !map.contains_key(*field) {
            issues.push(ValidationIssue::new(
                Severity::Error,
                "convention.required_field_missing",
                format!("naming-convention document is missing '{field}'"),
            ));
        }
    }

    if let Some(version) = map.get("version") {
        if !version.is_number() && !version.is_string() {
            issues.push(ValidationIssue::new(
                Severity::Error,
                "convention.invalid_version",
                "'version' must be a number or string",
            ));
        }
    }

    match map.get("rules") {
        Some(Value::Object(_)) => {}
        Some(_) => issues.push(ValidationIssue::new(
            Severity::Error,
            "convention.rules_not_a_map",
            "'rules' must be a map of entity type to naming rule",
        )),
        None => {}
    }

    match map.get("reserved_words") {
        Some(Value::Array(items)) => {
            if !items.iter().all(|v| v.is_string()) {
                issues.push(ValidationIssue::new(
                    Severity::Error,
                    "convention.reserved_words_not_strings",
                    "'reserved_words' must be an array of strings",
                ));
            }
        }
        Some(_) => issues.push(ValidationIssue::new(
            Severity::Error,
            "convention.reserved_words_not_array",
            "'reserved_words' must be an array",
        )),
        None => {}
    }

    if let Some(created_at) = map.get("created_at") {
        let valid = created_at
            .as_str()
            .map(|s| oms_core::timestamp::Timestamp::parse_rfc3339(s).is_some())
            .unwrap_or(false);
        if !valid {
            issues.push(ValidationIssue::new(
                Severity::Error,
                "convention.invalid_timestamp",
                "'created_at' must be an ISO-8601 timestamp",
            ));
        }
    }

    issues
}
