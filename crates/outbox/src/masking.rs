//! Recursive payload masking: configurable field names are replaced with a
//! fixed marker before hashing and publishing.

use serde_json::Value;
use std::collections::HashSet;

/// The replacement value for a masked field.
pub const MASK_MARKER: &str = "***MASKED***";

/// Recursively mask every object field whose key is in `field_names`,
/// anywhere in the document, including inside nested objects and arrays.
pub fn mask_fields(value: &Value, field_names: &HashSet<String>) -> Value {
    match value {
        Value::Object(map) => {
            let masked = map
                .iter()
                .map(|(k, v)| {
                    if field_names.contains(k) {
                        (k.clone(), Value::String(MASK_MARKER.to_string()))
                    } else {
                        (k.clone(), mask_fields(v, field_names))
                    }
                })
                .collect();
            Value::Object(masked)
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| mask_fields(v, field_names)).collect())
        }
        other => other.clone(),
    }
}
