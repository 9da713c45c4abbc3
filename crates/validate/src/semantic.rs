//! Semantic-type constraints: regex, min/max bounds, and enum membership
//! applied to individual property values.

use crate::issue::{Severity, ValidationIssue};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// A single constraint a semantic type's values must satisfy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SemanticConstraint {
    /// The value, rendered as a string, must match this pattern.
    Regex {
        /// The pattern source.
        pattern: String,
    },
    /// A numeric lower bound, inclusive.
    Min {
        /// The bound.
        value: f64,
    },
    /// A numeric upper bound, inclusive.
    Max {
        /// The bound.
        value: f64,
    },
    /// The value must be one of a fixed set of strings.
    Enum {
        /// The allowed values.
        values: HashSet<String>,
    },
}

impl SemanticConstraint {
    /// Check `value` against this constraint, returning an issue if it is
    /// violated.
    pub fn check(&self, value: &Value) -> Option<ValidationIssue> {
        match self {
            SemanticConstraint::Regex { pattern } => {
                let s = value.as_str()?;
                let re = Regex::new(pattern).ok()?;
                if re.is_match(s) {
                    None
                } else {
                    Some(ValidationIssue::new(
                        Severity::Error,
                        "semantic.regex_mismatch",
                        format!("value '{s}' does not match pattern '{pattern}'"),
                    ))
                }
            }
            SemanticConstraint::Min { value: min } => {
                let n = value.as_f64()?;
                if n >= *min {
                    None
                } else {
                    Some(ValidationIssue::new(
                        Severity::Error,
                        "semantic.below_minimum",
                        format!("value {n} is below the minimum of {min}"),
                    ))
                }
            }
            SemanticConstraint::Max { value: max } => {
                let n = value.as_f64()?;
                if n <= *max {
                    None
                } else {
                    Some(ValidationIssue::new(
                        Severity::Error,
                        "semantic.above_maximum",
                        format!("value {n} is above the maximum of {max}"),
                    ))
                }
            }
            SemanticConstraint::Enum { values } => {
                let s = value.as_str()?;
                if values.contains(s) {
                    None
                } else {
                    Some(ValidationIssue::new(
                        Severity::Error,
                        "semantic.not_in_enum",
                        format!("value '{s}' is not one of the allowed values"),
                    ))
                }
            }
        }
    }
}

/// Validate a single value against every constraint of a semantic type.
pub fn validate_semantic_value(
    value: &Value,
    constraints: &[SemanticConstraint],
) -> Vec<ValidationIssue> {
    constraints.iter().filter_map(|c| c.check(value)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn regex_constraint_rejects_non_matching_strings() {
        let c = SemanticConstraint::Regex {
            pattern: r"^\d{3}-\d{4}$".to_string(),
        };
        assert!(c.check(&json!("555-1234")).is_none());
        assert!(c.check(&json!("not-a-phone")).is_some());
    }

    #[test]
    fn min_max_bound_numeric_values() {
        let min = SemanticConstraint::Min { value: 0.0 };
        let max = SemanticConstraint::Max { value: 100.0 };
        assert!(min.check(&json!(-1)).is_some());
        assert!(max.check(&json!(101)).is_some());
        assert!(min.check(&json!(50)).is_none());
        assert!(max.check(&json!(50)).is_none());
    }

    #[test]
    fn enum_constraint_rejects_unknown_values() {
        let values: HashSet<String> = ["red", "green", "blue"].iter().map(|s| s.to_string()).collect();
        let c = SemanticConstraint::Enum { values };
        assert!(c.check(&json!("red")).is_none());
        assert!(c.check(&json!("purple")).is_some());
    }

    #[test]
    fn all_violated_constraints_are_collected() {
        let constraints = vec![
            SemanticConstraint::Min { value: 10.0 },
            SemanticConstraint::Max { value: 20.0 },
        ];
        let issues = validate_semantic_value(&json!(5), &constraints);
        assert_eq!(issues.len(), 1);
    }
}
