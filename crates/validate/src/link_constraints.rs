//! Link-type constraints: cardinality, directionality, and reverse-reference
//! naming.

use crate::issue::{Severity, ValidationIssue};
use serde::{Deserialize, Serialize};

/// How many entities may participate on each side of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// One-to-one.
    OneToOne,
    /// One-to-many.
    OneToMany,
    /// Many-to-one.
    ManyToOne,
    /// Many-to-many.
    ManyToMany,
}

/// Whether a link can be traversed from one side only or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Directionality {
    /// Traversable from the source side only.
    Unidirectional,
    /// Traversable from either side.
    Bidirectional,
}

/// A link type definition, as far as C4 needs to see it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkTypeDef {
    /// The forward reference name (the field name on the source type).
    pub name: String,
    /// The reverse reference name, if the author provided one explicitly.
    pub reverse_name: Option<String>,
    /// Cardinality of the relationship.
    pub cardinality: Cardinality,
    /// Whether the link is traversable from both sides.
    pub directionality: Directionality,
}

/// Validate a link type definition.
///
/// Bidirectional links must have a reverse reference name; if the author
/// did not supply one, the expected default is `inverse_<name>` and a
/// mismatch against that default is reported (not auto-fixed, since the
/// author may have intentionally chosen a different name — a missing
/// reverse name when one is required is the only hard error here).
pub fn validate_link_type(def: &LinkTypeDef) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if def.directionality == Directionality::Bidirectional {
        match &def.reverse_name {
            None => {
                issues.push(ValidationIssue::new(
                    Severity::Error,
                    "link.missing_reverse_name",
                    format!(
                        "bidirectional link '{}' must declare a reverse reference name",
                        def.name
                    ),
                ));
            }
            Some(reverse) => {
                let expected = default_reverse_name(&def.name);
                if reverse != &expected {
                    issues.push(ValidationIssue::new(
                        Severity::Info,
                        "link.nonstandard_reverse_name",
                        format!(
                            "reverse reference name '{reverse}' differs from the default '{expected}'"
                        ),
                    ));
                }
            }
        }
    } else if def.reverse_name.is_some() {
        issues.push(ValidationIssue::new(
            Severity::Warn,
            "link.unused_reverse_name",
            format!("unidirectional link '{}' declares a reverse name that will not be used", def.name),
        ));
    }

    issues
}

/// The default reverse reference name for a forward link name.
pub fn default_reverse_name(name: &str) -> String {
    format!("inverse_{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bidirectional_link_without_reverse_name_is_rejected() {
        let def = LinkTypeDef {
            name: "owns".to_string(),
            reverse_name: None,
            cardinality: Cardinality::OneToMany,
            directionality: Directionality::Bidirectional,
        };
        let issues = validate_link_type(&def);
        assert!(issues.iter().any(|i| i.code == "link.missing_reverse_name"));
    }

    #[test]
    fn nonstandard_reverse_name_is_advisory_only() {
        let def = LinkTypeDef {
            name: "owns".to_string(),
            reverse_name: Some("owned_by".to_string()),
            cardinality: Cardinality::OneToMany,
            directionality: Directionality::Bidirectional,
        };
        let issues = validate_link_type(&def);
        let issue = issues.iter().find(|i| i.code == "link.nonstandard_reverse_name").unwrap();
        assert_eq!(issue.severity, crate::issue::Severity::Info);
    }

    #[test]
    fn default_reverse_name_matches_convention() {
        let def = LinkTypeDef {
            name: "owns".to_string(),
            reverse_name: Some("inverse_owns".to_string()),
            cardinality: Cardinality::OneToMany,
            directionality: Directionality::Bidirectional,
        };
        assert!(validate_link_type(&def).is_empty());
    }

    #[test]
    fn unidirectional_link_with_reverse_name_warns() {
        let def = LinkTypeDef {
            name: "owns".to_string(),
            reverse_name: Some("owned_by".to_string()),
            cardinality: Cardinality::ManyToOne,
            directionality: Directionality::Unidirectional,
        };
        let issues = validate_link_type(&def);
        assert!(issues.iter().any(|i| i.code == "link.unused_reverse_name"));
    }
}
