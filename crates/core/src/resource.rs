//! Resource addressing: what a schema element is and how it is identified.
//!
//! A [`ResourceRef`] is the universal way to name any schema element in the
//! system — the OMS analogue of the teacher database's `EntityRef`. Every
//! version, lock, conflict, and event envelope carries one.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a branch name.
pub const MAX_BRANCH_NAME_LENGTH: usize = 256;

/// The name of the default, parentless branch.
pub const MAIN_BRANCH: &str = "main";

/// Discriminates the kind of schema element a [`ResourceRef`] addresses.
///
/// Mirrors spec §3's resource type list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// An object type (entity schema).
    ObjectType,
    /// A link type (relationship schema).
    LinkType,
    /// A property definition.
    Property,
    /// An action type.
    ActionType,
    /// A struct type.
    StructType,
    /// A semantic type.
    SemanticType,
    /// A branch's own metadata resource.
    Branch,
    /// A proposal (a pending, reviewable set of changes).
    Proposal,
}

impl ResourceType {
    /// The canonical lowercase name, as used in event types and storage keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::ObjectType => "object_type",
            ResourceType::LinkType => "link_type",
            ResourceType::Property => "property",
            ResourceType::ActionType => "action_type",
            ResourceType::StructType => "struct_type",
            ResourceType::SemanticType => "semantic_type",
            ResourceType::Branch => "branch",
            ResourceType::Proposal => "proposal",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ResourceType {
    type Err = ();

    /// The inverse of [`ResourceType::as_str`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "object_type" => Ok(ResourceType::ObjectType),
            "link_type" => Ok(ResourceType::LinkType),
            "property" => Ok(ResourceType::Property),
            "action_type" => Ok(ResourceType::ActionType),
            "struct_type" => Ok(ResourceType::StructType),
            "semantic_type" => Ok(ResourceType::SemanticType),
            "branch" => Ok(ResourceType::Branch),
            "proposal" => Ok(ResourceType::Proposal),
            _ => Err(()),
        }
    }
}

/// A validated branch name.
///
/// ## Validation rules
///
/// - 1-256 characters
/// - Characters: `[a-zA-Z0-9_.-]`
/// - Cannot start with `-` or `.`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BranchName(String);

/// Error validating a [`BranchName`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BranchNameError {
    /// Name is empty.
    #[error("branch name cannot be empty")]
    Empty,
    /// Name exceeds [`MAX_BRANCH_NAME_LENGTH`].
    #[error("branch name too long: {length} chars (max {max})")]
    TooLong {
        /// Actual length.
        length: usize,
        /// Maximum allowed length.
        max: usize,
    },
    /// Name contains a disallowed character.
    #[error("invalid character '{char}' at position {position}")]
    InvalidChar {
        /// The offending character.
        char: char,
        /// Its byte position.
        position: usize,
    },
    /// Name starts with `-` or `.`.
    #[error("branch name cannot start with '{char}'")]
    InvalidStart {
        /// The offending leading character.
        char: char,
    },
}

impl BranchName {
    /// Validate and construct a branch name.
    pub fn new(name: impl Into<String>) -> Result<Self, BranchNameError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(BranchName(name))
    }

    /// Construct the well-known root branch, `main`.
    pub fn main() -> Self {
        BranchName(MAIN_BRANCH.to_string())
    }

    /// Whether this is the `main` branch.
    pub fn is_main(&self) -> bool {
        self.0 == MAIN_BRANCH
    }

    /// Validate a branch name without constructing one.
    pub fn validate(name: &str) -> Result<(), BranchNameError> {
        if name.is_empty() {
            return Err(BranchNameError::Empty);
        }
        if name.len() > MAX_BRANCH_NAME_LENGTH {
            return Err(BranchNameError::TooLong {
                length: name.len(),
                max: MAX_BRANCH_NAME_LENGTH,
            });
        }
        let first = name.chars().next().unwrap();
        if first == '-' || first == '.' {
            return Err(BranchNameError::InvalidStart { char: first });
        }
        for (i, c) in name.char_indices() {
            if !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.') {
                return Err(BranchNameError::InvalidChar {
                    char: c,
                    position: i,
                });
            }
        }
        Ok(())
    }

    /// Borrow the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BranchName {
    type Err = BranchNameError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BranchName::new(s)
    }
}

/// Universal reference to a schema element: `(resource_type, resource_id, branch)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    /// The kind of schema element.
    pub resource_type: ResourceType,
    /// The element's identifier, unique within `(resource_type, branch)`.
    pub resource_id: String,
    /// The branch this reference is scoped to.
    pub branch: BranchName,
}

impl ResourceRef {
    /// Construct a new resource reference.
    pub fn new(
        resource_type: ResourceType,
        resource_id: impl Into<String>,
        branch: BranchName,
    ) -> Self {
        ResourceRef {
            resource_type,
            resource_id: resource_id.into(),
            branch,
        }
    }

    /// A storage/lock key derived from this reference: `<branch>/<type>/<id>`.
    pub fn storage_key(&self) -> String {
        format!("{}/{}/{}", self.branch, self.resource_type, self.resource_id)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}@{}",
            self.resource_type, self.resource_id, self.branch
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        assert!(BranchName::new("training-run-1").is_ok());
        assert!(BranchName::new("experiment.v2").is_ok());
        assert!(BranchName::new("prod_agent_2024").is_ok());
        assert!(BranchName::new("main").unwrap().is_main());
    }

    #[test]
    fn rejects_invalid_names() {
        assert_eq!(BranchName::new(""), Err(BranchNameError::Empty));
        assert!(matches!(
            BranchName::new("-starts-with-dash"),
            Err(BranchNameError::InvalidStart { char: '-' })
        ));
        assert!(matches!(
            BranchName::new("has spaces"),
            Err(BranchNameError::InvalidChar { .. })
        ));
    }

    #[test]
    fn resource_ref_storage_key() {
        let r = ResourceRef::new(ResourceType::ObjectType, "User", BranchName::main());
        assert_eq!(r.storage_key(), "main/object_type/User");
    }
}
