//! Per-resource version records and ETag derivation.
//!
//! Each mutation to a resource appends a new [`ResourceVersion`] to that
//! resource's version chain. Version numbers are monotonic and gap-free
//! within `(resource_type, resource_id, branch)`; the chain is never
//! truncated, including on delete (§3: deletions are soft).

use crate::content::Content;
use crate::hash::short_hash;
use crate::patch::PatchOp;
use crate::resource::ResourceRef;
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of mutation produced a version.
///
/// A merge commit still classifies as one of these three per affected
/// resource — there is no separate "merged" change type; whether a merge
/// created, updated, or deleted a given resource is derived per-resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// The resource was created.
    Created,
    /// The resource's content was updated.
    Updated,
    /// The resource was soft-deleted (tombstoned).
    Deleted,
}

/// A weak ETag derived from a version's commit hash and version number:
/// `W/"<12-hex>-<version>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ETag(String);

impl ETag {
    /// Derive the ETag for a given commit hash and version number.
    pub fn new(commit_hash: &str, version: u64) -> Self {
        ETag(format!("W/\"{}-{}\"", short_hash(commit_hash), version))
    }

    /// Parse an ETag string back into its `(short_hash, version)` parts.
    ///
    /// Returns `None` if the string is not well-formed.
    pub fn parse(s: &str) -> Option<(String, u64)> {
        let inner = s.strip_prefix("W/\"")?.strip_suffix('"')?;
        let (hash, version) = inner.rsplit_once('-')?;
        let version: u64 = version.parse().ok()?;
        Some((hash.to_string(), version))
    }

    /// The raw ETag string, as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry in a resource's append-only version chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceVersion {
    /// The resource this version belongs to.
    pub resource: ResourceRef,
    /// Monotonic, gap-free version number starting at 1.
    pub version: u64,
    /// The previous version number, or `None` for version 1.
    pub parent_version: Option<u64>,
    /// What kind of mutation produced this version.
    pub change_type: ChangeType,
    /// The full document at this version.
    pub content: Content,
    /// SHA-256 content hash of this version's document.
    pub content_hash: String,
    /// Serialized size of the content, in bytes.
    pub content_size: usize,
    /// SHA-256 chained commit hash: `hash(parent_hash || content_hash || author || timestamp)`.
    pub commit_hash: String,
    /// The commit hash of the previous version, or `None` for version 1.
    pub parent_hash: Option<String>,
    /// The patch that transforms the parent version's document into this
    /// one. Empty for version 1 (the initial document is the "patch").
    pub patch: Vec<PatchOp>,
    /// Top-level field names touched by this version, relative to its
    /// parent.
    pub fields_changed: Vec<String>,
    /// Who made this change.
    pub author: String,
    /// When this version was recorded.
    pub timestamp: Timestamp,
    /// Free-form description of the change, analogous to a Git commit message.
    pub change_summary: Option<String>,
}

impl ResourceVersion {
    /// This version's ETag.
    pub fn etag(&self) -> ETag {
        ETag::new(&self.commit_hash, self.version)
    }

    /// Whether this version represents a tombstone.
    pub fn is_tombstone(&self) -> bool {
        matches!(self.change_type, ChangeType::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{BranchName, ResourceType};

    fn sample_ref() -> ResourceRef {
        ResourceRef::new(ResourceType::ObjectType, "User", BranchName::main())
    }

    #[test]
    fn etag_round_trips() {
        let tag = ETag::new("abcdef0123456789", 3);
        assert_eq!(tag.as_str(), "W/\"abcdef012345-3\"");
        let (hash, version) = ETag::parse(tag.as_str()).unwrap();
        assert_eq!(hash, "abcdef012345");
        assert_eq!(version, 3);
    }

    #[test]
    fn etag_parse_rejects_malformed() {
        assert_eq!(ETag::parse("not-an-etag"), None);
        assert_eq!(ETag::parse("W/\"missing-dash\""), None);
    }

    #[test]
    fn tombstone_detection() {
        let v = ResourceVersion {
            resource: sample_ref(),
            version: 2,
            parent_version: Some(1),
            change_type: ChangeType::Deleted,
            content: Content::empty_object(),
            content_hash: "c".into(),
            content_size: 0,
            commit_hash: "h".into(),
            parent_hash: Some("p".into()),
            patch: vec![],
            fields_changed: vec![],
            author: "alice".into(),
            timestamp: Timestamp::now(),
            change_summary: None,
        };
        assert!(v.is_tombstone());
    }
}
