//! Shared contract types for the Ontology Management Service core.
//!
//! This crate defines the foundational types used throughout every other
//! `oms-*` crate:
//! - [`ResourceType`] / [`ResourceRef`]: what a schema element is and how it is addressed
//! - [`BranchName`]: validated branch identifiers
//! - [`Timestamp`]: UTC, microsecond-precision points in time
//! - [`Content`]: the canonical structured document type for schema content
//! - [`hash`]: content and commit hashing primitives
//! - [`patch`]: RFC-6902-flavored JSON patch generation and application
//! - [`version`]: the per-resource version record and ETag derivation
//! - [`error`]: the unified error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod content;
pub mod error;
pub mod hash;
pub mod patch;
pub mod resource;
pub mod timestamp;
pub mod version;

pub use content::Content;
pub use error::{OmsError, Result};
pub use hash::{commit_hash, content_hash};
pub use patch::{apply_patch, json_patch, JsonPointer, PatchOp};
pub use resource::{BranchName, BranchNameError, ResourceRef, ResourceType};
pub use timestamp::Timestamp;
pub use version::{ChangeType, ETag, ResourceVersion};
