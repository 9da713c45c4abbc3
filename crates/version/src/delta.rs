//! Types for time-travel lookups and delta responses.

use oms_core::patch::PatchOp;
use oms_core::timestamp::Timestamp;
use serde::{Deserialize, Serialize};

/// A point to resolve a version chain against: a timestamp, an explicit
/// version number, or a commit hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionPoint {
    /// The version active at a point in time.
    At(Timestamp),
    /// An explicit version number.
    Version(u64),
    /// A specific commit hash.
    CommitHash(String),
}

/// The patch that transforms one version into the next, tagged with the
/// version number it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionPatch {
    /// The version number this patch produces.
    pub version: u64,
    /// The operations applied to reach it.
    pub ops: Vec<PatchOp>,
}

/// The outcome of a delta query between a client's known state and the
/// current head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeltaResponse {
    /// The client is already at head; nothing to send.
    NoChange {
        /// The head version number.
        version: u64,
    },
    /// A sequence of patches bringing the client from its version to head.
    Delta {
        /// The client's starting version.
        from_version: u64,
        /// The head version.
        to_version: u64,
        /// One entry per intermediate version.
        patches: Vec<VersionPatch>,
    },
    /// The patch set exceeded the size threshold; the full document is
    /// returned instead.
    Full {
        /// The head version number.
        version: u64,
        /// The full current content.
        content: serde_json::Value,
    },
}

/// The result of a bulk `(resource, etag)` cache revalidation.
#[derive(Debug, Clone, Default)]
pub struct CacheValidation {
    /// Resources whose client-supplied ETag still matches head.
    pub valid: Vec<oms_core::resource::ResourceRef>,
    /// Resources whose client-supplied ETag is stale (a newer version exists).
    pub stale: Vec<oms_core::resource::ResourceRef>,
    /// Resources that have been tombstoned since the client last saw them.
    pub deleted: Vec<oms_core::resource::ResourceRef>,
}
