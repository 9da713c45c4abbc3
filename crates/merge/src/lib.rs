//! The merge engine (C6): three-way diff classification, conflict
//! resolution, and background DAG compaction.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compaction;
pub mod conflict;
pub mod diff3;
pub mod engine;
pub mod resolver;
pub mod stats;

pub use compaction::{compact, compact_chain, verify_reachability, CommitMeta, CompactedRange, CompactionResult, DEFAULT_CHAIN_LENGTH_THRESHOLD};
pub use conflict::{conflict_id, Conflict, ConflictSeverity, ConflictType, Resolution};
pub use diff3::{classify, DiffCategory, ResourceState};
pub use engine::{merge, MergePlan, MergedResource};
pub use resolver::resolve;
pub use stats::{resolution_stats, ResolutionStats};
