//! The temporal (time-travel) query engine (C9): AS-OF, BETWEEN,
//! ALL-VERSIONS, COMPARE, and SNAPSHOT, read-only over the version store.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod point;

pub use engine::{
    AsOfRow, BetweenRow, CompareClass, CompareRow, EnrichedVersion, QueryPage, QueryStats,
    SnapshotEntry, TemporalEngine,
};
pub use point::TemporalPoint;
