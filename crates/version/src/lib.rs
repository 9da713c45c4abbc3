//! Per-resource version store (C2): content-hash deduplicated writes,
//! ETag-validated reads, and delta/cache queries over an
//! [`oms_storage::VersionStore`] backend.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod delta;
pub mod service;

pub use delta::{CacheValidation, DeltaResponse, VersionPatch, VersionPoint};
pub use service::{VersionService, DELTA_FULL_THRESHOLD};
