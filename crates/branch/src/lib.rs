//! The branch registry (C5): lifecycle state machine, head-commit tracking,
//! and branch-to-branch diffing.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod branch;
pub mod diff;
pub mod registry;
pub mod state;

pub use branch::Branch;
pub use diff::{ChangeSet, ResourceDivergence};
pub use registry::BranchRegistry;
pub use state::BranchState;
