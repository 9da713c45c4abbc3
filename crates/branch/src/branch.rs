//! The branch record itself.

use crate::state::BranchState;
use oms_core::resource::{BranchName, ResourceRef};
use oms_core::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A branch: a named, independently-mutable view of the schema, forked
/// from a parent at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    /// Stable identifier, distinct from `name` (names may theoretically be
    /// reused after a branch is archived and garbage-collected elsewhere;
    /// the id never is).
    pub id: String,
    /// The branch's human-facing name, unique among non-archived branches.
    pub name: BranchName,
    /// The branch it was forked from. `None` only for `main`.
    pub parent_branch: Option<BranchName>,
    /// When the branch was created.
    pub created_at: Timestamp,
    /// Who created it.
    pub created_by: String,
    /// The latest known commit hash per resource, as of this branch's view,
    /// keyed by [`ResourceRef::storage_key`] (JSON object keys must be
    /// strings; a `ResourceRef` key is recovered via `storage_key` lookups
    /// rather than round-tripped structurally).
    /// Only the coordinator's atomic commit path may mutate this.
    pub head_commits: HashMap<String, String>,
    /// The branch's current lifecycle state.
    pub state: BranchState,
}

impl Branch {
    /// Construct the root `main` branch, with no parent and an empty head map.
    pub fn main(created_by: impl Into<String>, now: Timestamp) -> Self {
        Branch {
            id: "main".to_string(),
            name: BranchName::main(),
            parent_branch: None,
            created_at: now,
            created_by: created_by.into(),
            head_commits: HashMap::new(),
            state: BranchState::Active,
        }
    }

    /// Fork a new branch from `self`, snapshotting its current heads.
    pub fn fork(&self, id: impl Into<String>, name: BranchName, created_by: impl Into<String>, now: Timestamp) -> Self {
        Branch {
            id: id.into(),
            name,
            parent_branch: Some(self.name.clone()),
            created_at: now,
            created_by: created_by.into(),
            head_commits: self.head_commits.clone(),
            state: BranchState::Active,
        }
    }

    /// Whether this is the root branch.
    pub fn is_main(&self) -> bool {
        self.name.is_main()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oms_core::resource::ResourceType;

    #[test]
    fn fork_snapshots_parent_heads() {
        let mut main = Branch::main("alice", Timestamp::from_micros(1));
        main.head_commits.insert(
            ResourceRef::new(ResourceType::ObjectType, "User", BranchName::main()).storage_key(),
            "abc".to_string(),
        );
        let feature = main.fork(
            "b2",
            BranchName::new("feature").unwrap(),
            "bob",
            Timestamp::from_micros(2),
        );
        assert_eq!(feature.head_commits, main.head_commits);
        assert_eq!(feature.parent_branch, Some(BranchName::main()));
    }

    #[test]
    fn main_has_no_parent() {
        let main = Branch::main("alice", Timestamp::now());
        assert!(main.parent_branch.is_none());
        assert!(main.is_main());
    }
}
