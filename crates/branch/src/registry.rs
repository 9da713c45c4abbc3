//! The branch registry: create/get/list/lock-for-merge/unlock/freeze/archive.

use crate::branch::Branch;
use crate::diff::{diff_heads, ChangeSet};
use crate::state::BranchState;
use dashmap::DashMap;
use oms_core::resource::BranchName;
use oms_core::timestamp::Timestamp;
use oms_core::{OmsError, Result};
use parking_lot::RwLock;

/// In-memory registry of branches, keyed by name.
///
/// Mirrors the concurrency discipline of the version store: one `RwLock`
/// per branch inside a `DashMap`, so unrelated branches never contend.
pub struct BranchRegistry {
    branches: DashMap<String, RwLock<Branch>>,
}

impl BranchRegistry {
    /// A registry containing only `main`, created by `created_by`.
    pub fn new(created_by: impl Into<String>, now: Timestamp) -> Self {
        let registry = BranchRegistry {
            branches: DashMap::new(),
        };
        let main = Branch::main(created_by, now);
        registry.branches.insert(main.name.as_str().to_string(), RwLock::new(main));
        registry
    }

    /// Create a new branch forked from `parent`, snapshotting its heads.
    ///
    /// Fails [`OmsError::NotFound`] if `parent` does not exist, or
    /// [`OmsError::AlreadyExists`] if `name` is already in use.
    pub fn create(
        &self,
        id: impl Into<String>,
        name: BranchName,
        parent: &BranchName,
        created_by: impl Into<String>,
        now: Timestamp,
    ) -> Result<Branch> {
        if self.branches.contains_key(name.as_str()) {
            return Err(OmsError::AlreadyExists {
                resource: branch_resource_ref(&name),
            });
        }
        let parent_branch = self
            .branches
            .get(parent.as_str())
            .ok_or_else(|| OmsError::NotFound {
                resource: branch_resource_ref(parent),
            })?;
        let forked = parent_branch.read().fork(id, name.clone(), created_by, now);
        self.branches
            .insert(name.as_str().to_string(), RwLock::new(forked.clone()));
        tracing::info!(branch = %name, parent = %parent, "branch created");
        Ok(forked)
    }

    /// Look up a branch by name.
    pub fn get(&self, name: &BranchName) -> Result<Branch> {
        self.branches
            .get(name.as_str())
            .map(|b| b.read().clone())
            .ok_or_else(|| OmsError::NotFound {
                resource: branch_resource_ref(name),
            })
    }

    /// All branches, in no particular order.
    pub fn list(&self) -> Vec<Branch> {
        self.branches.iter().map(|entry| entry.value().read().clone()).collect()
    }

    /// Fail if `name`'s current state does not accept writes.
    pub fn require_writable(&self, name: &BranchName) -> Result<()> {
        let branch = self.get(name)?;
        if !branch.state.is_writable() {
            return Err(OmsError::BranchNotWritable {
                branch: name.to_string(),
                status: branch.state.to_string(),
            });
        }
        Ok(())
    }

    /// Transition `name` from `ACTIVE` to `LOCKED_FOR_MERGE`.
    pub fn lock_for_merge(&self, name: &BranchName) -> Result<()> {
        self.transition(name, BranchState::LockedForMerge)
    }

    /// Transition `name` from `LOCKED_FOR_MERGE` back to `ACTIVE`.
    pub fn unlock(&self, name: &BranchName) -> Result<()> {
        self.transition(name, BranchState::Active)
    }

    /// Transition `name` from `ACTIVE` to `FROZEN`.
    pub fn freeze(&self, name: &BranchName) -> Result<()> {
        self.transition(name, BranchState::Frozen)
    }

    /// Transition `name` from `FROZEN` back to `ACTIVE`.
    pub fn unfreeze(&self, name: &BranchName) -> Result<()> {
        self.transition(name, BranchState::Active)
    }

    /// Transition `name` to `ARCHIVED`. `main` can never be archived.
    pub fn archive(&self, name: &BranchName) -> Result<()> {
        if name.is_main() {
            return Err(OmsError::ValidationFailed {
                resource: branch_resource_ref(name),
                reason: "the main branch cannot be archived".to_string(),
            });
        }
        self.transition(name, BranchState::Archived)
    }

    /// Apply and persist the new head commit for a resource on a branch.
    /// Only the coordinator's atomic commit path should call this.
    pub fn update_head(&self, name: &BranchName, resource_key: String, commit_hash: String) -> Result<()> {
        let entry = self
            .branches
            .get(name.as_str())
            .ok_or_else(|| OmsError::NotFound {
                resource: branch_resource_ref(name),
            })?;
        entry.write().head_commits.insert(resource_key, commit_hash);
        Ok(())
    }

    /// Diff two branches' head-commit maps.
    pub fn branch_diff(&self, left: &BranchName, right: &BranchName) -> Result<ChangeSet> {
        let left_branch = self.get(left)?;
        let right_branch = self.get(right)?;
        Ok(diff_heads(&left_branch.head_commits, &right_branch.head_commits))
    }

    fn transition(&self, name: &BranchName, next: BranchState) -> Result<()> {
        let entry = self
            .branches
            .get(name.as_str())
            .ok_or_else(|| OmsError::NotFound {
                resource: branch_resource_ref(name),
            })?;
        let mut branch = entry.write();
        if !branch.state.can_transition_to(next) {
            return Err(OmsError::BranchNotWritable {
                branch: name.to_string(),
                status: format!("cannot move from {} to {next}", branch.state),
            });
        }
        branch.state = next;
        tracing::info!(branch = %name, new_state = %next, "branch state transition");
        Ok(())
    }
}

fn branch_resource_ref(name: &BranchName) -> oms_core::resource::ResourceRef {
    oms_core::resource::ResourceRef::new(oms_core::resource::ResourceType::Branch, name.as_str(), name.clone())
}
