//! Branch-to-branch structural diffs (head-commit comparison only; the
//! merge engine performs the deeper three-way content diff).

use serde::{Deserialize, Serialize};

/// One resource's head-commit divergence between two branches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDivergence {
    /// The resource's storage key.
    pub resource_key: String,
    /// Its head commit hash on the left branch, if it exists there.
    pub left_commit: Option<String>,
    /// Its head commit hash on the right branch, if it exists there.
    pub right_commit: Option<String>,
}

/// The set of resources whose head commits differ between two branches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Present only on the left branch.
    pub only_in_left: Vec<ResourceDivergence>,
    /// Present only on the right branch.
    pub only_in_right: Vec<ResourceDivergence>,
    /// Present on both, with different head commits.
    pub diverged: Vec<ResourceDivergence>,
}

/// Compute the head-commit-level diff between two branches' head maps.
pub fn diff_heads(
    left: &std::collections::HashMap<String, String>,
    right: &std::collections::HashMap<String, String>,
) -> ChangeSet {
    let mut change_set = ChangeSet::default();

    for (key, left_commit) in left {
        match right.get(key) {
            None => change_set.only_in_left.push(ResourceDivergence {
                resource_key: key.clone(),
                left_commit: Some(left_commit.clone()),
                right_commit: None,
            }),
            Some(right_commit) if right_commit != left_commit => {
                change_set.diverged.push(ResourceDivergence {
                    resource_key: key.clone(),
                    left_commit: Some(left_commit.clone()),
                    right_commit: Some(right_commit.clone()),
                })
            }
            Some(_) => {}
        }
    }
    for (key, right_commit) in right {
        if !left.contains_key(key) {
            change_set.only_in_right.push(ResourceDivergence {
                resource_key: key.clone(),
                left_commit: None,
                right_commit: Some(right_commit.clone()),
            });
        }
    }

    change_set
}
