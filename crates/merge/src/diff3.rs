//! Three-way diff classification: which resources changed on which side
//! since the merge base, and how.

use oms_core::resource::ResourceRef;
use serde_json::Value;
use std::collections::HashSet;

/// One resource's classification in a three-way merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffCategory {
    /// Added on branch A only.
    OnlyInA,
    /// Added on branch B only.
    OnlyInB,
    /// Deleted on A, modified on B since the base.
    DeletedInAModifiedInB,
    /// Deleted on B, modified on A since the base.
    DeletedInBModifiedInA,
    /// Modified on both sides since the base.
    BothModified,
    /// Modified on exactly one side; applies cleanly with no conflict.
    ModifiedOnOneSide,
    /// Unchanged on both sides since the base.
    Unchanged,
}

/// The state of one resource as of a branch, base, or absence thereof.
#[derive(Debug, Clone)]
pub struct ResourceState {
    /// The resource being tracked.
    pub resource: ResourceRef,
    /// Its content hash on this side, or `None` if it does not exist /
    /// was deleted there.
    pub content_hash: Option<String>,
    /// Its content on this side, for conflict records and resolution.
    pub content: Option<Value>,
}

/// Classify every resource touched on either side relative to the base.
pub fn classify(
    base: &[ResourceState],
    branch_a: &[ResourceState],
    branch_b: &[ResourceState],
) -> Vec<(ResourceRef, DiffCategory)> {
    let base_by_ref: std::collections::HashMap<_, _> =
        base.iter().map(|s| (s.resource.clone(), s)).collect();
    let a_by_ref: std::collections::HashMap<_, _> =
        branch_a.iter().map(|s| (s.resource.clone(), s)).collect();
    let b_by_ref: std::collections::HashMap<_, _> =
        branch_b.iter().map(|s| (s.resource.clone(), s)).collect();

    let mut touched: HashSet<ResourceRef> = HashSet::new();
    touched.extend(base_by_ref.keys().cloned());
    touched.extend(a_by_ref.keys().cloned());
    touched.extend(b_by_ref.keys().cloned());

    touched
        .into_iter()
        .map(|resource| {
            let base_state = base_by_ref.get(&resource);
            let a_state = a_by_ref.get(&resource);
            let b_state = b_by_ref.get(&resource);

            let base_hash = base_state.and_then(|s| s.content_hash.clone());
            let a_hash = a_state.and_then(|s| s.content_hash.clone());
            let b_hash = b_state.and_then(|s| s.content_hash.clone());

            let category = match (base_hash.clone(), a_hash.clone(), b_hash.clone()) {
                (None, Some(_), None) => DiffCategory::OnlyInA,
                (None, None, Some(_)) => DiffCategory::OnlyInB,
                (Some(_), None, Some(b)) if Some(&b) != base_hash.as_ref() => {
                    DiffCategory::DeletedInAModifiedInB
                }
                (Some(_), Some(a), None) if Some(&a) != base_hash.as_ref() => {
                    DiffCategory::DeletedInBModifiedInA
                }
                (Some(base_h), Some(a), Some(b)) => {
                    let a_changed = a != base_h;
                    let b_changed = b != base_h;
                    if a_changed && b_changed && a != b {
                        DiffCategory::BothModified
                    } else if a_changed || b_changed {
                        DiffCategory::ModifiedOnOneSide
                    } else {
                        DiffCategory::Unchanged
                    }
                }
                _ => DiffCategory::Unchanged,
            };
            (resource, category)
        })
        .collect()
}
