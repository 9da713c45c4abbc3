//! Resolution statistics: a breakdown of how a completed merge's conflicts
//! were handled, by resolution strategy.

use crate::conflict::Conflict;
use crate::engine::MergePlan;
use std::collections::HashMap;

/// Aggregate counts over one [`MergePlan`]'s conflicts.
#[derive(Debug, Clone, Default)]
pub struct ResolutionStats {
    /// Total conflicts raised.
    pub total_conflicts: usize,
    /// Conflicts that carried a [`crate::conflict::Resolution`].
    pub auto_resolved: usize,
    /// Conflicts left for manual review.
    pub unresolved: usize,
    /// Count of resolved conflicts per strategy action (`"type_widen"`,
    /// `"constraint_union"`, ...).
    pub by_strategy: HashMap<String, usize>,
}

/// Compute [`ResolutionStats`] for a completed merge.
pub fn resolution_stats(plan: &MergePlan) -> ResolutionStats {
    let mut stats = ResolutionStats { total_conflicts: plan.conflicts.len(), ..Default::default() };
    for conflict in &plan.conflicts {
        match resolution_action(conflict) {
            Some(action) => {
                stats.auto_resolved += 1;
                *stats.by_strategy.entry(action.to_string()).or_insert(0) += 1;
            }
            None => stats.unresolved += 1,
        }
    }
    stats
}

fn resolution_action(conflict: &Conflict) -> Option<&str> {
    conflict.suggested_resolution.as_ref().map(|r| r.action.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff3::ResourceState;
    use crate::engine::merge;
    use oms_core::resource::{BranchName, ResourceType};
    use oms_core::resource::ResourceRef;
    use serde_json::json;

    #[test]
    fn stats_count_resolved_and_unresolved_by_strategy() {
        let resource = ResourceRef::new(ResourceType::Property, "email", BranchName::main());
        let base = vec![ResourceState { resource: resource.clone(), content_hash: Some("h0".into()), content: Some(json!("string")) }];
        let a = vec![ResourceState { resource: resource.clone(), content_hash: Some("ha".into()), content: Some(json!("string")) }];
        let b = vec![ResourceState { resource, content_hash: Some("hb".into()), content: Some(json!("text")) }];

        let plan = merge(&base, &a, &b);
        let stats = resolution_stats(&plan);
        assert_eq!(stats.total_conflicts, 1);
        assert_eq!(stats.auto_resolved, 1);
        assert_eq!(stats.unresolved, 0);
        assert_eq!(stats.by_strategy.get("type_widen"), Some(&1));
    }
}
