//! Applying a resolved [`MergePlan`] to a target branch: one version (and
//! one outbox event) per affected resource, written only if nothing in
//! the plan blocks the merge.

use crate::request::{MutationOutcome, MutationRequest};
use crate::Coordinator;
use oms_core::content::Content;
use oms_core::timestamp::Timestamp;
use oms_core::version::ChangeType;
use oms_core::{OmsError, Result};
use oms_merge::MergePlan;
use oms_storage::{LockBackend, OutboxBackend, VersionStore};

impl<L: LockBackend, V: VersionStore, O: OutboxBackend> Coordinator<L, V, O> {
    /// Write every resource in a merge plan to `target_branch`, actor
    /// `merged_by`. Fails without writing anything if the plan is blocked.
    ///
    /// Per spec, a merge produces one outbox event per affected resource,
    /// not one compound "merge completed" event — each resource's change
    /// still needs its own lifecycle event for downstream consumers (C8)
    /// to project correctly.
    pub fn apply_merge(
        &self,
        plan: &MergePlan,
        target_branch: &oms_core::resource::BranchName,
        merged_by: &str,
        now: Timestamp,
    ) -> Result<Vec<MutationOutcome>> {
        if plan.is_blocked() {
            return Err(OmsError::MergeUnresolved {
                conflict_count: plan.conflicts.iter().filter(|c| c.severity.blocks_merge()).count(),
            });
        }

        let mut outcomes = Vec::with_capacity(plan.resolved.len());
        for merged in &plan.resolved {
            let mut resource = merged.resource.clone();
            resource.branch = target_branch.clone();

            let content = match (&merged.change_type, &merged.content) {
                (ChangeType::Deleted, _) => Content::new(serde_json::Value::Null)
                    .map_err(|e| OmsError::ValidationFailed { resource: resource.clone(), reason: e.to_string() })?,
                (_, Some(value)) => Content::new(value.clone())
                    .map_err(|e| OmsError::ValidationFailed { resource: resource.clone(), reason: e.to_string() })?,
                (_, None) => {
                    return Err(OmsError::ValidationFailed {
                        resource: resource.clone(),
                        reason: "merge produced a non-delete change with no content".to_string(),
                    })
                }
            };

            let request = MutationRequest {
                resource,
                content,
                change_type: merged.change_type,
                actor: merged_by.to_string(),
                if_match: None,
                fields_changed: Vec::new(),
                change_summary: Some("merge".to_string()),
                correlation_id: None,
            };
            outcomes.push(self.mutate(request, now)?);
        }
        Ok(outcomes)
    }
}
