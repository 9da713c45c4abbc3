//! The atomic mutation pipeline (C10, spec §4.10): lock, validate, write,
//! publish, and update the branch head as one logical transaction.

use crate::request::{MutationOutcome, MutationRequest};
use crate::Coordinator;
use oms_core::hash::content_hash;
use oms_core::resource::ResourceRef;
use oms_core::timestamp::Timestamp;
use oms_core::version::ETag;
use oms_core::{OmsError, Result};
use oms_lock::{LockContext, LockMode, LockScope};
use oms_outbox::{build_envelope_payload, mask_fields, EnvelopeDraft};
use oms_storage::{LockBackend, OutboxBackend, VersionStore};
use uuid::Uuid;

impl<L: LockBackend, V: VersionStore, O: OutboxBackend> Coordinator<L, V, O> {
    /// Apply one mutation end to end, per spec §4.10's seven steps.
    pub fn mutate(&self, req: MutationRequest, now: Timestamp) -> Result<MutationOutcome> {
        let _span = tracing::info_span!("mutation", resource = %req.resource).entered();

        // 1. Resolve the branch, reject if not writable.
        self.branches.require_writable(&req.resource.branch)?;

        // 2. Acquire a RESOURCE-scope exclusive lock.
        let mut ctx = LockContext::new();
        let lock_key = req.resource.storage_key();
        let handle = self.lock_manager.acquire(&mut ctx, &lock_key, LockScope::Resource, LockMode::Exclusive, &req.actor)?;

        let result = self.run_locked(&req, now);

        // 7. Release the lock unconditionally; partial writes never persist
        // past this point because steps 4-6 below only commit on success.
        self.lock_manager.release(&mut ctx, &handle)?;

        result
    }

    fn run_locked(&self, req: &MutationRequest, now: Timestamp) -> Result<MutationOutcome> {
        // 3. Load the current version; validate If-Match before validation.
        let head = self.version_service.get_resource_version(&req.resource)?;
        if let Some(if_match) = &req.if_match {
            check_precondition(&req.resource, if_match, head.as_ref().map(|h| h.version))?;
        }

        // 4. Run the validator pipeline against the proposed content.
        let report = self.validators.run(req.content.as_value());
        if report.has_blocking_errors() {
            return Err(OmsError::ValidationFailed {
                resource: req.resource.clone(),
                reason: format!("{} blocking validation issue(s)", report.issues_at_or_above(oms_validate::Severity::Error).len()),
            });
        }

        let prior_commit_hash = head.as_ref().map(|h| h.commit_hash.clone());

        // 5. Write the new version. `track_change` is itself a content-hash
        // deduplicated no-op if nothing changed.
        let version = self.version_service.track_change(
            &req.resource,
            req.content.clone(),
            req.change_type,
            &req.actor,
            req.fields_changed.clone(),
            req.change_summary.clone(),
            now,
        )?;

        let is_noop = prior_commit_hash.as_deref() == Some(version.commit_hash.as_str());
        let outbox_sequence = if is_noop {
            0
        } else {
            match self.publish_lifecycle_event(req, &version, now) {
                Ok(sequence) => sequence,
                Err(err) => {
                    // The version write already landed; undo it rather than
                    // leave a commit with no corresponding lifecycle event,
                    // per the atomic-or-nothing contract on this step.
                    self.version_service.retract_last(&req.resource, version.version)?;
                    return Err(err);
                }
            }
        };

        // 6. Update the branch head for this resource.
        if !is_noop {
            self.branches.update_head(&req.resource.branch, req.resource.storage_key(), version.commit_hash.clone())?;
        }

        Ok(MutationOutcome { etag: version.etag().as_str().to_string(), version, outbox_sequence })
    }

    fn publish_lifecycle_event(&self, req: &MutationRequest, version: &oms_core::version::ResourceVersion, now: Timestamp) -> Result<u64> {
        let masked = mask_fields(version.content.as_value(), &self.masked_fields);
        let draft = EnvelopeDraft {
            event_id: Uuid::new_v4().to_string(),
            resource: req.resource.clone(),
            change_type: req.change_type,
            data: masked,
            commit_hash: version.commit_hash.clone(),
            author: req.actor.clone(),
            correlation_id: req.correlation_id.clone().unwrap_or_else(|| format!("{}-{}", self.config.correlation_prefix, Uuid::new_v4())),
            causation_id: None,
            time: now,
        };
        let payload = build_envelope_payload(&draft);
        self.outbox.append(payload, now)
    }
}

fn check_precondition(resource: &ResourceRef, if_match: &str, current_version: Option<u64>) -> Result<()> {
    let actual = current_version.unwrap_or(0);
    let matches = current_version
        .zip(ETag::parse(if_match))
        .map(|(v, (_, expected_version))| v == expected_version)
        .unwrap_or(false);
    if matches {
        return Ok(());
    }
    let expected = ETag::parse(if_match).map(|(_, v)| v).unwrap_or(0);
    Err(OmsError::PreconditionFailed { resource: resource.clone(), expected, actual })
}

/// Derive a deterministic idempotency key for a retried mutation, useful
/// for callers that want to detect resubmission before even reaching the
/// coordinator (e.g. an HTTP layer deduplicating on this).
pub fn mutation_fingerprint(req: &MutationRequest) -> String {
    content_hash(&serde_json::json!({
        "resource": req.resource.storage_key(),
        "content": req.content.as_value(),
        "change_type": req.change_type,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_passes_when_etag_version_matches() {
        let resource = ResourceRef::new(oms_core::resource::ResourceType::Property, "email", oms_core::resource::BranchName::main());
        let etag = ETag::new("abc123", 2);
        assert!(check_precondition(&resource, etag.as_str(), Some(2)).is_ok());
    }

    #[test]
    fn precondition_fails_on_version_mismatch() {
        let resource = ResourceRef::new(oms_core::resource::ResourceType::Property, "email", oms_core::resource::BranchName::main());
        let etag = ETag::new("abc123", 2);
        let err = check_precondition(&resource, etag.as_str(), Some(3)).unwrap_err();
        assert!(matches!(err, OmsError::PreconditionFailed { expected: 2, actual: 3, .. }));
    }
}
