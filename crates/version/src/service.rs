//! The version store service: `track_change` and its read-side companions.

use crate::delta::{CacheValidation, DeltaResponse, VersionPatch, VersionPoint};
use oms_core::content::Content;
use oms_core::hash::{commit_hash, content_hash};
use oms_core::patch::json_patch;
use oms_core::resource::ResourceRef;
use oms_core::timestamp::Timestamp;
use oms_core::version::{ChangeType, ResourceVersion};
use oms_core::{OmsError, Result};
use oms_storage::VersionStore;
use std::collections::HashMap;
use std::sync::Arc;

/// Above this many patch operations, [`VersionService::get_delta`] returns
/// the full document instead of a patch chain — the point past which
/// shipping the whole document is cheaper than shipping the diff.
pub const DELTA_FULL_THRESHOLD: usize = 200;

/// Per-resource version chain management: content-hash deduplicated
/// writes, ETag-validated reads, and delta queries.
pub struct VersionService<S: VersionStore> {
    store: Arc<S>,
}

impl<S: VersionStore> VersionService<S> {
    /// Build a service over `store`.
    pub fn new(store: Arc<S>) -> Self {
        VersionService { store }
    }

    /// Record a change to a resource.
    ///
    /// If the proposed content hashes identically to the current head, no
    /// new version is created and the existing head is returned
    /// (idempotent no-op) — this holds regardless of `change_type`, per the
    /// content-hash equality rule.
    #[allow(clippy::too_many_arguments)]
    pub fn track_change(
        &self,
        resource: &ResourceRef,
        content: Content,
        change_type: ChangeType,
        actor: &str,
        fields_changed: Vec<String>,
        change_summary: Option<String>,
        now: Timestamp,
    ) -> Result<ResourceVersion> {
        let head = self.store.latest(resource)?;
        let new_hash = content_hash(content.as_value());

        if let Some(head) = &head {
            if head.content_hash == new_hash {
                tracing::debug!(resource = %resource, version = head.version, "track_change no-op: content unchanged");
                return Ok(head.clone());
            }
        }

        if matches!(change_type, ChangeType::Deleted) && head.is_none() {
            return Err(OmsError::NotFound {
                resource: resource.clone(),
            });
        }

        let parent_hash = head.as_ref().map(|h| h.commit_hash.clone());
        let parent_version = head.as_ref().map(|h| h.version);
        let version = parent_version.unwrap_or(0) + 1;
        let new_commit_hash = commit_hash(
            parent_hash.as_deref(),
            &new_hash,
            actor,
            &now.to_rfc3339(),
        );
        let patch = match &head {
            Some(h) => json_patch(h.content.as_value(), content.as_value()),
            None => json_patch(&serde_json::Value::Null, content.as_value()),
        };
        let content_size = serde_json::to_vec(content.as_value())
            .map(|b| b.len())
            .unwrap_or(0);

        let record = ResourceVersion {
            resource: resource.clone(),
            version,
            parent_version,
            change_type,
            content,
            content_hash: new_hash,
            content_size,
            commit_hash: new_commit_hash,
            parent_hash,
            patch,
            fields_changed,
            author: actor.to_string(),
            timestamp: now,
            change_summary,
        };

        self.store.append(resource, record.clone())?;
        tracing::info!(resource = %resource, version, change_type = ?record.change_type, "version recorded");
        Ok(record)
    }

    /// The current head version of a resource.
    pub fn get_resource_version(&self, resource: &ResourceRef) -> Result<Option<ResourceVersion>> {
        self.store.latest(resource)
    }

    /// Undo a [`VersionService::track_change`] whose downstream effects
    /// could not be completed. Only pops the chain's head, and only if it
    /// is still exactly `version` — see [`VersionStore::retract_last`].
    pub fn retract_last(&self, resource: &ResourceRef, version: u64) -> Result<bool> {
        self.store.retract_last(resource, version)
    }

    /// The version of a resource resolved at `point`.
    pub fn get_version_at(
        &self,
        resource: &ResourceRef,
        point: &VersionPoint,
    ) -> Result<Option<ResourceVersion>> {
        let chain = self.store.list(resource)?;
        Ok(match point {
            VersionPoint::Version(v) => chain.into_iter().find(|r| r.version == *v),
            VersionPoint::CommitHash(h) => chain.into_iter().find(|r| &r.commit_hash == h),
            VersionPoint::At(ts) => {
                // The version whose validity interval [timestamp(v), timestamp(v+1))
                // contains `ts`: the latest version not newer than `ts`.
                chain
                    .into_iter()
                    .filter(|r| r.timestamp <= *ts)
                    .max_by_key(|r| r.version)
            }
        })
    }

    /// Strict weak-ETag equality against head. Returns `(is_valid, current_head)`.
    pub fn validate_etag(
        &self,
        resource: &ResourceRef,
        etag: &str,
    ) -> Result<(bool, Option<ResourceVersion>)> {
        let head = self.store.latest(resource)?;
        let is_valid = match &head {
            Some(h) => h.etag().as_str() == etag,
            None => false,
        };
        Ok((is_valid, head))
    }

    /// Chronological history of a resource, paginated.
    pub fn list_versions(
        &self,
        resource: &ResourceRef,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ResourceVersion>> {
        let chain = self.store.list(resource)?;
        Ok(chain.into_iter().skip(offset).take(limit).collect())
    }

    /// Compute what a client needs to catch up to head, given the version
    /// (or ETag) it last saw.
    pub fn get_delta(
        &self,
        resource: &ResourceRef,
        client_version: Option<u64>,
        client_etag: Option<&str>,
    ) -> Result<DeltaResponse> {
        let chain = self.store.list(resource)?;
        let head = chain
            .last()
            .cloned()
            .ok_or_else(|| OmsError::NotFound {
                resource: resource.clone(),
            })?;

        let from_version = match (client_version, client_etag) {
            (Some(v), _) => v,
            (None, Some(etag)) => {
                oms_core::version::ETag::parse(etag)
                    .map(|(_, v)| v)
                    .unwrap_or(0)
            }
            (None, None) => 0,
        };

        if from_version >= head.version {
            return Ok(DeltaResponse::NoChange {
                version: head.version,
            });
        }

        let intermediate: Vec<&ResourceVersion> = chain
            .iter()
            .filter(|r| r.version > from_version)
            .collect();
        let total_ops: usize = intermediate.iter().map(|r| r.patch.len()).sum();

        if total_ops > DELTA_FULL_THRESHOLD {
            return Ok(DeltaResponse::Full {
                version: head.version,
                content: head.content.as_value().clone(),
            });
        }

        let patches = intermediate
            .into_iter()
            .map(|r| VersionPatch {
                version: r.version,
                ops: r.patch.clone(),
            })
            .collect();

        Ok(DeltaResponse::Delta {
            from_version,
            to_version: head.version,
            patches,
        })
    }

    /// Bulk-revalidate a client's `(resource, etag)` cache map against
    /// current heads.
    pub fn validate_cache(
        &self,
        etag_map: &HashMap<ResourceRef, String>,
    ) -> Result<CacheValidation> {
        let mut result = CacheValidation::default();
        for (resource, client_etag) in etag_map {
            let head = self.store.latest(resource)?;
            match head {
                Some(h) if h.is_tombstone() => result.deleted.push(resource.clone()),
                Some(h) if h.etag().as_str() == client_etag => result.valid.push(resource.clone()),
                Some(_) => result.stale.push(resource.clone()),
                None => result.stale.push(resource.clone()),
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oms_core::resource::{BranchName, ResourceType};
    use oms_storage::InMemoryVersionStore;
    use serde_json::json;

    fn service() -> VersionService<InMemoryVersionStore> {
        VersionService::new(Arc::new(InMemoryVersionStore::new()))
    }

    fn user_ref() -> ResourceRef {
        ResourceRef::new(ResourceType::ObjectType, "User", BranchName::main())
    }

    #[test]
    fn sequential_updates_chain_correctly() {
        let svc = service();
        let resource = user_ref();
        let v1 = svc
            .track_change(
                &resource,
                Content::new(json!({"name": "User", "v": 1})).unwrap(),
                ChangeType::Created,
                "alice",
                vec![],
                None,
                Timestamp::from_micros(1),
            )
            .unwrap();
        assert_eq!(v1.version, 1);
        assert!(v1.parent_hash.is_none());

        let v2 = svc
            .track_change(
                &resource,
                Content::new(json!({"name": "User", "v": 2})).unwrap(),
                ChangeType::Updated,
                "alice",
                vec!["v".to_string()],
                None,
                Timestamp::from_micros(2),
            )
            .unwrap();
        assert_eq!(v2.version, 2);
        assert_eq!(v2.parent_hash, Some(v1.commit_hash.clone()));
    }

    #[test]
    fn identical_resubmit_is_idempotent() {
        let svc = service();
        let resource = user_ref();
        let content = Content::new(json!({"name": "User"})).unwrap();
        let v1 = svc
            .track_change(
                &resource,
                content.clone(),
                ChangeType::Created,
                "alice",
                vec![],
                None,
                Timestamp::from_micros(1),
            )
            .unwrap();
        let v1_again = svc
            .track_change(
                &resource,
                content,
                ChangeType::Created,
                "alice",
                vec![],
                None,
                Timestamp::from_micros(2),
            )
            .unwrap();
        assert_eq!(v1.commit_hash, v1_again.commit_hash);
        assert_eq!(svc.store.list(&resource).unwrap().len(), 1);
    }

    #[test]
    fn delete_without_prior_version_fails() {
        let svc = service();
        let resource = user_ref();
        let err = svc
            .track_change(
                &resource,
                Content::empty_object(),
                ChangeType::Deleted,
                "alice",
                vec![],
                None,
                Timestamp::now(),
            )
            .unwrap_err();
        assert!(matches!(err, OmsError::NotFound { .. }));
    }

    #[test]
    fn etag_mismatch_is_detected() {
        let svc = service();
        let resource = user_ref();
        svc.track_change(
            &resource,
            Content::new(json!({"v": 1})).unwrap(),
            ChangeType::Created,
            "alice",
            vec![],
            None,
            Timestamp::from_micros(1),
        )
        .unwrap();
        let (is_valid, head) = svc.validate_etag(&resource, "W/\"stale-1\"").unwrap();
        assert!(!is_valid);
        assert_eq!(head.unwrap().version, 1);
    }

    #[test]
    fn delta_returns_no_change_when_client_is_at_head() {
        let svc = service();
        let resource = user_ref();
        let v1 = svc
            .track_change(
                &resource,
                Content::new(json!({"v": 1})).unwrap(),
                ChangeType::Created,
                "alice",
                vec![],
                None,
                Timestamp::from_micros(1),
            )
            .unwrap();
        let delta = svc.get_delta(&resource, Some(v1.version), None).unwrap();
        assert_eq!(delta, DeltaResponse::NoChange { version: 1 });
    }

    #[test]
    fn delta_returns_patches_for_intermediate_versions() {
        let svc = service();
        let resource = user_ref();
        svc.track_change(
            &resource,
            Content::new(json!({"v": 1})).unwrap(),
            ChangeType::Created,
            "alice",
            vec![],
            None,
            Timestamp::from_micros(1),
        )
        .unwrap();
        svc.track_change(
            &resource,
            Content::new(json!({"v": 2})).unwrap(),
            ChangeType::Updated,
            "alice",
            vec![],
            None,
            Timestamp::from_micros(2),
        )
        .unwrap();
        let delta = svc.get_delta(&resource, Some(1), None).unwrap();
        match delta {
            DeltaResponse::Delta {
                from_version,
                to_version,
                patches,
            } => {
                assert_eq!(from_version, 1);
                assert_eq!(to_version, 2);
                assert_eq!(patches.len(), 1);
            }
            other => panic!("expected Delta, got {other:?}"),
        }
    }

    #[test]
    fn validate_cache_classifies_valid_stale_and_deleted() {
        let svc = service();
        let user = user_ref();
        let link = ResourceRef::new(ResourceType::LinkType, "Owns", BranchName::main());
        let absent = ResourceRef::new(ResourceType::Property, "ghost", BranchName::main());

        let v1 = svc
            .track_change(
                &user,
                Content::new(json!({"v": 1})).unwrap(),
                ChangeType::Created,
                "alice",
                vec![],
                None,
                Timestamp::from_micros(1),
            )
            .unwrap();
        svc.track_change(
            &link,
            Content::new(json!({"v": 1})).unwrap(),
            ChangeType::Created,
            "alice",
            vec![],
            None,
            Timestamp::from_micros(1),
        )
        .unwrap();
        svc.track_change(
            &link,
            Content::empty_object(),
            ChangeType::Deleted,
            "alice",
            vec![],
            None,
            Timestamp::from_micros(2),
        )
        .unwrap();

        let mut etags = HashMap::new();
        etags.insert(user.clone(), v1.etag().as_str().to_string());
        etags.insert(link.clone(), "W/\"stale-1\"".to_string());
        etags.insert(absent.clone(), "W/\"nope-1\"".to_string());

        let report = svc.validate_cache(&etags).unwrap();
        assert_eq!(report.valid, vec![user]);
        assert_eq!(report.deleted, vec![link]);
        assert_eq!(report.stale, vec![absent]);
    }
}
