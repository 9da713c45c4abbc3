//! Append-only storage for per-resource version chains.

use dashmap::DashMap;
use oms_core::{OmsError, Result};
use oms_core::resource::ResourceRef;
use oms_core::version::ResourceVersion;
use parking_lot::RwLock;

/// Storage for per-resource version chains.
///
/// Implementations must guarantee that, for a given resource, `append` only
/// ever succeeds for a version number equal to `current length + 1` — the
/// chain is monotonic and gap-free by construction, never by convention.
pub trait VersionStore: Send + Sync {
    /// Append a new version to a resource's chain.
    ///
    /// Returns [`OmsError::Internal`] if `version.version` does not equal
    /// one past the chain's current length (a bug in the caller, since the
    /// version number is assigned under a lock higher up the stack).
    fn append(&self, resource: &ResourceRef, version: ResourceVersion) -> Result<()>;

    /// The most recent version of a resource, or `None` if it has never
    /// been written (tombstoned resources still return their last,
    /// `Deleted` version).
    fn latest(&self, resource: &ResourceRef) -> Result<Option<ResourceVersion>>;

    /// The version of a resource as of a specific version number.
    fn get_at(&self, resource: &ResourceRef, version: u64) -> Result<Option<ResourceVersion>>;

    /// The full version chain for a resource, oldest first.
    fn list(&self, resource: &ResourceRef) -> Result<Vec<ResourceVersion>>;

    /// Remove the chain's last entry if it is exactly `version`.
    ///
    /// The compensating half of an append that a caller could not complete
    /// downstream (e.g. an outbox write that failed right after this
    /// version was recorded). Returns `false`, without mutating anything,
    /// if the chain's head has already moved past `version` — another
    /// writer got there first, and rolling back would destroy real work.
    fn retract_last(&self, resource: &ResourceRef, version: u64) -> Result<bool>;

    /// Every resource id of a given type that has at least one version on
    /// a branch.
    fn list_resource_ids(
        &self,
        resource_type: oms_core::resource::ResourceType,
        branch: &oms_core::resource::BranchName,
    ) -> Result<Vec<String>>;
}

/// `DashMap`-backed in-memory [`VersionStore`].
#[derive(Debug, Default)]
pub struct InMemoryVersionStore {
    chains: DashMap<ResourceRef, RwLock<Vec<ResourceVersion>>>,
}

impl InMemoryVersionStore {
    /// An empty store.
    pub fn new() -> Self {
        InMemoryVersionStore {
            chains: DashMap::new(),
        }
    }
}

impl VersionStore for InMemoryVersionStore {
    fn append(&self, resource: &ResourceRef, version: ResourceVersion) -> Result<()> {
        let chain = self
            .chains
            .entry(resource.clone())
            .or_insert_with(|| RwLock::new(Vec::new()));
        let mut guard = chain.write();
        let expected = guard.len() as u64 + 1;
        if version.version != expected {
            return Err(OmsError::Internal(format!(
                "non-contiguous version append on {resource}: expected {expected}, got {}",
                version.version
            )));
        }
        guard.push(version);
        Ok(())
    }

    fn latest(&self, resource: &ResourceRef) -> Result<Option<ResourceVersion>> {
        Ok(self
            .chains
            .get(resource)
            .and_then(|chain| chain.read().last().cloned()))
    }

    fn get_at(&self, resource: &ResourceRef, version: u64) -> Result<Option<ResourceVersion>> {
        Ok(self.chains.get(resource).and_then(|chain| {
            let guard = chain.read();
            if version == 0 || version as usize > guard.len() {
                None
            } else {
                guard.get((version - 1) as usize).cloned()
            }
        }))
    }

    fn list(&self, resource: &ResourceRef) -> Result<Vec<ResourceVersion>> {
        Ok(self
            .chains
            .get(resource)
            .map(|chain| chain.read().clone())
            .unwrap_or_default())
    }

    fn retract_last(&self, resource: &ResourceRef, version: u64) -> Result<bool> {
        let Some(chain) = self.chains.get(resource) else {
            return Ok(false);
        };
        let mut guard = chain.write();
        if guard.last().map(|v| v.version) != Some(version) {
            return Ok(false);
        }
        guard.pop();
        Ok(true)
    }

    fn list_resource_ids(
        &self,
        resource_type: oms_core::resource::ResourceType,
        branch: &oms_core::resource::BranchName,
    ) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .chains
            .iter()
            .filter(|entry| {
                let r = entry.key();
                r.resource_type == resource_type && &r.branch == branch
            })
            .filter(|entry| !entry.value().read().is_empty())
            .map(|entry| entry.key().resource_id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oms_core::hash::content_hash;
    use oms_core::resource::{BranchName, ResourceType};
    use oms_core::timestamp::Timestamp;
    use oms_core::version::ChangeType;

    fn sample_version(resource: &ResourceRef, version: u64) -> ResourceVersion {
        let content = serde_json::json!({ "v": version });
        ResourceVersion {
            resource: resource.clone(),
            version,
            parent_version: version.checked_sub(1).filter(|p| *p > 0),
            change_type: ChangeType::Created,
            content: oms_core::content::Content::new(content.clone()).unwrap(),
            content_hash: content_hash(&content),
            content_size: 0,
            commit_hash: format!("hash{version}"),
            parent_hash: None,
            patch: vec![],
            fields_changed: vec![],
            author: "tester".into(),
            timestamp: Timestamp::now(),
            change_summary: None,
        }
    }

    #[test]
    fn appends_must_be_contiguous() {
        let store = InMemoryVersionStore::new();
        let resource = ResourceRef::new(ResourceType::ObjectType, "User", BranchName::main());
        store.append(&resource, sample_version(&resource, 1)).unwrap();
        let err = store.append(&resource, sample_version(&resource, 3)).unwrap_err();
        assert!(matches!(err, OmsError::Internal(_)));
    }

    #[test]
    fn latest_and_get_at_agree_on_chain_order() {
        let store = InMemoryVersionStore::new();
        let resource = ResourceRef::new(ResourceType::ObjectType, "User", BranchName::main());
        for v in 1..=3 {
            store.append(&resource, sample_version(&resource, v)).unwrap();
        }
        assert_eq!(store.latest(&resource).unwrap().unwrap().version, 3);
        assert_eq!(store.get_at(&resource, 2).unwrap().unwrap().version, 2);
        assert_eq!(store.get_at(&resource, 99).unwrap(), None);
    }

    #[test]
    fn retract_last_pops_a_matching_head_and_rejects_others() {
        let store = InMemoryVersionStore::new();
        let resource = ResourceRef::new(ResourceType::ObjectType, "User", BranchName::main());
        store.append(&resource, sample_version(&resource, 1)).unwrap();
        store.append(&resource, sample_version(&resource, 2)).unwrap();

        assert!(!store.retract_last(&resource, 1).unwrap());
        assert_eq!(store.latest(&resource).unwrap().unwrap().version, 2);

        assert!(store.retract_last(&resource, 2).unwrap());
        assert_eq!(store.latest(&resource).unwrap().unwrap().version, 1);

        let absent = ResourceRef::new(ResourceType::ObjectType, "Ghost", BranchName::main());
        assert!(!store.retract_last(&absent, 1).unwrap());
    }

    #[test]
    fn list_resource_ids_scopes_by_type_and_branch() {
        let store = InMemoryVersionStore::new();
        let user = ResourceRef::new(ResourceType::ObjectType, "User", BranchName::main());
        let link = ResourceRef::new(ResourceType::LinkType, "Owns", BranchName::main());
        store.append(&user, sample_version(&user, 1)).unwrap();
        store.append(&link, sample_version(&link, 1)).unwrap();
        let ids = store
            .list_resource_ids(ResourceType::ObjectType, &BranchName::main())
            .unwrap();
        assert_eq!(ids, vec!["User".to_string()]);
    }
}
