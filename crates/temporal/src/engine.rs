//! The read-only temporal query engine: AS-OF, BETWEEN, ALL-VERSIONS,
//! COMPARE, and SNAPSHOT, all answered purely from the version store.

use crate::point::TemporalPoint;
use oms_core::patch::PatchOp;
use oms_core::resource::ResourceRef;
use oms_core::timestamp::Timestamp;
use oms_core::version::{ChangeType, ResourceVersion};
use oms_core::Result;
use oms_storage::VersionStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Counters attached to every query response, regardless of shape.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct QueryStats {
    /// Versions read from storage while answering the query.
    pub versions_scanned: usize,
    /// Wall-clock time spent answering the query.
    pub execution_time_ms: u64,
}

/// A page of rows plus the counters and pagination window that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPage<T> {
    /// The rows in this page.
    pub rows: Vec<T>,
    /// Pagination offset applied.
    pub offset: usize,
    /// Pagination limit applied.
    pub limit: usize,
    /// Execution counters.
    pub stats: QueryStats,
}

/// One row of an `AS_OF` result: the resource's version at the query
/// point, or `None` if it did not exist (or was deleted and
/// `include_deleted` was not set).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsOfRow {
    /// The resource queried.
    pub resource: ResourceRef,
    /// The selected version, if one applies.
    pub version: Option<ResourceVersion>,
}

/// One row of a `BETWEEN` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetweenRow {
    /// The resource this version belongs to.
    pub resource: ResourceRef,
    /// The version itself.
    pub version: ResourceVersion,
}

/// One row of an `ALL_VERSIONS` result, enriched with chain neighbors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedVersion {
    /// The version record.
    pub version: ResourceVersion,
    /// The prior version number, if any.
    pub previous_version: Option<u64>,
    /// The next version number, if any (absent for the current head).
    pub next_version: Option<u64>,
    /// Microseconds this version was the current one, `None` if still
    /// current.
    pub version_duration_micros: Option<i64>,
}

/// How a resource's state differs between two `AS_OF` snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareClass {
    /// Present at `time2` but not `time1`.
    Created,
    /// Present and active at both, with differing content.
    Updated,
    /// Present and active at `time1`, absent or tombstoned at `time2`.
    Deleted,
    /// Present and identical at both.
    Unchanged,
}

/// One row of a `COMPARE` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareRow {
    /// The resource compared.
    pub resource: ResourceRef,
    /// How it changed between the two points.
    pub class: CompareClass,
    /// Field-level JSON patch from `time1`'s content to `time2`'s, present
    /// only for `Updated`.
    pub diff: Option<Vec<PatchOp>>,
}

/// One entry of a materialized `SNAPSHOT`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// The resource captured.
    pub resource: ResourceRef,
    /// Its version number as of the snapshot point.
    pub version: u64,
    /// Its commit hash as of the snapshot point.
    pub commit_hash: String,
    /// The resource's content, present only if `include_data` was set.
    pub content: Option<serde_json::Value>,
}

fn is_visible(version: &ResourceVersion, include_deleted: bool) -> bool {
    include_deleted || version.change_type != ChangeType::Deleted
}

/// Read-only temporal query engine over a [`VersionStore`].
pub struct TemporalEngine<S: VersionStore> {
    store: Arc<S>,
}

impl<S: VersionStore> TemporalEngine<S> {
    /// Build an engine over `store`.
    pub fn new(store: Arc<S>) -> Self {
        TemporalEngine { store }
    }

    /// `AS_OF(point)`: for each resource in `scope`, the version valid at
    /// `point`.
    pub fn as_of(
        &self,
        scope: &[ResourceRef],
        point: &TemporalPoint,
        include_deleted: bool,
        now: Timestamp,
        limit: usize,
        offset: usize,
    ) -> Result<QueryPage<AsOfRow>> {
        let started = Instant::now();
        let mut scanned = 0usize;
        let mut rows = Vec::new();
        for resource in scope.iter().skip(offset).take(limit) {
            let chain = self.store.list(resource)?;
            scanned += chain.len();
            let selected = point
                .select(&chain, now)
                .filter(|v| is_visible(v, include_deleted))
                .cloned();
            rows.push(AsOfRow { resource: resource.clone(), version: selected });
        }
        Ok(QueryPage {
            rows,
            offset,
            limit,
            stats: QueryStats { versions_scanned: scanned, execution_time_ms: elapsed_ms(started) },
        })
    }

    /// `BETWEEN(start, end)`: every version across `scope` whose
    /// `timestamp` falls in `[start, end]`. Rows are flattened across
    /// resources and paginated as one stream.
    pub fn between(
        &self,
        scope: &[ResourceRef],
        start: Timestamp,
        end: Option<Timestamp>,
        include_deleted: bool,
        limit: usize,
        offset: usize,
    ) -> Result<QueryPage<BetweenRow>> {
        let started = Instant::now();
        let mut scanned = 0usize;
        let mut all_rows = Vec::new();
        for resource in scope {
            let chain = self.store.list(resource)?;
            scanned += chain.len();
            for version in chain {
                if version.timestamp < start {
                    continue;
                }
                if let Some(end) = end {
                    if version.timestamp > end {
                        continue;
                    }
                }
                if !is_visible(&version, include_deleted) {
                    continue;
                }
                all_rows.push(BetweenRow { resource: resource.clone(), version });
            }
        }
        let rows = all_rows.into_iter().skip(offset).take(limit).collect();
        Ok(QueryPage {
            rows,
            offset,
            limit,
            stats: QueryStats { versions_scanned: scanned, execution_time_ms: elapsed_ms(started) },
        })
    }

    /// `ALL_VERSIONS(resource_ref)`: full history, enriched with chain
    /// neighbors and how long each version was current.
    pub fn all_versions(&self, resource: &ResourceRef, include_deleted: bool) -> Result<Vec<EnrichedVersion>> {
        let chain = self.store.list(resource)?;
        let visible: Vec<ResourceVersion> = chain.into_iter().filter(|v| is_visible(v, include_deleted)).collect();
        let mut rows = Vec::with_capacity(visible.len());
        for (i, version) in visible.iter().enumerate() {
            let previous_version = if i > 0 { Some(visible[i - 1].version) } else { None };
            let next = visible.get(i + 1);
            let next_version = next.map(|n| n.version);
            let version_duration_micros = next.map(|n| n.timestamp.as_micros() - version.timestamp.as_micros());
            rows.push(EnrichedVersion {
                version: version.clone(),
                previous_version,
                next_version,
                version_duration_micros,
            });
        }
        Ok(rows)
    }

    /// `COMPARE(time1, time2)`: classify every resource in `scope` by how
    /// it changed between two `AS_OF` snapshots.
    pub fn compare(
        &self,
        scope: &[ResourceRef],
        time1: &TemporalPoint,
        time2: &TemporalPoint,
        now: Timestamp,
    ) -> Result<Vec<CompareRow>> {
        let mut rows = Vec::with_capacity(scope.len());
        for resource in scope {
            let chain = self.store.list(resource)?;
            let v1 = point_active(&chain, time1, now);
            let v2 = point_active(&chain, time2, now);
            let row = match (v1, v2) {
                (None, None) => continue,
                (None, Some(_)) => CompareRow { resource: resource.clone(), class: CompareClass::Created, diff: None },
                (Some(_), None) => CompareRow { resource: resource.clone(), class: CompareClass::Deleted, diff: None },
                (Some(a), Some(b)) => {
                    if a.content_hash == b.content_hash {
                        CompareRow { resource: resource.clone(), class: CompareClass::Unchanged, diff: None }
                    } else {
                        let diff = oms_core::patch::json_patch(a.content.as_value(), b.content.as_value());
                        CompareRow { resource: resource.clone(), class: CompareClass::Updated, diff: Some(diff) }
                    }
                }
            };
            rows.push(row);
        }
        Ok(rows)
    }

    /// `SNAPSHOT(branch, point)`: materialize every resource in `scope`
    /// (already filtered to the target branch by the caller) as of
    /// `point`.
    pub fn snapshot(
        &self,
        scope: &[ResourceRef],
        point: &TemporalPoint,
        include_data: bool,
        now: Timestamp,
    ) -> Result<Vec<SnapshotEntry>> {
        let mut entries = Vec::new();
        for resource in scope {
            let chain = self.store.list(resource)?;
            if let Some(version) = point.select(&chain, now).filter(|v| is_visible(v, false)) {
                entries.push(SnapshotEntry {
                    resource: resource.clone(),
                    version: version.version,
                    commit_hash: version.commit_hash.clone(),
                    content: include_data.then(|| version.content.as_value().clone()),
                });
            }
        }
        Ok(entries)
    }
}

fn point_active(chain: &[ResourceVersion], point: &TemporalPoint, now: Timestamp) -> Option<ResourceVersion> {
    point.select(chain, now).filter(|v| v.change_type != ChangeType::Deleted).cloned()
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use oms_core::hash::content_hash;
    use oms_core::resource::{BranchName, ResourceType};
    use oms_storage::InMemoryVersionStore;
    use serde_json::json;

    fn resource() -> ResourceRef {
        ResourceRef::new(ResourceType::ObjectType, "Employee", BranchName::main())
    }

    fn push_version(store: &InMemoryVersionStore, resource: &ResourceRef, v: u64, micros: i64, change_type: ChangeType, value: serde_json::Value) {
        store
            .append(
                resource,
                ResourceVersion {
                    resource: resource.clone(),
                    version: v,
                    parent_version: v.checked_sub(1).filter(|p| *p > 0),
                    change_type,
                    content: oms_core::content::Content::new(value.clone()).unwrap(),
                    content_hash: content_hash(&value),
                    content_size: 0,
                    commit_hash: format!("hash{v}"),
                    parent_hash: None,
                    patch: vec![],
                    fields_changed: vec![],
                    author: "tester".into(),
                    timestamp: Timestamp::from_micros(micros),
                    change_summary: None,
                },
            )
            .unwrap();
    }

    #[test]
    fn as_of_selects_version_valid_at_point() {
        let store = Arc::new(InMemoryVersionStore::new());
        let r = resource();
        push_version(&store, &r, 1, 100, ChangeType::Created, json!({"status": "draft"}));
        push_version(&store, &r, 2, 200, ChangeType::Updated, json!({"status": "active"}));
        let engine = TemporalEngine::new(store);
        let page = engine
            .as_of(&[r.clone()], &TemporalPoint::At(Timestamp::from_micros(150)), false, Timestamp::from_micros(150), 10, 0)
            .unwrap();
        assert_eq!(page.rows[0].version.as_ref().unwrap().version, 1);
    }

    #[test]
    fn all_versions_enriches_with_neighbors_and_duration() {
        let store = Arc::new(InMemoryVersionStore::new());
        let r = resource();
        push_version(&store, &r, 1, 100, ChangeType::Created, json!({"a": 1}));
        push_version(&store, &r, 2, 300, ChangeType::Updated, json!({"a": 2}));
        let engine = TemporalEngine::new(store);
        let rows = engine.all_versions(&r, false).unwrap();
        assert_eq!(rows[0].next_version, Some(2));
        assert_eq!(rows[0].version_duration_micros, Some(200));
        assert_eq!(rows[1].previous_version, Some(1));
        assert_eq!(rows[1].version_duration_micros, None);
    }

    #[test]
    fn compare_classifies_created_updated_deleted_unchanged() {
        let store = Arc::new(InMemoryVersionStore::new());
        let created = ResourceRef::new(ResourceType::ObjectType, "New", BranchName::main());
        let updated = ResourceRef::new(ResourceType::ObjectType, "Changed", BranchName::main());
        let deleted = ResourceRef::new(ResourceType::ObjectType, "Gone", BranchName::main());
        let unchanged = ResourceRef::new(ResourceType::ObjectType, "Same", BranchName::main());

        push_version(&store, &created, 1, 200, ChangeType::Created, json!({"a": 1}));

        push_version(&store, &updated, 1, 100, ChangeType::Created, json!({"a": 1}));
        push_version(&store, &updated, 2, 200, ChangeType::Updated, json!({"a": 2}));

        push_version(&store, &deleted, 1, 100, ChangeType::Created, json!({"a": 1}));
        push_version(&store, &deleted, 2, 200, ChangeType::Deleted, json!({"a": 1}));

        push_version(&store, &unchanged, 1, 100, ChangeType::Created, json!({"a": 1}));

        let engine = TemporalEngine::new(store);
        let scope = vec![created.clone(), updated.clone(), deleted.clone(), unchanged.clone()];
        let rows = engine
            .compare(&scope, &TemporalPoint::At(Timestamp::from_micros(100)), &TemporalPoint::At(Timestamp::from_micros(200)), Timestamp::from_micros(200))
            .unwrap();

        let class = |resource: &ResourceRef| rows.iter().find(|r| &r.resource == resource).unwrap().class;
        assert_eq!(class(&created), CompareClass::Created);
        assert_eq!(class(&updated), CompareClass::Updated);
        assert_eq!(class(&deleted), CompareClass::Deleted);
        assert_eq!(class(&unchanged), CompareClass::Unchanged);
    }

    #[test]
    fn snapshot_omits_content_unless_include_data() {
        let store = Arc::new(InMemoryVersionStore::new());
        let r = resource();
        push_version(&store, &r, 1, 100, ChangeType::Created, json!({"a": 1}));
        let engine = TemporalEngine::new(store);
        let without_data = engine.snapshot(&[r.clone()], &TemporalPoint::At(Timestamp::from_micros(100)), false, Timestamp::from_micros(100)).unwrap();
        assert!(without_data[0].content.is_none());
        let with_data = engine.snapshot(&[r], &TemporalPoint::At(Timestamp::from_micros(100)), true, Timestamp::from_micros(100)).unwrap();
        assert!(with_data[0].content.is_some());
    }
}
