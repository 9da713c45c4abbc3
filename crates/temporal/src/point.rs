//! Resolving a query's notion of "when" into a concrete instant or version
//! selector against one resource's chain.

use oms_core::timestamp::{parse_relative_duration, Timestamp};
use oms_core::version::ResourceVersion;

/// How the caller identified a point in time.
#[derive(Debug, Clone)]
pub enum TemporalPoint {
    /// An absolute instant.
    At(Timestamp),
    /// A specific version number.
    Version(u64),
    /// A commit hash, matched against the chain.
    CommitHash(String),
    /// A signed relative-duration expression (`-1h`, `-7d`), resolved
    /// against `now` at query time.
    Relative(String),
}

impl TemporalPoint {
    /// Resolve to an absolute instant where possible. Version and commit
    /// hash points resolve to the timestamp of the version they select,
    /// once matched against a chain; this helper only handles the
    /// now-independent cases.
    fn resolve_relative(&self, now: Timestamp) -> Option<Timestamp> {
        match self {
            TemporalPoint::At(t) => Some(*t),
            TemporalPoint::Relative(expr) => {
                let duration = parse_relative_duration(expr)?;
                now.checked_sub_signed(duration)
            }
            _ => None,
        }
    }

    /// Select the version of `chain` (oldest first) that this point
    /// identifies, per `AS_OF`'s validity-interval semantics: the last
    /// version whose `timestamp` is `<=` the resolved instant.
    pub fn select<'a>(&self, chain: &'a [ResourceVersion], now: Timestamp) -> Option<&'a ResourceVersion> {
        match self {
            TemporalPoint::Version(v) => chain.iter().find(|r| r.version == *v),
            TemporalPoint::CommitHash(hash) => chain.iter().find(|r| &r.commit_hash == hash),
            TemporalPoint::At(_) | TemporalPoint::Relative(_) => {
                let instant = self.resolve_relative(now)?;
                chain.iter().filter(|r| r.timestamp <= instant).max_by_key(|r| r.version)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oms_core::hash::content_hash;
    use oms_core::resource::{BranchName, ResourceRef, ResourceType};
    use oms_core::version::ChangeType;
    use serde_json::json;

    fn version_at(v: u64, micros: i64) -> ResourceVersion {
        let resource = ResourceRef::new(ResourceType::ObjectType, "User", BranchName::main());
        let content = json!({"v": v});
        ResourceVersion {
            resource,
            version: v,
            parent_version: v.checked_sub(1).filter(|p| *p > 0),
            change_type: ChangeType::Created,
            content: oms_core::content::Content::new(content.clone()).unwrap(),
            content_hash: content_hash(&content),
            content_size: 0,
            commit_hash: format!("hash{v}"),
            parent_hash: None,
            patch: vec![],
            fields_changed: vec![],
            author: "tester".into(),
            timestamp: Timestamp::from_micros(micros),
            change_summary: None,
        }
    }

    #[test]
    fn timestamp_point_selects_last_version_not_after_instant() {
        let chain = vec![version_at(1, 100), version_at(2, 200), version_at(3, 300)];
        let point = TemporalPoint::At(Timestamp::from_micros(250));
        let selected = point.select(&chain, Timestamp::from_micros(250)).unwrap();
        assert_eq!(selected.version, 2);
    }

    #[test]
    fn version_point_selects_exact_version() {
        let chain = vec![version_at(1, 100), version_at(2, 200)];
        let point = TemporalPoint::Version(1);
        assert_eq!(point.select(&chain, Timestamp::now()).unwrap().version, 1);
    }

    #[test]
    fn commit_hash_point_matches_by_hash() {
        let chain = vec![version_at(1, 100), version_at(2, 200)];
        let point = TemporalPoint::CommitHash("hash2".to_string());
        assert_eq!(point.select(&chain, Timestamp::now()).unwrap().version, 2);
    }

    #[test]
    fn point_before_any_version_selects_nothing() {
        let chain = vec![version_at(1, 100)];
        let point = TemporalPoint::At(Timestamp::from_micros(50));
        assert!(point.select(&chain, Timestamp::from_micros(50)).is_none());
    }
}
