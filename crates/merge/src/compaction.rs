//! Background DAG compaction: collapsing long linear commit runs into a
//! single summary entry while preserving branch points, merge commits,
//! and the two ends of any run.

use serde::{Deserialize, Serialize};

/// Default chain-length threshold above which a linear run is collapsed.
pub const DEFAULT_CHAIN_LENGTH_THRESHOLD: usize = 100;

/// The minimal metadata compaction needs about one commit in a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMeta {
    /// The commit's hash.
    pub commit_hash: String,
    /// Its parent's hash, `None` for the first commit.
    pub parent_hash: Option<String>,
    /// The version number this commit produced.
    pub version: u64,
    /// The content hash as of this commit.
    pub content_hash: String,
    /// Whether a branch was forked from this commit. Branch points are
    /// never collapsed — a later `branch_diff` against this point must
    /// still resolve to a real commit.
    pub is_branch_point: bool,
    /// Whether this commit is itself a merge commit. Merge commits are
    /// never collapsed, since they record two parent heads.
    pub is_merge_commit: bool,
}

/// A collapsed run of commits, replaced by one summary retaining only the
/// content-hash transition it represents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactedRange {
    /// First collapsed version number.
    pub start_version: u64,
    /// Last collapsed version number.
    pub end_version: u64,
    /// Commit hash of the first collapsed commit.
    pub start_hash: String,
    /// Commit hash of the last collapsed commit.
    pub end_hash: String,
    /// How many commits were folded into this range.
    pub collapsed_count: usize,
    /// The content hash at the end of the run — the only state a reader
    /// jumping across the range needs.
    pub final_content_hash: String,
}

/// The result of compacting one resource's commit chain.
#[derive(Debug, Clone, Default)]
pub struct CompactionResult {
    /// Commits retained as-is: anchors (branch points, merge commits, and
    /// the two ends of every collapsed run) plus any run too short to
    /// collapse.
    pub kept: Vec<CommitMeta>,
    /// Every run that was collapsed.
    pub summaries: Vec<CompactedRange>,
}

/// Compact a single resource's linear commit history.
///
/// A maximal run of consecutive commits that are neither branch points
/// nor merge commits, longer than `threshold`, has its interior collapsed
/// into one [`CompactedRange`]; the run's first and last commits are kept
/// as anchors so reachability from either side of the collapsed range is
/// unaffected.
pub fn compact_chain(chain: &[CommitMeta], threshold: usize) -> CompactionResult {
    let mut result = CompactionResult::default();
    let mut i = 0;
    while i < chain.len() {
        if chain[i].is_branch_point || chain[i].is_merge_commit {
            result.kept.push(chain[i].clone());
            i += 1;
            continue;
        }
        let mut j = i;
        while j < chain.len() && !chain[j].is_branch_point && !chain[j].is_merge_commit {
            j += 1;
        }
        let run = &chain[i..j];
        if run.len() > threshold && run.len() > 2 {
            result.kept.push(run[0].clone());
            let interior = &run[1..run.len() - 1];
            result.summaries.push(CompactedRange {
                start_version: interior[0].version,
                end_version: interior[interior.len() - 1].version,
                start_hash: interior[0].commit_hash.clone(),
                end_hash: interior[interior.len() - 1].commit_hash.clone(),
                collapsed_count: interior.len(),
                final_content_hash: interior[interior.len() - 1].content_hash.clone(),
            });
            result.kept.push(run[run.len() - 1].clone());
        } else {
            result.kept.extend_from_slice(run);
        }
        i = j;
    }
    result
}

/// Compact a chain with an explicit dry-run switch.
///
/// `dry_run = true` only analyzes and reports, identical to calling
/// [`compact_chain`] directly. `dry_run = false` additionally returns the
/// chain a caller should persist in its place: `result.kept`, with every
/// collapsed interior commit dropped. This function never touches a
/// store itself — the caller decides what "persist" means for its
/// backend — so it stays pure and is cheap to call speculatively.
pub fn compact(chain: &[CommitMeta], threshold: usize, dry_run: bool) -> (CompactionResult, Option<Vec<CommitMeta>>) {
    let result = compact_chain(chain, threshold);
    let to_persist = if dry_run { None } else { Some(result.kept.clone()) };
    (result, to_persist)
}

/// Verify that compaction did not drop any anchor: every branch point,
/// merge commit, and chain endpoint in the original chain is still
/// present in the result's `kept` list.
pub fn verify_reachability(original: &[CommitMeta], result: &CompactionResult) -> bool {
    let kept_hashes: std::collections::HashSet<&str> =
        result.kept.iter().map(|c| c.commit_hash.as_str()).collect();

    let must_keep = original.iter().enumerate().filter(|(i, c)| {
        c.is_branch_point || c.is_merge_commit || *i == 0 || *i == original.len() - 1
    });

    must_keep.map(|(_, c)| c).all(|c| kept_hashes.contains(c.commit_hash.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(version: u64) -> CommitMeta {
        CommitMeta {
            commit_hash: format!("h{version}"),
            parent_hash: if version == 1 { None } else { Some(format!("h{}", version - 1)) },
            version,
            content_hash: format!("c{version}"),
            is_branch_point: false,
            is_merge_commit: false,
        }
    }

    #[test]
    fn short_chain_is_untouched() {
        let chain: Vec<_> = (1..=5).map(plain).collect();
        let result = compact_chain(&chain, 100);
        assert_eq!(result.kept.len(), 5);
        assert!(result.summaries.is_empty());
    }

    #[test]
    fn long_linear_chain_collapses_interior() {
        let chain: Vec<_> = (1..=150).map(plain).collect();
        let result = compact_chain(&chain, 100);
        assert_eq!(result.summaries.len(), 1);
        assert_eq!(result.summaries[0].collapsed_count, 148);
        // first and last commit of the run survive as anchors
        assert_eq!(result.kept.first().unwrap().version, 1);
        assert_eq!(result.kept.last().unwrap().version, 150);
        assert!(verify_reachability(&chain, &result));
    }

    #[test]
    fn branch_points_and_merge_commits_are_never_collapsed() {
        let mut chain: Vec<_> = (1..=150).map(plain).collect();
        chain[74].is_branch_point = true;
        let result = compact_chain(&chain, 100);
        assert!(result.kept.iter().any(|c| c.version == 75));
        assert!(verify_reachability(&chain, &result));
    }

    #[test]
    fn dry_run_reports_without_a_chain_to_persist() {
        let chain: Vec<_> = (1..=150).map(plain).collect();
        let (result, to_persist) = compact(&chain, 100, true);
        assert_eq!(result.summaries.len(), 1);
        assert!(to_persist.is_none());
    }

    #[test]
    fn applying_compaction_returns_the_collapsed_chain() {
        let chain: Vec<_> = (1..=150).map(plain).collect();
        let (result, to_persist) = compact(&chain, 100, false);
        let persisted = to_persist.expect("apply mode returns a chain to persist");
        assert_eq!(persisted.len(), result.kept.len());
        assert!(verify_reachability(&chain, &CompactionResult { kept: persisted, summaries: result.summaries }));
    }
}
