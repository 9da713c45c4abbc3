//! Content and commit hashing.
//!
//! Two distinct hashes are used throughout the system:
//!
//! - [`content_hash`]: a SHA-256 digest of a resource's canonical JSON
//!   content, independent of key order. Two semantically identical documents
//!   hash identically regardless of how their fields were serialized.
//! - [`commit_hash`]: a SHA-256 digest chaining a version to its parent,
//!   binding `(parent_hash, content_hash, author, timestamp)` together so the
//!   version history cannot be silently reordered or rewritten.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Compute the content hash of a JSON document.
///
/// The document is first canonicalized (object keys sorted recursively) so
/// that key order never affects the result.
pub fn content_hash(value: &Value) -> String {
    let canonical = canonicalize(value);
    let bytes = serde_json::to_vec(&canonical).expect("canonical value is always serializable");
    let digest = Sha256::digest(&bytes);
    hex::encode(digest)
}

/// Compute a chained commit hash.
///
/// `parent_hash` is `None` for the first version of a resource.
pub fn commit_hash(
    parent_hash: Option<&str>,
    content_hash: &str,
    author: &str,
    timestamp_rfc3339: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(parent_hash.unwrap_or("").as_bytes());
    hasher.update(b"|");
    hasher.update(content_hash.as_bytes());
    hasher.update(b"|");
    hasher.update(author.as_bytes());
    hasher.update(b"|");
    hasher.update(timestamp_rfc3339.as_bytes());
    hex::encode(hasher.finalize())
}

/// Derive the short form of a commit hash used in ETags: the first 12 hex
/// characters.
pub fn short_hash(full_hash: &str) -> &str {
    let end = full_hash.len().min(12);
    &full_hash[..end]
}

/// Recursively sort object keys so that structurally identical documents
/// serialize identically.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map
                .iter()
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
