//! RFC-6902-flavored JSON patch generation and application.
//!
//! Every version records the patch that produced it, relative to its
//! parent, so that [`crate::version::ResourceVersion::get_delta`]-style
//! queries never need to materialize and diff full documents at read time.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A single RFC-6902 patch operation, restricted to the subset this system
/// needs: `add`, `remove`, `replace`. (`move`/`copy`/`test` are not
/// produced by the diff engine and are rejected on apply.)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    /// Add a value at `path`. If the path already exists, it is overwritten.
    Add {
        /// JSON Pointer path.
        path: JsonPointer,
        /// Value to insert.
        value: Value,
    },
    /// Remove the value at `path`.
    Remove {
        /// JSON Pointer path.
        path: JsonPointer,
    },
    /// Replace the value at `path`.
    Replace {
        /// JSON Pointer path.
        path: JsonPointer,
        /// New value.
        value: Value,
    },
}

impl PatchOp {
    /// The path this operation touches.
    pub fn path(&self) -> &JsonPointer {
        match self {
            PatchOp::Add { path, .. } => path,
            PatchOp::Remove { path } => path,
            PatchOp::Replace { path, .. } => path,
        }
    }
}

/// A JSON Pointer (RFC 6901), stored as its component segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct JsonPointer(Vec<String>);

impl JsonPointer {
    /// The root pointer (`""`), addressing the whole document.
    pub fn root() -> Self {
        JsonPointer(Vec::new())
    }

    /// Build a pointer from already-unescaped segments.
    pub fn from_segments(segments: Vec<String>) -> Self {
        JsonPointer(segments)
    }

    /// Append a segment, returning a new, longer pointer.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        JsonPointer(segments)
    }

    /// The pointer's segments.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether `other` is this pointer or nested under it.
    pub fn contains(&self, other: &JsonPointer) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// Render as an RFC-6901 string, e.g. `/properties/name`.
    pub fn to_pointer_string(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let mut s = String::new();
        for seg in &self.0 {
            s.push('/');
            s.push_str(&seg.replace('~', "~0").replace('/', "~1"));
        }
        s
    }

    /// Parse an RFC-6901 pointer string.
    pub fn parse(s: &str) -> Result<Self, PatchError> {
        if s.is_empty() {
            return Ok(JsonPointer::root());
        }
        if !s.starts_with('/') {
            return Err(PatchError::InvalidPointer(s.to_string()));
        }
        let segments = s[1..]
            .split('/')
            .map(|seg| seg.replace("~1", "/").replace("~0", "~"))
            .collect();
        Ok(JsonPointer(segments))
    }
}

impl From<JsonPointer> for String {
    fn from(p: JsonPointer) -> Self {
        p.to_pointer_string()
    }
}

impl TryFrom<String> for JsonPointer {
    type Error = PatchError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        JsonPointer::parse(&s)
    }
}

impl std::fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_pointer_string())
    }
}

/// Error applying or parsing a patch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// The pointer string did not start with `/` and was not empty.
    #[error("invalid JSON pointer: {0}")]
    InvalidPointer(String),
    /// `remove`/`replace` targeted a path that does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(String),
    /// A path segment expected an object or array but found a scalar.
    #[error("cannot traverse into scalar at: {0}")]
    NotTraversable(String),
    /// An array index segment was not a valid, in-bounds index.
    #[error("invalid array index '{segment}' at: {path}")]
    InvalidIndex {
        /// The offending segment.
        segment: String,
        /// The path up to and including the segment.
        path: String,
    },
}

/// Diff two documents, producing the minimal set of `add`/`remove`/`replace`
/// operations that transform `from` into `to`.
pub fn json_patch(from: &Value, to: &Value) -> Vec<PatchOp> {
    let mut ops = Vec::new();
    diff_at(&JsonPointer::root(), from, to, &mut ops);
    ops
}

fn diff_at(path: &JsonPointer, from: &Value, to: &Value, ops: &mut Vec<PatchOp>) {
    if from == to {
        return;
    }
    match (from, to) {
        (Value::Object(from_map), Value::Object(to_map)) => {
            for (key, from_val) in from_map {
                let child_path = path.child(key.clone());
                match to_map.get(key) {
                    Some(to_val) => diff_at(&child_path, from_val, to_val, ops),
                    None => ops.push(PatchOp::Remove { path: child_path }),
                }
            }
            for (key, to_val) in to_map {
                if !from_map.contains_key(key) {
                    ops.push(PatchOp::Add {
                        path: path.child(key.clone()),
                        value: to_val.clone(),
                    });
                }
            }
        }
        (Value::Array(from_arr), Value::Array(to_arr)) => {
            // Positional only: no move-detection. Index i on both sides is
            // diffed in place; a length shrink removes trailing indices,
            // a length grow adds them.
            let shared = from_arr.len().min(to_arr.len());
            for i in 0..shared {
                diff_at(&path.child(i.to_string()), &from_arr[i], &to_arr[i], ops);
            }
            if to_arr.len() < from_arr.len() {
                for i in (to_arr.len()..from_arr.len()).rev() {
                    ops.push(PatchOp::Remove { path: path.child(i.to_string()) });
                }
            } else {
                for (i, value) in to_arr.iter().enumerate().skip(from_arr.len()) {
                    ops.push(PatchOp::Add { path: path.child(i.to_string()), value: value.clone() });
                }
            }
        }
        _ => ops.push(PatchOp::Replace {
            path: path.clone(),
            value: to.clone(),
        }),
    }
}

/// Apply a sequence of patch operations to a document, returning the
/// resulting document. Operations apply in order; the input is not
/// mutated in place.
pub fn apply_patch(doc: &Value, ops: &[PatchOp]) -> Result<Value, PatchError> {
    let mut result = doc.clone();
    for op in ops {
        apply_one(&mut result, op)?;
    }
    Ok(result)
}

fn apply_one(doc: &mut Value, op: &PatchOp) -> Result<(), PatchError> {
    match op {
        PatchOp::Add { path, value } => set_at(doc, path, value.clone(), true),
        PatchOp::Replace { path, value } => set_at(doc, path, value.clone(), false),
        PatchOp::Remove { path } => remove_at(doc, path),
    }
}

fn set_at(doc: &mut Value, path: &JsonPointer, value: Value, allow_missing: bool) -> Result<(), PatchError> {
    if path.segments().is_empty() {
        *doc = value;
        return Ok(());
    }
    let (parent, last) = navigate_to_parent(doc, path)?;
    match parent {
        Value::Object(map) => {
            if !allow_missing && !map.contains_key(last) {
                return Err(PatchError::PathNotFound(path.to_pointer_string()));
            }
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(arr) => {
            let idx = parse_index(last, &path.to_pointer_string())?;
            if idx > arr.len() {
                return Err(PatchError::InvalidIndex {
                    segment: last.clone(),
                    path: path.to_pointer_string(),
                });
            }
            if idx == arr.len() {
                arr.push(value);
            } else {
                arr[idx] = value;
            }
            Ok(())
        }
        _ => Err(PatchError::NotTraversable(path.to_pointer_string())),
    }
}

fn remove_at(doc: &mut Value, path: &JsonPointer) -> Result<(), PatchError> {
    if path.segments().is_empty() {
        *doc = Value::Null;
        return Ok(());
    }
    let (parent, last) = navigate_to_parent(doc, path)?;
    match parent {
        Value::Object(map) => {
            map.remove(last)
                .map(|_| ())
                .ok_or_else(|| PatchError::PathNotFound(path.to_pointer_string()))
        }
        Value::Array(arr) => {
            let idx = parse_index(last, &path.to_pointer_string())?;
            if idx >= arr.len() {
                return Err(PatchError::PathNotFound(path.to_pointer_string()));
            }
            arr.remove(idx);
            Ok(())
        }
        _ => Err(PatchError::NotTraversable(path.to_pointer_string())),
    }
}

fn navigate_to_parent<'a>(
    doc: &'a mut Value,
    path: &'a JsonPointer,
) -> Result<(&'a mut Value, &'a String), PatchError> {
    let segments = path.segments();
    let (last, parents) = segments.split_last().expect("non-empty path checked by caller");
    let mut current = doc;
    for seg in parents {
        current = match current {
            Value::Object(map) => map
                .get_mut(seg)
                .ok_or_else(|| PatchError::PathNotFound(path.to_pointer_string()))?,
            Value::Array(arr) => {
                let idx = parse_index(seg, &path.to_pointer_string())?;
                arr.get_mut(idx)
                    .ok_or_else(|| PatchError::PathNotFound(path.to_pointer_string()))?
            }
            _ => return Err(PatchError::NotTraversable(path.to_pointer_string())),
        };
    }
    Ok((current, last))
}

fn parse_index(segment: &str, path: &str) -> Result<usize, PatchError> {
    segment.parse::<usize>().map_err(|_| PatchError::InvalidIndex {
        segment: segment.to_string(),
        path: path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pointer_round_trips() {
        let p = JsonPointer::from_segments(vec!["properties".into(), "name".into()]);
        let s = p.to_pointer_string();
        assert_eq!(s, "/properties/name");
        assert_eq!(JsonPointer::parse(&s).unwrap(), p);
    }

    #[test]
    fn diff_detects_added_removed_changed_fields() {
        let from = json!({"name": "User", "status": "active"});
        let to = json!({"name": "Account", "version": 2});
        let ops = json_patch(&from, &to);
        assert_eq!(ops.len(), 3);
        assert!(ops
            .iter()
            .any(|op| matches!(op, PatchOp::Remove { path } if path.to_pointer_string() == "/status")));
        assert!(ops
            .iter()
            .any(|op| matches!(op, PatchOp::Add { path, .. } if path.to_pointer_string() == "/version")));
        assert!(ops
            .iter()
            .any(|op| matches!(op, PatchOp::Replace { path, .. } if path.to_pointer_string() == "/name")));
    }

    #[test]
    fn array_diff_is_positional_with_no_move_detection() {
        let from = json!({"tags": ["a", "b", "c"]});
        let to = json!({"tags": ["a", "x", "c", "d"]});
        let ops = json_patch(&from, &to);
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().any(|op| matches!(op, PatchOp::Replace { path, value } if path.to_pointer_string() == "/tags/1" && value == "x")));
        assert!(ops.iter().any(|op| matches!(op, PatchOp::Add { path, value } if path.to_pointer_string() == "/tags/3" && value == "d")));
        let applied = apply_patch(&from, &ops).unwrap();
        assert_eq!(applied, to);
    }

    #[test]
    fn array_shrink_removes_trailing_indices() {
        let from = json!(["a", "b", "c", "d"]);
        let to = json!(["a", "z"]);
        let ops = json_patch(&from, &to);
        let applied = apply_patch(&from, &ops).unwrap();
        assert_eq!(applied, to);
    }

    #[test]
    fn array_with_reordered_elements_is_not_treated_as_unchanged() {
        // A pure reorder ([a, b] -> [b, a]) has no move-detection: both
        // positions are seen as replaced, not as one element relocating.
        let from = json!(["a", "b"]);
        let to = json!(["b", "a"]);
        let ops = json_patch(&from, &to);
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| matches!(op, PatchOp::Replace { .. })));
    }

    #[test]
    fn apply_patch_reconstructs_target() {
        let from = json!({"name": "User", "status": "active"});
        let to = json!({"name": "Account", "version": 2});
        let ops = json_patch(&from, &to);
        let applied = apply_patch(&from, &ops).unwrap();
        assert_eq!(applied, to);
    }

    #[test]
    fn remove_missing_path_errors() {
        let doc = json!({"a": 1});
        let ops = vec![PatchOp::Remove {
            path: JsonPointer::parse("/missing").unwrap(),
        }];
        assert!(matches!(
            apply_patch(&doc, &ops),
            Err(PatchError::PathNotFound(_))
        ));
    }

    #[test]
    fn pointer_contains_checks_prefix() {
        let parent = JsonPointer::parse("/properties").unwrap();
        let child = JsonPointer::parse("/properties/name").unwrap();
        assert!(parent.contains(&child));
        assert!(!child.contains(&parent));
    }
}
