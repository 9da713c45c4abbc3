//! The canonical document type carried by every schema element.
//!
//! [`Content`] wraps `serde_json::Value` the way every resource body moves
//! through the system: object types, link types, properties, and the rest
//! are all stored, diffed, and patched as JSON documents. The wrapper exists
//! to enforce the size and nesting limits that keep pathological input from
//! degrading the version store or the merge engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};
use thiserror::Error;

/// Maximum serialized content size (1 MB). Schema documents are metadata,
/// not bulk data, so this is far smaller than a general document store's
/// limit.
pub const MAX_CONTENT_SIZE: usize = 1024 * 1024;

/// Maximum nesting depth of a content document.
pub const MAX_NESTING_DEPTH: usize = 64;

/// A limit violation on a [`Content`] document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContentLimitError {
    /// Serialized content exceeds [`MAX_CONTENT_SIZE`].
    #[error("content size {size} exceeds maximum of {max} bytes")]
    TooLarge {
        /// Actual size, in bytes.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },
    /// Content nests deeper than [`MAX_NESTING_DEPTH`].
    #[error("content nesting depth {depth} exceeds maximum of {max}")]
    TooDeep {
        /// Actual depth.
        depth: usize,
        /// Maximum allowed depth.
        max: usize,
    },
}

/// The structured body of a schema element: its properties, constraints,
/// and any other attributes a resource type defines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content(serde_json::Value);

impl Content {
    /// Wrap a JSON value as content, checking size and depth limits.
    pub fn new(value: serde_json::Value) -> Result<Self, ContentLimitError> {
        let content = Content(value);
        content.check_limits()?;
        Ok(content)
    }

    /// An empty object document.
    pub fn empty_object() -> Self {
        Content(serde_json::Value::Object(serde_json::Map::new()))
    }

    /// Borrow the underlying JSON value.
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Consume this content, returning the underlying JSON value.
    pub fn into_value(self) -> serde_json::Value {
        self.0
    }

    /// Check the document against [`MAX_CONTENT_SIZE`] and
    /// [`MAX_NESTING_DEPTH`].
    pub fn check_limits(&self) -> Result<(), ContentLimitError> {
        let size = serde_json::to_vec(&self.0).map(|b| b.len()).unwrap_or(0);
        if size > MAX_CONTENT_SIZE {
            return Err(ContentLimitError::TooLarge {
                size,
                max: MAX_CONTENT_SIZE,
            });
        }
        let depth = depth_of(&self.0);
        if depth > MAX_NESTING_DEPTH {
            return Err(ContentLimitError::TooDeep {
                depth,
                max: MAX_NESTING_DEPTH,
            });
        }
        Ok(())
    }
}

fn depth_of(value: &serde_json::Value) -> usize {
    match value {
        serde_json::Value::Object(map) => {
            1 + map.values().map(depth_of).max().unwrap_or(0)
        }
        serde_json::Value::Array(items) => {
            1 + items.iter().map(depth_of).max().unwrap_or(0)
        }
        _ => 0,
    }
}

impl Deref for Content {
    type Target = serde_json::Value;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Content {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for Content {
    fn default() -> Self {
        Content::empty_object()
    }
}

impl From<Content> for serde_json::Value {
    fn from(c: Content) -> Self {
        c.0
    }
}

impl TryFrom<serde_json::Value> for Content {
    type Error = ContentLimitError;
    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        Content::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_small_flat_document() {
        let c = Content::new(json!({"name": "User", "properties": {}}));
        assert!(c.is_ok());
    }

    #[test]
    fn rejects_excessive_nesting() {
        let mut value = json!(1);
        for _ in 0..(MAX_NESTING_DEPTH + 5) {
            value = json!({"nested": value});
        }
        assert!(matches!(
            Content::new(value),
            Err(ContentLimitError::TooDeep { .. })
        ));
    }

    #[test]
    fn rejects_oversized_document() {
        let big_string = "x".repeat(MAX_CONTENT_SIZE + 1);
        assert!(matches!(
            Content::new(json!({ "blob": big_string })),
            Err(ContentLimitError::TooLarge { .. })
        ));
    }
}
