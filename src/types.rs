//! Identifier types joining the text index, the coarse spatial index, and the
//! precise feature store.

use std::fmt;

/// Default stored field holding a document's external join key.
pub const DEFAULT_KEY_FIELD: &str = "_id";

/// Stable identifier of a spatial feature.
///
/// Feature ids are the join key between the coarse spatial index and the
/// precise feature store. They are distinct from document positions, which
/// are derived per query execution and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(String);

impl FeatureId {
    /// Create a feature id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeatureId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FeatureId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
