//! Precise feature storage interface.
//!
//! The refinement phase performs a single batched fetch keyed by the full
//! candidate set, requesting only the geometry attribute. Backends hold any
//! cursor or connection inside the returned iterator and release it on drop,
//! success or failure.

use crate::error::Result;
use crate::types::FeatureId;
use geo::Geometry;
use rustc_hash::{FxHashMap, FxHashSet};

/// A scoped iteration over fetched features.
pub type FeatureIter<'a> = Box<dyn Iterator<Item = Result<(FeatureId, Geometry<f64>)>> + 'a>;

/// Resolves feature ids to precise geometries.
pub trait FeatureStore: Send + Sync {
    /// Batched fetch of precise geometries for exactly `ids`.
    ///
    /// Only the geometry attribute is materialized. Ids unknown to the store
    /// are absent from the iteration rather than an error: a feature deleted
    /// between the coarse query and this fetch is simply skipped upstream.
    fn fetch_geometries(&self, ids: &FxHashSet<FeatureId>) -> Result<FeatureIter<'_>>;
}

/// Hash-map backed feature store for embedded use and tests.
#[derive(Debug, Default)]
pub struct MemoryFeatureStore {
    features: FxHashMap<FeatureId, Geometry<f64>>,
}

impl MemoryFeatureStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a feature geometry.
    pub fn insert(&mut self, id: impl Into<FeatureId>, geometry: Geometry<f64>) {
        self.features.insert(id.into(), geometry);
    }

    /// Remove a feature, returning its geometry if present.
    pub fn remove(&mut self, id: &FeatureId) -> Option<Geometry<f64>> {
        self.features.remove(id)
    }

    /// Number of stored features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the store holds no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl FeatureStore for MemoryFeatureStore {
    fn fetch_geometries(&self, ids: &FxHashSet<FeatureId>) -> Result<FeatureIter<'_>> {
        let matched: Vec<(FeatureId, Geometry<f64>)> = ids
            .iter()
            .filter_map(|id| {
                self.features
                    .get(id)
                    .map(|geometry| (id.clone(), geometry.clone()))
            })
            .collect();
        Ok(Box::new(matched.into_iter().map(Ok)))
    }
}
