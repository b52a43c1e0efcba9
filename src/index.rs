//! Coarse spatial index adapter.
//!
//! The coarse phase answers one question: which stored feature envelopes
//! overlap the query envelope? Over-approximation is expected; the
//! refinement phase discards false positives against the precise geometries.

use crate::types::FeatureId;
use geo::{BoundingRect, Geometry, Rect};
use rstar::{AABB, RTree, RTreeObject};

/// Read-only coarse index surface consumed by the filter.
///
/// Implementations must return every stored entry whose envelope overlaps
/// `envelope`, paired with the external document key recorded at indexing
/// time. No ordering guarantee. The index is assumed always available: an
/// unreachable or corrupt index is a configuration error at construction,
/// not a runtime condition.
pub trait SpatialIndex: Send + Sync {
    /// All `(feature id, external key)` pairs whose envelope overlaps `envelope`.
    fn query(&self, envelope: &Rect<f64>) -> Vec<(FeatureId, String)>;
}

/// One envelope entry in the R-tree.
#[derive(Debug, Clone)]
struct IndexedEnvelope {
    envelope: AABB<[f64; 2]>,
    id: FeatureId,
    key: String,
}

impl RTreeObject for IndexedEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// In-memory R-tree over feature envelopes.
///
/// Index construction and maintenance pipelines live outside this crate;
/// this adapter covers embedded use and tests.
#[derive(Debug, Default)]
pub struct RTreeIndex {
    tree: RTree<IndexedEnvelope>,
}

impl RTreeIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a feature's envelope, keyed by its external document key.
    ///
    /// Returns `false` if the geometry has no bounding rectangle (empty
    /// geometry), in which case nothing is inserted.
    pub fn insert(
        &mut self,
        id: impl Into<FeatureId>,
        key: impl Into<String>,
        geometry: &Geometry<f64>,
    ) -> bool {
        match geometry.bounding_rect() {
            Some(envelope) => {
                self.insert_envelope(id, key, &envelope);
                true
            }
            None => false,
        }
    }

    /// Insert a precomputed envelope.
    pub fn insert_envelope(
        &mut self,
        id: impl Into<FeatureId>,
        key: impl Into<String>,
        envelope: &Rect<f64>,
    ) {
        self.tree.insert(IndexedEnvelope {
            envelope: AABB::from_corners(
                [envelope.min().x, envelope.min().y],
                [envelope.max().x, envelope.max().y],
            ),
            id: id.into(),
            key: key.into(),
        });
    }

    /// Number of indexed envelopes.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl SpatialIndex for RTreeIndex {
    fn query(&self, envelope: &Rect<f64>) -> Vec<(FeatureId, String)> {
        let aabb = AABB::from_corners(
            [envelope.min().x, envelope.min().y],
            [envelope.max().x, envelope.max().y],
        );
        self.tree
            .locate_in_envelope_intersecting(&aabb)
            .map(|entry| (entry.id.clone(), entry.key.clone()))
            .collect()
    }
}
