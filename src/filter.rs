//! Two-phase spatial refinement filter.
//!
//! A [`SpatialFilter`] narrows a text query's hit set to documents whose
//! feature geometry satisfies a spatial predicate against a query geometry:
//!
//! 1. **Coarse phase**: the spatial index is queried once with the query
//!    geometry's bounding rectangle; the resulting key→feature mapping is
//!    intersected with the text hits.
//! 2. **Refinement phase**: precise geometries for the surviving candidates
//!    are batch-fetched from the feature store and the exact predicate is
//!    evaluated per feature, setting one bit per passing document position.
//!
//! A filter instance is constructed once per search request and may be shared
//! across evaluation threads; both the coarse match set and the compiled
//! predicate are computed at most once per instance.

use crate::bitmap::ResultBitmap;
use crate::error::{FilterError, Result, TopologyError};
use crate::index::SpatialIndex;
use crate::predicate::{GeometryPredicate, SpatialOperator};
use crate::search::{IndexReader, IndexSegment, segment_hits};
use crate::store::FeatureStore;
use crate::types::{DEFAULT_KEY_FIELD, FeatureId};
use geo::{BoundingRect, Geometry, Rect};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared collection state populated by per-segment scans.
#[derive(Debug, Default)]
struct HitCollector {
    /// Candidates surviving the coarse phase for this evaluation.
    candidates: FxHashSet<FeatureId>,
    /// Candidate → global document position.
    doc_lookup: FxHashMap<FeatureId, u32>,
}

/// Spatial refinement filter over one text query and one query geometry.
pub struct SpatialFilter {
    query: String,
    geometry: Geometry<f64>,
    envelope: Rect<f64>,
    operator: SpatialOperator,
    key_field: String,
    index: Arc<dyn SpatialIndex>,
    store: Arc<dyn FeatureStore>,
    /// Coarse-phase results, computed at most once per instance.
    unrefined: OnceCell<FxHashMap<String, FeatureId>>,
    /// Compiled predicate, built lazily at most once per instance.
    predicate: OnceCell<GeometryPredicate>,
    /// Latch for the once-per-instance topology warning.
    topology_warned: AtomicBool,
}

impl std::fmt::Debug for SpatialFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialFilter")
            .field("query", &self.query)
            .field("operator", &self.operator)
            .field("envelope", &self.envelope)
            .field("key_field", &self.key_field)
            .finish_non_exhaustive()
    }
}

impl SpatialFilter {
    /// Create a filter from a text query and a query geometry.
    ///
    /// Fails if the geometry has no bounding rectangle (empty geometry).
    /// Remaining operator configuration errors surface on the first
    /// predicate build.
    pub fn new(
        query: impl Into<String>,
        geometry: Geometry<f64>,
        operator: SpatialOperator,
        store: Arc<dyn FeatureStore>,
        index: Arc<dyn SpatialIndex>,
    ) -> Result<Self> {
        let envelope = geometry.bounding_rect().ok_or_else(|| {
            FilterError::InvalidInput("query geometry has no bounding rectangle".to_string())
        })?;
        Ok(Self {
            query: query.into(),
            geometry,
            envelope,
            operator,
            key_field: DEFAULT_KEY_FIELD.to_string(),
            index,
            store,
            unrefined: OnceCell::new(),
            predicate: OnceCell::new(),
            topology_warned: AtomicBool::new(false),
        })
    }

    /// Create a filter from a bounding envelope instead of a full geometry.
    pub fn with_envelope(
        query: impl Into<String>,
        envelope: Rect<f64>,
        operator: SpatialOperator,
        store: Arc<dyn FeatureStore>,
        index: Arc<dyn SpatialIndex>,
    ) -> Result<Self> {
        Self::new(
            query,
            Geometry::Polygon(envelope.to_polygon()),
            operator,
            store,
            index,
        )
    }

    /// The text query this filter runs.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The spatial operator applied during refinement.
    pub fn operator(&self) -> SpatialOperator {
        self.operator
    }

    /// The query geometry's bounding rectangle used for the coarse phase.
    pub fn envelope(&self) -> Rect<f64> {
        self.envelope
    }

    /// The stored field read as the external join key.
    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    pub(crate) fn set_key_field(&mut self, field: impl Into<String>) {
        self.key_field = field.into();
    }

    /// Coarse-phase results: external key → feature id for every indexed
    /// envelope overlapping the query envelope.
    ///
    /// Computed at most once per filter instance; concurrent first callers
    /// observe a single underlying index query and share its result.
    ///
    /// Two coarse entries sharing one external key are an index
    /// inconsistency: the first entry wins and the duplicate is dropped with
    /// a warning.
    pub fn unrefined_spatial_matches(&self) -> &FxHashMap<String, FeatureId> {
        self.unrefined.get_or_init(|| {
            let mut matches = FxHashMap::default();
            for (id, key) in self.index.query(&self.envelope) {
                match matches.entry(key) {
                    Entry::Vacant(slot) => {
                        slot.insert(id);
                    }
                    Entry::Occupied(existing) => {
                        log::warn!(
                            "coarse index key {:?} maps to features {} and {}; keeping the first",
                            existing.key(),
                            existing.get(),
                            id
                        );
                    }
                }
            }
            matches
        })
    }

    /// The compiled predicate, built lazily at most once per instance.
    fn predicate(&self) -> Result<&GeometryPredicate> {
        self.predicate
            .get_or_try_init(|| GeometryPredicate::build(self.operator, &self.geometry))
    }

    /// Run both phases against a reader, producing a fresh match bitmap
    /// sized to the reader's document-position space.
    ///
    /// Multiple segments are scanned from worker threads; the refinement
    /// phase runs once over the combined candidate set.
    pub fn evaluate(&self, reader: &dyn IndexReader) -> Result<ResultBitmap> {
        let mut bits = ResultBitmap::new(reader.max_doc());

        // Force the coarse phase before fanning out, so worker threads share
        // the cached mapping instead of racing on its first computation.
        self.unrefined_spatial_matches();

        let collector = Mutex::new(HitCollector::default());
        match reader.segments().as_slice() {
            [] => {}
            [segment] => self.collect_segment(*segment, &collector)?,
            segments => std::thread::scope(|scope| -> Result<()> {
                let collector = &collector;
                let handles: Vec<_> = segments
                    .iter()
                    .map(|&segment| scope.spawn(move || self.collect_segment(segment, collector)))
                    .collect();
                for handle in handles {
                    match handle.join() {
                        Ok(scanned) => scanned?,
                        Err(panic) => std::panic::resume_unwind(panic),
                    }
                }
                Ok(())
            })?,
        }

        let HitCollector {
            candidates,
            doc_lookup,
        } = collector.into_inner();

        // No candidate survived the coarse phase: skip refinement entirely.
        if candidates.is_empty() {
            return Ok(bits);
        }

        self.refine(&candidates, &doc_lookup, &mut bits)?;
        Ok(bits)
    }

    /// Collect one segment's text hits into the shared state.
    ///
    /// Hits arrive in arbitrary order; local ids are offset by the segment
    /// base into the global position space by the hit stream. Safe to call
    /// concurrently for different segments of the same reader.
    fn collect_segment(
        &self,
        segment: &dyn IndexSegment,
        collector: &Mutex<HitCollector>,
    ) -> Result<()> {
        let unrefined = self.unrefined_spatial_matches();

        let mut found: Vec<(FeatureId, u32)> = Vec::new();
        for hit in segment_hits(segment, &self.query, &self.key_field)? {
            let hit = hit?;
            if let Some(id) = unrefined.get(&hit.key) {
                found.push((id.clone(), hit.position));
            }
        }

        if !found.is_empty() {
            let mut state = collector.lock();
            for (id, position) in found {
                state.candidates.insert(id.clone());
                state.doc_lookup.insert(id, position);
            }
        }
        Ok(())
    }

    /// Refinement phase: one batched geometry fetch, then the exact
    /// predicate per feature.
    fn refine(
        &self,
        candidates: &FxHashSet<FeatureId>,
        doc_lookup: &FxHashMap<FeatureId, u32>,
        bits: &mut ResultBitmap,
    ) -> Result<()> {
        let predicate = self.predicate()?;

        for fetched in self.store.fetch_geometries(candidates)? {
            let (id, geometry) = fetched?;
            match predicate.evaluate(&geometry) {
                Ok(true) => {
                    if let Some(&position) = doc_lookup.get(&id) {
                        bits.set(position);
                    }
                }
                Ok(false) => {}
                Err(err) => self.log_topology_error(&err),
            }
        }
        Ok(())
    }

    /// Warn once per filter instance, log full detail every time.
    fn log_topology_error(&self, err: &TopologyError) {
        if !self.topology_warned.swap(true, Ordering::Relaxed) {
            log::warn!(
                "{err} while refining a {} filter; affected features are dropped from the result",
                self.operator
            );
        }
        log::debug!(
            "{} during {} refinement on feature geometry: {}",
            err.message,
            self.operator,
            err.geometry
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::RTreeIndex;
    use crate::search::{MemoryIndex, MemorySegment};
    use crate::store::MemoryFeatureStore;
    use geo::{Point, polygon};

    fn query_area() -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
            (x: 0.0, y: 0.0),
        ])
    }

    #[test]
    fn test_unrefined_matches_first_entry_wins_on_duplicate_key() {
        let mut index = RTreeIndex::new();
        let inside = Geometry::Point(Point::new(5.0, 5.0));
        index.insert("feature-1", "shared-key", &inside);
        index.insert("feature-2", "shared-key", &inside);

        let filter = SpatialFilter::new(
            "anything",
            query_area(),
            SpatialOperator::Intersects,
            Arc::new(MemoryFeatureStore::new()),
            Arc::new(index),
        )
        .unwrap();

        let matches = filter.unrefined_spatial_matches();
        assert_eq!(matches.len(), 1);
        // Either feature may be first out of the R-tree, but only one survives.
        let kept = matches.get("shared-key").unwrap();
        assert!(kept.as_str() == "feature-1" || kept.as_str() == "feature-2");
    }

    #[test]
    fn test_debug_output_names_query_and_operator() {
        let filter = SpatialFilter::new(
            "survey",
            query_area(),
            SpatialOperator::Within,
            Arc::new(MemoryFeatureStore::new()),
            Arc::new(RTreeIndex::new()),
        )
        .unwrap();

        let rendered = format!("{filter:?}");
        assert!(rendered.contains("SpatialFilter"));
        assert!(rendered.contains("survey"));
        assert!(rendered.contains("Within"));
    }

    #[test]
    fn test_empty_geometry_rejected_at_construction() {
        let empty = Geometry::MultiPoint(geo::MultiPoint::new(vec![]));
        let err = SpatialFilter::new(
            "q",
            empty,
            SpatialOperator::Intersects,
            Arc::new(MemoryFeatureStore::new()),
            Arc::new(RTreeIndex::new()),
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::InvalidInput(_)));
    }

    #[test]
    fn test_envelope_constructor_matches_contained_point() {
        let envelope = Rect::new(geo::coord! { x: 0.0, y: 0.0 }, geo::coord! { x: 10.0, y: 10.0 });

        let mut index = RTreeIndex::new();
        let point = Geometry::Point(Point::new(5.0, 5.0));
        index.insert("f1", "k1", &point);

        let mut store = MemoryFeatureStore::new();
        store.insert("f1", point);

        let mut segment = MemorySegment::new(0);
        segment.add_document("survey", [("_id", "k1")]);
        let mut reader = MemoryIndex::new();
        reader.push_segment(segment);

        let filter = SpatialFilter::with_envelope(
            "survey",
            envelope,
            SpatialOperator::Intersects,
            Arc::new(store),
            Arc::new(index),
        )
        .unwrap();

        let bits = filter.evaluate(&reader).unwrap();
        assert!(bits.contains(0));
        assert_eq!(bits.len(), 1);
    }

    #[test]
    fn test_configuration_error_surfaces_on_first_evaluation() {
        let mut index = RTreeIndex::new();
        let point = Geometry::Point(Point::new(5.0, 5.0));
        index.insert("f1", "k1", &point);

        let mut store = MemoryFeatureStore::new();
        store.insert("f1", point);

        let mut segment = MemorySegment::new(0);
        segment.add_document("survey", [("_id", "k1")]);
        let mut reader = MemoryIndex::new();
        reader.push_segment(segment);

        let filter = SpatialFilter::new(
            "survey",
            query_area(),
            SpatialOperator::DWithin { distance: -2.0 },
            Arc::new(store),
            Arc::new(index),
        )
        .unwrap();

        let err = filter.evaluate(&reader).unwrap_err();
        assert!(matches!(err, FilterError::InvalidInput(_)));
    }
}
