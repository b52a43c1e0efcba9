use geo::{Geometry, LineString, Point, polygon};
use georefine::{
    FilterBuilder, IndexReader, MemoryFeatureStore, MemoryIndex, MemorySegment, RTreeIndex,
    SpatialFilter, SpatialOperator,
};
use std::sync::Arc;

/// Query shape shared by most scenarios: the 10x10 square at the origin.
fn query_area() -> Geometry<f64> {
    Geometry::Polygon(polygon![
        (x: 0.0, y: 0.0),
        (x: 10.0, y: 0.0),
        (x: 10.0, y: 10.0),
        (x: 0.0, y: 10.0),
        (x: 0.0, y: 0.0),
    ])
}

/// A geometry whose envelope overlaps the query envelope while the geometry
/// itself stays outside the square: the segment x + y = 20.5 clipped near the
/// (10, 10) corner.
fn corner_sliver() -> Geometry<f64> {
    Geometry::LineString(LineString::from(vec![(9.9, 10.6), (10.6, 9.9)]))
}

#[test]
fn test_matching_document_sets_its_position() {
    let inside = Geometry::Point(Point::new(5.0, 5.0));

    let mut index = RTreeIndex::new();
    index.insert("f1", "k1", &inside);
    let mut store = MemoryFeatureStore::new();
    store.insert("f1", inside);

    let mut segment = MemorySegment::new(0);
    segment.add_document("coastal survey", [("_id", "k1")]);
    let mut reader = MemoryIndex::new();
    reader.push_segment(segment);

    let filter = SpatialFilter::new(
        "coastal",
        query_area(),
        SpatialOperator::Intersects,
        Arc::new(store),
        Arc::new(index),
    )
    .unwrap();

    let bits = filter.evaluate(&reader).unwrap();
    assert!(bits.contains(0));
    assert_eq!(bits.len(), 1);
}

/// Text query hits positions {3, 7, 12}; only the keys of 7 and 12 are coarse
/// candidates (features X and Y); X passes `intersects`, Y fails. Expected
/// bitmap: {7}.
#[test]
fn test_mixed_candidate_outcomes() {
    let feature_x = Geometry::Point(Point::new(5.0, 5.0));
    let feature_y = corner_sliver();

    let mut index = RTreeIndex::new();
    index.insert("X", "key-7", &feature_x);
    index.insert("Y", "key-12", &feature_y);

    let mut store = MemoryFeatureStore::new();
    store.insert("X", feature_x);
    store.insert("Y", feature_y);

    let mut segment = MemorySegment::new(0);
    for local in 0..13u32 {
        let text = if matches!(local, 3 | 7 | 12) {
            "quarry report"
        } else {
            "unrelated record"
        };
        segment.add_document(text, [("_id", format!("key-{local}"))]);
    }
    let mut reader = MemoryIndex::new();
    reader.push_segment(segment);

    let filter = SpatialFilter::new(
        "quarry",
        query_area(),
        SpatialOperator::Intersects,
        Arc::new(store),
        Arc::new(index),
    )
    .unwrap();

    let bits = filter.evaluate(&reader).unwrap();
    assert_eq!(bits.iter().collect::<Vec<_>>(), vec![7]);
}

#[test]
fn test_result_is_subset_of_text_hits() {
    let mut index = RTreeIndex::new();
    let mut store = MemoryFeatureStore::new();
    let mut segment = MemorySegment::new(0);

    // Spread features across and outside the query area; every document is
    // spatially indexed, only some match the text query.
    for i in 0..20u32 {
        let point = Geometry::Point(Point::new(i as f64, i as f64));
        let id = format!("f{i}");
        let key = format!("k{i}");
        index.insert(id.as_str(), key.as_str(), &point);
        store.insert(id.as_str(), point);
        let text = if i % 3 == 0 { "basalt flow" } else { "granite" };
        segment.add_document(text, [("_id", key)]);
    }
    let mut reader = MemoryIndex::new();

    let text_hits: Vec<u32> = (0..20).filter(|i| i % 3 == 0).collect();
    reader.push_segment(segment);

    let filter = SpatialFilter::new(
        "basalt",
        query_area(),
        SpatialOperator::Intersects,
        Arc::new(store),
        Arc::new(index),
    )
    .unwrap();

    let bits = filter.evaluate(&reader).unwrap();
    assert!(!bits.is_empty());
    for position in bits.iter() {
        assert!(text_hits.contains(&position));
    }
}

/// Coarse phase is a strict superset of the refined phase: an envelope
/// overlap without exact intersection never reaches the result.
#[test]
fn test_coarse_overlap_without_exact_match_is_excluded() {
    let sliver = corner_sliver();

    let mut index = RTreeIndex::new();
    index.insert("sliver", "k-sliver", &sliver);
    let mut store = MemoryFeatureStore::new();
    store.insert("sliver", sliver);

    let mut segment = MemorySegment::new(0);
    segment.add_document("boundary parcel", [("_id", "k-sliver")]);
    let mut reader = MemoryIndex::new();
    reader.push_segment(segment);

    let filter = SpatialFilter::new(
        "parcel",
        query_area(),
        SpatialOperator::Intersects,
        Arc::new(store),
        Arc::new(index),
    )
    .unwrap();

    // The coarse phase sees it, the refinement drops it.
    assert_eq!(filter.unrefined_spatial_matches().len(), 1);
    assert!(filter.evaluate(&reader).unwrap().is_empty());
}

/// Two segments: base 0 and base 100. A hit at local id 5 in segment 1 lands
/// at global position 105.
#[test]
fn test_segment_base_offsets() {
    let inside = Geometry::Point(Point::new(5.0, 5.0));

    let mut index = RTreeIndex::new();
    index.insert("f", "target", &inside);
    let mut store = MemoryFeatureStore::new();
    store.insert("f", inside);

    let mut seg0 = MemorySegment::new(0);
    for _ in 0..10 {
        seg0.add_document("filler entry", [("_id", "none")]);
    }
    let mut seg1 = MemorySegment::new(100);
    for local in 0..6u32 {
        let text = if local == 5 { "lighthouse" } else { "filler" };
        seg1.add_document(text, [("_id", if local == 5 { "target" } else { "other" })]);
    }

    let mut reader = MemoryIndex::new();
    reader.push_segment(seg0);
    reader.push_segment(seg1);
    assert_eq!(reader.max_doc(), 106);

    let filter = SpatialFilter::new(
        "lighthouse",
        query_area(),
        SpatialOperator::Intersects,
        Arc::new(store),
        Arc::new(index),
    )
    .unwrap();

    let bits = filter.evaluate(&reader).unwrap();
    assert_eq!(bits.iter().collect::<Vec<_>>(), vec![105]);
}

#[test]
fn test_within_and_dwithin_refinement() {
    let contained = Geometry::Point(Point::new(2.0, 2.0));
    // Overlaps the area but is not contained by it.
    let straddling = Geometry::LineString(LineString::from(vec![(5.0, 5.0), (15.0, 5.0)]));
    // Outside the area but within distance 3 of it.
    let nearby = Geometry::Point(Point::new(12.0, 5.0));

    let mut index = RTreeIndex::new();
    let mut store = MemoryFeatureStore::new();
    for (id, key, geometry) in [
        ("in", "k-in", &contained),
        ("straddle", "k-straddle", &straddling),
        ("near", "k-near", &nearby),
    ] {
        index.insert(id, key, geometry);
        store.insert(id, geometry.clone());
    }
    let store = Arc::new(store);
    let index: Arc<RTreeIndex> = Arc::new(index);

    let mut segment = MemorySegment::new(0);
    segment.add_document("station alpha", [("_id", "k-in")]);
    segment.add_document("station beta", [("_id", "k-straddle")]);
    segment.add_document("station gamma", [("_id", "k-near")]);
    let mut reader = MemoryIndex::new();
    reader.push_segment(segment);

    let within = FilterBuilder::new("station")
        .geometry(query_area())
        .operator(SpatialOperator::Within)
        .build(store.clone(), index.clone())
        .unwrap();
    let bits = within.evaluate(&reader).unwrap();
    assert_eq!(bits.iter().collect::<Vec<_>>(), vec![0]);

    // dwithin reaches the nearby point; its coarse envelope must overlap the
    // query envelope for it to be a candidate at all, so only the straddling
    // line joins the contained point here.
    let dwithin = FilterBuilder::new("station")
        .geometry(query_area())
        .operator(SpatialOperator::DWithin { distance: 3.0 })
        .build(store, index)
        .unwrap();
    let bits = dwithin.evaluate(&reader).unwrap();
    assert_eq!(bits.iter().collect::<Vec<_>>(), vec![0, 1]);
}

#[test]
fn test_custom_key_field_end_to_end() {
    let inside = Geometry::Point(Point::new(5.0, 5.0));

    let mut index = RTreeIndex::new();
    index.insert("f1", "uuid-9", &inside);
    let mut store = MemoryFeatureStore::new();
    store.insert("f1", inside);

    let mut segment = MemorySegment::new(0);
    segment.add_document("wetland", [("_id", "unrelated"), ("uuid", "uuid-9")]);
    let mut reader = MemoryIndex::new();
    reader.push_segment(segment);

    let filter = FilterBuilder::new("wetland")
        .geometry(query_area())
        .key_field("uuid")
        .build(Arc::new(store), Arc::new(index))
        .unwrap();

    let bits = filter.evaluate(&reader).unwrap();
    assert!(bits.contains(0));
}

#[test]
fn test_document_without_coarse_candidate_is_excluded() {
    let mut index = RTreeIndex::new();
    index.insert(
        "far",
        "k-far",
        &Geometry::Point(Point::new(500.0, 500.0)),
    );
    let mut store = MemoryFeatureStore::new();
    store.insert("far", Geometry::Point(Point::new(500.0, 500.0)));

    let mut segment = MemorySegment::new(0);
    segment.add_document("archive record", [("_id", "k-far")]);
    segment.add_document("archive record", [("_id", "never-indexed")]);
    let mut reader = MemoryIndex::new();
    reader.push_segment(segment);

    let filter = SpatialFilter::new(
        "archive",
        query_area(),
        SpatialOperator::Intersects,
        Arc::new(store),
        Arc::new(index),
    )
    .unwrap();

    assert!(filter.evaluate(&reader).unwrap().is_empty());
}

/// Each evaluation builds a fresh bitmap while reusing the cached coarse
/// matches; repeated calls agree.
#[test]
fn test_repeated_evaluation_is_stable() {
    let inside = Geometry::Point(Point::new(5.0, 5.0));

    let mut index = RTreeIndex::new();
    index.insert("f1", "k1", &inside);
    let mut store = MemoryFeatureStore::new();
    store.insert("f1", inside);

    let mut segment = MemorySegment::new(0);
    segment.add_document("repeatable", [("_id", "k1")]);
    let mut reader = MemoryIndex::new();
    reader.push_segment(segment);

    let filter = SpatialFilter::new(
        "repeatable",
        query_area(),
        SpatialOperator::Intersects,
        Arc::new(store),
        Arc::new(index),
    )
    .unwrap();

    let first = filter.evaluate(&reader).unwrap();
    let second = filter.evaluate(&reader).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.iter().collect::<Vec<_>>(), vec![0]);
}
