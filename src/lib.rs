//! Two-phase spatial refinement of full-text search results.
//!
//! A [`SpatialFilter`] narrows a text query's hits to documents whose feature
//! geometry satisfies a spatial predicate: a coarse R-tree envelope pass
//! intersected with the text hit set, then an exact geometry predicate over
//! precise geometries fetched from a feature store.
//!
//! ```rust
//! use georefine::{FilterBuilder, MemoryFeatureStore, MemoryIndex, MemorySegment,
//!     RTreeIndex, SpatialOperator};
//! use geo::{Geometry, Point, polygon};
//! use std::sync::Arc;
//!
//! let harbor = Geometry::Point(Point::new(4.9, 52.4));
//!
//! let mut index = RTreeIndex::new();
//! index.insert("feature-1", "doc-key-1", &harbor);
//!
//! let mut store = MemoryFeatureStore::new();
//! store.insert("feature-1", harbor);
//!
//! let mut segment = MemorySegment::new(0);
//! segment.add_document("harbor survey", [("_id", "doc-key-1")]);
//! let mut reader = MemoryIndex::new();
//! reader.push_segment(segment);
//!
//! let area: Geometry<f64> = Geometry::Polygon(polygon![
//!     (x: 4.0, y: 52.0), (x: 5.0, y: 52.0), (x: 5.0, y: 53.0),
//!     (x: 4.0, y: 53.0), (x: 4.0, y: 52.0),
//! ]);
//! let filter = FilterBuilder::new("harbor")
//!     .geometry(area)
//!     .operator(SpatialOperator::Intersects)
//!     .build(Arc::new(store), Arc::new(index))?;
//!
//! let matches = filter.evaluate(&reader)?;
//! assert!(matches.contains(0));
//! # Ok::<(), georefine::FilterError>(())
//! ```

pub mod bitmap;
pub mod builder;
pub mod error;
pub mod filter;
pub mod index;
pub mod predicate;
pub mod search;
pub mod store;
pub mod types;

pub use bitmap::ResultBitmap;
pub use builder::FilterBuilder;
pub use error::{FilterError, Result, TopologyError};
pub use filter::SpatialFilter;
pub use index::{RTreeIndex, SpatialIndex};
pub use predicate::{GeometryPredicate, SpatialOperator};
pub use search::{IndexReader, IndexSegment, MemoryIndex, MemorySegment, SearchHit};
pub use store::{FeatureIter, FeatureStore, MemoryFeatureStore};
pub use types::{DEFAULT_KEY_FIELD, FeatureId};

pub use geo::{Geometry, Point, Polygon, Rect};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{FilterBuilder, FilterError, Result, SpatialFilter, SpatialOperator};

    pub use crate::{FeatureId, ResultBitmap};

    pub use crate::{FeatureStore, IndexReader, IndexSegment, SpatialIndex};

    pub use crate::{MemoryFeatureStore, MemoryIndex, MemorySegment, RTreeIndex};

    pub use geo::{Geometry, Point, Polygon, Rect};
}
