//! Spatial predicate construction and evaluation over precise geometries.
//!
//! The coarse phase only tests envelope overlap, so every candidate must be
//! re-checked here against the exact predicate. Operators form a closed set;
//! each one dispatches to the matching DE-9IM relation, an envelope test, or
//! a distance comparison from the `geo` crate.

use crate::error::{FilterError, Result, TopologyError};
use geo::{BoundingRect, Distance, Euclidean, Geometry, Intersects, Rect, Relate, Validation};
use std::fmt;

/// Named spatial operators selectable at filter construction.
///
/// `DWithin` and `Beyond` carry their distance argument in the same
/// coordinate units as the geometries being compared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpatialOperator {
    /// Feature geometry is topologically equal to the query geometry.
    Equals,
    /// Feature geometry shares no point with the query geometry.
    Disjoint,
    /// Feature geometry shares at least one point with the query geometry.
    Intersects,
    /// Boundaries touch without interior overlap.
    Touches,
    /// Interiors cross in a lower-dimensional intersection.
    Crosses,
    /// Feature geometry lies entirely inside the query geometry.
    Within,
    /// Feature geometry entirely contains the query geometry.
    Contains,
    /// Interiors overlap in an intersection of the same dimension.
    Overlaps,
    /// Envelope-only test: feature envelope intersects the query envelope.
    Bbox,
    /// Feature geometry lies within `distance` of the query geometry.
    DWithin { distance: f64 },
    /// Feature geometry lies farther than `distance` from the query geometry.
    Beyond { distance: f64 },
}

impl SpatialOperator {
    /// Canonical lowercase operator name.
    pub fn name(&self) -> &'static str {
        match self {
            SpatialOperator::Equals => "equals",
            SpatialOperator::Disjoint => "disjoint",
            SpatialOperator::Intersects => "intersects",
            SpatialOperator::Touches => "touches",
            SpatialOperator::Crosses => "crosses",
            SpatialOperator::Within => "within",
            SpatialOperator::Contains => "contains",
            SpatialOperator::Overlaps => "overlaps",
            SpatialOperator::Bbox => "bbox",
            SpatialOperator::DWithin { .. } => "dwithin",
            SpatialOperator::Beyond { .. } => "beyond",
        }
    }
}

impl fmt::Display for SpatialOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A compiled spatial predicate: one operator bound to one query geometry.
///
/// Built once per filter instance and shared across evaluation threads; all
/// evaluation state is precomputed at build time.
#[derive(Debug, Clone)]
pub struct GeometryPredicate {
    operator: SpatialOperator,
    query: Geometry<f64>,
    query_envelope: Rect<f64>,
}

impl GeometryPredicate {
    /// Compile `operator` against a query geometry.
    ///
    /// Fails fast on configuration errors: an empty or topologically invalid
    /// query geometry, or a distance operator with a non-finite or negative
    /// distance.
    pub fn build(operator: SpatialOperator, query: &Geometry<f64>) -> Result<Self> {
        let query_envelope = query.bounding_rect().ok_or_else(|| {
            FilterError::InvalidInput("query geometry has no bounding rectangle".to_string())
        })?;

        if !query.is_valid() {
            return Err(FilterError::InvalidInput(format!(
                "query geometry is topologically invalid: {query:?}"
            )));
        }

        if let SpatialOperator::DWithin { distance } | SpatialOperator::Beyond { distance } =
            operator
            && (!distance.is_finite() || distance < 0.0)
        {
            return Err(FilterError::InvalidInput(format!(
                "{operator} requires a finite non-negative distance, got {distance}"
            )));
        }

        Ok(Self {
            operator,
            query: query.clone(),
            query_envelope,
        })
    }

    /// The operator this predicate was built with.
    pub fn operator(&self) -> SpatialOperator {
        self.operator
    }

    /// The query geometry's axis-aligned bounding rectangle.
    pub fn query_envelope(&self) -> Rect<f64> {
        self.query_envelope
    }

    /// Evaluate the predicate against one feature geometry.
    ///
    /// A topologically invalid feature yields `Err(TopologyError)` rather
    /// than a panic inside the relate machinery; callers treat that as a
    /// non-match and keep going.
    pub fn evaluate(&self, feature: &Geometry<f64>) -> std::result::Result<bool, TopologyError> {
        if !feature.is_valid() {
            return Err(TopologyError {
                message: format!("invalid feature geometry for {} evaluation", self.operator),
                geometry: format!("{feature:?}"),
            });
        }

        Ok(match self.operator {
            SpatialOperator::Bbox => feature
                .bounding_rect()
                .is_some_and(|envelope| envelope.intersects(&self.query_envelope)),
            SpatialOperator::DWithin { distance } => {
                Euclidean.distance(feature, &self.query) <= distance
            }
            SpatialOperator::Beyond { distance } => {
                Euclidean.distance(feature, &self.query) > distance
            }
            relational => {
                // Matrix relates the feature (subject) to the query (object).
                let matrix = feature.relate(&self.query);
                match relational {
                    SpatialOperator::Equals => matrix.is_equal_topo(),
                    SpatialOperator::Disjoint => matrix.is_disjoint(),
                    SpatialOperator::Intersects => matrix.is_intersects(),
                    SpatialOperator::Touches => matrix.is_touches(),
                    SpatialOperator::Crosses => matrix.is_crosses(),
                    SpatialOperator::Within => matrix.is_within(),
                    SpatialOperator::Contains => matrix.is_contains(),
                    SpatialOperator::Overlaps => matrix.is_overlaps(),
                    SpatialOperator::Bbox
                    | SpatialOperator::DWithin { .. }
                    | SpatialOperator::Beyond { .. } => unreachable!(),
                }
            }
        })
    }
}
