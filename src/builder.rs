//! Filter builder for flexible configuration.
//!
//! Wires a text query, a query geometry or envelope, a spatial operator, and
//! the index/store handles into a [`SpatialFilter`], validating the
//! configuration up front.

use crate::error::{FilterError, Result};
use crate::filter::SpatialFilter;
use crate::index::SpatialIndex;
use crate::predicate::SpatialOperator;
use crate::store::FeatureStore;
use geo::{Geometry, Rect};
use std::sync::Arc;

/// Builder for [`SpatialFilter`] instances.
pub struct FilterBuilder {
    query: String,
    geometry: Option<Geometry<f64>>,
    envelope: Option<Rect<f64>>,
    operator: SpatialOperator,
    key_field: Option<String>,
}

impl FilterBuilder {
    /// Start a builder for the given text query. Defaults to the
    /// `intersects` operator and the standard key field.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            geometry: None,
            envelope: None,
            operator: SpatialOperator::Intersects,
            key_field: None,
        }
    }

    /// Set the query geometry. Replaces any previously set envelope.
    pub fn geometry(mut self, geometry: Geometry<f64>) -> Self {
        self.geometry = Some(geometry);
        self.envelope = None;
        self
    }

    /// Set a bounding envelope as the query shape. Replaces any previously
    /// set geometry.
    pub fn envelope(mut self, envelope: Rect<f64>) -> Self {
        self.envelope = Some(envelope);
        self.geometry = None;
        self
    }

    /// Set the spatial operator.
    pub fn operator(mut self, operator: SpatialOperator) -> Self {
        self.operator = operator;
        self
    }

    /// Override the stored field read as the external join key.
    pub fn key_field(mut self, field: impl Into<String>) -> Self {
        self.key_field = Some(field.into());
        self
    }

    /// Build the filter against the given store and index handles.
    ///
    /// Fails fast on configuration errors: no query shape, an empty
    /// geometry, or a distance operator with an invalid distance.
    pub fn build(
        self,
        store: Arc<dyn FeatureStore>,
        index: Arc<dyn SpatialIndex>,
    ) -> Result<SpatialFilter> {
        if let SpatialOperator::DWithin { distance } | SpatialOperator::Beyond { distance } =
            self.operator
            && (!distance.is_finite() || distance < 0.0)
        {
            return Err(FilterError::InvalidInput(format!(
                "{} requires a finite non-negative distance, got {distance}",
                self.operator
            )));
        }

        let mut filter = match (self.geometry, self.envelope) {
            (Some(geometry), _) => {
                SpatialFilter::new(self.query, geometry, self.operator, store, index)?
            }
            (None, Some(envelope)) => {
                SpatialFilter::with_envelope(self.query, envelope, self.operator, store, index)?
            }
            (None, None) => {
                return Err(FilterError::InvalidInput(
                    "a query geometry or envelope is required".to_string(),
                ));
            }
        };

        if let Some(field) = self.key_field {
            filter.set_key_field(field);
        }
        Ok(filter)
    }
}
