//! Match bitmap over a reader's document-position space.

use roaring::RoaringBitmap;

/// The final match set produced by one filter evaluation.
///
/// Positions are global document positions (segment base plus local doc id).
/// A fresh bitmap starts all-false; refinement sets exactly the positions
/// whose feature geometry passed the exact predicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultBitmap {
    max_doc: u32,
    bits: RoaringBitmap,
}

impl ResultBitmap {
    /// Create an all-false bitmap sized to `max_doc` positions.
    pub fn new(max_doc: u32) -> Self {
        Self {
            max_doc,
            bits: RoaringBitmap::new(),
        }
    }

    /// Set a position to true.
    ///
    /// Positions at or beyond `max_doc` are ignored. Returns whether the
    /// position was newly set.
    pub fn set(&mut self, position: u32) -> bool {
        if position >= self.max_doc {
            return false;
        }
        self.bits.insert(position)
    }

    /// Whether a position is set.
    pub fn contains(&self, position: u32) -> bool {
        self.bits.contains(position)
    }

    /// Number of set positions.
    pub fn len(&self) -> u64 {
        self.bits.len()
    }

    /// Whether no position is set.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Upper bound of the position space.
    pub fn max_doc(&self) -> u32 {
        self.max_doc
    }

    /// Iterate set positions in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.bits.iter()
    }

    /// The underlying roaring bitmap, for the outer search pipeline.
    pub fn as_roaring(&self) -> &RoaringBitmap {
        &self.bits
    }
}
