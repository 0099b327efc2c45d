//! Pattern-index bitmaps derived from tile lists
//!
//! Constraints and the tile-level façade compare wave state against sets of
//! tiles. A [`TileSet`] is the compiled form: one bit per pattern index,
//! packed for O(1) membership tests during the constraint hot loops.

use bitvec::prelude::*;
use std::fmt;

/// Fixed-size bitmap over pattern indices
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileSet {
    bits: BitVec,
}

impl TileSet {
    /// Create a set with no patterns present
    pub fn empty(pattern_count: usize) -> Self {
        Self {
            bits: bitvec![0; pattern_count],
        }
    }

    /// Insert a pattern index
    pub fn insert(&mut self, pattern: usize) {
        if pattern < self.bits.len() {
            self.bits.set(pattern, true);
        }
    }

    /// Test pattern membership
    pub fn contains(&self, pattern: usize) -> bool {
        self.bits.get(pattern).as_deref() == Some(&true)
    }

    /// Merge another set into this one in-place
    pub fn union_with(&mut self, other: &Self) {
        self.bits |= &other.bits;
    }

    /// Count patterns in the set
    pub fn count(&self) -> usize {
        self.bits.count_ones()
    }

    /// Test if no patterns are present
    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    /// Number of pattern slots, present or not
    pub fn pattern_count(&self) -> usize {
        self.bits.len()
    }

    /// Iterate the indices of present patterns
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }
}

impl fmt::Display for TileSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TileSet({} patterns: {:?})",
            self.count(),
            self.iter().collect::<Vec<_>>()
        )
    }
}
