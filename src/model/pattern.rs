//! Flat pattern model consumed by the propagation engine
//!
//! Patterns are dense indices assigned by the builder. The model stores one
//! weight per pattern and, for every `(pattern, direction)` pair, the sorted
//! array of patterns legal at that neighbor. Sorted contiguous arrays keep
//! the propagation inner loop cache-friendly; hash sets exist only while
//! building.

use crate::spatial::DirectionSet;

/// Per-pattern frequencies and compatibility tables
///
/// The builder establishes the symmetry guarantee that `q` appearing in
/// `compatible(p, d)` implies `p` appears in `compatible(q, inverse(d))`;
/// the propagator relies on it without rechecking.
#[derive(Clone, Debug)]
pub struct PatternModel {
    directions: DirectionSet,
    frequencies: Vec<f64>,
    compatible: Vec<Vec<Vec<u32>>>,
}

impl PatternModel {
    /// Assemble a model from builder output
    pub(crate) const fn new(
        directions: DirectionSet,
        frequencies: Vec<f64>,
        compatible: Vec<Vec<Vec<u32>>>,
    ) -> Self {
        Self {
            directions,
            frequencies,
            compatible,
        }
    }

    /// Direction set the compatibility tables are indexed by
    pub const fn directions(&self) -> &DirectionSet {
        &self.directions
    }

    /// Number of distinct patterns
    pub fn pattern_count(&self) -> usize {
        self.frequencies.len()
    }

    /// Weight of a pattern; zero forbids it everywhere
    pub fn frequency(&self, pattern: usize) -> f64 {
        self.frequencies.get(pattern).copied().unwrap_or(0.0)
    }

    /// All pattern weights, indexed by pattern
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Patterns legal at the `direction`-neighbor of a cell holding `pattern`
    pub fn compatible(&self, pattern: usize, direction: usize) -> &[u32] {
        self.compatible
            .get(pattern)
            .and_then(|by_direction| by_direction.get(direction))
            .map_or(&[], Vec::as_slice)
    }

    /// Verify the symmetry guarantee over the whole table
    ///
    /// Intended for tests and debugging; generation never calls this.
    pub fn is_symmetric(&self) -> bool {
        for pattern in 0..self.pattern_count() {
            for direction in 0..self.directions.count() {
                let inverse = self.directions.inverse(direction);
                for &other in self.compatible(pattern, direction) {
                    let mirrored = self.compatible(other as usize, inverse);
                    if mirrored.binary_search(&u32::try_from(pattern).unwrap_or(u32::MAX)).is_err() {
                        return false;
                    }
                }
            }
        }
        true
    }
}
