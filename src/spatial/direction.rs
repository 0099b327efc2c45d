//! Direction sets for cartesian grid topologies
//!
//! A direction set enumerates the axis steps a cell can take, pairs each
//! direction with its inverse, and maps unit vectors back to direction
//! indices. Directions are dense indices so that per-direction tables in the
//! propagator stay flat arrays.

/// Step towards negative X
pub const X_MINUS: usize = 0;
/// Step towards positive X
pub const X_PLUS: usize = 1;
/// Step towards negative Y
pub const Y_MINUS: usize = 2;
/// Step towards positive Y
pub const Y_PLUS: usize = 3;
/// Step towards negative Z
pub const Z_MINUS: usize = 4;
/// Step towards positive Z
pub const Z_PLUS: usize = 5;

/// Unit vectors indexed by direction, paired so that `d ^ 1` is the inverse
const VECTORS: [[i32; 3]; 6] = [
    [-1, 0, 0],
    [1, 0, 0],
    [0, -1, 0],
    [0, 1, 0],
    [0, 0, -1],
    [0, 0, 1],
];

/// Finite set of axis directions with precomputed inverses
///
/// Two sets are compatible only when equal; a model built against one set
/// cannot drive a topology built against another.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirectionSet {
    count: usize,
}

impl DirectionSet {
    /// The four axis directions of a flat grid
    pub const fn cartesian2d() -> Self {
        Self { count: 4 }
    }

    /// The six axis directions of a volume grid
    pub const fn cartesian3d() -> Self {
        Self { count: 6 }
    }

    /// Number of directions in the set
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Inverse direction, such that stepping by `direction` then by the
    /// inverse returns to the origin cell
    pub const fn inverse(&self, direction: usize) -> usize {
        direction ^ 1
    }

    /// Unit vector `(dx, dy, dz)` of a direction
    pub fn vector(&self, direction: usize) -> [i32; 3] {
        VECTORS.get(direction).copied().unwrap_or([0, 0, 0])
    }

    /// Look up the direction matching a unit vector
    pub fn from_vector(&self, dx: i32, dy: i32, dz: i32) -> Option<usize> {
        VECTORS
            .iter()
            .take(self.count)
            .position(|v| *v == [dx, dy, dz])
    }
}
