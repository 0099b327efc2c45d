//! Adjacency model construction
//!
//! Collects tile-level adjacency declarations, sample grids and frequency
//! assignments, then compiles them into the flat [`PatternModel`] the
//! propagator runs on. Tiles are interned lazily: the first occurrence of a
//! tile appends a fresh pattern with zero frequency and empty per-direction
//! compatibility sets. While building, compatibility lives in hash sets
//! (cheap insertion); `build` materializes them into sorted arrays.

use ndarray::ArrayView3;
use std::collections::{HashMap, HashSet};

use crate::io::error::{GenerationError, Result};
use crate::model::pattern::PatternModel;
use crate::model::tileset::TileSet;
use crate::model::TileId;
use crate::spatial::DirectionSet;

/// Caller-supplied symmetry group applied to adjacency declarations
///
/// Rotation and reflection handling stays outside the core: the builder only
/// consumes the ability to rotate a tile (which may be undefined for some
/// tiles) and to rotate a step vector.
pub trait RotationGroup<T> {
    /// Number of group elements, identity included
    fn element_count(&self) -> usize;

    /// Image of a tile under a group element, or `None` if the tile has no
    /// counterpart under that element
    fn rotate_tile(&self, tile: &T, element: usize) -> Option<T>;

    /// Image of a step vector under a group element
    fn rotate_vector(&self, dx: i32, dy: i32, dz: i32, element: usize) -> (i32, i32, i32);
}

/// Mutable builder for tile adjacency models
///
/// The builder is only touched before the propagator exists; `build`
/// consumes it and everything downstream is read-only.
pub struct AdjacencyBuilder<T> {
    directions: DirectionSet,
    tiles: Vec<T>,
    index: HashMap<T, usize>,
    frequencies: Vec<f64>,
    compatible: Vec<Vec<HashSet<u32>>>,
}

impl<T: TileId> AdjacencyBuilder<T> {
    /// Create an empty builder over a direction set
    pub fn new(directions: DirectionSet) -> Self {
        Self {
            directions,
            tiles: Vec::new(),
            index: HashMap::new(),
            frequencies: Vec::new(),
            compatible: Vec::new(),
        }
    }

    /// Intern a tile, appending a fresh pattern on first sight
    fn intern(&mut self, tile: &T) -> usize {
        if let Some(&pattern) = self.index.get(tile) {
            return pattern;
        }
        let pattern = self.tiles.len();
        self.tiles.push(tile.clone());
        self.index.insert(tile.clone(), pattern);
        self.frequencies.push(0.0);
        self.compatible
            .push(vec![HashSet::new(); self.directions.count()]);
        pattern
    }

    /// Declare that every `dst` tile may sit at the `(dx, dy, dz)`-neighbor
    /// of every `src` tile
    ///
    /// Records both orientations, keeping the compatibility tables
    /// symmetric under direction inversion.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::UnknownDirection`] when the vector is not
    /// a direction of the builder's set.
    pub fn add_adjacency(&mut self, src: &[T], dst: &[T], dx: i32, dy: i32, dz: i32) -> Result<()> {
        let direction = self
            .directions
            .from_vector(dx, dy, dz)
            .ok_or(GenerationError::UnknownDirection { dx, dy, dz })?;
        let inverse = self.directions.inverse(direction);

        for s in src {
            let sp = self.intern(s);
            for d in dst {
                let dp = self.intern(d);
                self.insert_pair(sp, direction, dp);
                self.insert_pair(dp, inverse, sp);
            }
        }
        Ok(())
    }

    /// Declare an adjacency under every element of a rotation group
    ///
    /// Tiles without an image under a group element are skipped for that
    /// element, as are pairs whose rotated vector leaves the direction set.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::UnknownDirection`] when the unrotated
    /// vector is not a direction of the builder's set.
    pub fn add_adjacency_rotated<R: RotationGroup<T>>(
        &mut self,
        src: &[T],
        dst: &[T],
        dx: i32,
        dy: i32,
        dz: i32,
        rotations: &R,
    ) -> Result<()> {
        // Validate the base vector up front so a typo fails loudly even if
        // every rotated image happens to be skipped
        self.directions
            .from_vector(dx, dy, dz)
            .ok_or(GenerationError::UnknownDirection { dx, dy, dz })?;

        for element in 0..rotations.element_count() {
            let (rx, ry, rz) = rotations.rotate_vector(dx, dy, dz, element);
            if self.directions.from_vector(rx, ry, rz).is_none() {
                continue;
            }
            for s in src {
                let Some(rs) = rotations.rotate_tile(s, element) else {
                    continue;
                };
                for d in dst {
                    let Some(rd) = rotations.rotate_tile(d, element) else {
                        continue;
                    };
                    self.add_adjacency(&[rs.clone()], &[rd], rx, ry, rz)?;
                }
            }
        }
        Ok(())
    }

    /// Set the absolute frequency of a tile, interning it if new
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::InvalidFrequency`] for negative or
    /// non-finite values.
    pub fn set_frequency(&mut self, tile: &T, frequency: f64) -> Result<()> {
        if !frequency.is_finite() || frequency < 0.0 {
            return Err(GenerationError::InvalidFrequency {
                value: frequency,
                reason: "frequencies must be finite and non-negative",
            });
        }
        let pattern = self.intern(tile);
        if let Some(slot) = self.frequencies.get_mut(pattern) {
            *slot = frequency;
        }
        Ok(())
    }

    /// Scale the frequency of a tile, interning it if new
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::InvalidFrequency`] for negative or
    /// non-finite factors.
    pub fn multiply_frequency(&mut self, tile: &T, factor: f64) -> Result<()> {
        if !factor.is_finite() || factor < 0.0 {
            return Err(GenerationError::InvalidFrequency {
                value: factor,
                reason: "frequency factors must be finite and non-negative",
            });
        }
        let pattern = self.intern(tile);
        if let Some(slot) = self.frequencies.get_mut(pattern) {
            *slot *= factor;
        }
        Ok(())
    }

    /// Give every known tile frequency 1
    pub fn set_uniform_frequency(&mut self) {
        self.frequencies.fill(1.0);
    }

    /// Ingest a sample grid, learning frequencies and adjacencies from it
    ///
    /// The view is indexed `[z][y][x]`. Each occurrence increments the
    /// tile's frequency; every observed neighbor pair is recorded in both
    /// orientations. With `periodic` set, pairs across opposite sample
    /// edges are observed as well.
    pub fn add_sample(&mut self, sample: ArrayView3<'_, T>, periodic: bool) {
        let (depth, height, width) = sample.dim();
        let axis_pairs = |position: usize, delta: i32, extent: usize| -> Option<usize> {
            match delta {
                1 if position + 1 < extent => Some(position + 1),
                1 if periodic && extent > 1 => Some(0),
                -1 if position > 0 => Some(position - 1),
                -1 if periodic && extent > 1 => Some(extent - 1),
                0 => Some(position),
                _ => None,
            }
        };

        for z in 0..depth {
            for y in 0..height {
                for x in 0..width {
                    let Some(tile) = sample.get((z, y, x)) else {
                        continue;
                    };
                    let tile = tile.clone();
                    let pattern = self.intern(&tile);
                    if let Some(slot) = self.frequencies.get_mut(pattern) {
                        *slot += 1.0;
                    }

                    for direction in 0..self.directions.count() {
                        let [dx, dy, dz] = self.directions.vector(direction);
                        let Some(nx) = axis_pairs(x, dx, width) else {
                            continue;
                        };
                        let Some(ny) = axis_pairs(y, dy, height) else {
                            continue;
                        };
                        let Some(nz) = axis_pairs(z, dz, depth) else {
                            continue;
                        };
                        let Some(neighbor) = sample.get((nz, ny, nx)) else {
                            continue;
                        };
                        let neighbor = neighbor.clone();
                        let neighbor_pattern = self.intern(&neighbor);
                        let inverse = self.directions.inverse(direction);
                        self.insert_pair(pattern, direction, neighbor_pattern);
                        self.insert_pair(neighbor_pattern, inverse, pattern);
                    }
                }
            }
        }
    }

    fn insert_pair(&mut self, pattern: usize, direction: usize, other: usize) {
        if let Some(set) = self
            .compatible
            .get_mut(pattern)
            .and_then(|by_direction| by_direction.get_mut(direction))
        {
            set.insert(u32::try_from(other).unwrap_or(u32::MAX));
        }
    }

    /// Number of tiles interned so far
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Compile the collected declarations into an immutable model
    ///
    /// Hash sets become sorted arrays here; the pattern→tile map is frozen.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::EmptyModel`] when no tile was ever
    /// interned.
    pub fn build(self) -> Result<TileModel<T>> {
        if self.tiles.is_empty() {
            return Err(GenerationError::EmptyModel);
        }

        let compatible = self
            .compatible
            .into_iter()
            .map(|by_direction| {
                by_direction
                    .into_iter()
                    .map(|set| {
                        let mut sorted: Vec<u32> = set.into_iter().collect();
                        sorted.sort_unstable();
                        sorted
                    })
                    .collect()
            })
            .collect();

        Ok(TileModel {
            patterns: PatternModel::new(self.directions, self.frequencies, compatible),
            tiles: self.tiles,
            index: self.index,
        })
    }
}

/// Finalized model: pattern tables plus the tile↔pattern mapping
///
/// Read-only after `build`; shared by the propagator façade and every
/// constraint.
#[derive(Clone, Debug)]
pub struct TileModel<T> {
    patterns: PatternModel,
    tiles: Vec<T>,
    index: HashMap<T, usize>,
}

impl<T: TileId> TileModel<T> {
    /// The flat pattern tables
    pub const fn patterns(&self) -> &PatternModel {
        &self.patterns
    }

    /// Number of distinct patterns (one per tile)
    pub fn pattern_count(&self) -> usize {
        self.patterns.pattern_count()
    }

    /// All tiles, indexed by pattern
    pub fn tiles(&self) -> &[T] {
        &self.tiles
    }

    /// Pattern index of a tile
    pub fn pattern_of(&self, tile: &T) -> Option<usize> {
        self.index.get(tile).copied()
    }

    /// Tile assigned to a pattern index
    pub fn tile_of(&self, pattern: usize) -> Option<&T> {
        self.tiles.get(pattern)
    }

    /// Compile a tile list into a pattern bitmap
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::UnknownTile`] when a tile was never part
    /// of the model.
    pub fn tile_set(&self, tiles: &[T]) -> Result<TileSet> {
        let mut set = TileSet::empty(self.pattern_count());
        for tile in tiles {
            let pattern = self
                .pattern_of(tile)
                .ok_or_else(|| GenerationError::UnknownTile {
                    tile: format!("{tile:?}"),
                })?;
            set.insert(pattern);
        }
        Ok(set)
    }

    /// Pattern bitmap containing a single tile
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::UnknownTile`] when the tile was never
    /// part of the model.
    pub fn single(&self, tile: &T) -> Result<TileSet> {
        self.tile_set(std::slice::from_ref(tile))
    }
}
