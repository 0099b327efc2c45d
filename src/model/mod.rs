//! Tile adjacency models and their compiled pattern form

/// Builder collecting adjacency declarations and samples
pub mod builder;
/// Flat pattern tables consumed by the propagator
pub mod pattern;
/// Pattern-index bitmaps for tile sets
pub mod tileset;

pub use builder::{AdjacencyBuilder, RotationGroup, TileModel};
pub use pattern::PatternModel;
pub use tileset::TileSet;

use std::fmt::Debug;
use std::hash::Hash;

/// Capabilities the core requires of caller-supplied tile identifiers
///
/// Tiles are opaque values; the core only compares, hashes and clones them.
/// The blanket impl makes any suitable type a tile without opting in.
pub trait TileId: Clone + Eq + Hash + Debug {}

impl<T: Clone + Eq + Hash + Debug> TileId for T {}
