//! Weighted wave function collapse tile generation over periodic, masked grids
//!
//! The crate assigns exactly one tile to every cell of a finite topology so
//! that all local adjacency rules hold, collapsing cells in lowest-entropy
//! order and backtracking out of contradictions. Non-local constraints
//! (path connectivity, cardinality bounds) plug into the propagation loop.

#![forbid(unsafe_code)]

/// Constraint propagation engine: wave state, observation loop, backtracking
pub mod algorithm;
/// Non-local constraints consulted between propagation fixed points
pub mod constraints;
/// Error handling, console rendering, demo presets and the CLI
pub mod io;
/// Tile adjacency models and their compiled pattern form
pub mod model;
/// Grid topology and direction abstractions
pub mod spatial;

pub use algorithm::{Backtracking, GeneratorOptions, Resolution, TilePropagator};
pub use io::error::{GenerationError, Result};
