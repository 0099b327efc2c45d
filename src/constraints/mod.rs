//! Non-local constraints consulted between propagation fixed points

/// Cardinality bounds over a tile set
pub mod count;
/// Half-edge connectivity for tiles with directional exits
pub mod edged_path;
/// Derived graphs and articulation-point analysis
pub mod graph;
/// Global connectivity of path cells
pub mod path;

pub use count::{CountComparison, CountConstraint};
pub use edged_path::EdgedPathConstraint;
pub use path::PathConstraint;

use crate::algorithm::{Resolution, TilePropagator};
use crate::io::error::Result;
use crate::model::TileId;

/// Plug-in protocol for non-local constraints
///
/// The propagator calls `check` after every propagation fixed point, in
/// registration order, repeating the pass while any constraint mutates the
/// wave. A `Contradiction` resolution is handled exactly like a propagation
/// contradiction, feeding the backtracking machinery.
///
/// Implementations mutate the wave only through
/// [`TilePropagator::select_index`] and [`TilePropagator::ban_index`], and
/// must not touch the propagator from another constraint's callbacks.
pub trait Constraint<T: TileId> {
    /// Called once before the first observation, and again after a clear
    ///
    /// The topology and model are final by this point; derived structures
    /// should be built here so `check` only refreshes per-node state.
    ///
    /// # Errors
    ///
    /// Implementations reject unsupported configurations here.
    fn init(&mut self, propagator: &mut TilePropagator<T>) -> Result<Resolution> {
        let _ = propagator;
        Ok(Resolution::Undecided)
    }

    /// Re-evaluate the constraint against the current wave
    ///
    /// # Errors
    ///
    /// Configuration errors only; an unsatisfiable state is reported as
    /// `Ok(Resolution::Contradiction)`.
    fn check(&mut self, propagator: &mut TilePropagator<T>) -> Result<Resolution>;
}
