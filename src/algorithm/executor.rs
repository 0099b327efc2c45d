//! Tile-level propagator façade and the observation loop
//!
//! [`TilePropagator`] translates tile operations into pattern operations,
//! owns the seeded random source, drives the observe→propagate→check cycle
//! and performs backtracking when a contradiction surfaces. Constraints see
//! the propagator through the same façade, via the `_index` methods that
//! leave contradiction handling to the loop.

use ndarray::Array3;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::algorithm::propagation::WavePropagator;
use crate::algorithm::selection::{lowest_entropy_cell, weighted_pattern_choice};
use crate::algorithm::wave::Wave;
use crate::algorithm::{Backtracking, Resolution};
use crate::constraints::Constraint;
use crate::io::error::Result;
use crate::model::{TileId, TileModel, TileSet};
use crate::spatial::GridTopology;

/// Run parameters for a tile propagator
pub struct GeneratorOptions<T> {
    /// Seed for the run's only random source
    pub seed: u64,
    /// Observation history policy
    pub backtracking: Backtracking,
    /// Constraints consulted after every propagation fixed point
    pub constraints: Vec<Box<dyn Constraint<T>>>,
}

impl<T> Default for GeneratorOptions<T> {
    fn default() -> Self {
        Self {
            seed: 0,
            backtracking: Backtracking::Disabled,
            constraints: Vec::new(),
        }
    }
}

/// Tile-level façade over the propagation engine
///
/// Construction runs the initial propagation pass and every constraint's
/// `init`; afterwards the caller loops [`step`](Self::step) or calls
/// [`run`](Self::run) and extracts the grid once `Decided`.
pub struct TilePropagator<T> {
    model: TileModel<T>,
    core: WavePropagator,
    constraints: Vec<Box<dyn Constraint<T>>>,
    rng: StdRng,
    seed: u64,
    status: Resolution,
    backtrack_count: u64,
}

impl<T: TileId> TilePropagator<T> {
    /// Create a propagator over a model and topology
    ///
    /// # Errors
    ///
    /// Returns an error when the model and topology direction sets differ,
    /// or when a constraint rejects the configuration during `init`.
    pub fn new(
        model: TileModel<T>,
        topology: GridTopology,
        options: GeneratorOptions<T>,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(options.seed);
        let core = WavePropagator::new(
            model.patterns().clone(),
            topology,
            options.backtracking,
            &mut rng,
        )?;

        let mut propagator = Self {
            model,
            core,
            constraints: options.constraints,
            rng,
            seed: options.seed,
            status: Resolution::Undecided,
            backtrack_count: 0,
        };
        propagator.initialize_constraints()?;
        Ok(propagator)
    }

    fn initialize_constraints(&mut self) -> Result<()> {
        let mut constraints = std::mem::take(&mut self.constraints);
        let mut failure = None;
        for constraint in &mut constraints {
            match constraint.init(self) {
                Ok(Resolution::Contradiction) => {
                    self.core.mark_contradiction();
                    break;
                }
                Ok(_) => {}
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
            if self.core.is_contradicted() {
                break;
            }
        }
        self.constraints = constraints;
        if let Some(error) = failure {
            return Err(error);
        }

        if !self.core.is_contradicted() {
            self.check_constraints()?;
        }
        if self.core.is_contradicted() {
            self.handle_contradiction()?;
        }
        if self.status == Resolution::Undecided {
            self.refresh_status();
        }
        Ok(())
    }

    /// The model this propagator assigns tiles from
    pub const fn model(&self) -> &TileModel<T> {
        &self.model
    }

    /// The topology being filled
    pub const fn topology(&self) -> &GridTopology {
        self.core.topology()
    }

    /// Read-only view of the possibility state
    pub const fn wave(&self) -> &Wave {
        self.core.wave()
    }

    /// Current terminal or non-terminal state of the run
    pub const fn status(&self) -> Resolution {
        self.status
    }

    /// Number of observations unwound so far
    pub const fn backtrack_count(&self) -> u64 {
        self.backtrack_count
    }

    /// Whether a contradiction is pending resolution
    ///
    /// Only observable from inside a constraint `check`; the observation
    /// loop resolves the flag before returning to the caller.
    pub const fn is_contradicted(&self) -> bool {
        self.core.is_contradicted()
    }

    /// Restrict a cell to the given tile set and propagate
    ///
    /// # Errors
    ///
    /// Returns [`crate::GenerationError::OutOfBounds`] for coordinates
    /// outside the topology.
    pub fn select(&mut self, x: usize, y: usize, z: usize, set: &TileSet) -> Result<()> {
        let cell = self.topology().index_of(x, y, z)?;
        self.select_index(cell, set);
        self.settle()
    }

    /// Remove the given tile set from a cell and propagate
    ///
    /// # Errors
    ///
    /// Returns [`crate::GenerationError::OutOfBounds`] for coordinates
    /// outside the topology.
    pub fn ban(&mut self, x: usize, y: usize, z: usize, set: &TileSet) -> Result<()> {
        let cell = self.topology().index_of(x, y, z)?;
        self.ban_index(cell, set);
        self.settle()
    }

    /// Restrict a cell to a single tile and propagate
    ///
    /// # Errors
    ///
    /// Returns an error for out-of-range coordinates or a tile the model
    /// has never seen.
    pub fn select_tile(&mut self, x: usize, y: usize, z: usize, tile: &T) -> Result<()> {
        let set = self.model.single(tile)?;
        self.select(x, y, z, &set)
    }

    /// Remove a single tile from a cell and propagate
    ///
    /// # Errors
    ///
    /// Returns an error for out-of-range coordinates or a tile the model
    /// has never seen.
    pub fn ban_tile(&mut self, x: usize, y: usize, z: usize, tile: &T) -> Result<()> {
        let set = self.model.single(tile)?;
        self.ban(x, y, z, &set)
    }

    /// Finish a direct select/ban: consult the constraints on the new
    /// fixed point, resolve any contradiction, then refresh the status
    ///
    /// Façade calls reach a propagation fixed point just like observations
    /// do, so the constraint pass runs here as well; otherwise a grid
    /// decided purely through select/ban could report success without the
    /// constraints ever seeing the final state.
    fn settle(&mut self) -> Result<()> {
        self.check_constraints()?;
        if self.core.is_contradicted() {
            self.handle_contradiction()?;
        }
        if self.status == Resolution::Undecided {
            self.refresh_status();
        }
        Ok(())
    }

    /// Pattern-level select by cell index; leaves contradictions pending
    ///
    /// This is the entry point for constraints, which must not trigger
    /// backtracking themselves. Masked cells are ignored.
    pub fn select_index(&mut self, cell: usize, set: &TileSet) {
        if !self.core.topology().contains(cell) {
            return;
        }
        for pattern in 0..self.model.pattern_count() {
            if !set.contains(pattern) {
                self.core.ban(cell, pattern);
            }
        }
        self.core.propagate();
    }

    /// Pattern-level ban by cell index; leaves contradictions pending
    ///
    /// This is the entry point for constraints, which must not trigger
    /// backtracking themselves. Masked cells are ignored.
    pub fn ban_index(&mut self, cell: usize, set: &TileSet) {
        if !self.core.topology().contains(cell) {
            return;
        }
        for pattern in set.iter() {
            self.core.ban(cell, pattern);
        }
        self.core.propagate();
    }

    /// Query a cell against a tile set
    ///
    /// Returns `(all_banned, all_selected)`: whether no pattern of the set
    /// is still possible, and whether every still-possible pattern lies in
    /// the set.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GenerationError::OutOfBounds`] for coordinates
    /// outside the topology.
    pub fn banned_selected(
        &self,
        x: usize,
        y: usize,
        z: usize,
        set: &TileSet,
    ) -> Result<(bool, bool)> {
        let cell = self.topology().index_of(x, y, z)?;
        Ok(self.banned_selected_index(cell, set))
    }

    /// [`banned_selected`](Self::banned_selected) by cell index
    pub fn banned_selected_index(&self, cell: usize, set: &TileSet) -> (bool, bool) {
        let mut any_inside = false;
        let mut any_outside = false;
        for pattern in 0..self.model.pattern_count() {
            if self.core.wave().possible(cell, pattern) {
                if set.contains(pattern) {
                    any_inside = true;
                } else {
                    any_outside = true;
                }
                if any_inside && any_outside {
                    break;
                }
            }
        }
        (!any_inside, !any_outside)
    }

    /// Tiles still possible at a cell
    ///
    /// # Errors
    ///
    /// Returns [`crate::GenerationError::OutOfBounds`] for coordinates
    /// outside the topology.
    pub fn possible_tiles_at(&self, x: usize, y: usize, z: usize) -> Result<Vec<&T>> {
        let cell = self.topology().index_of(x, y, z)?;
        Ok((0..self.model.pattern_count())
            .filter(|&pattern| self.core.wave().possible(cell, pattern))
            .filter_map(|pattern| self.model.tile_of(pattern))
            .collect())
    }

    /// The tile a decided cell settled on, by cell index
    pub fn decided_tile_index(&self, cell: usize) -> Option<&T> {
        self.core
            .wave()
            .decided_pattern(cell)
            .and_then(|pattern| self.model.tile_of(pattern))
    }

    /// Perform one observation with its propagation and constraint pass
    ///
    /// Returns the status after the step; terminal states are returned
    /// unchanged without further work.
    ///
    /// # Errors
    ///
    /// Propagates configuration errors raised by constraint callbacks.
    pub fn step(&mut self) -> Result<Resolution> {
        if self.status != Resolution::Undecided {
            return Ok(self.status);
        }
        if self.core.is_contradicted() {
            self.handle_contradiction()?;
            if self.status != Resolution::Undecided {
                return Ok(self.status);
            }
        }

        let Some(cell) = lowest_entropy_cell(self.core.wave(), self.core.topology()) else {
            // Nothing left to observe; give constraints a final say
            self.check_constraints()?;
            if self.core.is_contradicted() {
                self.handle_contradiction()?;
            }
            if self.status == Resolution::Undecided {
                self.refresh_status();
            }
            return Ok(self.status);
        };

        let Some(pattern) = weighted_pattern_choice(
            self.core.wave(),
            self.core.model().frequencies(),
            cell,
            &mut self.rng,
        ) else {
            self.core.mark_contradiction();
            self.handle_contradiction()?;
            return Ok(self.status);
        };

        self.core.push_frame(cell, pattern);
        for other in 0..self.model.pattern_count() {
            if other != pattern {
                self.core.ban(cell, other);
            }
        }
        self.core.propagate();
        self.check_constraints()?;
        if self.core.is_contradicted() {
            self.handle_contradiction()?;
        }
        if self.status == Resolution::Undecided {
            self.refresh_status();
        }
        Ok(self.status)
    }

    /// Loop [`step`](Self::step) until a terminal state
    ///
    /// # Errors
    ///
    /// Propagates configuration errors raised by constraint callbacks.
    pub fn run(&mut self) -> Result<Resolution> {
        loop {
            let status = self.step()?;
            if status != Resolution::Undecided {
                return Ok(status);
            }
        }
    }

    /// Loop [`step`](Self::step) at most `limit` times
    ///
    /// An exhausted limit leaves the run `Undecided`; callers treat that as
    /// the resource-limit outcome.
    ///
    /// # Errors
    ///
    /// Propagates configuration errors raised by constraint callbacks.
    pub fn run_steps(&mut self, limit: usize) -> Result<Resolution> {
        for _ in 0..limit {
            let status = self.step()?;
            if status != Resolution::Undecided {
                return Ok(status);
            }
        }
        Ok(self.status)
    }

    /// Run to termination, clearing and retrying on contradiction
    ///
    /// Each retry reseeds deterministically from the base seed, so the
    /// whole retry sequence is reproducible.
    ///
    /// # Errors
    ///
    /// Propagates configuration errors raised by constraint callbacks.
    pub fn run_with_retries(&mut self, retries: usize) -> Result<Resolution> {
        let base_seed = self.seed;
        let mut status = self.run()?;
        for attempt in 1..=retries {
            if status != Resolution::Contradiction {
                break;
            }
            self.seed = base_seed ^ (attempt as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
            self.clear()?;
            status = self.run()?;
        }
        self.seed = base_seed;
        Ok(status)
    }

    /// Discard all search state and start over with the current seed
    ///
    /// # Errors
    ///
    /// Propagates configuration errors raised by constraint `init`.
    pub fn clear(&mut self) -> Result<()> {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.core.clear(&mut self.rng);
        self.status = Resolution::Undecided;
        self.backtrack_count = 0;
        self.initialize_constraints()
    }

    /// Replace the seed; takes effect at the next [`clear`](Self::clear)
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    fn check_constraints(&mut self) -> Result<()> {
        loop {
            if self.core.is_contradicted() {
                return Ok(());
            }
            let before = self.core.bans_performed();
            let mut constraints = std::mem::take(&mut self.constraints);
            let mut failure = None;
            for constraint in &mut constraints {
                match constraint.check(self) {
                    Ok(Resolution::Contradiction) => {
                        self.core.mark_contradiction();
                        break;
                    }
                    Ok(_) => {}
                    Err(error) => {
                        failure = Some(error);
                        break;
                    }
                }
                if self.core.is_contradicted() {
                    break;
                }
            }
            self.constraints = constraints;
            if let Some(error) = failure {
                return Err(error);
            }
            if self.core.is_contradicted() || self.core.bans_performed() == before {
                return Ok(());
            }
        }
    }

    fn handle_contradiction(&mut self) -> Result<()> {
        while self.core.is_contradicted() {
            if !self.core.can_backtrack() {
                self.status = Resolution::Contradiction;
                return Ok(());
            }
            let Some((cell, pattern)) = self.core.pop_frame() else {
                self.status = Resolution::Contradiction;
                return Ok(());
            };
            self.backtrack_count += 1;
            self.core.ban(cell, pattern);
            self.core.propagate();
            if !self.core.is_contradicted() {
                self.check_constraints()?;
            }
        }
        Ok(())
    }

    fn refresh_status(&mut self) {
        let wave = self.core.wave();
        let all_decided = self
            .core
            .topology()
            .cells()
            .all(|cell| wave.remaining(cell) == 1);
        self.status = if all_decided {
            Resolution::Decided
        } else {
            Resolution::Undecided
        };
    }

    /// Materialize the grid, `None` for undecided, contradicted and masked
    /// cells
    ///
    /// The array is indexed `[z][y][x]`, matching sample ingestion.
    pub fn to_array(&self) -> Array3<Option<T>> {
        let topology = self.topology();
        let (width, height, depth) = (topology.width(), topology.height(), topology.depth());
        Array3::from_shape_fn((depth, height, width), |(z, y, x)| {
            let cell = topology.index_of(x, y, z).ok()?;
            if !topology.contains(cell) {
                return None;
            }
            self.decided_tile_index(cell).cloned()
        })
    }

    /// Materialize the grid with sentinel tiles for unsettled cells
    ///
    /// Masked and undecided cells yield `undecided`; contradicted cells
    /// yield `contradiction`. The array is indexed `[z][y][x]`.
    pub fn to_array_with(&self, undecided: &T, contradiction: &T) -> Array3<T> {
        let topology = self.topology();
        let (width, height, depth) = (topology.width(), topology.height(), topology.depth());
        Array3::from_shape_fn((depth, height, width), |(z, y, x)| {
            let Ok(cell) = topology.index_of(x, y, z) else {
                return undecided.clone();
            };
            if !topology.contains(cell) {
                return undecided.clone();
            }
            match self.core.wave().remaining(cell) {
                0 => contradiction.clone(),
                1 => self
                    .decided_tile_index(cell)
                    .cloned()
                    .unwrap_or_else(|| undecided.clone()),
                _ => undecided.clone(),
            }
        })
    }
}
