//! Support-counted constraint propagation with undoable history
//!
//! The propagator maintains, for every `(cell, pattern, direction)` triple,
//! the number of patterns still possible at the neighbor in that direction
//! which admit the pattern. Eliminations decrement the counts of the cells
//! they support; a count hitting zero eliminates in turn. Events drain
//! through a FIFO queue, and every elimination is recorded in the active
//! backtrack frame so an observation can be unwound exactly.

use std::collections::VecDeque;

use rand::rngs::StdRng;

use crate::algorithm::wave::Wave;
use crate::algorithm::Backtracking;
use crate::io::error::{GenerationError, Result};
use crate::model::PatternModel;
use crate::spatial::GridTopology;

/// One observation's undo record: the collapsed choice plus every
/// elimination performed since the frame was pushed, in order.
#[derive(Debug)]
struct Frame {
    chosen: (u32, u32),
    bans: Vec<(u32, u32)>,
}

/// Pattern-level propagation engine
///
/// Owns the wave, the support counts, the event queue and the backtrack
/// stack. The tile-level façade and the constraints drive it exclusively
/// through [`ban`](WavePropagator::ban), [`propagate`](WavePropagator::propagate)
/// and the frame operations.
#[derive(Debug)]
pub struct WavePropagator {
    topology: GridTopology,
    model: PatternModel,
    wave: Wave,
    support: Vec<i32>,
    queue: VecDeque<(u32, u32)>,
    frames: Vec<Frame>,
    backtracking: Backtracking,
    contradiction: bool,
    contradiction_cell: Option<usize>,
    bans_performed: u64,
}

impl WavePropagator {
    /// Build the propagator and run the initial propagation pass
    ///
    /// Patterns with zero frequency, and patterns with an empty
    /// compatibility list towards an existing neighbor, are eliminated up
    /// front and their consequences propagated. The run can already be
    /// contradicted after this (an over-constrained model).
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::IncompatibleDirections`] when the model
    /// and topology disagree on the direction set.
    pub fn new(
        model: PatternModel,
        topology: GridTopology,
        backtracking: Backtracking,
        rng: &mut StdRng,
    ) -> Result<Self> {
        if model.directions() != topology.directions() {
            return Err(GenerationError::IncompatibleDirections {
                expected: model.directions().count(),
                actual: topology.directions().count(),
            });
        }

        let wave = Wave::new(topology.cell_count(), model.frequencies(), rng);
        let mut propagator = Self {
            support: Vec::new(),
            queue: VecDeque::new(),
            frames: Vec::new(),
            backtracking,
            contradiction: false,
            contradiction_cell: None,
            bans_performed: 0,
            topology,
            model,
            wave,
        };
        propagator.initialize();
        Ok(propagator)
    }

    /// Reset to the freshly-constructed state and re-run initialization
    pub fn clear(&mut self, rng: &mut StdRng) {
        self.wave = Wave::new(self.topology.cell_count(), self.model.frequencies(), rng);
        self.queue.clear();
        self.frames.clear();
        self.contradiction = false;
        self.contradiction_cell = None;
        self.bans_performed = 0;
        self.initialize();
    }

    fn initialize(&mut self) {
        let cells = self.topology.cell_count();
        let patterns = self.model.pattern_count();
        let directions = self.model.directions().count();

        self.support = vec![0; cells * patterns * directions];
        for cell in 0..cells {
            for pattern in 0..patterns {
                for direction in 0..directions {
                    let index = self.support_index(cell, pattern, direction);
                    let count = self.model.compatible(pattern, direction).len();
                    if let Some(entry) = self.support.get_mut(index) {
                        *entry = i32::try_from(count).unwrap_or(i32::MAX);
                    }
                }
            }
        }

        // Eliminate patterns that can never stand: zero weight, or no
        // compatible partner towards a neighbor that exists
        for cell in 0..cells {
            if !self.topology.contains(cell) {
                continue;
            }
            for pattern in 0..patterns {
                if self.model.frequency(pattern) == 0.0 {
                    self.ban(cell, pattern);
                    continue;
                }
                for direction in 0..directions {
                    if self.model.compatible(pattern, direction).is_empty()
                        && self.topology.try_move(cell, direction).is_some()
                    {
                        self.ban(cell, pattern);
                        break;
                    }
                }
            }
        }
        self.propagate();
    }

    fn support_index(&self, cell: usize, pattern: usize, direction: usize) -> usize {
        (cell * self.model.pattern_count() + pattern) * self.model.directions().count() + direction
    }

    /// The immutable topology of this run
    pub const fn topology(&self) -> &GridTopology {
        &self.topology
    }

    /// The pattern tables this run propagates over
    pub const fn model(&self) -> &PatternModel {
        &self.model
    }

    /// The current possibility state
    pub const fn wave(&self) -> &Wave {
        &self.wave
    }

    /// Whether a contradiction is pending resolution
    pub const fn is_contradicted(&self) -> bool {
        self.contradiction
    }

    /// Cell where the pending contradiction was first seen, if it came from
    /// propagation rather than a constraint
    pub const fn contradiction_cell(&self) -> Option<usize> {
        self.contradiction_cell
    }

    /// Flag a contradiction discovered outside propagation
    pub fn mark_contradiction(&mut self) {
        self.contradiction = true;
    }

    /// Monotone count of eliminations performed since construction
    ///
    /// Constraint passes compare this before and after to detect progress.
    pub const fn bans_performed(&self) -> u64 {
        self.bans_performed
    }

    /// Eliminate a pattern at a cell, if still possible
    ///
    /// The elimination is applied immediately; its effect on neighboring
    /// support counts is queued for [`propagate`](Self::propagate).
    pub fn ban(&mut self, cell: usize, pattern: usize) {
        if self.wave.possible(cell, pattern) {
            self.remove(cell, pattern);
        }
    }

    fn remove(&mut self, cell: usize, pattern: usize) {
        let remaining = self.wave.erase(cell, pattern);
        self.bans_performed += 1;
        if let Some(frame) = self.frames.last_mut() {
            frame.bans.push((as_u32(cell), as_u32(pattern)));
        }
        if remaining == 0 && !self.contradiction {
            self.contradiction = true;
            self.contradiction_cell = Some(cell);
        }
        self.queue.push_back((as_u32(cell), as_u32(pattern)));
    }

    /// Drain the event queue to a fixed point
    ///
    /// The queue is always drained completely, even past a contradiction:
    /// frame undo assumes every recorded elimination has had its support
    /// updates applied.
    pub fn propagate(&mut self) {
        while let Some((cell, pattern)) = self.queue.pop_front() {
            self.update_supports(cell as usize, pattern as usize);
        }
    }

    fn update_supports(&mut self, cell: usize, pattern: usize) {
        let directions = self.model.directions().count();
        for direction in 0..directions {
            let Some(neighbor) = self.topology.try_move(cell, direction) else {
                continue;
            };
            let inverse = self.model.directions().inverse(direction);
            let count = self.model.compatible(pattern, direction).len();
            for i in 0..count {
                let Some(&q) = self.model.compatible(pattern, direction).get(i) else {
                    continue;
                };
                let q = q as usize;
                let index = self.support_index(neighbor, q, inverse);
                let Some(entry) = self.support.get_mut(index) else {
                    continue;
                };
                *entry -= 1;
                if *entry == 0 && self.wave.possible(neighbor, q) {
                    self.remove(neighbor, q);
                }
            }
        }
    }

    /// Open an undo frame for an observation of `(cell, pattern)`
    ///
    /// With backtracking disabled this is a no-op; eliminations then become
    /// permanent. A bounded stack drops its oldest frame when full, making
    /// that observation permanent instead.
    pub fn push_frame(&mut self, cell: usize, pattern: usize) {
        let capacity = match self.backtracking {
            Backtracking::Disabled => return,
            Backtracking::Bounded(depth) => Some(depth),
            Backtracking::Unbounded => None,
        };
        self.frames.push(Frame {
            chosen: (as_u32(cell), as_u32(pattern)),
            bans: Vec::new(),
        });
        if let Some(capacity) = capacity {
            if self.frames.len() > capacity {
                self.frames.remove(0);
            }
        }
    }

    /// Whether at least one observation can still be unwound
    pub fn can_backtrack(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Unwind the top frame, restoring the wave and support counts exactly
    ///
    /// Clears any pending contradiction and returns the observation the
    /// frame recorded, so the caller can ban it at the level above.
    pub fn pop_frame(&mut self) -> Option<(usize, usize)> {
        let frame = self.frames.pop()?;
        self.contradiction = false;
        self.contradiction_cell = None;
        for &(cell, pattern) in frame.bans.iter().rev() {
            self.unremove(cell as usize, pattern as usize);
        }
        Some((frame.chosen.0 as usize, frame.chosen.1 as usize))
    }

    fn unremove(&mut self, cell: usize, pattern: usize) {
        self.wave.restore(cell, pattern);
        let directions = self.model.directions().count();
        for direction in 0..directions {
            let Some(neighbor) = self.topology.try_move(cell, direction) else {
                continue;
            };
            let inverse = self.model.directions().inverse(direction);
            let count = self.model.compatible(pattern, direction).len();
            for i in 0..count {
                let Some(&q) = self.model.compatible(pattern, direction).get(i) else {
                    continue;
                };
                let index = self.support_index(neighbor, q as usize, inverse);
                if let Some(entry) = self.support.get_mut(index) {
                    *entry += 1;
                }
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn as_u32(value: usize) -> u32 {
    value as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AdjacencyBuilder;
    use crate::spatial::DirectionSet;
    use rand::SeedableRng;

    /// Two tiles that may only neighbor the other color, in every direction
    fn chess_model() -> PatternModel {
        let mut builder = AdjacencyBuilder::new(DirectionSet::cartesian2d());
        builder.add_adjacency(&[0u8], &[1u8], 1, 0, 0).unwrap();
        builder.add_adjacency(&[0u8], &[1u8], 0, 1, 0).unwrap();
        builder.set_uniform_frequency();
        builder.build().unwrap().patterns().clone()
    }

    #[test]
    fn test_single_ban_cascades_parity() {
        let mut rng = StdRng::seed_from_u64(1);
        let topology = GridTopology::plane(4, 4);
        let mut propagator =
            WavePropagator::new(chess_model(), topology, Backtracking::Unbounded, &mut rng)
                .unwrap();
        assert!(!propagator.is_contradicted());

        // Deciding one corner decides the whole board by parity
        propagator.push_frame(0, 0);
        propagator.ban(0, 1);
        propagator.propagate();
        assert!(!propagator.is_contradicted());

        let topology = propagator.topology().clone();
        for cell in 0..topology.cell_count() {
            let (x, y, _) = topology.coordinates_of(cell);
            let expected = (x + y) % 2;
            assert_eq!(propagator.wave().decided_pattern(cell), Some(expected));
        }
    }

    #[test]
    fn test_pop_frame_restores_bit_identity() {
        let mut rng = StdRng::seed_from_u64(2);
        let topology = GridTopology::plane(4, 4);
        let mut propagator =
            WavePropagator::new(chess_model(), topology, Backtracking::Unbounded, &mut rng)
                .unwrap();

        let bits = propagator.wave().bits().clone();
        let support = propagator.support.clone();

        propagator.push_frame(5, 0);
        propagator.ban(5, 1);
        propagator.propagate();
        assert_ne!(*propagator.wave().bits(), bits);

        assert_eq!(propagator.pop_frame(), Some((5, 0)));
        assert_eq!(*propagator.wave().bits(), bits);
        assert_eq!(propagator.support, support);
    }

    #[test]
    fn test_propagate_is_idempotent_on_fixed_wave() {
        let mut rng = StdRng::seed_from_u64(3);
        let topology = GridTopology::plane(3, 3);
        let mut propagator =
            WavePropagator::new(chess_model(), topology, Backtracking::Unbounded, &mut rng)
                .unwrap();

        let before = propagator.bans_performed();
        propagator.propagate();
        assert_eq!(propagator.bans_performed(), before);
    }

    #[test]
    fn test_zero_frequency_pattern_is_banned_at_init() {
        let mut builder = AdjacencyBuilder::new(DirectionSet::cartesian2d());
        builder.add_adjacency(&[0u8, 1], &[0, 1], 1, 0, 0).unwrap();
        builder.add_adjacency(&[0u8, 1], &[0, 1], 0, 1, 0).unwrap();
        builder.set_uniform_frequency();
        builder.set_frequency(&1u8, 0.0).unwrap();
        let model = builder.build().unwrap().patterns().clone();

        let mut rng = StdRng::seed_from_u64(4);
        let topology = GridTopology::plane(2, 2);
        let propagator =
            WavePropagator::new(model, topology, Backtracking::Disabled, &mut rng).unwrap();
        for cell in 0..4 {
            assert_eq!(propagator.wave().decided_pattern(cell), Some(0));
        }
    }
}
