//! Observation choices: which cell to collapse, and to which pattern
//!
//! Cell choice scans for the lowest-entropy undecided cell; the per-cell
//! noise baked into the entropy makes ties deterministic for a given seed.
//! Pattern choice is a cumulative-weight walk over the cell's remaining
//! candidates.

use rand::rngs::StdRng;
use rand::Rng;

use crate::algorithm::wave::Wave;
use crate::spatial::GridTopology;

/// Find the undecided unmasked cell with minimum entropy
///
/// Returns `None` when every unmasked cell is decided (or contradicted,
/// which the caller detects separately).
pub fn lowest_entropy_cell(wave: &Wave, topology: &GridTopology) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for cell in topology.cells() {
        if wave.remaining(cell) < 2 {
            continue;
        }
        let entropy = wave.entropy(cell);
        match best {
            Some((_, lowest)) if lowest <= entropy => {}
            _ => best = Some((cell, entropy)),
        }
    }
    best.map(|(cell, _)| cell)
}

/// Pick one remaining pattern at a cell, weighted by frequency
///
/// Walks the cumulative distribution over the possible patterns. Falls back
/// to the first possible pattern if the weights ever sum to zero, which the
/// initialization pass rules out for reachable states.
pub fn weighted_pattern_choice(
    wave: &Wave,
    frequencies: &[f64],
    cell: usize,
    rng: &mut StdRng,
) -> Option<usize> {
    let total: f64 = (0..wave.pattern_count())
        .filter(|&pattern| wave.possible(cell, pattern))
        .map(|pattern| frequencies.get(pattern).copied().unwrap_or(0.0))
        .sum();

    let first_possible = (0..wave.pattern_count()).find(|&pattern| wave.possible(cell, pattern));
    if total <= 0.0 {
        return first_possible;
    }

    let mut remaining = rng.random::<f64>() * total;
    for pattern in 0..wave.pattern_count() {
        if !wave.possible(cell, pattern) {
            continue;
        }
        remaining -= frequencies.get(pattern).copied().unwrap_or(0.0);
        if remaining <= 0.0 {
            return Some(pattern);
        }
    }
    first_possible
}
