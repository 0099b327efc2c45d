//! Possibility matrix with cached entropy aggregates
//!
//! The wave stores one bit per `(cell, pattern)` pair plus per-cell running
//! sums that make Shannon-entropy comparison O(1) at selection time. A small
//! per-cell noise term, drawn once from the seeded generator at creation,
//! breaks entropy ties deterministically.

use bitvec::prelude::*;
use rand::rngs::StdRng;
use rand::Rng;

/// Scale of the additive tie-break noise; far below any real entropy gap
const NOISE_SCALE: f64 = 1e-6;

/// Mutable possibility state of a generation run
///
/// A cell is decided when one pattern remains, contradicted at zero. Only
/// the propagator mutates the wave, through [`Wave::erase`] and
/// [`Wave::restore`], which keep the aggregates exact in constant time.
#[derive(Clone, Debug)]
pub struct Wave {
    possible: BitVec,
    cell_count: usize,
    pattern_count: usize,
    remaining: Vec<u32>,
    sum_frequency: Vec<f64>,
    sum_frequency_log: Vec<f64>,
    noise: Vec<f64>,
    frequencies: Vec<f64>,
    plogp: Vec<f64>,
}

impl Wave {
    /// Create a wave with every pattern possible at every cell
    pub fn new(cell_count: usize, frequencies: &[f64], rng: &mut StdRng) -> Self {
        let pattern_count = frequencies.len();
        let plogp: Vec<f64> = frequencies
            .iter()
            .map(|&f| if f > 0.0 { f * f.ln() } else { 0.0 })
            .collect();

        let total_frequency: f64 = frequencies.iter().sum();
        let total_plogp: f64 = plogp.iter().sum();

        let noise = (0..cell_count)
            .map(|_| rng.random::<f64>() * NOISE_SCALE)
            .collect();

        Self {
            possible: bitvec![1; cell_count * pattern_count],
            cell_count,
            pattern_count,
            remaining: vec![u32::try_from(pattern_count).unwrap_or(u32::MAX); cell_count],
            sum_frequency: vec![total_frequency; cell_count],
            sum_frequency_log: vec![total_plogp; cell_count],
            noise,
            frequencies: frequencies.to_vec(),
            plogp,
        }
    }

    const fn bit_index(&self, cell: usize, pattern: usize) -> usize {
        cell * self.pattern_count + pattern
    }

    /// Number of cells
    pub const fn cell_count(&self) -> usize {
        self.cell_count
    }

    /// Number of patterns per cell
    pub const fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    /// Whether a pattern is still a candidate at a cell
    pub fn possible(&self, cell: usize, pattern: usize) -> bool {
        self.possible.get(self.bit_index(cell, pattern)).as_deref() == Some(&true)
    }

    /// Number of candidate patterns left at a cell
    pub fn remaining(&self, cell: usize) -> usize {
        self.remaining.get(cell).copied().unwrap_or(0) as usize
    }

    /// Remove a pattern from a cell, returning the new candidate count
    ///
    /// Callers must only erase patterns that are currently possible.
    pub fn erase(&mut self, cell: usize, pattern: usize) -> usize {
        let bit = self.bit_index(cell, pattern);
        self.possible.set(bit, false);
        if let Some(count) = self.remaining.get_mut(cell) {
            *count -= 1;
        }
        if let Some(sum) = self.sum_frequency.get_mut(cell) {
            *sum -= self.frequencies.get(pattern).copied().unwrap_or(0.0);
        }
        if let Some(sum) = self.sum_frequency_log.get_mut(cell) {
            *sum -= self.plogp.get(pattern).copied().unwrap_or(0.0);
        }
        self.remaining(cell)
    }

    /// Re-add a pattern to a cell, reversing an earlier erase exactly
    pub fn restore(&mut self, cell: usize, pattern: usize) {
        let bit = self.bit_index(cell, pattern);
        self.possible.set(bit, true);
        if let Some(count) = self.remaining.get_mut(cell) {
            *count += 1;
        }
        if let Some(sum) = self.sum_frequency.get_mut(cell) {
            *sum += self.frequencies.get(pattern).copied().unwrap_or(0.0);
        }
        if let Some(sum) = self.sum_frequency_log.get_mut(cell) {
            *sum += self.plogp.get(pattern).copied().unwrap_or(0.0);
        }
    }

    /// Shannon entropy of a cell, tie-break noise included
    ///
    /// `ln(sumF) - sumFlogF / sumF`, computed from the cached aggregates.
    /// Only meaningful for cells with at least two candidates.
    pub fn entropy(&self, cell: usize) -> f64 {
        let sum = self.sum_frequency.get(cell).copied().unwrap_or(0.0);
        let noise = self.noise.get(cell).copied().unwrap_or(0.0);
        if sum <= 0.0 {
            return noise;
        }
        let sum_log = self.sum_frequency_log.get(cell).copied().unwrap_or(0.0);
        sum.ln() - sum_log / sum + noise
    }

    /// The lone remaining pattern of a decided cell
    pub fn decided_pattern(&self, cell: usize) -> Option<usize> {
        if self.remaining(cell) != 1 {
            return None;
        }
        (0..self.pattern_count).find(|&pattern| self.possible(cell, pattern))
    }

    /// Raw possibility bits; used by tests asserting bit-identical undo
    pub fn bits(&self) -> &BitVec {
        &self.possible
    }
}
