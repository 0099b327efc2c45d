//! Constraint propagation engine: wave state, support-counted propagation,
//! observation loop and backtracking

/// Tile-level propagator façade and observation loop
pub mod executor;
/// Pattern-level propagation with undo frames
pub mod propagation;
/// Entropy-driven cell and pattern choices
pub mod selection;
/// Possibility matrix and entropy aggregates
pub mod wave;

pub use executor::{GeneratorOptions, TilePropagator};
pub use propagation::WavePropagator;
pub use wave::Wave;

/// Outcome of a generation run or a constraint check
///
/// Terminal states are sticky: once a propagator reports `Decided` or
/// `Contradiction` it stays there until cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Search is still in progress
    Undecided,
    /// Every cell holds exactly one pattern and all constraints hold
    Decided,
    /// The search space is exhausted
    Contradiction,
}

/// How much observation history the propagator keeps for undoing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backtracking {
    /// Contradictions are immediately terminal
    Disabled,
    /// At most this many observations can be unwound
    Bounded(usize),
    /// The whole observation history can be unwound
    Unbounded,
}

impl Backtracking {
    /// Map the conventional integer encoding: negative is unbounded, zero
    /// disables backtracking, positive bounds the stack
    pub fn from_depth(depth: i64) -> Self {
        match depth {
            0 => Self::Disabled,
            d if d < 0 => Self::Unbounded,
            d => Self::Bounded(usize::try_from(d).unwrap_or(usize::MAX)),
        }
    }
}
