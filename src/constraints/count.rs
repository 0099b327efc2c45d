//! Cardinality bounds over a tile set
//!
//! Tracks how many cells are forced into a tile set (`yes`) and how many
//! could still join it (`maybe`). The bound turns into eliminations exactly
//! at the boundary: a met upper bound bans the set everywhere it is still
//! optional, a tight lower bound selects it everywhere it can still be met.

use crate::algorithm::{Resolution, TilePropagator};
use crate::constraints::Constraint;
use crate::io::error::Result;
use crate::model::{TileId, TileSet};

/// Which side of the count is bounded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountComparison {
    /// At most `count` cells may hold the set
    AtMost,
    /// At least `count` cells must hold the set
    AtLeast,
    /// Exactly `count` cells must hold the set
    Exactly,
}

/// Bounds the number of cells assigned to a tile set
pub struct CountConstraint<T> {
    tiles: Vec<T>,
    count: usize,
    comparison: CountComparison,
    eager: bool,
    set: Option<TileSet>,
}

impl<T> CountConstraint<T> {
    /// Bound the cells holding any of `tiles` by `count`
    pub const fn new(tiles: Vec<T>, count: usize, comparison: CountComparison) -> Self {
        Self {
            tiles,
            count,
            comparison,
            eager: false,
            set: None,
        }
    }

    /// Force exactness as soon as the bound becomes tight, even for
    /// [`CountComparison::AtMost`]
    #[must_use]
    pub const fn eager(mut self) -> Self {
        self.eager = true;
        self
    }
}

impl<T: TileId> Constraint<T> for CountConstraint<T> {
    fn init(&mut self, propagator: &mut TilePropagator<T>) -> Result<Resolution> {
        self.set = Some(propagator.model().tile_set(&self.tiles)?);
        Ok(Resolution::Undecided)
    }

    fn check(&mut self, propagator: &mut TilePropagator<T>) -> Result<Resolution> {
        let Some(set) = &self.set else {
            return Ok(Resolution::Undecided);
        };

        let mut yes = 0usize;
        let mut maybes = Vec::new();
        for cell in propagator.topology().cells() {
            let (banned, selected) = propagator.banned_selected_index(cell, set);
            if selected && !banned {
                yes += 1;
            } else if !banned {
                maybes.push(cell);
            }
        }
        let maybe = maybes.len();

        let bounds_above = matches!(
            self.comparison,
            CountComparison::AtMost | CountComparison::Exactly
        );
        let bounds_below = matches!(
            self.comparison,
            CountComparison::AtLeast | CountComparison::Exactly
        );

        if bounds_above {
            if yes > self.count {
                return Ok(Resolution::Contradiction);
            }
            if yes == self.count {
                for &cell in &maybes {
                    propagator.ban_index(cell, set);
                    if propagator.is_contradicted() {
                        return Ok(Resolution::Contradiction);
                    }
                }
                return Ok(Resolution::Undecided);
            }
        }

        if bounds_below && yes + maybe < self.count {
            return Ok(Resolution::Contradiction);
        }

        let must_fill = (bounds_below || (self.eager && bounds_above)) && yes + maybe == self.count;
        if must_fill && maybe > 0 {
            for &cell in &maybes {
                propagator.select_index(cell, set);
                if propagator.is_contradicted() {
                    return Ok(Resolution::Contradiction);
                }
            }
        }
        Ok(Resolution::Undecided)
    }
}
