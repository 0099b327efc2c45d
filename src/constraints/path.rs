//! Connectivity constraint over a set of path tiles
//!
//! Keeps the cells that can still hold a path tile in one connected piece:
//! whenever a walkable cell is the only route between two cells that must
//! carry the path, that cell is forced into the path set. Endpoints may be
//! given explicitly; otherwise every cell already forced to a path tile
//! acts as an endpoint.

use crate::algorithm::{Resolution, TilePropagator};
use crate::constraints::graph::{articulation_points, SimpleGraph};
use crate::constraints::Constraint;
use crate::io::error::{GenerationError, Result};
use crate::model::{TileId, TileSet};

/// Forces global connectivity of the cells assigned to a tile set
pub struct PathConstraint<T> {
    tiles: Vec<T>,
    endpoints: Option<Vec<(usize, usize, usize)>>,
    path_set: Option<TileSet>,
    graph: Option<SimpleGraph>,
    endpoint_cells: Vec<usize>,
}

impl<T> PathConstraint<T> {
    /// Constrain the given tiles to form one connected region
    pub const fn new(tiles: Vec<T>) -> Self {
        Self {
            tiles,
            endpoints: None,
            path_set: None,
            graph: None,
            endpoint_cells: Vec::new(),
        }
    }

    /// Only require the given cells to be connected through path tiles
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Vec<(usize, usize, usize)>) -> Self {
        self.endpoints = Some(endpoints);
        self
    }
}

impl<T: TileId> Constraint<T> for PathConstraint<T> {
    fn init(&mut self, propagator: &mut TilePropagator<T>) -> Result<Resolution> {
        self.path_set = Some(propagator.model().tile_set(&self.tiles)?);
        self.graph = Some(SimpleGraph::from_topology(propagator.topology()));

        self.endpoint_cells.clear();
        if let Some(endpoints) = &self.endpoints {
            for &(x, y, z) in endpoints {
                let cell = propagator.topology().index_of(x, y, z)?;
                if !propagator.topology().contains(cell) {
                    return Err(GenerationError::UnsupportedTopology {
                        constraint: "path",
                        reason: format!("endpoint ({x}, {y}, {z}) is masked off"),
                    });
                }
                self.endpoint_cells.push(cell);
            }
        }
        Ok(Resolution::Undecided)
    }

    fn check(&mut self, propagator: &mut TilePropagator<T>) -> Result<Resolution> {
        let (Some(path_set), Some(graph)) = (&self.path_set, &self.graph) else {
            return Ok(Resolution::Undecided);
        };

        let cell_count = propagator.topology().cell_count();
        let mut walkable = vec![false; cell_count];
        let mut relevant = vec![false; cell_count];
        for cell in 0..cell_count {
            if !propagator.topology().contains(cell) {
                continue;
            }
            let (banned, selected) = propagator.banned_selected_index(cell, path_set);
            if let Some(flag) = walkable.get_mut(cell) {
                *flag = !banned;
            }
            if self.endpoints.is_none() {
                if let Some(flag) = relevant.get_mut(cell) {
                    *flag = selected && !banned;
                }
            }
        }
        for &cell in &self.endpoint_cells {
            if let Some(flag) = relevant.get_mut(cell) {
                *flag = true;
            }
        }

        if !relevant.iter().any(|&flag| flag) {
            return Ok(Resolution::Undecided);
        }

        let analysis = articulation_points(graph, &walkable, &relevant);
        if !analysis.connected {
            return Ok(Resolution::Contradiction);
        }

        for cell in 0..cell_count {
            if analysis.is_articulation.get(cell).copied() != Some(true) {
                continue;
            }
            let (_, selected) = propagator.banned_selected_index(cell, path_set);
            if selected {
                continue;
            }
            propagator.select_index(cell, path_set);
            if propagator.is_contradicted() {
                return Ok(Resolution::Contradiction);
            }
        }
        Ok(Resolution::Undecided)
    }
}
