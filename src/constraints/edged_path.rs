//! Connectivity constraint for tiles with directional exits
//!
//! Unlike the plain path constraint, connectivity here flows through tile
//! edges: a path entering a cell from a direction must be admitted by that
//! tile's exit set for the direction. The derived graph therefore holds one
//! central node per cell plus one half-edge node per direction; half-edge
//! nodes pair up across the shared cell border. Restricted to flat cartesian
//! grids.

use crate::algorithm::{Resolution, TilePropagator};
use crate::constraints::graph::{articulation_points, SimpleGraph};
use crate::constraints::Constraint;
use crate::io::error::{GenerationError, Result};
use crate::model::{TileId, TileSet};

/// Directions of a flat grid, the only shape this constraint accepts
const EDGE_DIRECTIONS: usize = 4;

/// Forces connectivity through matching directional exits
pub struct EdgedPathConstraint<T> {
    exits: Vec<(T, Vec<usize>)>,
    endpoints: Option<Vec<(usize, usize)>>,
    path_set: Option<TileSet>,
    by_exit: Vec<TileSet>,
    graph: Option<SimpleGraph>,
    endpoint_cells: Vec<usize>,
}

impl<T> EdgedPathConstraint<T> {
    /// Constrain the tiles of an exit map to form one edge-connected path
    ///
    /// Each entry names a tile and the directions its path edges extend
    /// into, using the constants of [`crate::spatial::direction`].
    pub const fn new(exits: Vec<(T, Vec<usize>)>) -> Self {
        Self {
            exits,
            endpoints: None,
            path_set: None,
            by_exit: Vec::new(),
            graph: None,
            endpoint_cells: Vec::new(),
        }
    }

    /// Only require the given cells to be edge-connected
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Vec<(usize, usize)>) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Node index of the half-edge of `cell` towards `direction`
    const fn edge_node(cell_count: usize, cell: usize, direction: usize) -> usize {
        cell_count + cell * EDGE_DIRECTIONS + direction
    }
}

impl<T: TileId> Constraint<T> for EdgedPathConstraint<T> {
    fn init(&mut self, propagator: &mut TilePropagator<T>) -> Result<Resolution> {
        let topology = propagator.topology();
        if topology.depth() != 1 || topology.directions().count() != EDGE_DIRECTIONS {
            return Err(GenerationError::UnsupportedTopology {
                constraint: "edged-path",
                reason: "exit tracking is only defined for flat cartesian grids".to_string(),
            });
        }
        for (tile, directions) in &self.exits {
            if directions.iter().any(|&d| d >= EDGE_DIRECTIONS) {
                return Err(GenerationError::UnsupportedTopology {
                    constraint: "edged-path",
                    reason: format!("tile {tile:?} names a direction outside the flat grid"),
                });
            }
        }

        let pattern_count = propagator.model().pattern_count();
        let mut path_set = TileSet::empty(pattern_count);
        let mut by_exit = vec![TileSet::empty(pattern_count); EDGE_DIRECTIONS];
        for (tile, directions) in &self.exits {
            let single = propagator.model().single(tile)?;
            path_set.union_with(&single);
            for &direction in directions {
                if let Some(set) = by_exit.get_mut(direction) {
                    set.union_with(&single);
                }
            }
        }
        self.path_set = Some(path_set);
        self.by_exit = by_exit;

        let cell_count = topology.cell_count();
        let mut graph = SimpleGraph::new(cell_count * (1 + EDGE_DIRECTIONS));
        for cell in topology.cells() {
            for direction in 0..EDGE_DIRECTIONS {
                let edge = Self::edge_node(cell_count, cell, direction);
                graph.add_edge(cell, edge);
                if let Some(neighbor) = topology.try_move(cell, direction) {
                    let inverse = topology.directions().inverse(direction);
                    graph.add_edge(edge, Self::edge_node(cell_count, neighbor, inverse));
                }
            }
        }
        self.graph = Some(graph);

        self.endpoint_cells.clear();
        if let Some(endpoints) = &self.endpoints {
            for &(x, y) in endpoints {
                let cell = propagator.topology().index_of(x, y, 0)?;
                if !propagator.topology().contains(cell) {
                    return Err(GenerationError::UnsupportedTopology {
                        constraint: "edged-path",
                        reason: format!("endpoint ({x}, {y}) is masked off"),
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
        let node_count = graph.node_count();
        let mut walkable = vec![false; node_count];
        let mut relevant = vec![false; node_count];

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
            for direction in 0..EDGE_DIRECTIONS {
                let Some(exit_set) = self.by_exit.get(direction) else {
                    continue;
                };
                let (exit_banned, _) = propagator.banned_selected_index(cell, exit_set);
                let node = Self::edge_node(cell_count, cell, direction);
                if let Some(flag) = walkable.get_mut(node) {
                    *flag = !exit_banned;
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

        for node in 0..node_count {
            if analysis.is_articulation.get(node).copied() != Some(true) {
                continue;
            }
            let (cell, forced_set) = if node < cell_count {
                (node, path_set)
            } else {
                let cell = (node - cell_count) / EDGE_DIRECTIONS;
                let direction = (node - cell_count) % EDGE_DIRECTIONS;
                let Some(set) = self.by_exit.get(direction) else {
                    continue;
                };
                (cell, set)
            };
            let (_, selected) = propagator.banned_selected_index(cell, forced_set);
            if selected {
                continue;
            }
            propagator.select_index(cell, forced_set);
            if propagator.is_contradicted() {
                return Ok(Resolution::Contradiction);
            }
        }
        Ok(Resolution::Undecided)
    }
}
