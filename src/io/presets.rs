//! Built-in demonstration models
//!
//! Small self-contained models exercising the engine end to end: a parity
//! coloring, an edge-matched pipe network, a connected cave carving and a
//! fully unconstrained filler. The presets double as fixtures for the
//! integration tests.

use crate::algorithm::{Backtracking, GeneratorOptions, Resolution, TilePropagator};
use crate::constraints::{Constraint, EdgedPathConstraint, PathConstraint};
use crate::io::error::Result;
use crate::model::{AdjacencyBuilder, TileModel};
use crate::spatial::direction::{X_MINUS, X_PLUS, Y_MINUS, Y_PLUS};
use crate::spatial::{DirectionSet, GridTopology};

/// Which demonstration model to build
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Preset {
    /// Two colors that never touch themselves
    Chess,
    /// Box-drawing pipes whose edges must pair up, kept connected
    Pipes,
    /// Walls and floors with all floors connected
    Caves,
    /// Ten glyphs with no constraints at all
    Free,
}

/// Exit directions of each box-drawing pipe glyph
///
/// Y grows downward, so `╚` (up-right) exits towards `Y_MINUS` and
/// `X_PLUS`. The blank tile carries no edges and is not part of the map.
pub const PIPE_EXITS: &[(char, &[usize])] = &[
    ('═', &[X_MINUS, X_PLUS]),
    ('║', &[Y_MINUS, Y_PLUS]),
    ('╚', &[Y_MINUS, X_PLUS]),
    ('╔', &[Y_PLUS, X_PLUS]),
    ('╗', &[Y_PLUS, X_MINUS]),
    ('╝', &[Y_MINUS, X_MINUS]),
    ('╠', &[Y_MINUS, Y_PLUS, X_PLUS]),
    ('╣', &[Y_MINUS, Y_PLUS, X_MINUS]),
    ('╦', &[X_MINUS, X_PLUS, Y_PLUS]),
    ('╩', &[X_MINUS, X_PLUS, Y_MINUS]),
];

/// Blank filler tile used by the pipe and cave presets
pub const BLANK: char = ' ';

fn chess_model() -> Result<TileModel<char>> {
    let mut builder = AdjacencyBuilder::new(DirectionSet::cartesian2d());
    builder.add_adjacency(&['#'], &['.'], 1, 0, 0)?;
    builder.add_adjacency(&['#'], &['.'], 0, 1, 0)?;
    builder.set_uniform_frequency();
    builder.build()
}

/// Exit set of a glyph, empty for the blank tile
fn pipe_exits(tile: char) -> &'static [usize] {
    PIPE_EXITS
        .iter()
        .find(|&&(glyph, _)| glyph == tile)
        .map_or(&[], |&(_, exits)| exits)
}

fn pipes_model() -> Result<TileModel<char>> {
    let mut tiles: Vec<char> = PIPE_EXITS.iter().map(|&(glyph, _)| glyph).collect();
    tiles.push(BLANK);

    let directions = DirectionSet::cartesian2d();
    let mut builder = AdjacencyBuilder::new(directions);
    for &a in &tiles {
        for &b in &tiles {
            // Tiles may meet when the shared border carries an edge on both
            // sides or on neither
            for direction in [X_PLUS, Y_PLUS] {
                let inverse = directions.inverse(direction);
                if pipe_exits(a).contains(&direction) == pipe_exits(b).contains(&inverse) {
                    let [dx, dy, dz] = directions.vector(direction);
                    builder.add_adjacency(&[a], &[b], dx, dy, dz)?;
                }
            }
        }
    }
    builder.set_uniform_frequency();
    builder.multiply_frequency(&BLANK, 4.0)?;
    builder.build()
}

fn caves_model() -> Result<TileModel<char>> {
    let tiles = ['#', '.'];
    let mut builder = AdjacencyBuilder::new(DirectionSet::cartesian2d());
    builder.add_adjacency(&tiles, &tiles, 1, 0, 0)?;
    builder.add_adjacency(&tiles, &tiles, 0, 1, 0)?;
    builder.set_frequency(&'#', 1.4)?;
    builder.set_frequency(&'.', 1.0)?;
    builder.build()
}

fn free_model() -> Result<TileModel<char>> {
    let tiles: Vec<char> = ('0'..='9').collect();
    let mut builder = AdjacencyBuilder::new(DirectionSet::cartesian2d());
    builder.add_adjacency(&tiles, &tiles, 1, 0, 0)?;
    builder.add_adjacency(&tiles, &tiles, 0, 1, 0)?;
    builder.set_uniform_frequency();
    builder.build()
}

/// Exit map of the pipe preset in the form the edged-path constraint takes
pub fn pipe_exit_map() -> Vec<(char, Vec<usize>)> {
    PIPE_EXITS
        .iter()
        .map(|&(glyph, exits)| (glyph, exits.to_vec()))
        .collect()
}

/// Build a ready-to-run propagator for a preset
///
/// # Errors
///
/// Propagates model-building and constraint-initialization failures; the
/// presets themselves are well-formed, so errors indicate impossible
/// dimensions or seeds are never at fault.
pub fn build_propagator(
    preset: Preset,
    width: usize,
    height: usize,
    seed: u64,
    backtracking: Backtracking,
) -> Result<TilePropagator<char>> {
    let topology = GridTopology::plane(width, height);
    let (model, constraints): (TileModel<char>, Vec<Box<dyn Constraint<char>>>) = match preset {
        Preset::Chess => (chess_model()?, Vec::new()),
        Preset::Pipes => (
            pipes_model()?,
            vec![Box::new(EdgedPathConstraint::new(pipe_exit_map()))],
        ),
        Preset::Caves => (
            caves_model()?,
            vec![Box::new(PathConstraint::new(vec!['.']))],
        ),
        Preset::Free => (free_model()?, Vec::new()),
    };

    TilePropagator::new(
        model,
        topology,
        GeneratorOptions {
            seed,
            backtracking,
            constraints,
        },
    )
}

/// Outcome summary used by the CLI after a run
pub fn describe(status: Resolution) -> &'static str {
    match status {
        Resolution::Decided => "decided",
        Resolution::Undecided => "undecided (step limit reached)",
        Resolution::Contradiction => "contradiction",
    }
}
