//! End-to-end generation scenarios: collapse, parity, determinism, masks
//! and terminal contradictions

use bitvec::prelude::*;
use wavetiles::constraints::{CountComparison, CountConstraint, PathConstraint};
use wavetiles::model::{AdjacencyBuilder, TileModel};
use wavetiles::spatial::{DirectionSet, GridTopology};
use wavetiles::{Backtracking, GeneratorOptions, Resolution, TilePropagator};

/// Ten tiles, every pair adjacent in every direction of a volume grid
fn free_model_3d() -> TileModel<u8> {
    let tiles: Vec<u8> = (0..10).collect();
    let mut builder = AdjacencyBuilder::new(DirectionSet::cartesian3d());
    builder.add_adjacency(&tiles, &tiles, 1, 0, 0).unwrap();
    builder.add_adjacency(&tiles, &tiles, 0, 1, 0).unwrap();
    builder.add_adjacency(&tiles, &tiles, 0, 0, 1).unwrap();
    builder.set_uniform_frequency();
    builder.build().unwrap()
}

/// Two colors that may only neighbor each other, along every axis
fn chess_model_3d() -> TileModel<u8> {
    let mut builder = AdjacencyBuilder::new(DirectionSet::cartesian3d());
    builder.add_adjacency(&[1u8], &[2u8], 1, 0, 0).unwrap();
    builder.add_adjacency(&[1u8], &[2u8], 0, 1, 0).unwrap();
    builder.add_adjacency(&[1u8], &[2u8], 0, 0, 1).unwrap();
    builder.set_uniform_frequency();
    builder.build().unwrap()
}

fn chess_model_2d() -> TileModel<u8> {
    let mut builder = AdjacencyBuilder::new(DirectionSet::cartesian2d());
    builder.add_adjacency(&[1u8], &[2u8], 1, 0, 0).unwrap();
    builder.add_adjacency(&[1u8], &[2u8], 0, 1, 0).unwrap();
    builder.set_uniform_frequency();
    builder.build().unwrap()
}

#[test]
fn test_free_volume_decides_without_backtracking() {
    let mut propagator = TilePropagator::new(
        free_model_3d(),
        GridTopology::volume(10, 10, 10),
        GeneratorOptions {
            seed: 5,
            backtracking: Backtracking::Disabled,
            constraints: Vec::new(),
        },
    )
    .unwrap();

    assert_eq!(propagator.run().unwrap(), Resolution::Decided);
    assert_eq!(propagator.backtrack_count(), 0);

    let grid = propagator.to_array();
    assert_eq!(grid.iter().filter(|tile| tile.is_some()).count(), 1000);
}

#[test]
fn test_chess_volume_decides_to_parity_coloring() {
    let mut propagator = TilePropagator::new(
        chess_model_3d(),
        GridTopology::volume(10, 10, 10),
        GeneratorOptions {
            seed: 9,
            backtracking: Backtracking::Disabled,
            constraints: Vec::new(),
        },
    )
    .unwrap();

    assert_eq!(propagator.run().unwrap(), Resolution::Decided);

    let grid = propagator.to_array();
    let origin = grid.get((0, 0, 0)).cloned().flatten().unwrap();
    let other = if origin == 1 { 2 } else { 1 };
    for ((z, y, x), tile) in grid.indexed_iter() {
        let expected = if (x + y + z) % 2 == 0 { origin } else { other };
        assert_eq!(tile.clone().unwrap(), expected);
    }
}

#[test]
fn test_same_seed_reproduces_output_and_backtracks() {
    let run = |seed: u64| {
        let mut propagator = TilePropagator::new(
            chess_model_2d(),
            GridTopology::plane(8, 8),
            GeneratorOptions {
                seed,
                backtracking: Backtracking::Unbounded,
                constraints: Vec::new(),
            },
        )
        .unwrap();
        let status = propagator.run().unwrap();
        (
            status,
            propagator.to_array_with(&0, &99),
            propagator.backtrack_count(),
        )
    };

    assert_eq!(run(1234), run(1234));
    // A different seed is allowed to differ, but must also be stable
    assert_eq!(run(77), run(77));
}

#[test]
fn test_preselection_violating_parity_contradicts() {
    let mut propagator = TilePropagator::new(
        chess_model_2d(),
        GridTopology::plane(3, 1),
        GeneratorOptions {
            seed: 0,
            backtracking: Backtracking::Disabled,
            constraints: Vec::new(),
        },
    )
    .unwrap();

    // Adjacent same-color pins cannot both hold
    propagator.select_tile(0, 0, 0, &1).unwrap();
    propagator.select_tile(1, 0, 0, &1).unwrap();
    assert_eq!(propagator.status(), Resolution::Contradiction);

    // Terminal states are sticky
    assert_eq!(propagator.step().unwrap(), Resolution::Contradiction);
}

#[test]
fn test_odd_cycle_chess_is_unsatisfiable() {
    // A periodic width-3 strip is an odd cycle: no two-coloring exists, and
    // exhausting the backtrack stack must surface the contradiction
    let mut propagator = TilePropagator::new(
        chess_model_2d(),
        GridTopology::plane(3, 1).with_periodicity(true, false, false),
        GeneratorOptions {
            seed: 3,
            backtracking: Backtracking::Unbounded,
            constraints: Vec::new(),
        },
    )
    .unwrap();

    assert_eq!(propagator.run().unwrap(), Resolution::Contradiction);
    assert!(propagator.backtrack_count() > 0);
}

#[test]
fn test_masked_cells_stay_undecided_sentinels() {
    let mut mask = bitvec![1; 9];
    mask.set(4, false);
    let topology = GridTopology::plane(3, 3).with_mask(mask).unwrap();

    let mut propagator = TilePropagator::new(
        chess_model_2d(),
        topology,
        GeneratorOptions {
            seed: 21,
            backtracking: Backtracking::Disabled,
            constraints: Vec::new(),
        },
    )
    .unwrap();

    assert_eq!(propagator.run().unwrap(), Resolution::Decided);

    let grid = propagator.to_array_with(&0, &9);
    assert_eq!(grid.get((0, 1, 1)).copied(), Some(0));
    let decided = grid.iter().filter(|&&tile| tile == 1 || tile == 2).count();
    assert_eq!(decided, 8);

    assert_eq!(propagator.to_array().get((0, 1, 1)).cloned(), Some(None));
}

#[test]
fn test_select_and_ban_facade() {
    let mut propagator = TilePropagator::new(
        chess_model_2d(),
        GridTopology::plane(4, 4),
        GeneratorOptions {
            seed: 2,
            backtracking: Backtracking::Disabled,
            constraints: Vec::new(),
        },
    )
    .unwrap();

    let ones = propagator.model().tile_set(&[1]).unwrap();
    let (banned, selected) = propagator.banned_selected(0, 0, 0, &ones).unwrap();
    assert!(!banned && !selected);

    propagator.ban(0, 0, 0, &ones).unwrap();
    let (banned, selected) = propagator.banned_selected(0, 0, 0, &ones).unwrap();
    assert!(banned && !selected);

    // Banning color 1 at the corner decides the whole board by parity
    assert_eq!(propagator.status(), Resolution::Decided);
    assert_eq!(propagator.possible_tiles_at(0, 0, 0).unwrap(), vec![&2]);

    assert!(propagator.select(9, 0, 0, &ones).is_err());
}

/// Two tiles, every pair adjacent, for façade-driven constraint tests
fn open_model_2d() -> TileModel<u8> {
    let mut builder = AdjacencyBuilder::new(DirectionSet::cartesian2d());
    builder.add_adjacency(&[0u8, 1], &[0, 1], 1, 0, 0).unwrap();
    builder.add_adjacency(&[0u8, 1], &[0, 1], 0, 1, 0).unwrap();
    builder.set_uniform_frequency();
    builder.build().unwrap()
}

#[test]
fn test_facade_selects_trigger_constraint_forcing() {
    // Deciding cells purely through the façade must still run the
    // constraint pass on every fixed point: pinning both endpoints of a
    // three-cell strip leaves the middle cell as the only route, so the
    // path constraint has to force it without any step() call
    let mut propagator = TilePropagator::new(
        open_model_2d(),
        GridTopology::plane(3, 1),
        GeneratorOptions {
            seed: 0,
            backtracking: Backtracking::Disabled,
            constraints: vec![Box::new(
                PathConstraint::new(vec![1]).with_endpoints(vec![(0, 0, 0), (2, 0, 0)]),
            )],
        },
    )
    .unwrap();

    propagator.select_tile(0, 0, 0, &1).unwrap();
    propagator.select_tile(2, 0, 0, &1).unwrap();

    assert_eq!(propagator.status(), Resolution::Decided);
    assert_eq!(propagator.possible_tiles_at(1, 0, 0).unwrap(), vec![&1]);
}

#[test]
fn test_facade_selects_cannot_bypass_constraint_veto() {
    let mut propagator = TilePropagator::new(
        open_model_2d(),
        GridTopology::plane(3, 1),
        GeneratorOptions {
            seed: 0,
            backtracking: Backtracking::Disabled,
            constraints: vec![Box::new(
                PathConstraint::new(vec![1]).with_endpoints(vec![(0, 0, 0), (2, 0, 0)]),
            )],
        },
    )
    .unwrap();

    // An endpoint that can no longer hold a path tile strands the other
    // endpoint; the constraint must veto the façade decision rather than
    // let the run report success
    propagator.select_tile(0, 0, 0, &0).unwrap();
    assert_eq!(propagator.status(), Resolution::Contradiction);
    assert_eq!(propagator.step().unwrap(), Resolution::Contradiction);
}

#[test]
fn test_facade_selects_consult_count_constraint() {
    let mut propagator = TilePropagator::new(
        open_model_2d(),
        GridTopology::plane(2, 1),
        GeneratorOptions {
            seed: 0,
            backtracking: Backtracking::Disabled,
            constraints: vec![Box::new(CountConstraint::new(
                vec![1u8],
                1,
                CountComparison::AtMost,
            ))],
        },
    )
    .unwrap();

    // Meeting the bound through the façade must ban the set everywhere
    // else, deciding the grid with the bound already enforced
    propagator.select_tile(0, 0, 0, &1).unwrap();

    assert_eq!(propagator.status(), Resolution::Decided);
    assert_eq!(propagator.possible_tiles_at(1, 0, 0).unwrap(), vec![&0]);
}

#[test]
fn test_run_steps_reports_resource_limit_as_undecided() {
    let mut propagator = TilePropagator::new(
        free_model_3d(),
        GridTopology::volume(6, 6, 6),
        GeneratorOptions {
            seed: 8,
            backtracking: Backtracking::Disabled,
            constraints: Vec::new(),
        },
    )
    .unwrap();

    assert_eq!(propagator.run_steps(3).unwrap(), Resolution::Undecided);
    assert_eq!(propagator.run().unwrap(), Resolution::Decided);
}

#[test]
fn test_clear_resets_and_reproduces() {
    let mut propagator = TilePropagator::new(
        chess_model_2d(),
        GridTopology::plane(6, 6),
        GeneratorOptions {
            seed: 31,
            backtracking: Backtracking::Disabled,
            constraints: Vec::new(),
        },
    )
    .unwrap();

    assert_eq!(propagator.run().unwrap(), Resolution::Decided);
    let first = propagator.to_array_with(&0, &9);

    propagator.clear().unwrap();
    assert_eq!(propagator.status(), Resolution::Undecided);
    assert_eq!(propagator.run().unwrap(), Resolution::Decided);
    assert_eq!(propagator.to_array_with(&0, &9), first);

    // A different seed may change the outcome, but still terminates
    propagator.set_seed(32);
    propagator.clear().unwrap();
    assert_eq!(propagator.run().unwrap(), Resolution::Decided);
}

#[test]
fn test_incompatible_direction_sets_are_rejected() {
    let result = TilePropagator::new(
        chess_model_2d(),
        GridTopology::volume(4, 4, 4),
        GeneratorOptions::default(),
    );
    assert!(matches!(
        result,
        Err(wavetiles::GenerationError::IncompatibleDirections { expected: 4, actual: 6 })
    ));
}

#[test]
fn test_decided_output_respects_adjacency() {
    let mut propagator = TilePropagator::new(
        chess_model_2d(),
        GridTopology::plane(12, 12).with_periodicity(true, true, false),
        GeneratorOptions {
            seed: 55,
            backtracking: Backtracking::Unbounded,
            constraints: Vec::new(),
        },
    )
    .unwrap();
    assert_eq!(propagator.run().unwrap(), Resolution::Decided);

    let topology = propagator.topology().clone();
    let patterns = propagator.model().patterns().clone();
    for cell in topology.cells() {
        let (x, y, z) = topology.coordinates_of(cell);
        let tile = *propagator.possible_tiles_at(x, y, z).unwrap()[0];
        let pattern = propagator.model().pattern_of(&tile).unwrap();
        for direction in 0..topology.directions().count() {
            let Some(neighbor) = topology.try_move(cell, direction) else {
                continue;
            };
            let (nx, ny, nz) = topology.coordinates_of(neighbor);
            let neighbor_tile = *propagator.possible_tiles_at(nx, ny, nz).unwrap()[0];
            let neighbor_pattern = propagator.model().pattern_of(&neighbor_tile).unwrap();
            assert!(patterns
                .compatible(pattern, direction)
                .contains(&u32::try_from(neighbor_pattern).unwrap()));
        }
    }
}
