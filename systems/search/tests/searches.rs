use std::collections::BTreeSet;

use bomberland_core::{CostGrid, Grid, Position};
use bomberland_system_search::{PathSearch, RetreatSearch};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const INF: f64 = f64::INFINITY;

fn grid(columns: Vec<Vec<f64>>) -> CostGrid {
    Grid::from_columns(columns).expect("rectangular fixture")
}

fn cells(points: &[(u32, u32)]) -> Vec<Position> {
    points.iter().map(|&(x, y)| Position::new(x, y)).collect()
}

fn retreat(grid: &CostGrid, horizon: u32) -> (Vec<Position>, f64) {
    let outcome =
        RetreatSearch::new(20).run(grid, Position::new(0, 0), horizon, &BTreeSet::new(), 10.0);
    assert!(outcome.expanded <= 20);
    (outcome.path, outcome.score)
}

#[test]
fn retreat_walks_to_the_cheap_corner() {
    let ones = grid(vec![
        vec![1.0, 1.0, 1.0, 1.0],
        vec![1.0, 1.0, 1.0, 1.0],
        vec![1.0, 1.0, 1.0, 1.0],
        vec![1.0, 1.0, 1.0, 0.0],
    ]);
    let (path, score) = retreat(&ones, 10);

    assert_eq!(
        path,
        cells(&[(0, 0), (0, 1), (0, 2), (0, 3), (1, 3), (2, 3), (3, 3)])
    );
    assert_eq!(path.len(), 7);
    assert_eq!(score, 7.0);
}

#[test]
fn retreat_prefers_the_longest_of_equal_paths() {
    let (path, score) = retreat(&Grid::filled(4, 4, 0.0), 10);

    assert_eq!(path.len(), 7);
    assert_eq!(path.last(), Some(&Position::new(3, 3)));
    assert_eq!(score, 0.0);
}

#[test]
fn retreat_never_crosses_impassable_cells() {
    let walls = grid(vec![
        vec![0.0, INF, INF, INF],
        vec![0.0, 0.0, 0.0, INF],
        vec![INF, INF, 0.0, INF],
        vec![INF, INF, INF, INF],
    ]);
    let (path, _) = retreat(&walls, 10);

    assert_eq!(path, cells(&[(0, 0), (1, 0), (1, 1), (1, 2), (2, 2)]));
}

#[test]
fn short_horizon_avoids_the_costly_block() {
    let block = grid(vec![
        vec![1.0, 1.0, 1.0, 1.0],
        vec![1.0, 1.0, 1.0, 1.0],
        vec![1.0, 1.0, 10.0, 10.0],
        vec![1.0, 1.0, 10.0, 0.0],
    ]);

    let (short, score) = retreat(&block, 10);
    assert_eq!(short, cells(&[(0, 0), (0, 1), (0, 2), (0, 3), (1, 3)]));
    assert_eq!(score, 11.0);
    for avoided in cells(&[(3, 3), (3, 2), (2, 3), (2, 2)]) {
        assert!(!short.contains(&avoided));
    }

    let (long, score) = retreat(&block, 20);
    assert_eq!(long.last(), Some(&Position::new(3, 3)));
    assert_eq!(long.len(), 7);
    assert_eq!(score, 16.0);
}

#[test]
fn dwell_cost_outweighs_an_expensive_approach() {
    let reward = grid(vec![
        vec![10.0, 10.0, 10.0, 10.0],
        vec![10.0, 10.0, 10.0, 10.0],
        vec![10.0, 10.0, 20.0, 20.0],
        vec![10.0, 10.0, 20.0, 1.0],
    ]);
    let (path, score) = retreat(&reward, 10);

    assert_eq!(path.last(), Some(&Position::new(3, 3)));
    assert_eq!(path.len(), 7);
    assert_eq!(score, 84.0);
}

#[test]
fn retreat_budget_caps_expansion_on_large_boards() {
    let open = Grid::filled(30, 30, 1.0);
    for budget in [25, 50] {
        let outcome = RetreatSearch::new(budget).run(
            &open,
            Position::new(15, 15),
            30,
            &BTreeSet::new(),
            10.0,
        );
        assert_eq!(outcome.expanded, budget);
    }
}

#[test]
fn retreat_paths_stay_valid_on_random_boards() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xbadc_0ffe);
    let mut search = RetreatSearch::new(0);
    for _ in 0..300 {
        let (width, height) = (rng.gen_range(1..20), rng.gen_range(1..20));
        let mut board = Grid::filled(width, height, 0.0);
        board.for_each_mut(|cell| {
            *cell = if rng.gen_bool(0.2) {
                INF
            } else {
                f64::from(rng.gen_range(0..30_u32))
            };
        });
        let start = Position::new(rng.gen_range(0..width), rng.gen_range(0..height));
        board[start] = 1.0;
        let budget = rng.gen_range(0..80);
        let horizon = rng.gen_range(1..40);
        search.set_budget(budget);

        let outcome = search.run(&board, start, horizon, &BTreeSet::new(), 10.0);

        assert!(outcome.expanded <= budget);
        assert_eq!(outcome.path.first(), Some(&start));
        for pair in outcome.path.windows(2) {
            assert_eq!(pair[0].manhattan_distance(pair[1]), 1);
            assert!(board[pair[1]].is_finite());
        }
    }
}

#[test]
fn path_routes_through_the_only_gap() {
    let mut board = Grid::filled(5, 5, 1.0);
    for y in [0, 1, 2, 4] {
        board[Position::new(2, y)] = INF;
    }
    let outcome = PathSearch::new().run(&board, Position::new(0, 0), Position::new(4, 0));

    assert!(outcome.path.contains(&Position::new(2, 3)));
    assert_eq!(outcome.path.len(), 11);
    assert_eq!(outcome.cost, 11.0);
    let traversed: f64 = outcome.path.iter().map(|&cell| board[cell]).sum();
    assert_eq!(outcome.cost, traversed);
}

#[test]
fn path_cost_counts_the_start_cell() {
    let ones = grid(vec![
        vec![1.0, 1.0, 1.0, 1.0],
        vec![1.0, 1.0, 1.0, 1.0],
        vec![1.0, 1.0, 1.0, 1.0],
        vec![1.0, 1.0, 1.0, 0.0],
    ]);
    let outcome = PathSearch::new().run(&ones, Position::new(0, 0), Position::new(3, 3));

    assert_eq!(
        outcome.path,
        cells(&[(0, 0), (0, 1), (0, 2), (0, 3), (1, 3), (2, 3), (3, 3)])
    );
    assert_eq!(outcome.cost, 6.0);
}

#[test]
fn unreachable_goals_report_infinite_cost() {
    let walls = grid(vec![
        vec![0.0, INF, INF, INF],
        vec![0.0, 0.0, 0.0, INF],
        vec![INF, INF, 0.0, INF],
        vec![INF, INF, INF, INF],
    ]);
    let mut search = PathSearch::new();

    let sealed = search.run(&walls, Position::new(0, 0), Position::new(3, 3));
    assert!(sealed.path.is_empty());
    assert_eq!(sealed.cost, INF);

    let blocked_goal = search.run(&walls, Position::new(0, 0), Position::new(0, 1));
    assert_eq!(blocked_goal.path, cells(&[(0, 0), (0, 1)]));
    assert!(!blocked_goal.is_reachable());
}

/// Plain Dijkstra over the same cost model, start cell included.
fn reference_cost(board: &CostGrid, start: Position, goal: Position) -> f64 {
    let mut best = Grid::filled(board.width(), board.height(), INF);
    let mut done = Grid::filled(board.width(), board.height(), false);
    best[start] = board[start];
    loop {
        let next = best
            .iter()
            .filter(|(cell, cost)| !done[*cell] && cost.is_finite())
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(cell, &cost)| (cell, cost));
        let Some((cell, cost)) = next else {
            return best[goal];
        };
        if cell == goal {
            return cost;
        }
        done[cell] = true;
        for neighbor in board.passable_neighbors(cell, None) {
            let candidate = cost + board[neighbor];
            if candidate < best[neighbor] {
                best[neighbor] = candidate;
            }
        }
    }
}

#[test]
fn path_matches_dijkstra_on_random_boards() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut search = PathSearch::new();
    for _ in 0..200 {
        let (width, height) = (rng.gen_range(1..12), rng.gen_range(1..12));
        let mut board = Grid::filled(width, height, 1.0);
        board.for_each_mut(|cell| {
            *cell = if rng.gen_bool(0.25) {
                INF
            } else {
                f64::from(rng.gen_range(1..6_u32))
            };
        });
        let start = Position::new(rng.gen_range(0..width), rng.gen_range(0..height));
        let goal = Position::new(rng.gen_range(0..width), rng.gen_range(0..height));
        board[start] = 1.0;
        board[goal] = 1.0;

        let outcome = search.run(&board, start, goal);
        let expected = reference_cost(&board, start, goal);
        assert_eq!(outcome.cost, expected, "{start:?} -> {goal:?}");
        if outcome.is_reachable() {
            let traversed: f64 = outcome.path.iter().map(|&cell| board[cell]).sum();
            assert_eq!(traversed, outcome.cost);
            assert_eq!(outcome.path.first(), Some(&start));
            assert_eq!(outcome.path.last(), Some(&goal));
        } else {
            assert!(outcome.path.is_empty());
        }
    }
}
