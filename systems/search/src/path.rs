use bomberland_core::{CostGrid, Grid, Position};

use crate::frontier::Frontier;

/// Result of a single-pair search.
#[derive(Clone, Debug, PartialEq)]
pub struct PathOutcome {
    /// Cells from start to goal, both inclusive. Empty when the goal is
    /// unreachable.
    pub path: Vec<Position>,
    /// Sum of the costs of every cell on the path, start included.
    /// `f64::INFINITY` when the goal is unreachable.
    pub cost: f64,
}

impl PathOutcome {
    fn unreachable() -> Self {
        Self {
            path: Vec::new(),
            cost: f64::INFINITY,
        }
    }

    /// Reports whether the goal was reached at finite cost.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.cost.is_finite()
    }

    /// First cell to step onto, if the path leaves the start.
    #[must_use]
    pub fn first_step(&self) -> Option<Position> {
        self.path.get(1).copied()
    }
}

/// A* search with a Manhattan heuristic.
///
/// The goal cell may be entered even when its stored cost is infinite, in
/// which case the path is returned with an infinite cost.
#[derive(Debug)]
pub struct PathSearch {
    frontier: Frontier,
    cost_so_far: Grid<Option<f64>>,
    came_from: Grid<Option<Position>>,
}

impl PathSearch {
    /// Creates a search with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frontier: Frontier::default(),
            cost_so_far: Grid::filled(0, 0, None),
            came_from: Grid::filled(0, 0, None),
        }
    }

    /// Finds the cheapest path from `start` to `goal` over `grid`.
    pub fn run(&mut self, grid: &CostGrid, start: Position, goal: Position) -> PathOutcome {
        if !grid.contains(start) || !grid.contains(goal) {
            return PathOutcome::unreachable();
        }
        self.prepare(grid.width(), grid.height());

        self.cost_so_far[start] = Some(grid[start]);
        self.frontier.push(0.0, start);

        while let Some(current) = self.frontier.pop() {
            if current == goal {
                break;
            }
            let Some(current_cost) = self.cost_so_far[current] else {
                continue;
            };
            for next in grid.passable_neighbors(current, Some(goal)) {
                let new_cost = current_cost + grid[next];
                let improves = self.cost_so_far[next].map_or(true, |known| new_cost < known);
                if improves {
                    self.cost_so_far[next] = Some(new_cost);
                    self.came_from[next] = Some(current);
                    let priority = new_cost + f64::from(next.manhattan_distance(goal));
                    self.frontier.push(priority, next);
                }
            }
        }

        let Some(cost) = self.cost_so_far[goal] else {
            return PathOutcome::unreachable();
        };
        PathOutcome {
            path: self.reconstruct(start, goal),
            cost,
        }
    }

    fn prepare(&mut self, width: u32, height: u32) {
        self.frontier.clear();
        if self.cost_so_far.width() != width || self.cost_so_far.height() != height {
            self.cost_so_far = Grid::filled(width, height, None);
            self.came_from = Grid::filled(width, height, None);
        } else {
            self.cost_so_far.fill(None);
            self.came_from.fill(None);
        }
    }

    fn reconstruct(&self, start: Position, goal: Position) -> Vec<Position> {
        let mut path = vec![goal];
        let mut current = goal;
        while current != start && path.len() <= self.came_from.len() {
            match self.came_from[current] {
                Some(previous) => {
                    path.push(previous);
                    current = previous;
                }
                None => break,
            }
        }
        path.reverse();
        path
    }
}

impl Default for PathSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(columns: Vec<Vec<f64>>) -> CostGrid {
        Grid::from_columns(columns).expect("rectangular fixture")
    }

    #[test]
    fn start_equal_to_goal_costs_the_start_cell() {
        let grid = grid(vec![vec![3.0, 1.0], vec![1.0, 1.0]]);
        let outcome = PathSearch::new().run(&grid, Position::new(0, 0), Position::new(0, 0));

        assert_eq!(outcome.path, vec![Position::new(0, 0)]);
        assert_eq!(outcome.cost, 3.0);
        assert_eq!(outcome.first_step(), None);
    }

    #[test]
    fn out_of_bounds_endpoints_are_unreachable() {
        let grid = grid(vec![vec![1.0; 3]; 3]);
        let outcome = PathSearch::new().run(&grid, Position::new(0, 0), Position::new(3, 0));

        assert!(outcome.path.is_empty());
        assert!(!outcome.is_reachable());
    }

    #[test]
    fn scratch_buffers_follow_the_board_size() {
        let mut search = PathSearch::new();
        let small = grid(vec![vec![1.0; 2]; 2]);
        let large = grid(vec![vec![1.0; 6]; 6]);

        let first = search.run(&small, Position::new(0, 0), Position::new(1, 1));
        let second = search.run(&large, Position::new(0, 0), Position::new(5, 5));
        let again = search.run(&small, Position::new(0, 0), Position::new(1, 1));

        assert_eq!(first.cost, 3.0);
        assert_eq!(second.cost, 11.0);
        assert_eq!(again, first);
    }
}
