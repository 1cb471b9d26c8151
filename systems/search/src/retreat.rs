use std::collections::BTreeSet;

use bomberland_core::{CostGrid, Grid, Position};

use crate::frontier::Frontier;

/// Winning destination of a [`RetreatSearch`].
#[derive(Clone, Debug, PartialEq)]
pub struct RetreatOutcome {
    /// Cells from the start to the destination, both inclusive. Never empty.
    pub path: Vec<Position>,
    /// Score of the destination; lower is better.
    pub score: f64,
    /// Number of frontier pops performed.
    pub expanded: usize,
}

impl RetreatOutcome {
    /// Cell the path ends on.
    #[must_use]
    pub fn destination(&self) -> Option<Position> {
        self.path.last().copied()
    }

    /// First cell to step onto, if the unit should move at all.
    #[must_use]
    pub fn first_step(&self) -> Option<Position> {
        self.path.get(1).copied()
    }
}

/// Budget-bounded least-cost search for the best nearby cell to stand on.
///
/// Each reached cell is scored as if the unit walked there and then stayed
/// until `horizon` steps have passed:
///
/// ```text
/// score = cost_so_far + stay + max(0, stay * (horizon - path_len - 1))
/// ```
///
/// where `stay` is the cell's own cost, raised by an exclusion penalty for
/// cells another unit already claimed. Equal scores prefer the longer path.
#[derive(Debug)]
pub struct RetreatSearch {
    budget: usize,
    frontier: Frontier,
    cost_so_far: Grid<Option<f64>>,
    came_from: Grid<Option<Position>>,
    path_len: Grid<u32>,
    reached: Vec<Position>,
}

impl RetreatSearch {
    /// Creates a search that pops at most `budget` frontier entries per run.
    #[must_use]
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            frontier: Frontier::default(),
            cost_so_far: Grid::filled(0, 0, None),
            came_from: Grid::filled(0, 0, None),
            path_len: Grid::filled(0, 0, 0),
            reached: Vec::new(),
        }
    }

    /// Maximum number of frontier pops per run.
    #[must_use]
    pub const fn budget(&self) -> usize {
        self.budget
    }

    /// Changes the pop budget for subsequent runs.
    pub fn set_budget(&mut self, budget: usize) {
        self.budget = budget;
    }

    /// Scores every cell reachable from `start` within the budget and returns
    /// the path to the best one.
    ///
    /// Cells are only expanded while their path is shorter than `horizon`
    /// steps. Cells in `excluded` stay
    /// eligible but pay `exclude_penalty` on top of their stay cost.
    pub fn run(
        &mut self,
        grid: &CostGrid,
        start: Position,
        horizon: u32,
        excluded: &BTreeSet<Position>,
        exclude_penalty: f64,
    ) -> RetreatOutcome {
        if !grid.contains(start) {
            return RetreatOutcome {
                path: vec![start],
                score: f64::INFINITY,
                expanded: 0,
            };
        }
        self.prepare(grid.width(), grid.height());

        self.cost_so_far[start] = Some(grid[start]);
        self.reached.push(start);
        self.frontier.push(0.0, start);

        let mut expanded = 0;
        while expanded < self.budget {
            let Some(current) = self.frontier.pop() else {
                break;
            };
            expanded += 1;
            let Some(current_cost) = self.cost_so_far[current] else {
                continue;
            };
            let new_cost = current_cost + grid[current];
            let len = self.path_len[current] + 1;

            for next in grid.passable_neighbors(current, None) {
                let improves = match self.cost_so_far[next] {
                    None => {
                        self.reached.push(next);
                        true
                    }
                    Some(known) => new_cost < known,
                };
                if !improves {
                    continue;
                }
                self.cost_so_far[next] = Some(new_cost);
                self.came_from[next] = Some(current);
                self.path_len[next] = len;
                if len < horizon {
                    self.frontier.push(new_cost, next);
                }
            }
        }

        let mut best = start;
        let mut best_score = f64::INFINITY;
        let mut first = true;
        for &cell in &self.reached {
            let Some(cost) = self.cost_so_far[cell] else {
                continue;
            };
            let mut stay = grid[cell];
            if excluded.contains(&cell) {
                stay += exclude_penalty;
            }
            let remaining = f64::from(horizon) - f64::from(self.path_len[cell]) - 1.0;
            let score = cost + stay + (stay * remaining).max(0.0);

            let longer = self.path_len[cell] > self.path_len[best];
            if first || score < best_score || (score == best_score && longer) {
                best = cell;
                best_score = score;
                first = false;
            }
        }

        RetreatOutcome {
            path: self.reconstruct(start, best),
            score: best_score,
            expanded,
        }
    }

    fn prepare(&mut self, width: u32, height: u32) {
        self.frontier.clear();
        self.reached.clear();
        if self.cost_so_far.width() != width || self.cost_so_far.height() != height {
            self.cost_so_far = Grid::filled(width, height, None);
            self.came_from = Grid::filled(width, height, None);
            self.path_len = Grid::filled(width, height, 0);
        } else {
            self.cost_so_far.fill(None);
            self.came_from.fill(None);
            self.path_len.fill(0);
        }
    }

    fn reconstruct(&self, start: Position, destination: Position) -> Vec<Position> {
        let mut path = vec![destination];
        let mut current = destination;
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
