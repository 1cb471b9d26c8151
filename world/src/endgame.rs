//! Spiral priority field modelling the shrinking safe zone.

use bomberland_core::{tuning::EndgameTuning, CostGrid, Grid, Position};

/// Static center-favouring priority field for one board size.
///
/// A spiral walk starts at the center heading east, turns left whenever the
/// cell on its left is unvisited and otherwise continues straight until it
/// leaves the board. Each visited cell, and its point mirror, receives a
/// "steps remaining" level that starts at `width * height / 2` and counts
/// down, so higher levels sit closer to the center.
#[derive(Clone, Debug)]
pub struct EndgameFireSimulator {
    spiral: Grid<u32>,
}

impl EndgameFireSimulator {
    /// Walks the spiral for a `width` x `height` board.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let mut spiral = Grid::filled(width, height, 0_u32);
        let mut visited = Grid::filled(width, height, false);
        if spiral.is_empty() {
            return Self { spiral };
        }

        let mut steps =
            u32::try_from(u64::from(width) * u64::from(height) / 2).unwrap_or(u32::MAX);
        let mut current = Position::new(width / 2, height / 2);
        let mut heading = (1_i64, 0_i64);

        loop {
            let mirror = Position::new(width - 1 - current.x(), height - 1 - current.y());
            spiral[current] = steps;
            spiral[mirror] = steps;
            visited[current] = true;
            visited[mirror] = true;

            let left = turn_left(heading);
            match current.offset(left.0, left.1, width, height) {
                Some(next) if !visited[next] => {
                    current = next;
                    heading = left;
                }
                _ => match current.offset(heading.0, heading.1, width, height) {
                    Some(next) => current = next,
                    None => break,
                },
            }
            steps = steps.saturating_sub(1);
        }

        Self { spiral }
    }

    /// Board width the field was built for.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.spiral.width()
    }

    /// Board height the field was built for.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.spiral.height()
    }

    /// Priority level of `position`; `0` outside the board.
    #[must_use]
    pub fn level(&self, position: Position) -> u32 {
        self.spiral.get(position).copied().unwrap_or(0)
    }

    /// The raw spiral levels.
    #[must_use]
    pub fn spiral(&self) -> &Grid<u32> {
        &self.spiral
    }

    /// Per-cell danger for the current number of permanent fire cells.
    ///
    /// Every level is lowered by half the fire count and clamped at zero.
    /// Levels `0`, `1` and `2` map to `0.35`, `0.45` and `0.55` before the
    /// inverse square is taken.
    #[must_use]
    pub fn danger_field(&self, active_fires: u32, tuning: &EndgameTuning) -> CostGrid {
        let multiplier = if active_fires == 0 {
            tuning.base_multiplier
        } else {
            tuning.active_multiplier
        };
        let offset = active_fires / 2;

        let mut field = Grid::filled(self.width(), self.height(), 0.0);
        for (position, &level) in self.spiral.iter() {
            let bucket = match level.saturating_sub(offset) {
                0 => 0.35,
                1 => 0.45,
                2 => 0.55,
                remaining => f64::from(remaining),
            };
            field[position] = multiplier * (1.0 / bucket).powi(2);
        }
        field
    }
}

const fn turn_left(heading: (i64, i64)) -> (i64, i64) {
    match heading {
        (1, 0) => (0, -1),
        (0, -1) => (-1, 0),
        (-1, 0) => (0, 1),
        _ => (1, 0),
    }
}
