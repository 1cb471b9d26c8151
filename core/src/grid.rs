//! Dense board primitives shared by the parser, the searches and the rules.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// Location of a single board cell.
///
/// Positions order by `x`, which is the order used to break ties between
/// equally cheap frontier entries. Ties on `x` fall back to `y` so the order
/// stays total.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    x: u32,
    y: u32,
}

impl Position {
    /// Creates a new board position.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column of the cell.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row of the cell. Row `0` is the bottom of the board.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Computes the Manhattan distance between two positions.
    #[must_use]
    pub fn manhattan_distance(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Offsets the position, returning `None` when the result leaves a
    /// `width` x `height` board.
    #[must_use]
    pub fn offset(self, dx: i64, dy: i64, width: u32, height: u32) -> Option<Position> {
        let x = i64::from(self.x).checked_add(dx)?;
        let y = i64::from(self.y).checked_add(dy)?;
        if x < 0 || y < 0 || x >= i64::from(width) || y >= i64::from(height) {
            return None;
        }
        Some(Position::new(u32::try_from(x).ok()?, u32::try_from(y).ok()?))
    }

    /// Moves one cell in `direction`, staying inside a `width` x `height` board.
    #[must_use]
    pub fn step(self, direction: Direction, width: u32, height: u32) -> Option<Position> {
        let (dx, dy) = direction.delta();
        self.offset(dx, dy, width, height)
    }

    /// In-bounds orthogonal neighbours.
    ///
    /// The base order is east, west, south, north. Cells whose coordinate sum
    /// is even enumerate in reverse, which keeps equally cheap paths from
    /// zig-zagging.
    pub fn neighbors(self, width: u32, height: u32) -> impl Iterator<Item = Position> {
        let mut candidates = [
            self.offset(1, 0, width, height),
            self.offset(-1, 0, width, height),
            self.offset(0, -1, width, height),
            self.offset(0, 1, width, height),
        ];
        if (u64::from(self.x) + u64::from(self.y)) % 2 == 0 {
            candidates.reverse();
        }
        candidates.into_iter().flatten()
    }
}

/// Cardinal movement direction as understood by the game server.
///
/// `Up` increases `y`, `Down` decreases it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Towards larger `y`.
    Up,
    /// Towards smaller `y`.
    Down,
    /// Towards smaller `x`.
    Left,
    /// Towards larger `x`.
    Right,
}

impl Direction {
    /// Every direction in a fixed order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Coordinate delta applied by a single step.
    #[must_use]
    pub const fn delta(self) -> (i64, i64) {
        match self {
            Direction::Up => (0, 1),
            Direction::Down => (0, -1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Direction leading from `from` to the orthogonally adjacent `to`.
    #[must_use]
    pub fn between(from: Position, to: Position) -> Option<Direction> {
        if from.manhattan_distance(to) != 1 {
            return None;
        }
        if to.x() > from.x() {
            Some(Direction::Right)
        } else if to.x() < from.x() {
            Some(Direction::Left)
        } else if to.y() > from.y() {
            Some(Direction::Up)
        } else {
            Some(Direction::Down)
        }
    }

    /// Wire name of the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// Dense board-sized array stored column-major by position.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    width: u32,
    height: u32,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Creates a grid with every cell set to `value`.
    #[must_use]
    pub fn filled(width: u32, height: u32, value: T) -> Self {
        let count = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        Self {
            width,
            height,
            cells: vec![value; count],
        }
    }

    /// Builds a grid from columns, so `columns[x][y]` lands at `(x, y)`.
    ///
    /// Returns `None` when the columns are ragged.
    #[must_use]
    pub fn from_columns(columns: Vec<Vec<T>>) -> Option<Self> {
        let width = u32::try_from(columns.len()).ok()?;
        let height = columns.first().map_or(0, Vec::len);
        if columns.iter().any(|column| column.len() != height) {
            return None;
        }
        let height = u32::try_from(height).ok()?;
        Some(Self {
            width,
            height,
            cells: columns.into_iter().flatten().collect(),
        })
    }

    /// Overwrites every cell with `value`.
    pub fn fill(&mut self, value: T) {
        self.cells.fill(value);
    }
}

impl<T> Grid<T> {
    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether the grid has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Reports whether `position` lies on the board.
    #[must_use]
    pub const fn contains(&self, position: Position) -> bool {
        position.x < self.width && position.y < self.height
    }

    /// Dense offset of `position`, if it lies on the board.
    #[must_use]
    pub fn index_of(&self, position: Position) -> Option<usize> {
        if !self.contains(position) {
            return None;
        }
        let column = usize::try_from(position.x).ok()?;
        let row = usize::try_from(position.y).ok()?;
        let height = usize::try_from(self.height).ok()?;
        column.checked_mul(height)?.checked_add(row)
    }

    /// Position stored at dense `offset`.
    #[must_use]
    pub fn position_of(&self, offset: usize) -> Option<Position> {
        if offset >= self.cells.len() || self.height == 0 {
            return None;
        }
        let height = usize::try_from(self.height).ok()?;
        let x = u32::try_from(offset / height).ok()?;
        let y = u32::try_from(offset % height).ok()?;
        Some(Position::new(x, y))
    }

    /// Value stored at `position`.
    #[must_use]
    pub fn get(&self, position: Position) -> Option<&T> {
        self.index_of(position).and_then(|offset| self.cells.get(offset))
    }

    /// Mutable value stored at `position`.
    pub fn get_mut(&mut self, position: Position) -> Option<&mut T> {
        self.index_of(position)
            .and_then(move |offset| self.cells.get_mut(offset))
    }

    /// Cells in dense order.
    #[must_use]
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    /// Every position paired with its value, column by column.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &T)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(offset, value)| self.position_of(offset).map(|p| (p, value)))
    }

    /// In-bounds orthogonal neighbours of `position`.
    pub fn neighbors(&self, position: Position) -> impl Iterator<Item = Position> {
        position.neighbors(self.width, self.height)
    }

    /// Applies `f` to every cell.
    pub fn for_each_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut T),
    {
        self.cells.iter_mut().for_each(|value| f(value));
    }
}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    fn index(&self, position: Position) -> &T {
        match self.index_of(position) {
            Some(offset) => &self.cells[offset],
            None => panic!(
                "position ({}, {}) outside {}x{} grid",
                position.x, position.y, self.width, self.height
            ),
        }
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    fn index_mut(&mut self, position: Position) -> &mut T {
        match self.index_of(position) {
            Some(offset) => &mut self.cells[offset],
            None => panic!(
                "position ({}, {}) outside {}x{} grid",
                position.x, position.y, self.width, self.height
            ),
        }
    }
}

/// Cost grid where `f64::INFINITY` marks an impassable cell.
pub type CostGrid = Grid<f64>;

impl Grid<f64> {
    /// Neighbours whose stored cost is finite. `include` is returned even
    /// when impassable, so a search can always step onto its own goal.
    pub fn passable_neighbors(
        &self,
        position: Position,
        include: Option<Position>,
    ) -> impl Iterator<Item = Position> + '_ {
        self.neighbors(position).filter(move |neighbor| {
            Some(*neighbor) == include || self[*neighbor] != f64::INFINITY
        })
    }

    /// Adds `value` to `center` and to the cells up to `radius - 1` steps away
    /// along each axis. Walls do not stop the stamp.
    pub fn add_cross(&mut self, center: Position, radius: u32, value: f64) {
        if let Some(cell) = self.get_mut(center) {
            *cell += value;
        }
        let (width, height) = (self.width, self.height);
        for distance in 1..i64::from(radius) {
            for direction in Direction::ALL {
                let (dx, dy) = direction.delta();
                if let Some(cell) = center.offset(dx * distance, dy * distance, width, height) {
                    self[cell] += value;
                }
            }
        }
    }

    /// Adds `other` cell by cell. Grids of different shape are left untouched.
    pub fn add_grid(&mut self, other: &Grid<f64>) {
        if self.width != other.width || self.height != other.height {
            return;
        }
        self.cells
            .iter_mut()
            .zip(&other.cells)
            .for_each(|(value, added)| *value += *added);
    }
}
