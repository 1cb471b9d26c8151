#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-tick world model derived from a raw snapshot.
//!
//! [`World::parse`] is the only way to build a world. It partitions units,
//! stamps walls, danger and occupation penalties into dense grids and builds
//! two independent bomb cluster maps, one casting our bomb rays and one
//! casting enemy bomb rays. A world never refers to an earlier tick; the
//! rule engine parses a fresh one for every snapshot.

use std::collections::BTreeSet;

use bomberland_core::{
    tuning::HazardTuning, Bomb, CostGrid, Direction, Grid, Owner, Position, Powerup, Unit, UnitId,
};

mod clusters;
mod endgame;
mod parse;

pub use clusters::{BombCluster, ClusterId, ExplosionMap};
pub use endgame::EndgameFireSimulator;

/// Unit standing on a cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Occupant {
    /// Identifier of the unit.
    pub id: UnitId,
    /// Side of the unit.
    pub owner: Owner,
}

/// Parsed world for a single tick.
#[derive(Clone, Debug)]
pub struct World {
    tick: u32,
    center: Position,
    hazards: HazardTuning,
    roster: BTreeSet<UnitId>,
    my_units: Vec<Unit>,
    enemy_units: Vec<Unit>,
    occupants: Grid<Option<Occupant>>,
    dead_units: Grid<bool>,
    walkable: CostGrid,
    walls: CostGrid,
    danger: CostGrid,
    occupation: CostGrid,
    has_bomb: Grid<bool>,
    endgame_fire: Grid<bool>,
    endgame_fire_count: u32,
    powerups: Vec<Powerup>,
    bombs: Vec<Bomb>,
    my_explosions: ExplosionMap,
    enemy_explosions: ExplosionMap,
}

impl World {
    fn empty(tick: u32, width: u32, height: u32, hazards: HazardTuning) -> Self {
        Self {
            tick,
            center: Position::new(width / 2, height / 2),
            hazards,
            roster: BTreeSet::new(),
            my_units: Vec::new(),
            enemy_units: Vec::new(),
            occupants: Grid::filled(width, height, None),
            dead_units: Grid::filled(width, height, false),
            walkable: Grid::filled(width, height, 0.0),
            walls: Grid::filled(width, height, 0.0),
            danger: Grid::filled(width, height, 0.0),
            occupation: Grid::filled(width, height, 0.0),
            has_bomb: Grid::filled(width, height, false),
            endgame_fire: Grid::filled(width, height, false),
            endgame_fire_count: 0,
            powerups: Vec::new(),
            bombs: Vec::new(),
            my_explosions: ExplosionMap::new(width, height),
            enemy_explosions: ExplosionMap::new(width, height),
        }
    }

    /// Tick the world describes.
    #[must_use]
    pub const fn tick(&self) -> u32 {
        self.tick
    }

    /// Board width.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.walls.width()
    }

    /// Board height.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.walls.height()
    }

    /// Center cell of the board.
    #[must_use]
    pub const fn center(&self) -> Position {
        self.center
    }

    /// Our living units.
    #[must_use]
    pub fn my_units(&self) -> &[Unit] {
        &self.my_units
    }

    /// Stable re-ordering of our living units.
    pub fn sort_my_units_by<F>(&mut self, compare: F)
    where
        F: FnMut(&Unit, &Unit) -> std::cmp::Ordering,
    {
        self.my_units.sort_by(compare);
    }

    /// Living enemy units.
    #[must_use]
    pub fn enemy_units(&self) -> &[Unit] {
        &self.enemy_units
    }

    /// Every unit id our agent owns, including dead units.
    #[must_use]
    pub fn roster(&self) -> &BTreeSet<UnitId> {
        &self.roster
    }

    /// Living unit with identifier `id`, on either side.
    #[must_use]
    pub fn unit(&self, id: &UnitId) -> Option<&Unit> {
        self.my_units
            .iter()
            .chain(&self.enemy_units)
            .find(|unit| &unit.id == id)
    }

    /// Living unit standing on `position`.
    #[must_use]
    pub fn occupant(&self, position: Position) -> Option<&Occupant> {
        self.occupants.get(position).and_then(Option::as_ref)
    }

    /// Reports whether a living enemy stands on `position`.
    #[must_use]
    pub fn is_enemy_at(&self, position: Position) -> bool {
        self.occupant(position)
            .is_some_and(|occupant| occupant.owner == Owner::Enemy)
    }

    /// Reports whether a dead unit blocks `position`.
    #[must_use]
    pub fn is_dead_unit_at(&self, position: Position) -> bool {
        self.dead_units.get(position).copied().unwrap_or(false)
    }

    /// `0` for walkable cells, infinity for blocked ones.
    #[must_use]
    pub fn walkable(&self) -> &CostGrid {
        &self.walkable
    }

    /// Wall hit points, infinity for indestructible walls and dead units.
    #[must_use]
    pub fn walls(&self) -> &CostGrid {
        &self.walls
    }

    /// Additive explosion hazard per cell.
    #[must_use]
    pub fn danger(&self) -> &CostGrid {
        &self.danger
    }

    /// Tight-space penalty per cell.
    #[must_use]
    pub fn occupation(&self) -> &CostGrid {
        &self.occupation
    }

    /// Reports whether a bomb lies on `position`.
    #[must_use]
    pub fn has_bomb(&self, position: Position) -> bool {
        self.has_bomb.get(position).copied().unwrap_or(false)
    }

    /// Cells covered by permanent endgame fire.
    #[must_use]
    pub fn endgame_fire(&self) -> &Grid<bool> {
        &self.endgame_fire
    }

    /// Number of permanent endgame fire cells.
    #[must_use]
    pub const fn endgame_fire_count(&self) -> u32 {
        self.endgame_fire_count
    }

    /// Cells not yet consumed by endgame fire.
    #[must_use]
    pub fn free_from_endgame_fire(&self) -> u32 {
        let cells = self.width().saturating_mul(self.height());
        cells.saturating_sub(self.endgame_fire_count)
    }

    /// Pickups on the board.
    #[must_use]
    pub fn powerups(&self) -> &[Powerup] {
        &self.powerups
    }

    /// Every bomb on the board, indexed the way the explosion maps index them.
    #[must_use]
    pub fn bombs(&self) -> &[Bomb] {
        &self.bombs
    }

    /// Our bombs.
    pub fn my_bombs(&self) -> impl Iterator<Item = &Bomb> + '_ {
        self.bombs.iter().filter(|bomb| bomb.side == Owner::Mine)
    }

    /// Our bombs that can be detonated this tick.
    pub fn my_armed_bombs(&self) -> impl Iterator<Item = &Bomb> + '_ {
        self.my_bombs().filter(|bomb| bomb.armed)
    }

    /// Explosion map casting our bomb rays.
    #[must_use]
    pub fn my_explosions(&self) -> &ExplosionMap {
        &self.my_explosions
    }

    /// Explosion map casting enemy bomb rays.
    #[must_use]
    pub fn enemy_explosions(&self) -> &ExplosionMap {
        &self.enemy_explosions
    }

    /// Hazard constants the world was parsed with.
    #[must_use]
    pub fn hazards(&self) -> &HazardTuning {
        &self.hazards
    }

    /// Raises `target` to at least `danger` over the blast a bomb at
    /// `position` with `radius` would produce. Rays stop at walls.
    pub fn raise_potential_explosion(
        &self,
        target: &mut CostGrid,
        position: Position,
        radius: u32,
        danger: f64,
    ) {
        raise_potential_explosion(&self.walls, target, position, radius, danger);
    }

    /// Same as [`World::raise_potential_explosion`] applied to the world's
    /// own danger grid.
    pub fn mark_potential_explosion(&mut self, position: Position, radius: u32, danger: f64) {
        raise_potential_explosion(&self.walls, &mut self.danger, position, radius, danger);
    }

    /// Raises the danger of every listed cell to at least `danger`.
    pub fn mark_explosion_cells(&mut self, cells: &[Position], danger: f64) {
        for &cell in cells {
            if let Some(value) = self.danger.get_mut(cell) {
                *value = value.max(danger);
            }
        }
    }

    /// Reports whether a bomb dropped on `position` leaves an escape route.
    ///
    /// Looks up to `radius - 1` cells along each axis for a cell that is
    /// walkable, out of danger, unoccupied (except by `ignore`) and not next
    /// to an enemy. Inside the blast such a cell also needs an open side
    /// cell or low occupation to count; past `blast_radius` any such cell
    /// counts.
    #[must_use]
    pub fn check_free(
        &self,
        position: Position,
        radius: u32,
        blast_radius: u32,
        ignore: Option<&UnitId>,
    ) -> bool {
        for direction in [
            Direction::Right,
            Direction::Left,
            Direction::Up,
            Direction::Down,
        ] {
            let horizontal = matches!(direction, Direction::Left | Direction::Right);
            let (dx, dy) = direction.delta();
            for distance in 1..radius {
                let offset = i64::from(distance);
                let cell = position.offset(dx * offset, dy * offset, self.width(), self.height());
                let beyond_blast = distance >= blast_radius;
                let (free, stop) = match cell {
                    Some(cell) => self.check_cell_free(cell, beyond_blast, horizontal, ignore),
                    None => (false, true),
                };
                if free {
                    return true;
                }
                if stop {
                    break;
                }
            }
        }
        false
    }

    fn check_cell_free(
        &self,
        cell: Position,
        beyond_blast: bool,
        horizontal: bool,
        ignore: Option<&UnitId>,
    ) -> (bool, bool) {
        if self.walkable[cell] != 0.0 || self.danger[cell] != 0.0 {
            return (false, true);
        }
        if self.blocked_by_other(cell, ignore) {
            return (false, true);
        }
        if self
            .enemy_units
            .iter()
            .any(|enemy| enemy.position.manhattan_distance(cell) <= 1)
        {
            return (false, true);
        }
        if beyond_blast {
            return (true, true);
        }

        let sides = if horizontal {
            [(0, 1), (0, -1)]
        } else {
            [(1, 0), (-1, 0)]
        };
        for (dx, dy) in sides {
            let side = cell.offset(dx, dy, self.width(), self.height());
            if side.is_some_and(|side| self.is_open_side(side, ignore)) {
                return (true, true);
            }
        }

        if self.occupation[cell] <= self.hazards.close_cell_danger {
            return (true, true);
        }
        (false, false)
    }

    fn is_open_side(&self, cell: Position, ignore: Option<&UnitId>) -> bool {
        if self.walkable[cell] != 0.0 || self.danger[cell] != 0.0 {
            return false;
        }
        if self.blocked_by_other(cell, ignore) {
            return false;
        }
        !self
            .enemy_units
            .iter()
            .any(|enemy| enemy.position.manhattan_distance(cell) == 1)
    }

    fn blocked_by_other(&self, cell: Position, ignore: Option<&UnitId>) -> bool {
        self.occupant(cell)
            .is_some_and(|occupant| Some(&occupant.id) != ignore)
    }

    /// Enemy that a bomb dropped by `unit` right now would hit.
    ///
    /// Rays include the unit's own cell and stop at walls. An enemy that is
    /// vulnerable next tick wins immediately; otherwise the first invulnerable
    /// enemy seen is returned so callers can tell a wasted shot from no shot.
    #[must_use]
    pub fn can_hit_enemy(&self, unit: &Unit) -> Option<&Unit> {
        let radius = i64::from(unit.blast_radius());
        let mut shielded = None;
        for direction in [
            Direction::Right,
            Direction::Left,
            Direction::Up,
            Direction::Down,
        ] {
            let (dx, dy) = direction.delta();
            for distance in 0..radius {
                let Some(cell) =
                    unit.position
                        .offset(dx * distance, dy * distance, self.width(), self.height())
                else {
                    break;
                };
                if self.walls[cell] != 0.0 {
                    break;
                }
                if let Some(enemy) = self.enemy_units.iter().find(|enemy| enemy.position == cell)
                {
                    if !enemy.is_invulnerable_after(self.tick) {
                        return Some(enemy);
                    }
                    let _ = shielded.get_or_insert(enemy);
                }
            }
        }
        shielded
    }
}

/// Max-assigns `danger` over the cross a blast at `position` would cover.
fn raise_potential_explosion(
    walls: &CostGrid,
    target: &mut CostGrid,
    position: Position,
    radius: u32,
    danger: f64,
) {
    let mut raise = |cell: Position| -> bool {
        if walls[cell] != 0.0 {
            return true;
        }
        if let Some(value) = target.get_mut(cell) {
            *value = value.max(danger);
        }
        false
    };

    if walls.contains(position) {
        let _ = raise(position);
    }
    for direction in [
        Direction::Right,
        Direction::Left,
        Direction::Down,
        Direction::Up,
    ] {
        let (dx, dy) = direction.delta();
        for distance in 1..i64::from(radius) {
            let Some(cell) =
                position.offset(dx * distance, dy * distance, walls.width(), walls.height())
            else {
                break;
            };
            if raise(cell) {
                break;
            }
        }
    }
}
