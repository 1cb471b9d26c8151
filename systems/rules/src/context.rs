//! Everything the rules of one tick read and write, bundled in one value.

use std::collections::{BTreeMap, BTreeSet};

use bomberland_core::{
    Action, CostGrid, Direction, Grid, Position, Tuning, Unit, UnitAction, UnitId,
};
use bomberland_system_search::{PathSearch, RetreatSearch};
use bomberland_world::{EndgameFireSimulator, World};
use tracing::debug;

use crate::state::{CarriedState, TickState};

/// Which units hold the cells nearest the board center.
#[derive(Clone, Debug, Default)]
pub(crate) struct Standings {
    /// Enemy on the highest spiral level.
    pub(crate) enemy: Option<Unit>,
    /// Our unit on the highest spiral level.
    pub(crate) mine: Option<UnitId>,
    /// Whoever of the two is closer; ties go to the enemy.
    pub(crate) overall: Option<UnitId>,
}

impl Standings {
    fn compute(world: &mut World, endgame: &EndgameFireSimulator) -> Self {
        let enemy = world
            .enemy_units()
            .iter()
            .fold(None::<&Unit>, |best, enemy| match best {
                Some(best) if endgame.level(best.position) >= endgame.level(enemy.position) => {
                    Some(best)
                }
                _ => Some(enemy),
            })
            .cloned();

        world.sort_my_units_by(|a, b| {
            endgame
                .level(b.position)
                .cmp(&endgame.level(a.position))
        });
        let mine = world.my_units().first();

        let enemy_level = enemy.as_ref().map(|enemy| endgame.level(enemy.position));
        let ahead = |mine: &Unit| enemy_level.map_or(true, |level| endgame.level(mine.position) > level);
        let overall = match (mine, &enemy) {
            (Some(mine), _) if ahead(mine) => Some(mine.id.clone()),
            (_, Some(enemy)) => Some(enemy.id.clone()),
            _ => None,
        };

        Self {
            mine: mine.map(|unit| unit.id.clone()),
            enemy,
            overall,
        }
    }

    pub(crate) fn is_overall(&self, unit: &UnitId) -> bool {
        self.overall.as_ref() == Some(unit)
    }

    pub(crate) fn enemy_holds_center(&self) -> bool {
        match (&self.enemy, &self.overall) {
            (Some(enemy), Some(overall)) => &enemy.id == overall,
            _ => false,
        }
    }
}

pub(crate) struct TickContext<'a> {
    pub(crate) world: World,
    pub(crate) tuning: &'a Tuning,
    pub(crate) endgame: &'a EndgameFireSimulator,
    pub(crate) state_map: CostGrid,
    pub(crate) standings: Standings,
    pub(crate) state: TickState,
    pub(crate) carried: CarriedState,
    pub(crate) paths: &'a mut PathSearch,
    pub(crate) retreat: &'a mut RetreatSearch,
}

impl<'a> TickContext<'a> {
    pub(crate) fn new(
        mut world: World,
        tuning: &'a Tuning,
        endgame: &'a EndgameFireSimulator,
        mut carried: CarriedState,
        paths: &'a mut PathSearch,
        retreat: &'a mut RetreatSearch,
    ) -> Self {
        let endgame_danger = endgame.danger_field(world.endgame_fire_count(), &tuning.endgame);
        let state_map = state_map(&world, &endgame_danger, tuning);
        let standings = Standings::compute(&mut world, endgame);

        let previous = std::mem::take(&mut carried.previous_targets);
        let force_bomb = std::mem::take(&mut carried.force_bomb);
        let blocked = blocked_locations(&world, &previous, &endgame_danger);
        let active_bombs = world.my_bombs().count();
        if !blocked.is_empty() {
            debug!(tick = world.tick(), blocked = ?blocked, "blocked locations");
        }

        Self {
            world,
            tuning,
            endgame,
            state_map,
            standings,
            state: TickState::new(blocked, force_bomb, active_bombs),
            carried,
            paths,
            retreat,
        }
    }

    /// Current positions of our units, the pending actions and the carried
    /// fields as this tick left them.
    pub(crate) fn finish(self) -> (BTreeMap<UnitId, Position>, Vec<UnitAction>, CarriedState) {
        let positions = self
            .world
            .my_units()
            .iter()
            .map(|unit| (unit.id.clone(), unit.position))
            .collect();
        (positions, self.state.into_pending(), self.carried)
    }

    pub(crate) fn tick(&self) -> u32 {
        self.world.tick()
    }

    pub(crate) fn is_busy(&self, unit: &UnitId) -> bool {
        self.state.is_busy(unit)
    }

    pub(crate) fn execute(&mut self, unit: &UnitId, action: Action) {
        debug!(tick = self.tick(), unit = %unit, ?action, "action");
        self.state.push(UnitAction::new(unit.clone(), action));
    }

    pub(crate) fn place_bomb(&mut self, unit: &UnitId) {
        self.execute(unit, Action::PlaceBomb);
        self.state.count_bomb();
    }

    /// Sends `unit` from `from` to the adjacent `to`, or keeps it in place
    /// when the cells are not adjacent. Returns whether a move was issued.
    pub(crate) fn execute_move(&mut self, unit: &UnitId, from: Position, to: Position) -> bool {
        self.state.claim_cell(to);
        let _ = self.carried.previous_targets.insert(unit.clone(), to);
        match Direction::between(from, to) {
            Some(direction) => {
                self.execute(unit, Action::Move { direction, target: to });
                true
            }
            None => {
                self.execute(unit, Action::Noop);
                false
            }
        }
    }

    /// Head-count weight of a unit when weighing a detonation.
    pub(crate) fn weight(&self, unit: &Unit) -> f64 {
        let mut weight = if self.standings.is_overall(&unit.id) {
            2.0
        } else {
            1.0
        };
        if unit.is_invulnerable_after(self.tick()) {
            weight *= 0.1;
        }
        weight
    }

    /// Reports whether our units next to `position` outweigh the enemies
    /// next to it.
    pub(crate) fn is_my_unit_near(&self, position: Position, equals_is_true: bool) -> bool {
        let near = |unit: &&Unit| unit.position.manhattan_distance(position) == 1;
        let enemies: f64 = self
            .world
            .enemy_units()
            .iter()
            .filter(near)
            .map(|unit| self.weight(unit))
            .sum();
        let mine: f64 = self
            .world
            .my_units()
            .iter()
            .filter(near)
            .map(|unit| self.weight(unit))
            .sum();
        mine > enemies || (mine == enemies && equals_is_true)
    }

    /// Marks every cell of a cluster we are about to detonate as exploding.
    pub(crate) fn mark_detonation(&mut self, cells: &[Position]) {
        let danger = self.tuning.hazards.explosion_danger;
        self.world.mark_explosion_cells(cells, danger);
        for &cell in cells {
            if let Some(value) = self.state_map.get_mut(cell) {
                *value = value.max(danger);
            }
        }
    }

    /// Marks the blast of a bomb we are about to drop at `position`.
    pub(crate) fn mark_fresh_bomb(&mut self, position: Position, radius: u32) {
        let danger = self.tuning.hazards.explosion_danger;
        self.world
            .raise_potential_explosion(&mut self.state_map, position, radius, danger);
        self.world.mark_potential_explosion(position, radius, danger);
    }

    /// Base map for walking towards a far objective: walls are expensive
    /// rather than impassable so the walk can decide to bomb through them.
    pub(crate) fn objective_map(&self) -> CostGrid {
        let walls = self.world.walls();
        let mut map = Grid::filled(walls.width(), walls.height(), 1.0);
        for (cell, &wall) in walls.iter() {
            map[cell] += wall * 1000.0;
            if self.world.endgame_fire()[cell] {
                map[cell] += 10_000.0;
            }
        }
        for &cell in self.state.claimed_cells() {
            map[cell] = 100_000.0;
        }
        for &cell in self.state.blocked() {
            map[cell] = 10_000.0;
        }
        map
    }
}

/// Shared per-tick cost of standing on each cell.
fn state_map(world: &World, endgame_danger: &CostGrid, tuning: &Tuning) -> CostGrid {
    let danger = world.danger();
    let walkable = world.walkable();
    let mut map = Grid::filled(world.width(), world.height(), tuning.hazards.base_cell_cost);
    map.add_grid(walkable);
    map.add_grid(danger);
    map.add_grid(endgame_danger);

    let mut escapes = 0;
    let mut last = None;
    for enemy in world.enemy_units() {
        if danger[enemy.position] == 0.0 {
            continue;
        }
        for cell in danger.neighbors(enemy.position) {
            if danger[cell] == 0.0 && walkable[cell] == 0.0 {
                map[cell] += tuning.discounts.enemy_in_danger;
                escapes += 1;
                last = Some(cell);
            }
        }
    }
    if let (1, Some(cell)) = (escapes, last) {
        map[cell] += tuning.discounts.enemy_in_danger_one_cell;
    }
    map
}

/// Cells our units failed to enter last tick and that an enemy contests.
fn blocked_locations(
    world: &World,
    previous: &BTreeMap<UnitId, Position>,
    endgame_danger: &CostGrid,
) -> BTreeSet<Position> {
    let tick = i64::from(world.tick());
    let candidates: BTreeSet<Position> = world
        .my_units()
        .iter()
        .filter(|unit| i64::from(unit.stunned_until) < tick - 1)
        .filter_map(|unit| {
            previous
                .get(&unit.id)
                .copied()
                .filter(|&target| target != unit.position)
        })
        .collect();

    let danger_at = |cell: Position| world.danger()[cell] + endgame_danger[cell];
    let least_adjacent = |units: &[Unit], location: Position| {
        units
            .iter()
            .filter(|unit| unit.position.manhattan_distance(location) == 1)
            .map(|unit| danger_at(unit.position))
            .fold(f64::INFINITY, f64::min)
    };

    candidates
        .into_iter()
        .filter(|&location| {
            least_adjacent(world.my_units(), location)
                >= least_adjacent(world.enemy_units(), location)
        })
        .collect()
}
