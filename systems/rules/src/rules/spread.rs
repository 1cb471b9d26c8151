use bomberland_core::{CostGrid, Position, UnitId};
use tracing::debug;

use super::advance::advance;
use crate::context::TickContext;

/// Cost above which a cell on the center column is skipped as a target.
const CROWDED: f64 = 3000.0;

/// Keeps our units from bunching up in one half of the board while the
/// endgame fire still leaves room to move.
pub(super) fn run(ctx: &mut TickContext<'_>) {
    if ctx.world.free_from_endgame_fire() <= ctx.tuning.endgame.spread_min_free_cells {
        ctx.carried.opposite_half_targets.clear();
        return;
    }
    if ctx.world.my_units().len() < 2 {
        return;
    }

    let world = &ctx.world;
    ctx.carried
        .opposite_half_targets
        .retain(|unit, _| world.unit(unit).is_some());
    if ctx.carried.opposite_half_targets.is_empty() {
        assign_objective(ctx);
    }

    let objectives: Vec<(UnitId, Position)> = ctx
        .carried
        .opposite_half_targets
        .iter()
        .map(|(unit, target)| (unit.clone(), *target))
        .collect();
    for (id, target) in objectives {
        let Some(unit) = ctx.world.unit(&id).cloned() else {
            continue;
        };
        if unit.position == target {
            let _ = ctx.carried.opposite_half_targets.remove(&id);
            continue;
        }
        if ctx.is_busy(&id) {
            continue;
        }

        let mut map = spread_map(ctx, &id);
        for enemy in ctx.world.enemy_units() {
            map[enemy.position] = 10_000.0;
        }
        let center = ctx.world.center();
        let step = if target.y() > center.y() { 1 } else { -1 };
        let target = walk_target(&map, center.x(), i64::from(target.y()), step);
        if unit.position == target {
            let _ = ctx.carried.opposite_half_targets.remove(&id);
            continue;
        }

        let route = ctx.paths.run(&map, unit.position, target);
        advance(ctx, &unit, &route.path, &map, false);
    }
}

/// Sends the unit farthest from the center across when all of ours share
/// one half of the board.
fn assign_objective(ctx: &mut TickContext<'_>) {
    let center = ctx.world.center();
    let units = ctx.world.my_units();
    let upper = units.iter().any(|unit| unit.position.y() >= center.y());
    let lower = units.iter().any(|unit| unit.position.y() <= center.y());
    if upper && lower {
        return;
    }
    let step: i64 = if lower { 1 } else { -1 };

    let mut farthest_first: Vec<_> = units.iter().collect();
    farthest_first.sort_by_key(|unit| std::cmp::Reverse(unit.position.manhattan_distance(center)));
    let candidate = farthest_first
        .into_iter()
        .find(|unit| !ctx.is_busy(&unit.id) && ctx.standings.mine.as_ref() != Some(&unit.id))
        .map(|unit| unit.id.clone());
    let Some(id) = candidate else {
        return;
    };
    let map = spread_map(ctx, &id);
    let target = walk_target(&map, center.x(), i64::from(center.y()) + step, step);
    debug!(tick = ctx.tick(), unit = %id, ?target, "crossing to the other half");
    let _ = ctx.carried.opposite_half_targets.insert(id, target);
}

/// Objective map in which every other unit of ours is nearly impassable.
fn spread_map(ctx: &TickContext<'_>, unit: &UnitId) -> CostGrid {
    let mut map = ctx.objective_map();
    for other in ctx.world.my_units() {
        if &other.id != unit {
            map[other.position] = 100_000.0;
        }
    }
    map
}

/// First cell on column `x`, starting at row `start` and stepping by `step`,
/// that is not crowded. Stops at the board edge.
fn walk_target(map: &CostGrid, x: u32, start: i64, step: i64) -> Position {
    let top = i64::from(map.height()) - 1;
    let mut y = start.clamp(0, top.max(0));
    while y > 0
        && y < top
        && map
            .get(Position::new(x, row(y)))
            .is_some_and(|&cost| cost > CROWDED)
    {
        y += step;
    }
    Position::new(x, row(y))
}

fn row(y: i64) -> u32 {
    u32::try_from(y).unwrap_or(0)
}
