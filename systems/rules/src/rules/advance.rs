//! One step along a long-range path, shared by the center and spread rules.

use bomberland_core::{CostGrid, Position, Unit};
use tracing::debug;

use super::{
    detonate::detonate_if_worth_it,
    retreat::{retreat_if_in_danger, retreat_unit},
};
use crate::context::TickContext;

/// Takes the next step of `path` for `unit`, bombing through a blocking
/// wall when that is safe.
///
/// With `relocate` set, a unit that cannot bomb safely where it stands moves
/// to a neighbouring cell that can and is forced to bomb on the next tick.
pub(super) fn advance(
    ctx: &mut TickContext<'_>,
    unit: &Unit,
    path: &[Position],
    map: &CostGrid,
    relocate: bool,
) {
    if retreat_if_in_danger(ctx, unit) {
        return;
    }
    let Some(&step) = path.get(1) else {
        return;
    };

    let armed: Vec<Position> = ctx
        .world
        .my_armed_bombs()
        .filter(|bomb| bomb.owner == unit.id)
        .map(|bomb| bomb.position)
        .collect();
    for position in armed {
        if detonate_if_worth_it(ctx, position, true) {
            return;
        }
    }
    if ctx.world.my_bombs().any(|bomb| bomb.owner == unit.id) {
        let _ = retreat_unit(ctx, unit, false);
        return;
    }

    let next = nearest_uncontested_powerup(ctx, unit, map).unwrap_or(step);
    if ctx.world.danger()[next] != 0.0 {
        let _ = retreat_unit(ctx, unit, false);
        return;
    }

    if ctx.world.walls()[next] != 0.0 {
        if ctx.state.active_bombs() >= ctx.tuning.bombs.max_active_bombs
            || ctx.is_my_unit_near(unit.position, false)
        {
            return;
        }
        let radius = unit.blast_radius();
        if ctx.world.check_free(unit.position, radius + 1, radius, None) {
            debug!(tick = ctx.tick(), unit = %unit.id, wall = ?next, "bombing through");
            ctx.place_bomb(&unit.id);
        } else if relocate {
            relocate_for_bomb(ctx, unit);
        }
        return;
    }

    if ctx.state.is_claimed(next)
        || ctx.world.occupant(next).is_some()
        || ctx.world.walkable()[next] != 0.0
    {
        return;
    }
    let _ = ctx.execute_move(&unit.id, unit.position, next);
}

/// Moves `unit` next door to a cell where a bomb leaves an escape route and
/// schedules that bomb for the next tick.
fn relocate_for_bomb(ctx: &mut TickContext<'_>, unit: &Unit) {
    let radius = unit.blast_radius();
    let spot = ctx
        .world
        .walkable()
        .passable_neighbors(unit.position, None)
        .find(|&cell| {
            ctx.world.walkable()[cell] == 0.0
                && ctx
                    .world
                    .check_free(cell, radius + 1, radius, Some(&unit.id))
        });
    if let Some(spot) = spot {
        debug!(tick = ctx.tick(), unit = %unit.id, ?spot, "relocating to bomb");
        let _ = ctx.execute_move(&unit.id, unit.position, spot);
        let _ = ctx.carried.force_bomb.insert(unit.id.clone());
    }
}

/// First step towards the cheapest pickup no teammate reaches more cheaply.
fn nearest_uncontested_powerup(
    ctx: &mut TickContext<'_>,
    unit: &Unit,
    map: &CostGrid,
) -> Option<Position> {
    let pickups: Vec<Position> = ctx
        .world
        .powerups()
        .iter()
        .map(|powerup| powerup.position)
        .collect();
    let teammates: Vec<Position> = ctx
        .world
        .my_units()
        .iter()
        .filter(|other| other.id != unit.id)
        .map(|other| other.position)
        .collect();

    let mut best: Option<(f64, Position)> = None;
    for pickup in pickups {
        let route = ctx.paths.run(map, unit.position, pickup);
        if !route.is_reachable() {
            continue;
        }
        let contested = teammates
            .iter()
            .any(|&other| ctx.paths.run(map, other, pickup).cost < route.cost);
        if contested {
            continue;
        }
        let Some(step) = route.first_step() else {
            continue;
        };
        if best.map_or(true, |(cost, _)| route.cost < cost) {
            best = Some((route.cost, step));
        }
    }
    best.map(|(_, step)| step)
}
