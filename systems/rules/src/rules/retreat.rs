use bomberland_core::{CostGrid, Unit};
use tracing::debug;

use crate::context::TickContext;

/// Sends every unit still without an action to its best nearby cell, the
/// most exposed units choosing first.
pub(super) fn run(ctx: &mut TickContext<'_>) {
    let mut units: Vec<(f64, Unit)> = ctx
        .world
        .my_units()
        .iter()
        .map(|unit| {
            let exposure = f64::from(ctx.endgame.level(unit.position))
                - ctx.world.danger()[unit.position];
            (exposure, unit.clone())
        })
        .collect();
    units.sort_by(|a, b| a.0.total_cmp(&b.0));

    for (_, unit) in &units {
        let _ = retreat_unit(ctx, unit, true);
    }
}

/// Retreats `unit` when its cell is dangerous. Returns whether it acted.
pub(super) fn retreat_if_in_danger(ctx: &mut TickContext<'_>, unit: &Unit) -> bool {
    if ctx.world.danger()[unit.position] == 0.0 {
        return false;
    }
    retreat_unit(ctx, unit, true)
}

/// Moves `unit` towards the best cell the retreat search finds on its
/// personal cost map. Returns whether it acted.
pub(super) fn retreat_unit(ctx: &mut TickContext<'_>, unit: &Unit, allow_occupied: bool) -> bool {
    if ctx.is_busy(&unit.id) {
        return false;
    }
    let map = unit_map(ctx, unit, allow_occupied);
    let outcome = ctx.retreat.run(
        &map,
        unit.position,
        ctx.tuning.search.horizon,
        ctx.state.claimed_destinations(),
        ctx.tuning.search.exclude_point_stay_cost,
    );
    if let Some(destination) = outcome.destination() {
        ctx.state.claim_destination(destination);
    }
    debug!(
        tick = ctx.tick(),
        unit = %unit.id,
        destination = ?outcome.destination(),
        score = outcome.score,
        expanded = outcome.expanded,
        "retreat"
    );
    let step = outcome.first_step().unwrap_or(unit.position);
    let _ = ctx.execute_move(&unit.id, unit.position, step);
    true
}

/// The shared state map adjusted for one unit: crowding by its teammates,
/// pulls towards the center, pickups and exposed enemies.
fn unit_map(ctx: &TickContext<'_>, unit: &Unit, allow_occupied: bool) -> CostGrid {
    let tuning = ctx.tuning;
    let hazards = &tuning.hazards;
    let discounts = &tuning.discounts;
    let danger = ctx.world.danger();
    let walkable = ctx.world.walkable();
    let overall = ctx.standings.is_overall(&unit.id);

    let mut map = ctx.state_map.clone();
    if map[unit.position] == f64::INFINITY {
        map[unit.position] = hazards.stand_on_bomb_danger;
    }

    let mut occupation = ctx.world.occupation().clone();
    for other in ctx.world.my_units() {
        if other.id == unit.id {
            continue;
        }
        let squeezable = allow_occupied
            && other.position.manhattan_distance(unit.position) == 1
            && danger.neighbors(other.position).any(|cell| {
                danger[cell] <= tuning.bombs.my_starting_danger && walkable[cell] == 0.0
            });
        map[other.position] += if squeezable {
            hazards.move_on_occupied_spot_penalty
        } else {
            f64::INFINITY
        };
        occupation.add_cross(other.position, 2, hazards.close_cell_danger);
    }
    for (cell, &crowding) in occupation.iter() {
        map[cell] += crowding * crowding;
    }

    if let Some(enemy) = &ctx.standings.enemy {
        if unit.bombs == 0 && ctx.standings.enemy_holds_center() {
            for powerup in ctx.world.powerups() {
                map[powerup.position] += discounts.center_occupied_ammo;
            }
        } else if ctx.endgame.level(enemy.position) > ctx.endgame.level(unit.position) {
            for cell in danger.neighbors(unit.position) {
                if !ctx.is_my_unit_near(cell, false) {
                    map[cell] += discounts.close_to_center_enemy;
                }
            }
        }
    }

    if !overall {
        for powerup in ctx.world.powerups() {
            map[powerup.position] += discounts.power_up;
        }
    }

    let close_enemy = close_enemy_discount(ctx, unit);
    for enemy in ctx.world.enemy_units() {
        map.add_cross(enemy.position, 2, close_enemy);
    }
    add_center_pull(ctx, unit, &mut map);

    for &cell in ctx.state.claimed_cells() {
        map[cell] += hazards.explosion_danger;
    }
    for &cell in ctx.state.blocked() {
        map[cell] = f64::INFINITY;
    }
    map
}

/// Discount stamped around enemies. Dropped for the center holder once the
/// fire has closed in, and for a unit fleeing danger that is not standing on
/// a bomb.
fn close_enemy_discount(ctx: &TickContext<'_>, unit: &Unit) -> f64 {
    let endgame = &ctx.tuning.endgame;
    let holder_stays = ctx.standings.is_overall(&unit.id)
        && ctx.world.free_from_endgame_fire() <= endgame.holder_ignores_enemies_free_cells;
    let fleeing =
        ctx.world.danger()[unit.position] != 0.0 && !ctx.world.has_bomb(unit.position);
    if holder_stays || fleeing {
        0.0
    } else {
        ctx.tuning.discounts.close_enemy
    }
}

/// Late in the game the center and its 3x3 block pull every unit in.
fn add_center_pull(ctx: &TickContext<'_>, unit: &Unit, map: &mut CostGrid) {
    let endgame = &ctx.tuning.endgame;
    if ctx.tick() <= endgame.center_pull_after_tick {
        return;
    }
    let center = ctx.world.center();
    map[center] += endgame.center_discount * unit.hp as f64;
    for dx in -1..=1 {
        for dy in -1..=1 {
            if let Some(cell) = center.offset(dx, dy, ctx.world.width(), ctx.world.height()) {
                map[cell] += endgame.center_discount_mass;
            }
        }
    }
}
