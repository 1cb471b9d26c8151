use tracing::trace;

use super::advance::advance;
use crate::context::TickContext;

/// Cost below which a unit counts as already at the center.
const ARRIVED: f64 = 1000.0;

/// Walks units without a spread objective towards the board center,
/// bombing through walls on the way.
pub(super) fn run(ctx: &mut TickContext<'_>) {
    let base = ctx.objective_map();
    let center = ctx.world.center();
    let units = ctx.world.my_units().to_vec();

    for unit in &units {
        if ctx.carried.opposite_half_targets.contains_key(&unit.id) || ctx.is_busy(&unit.id) {
            continue;
        }

        let mut map = base.clone();
        for other in &units {
            if other.id != unit.id && other.position.manhattan_distance(center) > 2 {
                map[other.position] = 10_000.0;
            }
        }

        let mut route = ctx.paths.run(&map, unit.position, center);
        if !route.is_reachable() && route.path.len() > 1 {
            let short_of_goal = route.path[route.path.len() - 2];
            route = ctx.paths.run(&map, unit.position, short_of_goal);
        }
        trace!(tick = ctx.tick(), unit = %unit.id, cost = route.cost, "route to center");
        if route.cost < ARRIVED || !route.is_reachable() {
            continue;
        }
        advance(ctx, unit, &route.path, &map, true);
    }
}
