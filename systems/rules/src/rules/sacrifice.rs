use std::collections::BTreeSet;

use bomberland_core::{Direction, Position, Unit};
use bomberland_system_search::PathOutcome;
use tracing::debug;

use crate::context::TickContext;

/// Walks one invulnerable unit into a blast that is about to catch an enemy,
/// so the unit's own bomb there would finish the job. At most one unit acts.
pub(super) fn run(ctx: &mut TickContext<'_>) {
    let tick = ctx.tick();
    let units = ctx.world.my_units().to_vec();

    for unit in &units {
        if ctx.is_busy(&unit.id) || !unit.is_invulnerable_after(tick) {
            continue;
        }
        if ctx
            .world
            .can_hit_enemy(unit)
            .is_some_and(|enemy| !enemy.is_invulnerable_after(tick))
        {
            continue;
        }

        let max_distance = i64::from(unit.invulnerable_until) - i64::from(tick) - 2;
        let candidates = blast_cells_near_enemies(ctx, unit, max_distance);
        if candidates.is_empty() {
            continue;
        }

        let mut walk = ctx.world.walkable().clone();
        walk.for_each_mut(|cell| *cell += 1.0);
        let mut best: Option<PathOutcome> = None;
        for &cell in &candidates {
            let outcome = ctx.paths.run(&walk, unit.position, cell);
            if outcome.cost < best.as_ref().map_or(f64::INFINITY, |best| best.cost) {
                best = Some(outcome);
            }
        }

        let Some(best) = best else {
            continue;
        };
        if best.cost > max_distance as f64 {
            continue;
        }
        let Some(step) = best.first_step() else {
            continue;
        };
        debug!(tick, unit = %unit.id, target = ?best.path.last(), "walking into the blast");
        let _ = ctx.execute_move(&unit.id, unit.position, step);
        return;
    }
}

/// Exploding cells on the rays of each vulnerable enemy, limited to the
/// distance `unit` can cover while still invulnerable.
fn blast_cells_near_enemies(
    ctx: &TickContext<'_>,
    unit: &Unit,
    max_distance: i64,
) -> BTreeSet<Position> {
    let (width, height) = (ctx.world.width(), ctx.world.height());
    let explosion = ctx.tuning.hazards.explosion_danger;
    let radius = i64::from(unit.blast_radius());

    let mut cells = BTreeSet::new();
    for enemy in ctx.world.enemy_units() {
        if enemy.is_invulnerable_after(ctx.tick()) {
            continue;
        }
        for direction in [
            Direction::Right,
            Direction::Left,
            Direction::Up,
            Direction::Down,
        ] {
            let (dx, dy) = direction.delta();
            for distance in 1..radius {
                let Some(cell) = enemy
                    .position
                    .offset(dx * distance, dy * distance, width, height)
                else {
                    break;
                };
                if ctx.world.walls()[cell] != 0.0 {
                    break;
                }
                if ctx.world.danger()[cell] >= explosion
                    && i64::from(cell.manhattan_distance(unit.position)) <= max_distance
                {
                    let _ = cells.insert(cell);
                }
            }
        }
    }
    cells
}
