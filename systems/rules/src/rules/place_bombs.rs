use tracing::debug;

use crate::context::TickContext;

/// Drops bombs where they trap or pressure an enemy, at most one per unit.
pub(super) fn run(ctx: &mut TickContext<'_>) {
    let tick = ctx.tick();
    let tuning = ctx.tuning;
    let units = ctx.world.my_units().to_vec();

    for unit in &units {
        if ctx.state.active_bombs() >= tuning.bombs.max_active_bombs {
            debug!(tick, active = ctx.state.active_bombs(), "bomb limit reached");
            return;
        }
        if ctx.is_busy(&unit.id) || unit.bombs == 0 || ctx.world.has_bomb(unit.position) {
            continue;
        }

        let radius = unit.blast_radius();
        let target = ctx
            .world
            .can_hit_enemy(unit)
            .filter(|enemy| !enemy.is_invulnerable_after(tick))
            .map(|enemy| enemy.position);

        if ctx.standings.enemy_holds_center()
            && ctx.world.free_from_endgame_fire() <= tuning.endgame.endgame_bomb_free_cells
            && target.is_some()
        {
            ctx.place_bomb(&unit.id);
            continue;
        }

        if ctx.is_my_unit_near(unit.position, false) {
            continue;
        }

        if unit.is_invulnerable_after(tick)
            && ctx.world.danger()[unit.position] >= tuning.hazards.explosion_danger - 4.0
            && target.is_some()
        {
            ctx.place_bomb(&unit.id);
            ctx.mark_fresh_bomb(unit.position, radius);
            continue;
        }

        let forced = ctx.state.force_bomb().contains(&unit.id);
        if ctx.standings.is_overall(&unit.id) && !forced {
            continue;
        }
        if !ctx.world.check_free(unit.position, radius + 1, radius, None) {
            continue;
        }
        let enemy_blast_here = {
            let enemy = ctx.world.enemy_explosions();
            enemy
                .clusters_at(unit.position)
                .any(|id| enemy.cluster(id).is_some_and(|cluster| cluster.enemy))
        };
        if enemy_blast_here {
            continue;
        }

        if !ctx.is_my_unit_near(unit.position, !forced) {
            let adjacent_enemy = ctx
                .world
                .enemy_units()
                .iter()
                .any(|enemy| enemy.position.manhattan_distance(unit.position) == 1);
            if forced || adjacent_enemy {
                ctx.place_bomb(&unit.id);
                continue;
            }
        }

        if let Some(enemy_at) = target {
            let approach = ctx.paths.run(ctx.world.danger(), unit.position, enemy_at);
            if approach.cost > 0.0 && approach.is_reachable() {
                ctx.place_bomb(&unit.id);
            }
        }
    }
}
