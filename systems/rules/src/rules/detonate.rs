use bomberland_core::{Action, Position};
use bomberland_world::ClusterId;
use tracing::debug;

use crate::context::TickContext;

/// Detonates our clusters wherever an enemy stands inside one.
pub(super) fn run(ctx: &mut TickContext<'_>) {
    let targets: Vec<Position> = ctx
        .world
        .enemy_units()
        .iter()
        .map(|enemy| enemy.position)
        .collect();
    for target in targets {
        let _ = detonate_if_worth_it(ctx, target, false);
    }
}

/// Triggers the first of our armed clusters covering `position` whose blast
/// would hurt the enemy more than us. Returns whether a detonation was issued.
pub(super) fn detonate_if_worth_it(
    ctx: &mut TickContext<'_>,
    position: Position,
    blow_if_equal: bool,
) -> bool {
    let mut clusters: Vec<ClusterId> = Vec::new();
    for id in ctx.world.my_explosions().clusters_at(position) {
        if !clusters.contains(&id) {
            clusters.push(id);
        }
    }

    for id in clusters {
        let explosions = ctx.world.my_explosions();
        let Some(trigger) = explosions.cluster(id).and_then(|cluster| cluster.trigger) else {
            continue;
        };
        let Some(bomb) = ctx.world.bombs().get(trigger) else {
            continue;
        };

        let enemies: f64 = ctx
            .world
            .enemy_units()
            .iter()
            .filter(|unit| explosions.covers(unit.position, id))
            .map(|unit| ctx.weight(unit))
            .sum();
        let mine: f64 = ctx
            .world
            .my_units()
            .iter()
            .filter(|unit| explosions.covers(unit.position, id))
            .map(|unit| ctx.weight(unit))
            .sum();
        if !(mine < enemies || (mine == enemies && blow_if_equal)) {
            continue;
        }
        if ctx.is_busy(&bomb.owner) {
            continue;
        }

        let (owner, bomb_at) = (bomb.owner.clone(), bomb.position);
        let cells = explosions.cells_of(id);
        debug!(
            tick = ctx.tick(),
            owner = %owner,
            enemies,
            mine,
            cells = cells.len(),
            "detonating cluster"
        );
        ctx.execute(&owner, Action::Detonate { bomb: bomb_at });
        ctx.mark_detonation(&cells);
        return true;
    }
    false
}
