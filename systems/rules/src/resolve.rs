//! Ordering of pending moves so no unit steps onto a teammate's cell.

use std::collections::BTreeMap;

use bomberland_core::{Position, UnitAction, UnitId};
use tracing::debug;

/// Emits `pending` in an order in which no move targets a cell another of
/// our units still stands on.
///
/// Moves whose target is occupied are deferred to a later pass and re-tried
/// once the occupant has moved away. Moves that still collide when a pass
/// makes no progress, such as two units swapping cells, are dropped.
/// Non-move actions are always emitted.
#[must_use]
pub fn resolve_conflicts(
    pending: Vec<UnitAction>,
    mut positions: BTreeMap<UnitId, Position>,
) -> Vec<UnitAction> {
    let mut ordered = Vec::with_capacity(pending.len());
    let mut remaining = pending;

    while !remaining.is_empty() {
        let before = remaining.len();
        let mut deferred = Vec::new();
        for action in remaining {
            let Some(target) = action.action.move_target() else {
                ordered.push(action);
                continue;
            };
            if positions.values().any(|&occupied| occupied == target) {
                deferred.push(action);
                continue;
            }
            let _ = positions.insert(action.unit.clone(), target);
            ordered.push(action);
        }
        if deferred.len() == before {
            for dropped in &deferred {
                debug!(unit = %dropped.unit, action = ?dropped.action, "dropping colliding move");
            }
            break;
        }
        remaining = deferred;
    }
    ordered
}
