//! Boards and contexts shared by the unit tests of this crate.

use bomberland_core::{Snapshot, Tuning};
use bomberland_system_search::{PathSearch, RetreatSearch};
use bomberland_world::{EndgameFireSimulator, World};
use serde_json::{json, Value};

use crate::{context::TickContext, state::CarriedState};

/// Snapshot of a `size` x `size` board seen by agent `a`, which owns
/// whichever of `c`, `e` and `g` appear in `units`; `d`, `f` and `h` belong
/// to agent `b`.
pub(crate) fn snapshot(tick: u32, size: u32, units: Value, entities: Value) -> Snapshot {
    let present = |ids: [&'static str; 3]| -> Vec<&'static str> {
        ids.into_iter()
            .filter(|id| units.get(*id).is_some())
            .collect()
    };
    let (mine, theirs) = (present(["c", "e", "g"]), present(["d", "f", "h"]));
    serde_json::from_value(json!({
        "tick": tick,
        "connection": {"agent_id": "a"},
        "agents": {"a": {"unit_ids": mine}, "b": {"unit_ids": theirs}},
        "unit_state": units,
        "entities": entities,
        "world": {"width": size, "height": size}
    }))
    .expect("fixture snapshot")
}

pub(crate) fn unit(x: u32, y: u32) -> Value {
    json!({"coordinates": [x, y], "hp": 3, "inventory": {"bombs": 3}, "blast_diameter": 5})
}

/// Everything a [`TickContext`] borrows.
pub(crate) struct Bench {
    tuning: Tuning,
    endgame: EndgameFireSimulator,
    paths: PathSearch,
    retreat: RetreatSearch,
}

impl Bench {
    pub(crate) fn new(size: u32) -> Self {
        let tuning = Tuning::default();
        let budget = tuning.search.budget_big;
        Self {
            tuning,
            endgame: EndgameFireSimulator::new(size, size),
            paths: PathSearch::new(),
            retreat: RetreatSearch::new(budget),
        }
    }

    pub(crate) fn context(&mut self, snapshot: &Snapshot) -> TickContext<'_> {
        self.context_with(snapshot, CarriedState::default())
    }

    pub(crate) fn context_with(
        &mut self,
        snapshot: &Snapshot,
        carried: CarriedState,
    ) -> TickContext<'_> {
        let world = World::parse(snapshot, &self.tuning).expect("fixture parses");
        TickContext::new(
            world,
            &self.tuning,
            &self.endgame,
            carried,
            &mut self.paths,
            &mut self.retreat,
        )
    }
}
