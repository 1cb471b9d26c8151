//! Turns one snapshot into one set of unit actions.

use std::time::Instant;

use bomberland_core::{OutgoingPacket, Snapshot, SnapshotError, Tuning, UnitAction};
use bomberland_system_search::{PathSearch, RetreatSearch};
use bomberland_world::{EndgameFireSimulator, World};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    cancel::{Cancelled, TickGuard},
    context::TickContext,
    resolve::resolve_conflicts,
    rules::{self, RuleSet},
    state::{CarriedState, TickPhase},
};

/// Actions chosen for one tick, already ordered for dispatch.
#[derive(Clone, Debug, PartialEq)]
pub struct TickOutcome {
    /// Tick the actions answer.
    pub tick: u32,
    /// At most one action per unit, in dispatch order.
    pub actions: Vec<UnitAction>,
    /// Retreat search budget the tick ran with.
    pub budget: usize,
}

impl TickOutcome {
    /// Wire packets for every action that is not a no-op.
    #[must_use]
    pub fn packets(&self) -> Vec<OutgoingPacket> {
        self.actions
            .iter()
            .filter_map(OutgoingPacket::from_action)
            .collect()
    }
}

/// Reasons a tick produced no actions.
#[derive(Debug, Error)]
pub enum TickError {
    /// The snapshot could not be turned into a world.
    #[error("malformed snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
    /// A newer tick arrived before this one finished.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Rule-based decision engine holding everything that outlives a tick.
///
/// The carried state is only replaced once a tick runs to completion, so a
/// cancelled or failed tick leaves the engine exactly as it found it.
#[derive(Debug)]
pub struct RuleEngine {
    tuning: Tuning,
    endgame: Option<EndgameFireSimulator>,
    carried: CarriedState,
    paths: PathSearch,
    retreat: RetreatSearch,
    phase: TickPhase,
    last_cancelled: bool,
    rules: RuleSet,
}

impl RuleEngine {
    /// Creates an engine with empty carried state.
    #[must_use]
    pub fn new(tuning: Tuning) -> Self {
        let budget = tuning.search.budget_big;
        Self {
            tuning,
            endgame: None,
            carried: CarriedState::default(),
            paths: PathSearch::new(),
            retreat: RetreatSearch::new(budget),
            phase: TickPhase::Idle,
            last_cancelled: false,
            rules: RuleSet::default(),
        }
    }

    /// Tuning the engine runs with.
    #[must_use]
    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Phase of the tick in flight, or of the last one.
    #[must_use]
    pub const fn phase(&self) -> TickPhase {
        self.phase
    }

    /// State carried over from the last completed tick.
    #[must_use]
    pub fn carried(&self) -> &CarriedState {
        &self.carried
    }

    /// Computes the actions for `snapshot`.
    ///
    /// Fails with [`TickError::Cancelled`] as soon as `guard` reports a newer
    /// tick. The retreat search runs with the small budget right after a
    /// cancelled tick and with the big one otherwise.
    pub fn tick(&mut self, snapshot: &Snapshot, guard: &TickGuard) -> Result<TickOutcome, TickError> {
        let started = Instant::now();
        let budget = if self.last_cancelled {
            self.tuning.search.budget_small
        } else {
            self.tuning.search.budget_big
        };
        self.retreat.set_budget(budget);

        let result = self.compute(snapshot, guard, budget);
        match &result {
            Ok(outcome) => {
                self.last_cancelled = false;
                info!(
                    tick = outcome.tick,
                    actions = outcome.actions.len(),
                    budget,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "tick computed"
                );
            }
            Err(TickError::Cancelled(cancelled)) => {
                self.last_cancelled = true;
                self.phase = TickPhase::Idle;
                debug!(
                    tick = cancelled.tick,
                    live = cancelled.live,
                    phase = %cancelled.phase,
                    "tick cancelled"
                );
            }
            Err(TickError::Snapshot(_)) => {
                self.phase = TickPhase::Idle;
            }
        }
        result
    }

    fn compute(
        &mut self,
        snapshot: &Snapshot,
        guard: &TickGuard,
        budget: usize,
    ) -> Result<TickOutcome, TickError> {
        self.phase = TickPhase::Parsing;
        guard.checkpoint(TickPhase::Parsing)?;
        let parsed = Instant::now();
        let world = World::parse(snapshot, &self.tuning)?;
        debug!(
            tick = snapshot.tick,
            elapsed_us = parsed.elapsed().as_micros() as u64,
            "snapshot parsed"
        );

        let (width, height) = (world.width(), world.height());
        if self
            .endgame
            .as_ref()
            .is_some_and(|sim| sim.width() != width || sim.height() != height)
        {
            self.endgame = None;
        }
        let endgame = &*self
            .endgame
            .get_or_insert_with(|| EndgameFireSimulator::new(width, height));

        self.phase = TickPhase::RuleExecution;
        let rule_set = self.rules;
        let mut ctx = TickContext::new(
            world,
            &self.tuning,
            endgame,
            self.carried.clone(),
            &mut self.paths,
            &mut self.retreat,
        );
        rules::run(&mut ctx, guard, rule_set)?;

        self.phase = TickPhase::ConflictResolution;
        let (positions, pending, carried) = ctx.finish();
        let actions = resolve_conflicts(pending, positions);
        guard.checkpoint(TickPhase::ConflictResolution)?;

        self.phase = TickPhase::Dispatched;
        self.carried = carried;
        Ok(TickOutcome {
            tick: snapshot.tick,
            actions,
            budget,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        cancel::LiveTick,
        fixture::{snapshot, unit},
        rules::Rule,
    };

    thread_local! {
        static LIVE: LiveTick = LiveTick::new();
    }

    fn guard_for(tick: u32) -> TickGuard {
        LIVE.with(|live| {
            live.advance(tick);
            live.guard(tick)
        })
    }

    /// Scribbles on the carried state, then lets the next tick arrive.
    fn supersede(ctx: &mut TickContext<'_>) {
        let _ = ctx.carried.force_bomb.insert(bomberland_core::UnitId::new("c"));
        let next = ctx.tick() + 1;
        LIVE.with(|live| live.advance(next));
    }

    fn unreachable_rule(_: &mut TickContext<'_>) {
        panic!("no rule runs once the tick is stale");
    }

    const MID_RULES: &[(&str, Rule)] = &[("supersede", supersede), ("after", unreachable_rule)];
    const LAST_RULE: &[(&str, Rule)] = &[("supersede", supersede)];

    fn board(tick: u32, size: u32) -> Snapshot {
        snapshot(
            tick,
            size,
            json!({"c": unit(1, 1), "d": unit(size - 2, size - 2)}),
            json!([]),
        )
    }

    #[test]
    fn ticks_superseded_between_rules_stop_before_the_next_rule() {
        let mut engine = RuleEngine::new(Tuning::default());
        engine.rules = RuleSet(MID_RULES);

        let result = engine.tick(&board(5, 9), &guard_for(5));

        match result {
            Err(TickError::Cancelled(cancelled)) => {
                assert_eq!(cancelled.phase, TickPhase::RuleExecution);
                assert_eq!((cancelled.tick, cancelled.live), (5, 6));
            }
            other => panic!("expected a cancelled tick, got {other:?}"),
        }
        assert_eq!(engine.phase(), TickPhase::Idle);
        assert_eq!(engine.carried(), &CarriedState::default());
    }

    #[test]
    fn ticks_superseded_after_the_last_rule_stop_at_conflict_resolution() {
        let mut engine = RuleEngine::new(Tuning::default());
        engine.rules = RuleSet(LAST_RULE);

        let result = engine.tick(&board(5, 9), &guard_for(5));

        match result {
            Err(TickError::Cancelled(cancelled)) => {
                assert_eq!(cancelled.phase, TickPhase::ConflictResolution);
            }
            other => panic!("expected a cancelled tick, got {other:?}"),
        }
        assert_eq!(engine.phase(), TickPhase::Idle);
        assert_eq!(engine.carried(), &CarriedState::default());

        engine.rules = RuleSet::default();
        let outcome = engine
            .tick(&board(6, 9), &guard_for(6))
            .expect("live tick completes");
        assert_eq!(outcome.budget, engine.tuning().search.budget_small);
    }

    #[test]
    fn the_endgame_simulator_follows_the_board_size() {
        let mut engine = RuleEngine::new(Tuning::default());
        let size = |engine: &RuleEngine| {
            engine
                .endgame
                .as_ref()
                .map(|sim| (sim.width(), sim.height()))
        };

        let _ = engine.tick(&board(1, 9), &guard_for(1)).expect("9x9 tick");
        assert_eq!(size(&engine), Some((9, 9)));

        let _ = engine.tick(&board(2, 7), &guard_for(2)).expect("7x7 tick");
        assert_eq!(size(&engine), Some((7, 7)));
        assert_eq!(engine.phase(), TickPhase::Dispatched);
    }
}
