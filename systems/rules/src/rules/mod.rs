//! The ordered rule set run once per tick.

use std::{fmt, time::Instant};

use tracing::debug;

use crate::{
    cancel::{Cancelled, TickGuard},
    context::TickContext,
    state::TickPhase,
};

mod advance;
mod detonate;
mod path_to_center;
mod place_bombs;
mod retreat;
mod sacrifice;
mod spread;

/// One rule of the tick, run against the shared context.
pub(crate) type Rule = fn(&mut TickContext<'_>);

/// Rules in the order they claim units, cells and bombs.
pub(crate) const RULES: &[(&str, Rule)] = &[
    ("detonate", detonate::run),
    ("place bombs", place_bombs::run),
    ("self-sacrifice", sacrifice::run),
    ("path to center", path_to_center::run),
    ("spread", spread::run),
    ("retreat", retreat::run),
];

/// Ordered rule table an engine runs every tick.
#[derive(Clone, Copy)]
pub(crate) struct RuleSet(pub(crate) &'static [(&'static str, Rule)]);

impl Default for RuleSet {
    fn default() -> Self {
        Self(RULES)
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|(name, _)| name))
            .finish()
    }
}

/// Runs `rules` in order, checking for a newer tick before each one.
pub(crate) fn run(
    ctx: &mut TickContext<'_>,
    guard: &TickGuard,
    rules: RuleSet,
) -> Result<(), Cancelled> {
    for &(name, rule) in rules.0 {
        guard.checkpoint(TickPhase::RuleExecution)?;
        let started = Instant::now();
        rule(ctx);
        debug!(
            tick = ctx.tick(),
            rule = name,
            elapsed_us = started.elapsed().as_micros() as u64,
            actions = ctx.state.pending().len(),
            "rule finished"
        );
    }
    Ok(())
}
