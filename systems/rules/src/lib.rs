#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Rule-based tactics for one Bomberland agent.
//!
//! Every tick the [`RuleEngine`] parses a fresh world, derives the shared
//! state map and runs a fixed, ordered rule set: detonate, place bombs,
//! self-sacrifice, path to center, spread and finally retreat. Each rule
//! skips units that already received an action, so earlier rules win. The
//! resulting moves are ordered so no unit steps onto a teammate's cell.
//!
//! Computations are cooperative: a [`TickGuard`] is checked between phases
//! and rules, and a tick superseded by a newer snapshot is abandoned without
//! touching the state the engine carries between ticks. [`TickScheduler`]
//! wires this up on a worker thread.

mod cancel;
mod context;
mod engine;
#[cfg(test)]
mod fixture;
mod resolve;
mod rules;
mod scheduler;
mod state;

pub use cancel::{Cancelled, LiveTick, TickGuard};
pub use engine::{RuleEngine, TickError, TickOutcome};
pub use resolve::resolve_conflicts;
pub use scheduler::{TickDispatch, TickScheduler};
pub use state::{CarriedState, TickPhase, TickState};
