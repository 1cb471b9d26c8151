//! Cooperative cancellation of superseded ticks.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use thiserror::Error;

use crate::state::TickPhase;

/// Shared counter holding the newest tick the transport has delivered.
///
/// Clones observe the same counter. The transport advances it; computations
/// compare it against the tick they started for at every checkpoint.
#[derive(Clone, Debug, Default)]
pub struct LiveTick {
    current: Arc<AtomicU32>,
}

impl LiveTick {
    /// Creates a counter starting at tick `0`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `tick` as the live tick.
    pub fn advance(&self, tick: u32) {
        self.current.store(tick, Ordering::SeqCst);
    }

    /// Newest published tick.
    #[must_use]
    pub fn current(&self) -> u32 {
        self.current.load(Ordering::SeqCst)
    }

    /// Guard for a computation targeting `tick`.
    #[must_use]
    pub fn guard(&self, tick: u32) -> TickGuard {
        TickGuard {
            live: self.clone(),
            tick,
        }
    }
}

/// Staleness check carried through one tick's computation.
#[derive(Clone, Debug)]
pub struct TickGuard {
    live: LiveTick,
    tick: u32,
}

impl TickGuard {
    /// Tick the guarded computation targets.
    #[must_use]
    pub const fn tick(&self) -> u32 {
        self.tick
    }

    /// Reports whether the guarded tick is still the live one.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.current() == self.tick
    }

    /// Fails with [`Cancelled`] once a newer tick has been published.
    pub fn checkpoint(&self, phase: TickPhase) -> Result<(), Cancelled> {
        let live = self.live.current();
        if live == self.tick {
            Ok(())
        } else {
            Err(Cancelled {
                tick: self.tick,
                live,
                phase,
            })
        }
    }
}

/// A tick computation noticed it was superseded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("tick {tick} superseded by tick {live} during {phase}")]
pub struct Cancelled {
    /// Tick the computation targeted.
    pub tick: u32,
    /// Live tick observed at the checkpoint.
    pub live: u32,
    /// Phase in which staleness was observed.
    pub phase: TickPhase,
}
