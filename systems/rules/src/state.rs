//! Bookkeeping shared by the rules of one tick, and the few fields that
//! outlive it.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use bomberland_core::{Position, UnitAction, UnitId};

/// Stage of a tick computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TickPhase {
    /// No tick in flight.
    Idle,
    /// Building the world from the snapshot.
    Parsing,
    /// Running the ordered rule set.
    RuleExecution,
    /// Ordering pending moves so no two collide.
    ConflictResolution,
    /// Actions handed to the transport.
    Dispatched,
}

impl fmt::Display for TickPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TickPhase::Idle => "idle",
            TickPhase::Parsing => "parsing",
            TickPhase::RuleExecution => "rule execution",
            TickPhase::ConflictResolution => "conflict resolution",
            TickPhase::Dispatched => "dispatch",
        };
        f.write_str(name)
    }
}

/// Mutable bookkeeping threaded through the rules of a single tick.
#[derive(Clone, Debug, Default)]
pub struct TickState {
    busy: BTreeSet<UnitId>,
    pending: Vec<UnitAction>,
    claimed_cells: Vec<Position>,
    claimed_destinations: BTreeSet<Position>,
    blocked: BTreeSet<Position>,
    force_bomb: BTreeSet<UnitId>,
    active_bombs: usize,
}

impl TickState {
    pub(crate) fn new(
        blocked: BTreeSet<Position>,
        force_bomb: BTreeSet<UnitId>,
        active_bombs: usize,
    ) -> Self {
        Self {
            blocked,
            force_bomb,
            active_bombs,
            ..Self::default()
        }
    }

    /// Units that already received an action this tick.
    #[must_use]
    pub fn busy(&self) -> &BTreeSet<UnitId> {
        &self.busy
    }

    /// Reports whether `unit` already received an action this tick.
    #[must_use]
    pub fn is_busy(&self, unit: &UnitId) -> bool {
        self.busy.contains(unit)
    }

    /// Actions in the order the rules produced them.
    #[must_use]
    pub fn pending(&self) -> &[UnitAction] {
        &self.pending
    }

    /// Cells units will stand on after their move, in claim order.
    #[must_use]
    pub fn claimed_cells(&self) -> &[Position] {
        &self.claimed_cells
    }

    /// Retreat destinations already chosen by earlier units.
    #[must_use]
    pub fn claimed_destinations(&self) -> &BTreeSet<Position> {
        &self.claimed_destinations
    }

    /// Cells a unit failed to enter last tick while an enemy contested them.
    #[must_use]
    pub fn blocked(&self) -> &BTreeSet<Position> {
        &self.blocked
    }

    /// Units the previous tick asked to bomb regardless of the usual checks.
    #[must_use]
    pub fn force_bomb(&self) -> &BTreeSet<UnitId> {
        &self.force_bomb
    }

    /// Our bombs on the board plus the ones placed this tick.
    #[must_use]
    pub const fn active_bombs(&self) -> usize {
        self.active_bombs
    }

    pub(crate) fn push(&mut self, action: UnitAction) {
        let _ = self.busy.insert(action.unit.clone());
        self.pending.push(action);
    }

    pub(crate) fn claim_cell(&mut self, cell: Position) {
        self.claimed_cells.push(cell);
    }

    pub(crate) fn is_claimed(&self, cell: Position) -> bool {
        self.claimed_cells.contains(&cell)
    }

    pub(crate) fn claim_destination(&mut self, cell: Position) {
        let _ = self.claimed_destinations.insert(cell);
    }

    pub(crate) fn count_bomb(&mut self) {
        self.active_bombs += 1;
    }

    pub(crate) fn into_pending(self) -> Vec<UnitAction> {
        self.pending
    }
}

/// Fields that survive from one successful tick to the next.
///
/// The engine works on a copy and only replaces its own once a tick
/// completes, so a cancelled tick leaves no trace here.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CarriedState {
    pub(crate) previous_targets: BTreeMap<UnitId, Position>,
    pub(crate) opposite_half_targets: BTreeMap<UnitId, Position>,
    pub(crate) force_bomb: BTreeSet<UnitId>,
}

impl CarriedState {
    /// Cell each unit was sent to on the previous tick.
    #[must_use]
    pub fn previous_targets(&self) -> &BTreeMap<UnitId, Position> {
        &self.previous_targets
    }

    /// Multi-tick objectives on the other half of the board.
    #[must_use]
    pub fn opposite_half_targets(&self) -> &BTreeMap<UnitId, Position> {
        &self.opposite_half_targets
    }

    /// Units that must bomb on the next tick.
    #[must_use]
    pub fn force_bomb(&self) -> &BTreeSet<UnitId> {
        &self.force_bomb
    }
}
