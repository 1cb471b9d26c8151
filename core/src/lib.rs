#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Bomberland agent.
//!
//! This crate defines the vocabulary every other crate speaks: board
//! [`Position`]s and dense [`Grid`]s, the parsed [`Unit`] and [`Bomb`]
//! records, the per-unit [`Action`]s the rule engine emits, the raw
//! [`wire`] shapes exchanged with the game server and the [`tuning`]
//! constants that shape every danger and search decision.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod grid;
pub mod tuning;
pub mod wire;

pub use grid::{CostGrid, Direction, Grid, Position};
pub use tuning::Tuning;
pub use wire::{OutgoingPacket, Snapshot, SnapshotError};

/// Radius covered by a blast of the provided diameter.
///
/// Explosion rays reach offsets `1..radius` along each axis.
#[must_use]
pub const fn blast_radius(diameter: u32) -> u32 {
    diameter.saturating_add(1) / 2
}

/// Identifier of a unit as assigned by the game server.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(String);

impl UnitId {
    /// Creates a new unit identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrowed textual form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Side a unit or bomb belongs to, relative to the controlling agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Controlled by this agent.
    Mine,
    /// Controlled by any other agent.
    Enemy,
}

/// Living unit parsed from a snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
    /// Server-assigned identifier.
    pub id: UnitId,
    /// Side the unit fights for.
    pub owner: Owner,
    /// Current cell.
    pub position: Position,
    /// Remaining hit points.
    pub hp: i64,
    /// Bombs still in the inventory.
    pub bombs: u32,
    /// Diameter of this unit's blasts.
    pub blast_diameter: u32,
    /// Last tick of invulnerability.
    pub invulnerable_until: u32,
    /// Last tick of stun.
    pub stunned_until: u32,
}

impl Unit {
    /// Radius of this unit's blasts.
    #[must_use]
    pub const fn blast_radius(&self) -> u32 {
        blast_radius(self.blast_diameter)
    }

    /// Reports whether the unit is still invulnerable after `tick`.
    #[must_use]
    pub const fn is_invulnerable_after(&self, tick: u32) -> bool {
        self.invulnerable_until > tick
    }

    /// Reports whether the unit is stunned on `tick`.
    #[must_use]
    pub const fn is_stunned_at(&self, tick: u32) -> bool {
        self.stunned_until != 0 && self.stunned_until >= tick
    }
}

/// Bomb parsed from a snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Bomb {
    /// Cell holding the bomb.
    pub position: Position,
    /// Diameter of the blast.
    pub blast_diameter: u32,
    /// Unit that placed the bomb.
    pub owner: UnitId,
    /// Side of the placing unit.
    pub side: Owner,
    /// Tick of placement.
    pub created: u32,
    /// Tick at which the bomb explodes on its own.
    pub expires: u32,
    /// Whether the owner can detonate the bomb right now.
    pub armed: bool,
    /// Danger the bomb contributes on its own, before clustering.
    pub danger: f64,
}

impl Bomb {
    /// Radius of the blast.
    #[must_use]
    pub const fn blast_radius(&self) -> u32 {
        blast_radius(self.blast_diameter)
    }
}

/// Pickup category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PowerupKind {
    /// Extra bomb.
    Ammo,
    /// Larger blast diameter.
    Blast,
    /// Stuns whoever is hit.
    Freeze,
}

/// Pickup lying on the board.
#[derive(Clone, Debug, PartialEq)]
pub struct Powerup {
    /// Cell holding the pickup.
    pub position: Position,
    /// Pickup category.
    pub kind: PowerupKind,
    /// Tick at which the pickup vanishes, if any.
    pub expires: Option<u32>,
}

/// Decision taken for a single unit during a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Stay put.
    Noop,
    /// Step one cell.
    Move {
        /// Direction of the step.
        direction: Direction,
        /// Cell the unit expects to occupy afterwards.
        target: Position,
    },
    /// Drop a bomb on the current cell.
    PlaceBomb,
    /// Trigger an armed bomb.
    Detonate {
        /// Cell of the bomb to trigger.
        bomb: Position,
    },
}

impl Action {
    /// Destination cell of a move.
    #[must_use]
    pub const fn move_target(&self) -> Option<Position> {
        match self {
            Action::Move { target, .. } => Some(*target),
            _ => None,
        }
    }
}

/// Action bound to the unit that performs it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitAction {
    /// Acting unit.
    pub unit: UnitId,
    /// Chosen action.
    pub action: Action,
}

impl UnitAction {
    /// Binds `action` to `unit`.
    #[must_use]
    pub const fn new(unit: UnitId, action: Action) -> Self {
        Self { unit, action }
    }
}
