//! Snapshot and packet shapes exchanged with the game server.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Action, Direction, UnitAction};

/// Full world state delivered once per tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Tick the snapshot describes.
    pub tick: u32,
    /// Identity of the agent this process plays as.
    pub connection: Connection,
    /// Unit rosters keyed by agent id.
    pub agents: BTreeMap<String, AgentRecord>,
    /// Per-unit state keyed by unit id.
    pub unit_state: BTreeMap<String, UnitRecord>,
    /// Flat list of bombs, blocks, blasts and pickups.
    pub entities: Vec<EntityRecord>,
    /// Board dimensions.
    pub world: BoardRecord,
}

impl Snapshot {
    /// Decodes a snapshot from its JSON text.
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Agent whose units are treated as ours.
    #[must_use]
    pub fn perspective(&self) -> &str {
        &self.connection.agent_id
    }
}

/// Connection metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Agent controlled by this connection.
    pub agent_id: String,
}

/// Units owned by one agent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Every unit the agent ever owned, dead or alive.
    pub unit_ids: Vec<String>,
}

/// Raw unit state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    /// `[x, y]` board coordinates.
    pub coordinates: [i64; 2],
    /// Remaining hit points; zero or less means dead.
    pub hp: i64,
    /// Carried items.
    pub inventory: Inventory,
    /// Diameter of the blasts this unit's bombs produce.
    pub blast_diameter: u32,
    /// Last tick of invulnerability.
    #[serde(default)]
    pub invulnerable: u32,
    /// Last tick of stun.
    #[serde(default)]
    pub stunned: u32,
}

/// Carried items.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Bombs the unit may still place.
    pub bombs: u32,
}

/// Board dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardRecord {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
}

/// Short entity type code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Ammunition pickup.
    #[serde(rename = "a")]
    Ammo,
    /// Placed bomb.
    #[serde(rename = "b")]
    Bomb,
    /// Active blast; permanent when it carries no expiry.
    #[serde(rename = "x")]
    Blast,
    /// Blast radius pickup.
    #[serde(rename = "bp")]
    BlastPowerup,
    /// Freeze pickup.
    #[serde(rename = "fp")]
    FreezePowerup,
    /// Indestructible block.
    #[serde(rename = "m")]
    MetalBlock,
    /// Multi-hit destructible block.
    #[serde(rename = "o")]
    OreBlock,
    /// Single-hit destructible block.
    #[serde(rename = "w")]
    WoodenBlock,
    /// Any code this agent does not model.
    #[serde(other)]
    Unknown,
}

/// Raw entity record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Entity type code.
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// Column.
    pub x: i64,
    /// Row.
    pub y: i64,
    /// Tick the entity appeared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<u32>,
    /// Tick the entity disappears.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<u32>,
    /// Owning unit, for bombs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    /// Blast diameter, for bombs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blast_diameter: Option<u32>,
    /// Remaining hit points, for blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp: Option<u32>,
}

/// Packet sent to the game server on behalf of one unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutgoingPacket {
    /// Step one cell.
    Move {
        /// Direction of the step.
        #[serde(rename = "move")]
        direction: Direction,
        /// Acting unit.
        unit_id: String,
    },
    /// Drop a bomb on the unit's cell.
    Bomb {
        /// Acting unit.
        unit_id: String,
    },
    /// Trigger an armed bomb.
    Detonate {
        /// `[x, y]` of the bomb.
        coordinates: [u32; 2],
        /// Owner of the bomb.
        unit_id: String,
    },
}

impl OutgoingPacket {
    /// Packet for `action`, or `None` for a no-op.
    #[must_use]
    pub fn from_action(action: &UnitAction) -> Option<Self> {
        let unit_id = action.unit.as_str().to_owned();
        match action.action {
            Action::Noop => None,
            Action::Move { direction, .. } => Some(OutgoingPacket::Move { direction, unit_id }),
            Action::PlaceBomb => Some(OutgoingPacket::Bomb { unit_id }),
            Action::Detonate { bomb } => Some(OutgoingPacket::Detonate {
                coordinates: [bomb.x(), bomb.y()],
                unit_id,
            }),
        }
    }
}

/// Reasons a snapshot cannot be turned into a world.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The text was not a valid snapshot document.
    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The perspective agent has no roster.
    #[error("agent `{0}` is missing from the agent roster")]
    UnknownAgent(String),
    /// A roster names a unit without state.
    #[error("unit `{0}` is listed by an agent but has no state")]
    MissingUnit(String),
    /// A unit or entity sits outside the board.
    #[error("{what} at ({x}, {y}) lies outside the {width}x{height} board")]
    OutOfBounds {
        /// What was being placed.
        what: &'static str,
        /// Column.
        x: i64,
        /// Row.
        y: i64,
        /// Board width.
        width: u32,
        /// Board height.
        height: u32,
    },
    /// A bomb entity lacks one of its required fields.
    #[error("bomb at ({x}, {y}) is missing `{field}`")]
    MissingBombField {
        /// Column.
        x: i64,
        /// Row.
        y: i64,
        /// Name of the absent field.
        field: &'static str,
    },
    /// The board has no cells.
    #[error("board has no cells")]
    EmptyBoard,
}
