//! Tunable constants consumed by the parser, the searches and the rules.
//!
//! Every group deserialises with `#[serde(default)]`, so a configuration file
//! only needs to name the knobs it changes.

use serde::{Deserialize, Serialize};

/// Aggregated tuning knobs for the whole decision pipeline.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Frontier budgets and planning horizon.
    pub search: SearchTuning,
    /// Shrinking safe-zone weighting.
    pub endgame: EndgameTuning,
    /// Bomb danger shaping and bomb limits.
    pub bombs: BombTuning,
    /// Hazard magnitudes stamped into the danger grids.
    pub hazards: HazardTuning,
    /// Negative costs that attract units to useful cells.
    pub discounts: DiscountTuning,
}

/// Retreat search limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchTuning {
    /// Frontier pops allowed when the previous tick completed.
    pub budget_big: usize,
    /// Frontier pops allowed right after a cancelled tick.
    pub budget_small: usize,
    /// Number of ticks a unit is assumed to dwell on its destination.
    pub horizon: u32,
    /// Extra stay cost for destinations already chosen by another unit.
    pub exclude_point_stay_cost: f64,
}

impl Default for SearchTuning {
    fn default() -> Self {
        Self {
            budget_big: 50,
            budget_small: 25,
            horizon: 30,
            exclude_point_stay_cost: 10.0,
        }
    }
}

/// Endgame fire weighting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndgameTuning {
    /// Danger multiplier while no permanent fire is on the board.
    pub base_multiplier: f64,
    /// Danger multiplier once permanent fire has appeared.
    pub active_multiplier: f64,
    /// Discount on the exact center, multiplied by the unit's hp.
    pub center_discount: f64,
    /// Discount on the 3x3 block around the center.
    pub center_discount_mass: f64,
    /// Center discounts only apply to retreat maps after this tick.
    pub center_pull_after_tick: u32,
    /// Free cells left at which the center holder stops chasing enemies.
    pub holder_ignores_enemies_free_cells: u32,
    /// Units spread to opposite halves only while more free cells remain.
    pub spread_min_free_cells: u32,
    /// Free cells left at which the center holder is bombed at any cost.
    pub endgame_bomb_free_cells: u32,
}

impl Default for EndgameTuning {
    fn default() -> Self {
        Self {
            base_multiplier: 0.1,
            active_multiplier: 40.0,
            center_discount: -0.2,
            center_discount_mass: -0.2,
            center_pull_after_tick: 270,
            holder_ignores_enemies_free_cells: 81,
            spread_min_free_cells: 49,
            endgame_bomb_free_cells: 25,
        }
    }
}

/// Bomb danger shaping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BombTuning {
    /// Base danger of a bomb placed by one of our units.
    pub my_starting_danger: f64,
    /// Base danger of an enemy bomb.
    pub enemy_starting_danger: f64,
    /// Danger raised around an enemy that may drop a bomb this tick.
    pub enemy_potential_danger: f64,
    /// Ticks before expiry at which the end danger starts to ramp.
    pub end_danger_ticks: u32,
    /// End danger reached on the tick before expiry.
    pub end_danger_max: f64,
    /// Base danger factor for our unarmed bombs.
    pub unarmed_modifier_my: f64,
    /// Base danger factor for unarmed enemy bombs.
    pub unarmed_modifier_enemy: f64,
    /// Ticks a bomb needs after placement before it can be detonated.
    pub arming_ticks: u32,
    /// Maximum number of our bombs on the board at once.
    pub max_active_bombs: usize,
}

impl Default for BombTuning {
    fn default() -> Self {
        Self {
            my_starting_danger: 15.0,
            enemy_starting_danger: 500.0,
            enemy_potential_danger: 100.0,
            end_danger_ticks: 5,
            end_danger_max: 550.0,
            unarmed_modifier_my: 0.9,
            unarmed_modifier_enemy: 1.0 / 30.0 - 0.0001,
            arming_ticks: 5,
            max_active_bombs: 3,
        }
    }
}

/// Hazard magnitudes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardTuning {
    /// Occupation penalty stamped around every blocking cell.
    pub close_cell_danger: f64,
    /// Danger of a cell covered by an active or imminent explosion.
    pub explosion_danger: f64,
    /// Cost substituted for the unit's own cell when it is impassable.
    pub stand_on_bomb_danger: f64,
    /// Penalty for a bomb neighbour that is boxed in on every side.
    pub enclosed_bomb_danger: f64,
    /// Penalty for a bomb neighbour that an enemy could box in.
    pub possibly_enclosed_bomb_danger: f64,
    /// Cost of stepping onto an ally's cell when the ally can make room.
    pub move_on_occupied_spot_penalty: f64,
    /// Flat cost added to every cell of the state map.
    pub base_cell_cost: f64,
}

impl Default for HazardTuning {
    fn default() -> Self {
        Self {
            close_cell_danger: 0.1,
            explosion_danger: 100_000.0,
            stand_on_bomb_danger: 999.0,
            enclosed_bomb_danger: 1_004.0,
            possibly_enclosed_bomb_danger: 994.0,
            move_on_occupied_spot_penalty: 14.0,
            base_cell_cost: 4.0,
        }
    }
}

/// Negative costs attracting units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscountTuning {
    /// Applied to powerup cells for units not holding the center.
    pub power_up: f64,
    /// Cross stamped around enemies for units that are not in danger.
    pub close_enemy: f64,
    /// Applied around a unit when an enemy is closer to the center.
    pub close_to_center_enemy: f64,
    /// Applied to powerups for an empty-handed unit while the enemy holds the center.
    pub center_occupied_ammo: f64,
    /// Applied to safe cells next to an enemy standing in danger.
    pub enemy_in_danger: f64,
    /// Extra discount when an endangered enemy has a single way out.
    pub enemy_in_danger_one_cell: f64,
}

impl Default for DiscountTuning {
    fn default() -> Self {
        Self {
            power_up: -0.5,
            close_enemy: -0.2,
            close_to_center_enemy: -2.0,
            center_occupied_ammo: 0.1,
            enemy_in_danger: -0.1,
            enemy_in_danger_one_cell: -0.5,
        }
    }
}
