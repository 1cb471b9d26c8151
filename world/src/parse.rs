//! Snapshot ingestion. Steps run in a fixed order because later passes
//! read the grids earlier passes produce.

use bomberland_core::{
    blast_radius,
    wire::{EntityKind, EntityRecord},
    Bomb, Owner, Position, Powerup, PowerupKind, Snapshot, SnapshotError, Tuning, Unit, UnitId,
};
use tracing::debug;

use crate::{BombCluster, Occupant, World};

/// Radius of the occupation cross stamped around blocking cells.
const OCCUPATION_RADIUS: u32 = 2;

impl World {
    /// Builds the world for `snapshot` as seen by its connection's agent.
    pub fn parse(snapshot: &Snapshot, tuning: &Tuning) -> Result<World, SnapshotError> {
        let width = snapshot.world.width;
        let height = snapshot.world.height;
        if width == 0 || height == 0 {
            return Err(SnapshotError::EmptyBoard);
        }

        let mut world = World::empty(snapshot.tick, width, height, tuning.hazards.clone());
        world.parse_units(snapshot)?;
        world.stamp_borders();
        world.stamp_units();
        world.parse_entities(snapshot, tuning)?;
        world.raise_enemy_bomb_threats(tuning);
        world.penalise_enclosed_bomb_neighbours();
        world.build_clusters();

        debug!(
            tick = world.tick,
            my_units = world.my_units.len(),
            enemy_units = world.enemy_units.len(),
            bombs = world.bombs.len(),
            my_clusters = world.my_explosions.live_clusters().count(),
            enemy_clusters = world.enemy_explosions.live_clusters().count(),
            free_cells = world.free_from_endgame_fire(),
            "parsed world"
        );
        Ok(world)
    }

    fn parse_units(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let perspective = snapshot.perspective();
        let roster = snapshot
            .agents
            .get(perspective)
            .ok_or_else(|| SnapshotError::UnknownAgent(perspective.to_owned()))?;

        for id in &roster.unit_ids {
            let _ = self.roster.insert(UnitId::new(id.as_str()));
            self.parse_unit(snapshot, id, Owner::Mine)?;
        }
        for (agent, record) in &snapshot.agents {
            if agent == perspective {
                continue;
            }
            for id in &record.unit_ids {
                self.parse_unit(snapshot, id, Owner::Enemy)?;
            }
        }

        for enemy in &self.enemy_units {
            self.walkable[enemy.position] = f64::INFINITY;
            self.occupants[enemy.position] = Some(Occupant {
                id: enemy.id.clone(),
                owner: Owner::Enemy,
            });
        }
        for unit in &self.my_units {
            self.occupants[unit.position] = Some(Occupant {
                id: unit.id.clone(),
                owner: Owner::Mine,
            });
        }
        self.my_units.sort_by(|a, b| b.hp.cmp(&a.hp));
        Ok(())
    }

    fn parse_unit(
        &mut self,
        snapshot: &Snapshot,
        id: &str,
        owner: Owner,
    ) -> Result<(), SnapshotError> {
        let record = snapshot
            .unit_state
            .get(id)
            .ok_or_else(|| SnapshotError::MissingUnit(id.to_owned()))?;
        let [x, y] = record.coordinates;
        let position = self.locate("unit", x, y)?;

        if record.hp <= 0 {
            self.walls[position] = f64::INFINITY;
            self.walkable[position] = f64::INFINITY;
            self.dead_units[position] = true;
            return Ok(());
        }

        let unit = Unit {
            id: UnitId::new(id),
            owner,
            position,
            hp: record.hp,
            bombs: record.inventory.bombs,
            blast_diameter: record.blast_diameter,
            invulnerable_until: record.invulnerable,
            stunned_until: record.stunned,
        };
        match owner {
            Owner::Mine => self.my_units.push(unit),
            Owner::Enemy => self.enemy_units.push(unit),
        }
        Ok(())
    }

    fn locate(&self, what: &'static str, x: i64, y: i64) -> Result<Position, SnapshotError> {
        let out_of_bounds = || SnapshotError::OutOfBounds {
            what,
            x,
            y,
            width: self.width(),
            height: self.height(),
        };
        let column = u32::try_from(x).map_err(|_| out_of_bounds())?;
        let row = u32::try_from(y).map_err(|_| out_of_bounds())?;
        let position = Position::new(column, row);
        if !self.walls.contains(position) {
            return Err(out_of_bounds());
        }
        Ok(position)
    }

    fn stamp_borders(&mut self) {
        let close = self.hazards.close_cell_danger;
        let (right, top) = (self.width() - 1, self.height() - 1);
        for x in 0..self.width() {
            self.occupation[Position::new(x, 0)] = close;
            self.occupation[Position::new(x, top)] = close;
        }
        for y in 0..self.height() {
            self.occupation[Position::new(0, y)] = close;
            self.occupation[Position::new(right, y)] = close;
        }
    }

    fn stamp_units(&mut self) {
        let close = self.hazards.close_cell_danger;
        let mut cells: Vec<Position> = self
            .my_units
            .iter()
            .chain(&self.enemy_units)
            .map(|unit| unit.position)
            .collect();
        cells.extend(
            self.dead_units
                .iter()
                .filter(|(_, dead)| **dead)
                .map(|(position, _)| position),
        );
        for cell in cells {
            self.occupation.add_cross(cell, OCCUPATION_RADIUS, close);
        }
    }

    fn parse_entities(&mut self, snapshot: &Snapshot, tuning: &Tuning) -> Result<(), SnapshotError> {
        let close = self.hazards.close_cell_danger;
        for entity in &snapshot.entities {
            let pickup = match entity.kind {
                EntityKind::Unknown => continue,
                EntityKind::Ammo => Some(PowerupKind::Ammo),
                EntityKind::BlastPowerup => Some(PowerupKind::Blast),
                EntityKind::FreezePowerup => Some(PowerupKind::Freeze),
                _ => None,
            };
            let position = self.locate("entity", entity.x, entity.y)?;
            if let Some(kind) = pickup {
                self.powerups.push(Powerup {
                    position,
                    kind,
                    expires: entity.expires,
                });
                continue;
            }

            if entity.kind != EntityKind::Blast {
                self.walkable[position] = f64::INFINITY;
            }
            self.occupation.add_cross(position, OCCUPATION_RADIUS, close);

            match entity.kind {
                EntityKind::Bomb => self.parse_bomb(entity, position, tuning)?,
                EntityKind::Blast => {
                    if entity.expires.is_none() {
                        self.endgame_fire_count += 1;
                        self.endgame_fire[position] = true;
                    }
                    self.danger[position] = self.hazards.explosion_danger;
                }
                EntityKind::MetalBlock => self.walls[position] = f64::INFINITY,
                EntityKind::WoodenBlock | EntityKind::OreBlock => {
                    self.walls[position] = f64::from(entity.hp.unwrap_or(1).max(1));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_bomb(
        &mut self,
        entity: &EntityRecord,
        position: Position,
        tuning: &Tuning,
    ) -> Result<(), SnapshotError> {
        let missing = |field: &'static str| SnapshotError::MissingBombField {
            x: entity.x,
            y: entity.y,
            field,
        };
        let created = entity.created.ok_or_else(|| missing("created"))?;
        let expires = entity.expires.ok_or_else(|| missing("expires"))?;
        let owner_id = UnitId::new(entity.unit_id.as_deref().ok_or_else(|| missing("unit_id"))?);
        let blast_diameter = entity
            .blast_diameter
            .ok_or_else(|| missing("blast_diameter"))?;

        let bombs = &tuning.bombs;
        let tick = i64::from(self.tick);
        let age = tick - i64::from(created);
        let arming = i64::from(bombs.arming_ticks);
        let owner = self.unit(&owner_id);
        let armed = age > arming && owner.is_some_and(|unit| !unit.is_stunned_at(self.tick));
        let stunned_next_tick = owner.is_some_and(|unit| unit.is_stunned_at(self.tick + 1));

        let side = if self.roster.contains(&owner_id) {
            Owner::Mine
        } else {
            Owner::Enemy
        };
        let mut base = match side {
            Owner::Mine => bombs.my_starting_danger,
            Owner::Enemy => bombs.enemy_starting_danger,
        };
        if !armed {
            let arms_next_tick = age + 1 > arming && !stunned_next_tick;
            if !arms_next_tick {
                base *= match side {
                    Owner::Mine => bombs.unarmed_modifier_my,
                    Owner::Enemy => bombs.unarmed_modifier_enemy,
                };
            }
        }

        let expires_at = i64::from(expires);
        let ramp = i64::from(bombs.end_danger_ticks);
        let end_danger = if tick >= expires_at - ramp && ramp > 0 {
            let remaining = (expires_at - tick - 1) as f64;
            bombs.end_danger_max * (1.0 - remaining / ramp as f64)
        } else {
            0.0
        };
        let danger = base + end_danger;

        let index = self.bombs.len();
        let cluster = BombCluster {
            origin: position,
            danger,
            armed,
            mine: side == Owner::Mine,
            enemy: side == Owner::Enemy,
            ticks_till_explode: expires_at - tick,
            trigger: (side == Owner::Mine && armed).then_some(index),
        };
        self.my_explosions.seed(index, position, cluster.clone());
        self.enemy_explosions.seed(index, position, cluster);
        self.has_bomb[position] = true;
        self.bombs.push(Bomb {
            position,
            blast_diameter,
            owner: owner_id,
            side,
            created,
            expires,
            armed,
            danger,
        });
        Ok(())
    }

    /// An enemy standing in an explosion may still drop a bomb this tick.
    fn raise_enemy_bomb_threats(&mut self, tuning: &Tuning) {
        let threats: Vec<(Position, u32)> = self
            .enemy_units
            .iter()
            .filter(|enemy| self.danger[enemy.position] >= self.hazards.explosion_danger)
            .map(|enemy| (enemy.position, blast_radius(enemy.blast_diameter)))
            .collect();
        for (position, radius) in threats {
            self.mark_potential_explosion(position, radius, tuning.bombs.enemy_potential_danger);
        }
    }

    fn penalise_enclosed_bomb_neighbours(&mut self) {
        let close = self.hazards.close_cell_danger;
        let enclosed = self.hazards.enclosed_bomb_danger;
        let possibly = self.hazards.possibly_enclosed_bomb_danger;

        let mut penalties = Vec::new();
        for bomb in &self.bombs {
            for neighbour in self.danger.passable_neighbors(bomb.position, None) {
                let cramped = self.occupation[neighbour];
                if cramped >= 4.0 * close {
                    penalties.push((neighbour, enclosed));
                    continue;
                }
                if cramped < 3.0 * close - 0.001 {
                    continue;
                }
                for exit in self.danger.passable_neighbors(neighbour, None) {
                    if self.walkable[exit] != 0.0 {
                        continue;
                    }
                    if self
                        .danger
                        .neighbors(exit)
                        .any(|cell| self.is_enemy_at(cell))
                    {
                        penalties.push((neighbour, possibly));
                    }
                }
            }
        }
        for (cell, penalty) in penalties {
            self.danger[cell] += penalty;
        }
    }

    fn build_clusters(&mut self) {
        let mine: Vec<usize> = self.indices_of(Owner::Mine);
        let theirs: Vec<usize> = self.indices_of(Owner::Enemy);
        self.my_explosions.spread(
            &self.bombs,
            &mine,
            &self.walls,
            &self.dead_units,
            &self.has_bomb,
        );
        self.enemy_explosions.spread(
            &self.bombs,
            &theirs,
            &self.walls,
            &self.dead_units,
            &self.has_bomb,
        );

        let close = self.hazards.close_cell_danger;
        let covered: Vec<(Position, f64)> = self
            .danger
            .iter()
            .map(|(position, _)| {
                let mine = self.my_explosions.max_danger_at(position);
                let theirs = self.enemy_explosions.max_danger_at(position);
                (position, mine.max(theirs))
            })
            .filter(|&(_, danger)| danger != 0.0)
            .collect();
        for (position, danger) in covered {
            self.occupation.add_cross(position, OCCUPATION_RADIUS, close);
            self.danger[position] += danger;
        }
    }

    fn indices_of(&self, side: Owner) -> Vec<usize> {
        self.bombs
            .iter()
            .enumerate()
            .filter(|(_, bomb)| bomb.side == side)
            .map(|(index, _)| index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn snapshot(entities: serde_json::Value, tick: u32) -> Snapshot {
        serde_json::from_value(json!({
            "tick": tick,
            "connection": {"agent_id": "a"},
            "agents": {"a": {"unit_ids": ["c", "e"]}, "b": {"unit_ids": ["d", "f"]}},
            "unit_state": {
                "c": {"coordinates": [1, 1], "hp": 3, "inventory": {"bombs": 3}, "blast_diameter": 3},
                "e": {"coordinates": [5, 5], "hp": 0, "inventory": {"bombs": 3}, "blast_diameter": 3},
                "d": {"coordinates": [6, 1], "hp": 3, "inventory": {"bombs": 3}, "blast_diameter": 3,
                      "stunned": 20},
                "f": {"coordinates": [3, 6], "hp": 2, "inventory": {"bombs": 3}, "blast_diameter": 3}
            },
            "entities": entities,
            "world": {"width": 8, "height": 8}
        }))
        .expect("fixture snapshot")
    }

    #[test]
    fn dead_units_become_walls() {
        let world = World::parse(&snapshot(json!([]), 10), &Tuning::default()).expect("parses");

        assert_eq!(world.my_units().len(), 1);
        assert_eq!(world.enemy_units().len(), 2);
        assert!(world.is_dead_unit_at(Position::new(5, 5)));
        assert_eq!(world.walls()[Position::new(5, 5)], f64::INFINITY);
        assert_eq!(world.walkable()[Position::new(6, 1)], f64::INFINITY);
        assert_eq!(world.walkable()[Position::new(1, 1)], 0.0);
        assert!(world.roster().contains(&UnitId::new("e")));
    }

    #[test]
    fn bomb_danger_follows_arming_and_expiry() {
        let tuning = Tuning::default();
        let entities = json!([
            {"type": "b", "x": 1, "y": 3, "created": 0, "expires": 12, "unit_id": "c", "blast_diameter": 3},
            {"type": "b", "x": 4, "y": 3, "created": 8, "expires": 40, "unit_id": "c", "blast_diameter": 3},
            {"type": "b", "x": 6, "y": 3, "created": 0, "expires": 40, "unit_id": "d", "blast_diameter": 3}
        ]);
        let world = World::parse(&snapshot(entities, 10), &tuning).expect("parses");
        let bombs = world.bombs();

        assert!(bombs[0].armed);
        let ramp = 550.0 * (1.0 - 1.0 / 5.0);
        assert!((bombs[0].danger - (15.0 + ramp)).abs() < 1e-9);

        assert!(!bombs[1].armed);
        assert!((bombs[1].danger - 15.0 * 0.9).abs() < 1e-9);

        assert_eq!(bombs[2].side, Owner::Enemy);
        assert!(!bombs[2].armed, "stunned owners cannot arm");
        let enemy_base = 500.0 * (1.0 / 30.0 - 0.0001);
        assert!((bombs[2].danger - enemy_base).abs() < 1e-9);
        assert_eq!(world.my_armed_bombs().count(), 1);
    }

    #[test]
    fn bombs_arming_next_tick_keep_full_danger() {
        let entities = json!([
            {"type": "b", "x": 1, "y": 3, "created": 5, "expires": 40, "unit_id": "c", "blast_diameter": 3}
        ]);
        let world = World::parse(&snapshot(entities, 10), &Tuning::default()).expect("parses");

        assert!(!world.bombs()[0].armed);
        assert_eq!(world.bombs()[0].danger, 15.0);
    }

    #[test]
    fn permanent_fire_is_counted_and_dangerous() {
        let entities = json!([
            {"type": "x", "x": 0, "y": 0},
            {"type": "x", "x": 0, "y": 1},
            {"type": "x", "x": 2, "y": 2, "expires": 12}
        ]);
        let world = World::parse(&snapshot(entities, 10), &Tuning::default()).expect("parses");

        assert_eq!(world.endgame_fire_count(), 2);
        assert_eq!(world.free_from_endgame_fire(), 62);
        assert_eq!(world.danger()[Position::new(2, 2)], 100_000.0);
        assert_eq!(world.walkable()[Position::new(2, 2)], 0.0);
        assert!(!world.endgame_fire()[Position::new(2, 2)]);
    }

    #[test]
    fn enemies_standing_in_fire_threaten_their_blast() {
        let entities = json!([{"type": "x", "x": 3, "y": 6, "expires": 12}]);
        let world = World::parse(&snapshot(entities, 10), &Tuning::default()).expect("parses");

        assert_eq!(world.danger()[Position::new(3, 6)], 100_000.0);
        assert_eq!(world.danger()[Position::new(4, 6)], 100.0);
        assert_eq!(world.danger()[Position::new(3, 5)], 100.0);
        assert_eq!(world.danger()[Position::new(5, 6)], 0.0);
    }

    #[test]
    fn malformed_snapshots_are_rejected() {
        let missing_field = json!([{"type": "b", "x": 1, "y": 3, "created": 0, "unit_id": "c"}]);
        let error = World::parse(&snapshot(missing_field, 10), &Tuning::default())
            .expect_err("bomb without expiry");
        assert!(matches!(
            error,
            SnapshotError::MissingBombField {
                field: "expires",
                ..
            }
        ));

        let outside = json!([{"type": "m", "x": 8, "y": 0}]);
        let error = World::parse(&snapshot(outside, 10), &Tuning::default())
            .expect_err("entity off the board");
        assert!(matches!(error, SnapshotError::OutOfBounds { .. }));
    }

    #[test]
    fn explosion_cells_are_stamped_with_cluster_danger() {
        let entities = json!([
            {"type": "b", "x": 3, "y": 3, "created": 0, "expires": 40, "unit_id": "c", "blast_diameter": 3}
        ]);
        let world = World::parse(&snapshot(entities, 10), &Tuning::default()).expect("parses");

        for cell in [
            Position::new(3, 3),
            Position::new(2, 3),
            Position::new(4, 3),
            Position::new(3, 2),
            Position::new(3, 4),
        ] {
            assert!(world.danger()[cell] >= 15.0, "cell {cell:?}");
        }
        assert!(world.has_bomb(Position::new(3, 3)));
        assert_eq!(world.danger()[Position::new(5, 3)], 0.0);
        assert_eq!(world.walkable()[Position::new(3, 3)], f64::INFINITY);
    }
}
