use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use bomberland_core::{
    Action, OutgoingPacket, Position, Snapshot, Tuning, UnitAction, UnitId,
};
use bomberland_system_rules::{
    Cancelled, LiveTick, RuleEngine, TickError, TickPhase, TickScheduler,
};
use bomberland_world::World;
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Value};

fn snapshot(tick: u32, units: Value, entities: Value) -> Snapshot {
    serde_json::from_value(json!({
        "tick": tick,
        "connection": {"agent_id": "a"},
        "agents": {"a": {"unit_ids": ["c", "e"]}, "b": {"unit_ids": ["d", "f"]}},
        "unit_state": units,
        "entities": entities,
        "world": {"width": 9, "height": 9}
    }))
    .expect("fixture snapshot")
}

fn unit(x: u32, y: u32) -> Value {
    json!({"coordinates": [x, y], "hp": 3, "inventory": {"bombs": 3}, "blast_diameter": 5})
}

/// Our unit `c` stands next to a fresh enemy bomb.
fn threatened(tick: u32) -> Snapshot {
    snapshot(
        tick,
        json!({"c": unit(2, 2), "e": unit(0, 8), "d": unit(8, 8), "f": unit(8, 0)}),
        json!([{
            "type": "b", "x": 3, "y": 2, "created": tick - 1, "expires": tick + 20,
            "unit_id": "d", "blast_diameter": 5
        }]),
    )
}

fn action_of<'a>(actions: &'a [UnitAction], unit: &str) -> Option<&'a Action> {
    actions
        .iter()
        .find(|action| action.unit.as_str() == unit)
        .map(|action| &action.action)
}

#[test]
fn armed_clusters_covering_an_enemy_are_detonated() {
    let snapshot = snapshot(
        20,
        json!({"c": unit(0, 0), "e": unit(8, 0), "d": unit(4, 6), "f": unit(8, 8)}),
        json!([{
            "type": "b", "x": 4, "y": 4, "created": 0, "expires": 40,
            "unit_id": "c", "blast_diameter": 5
        }]),
    );
    let live = LiveTick::new();
    live.advance(20);
    let mut engine = RuleEngine::new(Tuning::default());

    let outcome = engine
        .tick(&snapshot, &live.guard(20))
        .expect("tick completes");

    assert_eq!(
        action_of(&outcome.actions, "c"),
        Some(&Action::Detonate {
            bomb: Position::new(4, 4)
        })
    );
    assert!(outcome.packets().contains(&OutgoingPacket::Detonate {
        coordinates: [4, 4],
        unit_id: "c".to_owned(),
    }));
    assert_eq!(engine.phase(), TickPhase::Dispatched);
}

#[test]
fn units_in_a_blast_step_out_of_it() {
    let snapshot = threatened(20);
    let tuning = Tuning::default();
    let world = World::parse(&snapshot, &tuning).expect("fixture parses");
    assert!(world.danger()[Position::new(2, 2)] > 0.0);

    let live = LiveTick::new();
    live.advance(20);
    let mut engine = RuleEngine::new(tuning);
    let outcome = engine
        .tick(&snapshot, &live.guard(20))
        .expect("tick completes");

    let Some(Action::Move { target, .. }) = action_of(&outcome.actions, "c") else {
        panic!("expected c to move, got {:?}", outcome.actions);
    };
    assert_eq!(target.manhattan_distance(Position::new(2, 2)), 1);
    assert_eq!(world.danger()[*target], 0.0);
    assert_eq!(
        engine.carried().previous_targets().get(&UnitId::new("c")),
        Some(target)
    );
}

#[test]
fn cancelled_ticks_leave_no_trace() {
    let tuning = Tuning::default();
    let (small, big) = (tuning.search.budget_small, tuning.search.budget_big);
    let live = LiveTick::new();
    let mut engine = RuleEngine::new(tuning);

    live.advance(20);
    let first = engine
        .tick(&threatened(20), &live.guard(20))
        .expect("tick completes");
    assert_eq!(first.budget, big);
    let carried = engine.carried().clone();
    assert!(!carried.previous_targets().is_empty());

    live.advance(22);
    let error = engine
        .tick(&threatened(21), &live.guard(21))
        .expect_err("superseded tick");
    assert!(matches!(
        error,
        TickError::Cancelled(Cancelled {
            tick: 21,
            live: 22,
            phase: TickPhase::Parsing,
        })
    ));
    assert_eq!(engine.carried(), &carried);
    assert_eq!(engine.phase(), TickPhase::Idle);

    let recovering = engine
        .tick(&threatened(22), &live.guard(22))
        .expect("tick completes");
    assert_eq!(recovering.budget, small);

    live.advance(23);
    let settled = engine
        .tick(&threatened(23), &live.guard(23))
        .expect("tick completes");
    assert_eq!(settled.budget, big);
}

#[test]
fn malformed_snapshots_fail_without_touching_state() {
    let live = LiveTick::new();
    live.advance(20);
    let mut engine = RuleEngine::new(Tuning::default());
    let _ = engine
        .tick(&threatened(20), &live.guard(20))
        .expect("tick completes");
    let carried = engine.carried().clone();

    live.advance(21);
    let broken = snapshot(
        21,
        json!({"c": unit(2, 2), "e": unit(0, 8), "d": unit(8, 8), "f": unit(8, 0)}),
        json!([{"type": "b", "x": 3, "y": 2, "created": 19, "unit_id": "d", "blast_diameter": 5}]),
    );
    let error = engine
        .tick(&broken, &live.guard(21))
        .expect_err("bomb without expiry");

    assert!(matches!(error, TickError::Snapshot(_)));
    assert_eq!(engine.carried(), &carried);
}

#[test]
fn lone_agents_without_units_do_nothing() {
    let snapshot = snapshot(
        20,
        json!({
            "c": {"coordinates": [1, 1], "hp": 0, "inventory": {"bombs": 3}, "blast_diameter": 5},
            "e": {"coordinates": [2, 1], "hp": 0, "inventory": {"bombs": 3}, "blast_diameter": 5},
            "d": unit(8, 8),
            "f": unit(8, 0)
        }),
        json!([]),
    );
    let live = LiveTick::new();
    live.advance(20);
    let outcome = RuleEngine::new(Tuning::default())
        .tick(&snapshot, &live.guard(20))
        .expect("tick completes");

    assert!(outcome.actions.is_empty());
}

/// Random board with every unit alive, a few bombs and scattered blocks.
fn random_snapshot(rng: &mut ChaCha8Rng, tick: u32) -> Snapshot {
    let mut cells: Vec<(u32, u32)> = (0..9).flat_map(|x| (0..9).map(move |y| (x, y))).collect();
    cells.shuffle(rng);
    let mut cells = cells.into_iter();
    let mut next = || cells.next().expect("board has room");

    let mut units = serde_json::Map::new();
    for id in ["c", "e", "d", "f"] {
        let (x, y) = next();
        let _ = units.insert(
            id.to_owned(),
            json!({
                "coordinates": [x, y],
                "hp": rng.gen_range(1..=3),
                "inventory": {"bombs": rng.gen_range(0..=3)},
                "blast_diameter": 3 + 2 * rng.gen_range(0..=2),
                "invulnerable": if rng.gen_bool(0.2) { tick + 5 } else { 0 }
            }),
        );
    }

    let mut entities = Vec::new();
    for _ in 0..rng.gen_range(0..5) {
        let (x, y) = next();
        let owner = ["c", "e", "d", "f"][rng.gen_range(0..4)];
        let created = tick - rng.gen_range(0..tick.min(12));
        entities.push(json!({
            "type": "b", "x": x, "y": y, "created": created,
            "expires": created + 30, "unit_id": owner, "blast_diameter": 3
        }));
    }
    for _ in 0..rng.gen_range(0..20) {
        let (x, y) = next();
        let kind = ["m", "w", "o", "a", "bp"][rng.gen_range(0..5)];
        entities.push(json!({"type": kind, "x": x, "y": y, "hp": 1}));
    }
    snapshot(tick, Value::Object(units), Value::Array(entities))
}

#[test]
fn random_boards_never_produce_colliding_moves() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x0b0b);
    let live = LiveTick::new();
    let mut engine = RuleEngine::new(Tuning::default());
    let tuning = Tuning::default();

    for tick in 20..120 {
        let snapshot = random_snapshot(&mut rng, tick);
        let world = World::parse(&snapshot, &tuning).expect("random board parses");
        live.advance(tick);
        let outcome = engine
            .tick(&snapshot, &live.guard(tick))
            .expect("tick completes");

        let mut acted = BTreeSet::new();
        let mut positions: BTreeMap<UnitId, Position> = world
            .my_units()
            .iter()
            .map(|unit| (unit.id.clone(), unit.position))
            .collect();
        for action in &outcome.actions {
            assert!(acted.insert(action.unit.clone()), "two actions for {}", action.unit);
            assert!(positions.contains_key(&action.unit), "{} is not ours", action.unit);

            let Some(target) = action.action.move_target() else {
                continue;
            };
            assert_eq!(target.manhattan_distance(positions[&action.unit]), 1);
            assert!(world.walkable()[target].is_finite(), "{target:?} is blocked");
            assert!(
                positions.values().all(|&occupied| occupied != target),
                "{} walks into a teammate at {target:?}",
                action.unit
            );
            let _ = positions.insert(action.unit.clone(), target);
        }
    }
}

#[test]
fn scheduler_dispatches_live_ticks_and_idles_on_bad_input() {
    let scheduler = TickScheduler::spawn(RuleEngine::new(Tuning::default()));
    let timeout = Duration::from_secs(10);

    assert!(scheduler.submit(threatened(30)));
    let dispatch = scheduler
        .dispatches()
        .recv_timeout(timeout)
        .expect("tick 30 dispatched");
    assert_eq!(dispatch.tick, 30);
    assert!(action_of(&dispatch.actions, "c").is_some());
    assert_eq!(scheduler.live().current(), 30);

    let broken = snapshot(31, json!({}), json!([]));
    assert!(scheduler.submit(broken));
    let dispatch = scheduler
        .dispatches()
        .recv_timeout(timeout)
        .expect("tick 31 dispatched");
    assert_eq!(dispatch.tick, 31);
    assert!(dispatch.actions.is_empty());

    let (engine, leftover) = scheduler.shutdown();
    assert!(leftover.is_empty());
    let engine = engine.expect("worker hands back its engine");
    assert!(engine
        .carried()
        .previous_targets()
        .contains_key(&UnitId::new("c")));
}

#[test]
fn scheduler_answers_the_newest_of_a_burst() {
    let scheduler = TickScheduler::spawn(RuleEngine::new(Tuning::default()));
    let timeout = Duration::from_secs(10);

    for tick in 40..=42 {
        assert!(scheduler.submit(threatened(tick)));
    }
    let mut answered = Vec::new();
    while answered.last() != Some(&42) {
        let dispatch = scheduler
            .dispatches()
            .recv_timeout(timeout)
            .expect("the live tick is dispatched");
        answered.push(dispatch.tick);
    }

    assert!(answered.windows(2).all(|pair| pair[0] < pair[1]));
    let (_, leftover) = scheduler.shutdown();
    assert!(leftover.is_empty());
}
