use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::*;
use crate::env::GridMap;
use crate::geometry::Tile;
use crate::state::BehaviorKind;

const TICK: Duration = Duration::from_millis(16);

fn controller() -> TownController {
    TownController::new(SimConfig::with_seed(7))
}

fn spec(id: &str, x: f64, y: f64) -> NpcSpec {
    NpcSpec::new(id, Point::new(x, y))
}

/// Ticks until the predicate holds or the budget runs out.
fn tick_until(
    controller: &TownController,
    budget: usize,
    mut done: impl FnMut(&TownController) -> bool,
) {
    for _ in 0..budget {
        controller.tick(TICK);
        if done(controller) {
            return;
        }
    }
    panic!("condition not reached within {budget} ticks");
}

#[test]
fn add_and_remove_drive_subscriber_batches() {
    let controller = controller();
    let batches: Arc<Mutex<Vec<Vec<NpcState>>>> = Arc::default();
    let sink = Arc::clone(&batches);
    controller.subscribe_npcs(move |batch| sink.lock().push(batch.to_vec()));

    let added = controller.add_npc(spec("guide", 2.0, 3.0));
    assert_eq!(added.name.as_ref().map(|n| n.text.as_str()), Some("guide"));
    controller.remove_npc(&NpcId::from("guide"));

    let seen = batches.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].len(), 1);
    assert_eq!(seen[0][0].id, NpcId::from("guide"));
    assert!(seen[1].is_empty());
}

#[test]
fn duplicate_id_replaces_the_existing_record() {
    let controller = controller();
    controller.add_npc(spec("guide", 1.0, 1.0));
    controller.add_npc(spec("guide", 8.0, 8.0).with_look("f5"));

    let npcs = controller.npcs();
    assert_eq!(npcs.len(), 1);
    assert_eq!(npcs[0].position, Point::new(8.0, 8.0));
    assert_eq!(npcs[0].look, "f5");
}

#[test]
fn set_direction_suppresses_no_op_notifications() {
    let controller = controller();
    controller.add_npc(spec("guide", 0.0, 0.0));

    let publishes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&publishes);
    controller.subscribe_npcs(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let id = NpcId::from("guide");
    controller.set_direction(&id, 1.0, 0.0);
    controller.set_direction(&id, 0.4, 0.0); // same quantized direction
    controller.set_direction(&id, 0.0, -1.0);
    assert_eq!(publishes.load(Ordering::SeqCst), 2);

    let npc = controller.npc(&id).unwrap();
    assert_eq!(npc.direction, Direction { dx: 0, dy: -1 });
    assert!(npc.moving);
}

#[test]
fn set_direction_zero_clears_the_moving_flag() {
    let controller = controller();
    controller.add_npc(spec("guide", 0.0, 0.0));
    let id = NpcId::from("guide");

    controller.set_direction(&id, 1.0, 1.0);
    controller.set_direction(&id, 0.0, 0.0);

    let npc = controller.npc(&id).unwrap();
    assert!(npc.direction.is_zero());
    assert!(!npc.moving);
}

#[test]
fn listener_mutations_are_queued_not_recursed() {
    let controller = controller();
    controller.add_npc(spec("guide", 0.0, 0.0));

    let reentered = Arc::new(AtomicBool::new(false));
    let deliveries: Arc<Mutex<Vec<Vec<NpcState>>>> = Arc::default();

    let handle = controller.clone();
    let fired = Arc::clone(&reentered);
    let sink = Arc::clone(&deliveries);
    controller.subscribe_npcs(move |batch| {
        sink.lock().push(batch.to_vec());
        if !fired.swap(true, Ordering::SeqCst) {
            // Mutating from inside a notification must enqueue a follow-up
            // delivery rather than recurse or get dropped.
            handle.show_speech(&NpcId::from("guide"), "hello", 0);
        }
    });

    controller.stop(&NpcId::from("guide"));

    let seen = deliveries.lock();
    assert_eq!(seen.len(), 2);
    assert!(!seen[0][0].speech.visible);
    assert!(seen[1][0].speech.visible);
    assert_eq!(seen[1][0].speech.text.as_deref(), Some("hello"));
}

#[test]
fn speech_expires_on_the_simulation_clock() {
    let controller = controller();
    controller.add_npc(spec("guide", 0.0, 0.0));
    let id = NpcId::from("guide");

    controller.show_speech(&id, "hi", 100);
    assert!(controller.npc(&id).unwrap().speech.visible);

    // 6 ticks = 96 ms: still visible.
    for _ in 0..6 {
        controller.tick(TICK);
    }
    assert!(controller.npc(&id).unwrap().speech.visible);

    controller.tick(TICK); // 112 ms
    let npc = controller.npc(&id).unwrap();
    assert!(!npc.speech.visible);
    assert!(npc.speech.text.is_none());
}

#[test]
fn stale_expiry_never_hides_a_newer_speech() {
    let controller = controller();
    controller.add_npc(spec("guide", 0.0, 0.0));
    let id = NpcId::from("guide");

    controller.show_speech(&id, "first", 50);
    controller.show_speech(&id, "second", 10_000);

    // Walk past the first deadline; the superseded expiry must not fire.
    for _ in 0..10 {
        controller.tick(TICK);
    }
    let npc = controller.npc(&id).unwrap();
    assert!(npc.speech.visible);
    assert_eq!(npc.speech.text.as_deref(), Some("second"));
}

#[test]
fn hide_speech_cancels_the_pending_expiry() {
    let controller = controller();
    controller.add_npc(spec("guide", 0.0, 0.0));
    let id = NpcId::from("guide");

    controller.show_speech(&id, "brief", 50);
    controller.hide_speech(&id);
    controller.show_speech(&id, "lasting", 0);

    for _ in 0..10 {
        controller.tick(TICK);
    }
    let npc = controller.npc(&id).unwrap();
    assert!(npc.speech.visible);
    assert_eq!(npc.speech.text.as_deref(), Some("lasting"));
}

#[test]
fn thinking_indicator_expires_like_speech() {
    let controller = controller();
    controller.add_npc(spec("guide", 0.0, 0.0));
    let id = NpcId::from("guide");

    controller.show_thinking(&id, 32);
    assert!(controller.npc(&id).unwrap().thinking);
    controller.tick(TICK);
    controller.tick(TICK);
    assert!(!controller.npc(&id).unwrap().thinking);
}

#[test]
fn pathfind_starts_walking_the_waypoint_list() {
    let controller = controller();
    controller.set_map(Arc::new(GridMap::open(10, 10)));
    controller.add_npc(spec("guide", 0.0, 0.0));
    let id = NpcId::from("guide");

    controller.pathfind_to(&id, 9.0, 9.0).unwrap();

    let npc = controller.npc(&id).unwrap();
    assert_eq!(npc.behavior.kind(), BehaviorKind::Pathfind);
    assert!(npc.moving);
    assert!(!npc.direction.is_zero());
    assert_eq!(npc.target, Some(Point::new(9.0, 9.0)));
    let Behavior::Pathfind(progress) = &npc.behavior else {
        panic!("expected a pathfind payload");
    };
    assert_eq!(progress.waypoints().len(), 19);
    assert_eq!(progress.waypoints()[0], Tile::new(0, 0));
}

#[test]
fn pathfind_failure_leaves_the_npc_untouched() {
    let controller = controller();
    let mut map = GridMap::open(5, 5);
    map.block(Tile::new(4, 4));
    controller.set_map(Arc::new(map));
    controller.add_npc(spec("guide", 0.0, 0.0));
    let id = NpcId::from("guide");
    let before = controller.npc(&id).unwrap();

    let err = controller.pathfind_to(&id, 4.0, 4.0).unwrap_err();
    assert_eq!(
        err,
        PathfindError::Search(PathError::BlockedGoal(Tile::new(4, 4)))
    );
    assert_eq!(controller.npc(&id).unwrap(), before);
}

#[test]
fn pathfind_requires_a_map() {
    let controller = controller();
    controller.add_npc(spec("guide", 0.0, 0.0));
    let err = controller
        .pathfind_to(&NpcId::from("guide"), 3.0, 3.0)
        .unwrap_err();
    assert_eq!(err, PathfindError::MapUnset);
}

#[test]
fn pathfind_walks_to_the_goal_over_ticks() {
    let controller = controller();
    controller.set_map(Arc::new(GridMap::open(10, 10)));
    controller.add_npc(spec("guide", 0.0, 0.0));
    let id = NpcId::from("guide");
    controller.pathfind_to(&id, 3.0, 0.0).unwrap();

    // 3 tiles at 0.75 tiles/s is 4 s of simulated time; give it slack.
    tick_until(&controller, 400, |c| {
        c.npc(&id).is_some_and(|npc| !npc.moving)
    });

    let npc = controller.npc(&id).unwrap();
    assert_eq!(npc.behavior, Behavior::Idle);
    assert!(npc.target.is_none());
    assert!(npc.position.distance(Point::new(3.0, 0.0)) < 2.0 * SimConfig::ARRIVAL_RADIUS);
}

#[test]
fn move_to_settles_within_the_arrival_radius() {
    let controller = controller();
    controller.add_npc(spec("guide", 0.0, 0.0));
    let id = NpcId::from("guide");
    controller.move_to(&id, 2.0, 1.0);
    assert!(controller.npc(&id).unwrap().moving);

    tick_until(&controller, 400, |c| {
        c.npc(&id).is_some_and(|npc| !npc.moving)
    });

    let npc = controller.npc(&id).unwrap();
    assert!(npc.position.distance(Point::new(2.0, 1.0)) < 2.0 * SimConfig::ARRIVAL_RADIUS);
    // Behavior stays move_to; a new target can reuse it.
    assert_eq!(npc.behavior, Behavior::MoveTo);
}

#[test]
fn move_to_an_adjacent_target_stops_immediately() {
    let controller = controller();
    controller.add_npc(spec("guide", 5.0, 5.0));
    let id = NpcId::from("guide");
    controller.set_direction(&id, 1.0, 0.0);

    controller.move_to(&id, 5.05, 5.0);
    let npc = controller.npc(&id).unwrap();
    assert!(!npc.moving);
    assert!(npc.direction.is_zero());
}

#[test]
fn follow_closes_in_on_the_player() {
    let controller = controller();
    controller.set_map(Arc::new(GridMap::open(20, 20)));
    controller.update_player(PlayerState::new(Point::new(6.0, 2.0)));
    controller
        .add_npc(spec("guide", 1.0, 2.0).with_behavior(Behavior::Follow));
    let id = NpcId::from("guide");

    tick_until(&controller, 800, |c| {
        c.npc(&id)
            .is_some_and(|npc| npc.position.tile() == Tile::new(6, 2))
    });
    // The steering pass halts on the next tick, once the tiles match.
    controller.tick(TICK);
    assert!(!controller.npc(&id).unwrap().moving);
}

#[test]
fn patch_npc_bypasses_notification() {
    let controller = controller();
    controller.add_npc(spec("guide", 0.0, 0.0));

    let publishes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&publishes);
    controller.subscribe_npcs(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let id = NpcId::from("guide");
    controller.patch_npc(
        &id,
        NpcPatch::new()
            .with_position(Point::new(4.0, 4.0))
            .with_speed(1.5),
    );

    assert_eq!(publishes.load(Ordering::SeqCst), 0);
    let npc = controller.npc(&id).unwrap();
    assert_eq!(npc.position, Point::new(4.0, 4.0));
    assert_eq!(npc.speed, 1.5);
}

#[test]
fn operations_on_unknown_ids_are_silent_no_ops() {
    let controller = controller();
    let ghost = NpcId::from("ghost");
    controller.set_direction(&ghost, 1.0, 0.0);
    controller.stop(&ghost);
    controller.move_to(&ghost, 3.0, 3.0);
    controller.show_speech(&ghost, "boo", 100);
    controller.hide_thinking(&ghost);
    controller.patch_npc(&ghost, NpcPatch::new().with_moving(true));
    assert!(controller.npcs().is_empty());
}

#[test]
fn subscribe_player_fires_immediately_when_state_exists() {
    let controller = controller();
    controller.update_player(PlayerState::new(Point::new(3.0, 4.0)));

    let seen: Arc<Mutex<Vec<PlayerState>>> = Arc::default();
    let sink = Arc::clone(&seen);
    controller.subscribe_player(move |player| sink.lock().push(*player));

    assert_eq!(seen.lock().len(), 1);
    controller.set_player_position(7.0, 7.0);
    let log = seen.lock();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].position, Point::new(7.0, 7.0));
}

#[test]
fn unsubscribe_stops_further_deliveries() {
    let controller = controller();
    let publishes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&publishes);
    let sub = controller.subscribe_npcs(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    controller.add_npc(spec("a", 0.0, 0.0));
    controller.unsubscribe_npcs(sub);
    controller.add_npc(spec("b", 0.0, 0.0));

    assert_eq!(publishes.load(Ordering::SeqCst), 1);
}

#[test]
fn player_integrates_during_tick_when_moving() {
    let controller = controller();
    let mut player = PlayerState::new(Point::ORIGIN);
    player.direction = Direction { dx: 1, dy: 0 };
    player.moving = true;
    controller.update_player(player);

    controller.tick(Duration::from_secs(2));
    let moved = controller.player().unwrap();
    assert!((moved.position.x - 1.5).abs() < 1e-9);
}

#[test]
fn idle_behavior_switch_stops_motion() {
    let controller = controller();
    controller.add_npc(spec("guide", 0.0, 0.0));
    let id = NpcId::from("guide");
    controller.set_direction(&id, 1.0, 1.0);

    controller.set_behavior(&id, Behavior::Idle);
    let npc = controller.npc(&id).unwrap();
    assert!(!npc.moving);
    assert!(npc.direction.is_zero());
}

#[test]
fn patrol_keeps_npcs_inside_the_map() {
    let controller = controller();
    controller.set_map(Arc::new(GridMap::open(6, 6)));
    controller
        .add_npc(spec("walker", 3.0, 3.0).with_behavior(Behavior::Patrol));
    let id = NpcId::from("walker");

    for _ in 0..2_000 {
        controller.tick(TICK);
        let npc = controller.npc(&id).unwrap();
        assert!((0.0..=5.0).contains(&npc.position.x));
        assert!((0.0..=5.0).contains(&npc.position.y));
        if let Some(target) = npc.target {
            assert!((0.0..=5.0).contains(&target.x));
            assert!((0.0..=5.0).contains(&target.y));
        }
    }
}
