use glam::Vec2;
use ocean_arena::game::cargo::CargoKind;
use ocean_arena::game::entity::{Entity, Lifecycle};
use ocean_arena::game::physics::CollisionEvent;
use ocean_arena::game::{Bounds, World, WorldConfig};

fn arena(ideal: usize, seed: u64) -> World {
    let mut world = World::new(WorldConfig {
        ideal_boat_count: ideal,
        seed,
        ..WorldConfig::default()
    });
    world.setup();
    world
}

fn small_arena() -> World {
    World::new(WorldConfig {
        bounds: Bounds::new(Vec2::new(0.0, -2000.0), Vec2::new(4000.0, 500.0)),
        ideal_boat_count: 0,
        seed: 9,
        ..WorldConfig::default()
    })
}

fn hard_hit(world: &World, ball: usize, boat: usize) -> CollisionEvent {
    CollisionEvent {
        a: world.cannonballs[ball].core.body.key(),
        b: world.boats[boat].core.body.key(),
        momentum_a: world.cut_off_momentum * 4.0,
        momentum_b: 0.0,
    }
}

#[test]
fn npc_fleet_runs_a_thousand_ticks() {
    let mut world = arena(18, 1);
    for _ in 0..1000 {
        world.update(1.0);
    }

    assert_eq!(world.total_time, 1000.0);
    assert_eq!(world.boats.len(), 18);
    for boat in &world.boats {
        let position = boat.core.position();
        assert!(position.is_finite(), "boat left the numbers: {position:?}");
        assert!((0.0..=1.0).contains(&boat.core.submerged_percent));
        assert!((0.0..=1.0).contains(&boat.core.deep));
        assert!(boat.fire_cooldown >= 0.0);
    }
    for ball in world.cannonballs.iter().filter(|c| !c.core.removed) {
        assert!(world.boats.get(ball.boat_index).is_some());
    }
    // NPCs spotted each other and fired at some point
    assert!(!world.cannonballs.is_empty());
}

#[test]
fn sunk_npcs_are_replaced_one_per_tick() {
    let mut world = arena(18, 4);
    for _ in 0..200 {
        world.update(1.0);
    }
    let sunk = [0, 3, 5, 9];
    for &index in &sunk {
        world.boats[index].kill();
    }
    assert_eq!(world.alive_boat_count(), 14);

    let mut respawns = 0;
    let mut recovered = false;
    for _ in 0..3000 {
        world.update(1.0);
        assert!(world.respawns_last_tick() <= 1);
        respawns += world.respawns_last_tick();
        if respawns >= sunk.len() && world.alive_boat_count() == 18 {
            recovered = true;
            break;
        }
    }

    assert!(recovered, "fleet stayed at {} boats", world.alive_boat_count());
    assert_eq!(world.boats.len(), 18);
    for &index in &sunk {
        assert!(world.boats[index].core.is_alive());
        assert!(world.boats[index].is_npc());
    }
}

#[test]
fn same_seed_same_world() {
    let mut a = arena(6, 77);
    let mut b = arena(6, 77);
    for _ in 0..300 {
        a.update(1.0);
        b.update(1.0);
    }
    let positions = |w: &World| -> Vec<Vec2> { w.boats.iter().map(|b| b.core.position()).collect() };
    assert_eq!(positions(&a), positions(&b));
    assert_eq!(a.cannonballs.len(), b.cannonballs.len());
}

#[test]
fn two_hard_hits_sink_a_boat_and_it_respawns() {
    let mut world = small_arena();
    let victim = world.spawn_boat("victim", None);
    let shooter = world.spawn_boat("shooter", None);
    world.boats[victim].core.hp = 70.0;

    let first = world.spawn_cannonball(shooter, Vec2::ZERO).expect("first shot");
    world.push_collision(hard_hit(&world, first, victim));
    let second = world.spawn_cannonball(shooter, Vec2::ZERO).expect("second shot");
    world.push_collision(hard_hit(&world, second, victim));
    let results = world.process_collisions();

    assert_eq!(results.len(), 2);
    assert!(!results[0].killed);
    assert!(results[1].killed);
    assert_eq!(world.boats[victim].lifecycle(), Lifecycle::Dead);
    assert_eq!(world.boats[victim].core.flooded, 1.0);
    assert!(world.boats[victim].core.decaying.is_some());
    assert_eq!(world.boats[shooter].score, 1 + 2);
    assert!(world.boats[shooter].cargo.total() >= 2);

    // A wreck takes no commands
    assert!(!world.move_boat(victim, 1.0));
    assert!(world.fire_from_boat(victim, Some(Vec2::ZERO)).is_none());

    let index = world.spawn_boat("victim", Some(victim));
    assert_eq!(index, victim);
    assert_eq!(world.boats[victim].lifecycle(), Lifecycle::Alive);
    assert_eq!(world.boats[victim].core.hp, 100.0);
    assert_eq!(world.boats[victim].score, 0);
}

#[test]
fn removed_slots_are_reused() {
    let mut world = small_arena();
    let shooter = world.spawn_boat("shooter", None);

    let ball = world.spawn_cannonball(shooter, Vec2::new(4000.0, -500.0)).expect("fires");
    world.cannonballs[ball].core.remove();
    let again = world.spawn_cannonball(shooter, Vec2::new(4000.0, -500.0)).expect("fires");
    assert_eq!(again, ball);
    assert_eq!(world.cannonballs.len(), 1);

    let first = world.spawn_crate(Vec2::new(800.0, -40.0));
    world.spawn_crate(Vec2::new(1600.0, -40.0));
    world.crates[first].core.remove();
    assert_eq!(world.spawn_crate(Vec2::new(2400.0, -40.0)), first);
    assert_eq!(world.crates.len(), 2);
}

#[test]
fn sunken_crate_decays_away() {
    let mut world = small_arena();
    let index = world.spawn_crate(Vec2::new(2000.0, 450.0));
    world.crates[index].core.hp = 1.0;

    let mut steps = 0;
    while !world.crates[index].core.removed && steps < 2000 {
        world.update(5.0);
        steps += 1;
    }
    assert!(world.crates[index].core.removed);
    assert!(world.crates[index].core.is_dead);
}

#[test]
fn repair_trades_timber_for_hull() {
    let mut world = small_arena();
    let boat = world.spawn_boat("p1", None);
    world.boats[boat].core.hp = 60.0;
    world.boats[boat].cargo.give(CargoKind::Timber, 3);

    assert!(world.repair_boat(boat));
    assert!(!world.repair_boat(boat));
    // Cooldown runs out through ticks
    for _ in 0..520 {
        world.update(1.0);
    }
    assert!(world.repair_boat(boat));
    assert_eq!(world.boats[boat].core.hp, 62.0);
    assert_eq!(world.boats[boat].cargo.count(CargoKind::Timber), 1);
}
