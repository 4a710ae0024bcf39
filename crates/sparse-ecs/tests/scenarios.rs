//! End-to-end behavior of the world at simulation scale.

use sparse_ecs::{CommandBuffer, ComponentId, Entity, World, WorldConfig};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Velocity {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Health(i32);

#[derive(Debug, Clone, Copy, PartialEq)]
struct Tag;

const ENTITY_COUNT: u32 = 100_000;

fn spawn_moving(world: &mut World, count: u32) -> Vec<Entity> {
    (0..count)
        .map(|i| {
            let e = world.entity();
            world
                .set(
                    e,
                    Position {
                        x: i as f32,
                        y: -(i as f32),
                    },
                )
                .unwrap();
            world
                .set(
                    e,
                    Velocity {
                        x: (i % 7) as f32,
                        y: 1.0,
                    },
                )
                .unwrap();
            e
        })
        .collect()
}

#[test]
fn test_move_system_updates_each_entity_once() {
    let config = WorldConfig::default()
        .with_entity_capacity(ENTITY_COUNT as usize)
        .with_store_capacity(ENTITY_COUNT as usize);
    let mut world = World::with_config(config);
    let entities = spawn_moving(&mut world, ENTITY_COUNT);

    let query = world
        .query_builder()
        .with::<Position>()
        .with::<Velocity>()
        .build();

    let mut visits = vec![0_u8; entities.len()];
    let mut cursor = query.cursor();
    while let Some(e) = cursor.advance(&world) {
        visits[e.index() as usize] += 1;

        let vel = *world.get::<Velocity>(e).unwrap();
        let pos = world.get_mut::<Position>(e).unwrap();
        pos.x += vel.x;
        pos.y += vel.y;
    }

    assert!(visits.iter().all(|&n| n == 1));

    for (i, &e) in entities.iter().enumerate() {
        let i = i as u32;
        let expected = Position {
            x: i as f32 + (i % 7) as f32,
            y: -(i as f32) + 1.0,
        };
        assert_eq!(world.get::<Position>(e), Some(&expected));
    }
}

#[test]
fn test_every_third_entity_has_health() {
    let mut world = World::new();
    let mut expected = Vec::new();

    for i in 0..3000 {
        let e = world.entity();
        // Interleave writes to other types so store order differs from creation order.
        if i % 2 == 0 {
            world.set(e, Tag).unwrap();
        }
        if i % 3 == 0 {
            world.set(e, Health(100)).unwrap();
            expected.push(e);
        }
        world.set(e, Position { x: 0.0, y: 0.0 }).unwrap();
    }

    let ids = [ComponentId::of::<Health>()];
    let mut found: Vec<Entity> = world.query(&ids).collect();
    found.sort();

    assert_eq!(found.len(), 1000);
    assert_eq!(found, expected);
}

#[test]
fn test_reused_index_has_no_components() {
    let mut world = World::new();

    let e = world.entity();
    world.set(e, Position { x: 3.0, y: 4.0 }).unwrap();
    assert!(world.destroy_entity(e));

    let f = world.entity();
    assert_eq!(f.index(), e.index());
    assert_eq!(world.get::<Position>(f), None);
    assert!(!world.is_alive(e));
    assert!(world.is_alive(f));
}

#[test]
fn test_destroyed_entities_leave_queries() {
    let mut world = World::new();
    let entities = spawn_moving(&mut world, 1000);

    for e in entities.iter().copied().filter(|e| e.index() % 4 == 0) {
        world.destroy_entity(e);
    }

    let query = world
        .query_builder()
        .with::<Position>()
        .with::<Velocity>()
        .build();

    assert_eq!(query.count(&world), 750);
    assert_eq!(world.len::<Position>(), 750);
    assert_eq!(world.len::<Velocity>(), 750);
    assert!(query.iter(&world).all(|e| e.index() % 4 != 0));
}

#[test]
fn test_health_system_with_deferred_destroy() {
    let mut world = World::new();

    for i in 0..300 {
        let e = world.entity();
        world.set(e, Health(i % 10 - 5)).unwrap();
    }

    let query = world.query_builder().with::<Health>().build();

    let mut commands = CommandBuffer::new();
    for e in query.iter(&world) {
        if world.get::<Health>(e).is_some_and(|h| h.0 <= 0) {
            commands.destroy(e);
        }
    }

    // Health values -5..=0 are fatal: six of every ten.
    assert_eq!(world.apply(&mut commands), 180);
    assert_eq!(world.entity_count(), 120);
    assert_eq!(query.count(&world), 120);
    assert!(query.iter(&world).all(|e| world.get::<Health>(e).unwrap().0 > 0));
}

#[test]
fn test_deferred_remove_keeps_entity() {
    let mut world = World::new();
    let entities = spawn_moving(&mut world, 100);

    let query = world.query_builder().with::<Velocity>().build();
    let mut commands = CommandBuffer::new();
    for e in query.iter(&world) {
        if world.get::<Velocity>(e).is_some_and(|v| v.x == 0.0) {
            commands.remove::<Velocity>(e);
        }
    }

    let removed = world.apply(&mut commands);
    assert_eq!(removed, entities.iter().filter(|e| e.index() % 7 == 0).count());
    assert_eq!(world.entity_count(), 100);
    assert_eq!(world.len::<Velocity>(), 100 - removed);
}

#[test]
fn test_stale_handle_rejected_after_many_cycles() {
    let mut world = World::new();
    let first = world.entity();
    world.destroy_entity(first);

    let mut latest = first;
    for _ in 0..100 {
        latest = world.entity();
        assert_eq!(latest.index(), first.index());
        world.destroy_entity(latest);
    }

    let current = world.entity();
    assert!(world.set(current, Health(1)).is_ok());
    assert!(world.set(first, Health(2)).is_err());
    assert!(world.set(latest, Health(3)).is_err());
    assert_eq!(world.get::<Health>(current), Some(&Health(1)));
}
