//! Components and per-frame systems for the demo simulation.

use rand::{Rng, rngs::StdRng};
use sparse_ecs::{CommandBuffer, EcsResult, Entity, Query, World};

/// Side length of the square play area.
pub const ARENA: f32 = 1000.0;

/// Health lost per second by every living entity.
const DECAY_PER_SEC: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health(pub f32);

/// Sprite index drawn by the render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sprite(pub u16);

/// Entities with this marker are skipped by the render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hidden;

/// Queries built once and reused every frame.
#[derive(Debug)]
pub struct Systems {
    movement: Query,
    health: Query,
    render: Query,
}

/// Per-frame results, logged by the driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameStats {
    pub moved: usize,
    pub died: usize,
    pub spawned: usize,
    pub drawn: usize,
}

impl Systems {
    pub fn new(world: &World) -> Self {
        Self {
            movement: world
                .query_builder()
                .with::<Position>()
                .with::<Velocity>()
                .build(),
            health: world.query_builder().with::<Health>().build(),
            render: world
                .query_builder()
                .with::<Position>()
                .with::<Sprite>()
                .without::<Hidden>()
                .build(),
        }
    }

    /// Run movement, then health, then render.
    pub fn run_frame(
        &self,
        world: &mut World,
        rng: &mut StdRng,
        commands: &mut CommandBuffer,
        dt: f32,
    ) -> EcsResult<FrameStats> {
        let moved = self.movement(world, dt);
        let died = self.health(world, commands, dt);
        let spawned = respawn(world, rng, died)?;
        let drawn = self.render(world);

        Ok(FrameStats {
            moved,
            died,
            spawned,
            drawn,
        })
    }

    /// Integrate velocity and bounce off the arena walls.
    fn movement(&self, world: &mut World, dt: f32) -> usize {
        let mut moved = 0;
        let mut cursor = self.movement.cursor();

        while let Some(e) = cursor.advance(world) {
            let Some(&vel) = world.get::<Velocity>(e) else {
                continue;
            };
            let Some(pos) = world.get_mut::<Position>(e) else {
                continue;
            };

            pos.x += vel.x * dt;
            pos.y += vel.y * dt;
            let bounce_x = !(0.0..=ARENA).contains(&pos.x);
            let bounce_y = !(0.0..=ARENA).contains(&pos.y);
            pos.x = pos.x.clamp(0.0, ARENA);
            pos.y = pos.y.clamp(0.0, ARENA);

            if bounce_x || bounce_y {
                if let Some(vel) = world.get_mut::<Velocity>(e) {
                    if bounce_x {
                        vel.x = -vel.x;
                    }
                    if bounce_y {
                        vel.y = -vel.y;
                    }
                }
            }
            moved += 1;
        }

        moved
    }

    /// Decay health and destroy entities that reach zero.
    fn health(&self, world: &mut World, commands: &mut CommandBuffer, dt: f32) -> usize {
        let mut cursor = self.health.cursor();

        while let Some(e) = cursor.advance(world) {
            if let Some(health) = world.get_mut::<Health>(e) {
                health.0 -= DECAY_PER_SEC * dt;
                if health.0 <= 0.0 {
                    commands.destroy(e);
                }
            }
        }

        world.apply(commands)
    }

    /// Count sprites inside the camera's view.
    fn render(&self, world: &World) -> usize {
        let (min, max) = (ARENA * 0.25, ARENA * 0.75);

        self.render
            .iter(world)
            .filter_map(|e| world.get::<Position>(e))
            .filter(|pos| (min..=max).contains(&pos.x) && (min..=max).contains(&pos.y))
            .count()
    }
}

/// Spawn one entity with randomized components.
pub fn spawn(world: &mut World, rng: &mut StdRng) -> EcsResult<Entity> {
    let e = world.try_entity()?;

    world.set(
        e,
        Position {
            x: rng.gen_range(0.0..ARENA),
            y: rng.gen_range(0.0..ARENA),
        },
    )?;

    // A quarter of the population is static scenery.
    if rng.gen_bool(0.75) {
        world.set(
            e,
            Velocity {
                x: rng.gen_range(-50.0..50.0),
                y: rng.gen_range(-50.0..50.0),
            },
        )?;
    }

    // Every third entity is mortal.
    if e.index() % 3 == 0 {
        world.set(e, Health(rng.gen_range(1.0..30.0)))?;
    }

    world.set(e, Sprite(rng.gen_range(0..64)))?;
    if rng.gen_bool(0.1) {
        world.set(e, Hidden)?;
    }

    Ok(e)
}

/// Replace entities lost this frame so the population stays constant.
fn respawn(world: &mut World, rng: &mut StdRng, count: usize) -> EcsResult<usize> {
    for _ in 0..count {
        spawn(world, rng)?;
    }
    Ok(count)
}
