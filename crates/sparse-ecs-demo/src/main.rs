//! Fixed-rate game loop driving the sparse-ecs core.
//!
//! This binary:
//! 1. Spawns `DEMO_ENTITIES` entities with randomized components
//! 2. Runs movement, health, and render systems once per frame
//! 3. Reports simulation time per frame against the `TARGET_FPS` budget
//!
//! Configuration (environment):
//! - `DEMO_ENTITIES` - initial population (default 100000)
//! - `DEMO_FRAMES` - frames to simulate (default 600)
//! - `TARGET_FPS` - frame rate to hold (default 60)
//! - `DEMO_SEED` - RNG seed (default 42)

mod systems;

use std::time::{Duration, Instant};

use rand::{SeedableRng, rngs::StdRng};
use sparse_ecs::{CommandBuffer, World, WorldConfig};
use tracing::{info, warn};

use crate::systems::{FrameStats, Systems};

/// Read `name` from the environment, falling back to `default` when unset or unparsable.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn main() -> eyre::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sparse_ecs_demo=info".parse()?),
        )
        .init();

    // Configuration
    let entity_count: usize = env_or("DEMO_ENTITIES", 100_000);
    let frames: u64 = env_or("DEMO_FRAMES", 600);
    let target_fps: f32 = env_or("TARGET_FPS", 60.0);
    let seed: u64 = env_or("DEMO_SEED", 42);

    eyre::ensure!(target_fps > 0.0, "TARGET_FPS must be positive, got {target_fps}");

    info!(entity_count, frames, target_fps, seed, "Starting demo");

    let config = WorldConfig::default()
        .with_entity_capacity(entity_count)
        .with_store_capacity(entity_count);
    let mut world = World::with_config(config);
    let mut rng = StdRng::seed_from_u64(seed);

    let start = Instant::now();
    for _ in 0..entity_count {
        systems::spawn(&mut world, &mut rng)?;
    }
    info!(
        "Spawned {} entities in {:.2?}",
        world.entity_count(),
        start.elapsed()
    );

    let systems = Systems::new(&world);
    let mut commands = CommandBuffer::new();

    let target_delta = Duration::from_secs_f32(1.0 / target_fps);
    let dt = target_delta.as_secs_f32();
    let mut window = Window::default();
    let mut over_budget: u64 = 0;

    for frame in 1..=frames {
        let start = Instant::now();

        let stats = systems.run_frame(&mut world, &mut rng, &mut commands, dt)?;

        let elapsed = start.elapsed();
        window.record(elapsed, stats);
        if elapsed > target_delta {
            over_budget += 1;
            warn!(frame, ?elapsed, budget = ?target_delta, "Frame over budget");
        }

        // Report once per simulated second
        if frame % u64::from(target_fps.max(1.0) as u32) == 0 {
            window.report(frame, target_delta);
            window = Window::default();
        }

        // Sleep to maintain target FPS
        if elapsed < target_delta {
            std::thread::sleep(target_delta - elapsed);
        }
    }

    info!(
        frames,
        over_budget,
        entities = world.entity_count(),
        "Demo finished"
    );

    Ok(())
}

/// Frame timings accumulated between reports.
#[derive(Default)]
struct Window {
    frames: u32,
    total: Duration,
    worst: Duration,
    last: FrameStats,
    died: usize,
}

impl Window {
    fn record(&mut self, elapsed: Duration, stats: FrameStats) {
        self.frames += 1;
        self.total += elapsed;
        self.worst = self.worst.max(elapsed);
        self.died += stats.died;
        self.last = stats;
    }

    fn report(&self, frame: u64, budget: Duration) {
        if self.frames == 0 {
            return;
        }
        let avg = self.total / self.frames;
        let load = avg.as_secs_f64() / budget.as_secs_f64() * 100.0;

        info!(
            frame,
            moved = self.last.moved,
            drawn = self.last.drawn,
            died = self.died,
            "avg {:.2?} / worst {:.2?} per frame ({:.1}% of budget)",
            avg,
            self.worst,
            load
        );
    }
}
