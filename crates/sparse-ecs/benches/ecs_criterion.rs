//! ECS benchmarks using criterion for historical comparison.

use std::hint::black_box;

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sparse_ecs::{CommandBuffer, Entity, World, WorldConfig};

#[derive(Clone, Copy)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Clone, Copy)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Clone, Copy)]
struct Health(f32);

fn populated(count: u64) -> (World, Vec<Entity>) {
    let config = WorldConfig::default()
        .with_entity_capacity(count as usize)
        .with_store_capacity(count as usize);
    let mut world = World::with_config(config);

    let entities = (0..count)
        .map(|i| {
            let e = world.entity();
            world
                .set(
                    e,
                    Position {
                        x: i as f32,
                        y: 0.0,
                        z: 0.0,
                    },
                )
                .unwrap();
            world
                .set(
                    e,
                    Velocity {
                        x: 1.0,
                        y: 0.5,
                        z: 0.0,
                    },
                )
                .unwrap();
            if i % 3 == 0 {
                world.set(e, Health(100.0)).unwrap();
            }
            e
        })
        .collect();

    (world, entities)
}

fn spawn_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");

    for count in [1, 100, 1000, 10000] {
        group.throughput(Throughput::Elements(count));

        group.bench_with_input(BenchmarkId::new("empty", count), &count, |b, &count| {
            b.iter(|| {
                let mut world = World::new();
                for _ in 0..count {
                    black_box(world.entity());
                }
            });
        });

        group.bench_with_input(
            BenchmarkId::new("with_position", count),
            &count,
            |b, &count| {
                b.iter(|| {
                    let mut world = World::new();
                    for i in 0..count {
                        let e = world.entity();
                        world
                            .set(
                                e,
                                Position {
                                    x: i as f32,
                                    y: 0.0,
                                    z: 0.0,
                                },
                            )
                            .unwrap();
                        black_box(e);
                    }
                });
            },
        );
    }

    group.finish();
}

fn component_access_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("component_access");

    for count in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(count));

        group.bench_with_input(BenchmarkId::new("get", count), &count, |b, &count| {
            let (world, entities) = populated(count);

            b.iter(|| {
                for &entity in &entities {
                    black_box(world.get::<Position>(entity));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("get_mut", count), &count, |b, &count| {
            let (mut world, entities) = populated(count);

            b.iter(|| {
                for &entity in &entities {
                    if let Some(pos) = world.get_mut::<Position>(entity) {
                        pos.x += 1.0;
                    }
                }
            });
        });

        group.bench_with_input(
            BenchmarkId::new("remove_component", count),
            &count,
            |b, &count| {
                b.iter_batched(
                    || populated(count),
                    |(mut world, entities)| {
                        for entity in entities {
                            world.remove_component::<Velocity>(entity);
                        }
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn query_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    for count in [1000, 10000, 100_000] {
        group.throughput(Throughput::Elements(count));

        group.bench_with_input(
            BenchmarkId::new("position_velocity", count),
            &count,
            |b, &count| {
                let (mut world, _) = populated(count);
                let query = world
                    .query_builder()
                    .with::<Position>()
                    .with::<Velocity>()
                    .build();

                b.iter(|| {
                    let mut cursor = query.cursor();
                    while let Some(e) = cursor.advance(&world) {
                        let Some(&vel) = world.get::<Velocity>(e) else {
                            continue;
                        };
                        if let Some(pos) = world.get_mut::<Position>(e) {
                            pos.x += vel.x;
                            pos.y += vel.y;
                            pos.z += vel.z;
                        }
                    }
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("three_types", count),
            &count,
            |b, &count| {
                let (world, _) = populated(count);
                let query = world
                    .query_builder()
                    .with::<Position>()
                    .with::<Velocity>()
                    .with::<Health>()
                    .build();

                b.iter(|| black_box(query.count(&world)));
            },
        );
    }

    group.finish();
}

fn destroy_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("destroy");

    for count in [1000, 10000] {
        group.throughput(Throughput::Elements(count));

        group.bench_with_input(
            BenchmarkId::new("deferred", count),
            &count,
            |b, &count| {
                b.iter_batched(
                    || populated(count),
                    |(mut world, _)| {
                        let query = world.query_builder().with::<Health>().build();
                        let mut commands = CommandBuffer::new();
                        for e in query.iter(&world) {
                            commands.destroy(e);
                        }
                        black_box(world.apply(&mut commands));
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    spawn_benchmarks,
    component_access_benchmarks,
    query_benchmarks,
    destroy_benchmarks,
);

criterion_main!(benches);
