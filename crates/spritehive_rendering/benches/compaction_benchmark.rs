//! # Compaction Benchmark
//!
//! Measures one renderer frame over a populated world:
//! 1. Quiet frame (nothing changed, every batch skipped)
//! 2. Sparse updates (a percentage of sprites moved)
//! 3. Camera moved (every batch re-partitioned)

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Mat4, Vec3};
use spritehive_core::{InstanceId, SpriteDesc, SpriteTransform, SpriteWorld};
use spritehive_rendering::{
    AnimationSetDefinition, NullSink, RecordingDevice, RendererConfig, SpriteRenderer, UvRect,
};

const SETS: u32 = 8;

fn position(i: usize) -> Vec3 {
    Vec3::new(
        ((i % 200) as f32 / 100.0) - 1.0,
        ((i / 200 % 200) as f32 / 100.0) - 1.0,
        0.5,
    )
}

fn populate(sprites: usize) -> (SpriteRenderer<RecordingDevice>, SpriteWorld, Vec<InstanceId>) {
    let mut renderer = SpriteRenderer::new(RecordingDevice::new(), RendererConfig::default());
    let mut world = SpriteWorld::with_capacity(sprites);
    let sets: Vec<_> = (0..SETS)
        .map(|i| {
            let definition = AnimationSetDefinition::new(format!("set{i}"), UvRect::grid(i + 1, 2));
            renderer.record_animation_set(&definition).expect("valid set");
            definition.id()
        })
        .collect();
    let ids = (0..sprites)
        .map(|i| {
            let transform = SpriteTransform::from_position(position(i));
            world.spawn(SpriteDesc::new(sets[i % sets.len()], transform))
        })
        .collect();
    renderer.render_frame(&mut world, Some(Mat4::IDENTITY), &mut NullSink);
    (renderer, world, ids)
}

fn bench_quiet_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("quiet_frame");
    for sprites in [10_000, 100_000] {
        let (mut renderer, mut world, _) = populate(sprites);
        group.bench_with_input(BenchmarkId::from_parameter(sprites), &sprites, |b, _| {
            b.iter(|| black_box(renderer.render_frame(&mut world, Some(Mat4::IDENTITY), &mut NullSink)));
        });
    }
    group.finish();
}

fn bench_sparse_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("sparse_updates");
    let sprites = 100_000;
    let (mut renderer, mut world, ids) = populate(sprites);

    for dirty_pct in [1, 10, 50] {
        let dirty = sprites * dirty_pct / 100;
        let mut step = 0.0f32;
        group.bench_with_input(BenchmarkId::from_parameter(dirty_pct), &dirty, |b, &dirty| {
            b.iter(|| {
                step += 0.001;
                for (i, &id) in ids.iter().take(dirty).enumerate() {
                    let moved = position(i) + Vec3::new(step.sin() * 0.01, 0.0, 0.0);
                    world.set_transform(id, SpriteTransform::from_position(moved));
                }
                black_box(renderer.render_frame(&mut world, Some(Mat4::IDENTITY), &mut NullSink))
            });
        });
    }
    group.finish();
}

fn bench_camera_moved(c: &mut Criterion) {
    let (mut renderer, mut world, _) = populate(100_000);
    let mut angle = 0.0f32;
    c.bench_function("camera_moved", |b| {
        b.iter(|| {
            angle += 0.01;
            let camera = Mat4::from_rotation_z(angle.sin() * 0.5);
            black_box(renderer.render_frame(&mut world, Some(camera), &mut NullSink))
        });
    });
}

criterion_group!(benches, bench_quiet_frame, bench_sparse_updates, bench_camera_moved);
criterion_main!(benches);
