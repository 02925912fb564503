//! Headless sprite stress run.
//!
//! Spawns a crowd over several animation sets, then churns it for a number
//! of frames from parallel producers and reports what each frame cost.
//!
//! Usage: `sprite_stress [sprites] [sets] [frames]`
//! Logging: `RUST_LOG=spritehive_rendering=debug sprite_stress`

use std::time::Instant;

use glam::{Mat4, Vec3, Vec4};
use rayon::prelude::*;
use spritehive_core::{CommandBuffer, InstanceId, Lifetime, PaintPair, SpriteTransform};
use spritehive_rendering::{
    AnimationSetDefinition, ClipDefinition, DrawLog, PaintConfig, RecordingDevice, RendererConfig,
    SpriteSystem, UvRect,
};

const PRODUCERS: u64 = 8;
const FRAME_DT: f32 = 1.0 / 60.0;

/// xorshift64*, enough to scatter mutations reproducibly.
struct Scatter(u64);

impl Scatter {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 >> 12;
        self.0 ^= self.0 << 25;
        self.0 ^= self.0 >> 27;
        self.0.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn unit(&mut self) -> f32 {
        (self.next() >> 40) as f32 / (1u64 << 24) as f32
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n.max(1) as u64) as usize
    }
}

fn arg(index: usize, default: usize) -> usize {
    match std::env::args().nth(index) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(%raw, default, "ignoring malformed argument");
            default
        }),
    }
}

fn scattered(rng: &mut Scatter) -> SpriteTransform {
    let position = Vec3::new(rng.unit() * 2.4 - 1.2, rng.unit() * 2.4 - 1.2, 0.5);
    SpriteTransform::from_position(position).with_scale(0.5 + rng.unit())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let sprites = arg(1, 100_000);
    let set_count = arg(2, 16).max(1);
    let frames = arg(3, 120);
    tracing::info!(sprites, sets = set_count, frames, "starting sprite stress");

    let mut system = SpriteSystem::new(RecordingDevice::new(), RendererConfig::default());
    let mut sets = Vec::with_capacity(set_count);
    for i in 0..set_count {
        let columns = 2 + i as u32;
        let definition = AnimationSetDefinition::new(format!("set{i}"), UvRect::grid(columns, 2))
            .with_clip(ClipDefinition::looping(0, columns, 12.0))
            .with_clip(ClipDefinition::once(columns, columns, 8.0));
        match system.record_animation_set(&definition) {
            Ok(_) => sets.push(definition.id()),
            Err(error) => tracing::warn!(%error, "skipping animation set"),
        }
    }
    if sets.is_empty() {
        tracing::error!("no animation set could be recorded");
        return;
    }
    let tint = system.set_paint(PaintConfig::new([1.0, 0.0, 1.0, 1.0], [0.2, 0.8, 0.2, 1.0], 0.1));

    let mut rng = Scatter(0x9E37_79B9_7F4A_7C15);
    let mut live: Vec<InstanceId> = (0..sprites)
        .map(|i| {
            let transform = scattered(&mut rng);
            system.instantiate(sets[i % sets.len()], transform, Vec4::ONE, Lifetime::FOREVER)
        })
        .collect();

    let mut sink = DrawLog::new();
    let started = Instant::now();
    let mut drawn = 0usize;
    for frame in 0..frames {
        let chunk = (live.len() / PRODUCERS as usize).max(1);
        let buffers: Vec<_> = live
            .par_chunks(chunk)
            .enumerate()
            .map(|(producer, ids)| {
                let mut rng = Scatter(0xA076_1D64_78BD_642F ^ (((frame as u64) << 8) | producer as u64));
                let mut buffer = CommandBuffer::new(producer as u64);
                for _ in 0..ids.len() / 50 {
                    let id = ids[rng.below(ids.len())];
                    match rng.below(5) {
                        0 => buffer.set_transform(id, scattered(&mut rng)),
                        1 => buffer.set_color(id, Vec4::new(rng.unit(), rng.unit(), rng.unit(), 1.0)),
                        2 => buffer.set_play_speed(id, rng.unit() * 2.0),
                        3 => buffer.set_animation(id, Some(sets[rng.below(sets.len())])),
                        _ => buffer.remove(id),
                    }
                }
                buffer
            })
            .collect();
        for buffer in buffers {
            system.submit(buffer);
        }

        for _ in 0..sprites / 100 {
            let set = sets[rng.below(sets.len())];
            let transform = scattered(&mut rng);
            live.push(system.instantiate(set, transform, Vec4::ONE, Lifetime::timed(rng.unit())));
        }
        if frame % 30 == 15 {
            if let Some(&id) = live.first() {
                system.set_paints(id, PaintPair::new(tint, tint));
            }
        }

        let frame_start = Instant::now();
        let camera = Mat4::from_rotation_z(frame as f32 * 0.01);
        let stats = system.update(FRAME_DT, Some(camera), &mut sink);
        drawn += sink.take().iter().map(|call| call.instance_count as usize).sum::<usize>();
        tracing::debug!(
            frame = stats.frame,
            touched = stats.touched_batches,
            removed = stats.removed,
            joined = stats.joined,
            updated = stats.updated_slots,
            active = stats.active_instances,
            elapsed_us = frame_start.elapsed().as_micros() as u64,
            "frame"
        );

        live.retain(|&id| system.world().is_alive(id));
    }

    let elapsed = started.elapsed();
    let device = system.renderer().gpu().device().stats();
    tracing::info!(
        frames,
        live = system.world().len(),
        drawn,
        avg_frame_us = (elapsed.as_micros() / frames.max(1) as u128) as u64,
        buffers_created = device.created,
        bytes_written = device.bytes_written,
        "sprite stress finished"
    );
    system.dispose();
}
