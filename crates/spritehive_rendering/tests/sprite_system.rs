//! # Sprite System Tests
//!
//! Drives the public facade end to end over a recording device:
//!
//! 1. **Recording**: idempotent by content, malformed sets rejected
//! 2. **Commands**: parallel producers, deterministic application
//! 3. **Frames**: one-frame draw lag, exact draw args, skipped batches
//! 4. **Palette**: dedup and reset
//!
//! Run with: cargo test -p spritehive_rendering --test sprite_system

use glam::{Mat4, Vec3, Vec4};
use spritehive_core::{
    AnimationSetId, CommandBuffer, FrameIndex, InstanceId, Lifetime, PaintPair, SpriteDesc,
    SpriteTransform,
};
use spritehive_rendering::{
    AnimationSetDefinition, ClipDefinition, DrawCall, DrawSink, NullSink, PaintConfig, RecordError,
    RecordingDevice, RendererConfig, SpriteSystem, UvRect,
};

fn system() -> SpriteSystem<RecordingDevice> {
    SpriteSystem::new(RecordingDevice::new(), RendererConfig::default())
}

fn walk() -> AnimationSetDefinition {
    AnimationSetDefinition::new("walk", UvRect::grid(4, 2))
        .with_clip(ClipDefinition::looping(0, 4, 10.0))
        .with_clip(ClipDefinition::once(4, 4, 10.0))
}

fn at(x: f32) -> SpriteTransform {
    SpriteTransform::from_position(Vec3::new(x, 0.0, 0.5))
}

/// Reads back what each draw binds.
struct ReadbackSink {
    device: RecordingDevice,
    args: Vec<[u32; 5]>,
    frames: Vec<Vec<i32>>,
    paint_head: Vec<[f32; 24]>,
}

impl ReadbackSink {
    fn new(device: RecordingDevice) -> Self {
        Self {
            device,
            args: Vec::new(),
            frames: Vec::new(),
            paint_head: Vec::new(),
        }
    }
}

fn words(bytes: &[u8]) -> impl Iterator<Item = [u8; 4]> + '_ {
    bytes.chunks_exact(4).map(|w| [w[0], w[1], w[2], w[3]])
}

impl DrawSink<RecordingDevice> for ReadbackSink {
    fn draw(&mut self, call: DrawCall<'_, RecordingDevice>) {
        let args = self.device.read(call.args).unwrap_or_default();
        let mut record = [0u32; 5];
        for (slot, word) in record.iter_mut().zip(words(&args)) {
            *slot = u32::from_le_bytes(word);
        }
        self.args.push(record);

        let index = self.device.read(call.index).unwrap_or_default();
        let frames = words(&index)
            .take(call.instance_count as usize)
            .map(i32::from_le_bytes)
            .collect();
        self.frames.push(frames);

        let paint = self.device.read(call.paint).unwrap_or_default();
        let mut head = [0f32; 24];
        for (slot, word) in head.iter_mut().zip(words(&paint)) {
            *slot = f32::from_le_bytes(word);
        }
        self.paint_head.push(head);
    }
}

// ============================================================================
// RECORDING
// ============================================================================

#[test]
fn recording_twice_is_a_no_op() {
    let mut system = system();
    let first = system.record_animation_set(&walk()).expect("valid");
    let created = system.renderer().gpu().device().stats().created;

    let again = system.record_animation_set(&walk()).expect("valid");
    assert_eq!(first, again);
    assert_eq!(system.renderer().batches().len(), 1);
    assert_eq!(system.renderer().gpu().device().stats().created, created);
    assert!(system.is_recorded(walk().id()));
}

#[test]
fn renamed_copy_shares_the_batch() {
    let mut system = system();
    let first = system.record_animation_set(&walk()).expect("valid");
    let mut renamed = walk();
    renamed.name = "walk_copy".into();
    assert_eq!(system.record_animation_set(&renamed).expect("valid"), first);
}

#[test]
fn malformed_set_is_not_recorded() {
    let mut system = system();
    let empty = AnimationSetDefinition::new("empty", Vec::new());
    assert!(matches!(
        system.record_animation_set(&empty),
        Err(RecordError::EmptyFrames { .. })
    ));
    assert!(!system.is_recorded(empty.id()));

    let overflowing = AnimationSetDefinition::new("short", UvRect::grid(2, 1))
        .with_clip(ClipDefinition::looping(1, 4, 12.0));
    assert!(matches!(
        system.record_animation_set(&overflowing),
        Err(RecordError::ClipOutOfRange { .. })
    ));
    assert!(!system.is_recorded(overflowing.id()));
    assert!(system.renderer().batches().is_empty());
}

#[test]
fn sprites_of_unrecorded_sets_are_not_drawn() {
    let mut system = system();
    system.spawn(SpriteDesc::new(AnimationSetId(42), at(0.0)));
    let stats = system.update(0.0, None, &mut NullSink);
    assert_eq!(stats.active_instances, 0);
    assert_eq!(stats.batches, 0);
}

// ============================================================================
// COMMANDS
// ============================================================================

#[test]
fn parallel_producers_apply_in_sort_key_order() {
    let mut system = system();
    system.record_animation_set(&walk()).expect("valid");
    let set = walk().id();
    let id = system.spawn(SpriteDesc::new(set, at(0.0)));

    rayon::scope(|scope| {
        let queue = system.commands();
        for producer in (0..8u64).rev() {
            scope.spawn(move |_| {
                let mut buffer = CommandBuffer::new(producer);
                buffer.set_color(id, Vec4::splat(producer as f32 / 7.0));
                buffer.instantiate(SpriteDesc::new(set, at(0.1)));
                queue.submit(buffer);
            });
        }
    });

    let stats = system.update(0.0, None, &mut NullSink);
    assert_eq!(system.world().len(), 9);
    assert_eq!(system.world().get(id).map(|s| s.color), Some(Vec4::ONE));
    assert_eq!(stats.joined, 9);
}

#[test]
fn deferred_commands_on_removed_sprite_are_dropped() {
    let mut system = system();
    system.record_animation_set(&walk()).expect("valid");
    let id = system.spawn(SpriteDesc::new(walk().id(), at(0.0)));

    let mut buffer = system.command_buffer(1);
    buffer.set_play_speed(id, 3.0);
    buffer.set_animation(id, None);
    system.submit(buffer);
    assert!(system.remove(id));

    let report = system.flush_commands();
    assert_eq!(report.applied, 0);
    assert_eq!(report.stale, 2);
}

// ============================================================================
// FRAMES
// ============================================================================

#[test]
fn draws_follow_one_frame_behind_with_exact_count() {
    let device = RecordingDevice::new();
    let mut system = SpriteSystem::new(device.clone(), RendererConfig::default());
    system.record_animation_set(&walk()).expect("valid");
    let ids: Vec<InstanceId> = (0..10)
        .map(|i| system.spawn(SpriteDesc::new(walk().id(), at(i as f32 * 0.05))))
        .collect();
    let mut sink = ReadbackSink::new(device);

    let first = system.update(0.0, Some(Mat4::IDENTITY), &mut sink);
    assert_eq!(first.draws_submitted, 0);
    assert!(sink.args.is_empty());

    system.set_hidden(ids[3], true);
    let second = system.update(0.0, Some(Mat4::IDENTITY), &mut sink);
    assert_eq!(second.draws_submitted, 1);
    assert_eq!(sink.args[0], [6, 10, 0, 0, 0]);
    assert_eq!(second.active_instances, 9);

    system.update(0.0, Some(Mat4::IDENTITY), &mut sink);
    assert_eq!(sink.args[1], [6, 9, 0, 0, 0]);
    assert!(sink.frames[1].iter().all(|&frame| frame >= 0));
}

#[test]
fn unchanged_frame_skips_every_batch() {
    let mut system = system();
    system.record_animation_set(&walk()).expect("valid");
    system
        .record_animation_set(&AnimationSetDefinition::new("idle", UvRect::grid(2, 2)))
        .expect("valid");
    for i in 0..50 {
        system.spawn(SpriteDesc::new(walk().id(), at(i as f32 * 0.01)));
    }
    system.update(0.0, Some(Mat4::IDENTITY), &mut NullSink);

    let quiet = system.update(0.0, Some(Mat4::IDENTITY), &mut NullSink);
    assert_eq!(quiet.touched_batches, 0);
    assert_eq!(quiet.updated_slots, 0);
    assert_eq!(quiet.partition_swaps, 0);
    assert_eq!(quiet.uploads, 0);
    assert!(quiet.is_quiet());
}

#[test]
fn moving_camera_repartitions() {
    let mut system = system();
    system.record_animation_set(&walk()).expect("valid");
    system.spawn(SpriteDesc::new(walk().id(), at(0.0)));
    system.spawn(SpriteDesc::new(walk().id(), at(0.9)));
    let stats = system.update(0.0, Some(Mat4::IDENTITY), &mut NullSink);
    assert_eq!(stats.active_instances, 2);

    let shifted = Mat4::from_translation(Vec3::new(0.5, 0.0, 0.0));
    let stats = system.update(0.0, Some(shifted), &mut NullSink);
    assert_eq!(stats.active_instances, 1);
    assert_eq!(stats.touched_batches, 1);
}

#[test]
fn playback_advances_frames() {
    let mut system = system();
    system.record_animation_set(&walk()).expect("valid");
    let id = system.spawn(SpriteDesc::new(walk().id(), at(0.0)));
    system.update(0.0, None, &mut NullSink);

    system.update(0.25, None, &mut NullSink);
    let frame = system.world().get(id).map(|s| s.frame);
    assert_eq!(frame, Some(FrameIndex::visible(2)));

    assert!(system.set_clip(id, 1));
    system.update(1.0, None, &mut NullSink);
    let frame = system.world().get(id).map(|s| s.frame);
    assert_eq!(frame, Some(FrameIndex::visible(7)));
}

#[test]
fn bound_lifetime_follows_parent() {
    let mut system = system();
    system.record_animation_set(&walk()).expect("valid");
    let parent = system.spawn(SpriteDesc::new(walk().id(), at(0.0)));
    let child = system.instantiate(walk().id(), at(0.1), Vec4::ONE, Lifetime::bound_to(parent));
    system.update(0.0, None, &mut NullSink);
    assert_eq!(system.renderer().batches()[0].len(), 2);

    system.remove(parent);
    let stats = system.update(0.0, None, &mut NullSink);
    assert!(!system.world().is_alive(child));
    assert_eq!(stats.removed, 2);
    assert!(system.renderer().batches()[0].is_empty());
}

// ============================================================================
// PALETTE
// ============================================================================

#[test]
fn identical_paints_share_an_index() {
    let mut system = system();
    let red = PaintConfig::new([1.0, 0.0, 0.0, 1.0], [0.0, 0.0, 1.0, 1.0], 0.1);
    let first = system.set_paint(red);
    assert_eq!(system.set_paint(red), first);
    assert_eq!(system.renderer().palette().len(), 2);
    let softer = system.set_paint(red.with_shaping(0.2, 1.0, 0.0));
    assert_ne!(softer, first);
    assert_eq!(system.renderer().palette().len(), 3);
}

#[test]
fn clear_all_paints_reaches_the_gpu() {
    let device = RecordingDevice::new();
    let mut system = SpriteSystem::new(device.clone(), RendererConfig::default());
    system.record_animation_set(&walk()).expect("valid");
    let paint = system.set_paint(PaintConfig::new([1.0; 4], [0.5; 4], 0.3));
    let id = system.spawn(SpriteDesc::new(walk().id(), at(0.0)));
    system.set_paints(id, PaintPair::new(paint, paint));
    let mut sink = ReadbackSink::new(device);
    system.update(0.0, None, &mut sink);
    system.update(0.0, None, &mut sink);
    assert_eq!(sink.paint_head[0][..12], [0.0; 12]);
    assert_eq!(
        sink.paint_head[0][12..],
        [1.0, 1.0, 1.0, 1.0, 0.5, 0.5, 0.5, 0.5, 0.3, 0.0, 1.0, 0.0]
    );
    assert_eq!(system.renderer().batches()[0].colors()[0].primary, paint);

    let writes = system.renderer().gpu().stats().palette_writes;
    system.clear_all_paints();
    assert_eq!(system.renderer().palette().len(), 1);
    assert_eq!(system.renderer().palette().get(0), Some(&PaintConfig::IDENTITY));
    system.update(0.0, None, &mut sink);
    assert_eq!(system.renderer().gpu().stats().palette_writes, writes + 1);
    assert_eq!(system.renderer().batches()[0].colors()[0].primary, 0);

    system.update(0.0, None, &mut sink);
    assert_eq!(sink.paint_head.last().map(|head| head[..12] == [0.0; 12]), Some(true));
}
