//! Frame orchestration.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         ONE FRAME                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  1. Submit draws queued last frame (buffers still hold N-1)   │
//! │  2. Resolve camera frustum, or mark culling inactive          │
//! │  3. Assign batch membership (single thread)                   │
//! │  4. ChangeTracker: four attribute scans in parallel           │
//! │  5. BatchCompactor: one task per batch                        │
//! │  6. Drop change maps                                          │
//! │  7. GpuBufferSync: palette, dirty arrays, draw args           │
//! │  8. Remember frustum, queue this frame's draws                │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use glam::Mat4;
use spritehive_core::{AnimationSetId, BatchId, InstanceId, SpriteWorld};

use super::draw::DrawSink;
use super::stats::FrameStats;
use crate::animation::{AnimationLibrary, AnimationSetDefinition};
use crate::batch::{compact_all, Batch, CompactionContext};
use crate::config::RendererConfig;
use crate::culling::Frustum;
use crate::error::RecordResult;
use crate::gpu::{GpuBufferSync, GpuDevice};
use crate::palette::{PaintConfig, PaintPalette};
use crate::tracking::ChangeTracker;

/// Keeps packed sprite batches and their GPU copies in sync with a
/// [`SpriteWorld`].
pub struct SpriteRenderer<D: GpuDevice> {
    config: RendererConfig,
    library: AnimationLibrary,
    batches: Vec<Batch>,
    palette: PaintPalette,
    palette_reset: bool,
    tracker: ChangeTracker,
    gpu: GpuBufferSync<D>,
    last_frustum: Option<Frustum>,
    queued: Vec<BatchId>,
    frame: u64,
}

impl<D: GpuDevice> SpriteRenderer<D> {
    /// Renderer over `device`. Out-of-range config values fall back to
    /// their defaults.
    #[must_use]
    pub fn new(device: D, config: RendererConfig) -> Self {
        let config = config.sanitized();
        Self {
            gpu: GpuBufferSync::new(device, &config),
            config,
            library: AnimationLibrary::new(),
            batches: Vec::new(),
            palette: PaintPalette::new(),
            palette_reset: false,
            tracker: ChangeTracker::new(),
            last_frustum: None,
            queued: Vec::new(),
            frame: 0,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Recorded animation sets; also the clip source for the playback tick.
    #[must_use]
    pub const fn library(&self) -> &AnimationLibrary {
        &self.library
    }

    /// GPU sync layer.
    #[must_use]
    pub const fn gpu(&self) -> &GpuBufferSync<D> {
        &self.gpu
    }

    /// Paint palette.
    #[must_use]
    pub const fn palette(&self) -> &PaintPalette {
        &self.palette
    }

    /// All batches, indexed by [`BatchId`].
    #[must_use]
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// One batch.
    #[must_use]
    pub fn batch(&self, id: BatchId) -> Option<&Batch> {
        self.batches.get(id.index())
    }

    /// Frames rendered so far.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Records an animation set, creating its batch on first sight.
    ///
    /// # Errors
    ///
    /// Returns the validation error of a malformed definition; no batch is
    /// created in that case.
    pub fn record_animation_set(&mut self, definition: &AnimationSetDefinition) -> RecordResult<BatchId> {
        let recorded = self.library.record(definition)?;
        if recorded.created {
            self.batches.push(Batch::new(recorded.batch, recorded.blob.clone()));
            self.gpu.register_batch(recorded.batch, recorded.blob, &self.palette);
            tracing::debug!(batch = %recorded.batch, "batch created");
        }
        Ok(recorded.batch)
    }

    /// Returns true if `set` was recorded.
    #[must_use]
    pub fn is_recorded(&self, set: AnimationSetId) -> bool {
        self.library.is_recorded(set)
    }

    /// Palette index of `config`, inserting it if new.
    pub fn set_paint(&mut self, config: PaintConfig) -> u32 {
        self.palette.lookup_or_insert(config)
    }

    /// Resets the palette to the identity entry. Stored indices past the
    /// new end fall back to the identity on the next frame.
    pub fn clear_all_paints(&mut self) {
        self.palette.reset();
        self.palette_reset = true;
    }

    /// Points every live instance at the batch of its animation set.
    ///
    /// Single-threaded: this is what guarantees no instance is claimed by
    /// two batches during parallel compaction. Returns the number of moves.
    pub fn assign_memberships(&self, world: &mut SpriteWorld) -> usize {
        let moves: Vec<(InstanceId, Option<BatchId>)> = world
            .iter()
            .filter_map(|(id, instance)| {
                let target = instance.animation.and_then(|set| self.library.batch_of(set));
                (target != instance.batch).then_some((id, target))
            })
            .collect();
        for &(id, batch) in &moves {
            world.assign_batch(id, batch);
        }
        moves.len()
    }

    /// Runs one frame.
    ///
    /// `camera` is the view-projection matrix; `None` (or culling disabled
    /// in the config) draws every enabled sprite.
    pub fn render_frame<S: DrawSink<D>>(
        &mut self,
        world: &mut SpriteWorld,
        camera: Option<Mat4>,
        sink: &mut S,
    ) -> FrameStats {
        self.frame += 1;
        let _span = tracing::debug_span!("frame", frame = self.frame).entered();
        let mut stats = FrameStats {
            frame: self.frame,
            batches: self.batches.len(),
            ..FrameStats::default()
        };

        for batch in std::mem::take(&mut self.queued) {
            if let Some(call) = self.gpu.draw_call(batch) {
                sink.draw(call);
                stats.draws_submitted += 1;
            }
        }

        let frustum = camera.filter(|_| self.config.culling).map(Frustum::new);
        let frustum_changed = frustum != self.last_frustum;

        self.assign_memberships(world);
        let changes = self.tracker.collect(world);

        let ctx = CompactionContext {
            world,
            changes: &changes,
            frustum: frustum.as_ref(),
            frustum_changed,
            palette_reset: self.palette_reset,
            palette_len: self.palette.len(),
            min_capacity: self.config.min_batch_capacity,
            grow_threshold: self.config.grow_threshold,
        };
        let (report, touched) = compact_all(&mut self.batches, &ctx);
        drop(changes);

        stats.touched_batches = touched;
        stats.removed = report.removed;
        stats.joined = report.joined;
        stats.updated_slots = report.updated_slots;
        stats.partition_swaps = report.partition_swaps;

        {
            let _upload = tracing::debug_span!("upload").entered();
            self.gpu.broadcast_palette(&self.palette);
            for batch in &mut self.batches {
                if batch.take_dirty() && self.gpu.upload_batch(batch) {
                    stats.uploads += 1;
                }
                let active = batch.active_count();
                if self.gpu.set_instance_count(batch.id(), active as u32) {
                    stats.args_writes += 1;
                }
                if active > 0 {
                    self.queued.push(batch.id());
                }
                stats.active_instances += active;
            }
            self.gpu.poll();
        }

        self.last_frustum = frustum;
        self.palette_reset = false;
        tracing::trace!(?stats, "frame complete");
        stats
    }

    /// Drops every batch and animation set; the world keeps its instances
    /// but loses all memberships.
    pub fn reset(&mut self, world: &mut SpriteWorld) {
        self.gpu.dispose();
        self.batches.clear();
        self.library.clear();
        self.queued.clear();
        self.tracker.reset();
        self.last_frustum = None;
        world.clear_memberships();
        tracing::debug!("sprite renderer reset");
    }

    /// Releases every GPU buffer. Batch ids restart at 0 afterwards, so
    /// world memberships are dropped along with them.
    pub fn dispose(&mut self, world: &mut SpriteWorld) {
        self.reset(world);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec3, Vec4};
    use spritehive_core::{FrameIndex, PaintPair, SpriteDesc, SpriteTransform};

    use crate::animation::UvRect;
    use crate::gpu::RecordingDevice;
    use crate::pipeline::{DrawLog, DrawRecord};

    fn renderer() -> SpriteRenderer<RecordingDevice> {
        SpriteRenderer::new(RecordingDevice::new(), RendererConfig::default())
    }

    fn desc(set: AnimationSetId, x: f32) -> SpriteDesc {
        SpriteDesc::new(set, SpriteTransform::from_position(Vec3::new(x, 0.0, 0.5)))
    }

    #[test]
    fn test_draws_lag_one_frame() {
        let mut renderer = renderer();
        let mut world = SpriteWorld::new();
        let mut log = DrawLog::new();
        let batch = renderer
            .record_animation_set(&AnimationSetDefinition::new("a", UvRect::grid(2, 2)))
            .expect("valid");
        let set = renderer.batch(batch).map(Batch::set).expect("batch");
        for i in 0..3 {
            world.spawn(desc(set, i as f32 * 0.1));
        }

        let first = renderer.render_frame(&mut world, Some(Mat4::IDENTITY), &mut log);
        assert_eq!(first.draws_submitted, 0);
        assert_eq!(first.joined, 3);
        assert_eq!(first.active_instances, 3);

        let second = renderer.render_frame(&mut world, Some(Mat4::IDENTITY), &mut log);
        assert_eq!(second.draws_submitted, 1);
        assert_eq!(log.take(), vec![DrawRecord { batch, instance_count: 3 }]);
        assert!(second.is_quiet());
        assert_eq!(second.touched_batches, 0);
        assert_eq!(second.uploads, 0);
        assert_eq!(second.args_writes, 0);
    }

    #[test]
    fn test_animation_switch_moves_between_batches() {
        let mut renderer = renderer();
        let mut world = SpriteWorld::new();
        let a = renderer
            .record_animation_set(&AnimationSetDefinition::new("a", UvRect::grid(2, 2)))
            .expect("valid");
        let b = renderer
            .record_animation_set(&AnimationSetDefinition::new("b", UvRect::grid(3, 3)))
            .expect("valid");
        let set_a = renderer.batch(a).map(Batch::set).expect("a");
        let set_b = renderer.batch(b).map(Batch::set).expect("b");

        let id = world.spawn(desc(set_a, 0.0));
        renderer.render_frame(&mut world, None, &mut DrawLog::new());
        assert_eq!(renderer.batch(a).map(Batch::len), Some(1));

        world.set_animation(id, Some(set_b));
        let stats = renderer.render_frame(&mut world, None, &mut DrawLog::new());
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.joined, 1);
        assert_eq!(renderer.batch(a).map(Batch::len), Some(0));
        assert_eq!(renderer.batch(b).map(Batch::owners), Some(&[id][..]));
    }

    #[test]
    fn test_unrecorded_animation_has_no_batch() {
        let mut renderer = renderer();
        let mut world = SpriteWorld::new();
        let id = world.spawn(desc(AnimationSetId(77), 0.0));
        let stats = renderer.render_frame(&mut world, None, &mut DrawLog::new());
        assert_eq!(world.batch_of(id), None);
        assert_eq!(stats.active_instances, 0);
    }

    #[test]
    fn test_hidden_and_culled_sprites_not_drawn() {
        let mut renderer = renderer();
        let mut world = SpriteWorld::new();
        let batch = renderer
            .record_animation_set(&AnimationSetDefinition::new("a", UvRect::grid(2, 2)))
            .expect("valid");
        let set = renderer.batch(batch).map(Batch::set).expect("batch");
        let shown = world.spawn(desc(set, 0.0));
        let hidden = world.spawn(desc(set, 0.0));
        let offscreen = world.spawn(desc(set, 4.0));
        world.set_frame(hidden, FrameIndex::hidden(0));

        let stats = renderer.render_frame(&mut world, Some(Mat4::IDENTITY), &mut DrawLog::new());
        assert_eq!(stats.active_instances, 1);
        assert_eq!(renderer.batch(batch).map(|b| b.owners()[0]), Some(shown));

        let stats = renderer.render_frame(&mut world, None, &mut DrawLog::new());
        assert_eq!(stats.active_instances, 2);
        assert!(renderer.batch(batch).is_some_and(|b| b.position_of(offscreen) < Some(2)));
    }

    #[test]
    fn test_clear_all_paints_clamps_indices() {
        let mut renderer = renderer();
        let mut world = SpriteWorld::new();
        let batch = renderer
            .record_animation_set(&AnimationSetDefinition::new("a", UvRect::grid(2, 2)))
            .expect("valid");
        let set = renderer.batch(batch).map(Batch::set).expect("batch");
        let paint = renderer.set_paint(PaintConfig::new([1.0; 4], [0.0, 1.0, 0.0, 1.0], 0.2));
        world.spawn(desc(set, 0.0).with_paints(PaintPair::new(paint, paint)).with_color(Vec4::ONE));
        renderer.render_frame(&mut world, None, &mut DrawLog::new());
        assert_eq!(renderer.batch(batch).map(|b| b.colors()[0].primary), Some(1));

        renderer.clear_all_paints();
        assert_eq!(renderer.palette().len(), 1);
        renderer.render_frame(&mut world, None, &mut DrawLog::new());
        assert_eq!(renderer.batch(batch).map(|b| b.colors()[0].primary), Some(0));
    }

    #[test]
    fn test_reset_clears_batches_and_memberships() {
        let mut renderer = renderer();
        let mut world = SpriteWorld::new();
        let batch = renderer
            .record_animation_set(&AnimationSetDefinition::new("a", UvRect::grid(2, 2)))
            .expect("valid");
        let set = renderer.batch(batch).map(Batch::set).expect("batch");
        let id = world.spawn(desc(set, 0.0));
        renderer.render_frame(&mut world, None, &mut DrawLog::new());

        renderer.reset(&mut world);
        assert!(renderer.batches().is_empty());
        assert!(!renderer.is_recorded(set));
        assert_eq!(world.batch_of(id), None);
        assert_eq!(renderer.gpu().device().live_buffers(), 0);
    }

    #[test]
    fn test_rerecord_after_dispose_refills_batch() {
        let mut renderer = renderer();
        let mut world = SpriteWorld::new();
        let definition = AnimationSetDefinition::new("a", UvRect::grid(2, 2));
        let batch = renderer.record_animation_set(&definition).expect("valid");
        world.spawn(desc(definition.id(), 0.0));
        renderer.render_frame(&mut world, None, &mut DrawLog::new());
        assert_eq!(renderer.batch(batch).map(Batch::len), Some(1));

        renderer.dispose(&mut world);
        let again = renderer.record_animation_set(&definition).expect("valid");
        assert_eq!(again, batch);
        let stats = renderer.render_frame(&mut world, None, &mut DrawLog::new());
        assert_eq!(stats.joined, 1);
        assert_eq!(renderer.batch(again).map(Batch::len), Some(1));
        assert_eq!(renderer.batch(again).map(Batch::active_count), Some(1));
    }
}
