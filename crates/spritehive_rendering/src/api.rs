//! Public facade.
//!
//! [`SpriteSystem`] owns the sprite world, the renderer and the deferred
//! command queue. Gameplay code either mutates sprites immediately from the
//! control thread or fills [`CommandBuffer`]s on any thread and submits them;
//! submitted buffers are applied at the start of the next [`SpriteSystem::update`].

use glam::{Mat4, Vec4};
use spritehive_core::{
    AnimationSetId, ApplyReport, BatchId, CommandBuffer, CommandQueue, InstanceId, Lifetime,
    PaintPair, SpriteDesc, SpriteTransform, SpriteWorld,
};

use crate::animation::AnimationSetDefinition;
use crate::config::RendererConfig;
use crate::error::RecordResult;
use crate::gpu::GpuDevice;
use crate::palette::PaintConfig;
use crate::pipeline::{DrawSink, FrameStats, SpriteRenderer};

/// Sprite world plus everything needed to draw it.
pub struct SpriteSystem<D: GpuDevice> {
    world: SpriteWorld,
    renderer: SpriteRenderer<D>,
    commands: CommandQueue,
}

impl<D: GpuDevice> SpriteSystem<D> {
    /// Empty system drawing through `device`.
    #[must_use]
    pub fn new(device: D, config: RendererConfig) -> Self {
        Self {
            world: SpriteWorld::new(),
            renderer: SpriteRenderer::new(device, config),
            commands: CommandQueue::new(),
        }
    }

    /// Records an animation set. Recording the same content twice returns
    /// the same batch and does nothing else.
    ///
    /// # Errors
    ///
    /// Rejects malformed definitions; [`Self::is_recorded`] stays false.
    pub fn record_animation_set(&mut self, definition: &AnimationSetDefinition) -> RecordResult<BatchId> {
        self.renderer.record_animation_set(definition)
    }

    /// Returns true if `set` was recorded.
    #[must_use]
    pub fn is_recorded(&self, set: AnimationSetId) -> bool {
        self.renderer.is_recorded(set)
    }

    /// Spawns a sprite playing `set`. It is drawn from the frame after the
    /// next [`Self::update`].
    pub fn instantiate(
        &mut self,
        set: AnimationSetId,
        transform: SpriteTransform,
        color: Vec4,
        lifetime: Lifetime,
    ) -> InstanceId {
        self.spawn(SpriteDesc::new(set, transform).with_color(color).with_lifetime(lifetime))
    }

    /// Spawns a sprite from a full description.
    pub fn spawn(&mut self, desc: SpriteDesc) -> InstanceId {
        self.world.spawn(desc)
    }

    /// Switches the sprite to another animation set, moving it to that
    /// set's batch. `None` stops drawing it.
    pub fn set_animation(&mut self, id: InstanceId, set: Option<AnimationSetId>) -> bool {
        self.world.set_animation(id, set)
    }

    /// Restarts playback on another clip of the current set.
    pub fn set_clip(&mut self, id: InstanceId, clip: u16) -> bool {
        self.world.set_clip(id, clip)
    }

    /// Sets the playback rate multiplier.
    pub fn set_play_speed(&mut self, id: InstanceId, speed: f32) -> bool {
        self.world.set_play_speed(id, speed)
    }

    /// Sets the base color.
    pub fn set_color(&mut self, id: InstanceId, color: Vec4) -> bool {
        self.world.set_color(id, color)
    }

    /// Moves the sprite.
    pub fn set_transform(&mut self, id: InstanceId, transform: SpriteTransform) -> bool {
        self.world.set_transform(id, transform)
    }

    /// Sets the palette indices.
    pub fn set_paints(&mut self, id: InstanceId, paints: PaintPair) -> bool {
        self.world.set_paints(id, paints)
    }

    /// Hides or shows the sprite without stopping playback.
    pub fn set_hidden(&mut self, id: InstanceId, hidden: bool) -> bool {
        self.world.set_hidden(id, hidden)
    }

    /// Removes the sprite. Its slot disappears on the next update.
    pub fn remove(&mut self, id: InstanceId) -> bool {
        self.world.despawn(id)
    }

    /// Palette index of `config`, inserting it if new.
    pub fn set_paint(&mut self, config: PaintConfig) -> u32 {
        self.renderer.set_paint(config)
    }

    /// Drops every paint except the identity entry.
    pub fn clear_all_paints(&mut self) {
        self.renderer.clear_all_paints();
    }

    /// Empty buffer for a deferred producer. Buffers apply in `sort_key`
    /// order, then submission order.
    #[must_use]
    pub const fn command_buffer(&self, sort_key: u64) -> CommandBuffer {
        CommandBuffer::new(sort_key)
    }

    /// Queues a filled buffer for the next update.
    pub fn submit(&self, buffer: CommandBuffer) {
        self.commands.submit(buffer);
    }

    /// Shared queue, for producers running on other threads.
    #[must_use]
    pub const fn commands(&self) -> &CommandQueue {
        &self.commands
    }

    /// Applies queued commands right away instead of at the next update.
    pub fn flush_commands(&mut self) -> ApplyReport {
        self.commands.apply(&mut self.world)
    }

    /// Runs one frame: queued commands, playback, then rendering.
    pub fn update<S: DrawSink<D>>(&mut self, dt: f32, camera: Option<Mat4>, sink: &mut S) -> FrameStats {
        let applied = self.flush_commands();
        let ticked = self.world.tick(dt, self.renderer.library());
        tracing::trace!(
            applied = applied.applied,
            stale = applied.stale,
            expired = ticked.expired,
            "sprite update"
        );
        self.renderer.render_frame(&mut self.world, camera, sink)
    }

    /// Sprite state.
    #[must_use]
    pub const fn world(&self) -> &SpriteWorld {
        &self.world
    }

    /// Renderer state.
    #[must_use]
    pub const fn renderer(&self) -> &SpriteRenderer<D> {
        &self.renderer
    }

    /// Forgets every animation set and batch. Sprites survive but draw
    /// nothing until their sets are recorded again.
    pub fn reset(&mut self) {
        self.renderer.reset(&mut self.world);
    }

    /// Releases every GPU buffer. Sets must be recorded again before their
    /// sprites draw.
    pub fn dispose(&mut self) {
        self.renderer.dispose(&mut self.world);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    use crate::animation::UvRect;
    use crate::gpu::RecordingDevice;
    use crate::pipeline::NullSink;

    fn system() -> (SpriteSystem<RecordingDevice>, AnimationSetId) {
        let mut system = SpriteSystem::new(RecordingDevice::new(), RendererConfig::default());
        let definition = AnimationSetDefinition::new("walk", UvRect::grid(4, 1));
        system.record_animation_set(&definition).expect("valid");
        (system, definition.id())
    }

    #[test]
    fn test_instantiate_then_update_fills_batch() {
        let (mut system, set) = system();
        let id = system.instantiate(
            set,
            SpriteTransform::from_position(Vec3::new(0.0, 0.0, 0.5)),
            Vec4::ONE,
            Lifetime::FOREVER,
        );
        let stats = system.update(0.0, None, &mut NullSink);
        assert_eq!(stats.joined, 1);
        assert!(system.world().batch_of(id).is_some());
    }

    #[test]
    fn test_deferred_remove_applies_on_update() {
        let (mut system, set) = system();
        let id = system.spawn(SpriteDesc::new(set, SpriteTransform::IDENTITY));
        system.update(0.0, None, &mut NullSink);

        let mut buffer = system.command_buffer(0);
        buffer.remove(id);
        system.submit(buffer);
        assert!(system.world().is_alive(id));

        let stats = system.update(0.0, None, &mut NullSink);
        assert!(!system.world().is_alive(id));
        assert_eq!(stats.removed, 1);
    }

    #[test]
    fn test_stale_handles_are_ignored() {
        let (mut system, set) = system();
        let id = system.spawn(SpriteDesc::new(set, SpriteTransform::IDENTITY));
        assert!(system.remove(id));
        assert!(!system.remove(id));
        assert!(!system.set_play_speed(id, 2.0));
        assert!(!system.set_color(id, Vec4::ZERO));
    }

    #[test]
    fn test_timed_lifetime_expires() {
        let (mut system, set) = system();
        let id = system.instantiate(set, SpriteTransform::IDENTITY, Vec4::ONE, Lifetime::timed(0.5));
        system.update(0.25, None, &mut NullSink);
        assert!(system.world().is_alive(id));
        system.update(0.5, None, &mut NullSink);
        assert!(!system.world().is_alive(id));
    }

    #[test]
    fn test_dispose_then_record_again_draws() {
        let (mut system, set) = system();
        let id = system.spawn(SpriteDesc::new(set, SpriteTransform::IDENTITY));
        system.update(0.0, None, &mut NullSink);

        system.dispose();
        assert!(!system.is_recorded(set));
        assert_eq!(system.world().batch_of(id), None);

        system
            .record_animation_set(&AnimationSetDefinition::new("walk", UvRect::grid(4, 1)))
            .expect("valid");
        let stats = system.update(0.0, None, &mut NullSink);
        assert_eq!(stats.joined, 1);
        assert_eq!(stats.active_instances, 1);
    }
}
