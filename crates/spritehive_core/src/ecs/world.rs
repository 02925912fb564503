//! # Sprite World
//!
//! The authoritative store for every sprite instance.
//!
//! Rendering keeps a denormalized copy of this data in packed batch arrays.
//! To keep that copy cheap to maintain, every setter compares the old and new
//! value and stamps a per-attribute change tick only when the value really
//! changed. Consumers remember the last tick they saw and pick up exactly the
//! instances stamped after it.

use glam::Vec4;
use rayon::prelude::*;

use super::component::{
    ChangeTicks, FrameIndex, Lifetime, PaintPair, Playback, SpriteTransform, WHITE,
};
use super::entity::{AnimationSetId, BatchId, InstanceId};

/// A logical animated sprite.
///
/// Fields are readable by anyone holding a `&SpriteWorld`; all writes go
/// through the world so change ticks stay truthful.
#[derive(Clone, Debug, PartialEq)]
pub struct SpriteInstance {
    /// Current frame, negative when hidden.
    pub frame: FrameIndex,
    /// World transform.
    pub transform: SpriteTransform,
    /// Base color, each channel in `[0, 1]`.
    pub color: Vec4,
    /// Palette indices.
    pub paints: PaintPair,
    /// Animation set the sprite plays from.
    pub animation: Option<AnimationSetId>,
    /// Batch this sprite is currently assigned to.
    pub batch: Option<BatchId>,
    /// Playback state.
    pub playback: Playback,
    /// Self-destruction rules.
    pub lifetime: Lifetime,
    /// Change ticks per attribute.
    pub changed: ChangeTicks,
}

/// Everything needed to spawn a sprite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpriteDesc {
    /// Animation set to play.
    pub animation: Option<AnimationSetId>,
    /// Initial transform.
    pub transform: SpriteTransform,
    /// Base color.
    pub color: Vec4,
    /// Palette indices.
    pub paints: PaintPair,
    /// Self-destruction rules.
    pub lifetime: Lifetime,
    /// Initial playback state.
    pub playback: Playback,
}

impl Default for SpriteDesc {
    fn default() -> Self {
        Self {
            animation: None,
            transform: SpriteTransform::IDENTITY,
            color: WHITE,
            paints: PaintPair::IDENTITY,
            lifetime: Lifetime::FOREVER,
            playback: Playback::default(),
        }
    }
}

impl SpriteDesc {
    /// Sprite playing `animation` at `transform`.
    #[must_use]
    pub fn new(animation: AnimationSetId, transform: SpriteTransform) -> Self {
        Self {
            animation: Some(animation),
            transform,
            ..Self::default()
        }
    }

    /// Sets the base color.
    #[must_use]
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    /// Sets the lifetime.
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Sets the palette indices.
    #[must_use]
    pub fn with_paints(mut self, paints: PaintPair) -> Self {
        self.paints = paints;
        self
    }
}

#[derive(Clone, Debug, Default)]
pub(super) struct Slot {
    pub(super) generation: u32,
    pub(super) instance: Option<SpriteInstance>,
}

/// Slot table of sprite instances with change tracking.
#[derive(Debug)]
pub struct SpriteWorld {
    /// All instance slots.
    pub(super) slots: Vec<Slot>,
    /// Free list of slot indices for reuse.
    free_indices: Vec<u32>,
    /// Number of currently alive instances.
    alive_count: usize,
    /// Tick stamped on changes made now.
    pub(super) change_tick: u64,
    /// Last tick at which each batch gained or lost a member.
    batch_order: Vec<u64>,
}

impl Default for SpriteWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SpriteWorld {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty world with room for `capacity` instances.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_indices: Vec::new(),
            alive_count: 0,
            change_tick: 1,
            batch_order: Vec::new(),
        }
    }

    /// Number of alive instances.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.alive_count
    }

    /// Returns true if no instance is alive.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.alive_count == 0
    }

    /// Tick stamped on changes made right now.
    #[inline]
    #[must_use]
    pub const fn change_tick(&self) -> u64 {
        self.change_tick
    }

    /// Closes the current change epoch.
    ///
    /// Returns the tick that was current; every change stamped so far is
    /// `<=` the returned value, every later change is `>` it.
    pub fn advance_tick(&mut self) -> u64 {
        let closed = self.change_tick;
        self.change_tick += 1;
        closed
    }

    /// Spawns a new instance.
    ///
    /// Every attribute is stamped as changed. The instance has no batch until
    /// the renderer assigns one.
    pub fn spawn(&mut self, desc: SpriteDesc) -> InstanceId {
        let index = match self.free_indices.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };

        let frame = if desc.playback.hidden {
            FrameIndex::hidden(0)
        } else {
            FrameIndex::visible(0)
        };
        let slot = &mut self.slots[index as usize];
        slot.instance = Some(SpriteInstance {
            frame,
            transform: desc.transform,
            color: desc.color,
            paints: desc.paints,
            animation: desc.animation,
            batch: None,
            playback: desc.playback,
            lifetime: desc.lifetime,
            changed: ChangeTicks::all(self.change_tick),
        });
        self.alive_count += 1;

        InstanceId::new(index, slot.generation)
    }

    /// Despawns an instance, freeing its slot for reuse.
    ///
    /// Returns `false` if the id was stale or null.
    pub fn despawn(&mut self, id: InstanceId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let slot = &mut self.slots[id.index() as usize];
        let batch = slot.instance.take().and_then(|instance| instance.batch);
        slot.generation = slot.generation.wrapping_add(1);
        self.alive_count -= 1;
        self.free_indices.push(id.index());

        if let Some(batch) = batch {
            self.bump_order(batch);
        }
        true
    }

    /// Checks if an instance is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: InstanceId) -> bool {
        self.get(id).is_some()
    }

    /// Looks up an instance.
    #[inline]
    #[must_use]
    pub fn get(&self, id: InstanceId) -> Option<&SpriteInstance> {
        if id.is_null() {
            return None;
        }
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.instance.as_ref()
    }

    /// Batch `id` currently belongs to, if alive and assigned.
    #[inline]
    #[must_use]
    pub fn batch_of(&self, id: InstanceId) -> Option<BatchId> {
        self.get(id).and_then(|instance| instance.batch)
    }

    fn get_mut(&mut self, id: InstanceId) -> Option<&mut SpriteInstance> {
        if id.is_null() {
            return None;
        }
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.instance.as_mut()
    }

    /// Sets the frame index. Returns `false` if the id is stale.
    pub fn set_frame(&mut self, id: InstanceId, frame: FrameIndex) -> bool {
        let tick = self.change_tick;
        let Some(instance) = self.get_mut(id) else {
            return false;
        };
        if instance.frame != frame {
            instance.frame = frame;
            instance.changed.frame = tick;
        }
        true
    }

    /// Sets the base color. Returns `false` if the id is stale.
    pub fn set_color(&mut self, id: InstanceId, color: Vec4) -> bool {
        let tick = self.change_tick;
        let Some(instance) = self.get_mut(id) else {
            return false;
        };
        if instance.color != color {
            instance.color = color;
            instance.changed.color = tick;
        }
        true
    }

    /// Sets the palette indices. Returns `false` if the id is stale.
    pub fn set_paints(&mut self, id: InstanceId, paints: PaintPair) -> bool {
        let tick = self.change_tick;
        let Some(instance) = self.get_mut(id) else {
            return false;
        };
        if instance.paints != paints {
            instance.paints = paints;
            instance.changed.paint = tick;
        }
        true
    }

    /// Sets the world transform. Returns `false` if the id is stale.
    pub fn set_transform(&mut self, id: InstanceId, transform: SpriteTransform) -> bool {
        let tick = self.change_tick;
        let Some(instance) = self.get_mut(id) else {
            return false;
        };
        if instance.transform != transform {
            instance.transform = transform;
            instance.changed.transform = tick;
        }
        true
    }

    /// Switches the animation set and restarts playback on clip 0.
    ///
    /// Batch membership follows on the renderer's next assignment pass.
    pub fn set_animation(&mut self, id: InstanceId, animation: Option<AnimationSetId>) -> bool {
        let Some(instance) = self.get_mut(id) else {
            return false;
        };
        if instance.animation == animation {
            return true;
        }
        instance.animation = animation;
        instance.playback.clip = 0;
        instance.playback.time = 0.0;
        let hidden = instance.playback.hidden;
        self.set_frame(id, FrameIndex::visible(0).with_hidden(hidden))
    }

    /// Switches clip inside the current animation set and rewinds it.
    pub fn set_clip(&mut self, id: InstanceId, clip: u16) -> bool {
        let Some(instance) = self.get_mut(id) else {
            return false;
        };
        instance.playback.clip = clip;
        instance.playback.time = 0.0;
        true
    }

    /// Sets the playback rate. Negative rates are treated as zero.
    pub fn set_play_speed(&mut self, id: InstanceId, speed: f32) -> bool {
        let Some(instance) = self.get_mut(id) else {
            return false;
        };
        instance.playback.speed = speed.max(0.0);
        true
    }

    /// Hides or shows a sprite without losing its frame.
    pub fn set_hidden(&mut self, id: InstanceId, hidden: bool) -> bool {
        let Some(instance) = self.get_mut(id) else {
            return false;
        };
        instance.playback.hidden = hidden;
        let frame = instance.frame.with_hidden(hidden);
        self.set_frame(id, frame)
    }

    /// Replaces the lifetime rules.
    pub fn set_lifetime(&mut self, id: InstanceId, lifetime: Lifetime) -> bool {
        let Some(instance) = self.get_mut(id) else {
            return false;
        };
        instance.lifetime = lifetime;
        true
    }

    /// Moves an instance into `batch` (or out of every batch).
    ///
    /// Stamps the membership tick and marks both the old and the new batch
    /// as reordered. Must only be called from the single thread that owns
    /// the world; batch compaction relies on no instance being claimed by
    /// two batches at once.
    pub fn assign_batch(&mut self, id: InstanceId, batch: Option<BatchId>) -> bool {
        let tick = self.change_tick;
        let Some(instance) = self.get_mut(id) else {
            return false;
        };
        let previous = instance.batch;
        if previous == batch {
            return true;
        }
        instance.batch = batch;
        instance.changed.membership = tick;
        if let Some(old) = previous {
            self.bump_order(old);
        }
        if let Some(new) = batch {
            self.bump_order(new);
        }
        true
    }

    /// Last tick at which `batch` gained or lost a member.
    #[inline]
    #[must_use]
    pub fn batch_order_tick(&self, batch: BatchId) -> u64 {
        self.batch_order.get(batch.index()).copied().unwrap_or(0)
    }

    fn bump_order(&mut self, batch: BatchId) {
        let index = batch.index();
        if index >= self.batch_order.len() {
            self.batch_order.resize(index + 1, 0);
        }
        self.batch_order[index] = self.change_tick;
    }

    /// Drops every batch assignment.
    ///
    /// Used when the renderer discards its batches; the next assignment pass
    /// rebuilds membership from scratch.
    pub fn clear_memberships(&mut self) {
        let tick = self.change_tick;
        for slot in &mut self.slots {
            if let Some(instance) = slot.instance.as_mut() {
                if instance.batch.take().is_some() {
                    instance.changed.membership = tick;
                }
            }
        }
        self.batch_order.clear();
    }

    /// Iterates over alive instances.
    pub fn iter(&self) -> impl Iterator<Item = (InstanceId, &SpriteInstance)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.instance
                .as_ref()
                .map(|instance| (InstanceId::new(index as u32, slot.generation), instance))
        })
    }

    /// Iterates over alive instances on the rayon pool.
    pub fn par_iter(&self) -> impl ParallelIterator<Item = (InstanceId, &SpriteInstance)> + '_ {
        self.slots.par_iter().enumerate().filter_map(|(index, slot)| {
            slot.instance
                .as_ref()
                .map(|instance| (InstanceId::new(index as u32, slot.generation), instance))
        })
    }

    /// Ids of every alive instance.
    #[must_use]
    pub fn ids(&self) -> Vec<InstanceId> {
        self.iter().map(|(id, _)| id).collect()
    }
}
