//! Packed per-batch instance arrays.
//!
//! Four parallel arrays indexed by slot position:
//!
//! | array        | element            | GPU binding       |
//! |--------------|--------------------|-------------------|
//! | `frames`     | `i32`              | `indexBuffer`     |
//! | `colors`     | [`PackedColor`]    | `colorBuffer`     |
//! | `transforms` | [`PackedTransform`]| `transformBuffer` |
//! | `owners`     | [`InstanceId`]     | CPU only          |
//!
//! Slots `[0, active_count)` are enabled and visible and get drawn; slots
//! `[active_count, len)` exist but are skipped by the draw.

use std::collections::HashSet;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use spritehive_core::{AnimationSetId, BatchId, InstanceId, SpriteTransform};

use crate::animation::AnimationBlob;
use crate::color::PackedColor;

/// One `transformBuffer` element.
///
/// Column 0 is `(position.xyz, scale)`, column 1 the rotation quaternion.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PackedTransform {
    /// Position and scale.
    pub position_scale: [f32; 4],
    /// Rotation as `(x, y, z, w)`.
    pub rotation: [f32; 4],
}

impl PackedTransform {
    /// Packs a sprite transform.
    #[inline]
    #[must_use]
    pub fn new(transform: &SpriteTransform) -> Self {
        let p = transform.position;
        Self {
            position_scale: [p.x, p.y, p.z, transform.scale],
            rotation: transform.rotation.to_array(),
        }
    }

    /// World position of the sprite anchor.
    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        let [x, y, z, _] = self.position_scale;
        Vec3::new(x, y, z)
    }
}

impl From<&SpriteTransform> for PackedTransform {
    fn from(transform: &SpriteTransform) -> Self {
        Self::new(transform)
    }
}

/// Smallest accepted load factor. Lower values would demand capacities
/// far beyond any addressable size.
pub const MIN_GROW_THRESHOLD: f32 = 0.05;

/// Geometric growth target: `max(min, next_power_of_two(capacity + 1))`.
/// `None` once the next power of two no longer fits in `usize`.
#[inline]
#[must_use]
pub fn grown_capacity(capacity: usize, min: usize) -> Option<usize> {
    let next = capacity.checked_add(1)?.checked_next_power_of_two()?;
    Some(min.max(next))
}

/// Render group of every sprite playing one animation set.
#[derive(Debug, Clone)]
pub struct Batch {
    pub(crate) id: BatchId,
    pub(crate) blob: Arc<AnimationBlob>,
    pub(crate) capacity: usize,
    pub(crate) active_count: usize,
    pub(crate) frames: Vec<i32>,
    pub(crate) colors: Vec<PackedColor>,
    pub(crate) transforms: Vec<PackedTransform>,
    pub(crate) owners: Vec<InstanceId>,
    pub(crate) dirty: bool,
    /// Compaction scratch, reused across frames.
    pub(crate) visited: Vec<bool>,
    pub(crate) seen: HashSet<InstanceId>,
}

impl Batch {
    /// Empty batch for a recorded set. Storage is allocated on first growth.
    #[must_use]
    pub fn new(id: BatchId, blob: Arc<AnimationBlob>) -> Self {
        Self {
            id,
            blob,
            capacity: 0,
            active_count: 0,
            frames: Vec::new(),
            colors: Vec::new(),
            transforms: Vec::new(),
            owners: Vec::new(),
            dirty: true,
            visited: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Batch id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> BatchId {
        self.id
    }

    /// Animation set drawn by this batch.
    #[inline]
    #[must_use]
    pub fn set(&self) -> AnimationSetId {
        self.blob.id
    }

    /// Shared frame table.
    #[inline]
    #[must_use]
    pub fn blob(&self) -> &Arc<AnimationBlob> {
        &self.blob
    }

    /// Number of slots in use.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Returns true if no slot is in use.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Reserved slots of every array.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots drawn this frame.
    #[inline]
    #[must_use]
    pub const fn active_count(&self) -> usize {
        self.active_count
    }

    /// Frame index array.
    #[inline]
    #[must_use]
    pub fn frames(&self) -> &[i32] {
        &self.frames
    }

    /// Color array.
    #[inline]
    #[must_use]
    pub fn colors(&self) -> &[PackedColor] {
        &self.colors
    }

    /// Transform array.
    #[inline]
    #[must_use]
    pub fn transforms(&self) -> &[PackedTransform] {
        &self.transforms
    }

    /// Owner array.
    #[inline]
    #[must_use]
    pub fn owners(&self) -> &[InstanceId] {
        &self.owners
    }

    /// Slot of `owner`, if present.
    #[must_use]
    pub fn position_of(&self, owner: InstanceId) -> Option<usize> {
        self.owners.iter().position(|&o| o == owner)
    }

    /// Returns true if the arrays changed since the last upload.
    #[inline]
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty flag, returning its previous value.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Grows every array until `len <= threshold * capacity` and
    /// `capacity >= min`. Never shrinks. Returns true if storage grew.
    ///
    /// `threshold` is clamped to `[MIN_GROW_THRESHOLD, 1]`; growth stops at
    /// the largest power of two `usize` holds.
    pub fn ensure_capacity(&mut self, len: usize, min: usize, threshold: f32) -> bool {
        let before = self.capacity;
        let threshold = if threshold.is_nan() {
            1.0
        } else {
            threshold.clamp(MIN_GROW_THRESHOLD, 1.0)
        };
        while self.capacity < min || len as f32 > threshold * self.capacity as f32 {
            let Some(next) = grown_capacity(self.capacity, min) else {
                tracing::warn!(batch = %self.id, len, capacity = self.capacity, "batch capacity saturated");
                break;
            };
            self.capacity = next;
        }
        if self.capacity == before {
            return false;
        }
        let extra = self.capacity - self.len();
        self.frames.reserve_exact(extra);
        self.colors.reserve_exact(extra);
        self.transforms.reserve_exact(extra);
        self.owners.reserve_exact(extra);
        self.dirty = true;
        tracing::debug!(batch = %self.id, from = before, to = self.capacity, "batch storage grew");
        true
    }

    /// Appends a slot in the inactive region.
    pub fn push(&mut self, owner: InstanceId, frame: i32, color: PackedColor, transform: PackedTransform) {
        self.frames.push(frame);
        self.colors.push(color);
        self.transforms.push(transform);
        self.owners.push(owner);
        self.dirty = true;
    }

    /// Swaps two slots across all four arrays.
    #[inline]
    pub fn swap_slots(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.frames.swap(a, b);
        self.colors.swap(a, b);
        self.transforms.swap(a, b);
        self.owners.swap(a, b);
    }

    /// Overwrites slot `index` with the last slot and shrinks by one.
    ///
    /// Does not touch `active_count`.
    #[inline]
    pub fn swap_remove(&mut self, index: usize) -> InstanceId {
        self.frames.swap_remove(index);
        self.colors.swap_remove(index);
        self.transforms.swap_remove(index);
        self.owners.swap_remove(index)
    }

    /// Drops every slot, keeping storage.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.colors.clear();
        self.transforms.clear();
        self.owners.clear();
        self.active_count = 0;
        self.dirty = true;
    }
}
