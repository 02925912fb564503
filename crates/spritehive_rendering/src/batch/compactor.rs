//! In-place batch compaction.
//!
//! One pass per batch per frame:
//!
//! 1. Append newly joined instances at the tail and grow storage if needed.
//! 2. Walk every slot once. Slots whose owner is gone, moved to another batch
//!    or already seen earlier in this pass are swap-removed.
//! 3. Unless the camera is unchanged and the batch untouched, apply pending
//!    updates to each surviving slot, recompute its visibility and fix the
//!    active/inactive partition with a single swap against the boundary.
//!
//! Batches are independent: a pass reads the world and the change set and
//! writes only its own batch, so all batches may be compacted in parallel.

use spritehive_core::{InstanceId, PaintPair, SpriteWorld};

use super::storage::{Batch, PackedTransform};
use crate::color::PackedColor;
use crate::culling::Frustum;
use crate::tracking::ChangeSet;

/// Read-only inputs shared by every batch pass of a frame.
#[derive(Debug, Clone, Copy)]
pub struct CompactionContext<'a> {
    /// Authoritative sprite state.
    pub world: &'a SpriteWorld,
    /// This frame's changes.
    pub changes: &'a ChangeSet,
    /// Camera to cull against, `None` when culling is off.
    pub frustum: Option<&'a Frustum>,
    /// The frustum differs from last frame's (or culling was toggled).
    pub frustum_changed: bool,
    /// The palette was reset; stored paint indices must be re-clamped.
    pub palette_reset: bool,
    /// Current palette size.
    pub palette_len: usize,
    /// Capacity floor.
    pub min_capacity: usize,
    /// Load factor that triggers growth.
    pub grow_threshold: f32,
}

/// What one pass did to one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionReport {
    /// Slots swap-removed.
    pub removed: usize,
    /// Slots appended for joined instances.
    pub joined: usize,
    /// Slots that received at least one attribute update.
    pub updated_slots: usize,
    /// Swaps across the active boundary.
    pub partition_swaps: usize,
    /// Storage grew.
    pub grew: bool,
    /// The update and partition phase was skipped.
    pub skipped_updates: bool,
}

impl CompactionReport {
    /// Sums two reports.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            removed: self.removed + other.removed,
            joined: self.joined + other.joined,
            updated_slots: self.updated_slots + other.updated_slots,
            partition_swaps: self.partition_swaps + other.partition_swaps,
            grew: self.grew || other.grew,
            skipped_updates: self.skipped_updates && other.skipped_updates,
        }
    }

    /// Returns true if the pass changed the batch's arrays.
    #[must_use]
    pub const fn modified(&self) -> bool {
        self.removed > 0 || self.joined > 0 || self.updated_slots > 0 || self.partition_swaps > 0 || self.grew
    }
}

/// Per-pass scratch: the visited bitmap travels with swapped slots.
struct Pass<'b> {
    batch: &'b mut Batch,
    visited: Vec<bool>,
}

impl Pass<'_> {
    fn swap(&mut self, a: usize, b: usize) {
        self.batch.swap_slots(a, b);
        self.visited.swap(a, b);
    }

    fn swap_remove(&mut self, index: usize) {
        self.batch.swap_remove(index);
        self.visited.swap_remove(index);
    }

    /// Removes `index`, keeping the partition intact without re-evaluating
    /// any other slot.
    fn remove(&mut self, index: usize) {
        if index < self.batch.active_count {
            let boundary = self.batch.active_count - 1;
            self.swap(index, boundary);
            self.batch.active_count = boundary;
            self.swap_remove(boundary);
        } else {
            self.swap_remove(index);
        }
    }
}

/// Compacts one batch.
pub fn compact(batch: &mut Batch, ctx: &CompactionContext<'_>) -> CompactionReport {
    let mut report = CompactionReport::default();
    let id = batch.id;
    let joins = ctx.changes.joins_of(id);

    report.grew = batch.ensure_capacity(batch.len() + joins.len(), ctx.min_capacity, ctx.grow_threshold);
    for &owner in joins {
        if append(batch, ctx, owner) {
            report.joined += 1;
        }
    }

    let do_updates = ctx.frustum_changed
        || ctx.palette_reset
        || report.joined > 0
        || ctx.changes.is_touched(id);
    report.skipped_updates = !do_updates;

    let len = batch.len();
    let mut visited = std::mem::take(&mut batch.visited);
    visited.clear();
    visited.resize(len, false);
    let mut seen = std::mem::take(&mut batch.seen);
    seen.clear();
    seen.reserve(len);
    let mut pass = Pass { batch, visited };
    let mut i = 0;

    while i < pass.batch.len() {
        if pass.visited[i] {
            i += 1;
            continue;
        }

        let owner = pass.batch.owners[i];
        if ctx.world.batch_of(owner) != Some(id) || !seen.insert(owner) {
            pass.remove(i);
            report.removed += 1;
            continue;
        }

        if !do_updates {
            pass.visited[i] = true;
            i += 1;
            continue;
        }

        if apply_updates(pass.batch, i, owner, ctx) {
            report.updated_slots += 1;
        }

        let visible = pass.batch.frames[i] >= 0
            && ctx
                .frustum
                .map_or(true, |frustum| frustum.contains(pass.batch.transforms[i].position()));
        let active = pass.batch.active_count;

        if i < active && !visible {
            let boundary = active - 1;
            pass.swap(i, boundary);
            pass.batch.active_count = boundary;
            pass.visited[boundary] = true;
            report.partition_swaps += 1;
        } else if i >= active && visible {
            pass.swap(i, active);
            pass.batch.active_count = active + 1;
            pass.visited[active] = true;
            report.partition_swaps += 1;
            i += 1;
        } else {
            pass.visited[i] = true;
            i += 1;
        }
    }

    let Pass { batch, visited } = pass;
    batch.visited = visited;
    batch.seen = seen;
    if report.modified() {
        batch.dirty = true;
    }
    report
}

/// Appends a joined instance with its current values.
fn append(batch: &mut Batch, ctx: &CompactionContext<'_>, owner: InstanceId) -> bool {
    let Some(instance) = ctx.world.get(owner) else {
        return false;
    };
    batch.push(
        owner,
        instance.frame.raw(),
        PackedColor::new(instance.color, instance.paints, ctx.palette_len),
        PackedTransform::new(&instance.transform),
    );
    true
}

/// Writes pending map values into slot `index`. Returns true if any map
/// held an entry for `owner`.
fn apply_updates(batch: &mut Batch, index: usize, owner: InstanceId, ctx: &CompactionContext<'_>) -> bool {
    let changes = ctx.changes;
    let mut updated = false;

    if let Some(frame) = changes.frames.get(&owner) {
        batch.frames[index] = frame.raw();
        updated = true;
    }
    if let Some(color) = changes.colors.get(&owner) {
        batch.colors[index] = batch.colors[index].with_color(*color);
        updated = true;
    }
    if let Some(paints) = changes.paints.get(&owner) {
        batch.colors[index] = batch.colors[index].with_paints(*paints, ctx.palette_len);
        updated = true;
    } else if ctx.palette_reset {
        let current = batch.colors[index];
        let clamped = current.with_paints(PaintPair::new(current.primary, current.secondary), ctx.palette_len);
        if clamped != current {
            batch.colors[index] = clamped;
            updated = true;
        }
    }
    if let Some(transform) = changes.transforms.get(&owner) {
        batch.transforms[index] = PackedTransform::new(transform);
        updated = true;
    }
    updated
}
