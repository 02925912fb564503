//! Per-frame change detection.
//!
//! Produces sparse maps of the sprite attributes that changed since the last
//! collection. An instance is reported for an attribute when the attribute's
//! own tick is newer than the last stamp, or when its batch gained or lost a
//! member since then (the slot may have moved, so everything is re-sent).
//!
//! The four attribute scans write disjoint maps and run concurrently on the
//! rayon pool. A fifth scan collects batch joins and the touched-batch set.

use std::collections::{HashMap, HashSet};

use glam::Vec4;
use rayon::prelude::*;
use spritehive_core::{
    Attribute, BatchId, FrameIndex, InstanceId, PaintPair, SpriteInstance, SpriteTransform,
    SpriteWorld,
};

/// Ephemeral result of one collection. Dropped after compaction.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Stamp the changes are relative to.
    pub since: u64,
    /// New frame indices.
    pub frames: HashMap<InstanceId, FrameIndex>,
    /// New base colors.
    pub colors: HashMap<InstanceId, Vec4>,
    /// New palette indices.
    pub paints: HashMap<InstanceId, PaintPair>,
    /// New transforms.
    pub transforms: HashMap<InstanceId, SpriteTransform>,
    /// Batches owning at least one reported instance.
    pub touched: HashSet<BatchId>,
    /// Instances newly assigned to each batch, in slot-table order.
    pub joins: HashMap<BatchId, Vec<InstanceId>>,
}

impl ChangeSet {
    /// Returns true if `batch` has at least one reported member.
    #[inline]
    #[must_use]
    pub fn is_touched(&self, batch: BatchId) -> bool {
        self.touched.contains(&batch)
    }

    /// Instances that joined `batch`.
    #[inline]
    #[must_use]
    pub fn joins_of(&self, batch: BatchId) -> &[InstanceId] {
        self.joins.get(&batch).map_or(&[], Vec::as_slice)
    }

    /// Total number of entries across the four maps.
    #[must_use]
    pub fn total_updates(&self) -> usize {
        self.frames.len() + self.colors.len() + self.paints.len() + self.transforms.len()
    }

    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_updates() == 0 && self.joins.is_empty()
    }
}

/// Remembers the last stamp and turns world ticks into [`ChangeSet`]s.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    last_seen: u64,
}

impl ChangeTracker {
    /// Tracker that reports every instance on its first collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { last_seen: 0 }
    }

    /// Stamp of the last collection.
    #[inline]
    #[must_use]
    pub const fn last_seen(&self) -> u64 {
        self.last_seen
    }

    /// Forgets the stamp so the next collection reports everything.
    pub fn reset(&mut self) {
        self.last_seen = 0;
    }

    /// Collects every change since the previous call and closes the world's
    /// current change epoch.
    pub fn collect(&mut self, world: &mut SpriteWorld) -> ChangeSet {
        let _span = tracing::debug_span!("change_tracker", since = self.last_seen).entered();
        let changes = scan(world, self.last_seen);
        self.last_seen = world.advance_tick();
        tracing::trace!(
            updates = changes.total_updates(),
            touched = changes.touched.len(),
            joins = changes.joins.len(),
            "changes collected"
        );
        changes
    }
}

/// True if `attribute` of `instance` must be re-sent.
#[inline]
fn needs_update(world: &SpriteWorld, instance: &SpriteInstance, attribute: Attribute, since: u64) -> bool {
    match instance.batch {
        Some(batch) => instance.changed.of(attribute) > since || world.batch_order_tick(batch) > since,
        None => false,
    }
}

fn collect_attribute<T, F>(world: &SpriteWorld, attribute: Attribute, since: u64, value: F) -> HashMap<InstanceId, T>
where
    T: Send,
    F: Fn(&SpriteInstance) -> T + Sync,
{
    world
        .par_iter()
        .filter(|(_, instance)| needs_update(world, instance, attribute, since))
        .map(|(id, instance)| (id, value(instance)))
        .collect()
}

/// Builds a change set against `since` without touching the world.
#[must_use]
pub fn scan(world: &SpriteWorld, since: u64) -> ChangeSet {
    let (((frames, colors), (paints, transforms)), (touched, joined)) = rayon::join(
        || {
            rayon::join(
                || {
                    rayon::join(
                        || collect_attribute(world, Attribute::Frame, since, |i| i.frame),
                        || collect_attribute(world, Attribute::Color, since, |i| i.color),
                    )
                },
                || {
                    rayon::join(
                        || collect_attribute(world, Attribute::Paint, since, |i| i.paints),
                        || collect_attribute(world, Attribute::Transform, since, |i| i.transform),
                    )
                },
            )
        },
        || {
            rayon::join(
                || {
                    world
                        .par_iter()
                        .filter(|(_, instance)| {
                            Attribute::ALL
                                .iter()
                                .any(|&attribute| needs_update(world, instance, attribute, since))
                        })
                        .filter_map(|(_, instance)| instance.batch)
                        .collect::<HashSet<BatchId>>()
                },
                || {
                    world
                        .par_iter()
                        .filter(|(_, instance)| instance.changed.membership > since)
                        .filter_map(|(id, instance)| instance.batch.map(|batch| (batch, id)))
                        .collect::<Vec<(BatchId, InstanceId)>>()
                },
            )
        },
    );

    let mut joins: HashMap<BatchId, Vec<InstanceId>> = HashMap::new();
    for (batch, id) in joined {
        joins.entry(batch).or_default().push(id);
    }

    ChangeSet {
        since,
        frames,
        colors,
        paints,
        transforms,
        touched,
        joins,
    }
}
