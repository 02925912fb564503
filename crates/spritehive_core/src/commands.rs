//! # Deferred Commands
//!
//! Parallel producers cannot touch the [`SpriteWorld`] directly. Instead each
//! producer records value-described operations into its own
//! [`CommandBuffer`] and submits it to a shared [`CommandQueue`]. The owner of
//! the world drains the queue on one thread, in `sort_key` order, so the
//! result does not depend on which worker finished first.
//!
//! ```rust,ignore
//! let queue = CommandQueue::new();
//! chunks.par_iter().enumerate().for_each(|(i, chunk)| {
//!     let mut buffer = CommandBuffer::new(i as u64);
//!     for id in chunk {
//!         buffer.set_play_speed(*id, 2.0);
//!     }
//!     queue.submit(buffer);
//! });
//! queue.apply(&mut world);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec4;
use parking_lot::Mutex;

use crate::ecs::{
    AnimationSetId, InstanceId, PaintPair, SpriteDesc, SpriteTransform, SpriteWorld,
};

/// One deferred operation on the sprite world.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Spawn a new sprite.
    Instantiate(SpriteDesc),
    /// Switch animation set.
    SetAnimation {
        /// Target instance.
        id: InstanceId,
        /// New animation set, `None` detaches the sprite from every batch.
        animation: Option<AnimationSetId>,
    },
    /// Switch clip inside the current set.
    SetClip {
        /// Target instance.
        id: InstanceId,
        /// Clip index.
        clip: u16,
    },
    /// Change playback rate.
    SetPlaySpeed {
        /// Target instance.
        id: InstanceId,
        /// Rate multiplier.
        speed: f32,
    },
    /// Change base color.
    SetColor {
        /// Target instance.
        id: InstanceId,
        /// RGBA in `[0, 1]`.
        color: Vec4,
    },
    /// Change palette indices.
    SetPaints {
        /// Target instance.
        id: InstanceId,
        /// Primary and secondary paint.
        paints: PaintPair,
    },
    /// Change world transform.
    SetTransform {
        /// Target instance.
        id: InstanceId,
        /// New transform.
        transform: SpriteTransform,
    },
    /// Hide or show.
    SetHidden {
        /// Target instance.
        id: InstanceId,
        /// Hidden flag.
        hidden: bool,
    },
    /// Despawn.
    Remove(InstanceId),
}

/// Result of applying one command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    /// A sprite was spawned.
    Spawned(InstanceId),
    /// The target existed and the command ran.
    Done,
    /// The target id was stale; nothing happened.
    Stale,
}

impl Command {
    /// Applies the command immediately.
    pub fn apply(self, world: &mut SpriteWorld) -> Applied {
        let ok = match self {
            Self::Instantiate(desc) => return Applied::Spawned(world.spawn(desc)),
            Self::SetAnimation { id, animation } => world.set_animation(id, animation),
            Self::SetClip { id, clip } => world.set_clip(id, clip),
            Self::SetPlaySpeed { id, speed } => world.set_play_speed(id, speed),
            Self::SetColor { id, color } => world.set_color(id, color),
            Self::SetPaints { id, paints } => world.set_paints(id, paints),
            Self::SetTransform { id, transform } => world.set_transform(id, transform),
            Self::SetHidden { id, hidden } => world.set_hidden(id, hidden),
            Self::Remove(id) => world.despawn(id),
        };
        if ok {
            Applied::Done
        } else {
            Applied::Stale
        }
    }
}

/// Commands recorded by one producer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandBuffer {
    sort_key: u64,
    commands: Vec<Command>,
}

impl CommandBuffer {
    /// Empty buffer. Buffers drain in ascending `sort_key` order.
    #[must_use]
    pub const fn new(sort_key: u64) -> Self {
        Self {
            sort_key,
            commands: Vec::new(),
        }
    }

    /// Ordering key of this buffer.
    #[must_use]
    pub const fn sort_key(&self) -> u64 {
        self.sort_key
    }

    /// Number of recorded commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Records a command.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Records a spawn.
    pub fn instantiate(&mut self, desc: SpriteDesc) {
        self.push(Command::Instantiate(desc));
    }

    /// Records an animation switch.
    pub fn set_animation(&mut self, id: InstanceId, animation: Option<AnimationSetId>) {
        self.push(Command::SetAnimation { id, animation });
    }

    /// Records a playback rate change.
    pub fn set_play_speed(&mut self, id: InstanceId, speed: f32) {
        self.push(Command::SetPlaySpeed { id, speed });
    }

    /// Records a color change.
    pub fn set_color(&mut self, id: InstanceId, color: Vec4) {
        self.push(Command::SetColor { id, color });
    }

    /// Records a transform change.
    pub fn set_transform(&mut self, id: InstanceId, transform: SpriteTransform) {
        self.push(Command::SetTransform { id, transform });
    }

    /// Records a despawn.
    pub fn remove(&mut self, id: InstanceId) {
        self.push(Command::Remove(id));
    }

    /// Applies every command in recording order.
    pub fn apply(self, world: &mut SpriteWorld, report: &mut ApplyReport) {
        for command in self.commands {
            match command.apply(world) {
                Applied::Spawned(id) => report.spawned.push(id),
                Applied::Done => report.applied += 1,
                Applied::Stale => report.stale += 1,
            }
        }
    }
}

/// Totals from draining a [`CommandQueue`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Commands that hit a live target.
    pub applied: usize,
    /// Commands whose target was already gone.
    pub stale: usize,
    /// Sprites spawned, in application order.
    pub spawned: Vec<InstanceId>,
}

/// Thread-safe collection point for command buffers.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Mutex<Vec<(u64, CommandBuffer)>>,
    next_sequence: AtomicU64,
}

impl CommandQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands a buffer over for later application. Callable from any thread.
    pub fn submit(&self, buffer: CommandBuffer) {
        if buffer.is_empty() {
            return;
        }
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        self.pending.lock().push((sequence, buffer));
    }

    /// Number of buffers waiting.
    #[must_use]
    pub fn pending_buffers(&self) -> usize {
        self.pending.lock().len()
    }

    /// Takes every pending buffer, ordered by `(sort_key, submission)`.
    #[must_use]
    pub fn drain_sorted(&self) -> Vec<CommandBuffer> {
        let mut pending = std::mem::take(&mut *self.pending.lock());
        pending.sort_by_key(|(sequence, buffer)| (buffer.sort_key, *sequence));
        pending.into_iter().map(|(_, buffer)| buffer).collect()
    }

    /// Drains the queue into `world` on the calling thread.
    pub fn apply(&self, world: &mut SpriteWorld) -> ApplyReport {
        let mut report = ApplyReport::default();
        for buffer in self.drain_sorted() {
            buffer.apply(world, &mut report);
        }
        if report.stale > 0 {
            tracing::trace!(stale = report.stale, "deferred commands hit stale instances");
        }
        report
    }
}
