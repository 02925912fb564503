//! # SpriteHive Core
//!
//! Authoritative state for large populations of animated sprites:
//! - Generation-tagged instance handles that never dangle
//! - Per-attribute change ticks so renderers pick up only what changed
//! - A deferred command queue for parallel producers
//!
//! ## Architecture Rules
//!
//! 1. **One writer** - the world is mutated from a single control thread
//! 2. **Truthful ticks** - a tick is stamped only when a value really changed
//! 3. **Stale is harmless** - every operation on a dead handle is a no-op
//!
//! ## Example
//!
//! ```rust,ignore
//! use spritehive_core::{SpriteWorld, SpriteDesc, SpriteTransform};
//!
//! let mut world = SpriteWorld::new();
//! let id = world.spawn(SpriteDesc::new(set_id, SpriteTransform::IDENTITY));
//! let seen = world.advance_tick();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod commands;
pub mod ecs;

pub use commands::{Applied, ApplyReport, Command, CommandBuffer, CommandQueue};
pub use ecs::{
    AnimationSetId, Attribute, BatchId, ChangeTicks, ClipInfo, ClipLibrary, FrameIndex,
    InstanceId, Lifetime, PaintPair, Playback, SpriteDesc, SpriteInstance, SpriteTransform,
    SpriteWorld, TickReport, WHITE,
};
