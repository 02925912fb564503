//! # Sprite Instance Store
//!
//! - Instances live in a slot table addressed by generation-tagged ids
//! - Every attribute write is compared against the old value and stamped
//!   with a change tick only when it really changed
//! - Batch membership changes mark the affected batches as reordered

mod component;
mod entity;
mod playback;
mod world;

pub use component::{
    Attribute, ChangeTicks, FrameIndex, Lifetime, PaintPair, Playback, SpriteTransform, WHITE,
};
pub use entity::{AnimationSetId, BatchId, InstanceId};
pub use playback::{ClipInfo, ClipLibrary, TickReport};
pub use world::{SpriteDesc, SpriteInstance, SpriteWorld};
