//! # SpriteHive Rendering
//!
//! GPU-instanced drawing of very large animated sprite populations:
//! - One packed batch and one indirect draw per animation set
//! - Only changed attributes are rewritten each frame
//! - Batches compact in parallel, drawn sprites first
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SPRITE PIPELINE                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SpriteWorld ticks → ChangeTracker (4 parallel scans)        │
//! │       ↓                            ↓                         │
//! │  BatchCompactor (per batch) → GpuBufferSync → Draw Indirect  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Architecture Rules
//!
//! 1. **No per-frame allocation** - batches grow geometrically, never shrink
//! 2. **Exact counts** - the draw-args record always holds the active count
//! 3. **Ground truth wins** - batches are re-derived from the world every frame
//!
//! ## Example
//!
//! ```rust,ignore
//! use spritehive_rendering::{AnimationSetDefinition, NullSink, RecordingDevice, SpriteSystem, UvRect};
//!
//! let mut sprites = SpriteSystem::new(RecordingDevice::new(), Default::default());
//! let walk = AnimationSetDefinition::new("walk", UvRect::grid(8, 1));
//! sprites.record_animation_set(&walk)?;
//! let id = sprites.instantiate(walk.id(), transform, color, Lifetime::FOREVER);
//! let stats = sprites.update(dt, Some(view_projection), &mut NullSink);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod animation;
pub mod api;
pub mod batch;
pub mod color;
pub mod config;
pub mod culling;
pub mod error;
pub mod gpu;
pub mod palette;
pub mod pipeline;
pub mod tracking;

pub use animation::{
    AnimationBlob, AnimationLibrary, AnimationSetDefinition, ClipDefinition, Recorded, UvRect,
};
pub use api::SpriteSystem;
pub use batch::{compact, compact_all, Batch, CompactionContext, CompactionReport, PackedTransform};
pub use color::{pack_color, unpack_color, PackedColor};
pub use config::{RendererConfig, UploadMode};
pub use culling::{is_visible, Frustum};
pub use error::{ConfigError, ConfigResult, RecordError, RecordResult};
pub use gpu::{
    BufferDesc, BufferKind, DrawArgs, DrawCall, GpuBufferSync, GpuDevice, RecordingDevice,
    UploadStats, WgpuDevice,
};
pub use palette::{PaintConfig, PaintPalette};
pub use pipeline::{DrawLog, DrawRecord, DrawSink, FrameStats, NullSink, SpriteRenderer};
pub use tracking::{ChangeSet, ChangeTracker};
