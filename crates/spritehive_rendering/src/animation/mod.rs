//! Animation sets: authored frame tables, their content hash and the
//! registry that maps each recorded set to its batch.

mod definition;
mod library;

pub use definition::{AnimationSetDefinition, ClipDefinition, UvRect, DEFAULT_CLIP_FPS};
pub use library::{AnimationBlob, AnimationLibrary, Recorded};
