//! Per-frame orchestration of tracking, compaction and GPU sync.

mod draw;
mod renderer;
mod stats;

pub use draw::{DrawLog, DrawRecord, DrawSink, NullSink};
pub use renderer::SpriteRenderer;
pub use stats::FrameStats;
