//! Draw submission seam.
//!
//! The renderer does not record render passes itself. Each frame it hands
//! the previous frame's batches to a [`DrawSink`], which binds the buffers
//! and issues one indirect draw per batch.

use spritehive_core::BatchId;

use crate::gpu::{DrawCall, GpuDevice};

/// Receives one call per batch to draw.
pub trait DrawSink<D: GpuDevice> {
    /// Draws one batch.
    fn draw(&mut self, call: DrawCall<'_, D>);
}

/// Sink that drops every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl<D: GpuDevice> DrawSink<D> for NullSink {
    fn draw(&mut self, _call: DrawCall<'_, D>) {}
}

/// One logged draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRecord {
    /// Batch drawn.
    pub batch: BatchId,
    /// Sprites drawn.
    pub instance_count: u32,
}

/// Sink that remembers what it was asked to draw.
#[derive(Debug, Clone, Default)]
pub struct DrawLog {
    /// Calls in submission order.
    pub calls: Vec<DrawRecord>,
}

impl DrawLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the logged calls.
    pub fn take(&mut self) -> Vec<DrawRecord> {
        std::mem::take(&mut self.calls)
    }
}

impl<D: GpuDevice> DrawSink<D> for DrawLog {
    fn draw(&mut self, call: DrawCall<'_, D>) {
        self.calls.push(DrawRecord {
            batch: call.batch,
            instance_count: call.instance_count,
        });
    }
}
