//! Device abstraction for buffer uploads.
//!
//! Everything above this trait is backend-agnostic. [`super::WgpuDevice`]
//! drives a real GPU; [`super::RecordingDevice`] keeps buffers in memory for
//! tests and headless runs.

use bytemuck::{Pod, Zeroable};

/// How a buffer is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Read-only storage, rewritten in place by the immediate upload path.
    Immutable,
    /// Storage written once per use, recycled by the upload ring.
    WriteOnce,
    /// Indirect draw arguments.
    Indirect,
}

/// Buffer creation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    /// Debug label.
    pub label: &'static str,
    /// Size in bytes.
    pub size: u64,
    /// Usage.
    pub kind: BufferKind,
}

impl BufferDesc {
    /// Buffer for `elements` items of `stride` bytes.
    #[must_use]
    pub fn array(label: &'static str, stride: usize, elements: usize, kind: BufferKind) -> Self {
        Self {
            label,
            size: (stride * elements.max(1)) as u64,
            kind,
        }
    }
}

/// Minimal GPU surface needed to keep batch buffers in sync.
///
/// All methods take `&self`; implementations synchronize internally.
pub trait GpuDevice: Send + Sync {
    /// Buffer handle.
    type Buffer: Send + Sync;
    /// Marker that completes once all work submitted before it has finished.
    type Fence: Send + Sync;

    /// Allocates a buffer.
    fn create_buffer(&self, desc: &BufferDesc) -> Self::Buffer;

    /// Queues a write of `data` at byte `offset`.
    fn write_buffer(&self, buffer: &Self::Buffer, offset: u64, data: &[u8]);

    /// Releases a buffer.
    fn destroy_buffer(&self, buffer: Self::Buffer);

    /// Inserts a fence after everything submitted so far.
    fn fence(&self) -> Self::Fence;

    /// Polls a fence without blocking.
    fn fence_complete(&self, fence: &Self::Fence) -> bool;
}

/// Indirect draw record: `{vertices per instance, instance count, 0, 0, 0}`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawArgs {
    /// Vertices per sprite quad.
    pub index_count: u32,
    /// Sprites drawn, the batch's active count.
    pub instance_count: u32,
    /// First index.
    pub first_index: u32,
    /// Vertex offset.
    pub base_vertex: i32,
    /// First instance.
    pub first_instance: u32,
}

impl DrawArgs {
    /// Record for `instance_count` sprites.
    #[must_use]
    pub const fn new(index_count: u32, instance_count: u32) -> Self {
        Self {
            index_count,
            instance_count,
            first_index: 0,
            base_vertex: 0,
            first_instance: 0,
        }
    }
}
