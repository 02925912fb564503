//! GPU buffer synchronization.
//!
//! Keeps the GPU copies of every batch's arrays up to date behind a small
//! device trait, with immediate and ring-buffered upload paths.

mod device;
mod recording;
mod ring;
mod sync;
mod wgpu_device;

pub use device::{BufferDesc, BufferKind, DrawArgs, GpuDevice};
pub use recording::{DeviceStats, RecordedBuffer, RecordedFence, RecordingDevice};
pub use ring::{RingSlot, RingStats, UploadRing};
pub use sync::{DrawCall, GpuBufferSync, UploadStats};
pub use wgpu_device::WgpuDevice;
