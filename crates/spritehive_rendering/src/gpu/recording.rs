//! In-memory device for tests and headless runs.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::device::{BufferDesc, GpuDevice};

/// Opaque buffer handle of a [`RecordingDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordedBuffer(u64);

/// Fence of a [`RecordingDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedFence(usize);

/// Counters kept by a [`RecordingDevice`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Buffers created.
    pub created: usize,
    /// Buffers destroyed.
    pub destroyed: usize,
    /// Write calls.
    pub writes: usize,
    /// Bytes written.
    pub bytes_written: usize,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    buffers: HashMap<u64, (BufferDesc, Vec<u8>)>,
    fences: Vec<bool>,
    stats: DeviceStats,
}

/// Device that keeps buffer contents in memory.
///
/// Clones share state, so a test can keep a handle while the renderer owns
/// another. Fences complete immediately unless created with
/// [`RecordingDevice::with_manual_fences`].
#[derive(Debug, Clone, Default)]
pub struct RecordingDevice {
    state: Arc<Mutex<State>>,
    manual_fences: bool,
}

impl RecordingDevice {
    /// Device whose fences complete at once.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Device whose fences complete only on [`Self::complete_fences`].
    #[must_use]
    pub fn with_manual_fences() -> Self {
        Self {
            state: Arc::default(),
            manual_fences: true,
        }
    }

    /// Completes every pending fence.
    pub fn complete_fences(&self) {
        let mut state = self.state.lock();
        state.fences.iter_mut().for_each(|done| *done = true);
    }

    /// Number of buffers currently alive.
    #[must_use]
    pub fn live_buffers(&self) -> usize {
        self.state.lock().buffers.len()
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> DeviceStats {
        self.state.lock().stats
    }

    /// Copy of a buffer's contents.
    #[must_use]
    pub fn read(&self, buffer: &RecordedBuffer) -> Option<Vec<u8>> {
        self.state.lock().buffers.get(&buffer.0).map(|(_, data)| data.clone())
    }

    /// Creation parameters of a buffer.
    #[must_use]
    pub fn desc(&self, buffer: &RecordedBuffer) -> Option<BufferDesc> {
        self.state.lock().buffers.get(&buffer.0).map(|(desc, _)| *desc)
    }
}

impl GpuDevice for RecordingDevice {
    type Buffer = RecordedBuffer;
    type Fence = RecordedFence;

    fn create_buffer(&self, desc: &BufferDesc) -> RecordedBuffer {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.buffers.insert(id, (*desc, vec![0; desc.size as usize]));
        state.stats.created += 1;
        RecordedBuffer(id)
    }

    fn write_buffer(&self, buffer: &RecordedBuffer, offset: u64, data: &[u8]) {
        let mut state = self.state.lock();
        state.stats.writes += 1;
        state.stats.bytes_written += data.len();
        let Some((_, contents)) = state.buffers.get_mut(&buffer.0) else {
            tracing::warn!(?buffer, "write to destroyed buffer ignored");
            return;
        };
        let start = offset as usize;
        let end = start + data.len();
        if end > contents.len() {
            tracing::warn!(?buffer, end, size = contents.len(), "write past end of buffer ignored");
            return;
        }
        contents[start..end].copy_from_slice(data);
    }

    fn destroy_buffer(&self, buffer: RecordedBuffer) {
        let mut state = self.state.lock();
        if state.buffers.remove(&buffer.0).is_some() {
            state.stats.destroyed += 1;
        }
    }

    fn fence(&self) -> RecordedFence {
        let mut state = self.state.lock();
        state.fences.push(!self.manual_fences);
        RecordedFence(state.fences.len() - 1)
    }

    fn fence_complete(&self, fence: &RecordedFence) -> bool {
        self.state.lock().fences.get(fence.0).copied().unwrap_or(true)
    }
}
