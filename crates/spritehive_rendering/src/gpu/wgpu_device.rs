//! WGPU backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::device::{BufferDesc, BufferKind, GpuDevice};

/// [`GpuDevice`] over a wgpu device and queue.
///
/// Fences are flags raised by `Queue::on_submitted_work_done`; polling a
/// fence also polls the device so callbacks get a chance to run.
#[derive(Debug, Clone)]
pub struct WgpuDevice {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl WgpuDevice {
    /// Wraps an existing device and queue.
    #[must_use]
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self { device, queue }
    }

    /// Underlying device.
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Underlying queue.
    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn usage(kind: BufferKind) -> wgpu::BufferUsages {
        match kind {
            BufferKind::Immutable | BufferKind::WriteOnce => {
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST
            }
            BufferKind::Indirect => wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST,
        }
    }
}

impl GpuDevice for WgpuDevice {
    type Buffer = wgpu::Buffer;
    type Fence = Arc<AtomicBool>;

    fn create_buffer(&self, desc: &BufferDesc) -> wgpu::Buffer {
        let size = desc.size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size,
            usage: Self::usage(desc.kind),
            mapped_at_creation: false,
        })
    }

    fn write_buffer(&self, buffer: &wgpu::Buffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer, offset, data);
    }

    fn destroy_buffer(&self, buffer: wgpu::Buffer) {
        buffer.destroy();
    }

    fn fence(&self) -> Arc<AtomicBool> {
        let done = Arc::new(AtomicBool::new(false));
        let signal = Arc::clone(&done);
        self.queue
            .on_submitted_work_done(move || signal.store(true, Ordering::Release));
        done
    }

    fn fence_complete(&self, fence: &Arc<AtomicBool>) -> bool {
        if fence.load(Ordering::Acquire) {
            return true;
        }
        let _ = self.device.poll(wgpu::Maintain::Poll);
        fence.load(Ordering::Acquire)
    }
}
