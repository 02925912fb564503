//! GPU-resident copies of every batch's arrays.
//!
//! Per batch this owns the index, color and transform arrays, the uv table
//! built from the batch's animation blob, a copy of the paint palette and
//! the indirect draw-args record. Per-instance arrays go through one of two
//! paths:
//!
//! - **Immediate**: one buffer per array, rewritten in place and only
//!   reallocated when the batch outgrows it.
//! - **Ring**: every upload binds a fresh write-once buffer from the
//!   [`UploadRing`]; the previous one is retired behind a fence.

use std::sync::Arc;

use bytemuck::Pod;
use spritehive_core::BatchId;

use super::device::{BufferDesc, BufferKind, DrawArgs, GpuDevice};
use super::ring::{RingSlot, RingStats, UploadRing};
use crate::animation::AnimationBlob;
use crate::batch::Batch;
use crate::config::{RendererConfig, UploadMode};
use crate::palette::{PaintConfig, PaintPalette};

/// Counters of a [`GpuBufferSync`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadStats {
    /// Per-instance array uploads.
    pub uploads: usize,
    /// Draw-args writes.
    pub args_writes: usize,
    /// Palette copies written.
    pub palette_writes: usize,
    /// Immediate-path buffers (re)allocated.
    pub reallocations: usize,
}

enum ArrayBinding<D: GpuDevice> {
    Unbound,
    Immediate { buffer: D::Buffer, capacity: usize },
    Ring(RingSlot),
}

struct BatchBuffers<D: GpuDevice> {
    blob: Arc<AnimationBlob>,
    index: ArrayBinding<D>,
    color: ArrayBinding<D>,
    transform: ArrayBinding<D>,
    uv: D::Buffer,
    palette: D::Buffer,
    palette_capacity: usize,
    palette_version: u64,
    args: D::Buffer,
    instance_count: Option<u32>,
}

/// Everything a draw of one batch binds.
pub struct DrawCall<'a, D: GpuDevice> {
    /// Batch drawn.
    pub batch: BatchId,
    /// Sprites drawn.
    pub instance_count: u32,
    /// `indexBuffer`.
    pub index: &'a D::Buffer,
    /// `colorBuffer`.
    pub color: &'a D::Buffer,
    /// `transformBuffer`.
    pub transform: &'a D::Buffer,
    /// `uvBuffer`.
    pub uv: &'a D::Buffer,
    /// `paintBuffer`.
    pub paint: &'a D::Buffer,
    /// Indirect draw args.
    pub args: &'a D::Buffer,
}

/// Owner of every GPU buffer used for sprite batches.
pub struct GpuBufferSync<D: GpuDevice> {
    device: D,
    mode: UploadMode,
    vertices_per_instance: u32,
    ring: UploadRing<D>,
    batches: Vec<Option<BatchBuffers<D>>>,
    stats: UploadStats,
}

impl<D: GpuDevice> GpuBufferSync<D> {
    /// Creates the sync layer over `device`.
    #[must_use]
    pub fn new(device: D, config: &RendererConfig) -> Self {
        Self {
            device,
            mode: config.upload_mode,
            vertices_per_instance: config.vertices_per_instance,
            ring: UploadRing::new(config.ring_spare_buffers),
            batches: Vec::new(),
            stats: UploadStats::default(),
        }
    }

    /// The device.
    #[must_use]
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Upload path in use.
    #[must_use]
    pub const fn mode(&self) -> UploadMode {
        self.mode
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> UploadStats {
        self.stats
    }

    /// Counters of the upload ring.
    #[must_use]
    pub const fn ring_stats(&self) -> RingStats {
        self.ring.stats()
    }

    /// Number of batches with buffers.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.batches.iter().flatten().count()
    }

    /// Creates the buffers of a new batch and uploads its uv table.
    pub fn register_batch(&mut self, batch: BatchId, blob: Arc<AnimationBlob>, palette: &PaintPalette) {
        let frames = &blob.frames;
        let uv = self.device.create_buffer(&BufferDesc::array(
            "uvBuffer",
            std::mem::size_of::<crate::animation::UvRect>(),
            frames.len(),
            BufferKind::Immutable,
        ));
        self.device.write_buffer(&uv, 0, bytemuck::cast_slice(frames));

        let palette_capacity = palette.len().next_power_of_two();
        let paint = self.device.create_buffer(&BufferDesc::array(
            "paintBuffer",
            std::mem::size_of::<PaintConfig>(),
            palette_capacity,
            BufferKind::Immutable,
        ));
        self.device.write_buffer(&paint, 0, bytemuck::cast_slice(palette.entries()));
        self.stats.palette_writes += 1;

        let args = self.device.create_buffer(&BufferDesc::array(
            "drawArgs",
            std::mem::size_of::<DrawArgs>(),
            1,
            BufferKind::Indirect,
        ));
        self.device
            .write_buffer(&args, 0, bytemuck::bytes_of(&DrawArgs::new(self.vertices_per_instance, 0)));
        self.stats.args_writes += 1;

        let index = batch.index();
        if index >= self.batches.len() {
            self.batches.resize_with(index + 1, || None);
        }
        if let Some(old) = self.batches[index].take() {
            self.release(old);
        }
        self.batches[index] = Some(BatchBuffers {
            blob,
            index: ArrayBinding::Unbound,
            color: ArrayBinding::Unbound,
            transform: ArrayBinding::Unbound,
            uv,
            palette: paint,
            palette_capacity,
            palette_version: palette.version(),
            args,
            instance_count: Some(0),
        });
        tracing::debug!(%batch, "batch buffers created");
    }

    /// Uploads the per-instance arrays of `batch`.
    ///
    /// Returns false if the batch has no buffers.
    pub fn upload_batch(&mut self, batch: &Batch) -> bool {
        let Some(Some(buffers)) = self.batches.get_mut(batch.id().index()) else {
            return false;
        };
        let capacity = batch.capacity().max(batch.len());
        let mut target = Target {
            device: &self.device,
            ring: &mut self.ring,
            mode: self.mode,
            capacity,
            reallocations: 0,
        };
        target.upload(&mut buffers.index, "indexBuffer", batch.frames());
        target.upload(&mut buffers.color, "colorBuffer", batch.colors());
        target.upload(&mut buffers.transform, "transformBuffer", batch.transforms());
        self.stats.reallocations += target.reallocations;
        self.stats.uploads += 1;
        true
    }

    /// Records the draw count of `batch`; writes the args record only when
    /// it differs from the last one written. Returns true on a write.
    pub fn set_instance_count(&mut self, batch: BatchId, count: u32) -> bool {
        let Some(Some(buffers)) = self.batches.get_mut(batch.index()) else {
            return false;
        };
        if buffers.instance_count == Some(count) {
            return false;
        }
        let args = DrawArgs::new(self.vertices_per_instance, count);
        self.device.write_buffer(&buffers.args, 0, bytemuck::bytes_of(&args));
        buffers.instance_count = Some(count);
        self.stats.args_writes += 1;
        true
    }

    /// Last draw count written for `batch`.
    #[must_use]
    pub fn instance_count(&self, batch: BatchId) -> Option<u32> {
        self.batches.get(batch.index())?.as_ref()?.instance_count
    }

    /// Copies the palette into every batch whose copy is out of date.
    /// Returns the number of copies written.
    pub fn broadcast_palette(&mut self, palette: &PaintPalette) -> usize {
        let mut written = 0;
        for buffers in self.batches.iter_mut().flatten() {
            if buffers.palette_version == palette.version() {
                continue;
            }
            if palette.len() > buffers.palette_capacity {
                let capacity = palette.len().next_power_of_two();
                let grown = self.device.create_buffer(&BufferDesc::array(
                    "paintBuffer",
                    std::mem::size_of::<PaintConfig>(),
                    capacity,
                    BufferKind::Immutable,
                ));
                let old = std::mem::replace(&mut buffers.palette, grown);
                self.device.destroy_buffer(old);
                buffers.palette_capacity = capacity;
            }
            self.device
                .write_buffer(&buffers.palette, 0, bytemuck::cast_slice(palette.entries()));
            buffers.palette_version = palette.version();
            written += 1;
        }
        self.stats.palette_writes += written;
        if written > 0 {
            tracing::debug!(batches = written, len = palette.len(), "palette broadcast");
        }
        written
    }

    /// Bindings for drawing `batch`, once all its arrays were uploaded.
    #[must_use]
    pub fn draw_call(&self, batch: BatchId) -> Option<DrawCall<'_, D>> {
        let buffers = self.batches.get(batch.index())?.as_ref()?;
        Some(DrawCall {
            batch,
            instance_count: buffers.instance_count.unwrap_or(0),
            index: self.bound(&buffers.index)?,
            color: self.bound(&buffers.color)?,
            transform: self.bound(&buffers.transform)?,
            uv: &buffers.uv,
            paint: &buffers.palette,
            args: &buffers.args,
        })
    }

    /// Animation blob held for `batch`.
    #[must_use]
    pub fn blob(&self, batch: BatchId) -> Option<&Arc<AnimationBlob>> {
        self.batches.get(batch.index())?.as_ref().map(|buffers| &buffers.blob)
    }

    fn bound<'s>(&'s self, binding: &'s ArrayBinding<D>) -> Option<&'s D::Buffer> {
        match binding {
            ArrayBinding::Unbound => None,
            ArrayBinding::Immediate { buffer, .. } => Some(buffer),
            ArrayBinding::Ring(slot) => self.ring.buffer(*slot),
        }
    }

    /// Frees ring buffers whose GPU reads completed.
    pub fn poll(&mut self) {
        self.ring.poll(&self.device);
    }

    /// Releases every buffer and blob reference. The sync layer stays usable.
    pub fn dispose(&mut self) {
        let batches = std::mem::take(&mut self.batches);
        for buffers in batches.into_iter().flatten() {
            self.release(buffers);
        }
        self.ring.dispose(&self.device);
        tracing::debug!("gpu buffers disposed");
    }

    fn release(&mut self, buffers: BatchBuffers<D>) {
        for binding in [buffers.index, buffers.color, buffers.transform] {
            match binding {
                ArrayBinding::Unbound => {}
                ArrayBinding::Immediate { buffer, .. } => self.device.destroy_buffer(buffer),
                ArrayBinding::Ring(slot) => self.ring.retire(slot, self.device.fence()),
            }
        }
        self.device.destroy_buffer(buffers.uv);
        self.device.destroy_buffer(buffers.palette);
        self.device.destroy_buffer(buffers.args);
    }
}

impl<D: GpuDevice> Drop for GpuBufferSync<D> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Borrowed upload state for one batch.
struct Target<'a, D: GpuDevice> {
    device: &'a D,
    ring: &'a mut UploadRing<D>,
    mode: UploadMode,
    capacity: usize,
    reallocations: usize,
}

impl<D: GpuDevice> Target<'_, D> {
    fn upload<T: Pod>(&mut self, binding: &mut ArrayBinding<D>, label: &'static str, data: &[T]) {
        let stride = std::mem::size_of::<T>();
        let bytes: &[u8] = bytemuck::cast_slice(data);
        match self.mode {
            UploadMode::Immediate => {
                let fits = matches!(binding, ArrayBinding::Immediate { capacity, .. } if *capacity >= self.capacity);
                if !fits {
                    let buffer = self.device.create_buffer(&BufferDesc::array(
                        label,
                        stride,
                        self.capacity,
                        BufferKind::Immutable,
                    ));
                    let old = std::mem::replace(
                        binding,
                        ArrayBinding::Immediate {
                            buffer,
                            capacity: self.capacity,
                        },
                    );
                    self.discard(old);
                    self.reallocations += 1;
                    tracing::debug!(label, capacity = self.capacity, "sync buffer reallocated");
                }
                if let ArrayBinding::Immediate { buffer, .. } = binding {
                    if !bytes.is_empty() {
                        self.device.write_buffer(buffer, 0, bytes);
                    }
                }
            }
            UploadMode::Ring => {
                let slot = self.ring.acquire(self.device, label, stride, self.capacity);
                let old = std::mem::replace(binding, ArrayBinding::Ring(slot));
                self.discard(old);
                if let Some(buffer) = self.ring.buffer(slot) {
                    if !bytes.is_empty() {
                        self.device.write_buffer(buffer, 0, bytes);
                    }
                }
            }
        }
    }

    fn discard(&mut self, binding: ArrayBinding<D>) {
        match binding {
            ArrayBinding::Unbound => {}
            ArrayBinding::Immediate { buffer, .. } => self.device.destroy_buffer(buffer),
            ArrayBinding::Ring(slot) => self.ring.retire(slot, self.device.fence()),
        }
    }
}
