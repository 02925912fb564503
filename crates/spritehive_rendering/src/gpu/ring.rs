//! Ring of write-once upload buffers.
//!
//! Each upload binds a fresh buffer. The buffer it replaces is retired with a
//! fence and only handed out again once that fence completes, so the GPU
//! never reads a buffer the CPU is overwriting. When nothing suitable is free
//! a new buffer is allocated instead of waiting.

use super::device::{BufferDesc, BufferKind, GpuDevice};

/// Index of a ring entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RingSlot(usize);

enum EntryState<F> {
    Free,
    Bound,
    Retired(F),
}

struct RingEntry<D: GpuDevice> {
    buffer: D::Buffer,
    stride: usize,
    capacity: usize,
    state: EntryState<D::Fence>,
}

/// Counters of an [`UploadRing`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingStats {
    /// Buffers allocated.
    pub allocated: usize,
    /// Buffers reused after their fence completed.
    pub reused: usize,
    /// Surplus free buffers released.
    pub released: usize,
}

/// Pool of write-once buffers matched by stride and capacity.
pub struct UploadRing<D: GpuDevice> {
    entries: Vec<Option<RingEntry<D>>>,
    spare_limit: usize,
    stats: RingStats,
}

impl<D: GpuDevice> UploadRing<D> {
    /// Empty ring keeping at most `spare_limit` free buffers around.
    #[must_use]
    pub fn new(spare_limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            spare_limit,
            stats: RingStats::default(),
        }
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> RingStats {
        self.stats
    }

    /// Buffers owned by the ring in any state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    /// Returns true if the ring owns no buffer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Free entries right now.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.entries
            .iter()
            .flatten()
            .filter(|entry| matches!(entry.state, EntryState::Free))
            .count()
    }

    /// Buffer behind `slot`.
    #[must_use]
    pub fn buffer(&self, slot: RingSlot) -> Option<&D::Buffer> {
        self.entries.get(slot.0)?.as_ref().map(|entry| &entry.buffer)
    }

    /// Binds a buffer holding at least `elements` items of `stride` bytes.
    ///
    /// Never blocks: reuses the smallest free match or allocates a new entry
    /// sized to the next power of two.
    pub fn acquire(&mut self, device: &D, label: &'static str, stride: usize, elements: usize) -> RingSlot {
        self.poll(device);

        let best = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.as_ref().map(|entry| (index, entry)))
            .filter(|(_, entry)| {
                matches!(entry.state, EntryState::Free) && entry.stride == stride && entry.capacity >= elements
            })
            .min_by_key(|(_, entry)| entry.capacity)
            .map(|(index, _)| index);

        if let Some(index) = best {
            if let Some(entry) = self.entries[index].as_mut() {
                entry.state = EntryState::Bound;
            }
            self.stats.reused += 1;
            return RingSlot(index);
        }

        let capacity = elements.max(1).next_power_of_two();
        let buffer = device.create_buffer(&BufferDesc::array(label, stride, capacity, BufferKind::WriteOnce));
        self.stats.allocated += 1;
        tracing::debug!(label, stride, capacity, "upload ring allocated buffer");

        let entry = Some(RingEntry {
            buffer,
            stride,
            capacity,
            state: EntryState::Bound,
        });
        match self.entries.iter().position(Option::is_none) {
            Some(index) => {
                self.entries[index] = entry;
                RingSlot(index)
            }
            None => {
                self.entries.push(entry);
                RingSlot(self.entries.len() - 1)
            }
        }
    }

    /// Retires a bound buffer; it becomes free once `fence` completes.
    pub fn retire(&mut self, slot: RingSlot, fence: D::Fence) {
        if let Some(Some(entry)) = self.entries.get_mut(slot.0) {
            entry.state = EntryState::Retired(fence);
        }
    }

    /// Frees entries whose fence completed and releases surplus free ones.
    pub fn poll(&mut self, device: &D) {
        for entry in self.entries.iter_mut().flatten() {
            if let EntryState::Retired(fence) = &entry.state {
                if device.fence_complete(fence) {
                    entry.state = EntryState::Free;
                }
            }
        }

        let mut surplus = self.free_count().saturating_sub(self.spare_limit);
        for slot in self.entries.iter_mut().rev() {
            if surplus == 0 {
                break;
            }
            if slot.as_ref().is_some_and(|entry| matches!(entry.state, EntryState::Free)) {
                if let Some(entry) = slot.take() {
                    device.destroy_buffer(entry.buffer);
                    self.stats.released += 1;
                    surplus -= 1;
                }
            }
        }
    }

    /// Destroys every buffer, bound or not.
    pub fn dispose(&mut self, device: &D) {
        for entry in self.entries.drain(..).flatten() {
            device.destroy_buffer(entry.buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RecordingDevice;

    #[test]
    fn test_retired_buffer_not_reused_before_fence() {
        let device = RecordingDevice::with_manual_fences();
        let mut ring = UploadRing::new(4);

        let first = ring.acquire(&device, "t", 4, 100);
        ring.retire(first, device.fence());
        let second = ring.acquire(&device, "t", 4, 100);
        assert_ne!(first, second);
        assert_eq!(ring.stats().allocated, 2);

        device.complete_fences();
        ring.retire(second, device.fence());
        let third = ring.acquire(&device, "t", 4, 100);
        assert_eq!(third, first);
        assert_eq!(ring.stats().reused, 1);
    }

    #[test]
    fn test_stride_and_capacity_must_match() {
        let device = RecordingDevice::new();
        let mut ring = UploadRing::new(4);
        let small = ring.acquire(&device, "t", 4, 100);
        ring.retire(small, device.fence());

        let wide = ring.acquire(&device, "t", 12, 100);
        assert_ne!(wide, small);
        let big = ring.acquire(&device, "t", 4, 1000);
        assert_ne!(big, small);
        let fits = ring.acquire(&device, "t", 4, 128);
        assert_eq!(fits, small);
    }

    #[test]
    fn test_surplus_released() {
        let device = RecordingDevice::new();
        let mut ring = UploadRing::new(1);
        let slots: Vec<RingSlot> = (0..3).map(|_| ring.acquire(&device, "t", 4, 8)).collect();
        for slot in slots {
            ring.retire(slot, device.fence());
        }
        ring.poll(&device);
        assert_eq!(ring.free_count(), 1);
        assert_eq!(ring.stats().released, 2);
        assert_eq!(device.live_buffers(), 1);

        ring.dispose(&device);
        assert_eq!(device.live_buffers(), 0);
    }
}
