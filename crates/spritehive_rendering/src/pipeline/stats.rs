//! Per-frame statistics.

/// What one frame of the sprite renderer did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Batches in existence.
    pub batches: usize,
    /// Batches whose update phase ran.
    pub touched_batches: usize,
    /// Slots removed across all batches.
    pub removed: usize,
    /// Slots appended for joined instances.
    pub joined: usize,
    /// Slots that received at least one attribute update.
    pub updated_slots: usize,
    /// Swaps across active boundaries.
    pub partition_swaps: usize,
    /// Draws submitted for the previous frame.
    pub draws_submitted: usize,
    /// Batches whose arrays were uploaded.
    pub uploads: usize,
    /// Draw-args records written.
    pub args_writes: usize,
    /// Sprites drawn next frame, summed over batches.
    pub active_instances: usize,
}

impl FrameStats {
    /// Returns true if the frame changed no packed array.
    #[must_use]
    pub const fn is_quiet(&self) -> bool {
        self.removed == 0 && self.joined == 0 && self.updated_slots == 0 && self.partition_swaps == 0
    }
}
