//! Batch storage and in-place compaction.

mod compactor;
mod storage;

pub use compactor::{compact, CompactionContext, CompactionReport};
pub use storage::{grown_capacity, Batch, PackedTransform, MIN_GROW_THRESHOLD};

use rayon::prelude::*;

/// Compacts every batch on the rayon pool. Returns the summed report and
/// the number of batches whose update phase ran.
pub fn compact_all(batches: &mut [Batch], ctx: &CompactionContext<'_>) -> (CompactionReport, usize) {
    let _span = tracing::debug_span!("compact", batches = batches.len()).entered();
    let (report, touched) = batches
        .par_iter_mut()
        .map(|batch| {
            let report = compact(batch, ctx);
            (report, usize::from(!report.skipped_updates))
        })
        .reduce(
            || (CompactionReport { skipped_updates: true, ..CompactionReport::default() }, 0),
            |(a, ta), (b, tb)| (a.merge(b), ta + tb),
        );
    tracing::trace!(
        removed = report.removed,
        joined = report.joined,
        updated = report.updated_slots,
        swaps = report.partition_swaps,
        "batches compacted"
    );
    (report, touched)
}
