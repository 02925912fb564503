//! Change detection between the sprite world and the packed batches.

mod change_tracker;

pub use change_tracker::{scan, ChangeSet, ChangeTracker};
