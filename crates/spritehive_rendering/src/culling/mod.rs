//! Culling for sprite batches.
//!
//! A single stateless point-in-frustum test, consumed by the batch compactor.

mod visibility;

pub use visibility::{is_visible, Frustum};
