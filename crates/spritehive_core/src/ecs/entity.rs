//! # Handles
//!
//! Sprite instances are addressed by generation-tagged ids:
//! - An index into the slot table
//! - A generation counter that invalidates stale references on reuse
//!
//! Batches and animation sets get their own opaque handle types so the
//! three can never be confused at a call site.

use std::fmt;

/// Unique identifier for a sprite instance.
///
/// The ID is split into two parts:
/// - Lower 32 bits: slot index
/// - Upper 32 bits: generation counter for detecting stale references
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Null/invalid instance ID.
    pub const NULL: Self = Self(u64::MAX);

    /// Creates a new instance ID from index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the slot index portion of the ID.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the ID.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Checks if this ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }

    /// Raw 64-bit representation.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("instance(null)")
        } else {
            write!(f, "instance({}v{})", self.index(), self.generation())
        }
    }
}

/// Handle to a render batch.
///
/// Batches are owned by the renderer; the id is an index into its batch
/// table and is only meaningful until the next renderer reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct BatchId(pub u32);

impl BatchId {
    /// Index into the batch table.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch({})", self.0)
    }
}

/// Content-addressed identity of an animation set (128-bit hash).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct AnimationSetId(pub u128);

impl AnimationSetId {
    /// The empty hash. Never a valid animation set.
    pub const NIL: Self = Self(0);

    /// Builds an id from the first 16 bytes of a digest.
    #[must_use]
    pub fn from_digest(bytes: &[u8; 32]) -> Self {
        let mut head = [0u8; 16];
        head.copy_from_slice(&bytes[..16]);
        Self(u128::from_le_bytes(head))
    }

    /// Returns true for the empty hash.
    #[inline]
    #[must_use]
    pub const fn is_nil(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for AnimationSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_id_roundtrip() {
        let id = InstanceId::new(12345, 67890);
        assert_eq!(id.index(), 12345);
        assert_eq!(id.generation(), 67890);
        assert!(!id.is_null());
    }

    #[test]
    fn test_null_is_default() {
        assert!(InstanceId::default().is_null());
        assert_eq!(InstanceId::default().to_string(), "instance(null)");
    }

    #[test]
    fn test_animation_set_from_digest() {
        let mut digest = [0u8; 32];
        digest[0] = 1;
        let id = AnimationSetId::from_digest(&digest);
        assert_eq!(id.0, 1);
        assert!(!id.is_nil());
        assert!(AnimationSetId::NIL.is_nil());
    }
}
