//! Registry of recorded animation sets.
//!
//! Recording is idempotent by content hash. Each recorded set owns exactly one
//! batch; batch ids are handed out in recording order and stay valid until
//! the library is cleared.

use std::collections::HashMap;
use std::sync::Arc;

use spritehive_core::{AnimationSetId, BatchId, ClipInfo, ClipLibrary};

use super::definition::{AnimationSetDefinition, UvRect};
use crate::error::RecordResult;

/// Immutable frame table and clip timings of one set.
///
/// Built once at record time and shared by the registry, the batch and its
/// GPU buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationBlob {
    /// Content hash.
    pub id: AnimationSetId,
    /// Diagnostic name.
    pub name: String,
    /// Atlas rectangle of every frame.
    pub frames: Vec<UvRect>,
    /// Clip timings.
    pub clips: Vec<ClipInfo>,
}

/// Outcome of [`AnimationLibrary::record`].
#[derive(Debug, Clone)]
pub struct Recorded {
    /// Batch owning the set.
    pub batch: BatchId,
    /// Shared frame table.
    pub blob: Arc<AnimationBlob>,
    /// False if the set was already known.
    pub created: bool,
}

#[derive(Debug, Clone)]
struct Entry {
    batch: BatchId,
    blob: Arc<AnimationBlob>,
}

/// Animation sets keyed by content hash.
#[derive(Debug, Default)]
pub struct AnimationLibrary {
    sets: HashMap<AnimationSetId, Entry>,
}

impl AnimationLibrary {
    /// Empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and records `definition`.
    ///
    /// # Errors
    ///
    /// Returns the validation error; nothing is recorded in that case.
    pub fn record(&mut self, definition: &AnimationSetDefinition) -> RecordResult<Recorded> {
        let id = match definition.validate() {
            Ok(id) => id,
            Err(error) => {
                tracing::warn!(name = %definition.name, %error, "animation set rejected");
                return Err(error);
            }
        };

        if let Some(entry) = self.sets.get(&id) {
            return Ok(Recorded {
                batch: entry.batch,
                blob: Arc::clone(&entry.blob),
                created: false,
            });
        }

        let batch = BatchId(self.sets.len() as u32);
        let blob = Arc::new(AnimationBlob {
            id,
            name: definition.name.clone(),
            frames: definition.frames.clone(),
            clips: definition.clip_infos(),
        });
        self.sets.insert(
            id,
            Entry {
                batch,
                blob: Arc::clone(&blob),
            },
        );
        tracing::debug!(name = %definition.name, %id, %batch, frames = blob.frames.len(), "animation set recorded");

        Ok(Recorded {
            batch,
            blob,
            created: true,
        })
    }

    /// Returns true if `id` was recorded.
    #[inline]
    #[must_use]
    pub fn is_recorded(&self, id: AnimationSetId) -> bool {
        self.sets.contains_key(&id)
    }

    /// Batch owning `id`.
    #[inline]
    #[must_use]
    pub fn batch_of(&self, id: AnimationSetId) -> Option<BatchId> {
        self.sets.get(&id).map(|entry| entry.batch)
    }

    /// Shared frame table of `id`.
    #[must_use]
    pub fn blob(&self, id: AnimationSetId) -> Option<&Arc<AnimationBlob>> {
        self.sets.get(&id).map(|entry| &entry.blob)
    }

    /// Number of recorded sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Forgets every set. Batch ids restart at 0.
    pub fn clear(&mut self) {
        self.sets.clear();
    }
}

impl ClipLibrary for AnimationLibrary {
    fn clip(&self, set: AnimationSetId, clip: u16) -> Option<ClipInfo> {
        self.sets
            .get(&set)
            .and_then(|entry| entry.blob.clips.get(usize::from(clip)))
            .copied()
    }
}
