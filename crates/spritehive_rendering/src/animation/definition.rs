//! Authored animation set definitions and their content hash.

use bytemuck::{Pod, Zeroable};
use spritehive_core::{AnimationSetId, ClipInfo};

use crate::error::{RecordError, RecordResult};

/// Frames per second of the implicit clip of a set authored without clips.
pub const DEFAULT_CLIP_FPS: f32 = 12.0;

/// Atlas rectangle of one frame, one `uvBuffer` element.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct UvRect {
    /// Horizontal scale.
    pub scale_u: f32,
    /// Vertical scale.
    pub scale_v: f32,
    /// Horizontal offset.
    pub offset_u: f32,
    /// Vertical offset.
    pub offset_v: f32,
}

impl UvRect {
    /// Creates a rectangle from scale and offset.
    #[must_use]
    pub const fn new(scale_u: f32, scale_v: f32, offset_u: f32, offset_v: f32) -> Self {
        Self {
            scale_u,
            scale_v,
            offset_u,
            offset_v,
        }
    }

    /// Frames of a regular `columns x rows` sheet, row by row.
    #[must_use]
    pub fn grid(columns: u32, rows: u32) -> Vec<Self> {
        let su = 1.0 / columns.max(1) as f32;
        let sv = 1.0 / rows.max(1) as f32;
        (0..rows)
            .flat_map(|row| (0..columns).map(move |col| Self::new(su, sv, col as f32 * su, row as f32 * sv)))
            .collect()
    }
}

/// A named range of frames played at a fixed rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipDefinition {
    /// First frame in the set's frame table.
    pub first_frame: u32,
    /// Number of frames.
    pub frame_count: u32,
    /// Frames per second.
    pub fps: f32,
    /// Wraps at the end.
    pub looping: bool,
}

impl ClipDefinition {
    /// Looping clip.
    #[must_use]
    pub const fn looping(first_frame: u32, frame_count: u32, fps: f32) -> Self {
        Self {
            first_frame,
            frame_count,
            fps,
            looping: true,
        }
    }

    /// Clip that holds its last frame.
    #[must_use]
    pub const fn once(first_frame: u32, frame_count: u32, fps: f32) -> Self {
        Self {
            first_frame,
            frame_count,
            fps,
            looping: false,
        }
    }

    pub(crate) const fn info(&self) -> ClipInfo {
        ClipInfo {
            first_frame: self.first_frame,
            frame_count: self.frame_count,
            fps: self.fps,
            looping: self.looping,
        }
    }
}

/// Everything needed to record an animation set.
///
/// Identity is the content hash of frames and clips; two definitions that
/// differ only by name are the same set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimationSetDefinition {
    /// Human-readable name, for diagnostics only.
    pub name: String,
    /// Atlas rectangle of every frame.
    pub frames: Vec<UvRect>,
    /// Clips; empty means one looping clip over all frames.
    pub clips: Vec<ClipDefinition>,
}

impl AnimationSetDefinition {
    /// Definition with frames and no explicit clips.
    #[must_use]
    pub fn new(name: impl Into<String>, frames: Vec<UvRect>) -> Self {
        Self {
            name: name.into(),
            frames,
            clips: Vec::new(),
        }
    }

    /// Adds a clip.
    #[must_use]
    pub fn with_clip(mut self, clip: ClipDefinition) -> Self {
        self.clips.push(clip);
        self
    }

    /// Content hash of frames and clips.
    #[must_use]
    pub fn id(&self) -> AnimationSetId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.frames.len() as u64).to_le_bytes());
        hasher.update(bytemuck::cast_slice(&self.frames));
        hasher.update(&(self.clips.len() as u64).to_le_bytes());
        for clip in &self.clips {
            hasher.update(&clip.first_frame.to_le_bytes());
            hasher.update(&clip.frame_count.to_le_bytes());
            hasher.update(&clip.fps.to_bits().to_le_bytes());
            hasher.update(&[u8::from(clip.looping)]);
        }
        AnimationSetId::from_digest(hasher.finalize().as_bytes())
    }

    /// Checks the definition and returns its identity.
    ///
    /// # Errors
    ///
    /// Returns a [`RecordError`] describing the first problem found.
    pub fn validate(&self) -> RecordResult<AnimationSetId> {
        if self.frames.is_empty() {
            return Err(RecordError::EmptyFrames {
                name: self.name.clone(),
            });
        }
        for (index, clip) in self.clips.iter().enumerate() {
            if clip.frame_count == 0 {
                return Err(RecordError::EmptyClip {
                    name: self.name.clone(),
                    clip: index,
                });
            }
            let end = u64::from(clip.first_frame) + u64::from(clip.frame_count);
            if end > self.frames.len() as u64 {
                return Err(RecordError::ClipOutOfRange {
                    name: self.name.clone(),
                    clip: index,
                    first: clip.first_frame,
                    end,
                    frames: self.frames.len(),
                });
            }
            if !(clip.fps.is_finite() && clip.fps > 0.0) {
                return Err(RecordError::InvalidFrameRate {
                    name: self.name.clone(),
                    clip: index,
                    fps: clip.fps.to_string(),
                });
            }
        }
        let id = self.id();
        if id.is_nil() {
            return Err(RecordError::NilIdentity {
                name: self.name.clone(),
            });
        }
        Ok(id)
    }

    /// Clip timings, with the implicit clip filled in.
    pub(crate) fn clip_infos(&self) -> Vec<ClipInfo> {
        if self.clips.is_empty() {
            return vec![ClipInfo {
                first_frame: 0,
                frame_count: self.frames.len() as u32,
                fps: DEFAULT_CLIP_FPS,
                looping: true,
            }];
        }
        self.clips.iter().map(ClipDefinition::info).collect()
    }
}
