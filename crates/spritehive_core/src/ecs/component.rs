//! # Sprite Components
//!
//! Plain data carried by every sprite instance. Rendering never reads these
//! directly; it consumes change maps built from them.

use glam::{Quat, Vec3, Vec4};

/// Current frame of a sprite, with hidden state folded into the sign.
///
/// Non-negative values are visible frame indices. A hidden sprite stores
/// `-(frame + 1)` so the frame it will resume on is never lost.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct FrameIndex(pub i32);

impl FrameIndex {
    /// Visible frame.
    #[inline]
    #[must_use]
    pub const fn visible(frame: u32) -> Self {
        Self(frame as i32)
    }

    /// Hidden frame that resumes on `frame`.
    #[inline]
    #[must_use]
    pub const fn hidden(frame: u32) -> Self {
        Self(-(frame as i32) - 1)
    }

    /// Returns true if the sprite is hidden.
    #[inline]
    #[must_use]
    pub const fn is_hidden(self) -> bool {
        self.0 < 0
    }

    /// The frame shown when visible (or resumed when hidden).
    #[inline]
    #[must_use]
    pub const fn frame(self) -> u32 {
        if self.0 < 0 {
            (-(self.0 + 1)) as u32
        } else {
            self.0 as u32
        }
    }

    /// Same frame with the hidden flag set or cleared.
    #[inline]
    #[must_use]
    pub const fn with_hidden(self, hidden: bool) -> Self {
        if hidden {
            Self::hidden(self.frame())
        } else {
            Self::visible(self.frame())
        }
    }

    /// Raw signed value as written to the GPU index buffer.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }
}

/// World transform of a sprite: position, uniform scale and rotation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpriteTransform {
    /// World-space position.
    pub position: Vec3,
    /// Uniform scale.
    pub scale: f32,
    /// Rotation.
    pub rotation: Quat,
}

impl SpriteTransform {
    /// Identity transform at the origin.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        scale: 1.0,
        rotation: Quat::IDENTITY,
    };

    /// Transform at `position` with unit scale and no rotation.
    #[must_use]
    pub const fn from_position(position: Vec3) -> Self {
        Self {
            position,
            scale: 1.0,
            rotation: Quat::IDENTITY,
        }
    }

    /// Returns a copy with a different scale.
    #[must_use]
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Returns a copy with a different rotation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }
}

impl Default for SpriteTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Primary and secondary palette indices of a sprite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PaintPair {
    /// Primary paint.
    pub primary: u32,
    /// Secondary paint.
    pub secondary: u32,
}

impl PaintPair {
    /// Both slots on the identity paint.
    pub const IDENTITY: Self = Self {
        primary: 0,
        secondary: 0,
    };

    /// Creates a paint pair.
    #[must_use]
    pub const fn new(primary: u32, secondary: u32) -> Self {
        Self { primary, secondary }
    }
}

/// Opaque white.
pub const WHITE: Vec4 = Vec4::ONE;

/// Per-instance playback state, advanced by the playback tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Playback {
    /// Clip index inside the animation set.
    pub clip: u16,
    /// Seconds into the clip.
    pub time: f32,
    /// Playback rate multiplier. Zero freezes the sprite.
    pub speed: f32,
    /// Hidden sprites keep advancing but draw nothing.
    pub hidden: bool,
}

impl Default for Playback {
    fn default() -> Self {
        Self {
            clip: 0,
            time: 0.0,
            speed: 1.0,
            hidden: false,
        }
    }
}

/// When an instance dies on its own.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Lifetime {
    /// Instance dies as soon as this instance is no longer alive.
    pub parent: Option<super::InstanceId>,
    /// Seconds left to live.
    pub remaining: Option<f32>,
}

impl Lifetime {
    /// Lives until removed explicitly.
    pub const FOREVER: Self = Self {
        parent: None,
        remaining: None,
    };

    /// Lives for `seconds`.
    #[must_use]
    pub const fn timed(seconds: f32) -> Self {
        Self {
            parent: None,
            remaining: Some(seconds),
        }
    }

    /// Lives as long as `parent`.
    #[must_use]
    pub const fn bound_to(parent: super::InstanceId) -> Self {
        Self {
            parent: Some(parent),
            remaining: None,
        }
    }
}

/// Tracked sprite attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Frame index (including hidden state).
    Frame,
    /// Base color.
    Color,
    /// Palette indices.
    Paint,
    /// World transform.
    Transform,
}

impl Attribute {
    /// All tracked attributes.
    pub const ALL: [Self; 4] = [Self::Frame, Self::Color, Self::Paint, Self::Transform];
}

/// Change ticks stamped when an attribute's value actually changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangeTicks {
    /// Frame index tick.
    pub frame: u64,
    /// Color tick.
    pub color: u64,
    /// Paint tick.
    pub paint: u64,
    /// Transform tick.
    pub transform: u64,
    /// Batch membership tick.
    pub membership: u64,
}

impl ChangeTicks {
    /// All ticks set to `tick`.
    #[must_use]
    pub const fn all(tick: u64) -> Self {
        Self {
            frame: tick,
            color: tick,
            paint: tick,
            transform: tick,
            membership: tick,
        }
    }

    /// Tick of one attribute.
    #[inline]
    #[must_use]
    pub const fn of(&self, attribute: Attribute) -> u64 {
        match attribute {
            Attribute::Frame => self.frame,
            Attribute::Color => self.color,
            Attribute::Paint => self.paint,
            Attribute::Transform => self.transform,
        }
    }
}
