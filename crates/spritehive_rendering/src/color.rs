//! RGBA8 color packing for the color buffer.
//!
//! Channel order is R, G, B, A from the low byte up. The packed color shares
//! a 3-word GPU element with the two palette indices.

use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use spritehive_core::PaintPair;

/// Packs a color with channels in `[0, 1]` into one word.
///
/// Out-of-range channels are clamped, NaN packs as 0.
#[inline]
#[must_use]
pub fn pack_color(color: Vec4) -> u32 {
    let channel = |v: f32| -> u32 {
        if v.is_nan() {
            return 0;
        }
        (v.clamp(0.0, 1.0) * 255.0).round() as u32
    };
    channel(color.x) | channel(color.y) << 8 | channel(color.z) << 16 | channel(color.w) << 24
}

/// Reverses [`pack_color`].
#[inline]
#[must_use]
pub fn unpack_color(packed: u32) -> Vec4 {
    let channel = |shift: u32| ((packed >> shift) & 0xFF) as f32 / 255.0;
    Vec4::new(channel(0), channel(8), channel(16), channel(24))
}

/// One `colorBuffer` element.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct PackedColor {
    /// Packed RGBA8.
    pub rgba: u32,
    /// Primary palette index.
    pub primary: u32,
    /// Secondary palette index.
    pub secondary: u32,
}

impl PackedColor {
    /// Packs a color and its paints.
    ///
    /// Palette indices at or beyond `palette_len` fall back to the identity
    /// entry 0.
    #[inline]
    #[must_use]
    pub fn new(color: Vec4, paints: PaintPair, palette_len: usize) -> Self {
        let clamp = |index: u32| if (index as usize) < palette_len { index } else { 0 };
        Self {
            rgba: pack_color(color),
            primary: clamp(paints.primary),
            secondary: clamp(paints.secondary),
        }
    }

    /// Unpacked base color.
    #[inline]
    #[must_use]
    pub fn color(&self) -> Vec4 {
        unpack_color(self.rgba)
    }

    /// Same element with a new base color.
    #[inline]
    #[must_use]
    pub fn with_color(self, color: Vec4) -> Self {
        Self {
            rgba: pack_color(color),
            ..self
        }
    }

    /// Same element with new paints, clamped to `palette_len`.
    #[inline]
    #[must_use]
    pub fn with_paints(self, paints: PaintPair, palette_len: usize) -> Self {
        let fresh = Self::new(Vec4::ZERO, paints, palette_len);
        Self {
            primary: fresh.primary,
            secondary: fresh.secondary,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_order() {
        assert_eq!(pack_color(Vec4::new(1.0, 0.0, 0.0, 0.0)), 0x0000_00FF);
        assert_eq!(pack_color(Vec4::new(0.0, 0.0, 0.0, 1.0)), 0xFF00_0000);
        assert_eq!(pack_color(Vec4::ONE), u32::MAX);
    }

    #[test]
    fn test_out_of_range_channels_clamp() {
        assert_eq!(pack_color(Vec4::new(2.0, -1.0, f32::NAN, 1.0)), 0xFF00_00FF);
    }

    #[test]
    fn test_paint_index_clamped() {
        let packed = PackedColor::new(Vec4::ONE, PaintPair::new(3, 9), 4);
        assert_eq!(packed.primary, 3);
        assert_eq!(packed.secondary, 0);
        assert_eq!(std::mem::size_of::<PackedColor>(), 12);
    }
}
