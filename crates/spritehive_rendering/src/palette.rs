//! Paint palette.
//!
//! Color-substitution rules shared by every batch. Sprites carry two indices
//! into this table; the table itself lives in a single GPU buffer that is
//! re-broadcast to every batch whenever it grows or is reset.
//!
//! Entries are never removed one by one. Index 0 is the all-zero identity
//! rule and always present.

use bytemuck::{Pod, Zeroable};

/// One color-substitution rule.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PaintConfig {
    /// Color to match (rgba).
    pub match_color: [f32; 4],
    /// Replacement color (rgba).
    pub substitute: [f32; 4],
    /// (threshold, smoothing, blend, alpha cutoff).
    pub params: [f32; 4],
}

impl PaintConfig {
    /// No-op rule at index 0.
    pub const IDENTITY: Self = Self {
        match_color: [0.0; 4],
        substitute: [0.0; 4],
        params: [0.0; 4],
    };

    /// Rule replacing `match_color` by `substitute`.
    #[must_use]
    pub const fn new(match_color: [f32; 4], substitute: [f32; 4], threshold: f32) -> Self {
        Self {
            match_color,
            substitute,
            params: [threshold, 0.0, 1.0, 0.0],
        }
    }

    /// Sets smoothing, blend and alpha cutoff.
    #[must_use]
    pub fn with_shaping(mut self, smoothing: f32, blend: f32, alpha_cutoff: f32) -> Self {
        self.params[1] = smoothing;
        self.params[2] = blend;
        self.params[3] = alpha_cutoff;
        self
    }

    /// Bit-exact comparison; `-0.0` and `0.0` differ, equal NaNs match.
    #[inline]
    #[must_use]
    pub fn bit_eq(&self, other: &Self) -> bool {
        bytemuck::bytes_of(self) == bytemuck::bytes_of(other)
    }
}

/// Deduplicated, append-only paint table.
#[derive(Debug, Clone)]
pub struct PaintPalette {
    entries: Vec<PaintConfig>,
    version: u64,
}

impl Default for PaintPalette {
    fn default() -> Self {
        Self::new()
    }
}

impl PaintPalette {
    /// Palette holding only the identity entry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: vec![PaintConfig::IDENTITY],
            version: 1,
        }
    }

    /// Index of `config`, appending it if no bit-identical entry exists.
    pub fn lookup_or_insert(&mut self, config: PaintConfig) -> u32 {
        if let Some(index) = self.entries.iter().position(|entry| entry.bit_eq(&config)) {
            return index as u32;
        }
        self.entries.push(config);
        self.version += 1;
        tracing::debug!(len = self.entries.len(), "paint palette grew");
        (self.entries.len() - 1) as u32
    }

    /// Drops every entry except the identity.
    pub fn reset(&mut self) {
        self.entries.truncate(1);
        self.entries[0] = PaintConfig::IDENTITY;
        self.version += 1;
        tracing::debug!("paint palette reset");
    }

    /// Number of entries, identity included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: the identity entry is never removed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: u32) -> Option<&PaintConfig> {
        self.entries.get(index as usize)
    }

    /// All entries, in index order.
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[PaintConfig] {
        &self.entries
    }

    /// Bumped on every growth or reset; GPU copies compare against it.
    #[inline]
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED_TO_BLUE: PaintConfig =
        PaintConfig::new([1.0, 0.0, 0.0, 1.0], [0.0, 0.0, 1.0, 1.0], 0.1);

    #[test]
    fn test_dedup_returns_same_index() {
        let mut palette = PaintPalette::new();
        let a = palette.lookup_or_insert(RED_TO_BLUE);
        assert_eq!(palette.len(), 2);
        let b = palette.lookup_or_insert(RED_TO_BLUE);
        assert_eq!(a, b);
        assert_eq!(a, 1);
        assert_eq!(palette.len(), 2);
    }

    #[test]
    fn test_identity_lookup_does_not_grow() {
        let mut palette = PaintPalette::new();
        let version = palette.version();
        assert_eq!(palette.lookup_or_insert(PaintConfig::IDENTITY), 0);
        assert_eq!(palette.version(), version);
    }

    #[test]
    fn test_negative_zero_is_distinct() {
        let mut palette = PaintPalette::new();
        let mut config = PaintConfig::IDENTITY;
        config.params[0] = -0.0;
        assert_eq!(palette.lookup_or_insert(config), 1);
    }

    #[test]
    fn test_reset_keeps_identity() {
        let mut palette = PaintPalette::new();
        palette.lookup_or_insert(RED_TO_BLUE);
        palette.lookup_or_insert(RED_TO_BLUE.with_shaping(0.5, 0.5, 0.1));
        let before = palette.version();
        palette.reset();
        assert_eq!(palette.len(), 1);
        assert!(palette.get(0).is_some_and(|e| e.bit_eq(&PaintConfig::IDENTITY)));
        assert!(palette.version() > before);
    }
}
