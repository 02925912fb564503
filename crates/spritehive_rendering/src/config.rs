//! # Renderer Configuration
//!
//! Loaded from TOML. Every field has a default so a partial file (or none at
//! all) is fine:
//!
//! ```toml
//! culling = true
//! min_batch_capacity = 256
//! grow_threshold = 0.8
//! upload_mode = "ring"
//! ring_spare_buffers = 4
//! vertices_per_instance = 6
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::batch::MIN_GROW_THRESHOLD;
use crate::error::{ConfigError, ConfigResult};

/// How per-instance arrays reach the GPU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadMode {
    /// Blocking write into one buffer per array, reallocated only when it grows.
    Immediate,
    /// Write-once buffers recycled after the GPU finished reading them.
    #[default]
    Ring,
}

/// Renderer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Test every sprite against the camera frustum.
    pub culling: bool,
    /// Smallest capacity a batch is ever given.
    pub min_batch_capacity: usize,
    /// Load factor above which a batch grows, in `[0.05, 1]`.
    pub grow_threshold: f32,
    /// Upload strategy for per-instance arrays.
    pub upload_mode: UploadMode,
    /// Completed ring buffers kept around for reuse.
    pub ring_spare_buffers: usize,
    /// Vertices drawn per sprite instance.
    pub vertices_per_instance: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            culling: true,
            min_batch_capacity: 256,
            grow_threshold: 0.8,
            upload_mode: UploadMode::Ring,
            ring_spare_buffers: 4,
            vertices_per_instance: 6,
        }
    }
}

impl RendererConfig {
    /// Parses TOML text. Values are not validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid TOML for this
    /// struct.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads, parses and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or holds
    /// out-of-range values.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), ?config, "renderer config loaded");
        Ok(config)
    }

    /// Checks every value against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] for the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.grow_threshold_in_range() {
            return Err(ConfigError::OutOfRange {
                field: "grow_threshold",
                value: self.grow_threshold.to_string(),
                expected: "0.05 <= x <= 1",
            });
        }
        if self.min_batch_capacity == 0 {
            return Err(ConfigError::OutOfRange {
                field: "min_batch_capacity",
                value: self.min_batch_capacity.to_string(),
                expected: ">= 1",
            });
        }
        if self.vertices_per_instance == 0 {
            return Err(ConfigError::OutOfRange {
                field: "vertices_per_instance",
                value: self.vertices_per_instance.to_string(),
                expected: ">= 1",
            });
        }
        Ok(())
    }

    /// Returns a copy with out-of-range values replaced by their defaults.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !self.grow_threshold_in_range() {
            tracing::warn!(value = self.grow_threshold, "grow_threshold out of range, using default");
            self.grow_threshold = defaults.grow_threshold;
        }
        if self.min_batch_capacity == 0 {
            tracing::warn!("min_batch_capacity is zero, using default");
            self.min_batch_capacity = defaults.min_batch_capacity;
        }
        if self.vertices_per_instance == 0 {
            tracing::warn!("vertices_per_instance is zero, using default");
            self.vertices_per_instance = defaults.vertices_per_instance;
        }
        self
    }

    fn grow_threshold_in_range(&self) -> bool {
        (MIN_GROW_THRESHOLD..=1.0).contains(&self.grow_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = RendererConfig::from_toml_str("").expect("parse");
        assert_eq!(config, RendererConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config =
            RendererConfig::from_toml_str("culling = false\nupload_mode = \"immediate\"\n")
                .expect("parse");
        assert!(!config.culling);
        assert_eq!(config.upload_mode, UploadMode::Immediate);
        assert_eq!(config.min_batch_capacity, 256);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let config = RendererConfig {
            grow_threshold: 1.5,
            ..RendererConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "grow_threshold", .. })
        ));
        assert!((config.sanitized().grow_threshold - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_tiny_threshold_rejected() {
        for value in [1e-30, 0.01, f32::NAN] {
            let config = RendererConfig {
                grow_threshold: value,
                ..RendererConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::OutOfRange { field: "grow_threshold", .. })
            ));
            assert!((config.sanitized().grow_threshold - 0.8).abs() < f32::EPSILON);
        }

        let floor = RendererConfig {
            grow_threshold: MIN_GROW_THRESHOLD,
            ..RendererConfig::default()
        };
        assert!(floor.validate().is_ok());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            RendererConfig::from_toml_str("culling = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            RendererConfig::load("/nonexistent/spritehive.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
