//! # Rendering Error Types
//!
//! Only set-up operations can fail. Per-frame work never returns an error:
//! stale handles, missing palette entries and full batches all degrade to a
//! harmless default and re-converge on the next frame.

use std::path::PathBuf;

use thiserror::Error;

/// Reasons an animation set definition is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The definition has no frames.
    #[error("animation set '{name}' has no frames")]
    EmptyFrames {
        /// Definition name.
        name: String,
    },

    /// The content hash came out nil.
    #[error("animation set '{name}' has a nil identity hash")]
    NilIdentity {
        /// Definition name.
        name: String,
    },

    /// A clip reaches past the end of the frame table.
    #[error("clip {clip} of '{name}' covers frames {first}..{end} but the set has {frames}")]
    ClipOutOfRange {
        /// Definition name.
        name: String,
        /// Clip index.
        clip: usize,
        /// First frame of the clip.
        first: u32,
        /// One past the last frame of the clip.
        end: u64,
        /// Frames in the set.
        frames: usize,
    },

    /// A clip plays at zero, negative or non-finite frame rate.
    #[error("clip {clip} of '{name}' has invalid frame rate {fps}")]
    InvalidFrameRate {
        /// Definition name.
        name: String,
        /// Clip index.
        clip: usize,
        /// Offending rate, formatted.
        fps: String,
    },

    /// A clip has no frames.
    #[error("clip {clip} of '{name}' is empty")]
    EmptyClip {
        /// Definition name.
        name: String,
        /// Clip index.
        clip: usize,
    },
}

/// Result type for recording animation sets.
pub type RecordResult<T> = Result<T, RecordError>;

/// Errors raised while loading renderer configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML text did not parse.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value lies outside its accepted range.
    #[error("config value {field} = {value} is out of range ({expected})")]
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// Offending value, formatted.
        value: String,
        /// Accepted range.
        expected: &'static str,
    },
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
