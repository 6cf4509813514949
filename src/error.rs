//! Error type shared by the analysis and extraction stages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::segment::TrackSegment;

/// Result type alias for vinylsplit operations
pub type Result<T> = std::result::Result<T, SplitError>;

#[derive(Error, Debug)]
pub enum SplitError {
    /// A source file could not be read or decoded. Aborts the whole analysis.
    #[error("Failed to decode {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("No audio files given")]
    EmptyInput,

    /// The silence fallback found a different number of tracks than the
    /// caller expects. The proposed segments are kept for manual adjustment.
    #[error("Detected {found} segments but {expected} tracks were expected")]
    SegmentCountMismatch {
        expected: usize,
        found: usize,
        segments: Vec<TrackSegment>,
    },

    #[error("Failed to extract track {track_number} to {}: {source}", .path.display())]
    ExtractionIo {
        track_number: u32,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Config file error: {0}")]
    ConfigFile(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SplitError {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SplitError::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for SplitError {
    fn from(e: toml::de::Error) -> Self {
        SplitError::ConfigFile(e.to_string())
    }
}

impl From<toml::ser::Error> for SplitError {
    fn from(e: toml::ser::Error) -> Self {
        SplitError::ConfigFile(e.to_string())
    }
}
