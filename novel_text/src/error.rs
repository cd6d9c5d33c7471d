//! Error types for source handling.

use std::path::PathBuf;

/// Errors raised while reading or segmenting source text.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The source file could not be read at all.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Segmenter settings that cannot produce a terminating split.
    #[error("invalid segmenter configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, TextError>;
