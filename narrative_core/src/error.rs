//! Error types for the narrative core.

use std::path::PathBuf;
use std::time::Duration;

use crate::extraction::ErrorKind;

/// Main error type for the narrative core.
#[derive(Debug, thiserror::Error)]
pub enum NarrativeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration rejected by validation.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("chunk index {index} out of range ({len} chunks)")]
    ChunkOutOfRange { index: usize, len: usize },

    #[error("Source error: {0}")]
    Source(#[from] novel_text::TextError),
}

/// Checkpoint document errors.
///
/// Only structural problems are errors; missing leaf fields default.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("failed to access checkpoint {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed checkpoint: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("checkpoint document is not a JSON object")]
    NotAnObject,

    #[error("checkpoint is missing required key `{0}`")]
    MissingKey(&'static str),
}

/// Failures of the extraction capability.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// Non-success response from the completion provider.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("connection failed: {0}")]
    Connection(String),

    /// The provider answered but the reply could not be used.
    #[error("unusable response: {0}")]
    Parse(String),
}

impl ExtractionError {
    /// Classify this error for the retry policy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api { status, .. } => ErrorKind::from_status(*status),
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Connection(_) => ErrorKind::Connection,
            Self::Parse(_) => ErrorKind::Client,
        }
    }

    /// Server-requested wait before the next attempt, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, NarrativeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_error_kinds() {
        let api = |status| ExtractionError::Api {
            status,
            message: String::new(),
        };
        assert_eq!(api(429).kind(), ErrorKind::RateLimited);
        assert_eq!(api(503).kind(), ErrorKind::Server);
        assert_eq!(api(400).kind(), ErrorKind::Client);
        assert_eq!(ExtractionError::Connection("reset".into()).kind(), ErrorKind::Connection);
        assert_eq!(ExtractionError::Parse("garbage".into()).kind(), ErrorKind::Client);
    }

    #[test]
    fn test_error_conversions() {
        let err: NarrativeError = CheckpointError::MissingKey("characters").into();
        assert!(err.to_string().contains("characters"));

        let malformed = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: NarrativeError = CheckpointError::from(malformed).into();
        assert!(matches!(err, NarrativeError::Checkpoint(CheckpointError::Malformed(_))));

        let err: NarrativeError = ExtractionError::RateLimited {
            retry_after: Some(Duration::from_secs(2)),
        }
        .into();
        assert!(matches!(err, NarrativeError::Extraction(_)));
    }
}
