//! Pipeline configuration, read from TOML.
//!
//! Every section and every field is optional; omitted values take their
//! defaults.
//!
//! ```toml
//! [segmenter]
//! max_chunk_size = 6000
//! overlap_size = 300
//!
//! [pipeline]
//! checkpoint_interval = 10
//! checkpoint_dir = "checkpoints"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use novel_text::SegmenterConfig;

use crate::context_assembler::DigestConfig;
use crate::error::{NarrativeError, Result};
use crate::extraction::RetryConfig;
use crate::retrieval::RetrievalConfig;

/// Settings for the chunk processing loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Preceding chunks included as local context.
    pub include_previous: usize,

    /// Save a checkpoint every N processed chunks. 0 disables checkpoints.
    pub checkpoint_interval: usize,

    /// Where checkpoints go. Without one, nothing is written.
    pub checkpoint_dir: Option<PathBuf>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            include_previous: 1,
            checkpoint_interval: 5,
            checkpoint_dir: None,
        }
    }
}

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub segmenter: SegmenterConfig,
    pub retrieval: RetrievalConfig,
    pub digest: DigestConfig,
    pub pipeline: ProcessingConfig,
    pub retry: RetryConfig,
}

impl PipelineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        self.segmenter
            .validate()
            .map_err(|err| NarrativeError::Config(err.to_string()))?;

        let threshold = self.retrieval.relevance_threshold;
        if !(0.0..1.0).contains(&threshold) {
            return Err(NarrativeError::Config(format!(
                "relevance_threshold ({threshold}) must be in [0, 1)"
            )));
        }
        if self.retrieval.max_characters == 0 {
            return Err(NarrativeError::Config(
                "max_characters must be greater than zero".into(),
            ));
        }
        if self.digest.fragments_per_entity == 0 {
            return Err(NarrativeError::Config(
                "fragments_per_entity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
