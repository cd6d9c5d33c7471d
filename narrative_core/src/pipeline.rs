//! The chunk processing pipeline.
//!
//! Chunks are processed strictly in order: each extraction sees the memory
//! produced by the chunks before it.

use std::path::Path;
use tracing::{debug, info, warn};

use novel_text::{context_window, read_source, Chunk, Segmenter};

use crate::config::PipelineConfig;
use crate::error::{NarrativeError, Result};
use crate::extraction::{ExtractedCharacter, ExtractedRelationship, Extraction, Extractor};
use crate::memory::MemoryBank;

/// What processing one chunk produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkReport {
    pub index: usize,
    pub chapter_number: u32,
    /// Extracted records, events re-stamped with the chunk's chapter.
    pub extraction: Extraction,
    /// Entities seen for the first time in this chunk.
    pub new_entities: usize,
}

/// Segments a text and feeds its chunks through an extractor into memory.
#[derive(Debug, Clone)]
pub struct ChunkingPipeline {
    config: PipelineConfig,
    segmenter: Segmenter,
    chunks: Vec<Chunk>,
    memory: MemoryBank,
    processed: Vec<usize>,
}

impl ChunkingPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let segmenter = Segmenter::new(config.segmenter.clone())?;
        let memory = MemoryBank::with_config(config.retrieval.clone(), config.digest.clone());
        Ok(Self {
            config,
            segmenter,
            chunks: Vec::new(),
            memory,
            processed: Vec::new(),
        })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: PipelineConfig::default(),
            segmenter: Segmenter::with_defaults(),
            chunks: Vec::new(),
            memory: MemoryBank::new(),
            processed: Vec::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read and segment a source file.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<&[Chunk]> {
        let text = read_source(path)?;
        Ok(self.load_text(&text))
    }

    /// Segment a text, replacing any previously loaded chunks.
    pub fn load_text(&mut self, text: &str) -> &[Chunk] {
        self.chunks = self.segmenter.split(text);
        self.processed.clear();
        &self.chunks
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn memory(&self) -> &MemoryBank {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryBank {
        &mut self.memory
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.chunks.len() {
            return Err(NarrativeError::ChunkOutOfRange {
                index,
                len: self.chunks.len(),
            });
        }
        Ok(())
    }

    /// A chunk with its context: relevant memory, a blank line, then the
    /// chunk and the chunks before it.
    pub fn get_chunk_with_context(&mut self, index: usize) -> Result<(&Chunk, String)> {
        self.check_index(index)?;

        let window = context_window(&self.chunks, index, self.config.pipeline.include_previous);
        let memory = self.memory.to_context_prompt(Some(self.chunks[index].content.as_str()));
        let context = join_context(&memory, &window);

        Ok((&self.chunks[index], context))
    }

    /// Context handed to the extractor: memory plus preceding chunks only,
    /// since the extractor receives the chunk itself separately.
    fn extraction_context(&mut self, index: usize) -> String {
        let include_previous = self.config.pipeline.include_previous;
        let window = if index > 0 && include_previous > 0 {
            context_window(&self.chunks, index - 1, include_previous - 1)
        } else {
            String::new()
        };
        let memory = self.memory.to_context_prompt(Some(self.chunks[index].content.as_str()));
        join_context(&memory, &window)
    }

    /// Extract one chunk and merge the results into memory.
    pub fn process_chunk(&mut self, index: usize, extractor: &mut dyn Extractor) -> Result<ChunkReport> {
        self.check_index(index)?;

        let chapter = self.chunks[index].chapter_number;
        let context = self.extraction_context(index);
        let mut extraction = extractor.extract(&self.chunks[index].content, &context)?;
        extraction.characters = std::mem::take(&mut extraction.characters)
            .into_iter()
            .map(ExtractedCharacter::normalized)
            .collect();
        extraction.relationships = std::mem::take(&mut extraction.relationships)
            .into_iter()
            .map(ExtractedRelationship::normalized)
            .collect();
        extraction.events = std::mem::take(&mut extraction.events)
            .into_iter()
            .map(|mut event| {
                event.chapter = chapter;
                event.normalized()
            })
            .collect();

        let mut new_entities = 0;
        for character in &extraction.characters {
            if self.memory.get(&character.id).is_none() {
                new_entities += 1;
            }
            self.memory.add_character(character.to_memory(chapter));
        }

        for relationship in &extraction.relationships {
            self.memory.add_relationship(relationship.summary());
        }

        for event in &extraction.events {
            if !event.summary.is_empty() {
                self.memory.add_plot_point(event.summary.clone());
            }
            if let Some(location) = event.location.as_ref().filter(|l| !l.is_empty()) {
                self.memory.add_location(location.clone());
            }
        }

        self.mark_processed(index);

        info!(
            index,
            chapter,
            characters = extraction.characters.len(),
            relationships = extraction.relationships.len(),
            events = extraction.events.len(),
            new_entities,
            "processed chunk"
        );

        Ok(ChunkReport {
            index,
            chapter_number: chapter,
            extraction,
            new_entities,
        })
    }

    /// Process every chunk not yet processed, in order.
    ///
    /// With a checkpoint directory configured, memory is saved every
    /// `checkpoint_interval` chunks as `checkpoint_ch{N}.json` and once more
    /// at the end as `memory_final.json`.
    pub fn process_all(&mut self, extractor: &mut dyn Extractor) -> Result<Vec<ChunkReport>> {
        let interval = self.config.pipeline.checkpoint_interval;
        let checkpoint_dir = self.config.pipeline.checkpoint_dir.clone();

        let mut reports = Vec::new();
        for index in 0..self.chunks.len() {
            if self.processed.contains(&index) {
                debug!(index, "skipping processed chunk");
                continue;
            }

            let report = self.process_chunk(index, extractor)?;

            if let Some(dir) = &checkpoint_dir {
                if interval > 0 && (index + 1) % interval == 0 {
                    let path = dir.join(format!("checkpoint_ch{}.json", report.chapter_number));
                    self.save_checkpoint(&path)?;
                }
            }
            reports.push(report);
        }

        if let Some(dir) = &checkpoint_dir {
            self.save_checkpoint(&dir.join("memory_final.json"))?;
        }

        info!(
            chunks = self.chunks.len(),
            processed = reports.len(),
            characters = self.memory.len(),
            "pipeline finished"
        );
        Ok(reports)
    }

    pub fn mark_processed(&mut self, index: usize) {
        if !self.processed.contains(&index) {
            self.processed.push(index);
        }
    }

    /// Indices of processed chunks, in processing order.
    pub fn processed(&self) -> &[usize] {
        &self.processed
    }

    pub fn save_checkpoint(&self, path: impl AsRef<Path>) -> Result<()> {
        Ok(self.memory.save_checkpoint(path.as_ref())?)
    }

    /// Restore memory from a checkpoint. A missing file leaves memory as is.
    pub fn load_checkpoint(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "checkpoint not found, keeping current memory");
            return Ok(());
        }
        Ok(self.memory.load_checkpoint(path)?)
    }
}

fn join_context(memory: &str, window: &str) -> String {
    match (memory.is_empty(), window.is_empty()) {
        (true, _) => window.to_string(),
        (false, true) => memory.to_string(),
        (false, false) => format!("{}\n\n{}", memory, window),
    }
}
