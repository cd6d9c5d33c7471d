//! The memory bank - entity memories, global context and their retrieval index.

use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use super::{AddedValues, Character, Checkpoint, EntityMemory, GlobalContext};
use crate::context_assembler::{ContextAssembler, DigestConfig};
use crate::error::CheckpointError;
use crate::retrieval::{FragmentMetadata, MemoryIndex, RetrievalConfig};

/// Owns every piece of cross-chunk memory.
///
/// The bank is the single writer for its entity memories and index: pass it
/// by `&mut` to whatever needs to record, and wrap it in a lock if chunks are
/// ever processed concurrently.
#[derive(Debug, Clone, Default)]
pub struct MemoryBank {
    characters: BTreeMap<String, EntityMemory>,
    global: GlobalContext,
    index: MemoryIndex,
    assembler: ContextAssembler,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(retrieval: RetrievalConfig, digest: DigestConfig) -> Self {
        Self {
            index: MemoryIndex::with_config(retrieval),
            assembler: ContextAssembler::new(digest),
            ..Self::default()
        }
    }

    /// Insert or merge an entity memory and index whatever it newly adds.
    pub fn add_character(&mut self, memory: EntityMemory) -> AddedValues {
        let chapter = memory.last_appearance_chapter;
        let id = memory.character_id.clone();

        let added = match self.characters.get_mut(&id) {
            Some(existing) => {
                let added = existing.merge(memory);
                debug!(entity = %id, mentions = existing.mention_count, "merged entity memory");
                added
            }
            None => {
                let added = memory.all_values();
                debug!(entity = %id, "new entity memory");
                self.characters.insert(id.clone(), memory);
                added
            }
        };

        if !added.is_empty() {
            let name = self
                .characters
                .get(&id)
                .map(|m| m.name.clone())
                .unwrap_or_else(|| id.clone());
            let metadata = if chapter > 0 {
                FragmentMetadata::for_chapter(chapter)
            } else {
                FragmentMetadata::default()
            };
            self.index.add_character_memories(
                &id,
                &name,
                &added.traits,
                &added.goals,
                &added.descriptions,
                &added.appearances,
                &metadata,
            );
        }

        added
    }

    pub fn add_relationship(&mut self, description: impl Into<String>) -> bool {
        self.global.add_relationship(description)
    }

    pub fn add_location(&mut self, location: impl Into<String>) -> bool {
        self.global.add_location(location)
    }

    pub fn add_plot_point(&mut self, plot_point: impl Into<String>) {
        self.global.add_plot_point(plot_point)
    }

    pub fn get(&self, character_id: &str) -> Option<&EntityMemory> {
        self.characters.get(character_id)
    }

    /// Entity memories keyed by id.
    pub fn memories(&self) -> &BTreeMap<String, EntityMemory> {
        &self.characters
    }

    /// Every entity flattened to its output record.
    pub fn all_characters(&self) -> Vec<Character> {
        self.characters.values().map(EntityMemory::to_character).collect()
    }

    pub fn global_context(&self) -> &GlobalContext {
        &self.global
    }

    pub fn index(&self) -> &MemoryIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// Entity ids most relevant to `text`.
    pub fn rank_entities(&mut self, text: &str, top_k: usize) -> Vec<String> {
        self.index.rank_entities(text, top_k)
    }

    /// Digest of the entities relevant to `text`, or "" if none are.
    pub fn build_context(&mut self, text: &str) -> String {
        let top_k = self.index.config().max_characters;
        let relevant = self.index.rank_entities(text, top_k);
        if relevant.is_empty() {
            return String::new();
        }
        self.assembler.assemble(&self.index, &relevant).to_prompt_string()
    }

    /// Names of known characters, capped.
    pub fn summary(&self) -> String {
        if self.characters.is_empty() {
            return String::new();
        }

        let mut summary = String::from("## Known Characters\n");
        for memory in self
            .characters
            .values()
            .take(self.assembler.config().max_listed_characters)
        {
            summary.push_str(&format!("- {}\n", memory.name));
        }
        summary
    }

    /// Render memory for a prompt.
    ///
    /// With a query, relevant entity digests; without one, the known names.
    /// Recent relationships and plot points follow in both cases.
    pub fn to_context_prompt(&mut self, query: Option<&str>) -> String {
        let mut sections = Vec::new();

        let characters = match query.filter(|q| !q.is_empty()) {
            Some(text) => self.build_context(text),
            None => self.summary(),
        };
        if !characters.is_empty() {
            sections.push(characters);
        }

        let digest = self.assembler.config();
        let relationships = self.global.recent_relationships(digest.max_relationships);
        if !relationships.is_empty() {
            sections.push(bulleted("## Relationships", relationships));
        }
        let plot_points = self.global.recent_plot_points(digest.max_plot_points);
        if !plot_points.is_empty() {
            sections.push(bulleted("## Recent Plot Points", plot_points));
        }

        sections.join("\n")
    }

    /// Snapshot the store into a checkpoint document.
    pub fn to_checkpoint(&self) -> Checkpoint {
        Checkpoint {
            characters: self.characters.clone(),
            global_context: self.global.clone(),
        }
    }

    /// Replace the store with a checkpoint and rebuild the retrieval index.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.characters = checkpoint.characters;
        self.global = checkpoint.global_context;
        self.index.clear();

        for (id, memory) in &self.characters {
            let values = memory.all_values();
            let metadata = if memory.last_appearance_chapter > 0 {
                FragmentMetadata::for_chapter(memory.last_appearance_chapter)
            } else {
                FragmentMetadata::default()
            };
            self.index.add_character_memories(
                id,
                &memory.name,
                &values.traits,
                &values.goals,
                &values.descriptions,
                &values.appearances,
                &metadata,
            );
        }

        debug!(
            characters = self.characters.len(),
            fragments = self.index.len(),
            "restored memory bank"
        );
    }

    pub fn save_checkpoint(&self, path: &Path) -> Result<(), CheckpointError> {
        self.to_checkpoint().save(path)
    }

    pub fn load_checkpoint(&mut self, path: &Path) -> Result<(), CheckpointError> {
        let checkpoint = Checkpoint::load(path)?;
        self.restore(checkpoint);
        Ok(())
    }
}

fn bulleted(header: &str, items: &[String]) -> String {
    let mut section = format!("{}\n", header);
    for item in items {
        section.push_str(&format!("- {}\n", item));
    }
    section
}
