//! Extraction - the capability that turns chunk text into structured records.
//!
//! The core only depends on the [`Extractor`] trait. [`LlmExtractor`] is the
//! completion-backed implementation; tests script their own.

mod llm;
mod parse;
mod retry;

pub use llm::*;
pub use parse::*;
pub use retry::*;

use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;
use crate::memory::EntityMemory;

/// Produces structured records from a chunk of text.
pub trait Extractor {
    /// Extract records from `text`. `context` carries what earlier chunks
    /// established and may be empty.
    fn extract(&mut self, text: &str, context: &str) -> Result<Extraction, ExtractionError>;
}

/// Everything extracted from one chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Extraction {
    pub characters: Vec<ExtractedCharacter>,
    pub relationships: Vec<ExtractedRelationship>,
    pub events: Vec<TimelineEvent>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty() && self.relationships.is_empty() && self.events.is_empty()
    }
}

/// A character as reported by the extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedCharacter {
    pub id: String,
    pub name: String,
    pub description: String,
    pub traits: Vec<String>,
    pub goals: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appearance: Option<String>,
}

impl ExtractedCharacter {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Fill an absent id from the name.
    pub fn normalized(mut self) -> Self {
        if self.id.trim().is_empty() {
            let name = if self.name.is_empty() { "unknown" } else { self.name.as_str() };
            self.id = format!("char_{}", name);
        }
        self
    }

    /// Memory of this sighting in `chapter`.
    pub fn to_memory(&self, chapter: u32) -> EntityMemory {
        let mut memory = EntityMemory::new(self.id.clone(), self.name.clone())
            .seen_in(chapter)
            .with_traits(self.traits.iter().filter(|t| !t.is_empty()).cloned())
            .with_goals(self.goals.iter().filter(|g| !g.is_empty()).cloned());
        if !self.description.is_empty() {
            memory = memory.with_description(self.description.clone());
        }
        if let Some(background) = self.background.as_ref().filter(|b| !b.is_empty()) {
            memory = memory.with_background(background.clone());
        }
        if let Some(appearance) = self.appearance.as_ref().filter(|a| !a.is_empty()) {
            memory = memory.with_appearance(appearance.clone());
        }
        memory
    }
}

fn default_strength() -> u8 {
    3
}

fn default_kind() -> String {
    "unknown".to_string()
}

/// A relationship between two characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRelationship {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub character_id_1: String,
    #[serde(default)]
    pub character_id_2: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    /// 0 (none) to 5 (extreme).
    #[serde(default)]
    pub conflict_level: u8,
    /// 0 to 5.
    #[serde(default = "default_strength")]
    pub strength: u8,
}

impl ExtractedRelationship {
    pub fn new(a: impl Into<String>, b: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            character_id_1: a.into(),
            character_id_2: b.into(),
            kind: kind.into(),
            description: String::new(),
            conflict_level: 0,
            strength: default_strength(),
        }
        .normalized()
    }

    /// Clamp levels into range and fill an absent id.
    pub fn normalized(mut self) -> Self {
        self.conflict_level = self.conflict_level.min(5);
        self.strength = self.strength.min(5);
        if self.id.trim().is_empty() {
            self.id = format!("rel_{}_{}", self.character_id_1, self.character_id_2);
        }
        self
    }

    /// The line recorded in global context.
    pub fn summary(&self) -> String {
        format!("{} & {}: {}", self.character_id_1, self.character_id_2, self.kind)
    }
}

/// A plot event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineEvent {
    pub id: String,
    pub chapter: u32,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub character_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl TimelineEvent {
    pub fn new(chapter: u32, summary: impl Into<String>) -> Self {
        Self {
            chapter,
            summary: summary.into(),
            ..Self::default()
        }
        .normalized()
    }

    pub fn normalized(mut self) -> Self {
        if self.id.trim().is_empty() {
            self.id = format!("event_ch{}", self.chapter);
        }
        self
    }
}
