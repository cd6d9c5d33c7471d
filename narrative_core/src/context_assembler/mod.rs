//! Context Assembler - renders retrieved memory into a bounded digest.
//!
//! Assembly works as follows:
//! 1. **Ranking**: the caller supplies entity ids, most relevant first
//! 2. **Selection**: take up to `fragments_per_entity` fragments per entity
//! 3. **Classification**: sort each fragment by the tag embedded in its text
//! 4. **Capping**: keep at most a fixed number of values per category
//!
//! The caps make the digest size independent of how large memory grows.

use serde::{Deserialize, Serialize};

use crate::retrieval::{FragmentKind, MemoryIndex};

/// Caps applied when rendering memory into prompt text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    /// Fragments read per entity before classification.
    pub fragments_per_entity: usize,

    pub max_traits: usize,
    pub max_goals: usize,
    pub max_appearances: usize,

    /// Characters of the first description kept in the digest.
    pub description_chars: usize,

    /// Most recent relationships appended to a memory prompt.
    pub max_relationships: usize,

    /// Most recent plot points appended to a memory prompt.
    pub max_plot_points: usize,

    /// Names listed when no query is available.
    pub max_listed_characters: usize,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            fragments_per_entity: 5,
            max_traits: 3,
            max_goals: 2,
            max_appearances: 2,
            description_chars: 50,
            max_relationships: 5,
            max_plot_points: 3,
            max_listed_characters: 10,
        }
    }
}

/// The context assembler builds digests from the retrieval index.
#[derive(Debug, Clone, Default)]
pub struct ContextAssembler {
    config: DigestConfig,
}

impl ContextAssembler {
    pub fn new(config: DigestConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(DigestConfig::default())
    }

    pub fn config(&self) -> &DigestConfig {
        &self.config
    }

    /// Assemble digests for the given entities, preserving their order.
    ///
    /// Entities without fragments are skipped.
    pub fn assemble(&self, index: &MemoryIndex, entity_ids: &[String]) -> AssembledContext {
        let entities = entity_ids
            .iter()
            .filter_map(|id| self.digest_entity(index, id))
            .collect();

        AssembledContext { entities }
    }

    fn digest_entity(&self, index: &MemoryIndex, entity_id: &str) -> Option<EntityDigest> {
        let fragments = index.fragments_for_entity(entity_id, self.config.fragments_per_entity);
        let name = fragments.first()?.entity_name.clone();

        let mut digest = EntityDigest {
            entity_id: entity_id.to_string(),
            name,
            ..EntityDigest::default()
        };

        for fragment in fragments {
            let value = fragment.value.clone();
            match FragmentKind::from_content(&fragment.content) {
                FragmentKind::Trait => digest.traits.push(value),
                FragmentKind::Goal => digest.goals.push(value),
                FragmentKind::Appearance => digest.appearances.push(value),
                FragmentKind::Description => {
                    if digest.description.is_none() {
                        digest.description = Some(truncate_chars(&value, self.config.description_chars));
                    }
                }
            }
        }

        digest.traits.truncate(self.config.max_traits);
        digest.goals.truncate(self.config.max_goals);
        digest.appearances.truncate(self.config.max_appearances);

        Some(digest)
    }
}

/// Shorten `text` to `max` chars, marking the cut with "...".
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Bounded digest of one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDigest {
    pub entity_id: String,
    pub name: String,
    pub traits: Vec<String>,
    pub goals: Vec<String>,
    pub appearances: Vec<String>,
    pub description: Option<String>,
}

/// The assembled context ready for prompt generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssembledContext {
    pub entities: Vec<EntityDigest>,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Format the context as a prompt string. Empty context renders as "".
    pub fn to_prompt_string(&self) -> String {
        if self.entities.is_empty() {
            return String::new();
        }

        let mut prompt = String::from("## Relevant Characters\n");
        for entity in &self.entities {
            prompt.push_str(&format!("- {}\n", entity.name));
            if !entity.traits.is_empty() {
                prompt.push_str(&format!("  Traits: {}\n", entity.traits.join(", ")));
            }
            if !entity.goals.is_empty() {
                prompt.push_str(&format!("  Goals: {}\n", entity.goals.join(", ")));
            }
            if !entity.appearances.is_empty() {
                prompt.push_str(&format!("  Appearance: {}\n", entity.appearances.join(", ")));
            }
            if let Some(description) = &entity.description {
                prompt.push_str(&format!("  Description: {}\n", description));
            }
        }

        prompt
    }
}
