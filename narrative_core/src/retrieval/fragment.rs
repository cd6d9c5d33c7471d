//! Memory fragments - the atomic units indexed for retrieval.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::SparseVector;

/// The attribute a fragment records about its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    Trait,
    Goal,
    Description,
    Appearance,
}

impl FragmentKind {
    pub const ALL: [FragmentKind; 4] = [Self::Trait, Self::Goal, Self::Description, Self::Appearance];

    /// Tag embedded in the fragment text.
    pub fn label(&self) -> &'static str {
        match self {
            FragmentKind::Trait => "trait",
            FragmentKind::Goal => "goal",
            FragmentKind::Description => "description",
            FragmentKind::Appearance => "appearance",
        }
    }

    /// Short form used in fragment ids.
    pub fn id_part(&self) -> &'static str {
        match self {
            FragmentKind::Trait => "trait",
            FragmentKind::Goal => "goal",
            FragmentKind::Description => "desc",
            FragmentKind::Appearance => "app",
        }
    }

    /// Recover the kind from a fragment's rendered text.
    ///
    /// The earliest tag wins, so a value quoting another tag is not
    /// misread. Text without a recognised tag is treated as a description.
    pub fn from_content(content: &str) -> Self {
        Self::ALL
            .into_iter()
            .filter_map(|kind| {
                content
                    .find(&format!(" {}: ", kind.label()))
                    .map(|position| (position, kind))
            })
            .min_by_key(|(position, _)| *position)
            .map_or(FragmentKind::Description, |(_, kind)| kind)
    }
}

impl std::fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Extra information attached to a fragment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FragmentMetadata {
    /// Chapter the fragment was extracted from.
    pub chapter: Option<u32>,

    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl FragmentMetadata {
    pub fn for_chapter(chapter: u32) -> Self {
        Self {
            chapter: Some(chapter),
            extra: BTreeMap::new(),
        }
    }
}

/// A single attributed piece of text tied to one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryFragment {
    pub id: String,

    pub entity_id: String,

    pub entity_name: String,

    pub kind: FragmentKind,

    /// The raw attribute value, e.g. `"brave"`.
    pub value: String,

    /// Indexed text: entity name, tag and value.
    pub content: String,

    /// TF-IDF weights. Recomputed on every re-fit of the index.
    #[serde(skip)]
    pub vector: SparseVector,

    pub metadata: FragmentMetadata,
}

impl MemoryFragment {
    /// Create a fragment, rendering its indexed text.
    pub fn new(
        id: impl Into<String>,
        entity_id: impl Into<String>,
        entity_name: impl Into<String>,
        kind: FragmentKind,
        value: impl Into<String>,
    ) -> Self {
        let entity_name = entity_name.into();
        let value = value.into();
        Self {
            id: id.into(),
            entity_id: entity_id.into(),
            content: format!("{} {}: {}", entity_name, kind.label(), value),
            entity_name,
            kind,
            value,
            vector: SparseVector::new(),
            metadata: FragmentMetadata::default(),
        }
    }

    /// Set the fragment metadata.
    pub fn with_metadata(mut self, metadata: FragmentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set the source chapter.
    pub fn with_chapter(mut self, chapter: u32) -> Self {
        self.metadata.chapter = Some(chapter);
        self
    }
}
