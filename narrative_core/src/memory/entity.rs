//! Entity memory - the accumulated record of one character.

use serde::{Deserialize, Serialize};

/// Cross-chunk memory of one extracted character.
///
/// Descriptions, traits and goals are de-duplicated lists that keep first-seen
/// order. Background and appearance fragments accumulate, duplicates included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityMemory {
    pub character_id: String,
    pub name: String,
    pub descriptions: Vec<String>,
    pub traits: Vec<String>,
    pub goals: Vec<String>,
    pub background_fragments: Vec<String>,
    pub appearance_fragments: Vec<String>,
    pub first_appearance_chapter: u32,
    pub last_appearance_chapter: u32,
    pub mention_count: u32,
}

/// Values a merge actually added to the de-duplicated fields, plus appearance
/// fragments not seen before. These are what the retrieval index needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddedValues {
    pub descriptions: Vec<String>,
    pub traits: Vec<String>,
    pub goals: Vec<String>,
    pub appearances: Vec<String>,
}

impl AddedValues {
    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
            && self.traits.is_empty()
            && self.goals.is_empty()
            && self.appearances.is_empty()
    }
}

impl EntityMemory {
    /// Create an empty memory for an entity.
    pub fn new(character_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            character_id: character_id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Record a single sighting in `chapter`.
    pub fn seen_in(mut self, chapter: u32) -> Self {
        self.first_appearance_chapter = chapter;
        self.last_appearance_chapter = chapter;
        self.mention_count = 1;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        push_unique(&mut self.descriptions, description.into());
        self
    }

    pub fn with_traits(mut self, traits: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for value in traits {
            push_unique(&mut self.traits, value.into());
        }
        self
    }

    pub fn with_goals(mut self, goals: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for value in goals {
            push_unique(&mut self.goals, value.into());
        }
        self
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background_fragments.push(background.into());
        self
    }

    pub fn with_appearance(mut self, appearance: impl Into<String>) -> Self {
        self.appearance_fragments.push(appearance.into());
        self
    }

    /// Everything this memory holds, viewed as freshly added values.
    pub fn all_values(&self) -> AddedValues {
        AddedValues {
            descriptions: self.descriptions.clone(),
            traits: self.traits.clone(),
            goals: self.goals.clone(),
            appearances: dedup_preserving_order(&self.appearance_fragments),
        }
    }

    /// Merge a later sighting of the same entity into this memory.
    ///
    /// Chapter span widens to `[min, max]` and mention counts add up.
    /// De-duplicated fields keep their order and append unseen values in
    /// incoming order; accumulating fields concatenate.
    pub fn merge(&mut self, other: EntityMemory) -> AddedValues {
        self.first_appearance_chapter = self.first_appearance_chapter.min(other.first_appearance_chapter);
        self.last_appearance_chapter = self.last_appearance_chapter.max(other.last_appearance_chapter);
        self.mention_count = self.mention_count.saturating_add(other.mention_count);

        if self.name.is_empty() {
            self.name = other.name;
        }

        let mut added = AddedValues::default();
        for value in other.descriptions {
            if push_unique(&mut self.descriptions, value.clone()) {
                added.descriptions.push(value);
            }
        }
        for value in other.traits {
            if push_unique(&mut self.traits, value.clone()) {
                added.traits.push(value);
            }
        }
        for value in other.goals {
            if push_unique(&mut self.goals, value.clone()) {
                added.goals.push(value);
            }
        }
        for value in other.appearance_fragments {
            if !self.appearance_fragments.contains(&value) && !added.appearances.contains(&value) {
                added.appearances.push(value.clone());
            }
            self.appearance_fragments.push(value);
        }
        self.background_fragments.extend(other.background_fragments);

        added
    }

    /// Flatten into the output record.
    pub fn to_character(&self) -> Character {
        Character {
            id: self.character_id.clone(),
            name: self.name.clone(),
            description: self.descriptions.join("; "),
            traits: dedup_preserving_order(&self.traits),
            goals: dedup_preserving_order(&self.goals),
            background: join_non_empty(&self.background_fragments),
            appearance: join_non_empty(&self.appearance_fragments),
        }
    }
}

/// Flat character record produced from an [`EntityMemory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub description: String,
    pub traits: Vec<String>,
    pub goals: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appearance: Option<String>,
}

/// Append `value` unless already present. Returns whether it was appended.
fn push_unique(list: &mut Vec<String>, value: String) -> bool {
    if list.contains(&value) {
        return false;
    }
    list.push(value);
    true
}

fn dedup_preserving_order(values: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        push_unique(&mut out, value.clone());
    }
    out
}

fn join_non_empty(values: &[String]) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn as_set(values: &[String]) -> HashSet<&str> {
        values.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_merge_widens_span_and_counts() {
        let mut a = EntityMemory::new("char_1", "A").seen_in(1);
        let b = EntityMemory::new("char_1", "A").seen_in(2);

        a.merge(b);

        assert_eq!(a.first_appearance_chapter, 1);
        assert_eq!(a.last_appearance_chapter, 2);
        assert_eq!(a.mention_count, 2);
    }

    #[test]
    fn test_merge_out_of_order_chapters() {
        let mut later = EntityMemory::new("c", "C").seen_in(7);
        later.merge(EntityMemory::new("c", "C").seen_in(3));

        assert_eq!(later.first_appearance_chapter, 3);
        assert_eq!(later.last_appearance_chapter, 7);
    }

    #[test]
    fn test_merge_dedups_list_fields() {
        let mut a = EntityMemory::new("c", "C").with_traits(["brave", "loyal"]);
        let b = EntityMemory::new("c", "C").with_traits(["loyal", "stubborn", "brave", "kind"]);

        let added = a.merge(b);

        assert_eq!(a.traits, vec!["brave", "loyal", "stubborn", "kind"]);
        assert_eq!(added.traits, vec!["stubborn", "kind"]);
    }

    #[test]
    fn test_merge_accumulates_fragments() {
        let mut a = EntityMemory::new("c", "C")
            .with_background("born in the north")
            .with_appearance("tall");
        let b = EntityMemory::new("c", "C")
            .with_background("born in the north")
            .with_appearance("tall")
            .with_appearance("scarred");

        let added = a.merge(b);

        assert_eq!(a.background_fragments.len(), 2);
        assert_eq!(a.appearance_fragments, vec!["tall", "tall", "scarred"]);
        assert_eq!(added.appearances, vec!["scarred"]);
    }

    #[test]
    fn test_merge_commutes_on_value_sets() {
        let a = EntityMemory::new("c", "C")
            .seen_in(1)
            .with_traits(["x", "y"])
            .with_goals(["g1"]);
        let b = EntityMemory::new("c", "C")
            .seen_in(4)
            .with_traits(["z", "x"])
            .with_goals(["g2"]);

        let mut ab = a.clone();
        ab.merge(b.clone());
        let mut ba = b;
        ba.merge(a);

        assert_eq!(as_set(&ab.traits), as_set(&ba.traits));
        assert_eq!(as_set(&ab.goals), as_set(&ba.goals));
        assert_eq!(ab.first_appearance_chapter, ba.first_appearance_chapter);
        assert_eq!(ab.last_appearance_chapter, ba.last_appearance_chapter);
        assert_eq!(ab.mention_count, ba.mention_count);
    }

    #[test]
    fn test_to_character() {
        let memory = EntityMemory::new("char_li", "李雷")
            .with_description("学生")
            .with_description("班长")
            .with_traits(["认真", "幽默"])
            .with_appearance("戴眼镜");

        let character = memory.to_character();

        assert_eq!(character.id, "char_li");
        assert_eq!(character.description, "学生; 班长");
        assert_eq!(character.traits, vec!["认真", "幽默"]);
        assert_eq!(character.background, None);
        assert_eq!(character.appearance.as_deref(), Some("戴眼镜"));
    }

    #[test]
    fn test_lenient_deserialize() {
        let memory: EntityMemory = serde_json::from_str(r#"{"name": "B", "traits": ["quiet"]}"#)
            .expect("partial record should load");

        assert_eq!(memory.name, "B");
        assert_eq!(memory.traits, vec!["quiet"]);
        assert_eq!(memory.mention_count, 0);
        assert!(memory.goals.is_empty());
    }
}
