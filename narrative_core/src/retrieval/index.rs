//! Retrieval index - TF-IDF search over memory fragments.
//!
//! Adding a fragment marks the index dirty. The next search re-fits the
//! vectorizer over the whole fragment corpus and re-vectorizes every fragment,
//! so fragment vectors always reflect the full current corpus when read. A
//! dirty search therefore costs O(corpus size); there is no incremental
//! re-indexing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::{cosine_similarity, EntityRelevance, FragmentKind, FragmentMetadata, MemoryFragment, TfidfVectorizer};

/// Configuration for retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Fragments scoring at or below this similarity do not count towards an
    /// entity's relevance.
    pub relevance_threshold: f64,

    /// Maximum number of entities surfaced per query.
    pub max_characters: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: 0.1,
            max_characters: 5,
        }
    }
}

/// A scored fragment returned by [`MemoryIndex::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub fragment_id: String,
    pub entity_id: String,
    pub entity_name: String,
    pub kind: FragmentKind,
    pub content: String,
    pub score: f64,
}

impl SearchHit {
    fn new(fragment: &MemoryFragment, score: f64) -> Self {
        Self {
            fragment_id: fragment.id.clone(),
            entity_id: fragment.entity_id.clone(),
            entity_name: fragment.entity_name.clone(),
            kind: fragment.kind,
            content: fragment.content.clone(),
            score,
        }
    }
}

/// Fragment store with TF-IDF retrieval.
///
/// Not internally synchronized: mutate from a single owner.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    config: RetrievalConfig,

    /// All fragments in insertion order.
    fragments: Vec<MemoryFragment>,

    /// Index: fragment id -> position.
    by_id: HashMap<String, usize>,

    /// Index: entity id -> positions in insertion order.
    by_entity: HashMap<String, Vec<usize>>,

    /// Fragments issued per (entity, kind), used to mint unique ids.
    issued: HashMap<(String, FragmentKind), usize>,

    vectorizer: TfidfVectorizer,

    dirty: bool,
}

impl MemoryIndex {
    /// Create an empty index with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index with the given configuration.
    pub fn with_config(config: RetrievalConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Add a fragment. A fragment whose id already exists replaces it in place.
    pub fn add_fragment(&mut self, fragment: MemoryFragment) {
        self.dirty = true;

        if let Some(&position) = self.by_id.get(&fragment.id) {
            let previous = &self.fragments[position];
            if previous.entity_id != fragment.entity_id {
                if let Some(positions) = self.by_entity.get_mut(&previous.entity_id) {
                    positions.retain(|&p| p != position);
                }
                self.by_entity
                    .entry(fragment.entity_id.clone())
                    .or_default()
                    .push(position);
            }
            self.fragments[position] = fragment;
            return;
        }

        let position = self.fragments.len();
        self.by_id.insert(fragment.id.clone(), position);
        self.by_entity
            .entry(fragment.entity_id.clone())
            .or_default()
            .push(position);
        self.fragments.push(fragment);
    }

    /// Add one fragment per attribute value of an entity.
    ///
    /// Returns the number of fragments added.
    #[allow(clippy::too_many_arguments)]
    pub fn add_character_memories(
        &mut self,
        entity_id: &str,
        entity_name: &str,
        traits: &[String],
        goals: &[String],
        descriptions: &[String],
        appearances: &[String],
        metadata: &FragmentMetadata,
    ) -> usize {
        let groups = [
            (FragmentKind::Trait, traits),
            (FragmentKind::Goal, goals),
            (FragmentKind::Description, descriptions),
            (FragmentKind::Appearance, appearances),
        ];

        let mut added = 0;
        for (kind, values) in groups {
            for value in values {
                let id = self.next_fragment_id(entity_id, kind);
                self.add_fragment(
                    MemoryFragment::new(id, entity_id, entity_name, kind, value.as_str())
                        .with_metadata(metadata.clone()),
                );
                added += 1;
            }
        }
        added
    }

    /// Mint an id of the form `{entity}_{kind}_{n}`, unique per entity and kind.
    fn next_fragment_id(&mut self, entity_id: &str, kind: FragmentKind) -> String {
        let counter = self.issued.entry((entity_id.to_string(), kind)).or_default();
        loop {
            let id = format!("{}_{}_{}", entity_id, kind.id_part(), counter);
            *counter += 1;
            if !self.by_id.contains_key(&id) {
                return id;
            }
        }
    }

    /// Re-fit the vectorizer and re-vectorize every fragment if the corpus changed.
    pub fn ensure_fitted(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        if self.fragments.is_empty() {
            return;
        }

        let corpus: Vec<&str> = self.fragments.iter().map(|f| f.content.as_str()).collect();
        self.vectorizer.fit(&corpus);

        for fragment in self.fragments.iter_mut() {
            fragment.vector = self.vectorizer.transform(&fragment.content);
        }

        debug!(
            fragments = self.fragments.len(),
            vocabulary = self.vectorizer.vocabulary_len(),
            "re-fitted retrieval index"
        );
    }

    /// Rank fragments against a query.
    ///
    /// Scores every fragment (restricted to `entity_filter` when given) by
    /// cosine similarity and returns the best `top_k`, ties in insertion order.
    /// An empty filter is the same as no filter.
    pub fn search(&mut self, query: &str, top_k: usize, entity_filter: Option<&[String]>) -> Vec<SearchHit> {
        let entity_filter = entity_filter.filter(|ids| !ids.is_empty());
        self.ensure_fitted();
        if self.fragments.is_empty() || !self.vectorizer.is_fitted() {
            return Vec::new();
        }

        let query_vector = self.vectorizer.transform(query);
        if query_vector.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<SearchHit> = self
            .fragments
            .iter()
            .filter(|f| entity_filter.map_or(true, |ids| ids.contains(&f.entity_id)))
            .filter(|f| !f.vector.is_empty())
            .map(|f| SearchHit::new(f, cosine_similarity(&query_vector, &f.vector)))
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        hits
    }

    /// Identify the entities most relevant to a text.
    ///
    /// Fragments scoring above the relevance threshold are aggregated per
    /// entity (see [`EntityRelevance`]); the `top_k` entity ids are returned.
    pub fn rank_entities(&mut self, text: &str, top_k: usize) -> Vec<String> {
        self.entity_relevance(text)
            .ranked(top_k)
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Aggregate fragment similarities for a text into entity relevance.
    pub fn entity_relevance(&mut self, text: &str) -> EntityRelevance {
        self.ensure_fitted();

        let mut relevance = EntityRelevance::new();
        let query_vector = self.vectorizer.transform(text);
        if query_vector.is_empty() {
            return relevance;
        }

        for fragment in &self.fragments {
            if fragment.vector.is_empty() {
                continue;
            }
            let similarity = cosine_similarity(&query_vector, &fragment.vector);
            if similarity > self.config.relevance_threshold {
                relevance.add_hit(&fragment.entity_id, similarity);
            }
        }

        relevance
    }

    /// Fragments of an entity, at most `limit`.
    ///
    /// Grouped by kind (traits, goals, descriptions, appearances), insertion
    /// order within a kind. The result depends only on each kind's values, so
    /// an index rebuilt from a checkpoint yields the same fragments.
    pub fn fragments_for_entity(&self, entity_id: &str, limit: usize) -> Vec<&MemoryFragment> {
        let Some(positions) = self.by_entity.get(entity_id) else {
            return Vec::new();
        };
        let mut positions = positions.clone();
        positions.sort_by_key(|&p| (self.fragments[p].kind, p));
        positions
            .into_iter()
            .take(limit)
            .map(|p| &self.fragments[p])
            .collect()
    }

    /// Get a fragment by id.
    pub fn get(&self, id: &str) -> Option<&MemoryFragment> {
        self.by_id.get(id).map(|&p| &self.fragments[p])
    }

    /// All fragments in insertion order.
    pub fn fragments(&self) -> impl Iterator<Item = &MemoryFragment> {
        self.fragments.iter()
    }

    /// Ids of all entities with at least one fragment.
    pub fn entity_ids(&self) -> impl Iterator<Item = &String> {
        self.by_entity.keys()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Whether fragments were added since the last fit.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    /// Drop every fragment and the fitted model.
    pub fn clear(&mut self) {
        let config = self.config.clone();
        *self = Self::with_config(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn harry_and_hermione() -> MemoryIndex {
        let mut index = MemoryIndex::new();
        index.add_character_memories(
            "char_harry",
            "哈利",
            &strings(&["勇敢", "冲动", "忠诚"]),
            &strings(&["打败伏地魔", "保护朋友"]),
            &strings(&["年轻的巫师"]),
            &strings(&["黑色头发", "额头有闪电伤疤"]),
            &FragmentMetadata::for_chapter(1),
        );
        index.add_character_memories(
            "char_hermione",
            "赫敏",
            &strings(&["聪明", "勤奋"]),
            &strings(&["成为优秀的巫师"]),
            &strings(&["麻瓜出身"]),
            &strings(&["棕色卷发"]),
            &FragmentMetadata::for_chapter(1),
        );
        index
    }

    #[test]
    fn test_add_character_memories() {
        let index = harry_and_hermione();

        assert_eq!(index.len(), 13);
        assert!(index.is_dirty());
        assert!(index.get("char_harry_trait_0").is_some());
        assert!(index.get("char_harry_app_1").is_some());
        assert_eq!(index.fragments_for_entity("char_hermione", 10).len(), 5);
    }

    #[test]
    fn test_repeated_additions_get_fresh_ids() {
        let mut index = MemoryIndex::new();
        let meta = FragmentMetadata::default();
        index.add_character_memories("c", "C", &strings(&["a"]), &[], &[], &[], &meta);
        index.add_character_memories("c", "C", &strings(&["b"]), &[], &[], &[], &meta);

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("c_trait_1").map(|f| f.value.as_str()), Some("b"));
    }

    #[test]
    fn test_add_fragment_replaces_same_id() {
        let mut index = MemoryIndex::new();
        index.add_fragment(MemoryFragment::new("f1", "a", "A", FragmentKind::Trait, "old"));
        index.add_fragment(MemoryFragment::new("f1", "a", "A", FragmentKind::Trait, "new"));

        assert_eq!(index.len(), 1);
        assert_eq!(index.get("f1").map(|f| f.value.as_str()), Some("new"));
    }

    #[test]
    fn test_search_ranks_matching_fragment_first() {
        let mut index = harry_and_hermione();

        let hits = index.search("勇敢的少年", 3, None);

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].fragment_id, "char_harry_trait_0");
        assert!(hits[0].score >= hits[1].score);
        assert!(!index.is_dirty());
    }

    #[test]
    fn test_search_with_entity_filter() {
        let mut index = harry_and_hermione();
        let filter = strings(&["char_hermione"]);

        let hits = index.search("巫师", 10, Some(&filter));

        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| h.entity_id == "char_hermione"));
    }

    #[test]
    fn test_empty_filter_means_no_filter() {
        let mut index = harry_and_hermione();

        let unfiltered = index.search("巫师", 10, None);
        let filtered = index.search("巫师", 10, Some(&[]));

        assert!(!filtered.is_empty());
        assert_eq!(filtered, unfiltered);
    }

    #[test]
    fn test_entity_fragments_grouped_by_kind() {
        let mut index = MemoryIndex::new();
        let meta = FragmentMetadata::default();
        index.add_character_memories("c", "C", &strings(&["brave"]), &strings(&["win the cup"]), &[], &[], &meta);
        index.add_character_memories("c", "C", &strings(&["loyal", "stubborn"]), &[], &[], &[], &meta);

        let values: Vec<&str> = index
            .fragments_for_entity("c", 10)
            .iter()
            .map(|f| f.value.as_str())
            .collect();
        assert_eq!(values, ["brave", "loyal", "stubborn", "win the cup"]);

        let capped: Vec<FragmentKind> = index.fragments_for_entity("c", 2).iter().map(|f| f.kind).collect();
        assert_eq!(capped, [FragmentKind::Trait, FragmentKind::Trait]);
        assert!(index.fragments_for_entity("unknown", 5).is_empty());
    }

    #[test]
    fn test_search_ties_keep_insertion_order() {
        let mut index = MemoryIndex::new();
        index.add_fragment(MemoryFragment::new("first", "a", "X", FragmentKind::Trait, "q"));
        index.add_fragment(MemoryFragment::new("second", "b", "X", FragmentKind::Trait, "q"));

        let hits = index.search("q", 2, None);
        assert_eq!(hits[0].fragment_id, "first");
        assert_eq!(hits[1].fragment_id, "second");
        assert!((hits[0].score - hits[1].score).abs() < 1e-12);
    }

    #[test]
    fn test_empty_corpus_and_unknown_query() {
        let mut empty = MemoryIndex::new();
        assert!(empty.search("anything", 5, None).is_empty());
        assert!(empty.rank_entities("anything", 5).is_empty());

        let mut index = harry_and_hermione();
        assert!(index.search("", 5, None).is_empty());
        assert!(index.search("？！…", 5, None).is_empty());
        assert!(index.rank_entities("", 5).is_empty());
    }

    #[test]
    fn test_rank_entities() {
        let mut index = harry_and_hermione();

        let ranked = index.rank_entities("哈利拔出宝剑，勇敢地与怪物战斗", 5);
        assert_eq!(ranked.first().map(String::as_str), Some("char_harry"));

        let ranked = index.rank_entities("赫敏非常聪明又勤奋", 1);
        assert_eq!(ranked, vec!["char_hermione".to_string()]);
    }

    #[test]
    fn test_rank_entities_latin_traits() {
        let mut index = MemoryIndex::new();
        index.add_character_memories(
            "char_1",
            "A",
            &strings(&["brave", "loyal"]),
            &[],
            &[],
            &[],
            &FragmentMetadata::default(),
        );

        let ranked = index.rank_entities("The knight was brave beyond measure", 3);
        assert!(ranked.contains(&"char_1".to_string()));
    }

    #[test]
    fn test_refit_after_new_fragments() {
        let mut index = harry_and_hermione();
        index.search("勇敢", 1, None);
        let before = index.vectorizer().document_count();

        index.add_fragment(MemoryFragment::new("x", "char_ron", "罗恩", FragmentKind::Trait, "红头发"));
        assert!(index.is_dirty());

        let hits = index.search("红头发", 1, None);
        assert_eq!(hits[0].entity_id, "char_ron");
        assert_eq!(index.vectorizer().document_count(), before + 1);
    }

    #[test]
    fn test_clear_keeps_config() {
        let mut index = MemoryIndex::with_config(RetrievalConfig {
            relevance_threshold: 0.3,
            max_characters: 2,
        });
        index.add_fragment(MemoryFragment::new("f", "a", "A", FragmentKind::Goal, "x"));
        index.clear();

        assert!(index.is_empty());
        assert_eq!(index.config().max_characters, 2);
    }
}
