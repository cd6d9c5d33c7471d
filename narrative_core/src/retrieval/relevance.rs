//! Entity relevance accumulated from fragment similarities.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
struct RelevanceEntry {
    entity_id: String,
    similarity_sum: f64,
    hits: u32,
}

/// Accumulates fragment-level similarity hits into entity-level scores.
///
/// The final score of an entity is `similarity_sum / ln(hits + 2)`, which
/// damps entities that only match through many weakly relevant fragments.
#[derive(Debug, Clone, Default)]
pub struct EntityRelevance {
    /// Entries in order of each entity's first hit.
    entries: Vec<RelevanceEntry>,
    positions: HashMap<String, usize>,
}

impl EntityRelevance {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one fragment hit for an entity.
    pub fn add_hit(&mut self, entity_id: &str, similarity: f64) {
        let position = match self.positions.get(entity_id) {
            Some(&position) => position,
            None => {
                self.entries.push(RelevanceEntry {
                    entity_id: entity_id.to_string(),
                    similarity_sum: 0.0,
                    hits: 0,
                });
                self.positions.insert(entity_id.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[position];
        entry.similarity_sum += similarity;
        entry.hits += 1;
    }

    /// Sum of recorded similarities for an entity.
    pub fn similarity_sum(&self, entity_id: &str) -> f64 {
        self.entry(entity_id).map(|e| e.similarity_sum).unwrap_or(0.0)
    }

    /// Number of recorded hits for an entity.
    pub fn hits(&self, entity_id: &str) -> u32 {
        self.entry(entity_id).map(|e| e.hits).unwrap_or(0)
    }

    /// Damped score of an entity (zero when it has no hits).
    pub fn score(&self, entity_id: &str) -> f64 {
        self.entry(entity_id).map(damped_score).unwrap_or(0.0)
    }

    /// Entities by descending score, ties kept in first-hit order.
    pub fn ranked(&self, top_k: usize) -> Vec<(String, f64)> {
        let mut scored: Vec<_> = self
            .entries
            .iter()
            .map(|e| (e.entity_id.clone(), damped_score(e)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }

    /// Number of entities with at least one hit.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, entity_id: &str) -> Option<&RelevanceEntry> {
        self.positions.get(entity_id).map(|&i| &self.entries[i])
    }
}

fn damped_score(entry: &RelevanceEntry) -> f64 {
    entry.similarity_sum / (entry.hits as f64 + 2.0).ln()
}
