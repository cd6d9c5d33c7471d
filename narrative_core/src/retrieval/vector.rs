//! Sparse term-weight vectors and cosine similarity.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A sparse vector keyed by term. Zero weights are never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    weights: HashMap<String, f64>,
}

impl SparseVector {
    /// Create an empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the weight of a term. Zero removes the term.
    pub fn insert(&mut self, term: impl Into<String>, weight: f64) {
        let term = term.into();
        if weight == 0.0 {
            self.weights.remove(&term);
        } else {
            self.weights.insert(term, weight);
        }
    }

    /// Get the weight of a term (zero when absent).
    pub fn get(&self, term: &str) -> f64 {
        self.weights.get(term).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.weights.contains_key(term)
    }

    /// Number of nonzero dimensions.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Euclidean norm over all dimensions.
    pub fn norm(&self) -> f64 {
        self.weights.values().map(|w| w * w).sum::<f64>().sqrt()
    }

    /// Iterate over all term weights.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.weights.iter()
    }
}

impl FromIterator<(String, f64)> for SparseVector {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut vector = SparseVector::new();
        for (term, weight) in iter {
            vector.insert(term, weight);
        }
        vector
    }
}

/// Cosine similarity of two sparse vectors.
///
/// The dot product runs over shared dimensions only and is divided by the
/// product of both full norms. Returns 0 when either norm is 0 or the vectors
/// share no dimension.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let mut overlap = false;
    let mut dot = 0.0;
    for (term, weight) in small.iter() {
        if let Some(other) = large.weights.get(term) {
            overlap = true;
            dot += weight * other;
        }
    }
    if !overlap {
        return 0.0;
    }

    let norms = a.norm() * b.norm();
    if norms == 0.0 {
        return 0.0;
    }
    dot / norms
}
