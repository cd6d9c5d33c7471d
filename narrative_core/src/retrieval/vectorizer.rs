//! TF-IDF vectorizer.
//!
//! Tokens are single characters plus CJK bigrams, which captures sub-word
//! signal in languages without whitespace-delimited words:
//! - every alphanumeric or CJK ideograph character, lower-cased, is a unigram
//! - every adjacent pair of CJK ideographs is a bigram
//!
//! IDF is smoothed: `ln((N + 1) / (df + 1)) + 1`, strictly positive and
//! non-increasing in document frequency.

use std::collections::{HashMap, HashSet};

use super::SparseVector;

/// Check whether a character lies in the CJK unified ideograph block.
pub fn is_cjk_ideograph(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Split text into unigram and CJK bigram tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();

    let mut tokens: Vec<String> = chars
        .iter()
        .filter(|c| is_cjk_ideograph(**c) || c.is_alphanumeric())
        .map(|c| c.to_lowercase().collect())
        .collect();

    tokens.extend(
        chars
            .windows(2)
            .filter(|pair| is_cjk_ideograph(pair[0]) && is_cjk_ideograph(pair[1]))
            .map(|pair| pair.iter().collect::<String>()),
    );

    tokens
}

/// Term-weighting model fitted over a corpus of documents.
#[derive(Debug, Clone, Default)]
pub struct TfidfVectorizer {
    /// Term -> dense index, sorted by term. Informational only.
    vocabulary: HashMap<String, usize>,

    /// Term -> inverse document frequency.
    idf: HashMap<String, f64>,

    document_count: usize,
}

impl TfidfVectorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild vocabulary and IDF weights from scratch over `documents`.
    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) -> &mut Self {
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let unique: HashSet<String> = tokenize(doc.as_ref()).into_iter().collect();
            for term in unique {
                *doc_freq.entry(term).or_default() += 1;
            }
        }

        let mut terms: Vec<&String> = doc_freq.keys().collect();
        terms.sort();
        self.vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(i, term)| (term.clone(), i))
            .collect();

        let n = documents.len() as f64;
        self.idf = doc_freq
            .into_iter()
            .map(|(term, df)| (term, smoothed_idf(n, df as f64)))
            .collect();
        self.document_count = documents.len();

        self
    }

    /// Vectorize a document against the fitted vocabulary.
    ///
    /// Term frequency is normalized by the document's token count. Tokens
    /// outside the vocabulary are dropped.
    pub fn transform(&self, document: &str) -> SparseVector {
        let tokens = tokenize(document);
        if tokens.is_empty() {
            return SparseVector::new();
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        for token in tokens.iter() {
            *counts.entry(token.clone()).or_default() += 1;
        }

        let total = tokens.len() as f64;
        counts
            .into_iter()
            .filter_map(|(term, count)| {
                let idf = *self.idf.get(&term)?;
                Some((term, count as f64 / total * idf))
            })
            .collect()
    }

    /// Fit over `documents` and vectorize each of them.
    pub fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> Vec<SparseVector> {
        self.fit(documents);
        documents
            .iter()
            .map(|doc| self.transform(doc.as_ref()))
            .collect()
    }

    /// IDF weight of a term, if it is in the vocabulary.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.idf.get(term).copied()
    }

    /// Dense index of a term, if it is in the vocabulary.
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Number of documents in the last fit.
    pub fn document_count(&self) -> usize {
        self.document_count
    }

    pub fn is_fitted(&self) -> bool {
        !self.vocabulary.is_empty()
    }
}

fn smoothed_idf(n: f64, df: f64) -> f64 {
    ((n + 1.0) / (df + 1.0)).ln() + 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::cosine_similarity;

    #[test]
    fn test_tokenize_latin() {
        let tokens = tokenize("Ab 1!");
        assert_eq!(tokens, vec!["a", "b", "1"]);
    }

    #[test]
    fn test_tokenize_cjk_bigrams() {
        let tokens = tokenize("勇敢的");
        assert_eq!(tokens, vec!["勇", "敢", "的", "勇敢", "敢的"]);
    }

    #[test]
    fn test_tokenize_bigrams_need_adjacent_ideographs() {
        let tokens = tokenize("勇，敢");
        assert_eq!(tokens, vec!["勇", "敢"]);
    }

    #[test]
    fn test_idf_formula() {
        let mut vectorizer = TfidfVectorizer::new();
        vectorizer.fit(&["ab", "a", "c"]);

        // N = 3; df(a) = 2, df(b) = 1
        let idf_a = vectorizer.idf("a").unwrap();
        let idf_b = vectorizer.idf("b").unwrap();
        assert!((idf_a - ((4.0f64 / 3.0).ln() + 1.0)).abs() < 1e-9);
        assert!((idf_b - ((4.0f64 / 2.0).ln() + 1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_idf_non_increasing_in_document_frequency() {
        let mut vectorizer = TfidfVectorizer::new();
        // df: x = 4, y = 2, z = 1
        vectorizer.fit(&["xyz", "xy", "x", "x"]);

        let x = vectorizer.idf("x").unwrap();
        let y = vectorizer.idf("y").unwrap();
        let z = vectorizer.idf("z").unwrap();
        assert!(x <= y && y <= z);
        assert!(x > 0.0);
    }

    #[test]
    fn test_vocabulary_is_sorted() {
        let mut vectorizer = TfidfVectorizer::new();
        vectorizer.fit(&["cab"]);
        assert_eq!(vectorizer.term_index("a"), Some(0));
        assert_eq!(vectorizer.term_index("b"), Some(1));
        assert_eq!(vectorizer.term_index("c"), Some(2));
        assert_eq!(vectorizer.vocabulary_len(), 3);
    }

    #[test]
    fn test_transform_tf_is_length_normalized() {
        let mut vectorizer = TfidfVectorizer::new();
        vectorizer.fit(&["aab", "c"]);

        let v = vectorizer.transform("aab");
        let idf_a = vectorizer.idf("a").unwrap();
        assert!((v.get("a") - 2.0 / 3.0 * idf_a).abs() < 1e-9);
    }

    #[test]
    fn test_transform_drops_unknown_terms() {
        let mut vectorizer = TfidfVectorizer::new();
        vectorizer.fit(&["abc"]);

        let v = vectorizer.transform("xyz");
        assert!(v.is_empty());

        let mixed = vectorizer.transform("ax");
        assert!(mixed.contains("a"));
        assert!(!mixed.contains("x"));
    }

    #[test]
    fn test_fit_transform_similarity() {
        let mut vectorizer = TfidfVectorizer::new();
        let vectors = vectorizer.fit_transform(&["哈利的特质：勇敢", "赫敏的特质：聪明"]);

        let query = vectorizer.transform("勇敢");
        assert!(cosine_similarity(&query, &vectors[0]) > cosine_similarity(&query, &vectors[1]));
    }

    #[test]
    fn test_refit_replaces_model() {
        let mut vectorizer = TfidfVectorizer::new();
        vectorizer.fit(&["abc"]);
        vectorizer.fit(&["xyz", "xy"]);

        assert!(vectorizer.idf("a").is_none());
        assert_eq!(vectorizer.document_count(), 2);
    }
}
