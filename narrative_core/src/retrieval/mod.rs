//! Retrieval - sparse TF-IDF vectors over memory fragments.
//!
//! Each attribute value of an entity becomes one [`MemoryFragment`]. The
//! [`MemoryIndex`] vectorizes fragments lazily and answers two kinds of
//! queries: fragment search and entity relevance ranking.

mod fragment;
mod index;
mod relevance;
mod vector;
mod vectorizer;

pub use fragment::*;
pub use index::*;
pub use relevance::*;
pub use vector::*;
pub use vectorizer::*;
