//! # Novel Text
//!
//! The source-text crate - decodes long-form narrative files and cuts them into
//! bounded chunks. This crate knows nothing about characters or memory; it is the
//! single source of truth for how a text is split.
//!
//! ## Core Components
//!
//! - **source**: Encoding-aware decoding of raw source files
//! - **segmenter**: Chapter boundary detection with a fixed-size fallback
//! - **window**: Local continuity windows over neighbouring chunks

pub mod chunk;
pub mod error;
pub mod segmenter;
pub mod source;
pub mod window;

pub use chunk::*;
pub use error::*;
pub use segmenter::*;
pub use source::*;
pub use window::*;
