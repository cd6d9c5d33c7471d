//! # Narrative Core
//!
//! Cross-chunk memory for long narrative text. This crate consumes the chunks
//! produced by `novel_text`, accumulates what an extractor reports about each
//! character, and surfaces only the relevant slice of that memory for the next
//! chunk.
//!
//! ## Core Components
//!
//! - **memory**: Entity memories, their merge rule, global context and checkpoints
//! - **retrieval**: TF-IDF vectors over memory fragments and entity ranking
//! - **context_assembler**: Renders retrieved fragments into a bounded digest
//! - **extraction**: The extractor capability, its records and retry policy
//! - **pipeline**: Processes chunks in order against a shared memory bank
//!
//! ## Design Philosophy
//!
//! - **Single writer**: Every store is a plain owned value mutated through `&mut`
//! - **Bounded context**: What reaches a prompt is capped regardless of memory size
//! - **Lenient at the edges**: Missing markers, fields or JSON degrade instead of failing

pub mod config;
pub mod context_assembler;
pub mod error;
pub mod extraction;
pub mod memory;
pub mod pipeline;
pub mod retrieval;

pub use config::*;
pub use context_assembler::*;
pub use error::*;
pub use extraction::*;
pub use memory::*;
pub use pipeline::*;
pub use retrieval::*;
