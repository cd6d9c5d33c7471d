//! Memory - cross-chunk entity memory and story-wide context.
//!
//! - **entity**: per-character memory and its merge rule
//! - **global**: locations, relationships and plot points
//! - **checkpoint**: JSON persistence
//! - **bank**: the store tying memory to the retrieval index

mod bank;
mod checkpoint;
mod entity;
mod global;

pub use bank::*;
pub use checkpoint::*;
pub use entity::*;
pub use global::*;
