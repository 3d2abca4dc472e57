//! Data models shared across the pipeline.
//!
//! These values are created per file and never shared between files.

mod candidate;
mod matching;
mod plan;

pub use candidate::*;
pub use matching::*;
pub use plan::*;
