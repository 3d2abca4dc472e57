//! Title matching: similarity scoring and candidate resolution.

pub mod resolver;
pub mod similarity;

pub use resolver::{CandidateResolver, Resolution};
pub use similarity::{evaluate, normalize, score, token_sort_ratio, verdict, ScoreContext};
