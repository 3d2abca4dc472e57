//! Provider matches and similarity verdicts.

use serde::{Deserialize, Serialize};

/// Shape of a title returned by a metadata provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleKind {
    Movie,
    Show,
}

/// Which tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    LocalCache,
    RemoteProvider,
}

/// A title returned by a metadata provider. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataMatch {
    pub provider_id: String,
    pub title: String,
    /// Title in the original language, when it differs from `title`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    pub year: Option<i32>,
    pub kind: TitleKind,
    pub source: MatchSource,
    /// Provider popularity, when the provider reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<f64>,
}

/// Why a score was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictReason {
    StrictAccept,
    LooseAcceptYearMatch,
    Rejected,
}

/// Outcome of scoring one candidate title.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityVerdict {
    pub score: f64,
    pub accepted: bool,
    pub warn: bool,
    pub reason: VerdictReason,
}

/// A match together with its verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    #[serde(rename = "match")]
    pub matched: MetadataMatch,
    pub verdict: SimilarityVerdict,
}

impl ScoredMatch {
    pub fn score(&self) -> f64 {
        self.verdict.score
    }
}
