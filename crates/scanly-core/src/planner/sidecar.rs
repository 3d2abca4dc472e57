//! Sidecar records written next to unmatched files.

use crate::analyzer::FilenameAnalysis;
use crate::enrich::FilenameHint;
use crate::error::Result;
use crate::models::{DestinationPlan, MediaCandidate, ScoredMatch};
use crate::state::atomic_write_json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything known about a file that could not be matched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedSidecar {
    pub source: PathBuf,
    pub raw_filename: String,
    pub analysis: FilenameAnalysis,
    pub candidate: MediaCandidate,
    pub hint: Option<FilenameHint>,
    pub candidates: Vec<ScoredMatch>,
    pub best_score: Option<f64>,
    pub written_at: DateTime<Utc>,
}

impl UnmatchedSidecar {
    pub fn new(
        source: &Path,
        analysis: FilenameAnalysis,
        candidate: MediaCandidate,
        hint: Option<FilenameHint>,
        candidates: Vec<ScoredMatch>,
    ) -> Self {
        let best_score = candidates
            .iter()
            .map(ScoredMatch::score)
            .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))));
        Self {
            source: source.to_path_buf(),
            raw_filename: analysis.raw.clone(),
            analysis,
            candidate,
            hint,
            candidates,
            best_score,
            written_at: Utc::now(),
        }
    }
}

/// `{unmatched root}/{source stem}.json` for an unmatched plan.
pub fn sidecar_path(plan: &DestinationPlan) -> PathBuf {
    plan.destination_path.with_extension("json")
}

/// Write a sidecar atomically.
pub fn write_sidecar(path: &Path, sidecar: &UnmatchedSidecar) -> Result<()> {
    atomic_write_json(path, sidecar, false)?;
    info!("Wrote unmatched sidecar {}", path.display());
    Ok(())
}
