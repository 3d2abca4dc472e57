//! Destination planning.
//!
//! Movies land in `{movies}/Title (Year)/Title (Year).ext`; episodic items in
//! `{shows}/Title (Year)/Season NN/Title - SNNENN.ext`. Anything without an
//! accepted match is routed to the unmatched root under its original name.

mod naming;
mod sidecar;

pub use naming::{safe_component, safe_component_or};
pub use sidecar::{sidecar_path, write_sidecar, UnmatchedSidecar};

use crate::config::ScanConfig;
use crate::models::{DestinationPlan, MediaCandidate, MediaType, MetadataMatch, TitleKind};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Builds destination paths under the configured library roots.
#[derive(Debug, Clone)]
pub struct DestinationPlanner {
    movies_dir: PathBuf,
    shows_dir: PathBuf,
    unmatched_dir: PathBuf,
}

impl DestinationPlanner {
    pub fn new(
        movies_dir: impl Into<PathBuf>,
        shows_dir: impl Into<PathBuf>,
        unmatched_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            movies_dir: movies_dir.into(),
            shows_dir: shows_dir.into(),
            unmatched_dir: unmatched_dir.into(),
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(&config.movies_dir, &config.shows_dir, &config.unmatched_dir)
    }

    /// Plan the destination for `source`. `matched` is the accepted match, if any.
    pub fn plan(
        &self,
        source: &Path,
        candidate: &MediaCandidate,
        matched: Option<&MetadataMatch>,
    ) -> DestinationPlan {
        let Some(matched) = matched else {
            return self.plan_unmatched(source);
        };

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = source
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let title = safe_component_or(&matched.title, &stem);
        let year = matched.year.or(candidate.year_hint);
        let base = match year {
            Some(year) => format!("{title} ({year})"),
            None => title.clone(),
        };

        let episodic = matched.kind == TitleKind::Show || candidate.has_episode_markers();
        let plan = if episodic {
            let season = candidate.season().unwrap_or(1);
            let episode = candidate.episode().unwrap_or(1);
            let season_dir = format!("Season {season:02}");
            let file_name = format!("{title} - S{season:02}E{episode:02}{ext}");
            let media_type = if candidate.media_type() == MediaType::Anime {
                MediaType::Anime
            } else {
                MediaType::Show
            };
            DestinationPlan {
                source_path: source.to_path_buf(),
                destination_path: self.shows_dir.join(&base).join(&season_dir).join(&file_name),
                canonical_name: format!("{base}/{season_dir}/{file_name}"),
                media_type,
            }
        } else {
            DestinationPlan {
                source_path: source.to_path_buf(),
                destination_path: self.movies_dir.join(&base).join(format!("{base}{ext}")),
                canonical_name: base,
                media_type: MediaType::Movie,
            }
        };

        debug!(
            "Planned {} -> {}",
            source.display(),
            plan.destination_path.display()
        );
        plan
    }

    fn plan_unmatched(&self, source: &Path) -> DestinationPlan {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        let canonical_name = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.clone());
        DestinationPlan {
            source_path: source.to_path_buf(),
            destination_path: self.unmatched_dir.join(&file_name),
            canonical_name,
            media_type: MediaType::Unmatched,
        }
    }
}
