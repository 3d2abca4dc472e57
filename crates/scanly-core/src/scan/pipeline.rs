//! The per-file pipeline.
//!
//! One file moves through `Analyzing -> Resolving -> Deciding -> Linking ->
//! Done`. `Skipped` and `Errored` absorb it from any stage. Errors never leave
//! [`FilePipeline::process`]; they become a [`FileOutcome`].

use super::probe::DurationProbe;
use crate::analyzer::analyze;
use crate::config::ScanConfig;
use crate::enrich::{merge_hint, HintEnricher};
use crate::error::{Result, ScanlyError};
use crate::link::{LinkKind, LinkManager, LinkOutcome};
use crate::matching::CandidateResolver;
use crate::models::MediaType;
use crate::planner::{sidecar_path, write_sidecar, DestinationPlanner, UnmatchedSidecar};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Stage a file is in while it moves through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStage {
    Analyzing,
    Resolving,
    Deciding,
    Linking,
    Done,
    Skipped,
    Errored,
}

impl fmt::Display for FileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileStage::Analyzing => "analyzing",
            FileStage::Resolving => "resolving",
            FileStage::Deciding => "deciding",
            FileStage::Linking => "linking",
            FileStage::Done => "done",
            FileStage::Skipped => "skipped",
            FileStage::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Terminal result of processing one file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// Below the size or duration minimum.
    Unsupported { reason: String },
    /// No accepted match; a sidecar was written (or would be, in dry-run).
    Unmatched { sidecar: PathBuf },
    Linked {
        destination: PathBuf,
        kind: LinkKind,
        media_type: MediaType,
    },
    AlreadyLinked {
        destination: PathBuf,
        media_type: MediaType,
    },
    /// Dry-run: the link that would have been created.
    Planned { destination: PathBuf },
    /// The file disappeared while being processed.
    Vanished,
    Failed { stage: FileStage, error: String },
}

impl FileOutcome {
    /// Whether the file's modification time should be recorded as processed.
    ///
    /// Failures and vanished files are left out so they are retried.
    pub fn updates_state(&self) -> bool {
        matches!(
            self,
            FileOutcome::Unsupported { .. }
                | FileOutcome::Unmatched { .. }
                | FileOutcome::Linked { .. }
                | FileOutcome::AlreadyLinked { .. }
        )
    }

    /// Absorbing stage the file ended in.
    pub fn stage(&self) -> FileStage {
        match self {
            FileOutcome::Unsupported { .. } | FileOutcome::Vanished => FileStage::Skipped,
            FileOutcome::Failed { .. } => FileStage::Errored,
            _ => FileStage::Done,
        }
    }
}

/// Single pipeline parameterized by its collaborators.
pub struct FilePipeline {
    resolver: CandidateResolver,
    planner: DestinationPlanner,
    linker: LinkManager,
    enricher: Option<HintEnricher>,
    probe: Option<Box<dyn DurationProbe>>,
    min_size_bytes: u64,
    min_duration: Duration,
    dry_run: bool,
}

impl FilePipeline {
    pub fn new(config: &ScanConfig, resolver: CandidateResolver) -> Self {
        Self {
            resolver,
            planner: DestinationPlanner::from_config(config),
            linker: LinkManager::new(),
            enricher: None,
            probe: None,
            min_size_bytes: config.min_size_bytes,
            min_duration: config.min_duration,
            dry_run: config.dry_run,
        }
    }

    pub fn with_enricher(mut self, enricher: HintEnricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn with_probe(mut self, probe: Box<dyn DurationProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn enricher(&self) -> Option<&HintEnricher> {
        self.enricher.as_ref()
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Process one file of `size` bytes to a terminal outcome.
    pub async fn process(&self, path: &Path, size: u64) -> FileOutcome {
        let mut stage = FileStage::Analyzing;
        match self.run(path, size, &mut stage).await {
            Ok(outcome) => outcome,
            Err(ScanlyError::FileVanished(p)) => {
                debug!("{} vanished while {}", p.display(), stage);
                FileOutcome::Vanished
            }
            Err(e) => {
                warn!("Failed {} while {}: {}", path.display(), stage, e);
                FileOutcome::Failed {
                    stage,
                    error: e.to_string(),
                }
            }
        }
    }

    async fn run(&self, path: &Path, size: u64, stage: &mut FileStage) -> Result<FileOutcome> {
        if let Some(reason) = self.unsupported_reason(path, size).await {
            debug!("Skipping {}: {}", path.display(), reason);
            return Ok(FileOutcome::Unsupported { reason });
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let analysis = analyze(&filename, &parent);
        let hint = match &self.enricher {
            Some(enricher) => enricher.enrich(&filename, &parent).await,
            None => None,
        };
        let candidate = merge_hint(&analysis, hint.as_ref());
        debug!(
            "Analyzed '{}': {} '{}' year={:?} S{:?}E{:?}",
            filename,
            candidate.media_type(),
            candidate.query,
            candidate.year_hint,
            candidate.season(),
            candidate.episode()
        );

        *stage = FileStage::Resolving;
        let resolution = self.resolver.resolve(&candidate, &analysis.folder_hint).await?;

        *stage = FileStage::Deciding;
        let accepted = resolution.accepted();
        if let Some(scored) = accepted {
            if scored.verdict.warn {
                warn!(
                    "Loose match for '{}': '{}' ({:.1}, year agrees)",
                    filename,
                    scored.matched.title,
                    scored.score()
                );
            }
        }
        let plan = self
            .planner
            .plan(path, &candidate, accepted.map(|scored| &scored.matched));

        if plan.is_unmatched() {
            let sidecar = sidecar_path(&plan);
            if self.dry_run {
                info!("Dry-run: would write unmatched sidecar {}", sidecar.display());
            } else {
                let record =
                    UnmatchedSidecar::new(path, analysis, candidate, hint, resolution.considered);
                write_sidecar(&sidecar, &record)?;
            }
            warn!("Unmatched: {}", filename);
            return Ok(FileOutcome::Unmatched { sidecar });
        }

        if self.dry_run {
            info!(
                "Dry-run: would link {} -> {}",
                filename,
                plan.destination_path.display()
            );
            return Ok(FileOutcome::Planned {
                destination: plan.destination_path,
            });
        }

        *stage = FileStage::Linking;
        let outcome = match self.linker.link(&plan)? {
            LinkOutcome::Created { path, kind } => FileOutcome::Linked {
                destination: path,
                kind,
                media_type: plan.media_type,
            },
            LinkOutcome::AlreadyLinked { path } => FileOutcome::AlreadyLinked {
                destination: path,
                media_type: plan.media_type,
            },
        };
        *stage = FileStage::Done;
        Ok(outcome)
    }

    /// Size and duration pre-filter. A failed probe never excludes a file.
    async fn unsupported_reason(&self, path: &Path, size: u64) -> Option<String> {
        if size < self.min_size_bytes {
            return Some(format!(
                "size {} bytes is below the {} byte minimum",
                size, self.min_size_bytes
            ));
        }
        if self.min_duration.is_zero() {
            return None;
        }
        let duration = self.probe.as_ref()?.duration(path).await?;
        (duration < self.min_duration).then(|| {
            format!(
                "duration {:.0}s is below the {}s minimum",
                duration.as_secs_f64(),
                self.min_duration.as_secs()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedProbe(Option<Duration>);

    #[async_trait]
    impl DurationProbe for FixedProbe {
        async fn duration(&self, _path: &Path) -> Option<Duration> {
            self.0
        }
    }

    fn pipeline(min_size: u64, probe: Option<Duration>) -> FilePipeline {
        let vars = [
            ("SOURCE_DIR", "/in"),
            ("DEST_MOVIES_DIR", "/lib/movies"),
            ("DEST_SHOWS_DIR", "/lib/shows"),
            ("DEST_UNMATCHED_DIR", "/lib/unmatched"),
            ("MIN_DURATION_SECONDS", "600"),
        ];
        let mut config = ScanConfig::from_lookup(|key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .unwrap();
        config.min_size_bytes = min_size;
        config.dry_run = true;
        FilePipeline::new(&config, CandidateResolver::new())
            .with_probe(Box::new(FixedProbe(probe)))
    }

    #[test]
    fn test_state_contract() {
        assert!(FileOutcome::Unsupported { reason: String::new() }.updates_state());
        assert!(FileOutcome::Unmatched { sidecar: PathBuf::new() }.updates_state());
        assert!(!FileOutcome::Vanished.updates_state());
        assert!(!FileOutcome::Planned { destination: PathBuf::new() }.updates_state());
        let failed = FileOutcome::Failed {
            stage: FileStage::Linking,
            error: "boom".into(),
        };
        assert!(!failed.updates_state());
        assert_eq!(failed.stage(), FileStage::Errored);
    }

    #[tokio::test]
    async fn test_small_file_is_unsupported() {
        let outcome = pipeline(1024, None).process(Path::new("/in/Heat.1995.mkv"), 10).await;
        assert!(matches!(outcome, FileOutcome::Unsupported { .. }));
        assert_eq!(outcome.stage(), FileStage::Skipped);
    }

    #[tokio::test]
    async fn test_short_duration_is_unsupported() {
        let outcome = pipeline(0, Some(Duration::from_secs(30)))
            .process(Path::new("/in/Heat.1995.mkv"), 10)
            .await;
        assert!(matches!(outcome, FileOutcome::Unsupported { .. }));
    }

    #[tokio::test]
    async fn test_unknown_duration_is_processed() {
        let outcome = pipeline(0, None).process(Path::new("/in/Heat.1995.mkv"), 10).await;
        assert_eq!(
            outcome,
            FileOutcome::Unmatched {
                sidecar: PathBuf::from("/lib/unmatched/Heat.1995.json")
            }
        );
    }
}
