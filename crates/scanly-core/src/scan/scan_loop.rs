//! The outer scan loop and its pass summary.

use super::pipeline::{FileOutcome, FilePipeline};
use super::walker::{enumerate, select_root};
use crate::cancel::CancellationToken;
use crate::config::ScanConfig;
use crate::error::Result;
use crate::models::MediaType;
use crate::state::{atomic_write_json, modified_secs, state_key, StateStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Counters for one scan pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub root: Option<PathBuf>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// False when the pass was cut short by cancellation.
    pub completed: bool,
    pub scanned: usize,
    pub unchanged: usize,
    pub unsupported: usize,
    pub matched_movies: usize,
    pub matched_shows: usize,
    pub already_linked: usize,
    pub unmatched: usize,
    pub errors: usize,
    pub vanished: usize,
    pub planned: usize,
    pub pruned: usize,
}

impl ScanSummary {
    fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Unsupported { .. } => self.unsupported += 1,
            FileOutcome::Unmatched { .. } => self.unmatched += 1,
            FileOutcome::Linked {
                media_type: MediaType::Movie,
                ..
            } => self.matched_movies += 1,
            FileOutcome::Linked { .. } => self.matched_shows += 1,
            FileOutcome::AlreadyLinked { .. } => self.already_linked += 1,
            FileOutcome::Planned { .. } => self.planned += 1,
            FileOutcome::Vanished => self.vanished += 1,
            FileOutcome::Failed { .. } => self.errors += 1,
        }
    }

    /// Links created this pass.
    pub fn linked(&self) -> usize {
        self.matched_movies + self.matched_shows
    }
}

/// Drives passes over the source tree, one file at a time.
pub struct ScanLoop {
    config: ScanConfig,
    pipeline: FilePipeline,
    state: StateStore,
    cancel: CancellationToken,
}

impl ScanLoop {
    /// Create a loop, loading the state file named in `config`.
    pub fn new(config: ScanConfig, pipeline: FilePipeline, cancel: CancellationToken) -> Self {
        let state = StateStore::load(&config.state_file);
        Self {
            config,
            pipeline,
            state,
            cancel,
        }
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn pipeline(&self) -> &FilePipeline {
        &self.pipeline
    }

    /// Run a single pass and persist the state afterwards.
    ///
    /// Per-file failures are counted, not returned.
    pub async fn run_pass(&mut self) -> Result<ScanSummary> {
        let mut summary = ScanSummary {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        let Some(root) = select_root(&self.config) else {
            summary.completed = true;
            summary.finished_at = Some(Utc::now());
            return Ok(summary);
        };
        summary.root = Some(root.clone());
        info!("Scanning {}", root.display());

        let files = enumerate(&root, &self.config);
        let mut seen: HashSet<String> = HashSet::with_capacity(files.len());
        summary.completed = true;

        for path in files {
            if self.cancel.is_cancelled() {
                info!("Cancellation requested, stopping pass early");
                summary.completed = false;
                break;
            }

            let metadata = match std::fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("{} vanished before stat", path.display());
                    summary.vanished += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Cannot stat {}: {}", path.display(), e);
                    summary.errors += 1;
                    continue;
                }
            };

            let key = state_key(&path);
            seen.insert(key.clone());
            summary.scanned += 1;

            let mtime = match modified_secs(&path, &metadata) {
                Ok(mtime) => mtime,
                Err(e) => {
                    warn!("No modification time for {}: {}", path.display(), e);
                    summary.errors += 1;
                    continue;
                }
            };
            if self.state.is_unchanged(&key, mtime) {
                summary.unchanged += 1;
                continue;
            }

            let outcome = self.pipeline.process(&path, metadata.len()).await;
            summary.record(&outcome);
            if outcome.updates_state() && !self.config.dry_run {
                self.state.record(key, mtime);
            }
        }

        if summary.completed && self.config.prune_missing && !self.config.dry_run {
            summary.pruned = self.state.prune_missing(&root, &seen);
        }

        if !self.config.dry_run {
            if let Err(e) = self.state.persist() {
                error!("Failed to persist scan state: {}", e);
            }
        }
        summary.finished_at = Some(Utc::now());

        info!(
            "Pass complete: scanned={} unchanged={} movies={} shows={} already_linked={} \
             unmatched={} unsupported={} errors={} vanished={} planned={} pruned={}",
            summary.scanned,
            summary.unchanged,
            summary.matched_movies,
            summary.matched_shows,
            summary.already_linked,
            summary.unmatched,
            summary.unsupported,
            summary.errors,
            summary.vanished,
            summary.planned,
            summary.pruned
        );

        if let (Some(path), false) = (&self.config.summary_file, self.config.dry_run) {
            if let Err(e) = atomic_write_json(path, &summary, false) {
                warn!("Failed to write summary {}: {}", path.display(), e);
            }
        }

        Ok(summary)
    }

    /// Run passes until cancelled, sleeping `interval` between them.
    ///
    /// A cancelled pass still persists state before this returns.
    pub async fn run_forever(&mut self, interval: Duration) -> Result<()> {
        info!("Daemon mode, scanning every {:?}", interval);
        loop {
            self.run_pass().await?;
            if self.cancel.is_cancelled() || !self.cancel.sleep(interval).await {
                info!("Stopping scan loop");
                return Ok(());
            }
        }
    }
}
