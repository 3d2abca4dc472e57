//! Mapping of source path to last processed modification time.

use super::atomic::{atomic_read_json, atomic_write_json, backup_path};
use crate::error::{Result, ScanlyError};
use std::collections::{BTreeMap, HashSet};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};

/// Key under which a source path is recorded: its resolved absolute path.
pub fn state_key(path: &Path) -> String {
    let resolved = std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf());
    resolved.to_string_lossy().into_owned()
}

/// Modification time as float seconds since the Unix epoch.
pub fn modified_secs(path: &Path, metadata: &Metadata) -> Result<f64> {
    let modified = metadata
        .modified()
        .map_err(|e| ScanlyError::io_with_path(e, path))?;
    Ok(match modified.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    })
}

/// In-memory scan state backed by an atomically replaced JSON file.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    entries: BTreeMap<String, f64>,
}

impl StateStore {
    /// Load the state file, starting empty if it is missing.
    ///
    /// A corrupt file falls back to its `.bak` copy, and then to an empty state.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match atomic_read_json::<BTreeMap<String, f64>>(&path) {
            Ok(Some(entries)) => entries,
            Ok(None) => {
                debug!("No state file at {}, starting fresh", path.display());
                BTreeMap::new()
            }
            Err(e) => {
                warn!("State file {} is unreadable: {}", path.display(), e);
                match atomic_read_json::<BTreeMap<String, f64>>(&backup_path(&path)) {
                    Ok(Some(entries)) => {
                        info!("Recovered {} entries from backup", entries.len());
                        entries
                    }
                    _ => BTreeMap::new(),
                }
            }
        };
        info!("Loaded {} state entries from {}", entries.len(), path.display());
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.get(key).copied()
    }

    /// Whether `key` was last processed at exactly `mtime`.
    pub fn is_unchanged(&self, key: &str, mtime: f64) -> bool {
        self.get(key) == Some(mtime)
    }

    pub fn record(&mut self, key: impl Into<String>, mtime: f64) {
        self.entries.insert(key.into(), mtime);
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn entries(&self) -> &BTreeMap<String, f64> {
        &self.entries
    }

    /// Drop entries under `root` that were not enumerated this pass and no
    /// longer exist. Entries outside `root` are kept. Returns how many were removed.
    pub fn prune_missing(&mut self, root: &Path, seen: &HashSet<String>) -> usize {
        let root = PathBuf::from(state_key(root));
        let before = self.entries.len();
        self.entries.retain(|key, _| {
            let path = Path::new(key);
            !path.starts_with(&root) || seen.contains(key) || path.exists()
        });
        let removed = before - self.entries.len();
        if removed > 0 {
            info!("Pruned {} stale state entries under {}", removed, root.display());
        }
        removed
    }

    /// Write the state file atomically, keeping the previous copy as `.bak`.
    pub fn persist(&self) -> Result<()> {
        atomic_write_json(&self.path, &self.entries, true)?;
        debug!("Persisted {} state entries", self.entries.len());
        Ok(())
    }
}
