//! Link creation for planned destinations.
//!
//! Links are created idempotently: a destination that already points at the
//! source is left alone, and an occupied destination gets a `" (n)"` suffix
//! before its extension.

use crate::error::{Result, ScanlyError};
use crate::models::DestinationPlan;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Mechanism used to create a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Symlink,
    Hardlink,
}

/// Result of a successful link call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    Created { path: PathBuf, kind: LinkKind },
    AlreadyLinked { path: PathBuf },
}

impl LinkOutcome {
    pub fn path(&self) -> &Path {
        match self {
            LinkOutcome::Created { path, .. } | LinkOutcome::AlreadyLinked { path } => path,
        }
    }
}

/// Creates destination links, symlink first with a hard link fallback.
#[derive(Debug, Clone, Default)]
pub struct LinkManager;

impl LinkManager {
    pub fn new() -> Self {
        Self
    }

    /// Link `plan.destination_path` (or a suffixed sibling) to `plan.source_path`.
    pub fn link(&self, plan: &DestinationPlan) -> Result<LinkOutcome> {
        let source = &plan.source_path;
        if !source.exists() {
            return Err(ScanlyError::FileVanished(source.clone()));
        }

        if let Some(parent) = plan.destination_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ScanlyError::io_with_path(e, parent))?;
        }

        let target = self.resolve_destination(source, &plan.destination_path)?;
        if target.already_linked {
            debug!("{} already links to {}", target.path.display(), source.display());
            return Ok(LinkOutcome::AlreadyLinked { path: target.path });
        }

        let link_source = fs::canonicalize(source).unwrap_or_else(|_| source.clone());
        let kind = create_link(&link_source, &target.path)?;
        info!(
            "Linked {} -> {} ({:?})",
            target.path.display(),
            source.display(),
            kind
        );
        Ok(LinkOutcome::Created {
            path: target.path,
            kind,
        })
    }

    /// First candidate that either already links to `source` or is free.
    fn resolve_destination(&self, source: &Path, destination: &Path) -> Result<Destination> {
        let mut counter = 0u32;
        loop {
            let candidate = renamed_path(destination, counter);
            match fs::symlink_metadata(&candidate) {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Ok(Destination {
                        path: candidate,
                        already_linked: false,
                    });
                }
                Err(e) => return Err(ScanlyError::io_with_path(e, &candidate)),
                Ok(_) if points_to(&candidate, source) => {
                    return Ok(Destination {
                        path: candidate,
                        already_linked: true,
                    });
                }
                Ok(_) => {
                    debug!("{} is occupied", candidate.display());
                }
            }
            counter += 1;
        }
    }
}

struct Destination {
    path: PathBuf,
    already_linked: bool,
}

/// `destination` for `counter == 0`, otherwise `stem (counter).ext`.
fn renamed_path(destination: &Path, counter: u32) -> PathBuf {
    if counter == 0 {
        return destination.to_path_buf();
    }
    let stem = destination
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let new_name = match destination.extension() {
        Some(ext) => format!("{} ({}).{}", stem, counter, ext.to_string_lossy()),
        None => format!("{} ({})", stem, counter),
    };
    destination.with_file_name(new_name)
}

/// Whether `candidate` already resolves to `source`.
fn points_to(candidate: &Path, source: &Path) -> bool {
    if let Ok(target) = fs::read_link(candidate) {
        let target = match candidate.parent() {
            Some(parent) if target.is_relative() => parent.join(target),
            _ => target,
        };
        if target == source {
            return true;
        }
    }

    match (fs::canonicalize(candidate), fs::canonicalize(source)) {
        (Ok(a), Ok(b)) if a == b => return true,
        _ => {}
    }

    same_inode(candidate, source)
}

#[cfg(unix)]
fn same_inode(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_inode(_a: &Path, _b: &Path) -> bool {
    false
}

fn create_link(source: &Path, target: &Path) -> Result<LinkKind> {
    #[cfg(unix)]
    let symlink_result = std::os::unix::fs::symlink(source, target);

    #[cfg(windows)]
    let symlink_result = std::os::windows::fs::symlink_file(source, target);

    match symlink_result {
        Ok(()) => return Ok(LinkKind::Symlink),
        Err(e) => warn!(
            "Symlink {} failed ({}), trying a hard link",
            target.display(),
            e
        ),
    }

    fs::hard_link(source, target)
        .map(|()| LinkKind::Hardlink)
        .map_err(|e| ScanlyError::LinkCreationFailure {
            src: source.to_path_buf(),
            dest: target.to_path_buf(),
            reason: e.to_string(),
        })
}
