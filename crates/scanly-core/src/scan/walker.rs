//! Source root selection and file enumeration.

use crate::config::ScanConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// The first existing source root: the primary, else fallbacks in order.
pub fn select_root(config: &ScanConfig) -> Option<PathBuf> {
    let root = config.source_roots().find(|root| root.is_dir()).map(Path::to_path_buf);
    match &root {
        Some(root) if root != &config.source_dir => {
            warn!(
                "{} is unavailable, scanning fallback {}",
                config.source_dir.display(),
                root.display()
            );
        }
        Some(_) => {}
        None => warn!("No source root exists"),
    }
    root
}

/// Regular files under `root` with an allowed extension, in path order.
///
/// Symlinks are not followed, and destination roots nested under `root` are skipped.
pub fn enumerate(root: &Path, config: &ScanConfig) -> Vec<PathBuf> {
    let destinations = [&config.movies_dir, &config.shows_dir, &config.unmatched_dir];

    let files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let is_destination = destinations.iter().any(|d| entry.path() == d.as_path());
            !(entry.file_type().is_dir() && is_destination)
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| config.is_allowed_extension(path))
        .collect();

    debug!("Enumerated {} candidate files under {}", files.len(), root.display());
    files
}
