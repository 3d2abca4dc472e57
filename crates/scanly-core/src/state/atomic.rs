//! Atomic file operations for safe JSON persistence.
//!
//! Writes go to a temp file with a unique PID+TID suffix, are validated and
//! fsynced, optionally back up the previous file, and are then renamed over
//! the target.

use crate::error::{Result, ScanlyError};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use tracing::{debug, warn};

/// Read and parse a JSON file.
///
/// Returns `None` if the file doesn't exist, or an error if parsing fails.
pub fn atomic_read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ScanlyError::Io {
                message: format!("Failed to open {}", path.display()),
                path: Some(path.to_path_buf()),
                source: Some(e),
            })
        }
    };

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| ScanlyError::Io {
            message: format!("Failed to read {}", path.display()),
            path: Some(path.to_path_buf()),
            source: Some(e),
        })?;

    let data: T = serde_json::from_str(&contents).map_err(|e| ScanlyError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;

    Ok(Some(data))
}

/// Backup path used by [`atomic_write_json`].
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}

/// Write data to a JSON file atomically.
///
/// 1. Serializes data to a temp file with PID+TID suffix
/// 2. Validates the JSON by re-parsing
/// 3. Syncs the temp file to disk
/// 4. Optionally copies the current file to `<name>.bak`
/// 5. Renames the temp file over the target
pub fn atomic_write_json<T: Serialize + ?Sized>(
    path: &Path,
    data: &T,
    keep_backup: bool,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| ScanlyError::Io {
                message: format!("Failed to create directory {}", parent.display()),
                path: Some(parent.to_path_buf()),
                source: Some(e),
            })?;
        }
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(format!(".{}.{}.tmp", process::id(), thread_id()));
    let temp_path = path.with_file_name(temp_name);

    let serialized = serde_json::to_string_pretty(data).map_err(|e| ScanlyError::Json {
        message: format!("Failed to serialize data: {}", e),
        source: Some(e),
    })?;

    serde_json::from_str::<serde_json::Value>(&serialized).map_err(|e| ScanlyError::Json {
        message: format!("JSON validation failed: {}", e),
        source: Some(e),
    })?;

    let write_result = (|| -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(serialized.as_bytes())?;
        file.flush()?;
        file.sync_all()
    })();
    if let Err(e) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(ScanlyError::Io {
            message: format!("Failed to write temp file {}", temp_path.display()),
            path: Some(temp_path),
            source: Some(e),
        });
    }

    if keep_backup && path.exists() {
        let backup = backup_path(path);
        if let Err(e) = fs::copy(path, &backup) {
            warn!("Failed to create backup {}: {}", backup.display(), e);
        } else {
            debug!("Created backup: {}", backup.display());
        }
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(ScanlyError::Io {
            message: format!("Failed to rename {} to {}", temp_path.display(), path.display()),
            path: Some(path.to_path_buf()),
            source: Some(e),
        });
    }

    debug!("Atomically wrote {}", path.display());
    Ok(())
}

/// Numeric identifier for the current thread.
fn thread_id() -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    thread::current().id().hash(&mut hasher);
    hasher.finish()
}
