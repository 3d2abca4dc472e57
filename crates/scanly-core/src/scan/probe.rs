//! Media duration probing used as a pre-filter.

use crate::config::ScanConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tracing::debug;

/// Reports a media file's duration. `None` means unknown.
#[async_trait]
pub trait DurationProbe: Send + Sync {
    async fn duration(&self, path: &Path) -> Option<Duration>;
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    duration: Option<String>,
}

/// Parse `ffprobe -of json` output into a duration.
fn parse_duration(stdout: &[u8]) -> Option<Duration> {
    let output: ProbeOutput = serde_json::from_slice(stdout).ok()?;
    let seconds: f64 = output.format?.duration?.trim().parse().ok()?;
    (seconds.is_finite() && seconds >= 0.0).then(|| Duration::from_secs_f64(seconds))
}

/// Probe backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: PathBuf,
    timeout: Duration,
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(&config.ffprobe_path, crate::config::ScanDefaults::PROBE_TIMEOUT)
    }
}

#[async_trait]
impl DurationProbe for FfprobeProbe {
    async fn duration(&self, path: &Path) -> Option<Duration> {
        let child = tokio::process::Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) if output.status.success() => output,
            Ok(Ok(output)) => {
                debug!("ffprobe exited with {} for {}", output.status, path.display());
                return None;
            }
            Ok(Err(e)) => {
                debug!("ffprobe could not run for {}: {}", path.display(), e);
                return None;
            }
            Err(_) => {
                debug!("ffprobe timed out for {}", path.display());
                return None;
            }
        };
        parse_duration(&output.stdout)
    }
}
