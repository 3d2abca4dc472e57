//! Centralized configuration for Scanly.
//!
//! Compile-time constants live in the unit structs below. Runtime settings are
//! read from environment variables into [`ScanConfig`].

use crate::error::{Result, ScanlyError};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "scanly";
    pub const USER_AGENT: &'static str = "scanly";
    pub const STATE_FILE_NAME: &'static str = "state.json";
}

/// Thresholds and bonuses used when matching titles.
pub struct MatchConfig;

impl MatchConfig {
    /// Accept without a year match.
    pub const STRICT_ACCEPT_SCORE: f64 = 90.0;
    /// Accept (with a warning) only when the years agree.
    pub const LOOSE_ACCEPT_SCORE: f64 = 80.0;
    /// A local candidate above this score skips the remote tier.
    pub const DIRECT_ACCEPT_SCORE: f64 = 70.0;
    pub const MAX_SCORE: f64 = 100.0;
    pub const EPISODE_BONUS: f64 = 10.0;
    pub const YEAR_BONUS: f64 = 10.0;
    pub const FOLDER_HINT_BONUS: f64 = 5.0;
    pub const LOCAL_SEARCH_LIMIT: usize = 40;
    pub const MIN_YEAR: i32 = 1900;
    pub const MAX_YEAR: i32 = 2199;
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const TMDB_API_BASE: &'static str = "https://api.themoviedb.org/3";
    pub const TMDB_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    pub const TMDB_CACHE_TTL: Duration = Duration::from_secs(3600);
    pub const TMDB_CACHE_CAPACITY: u64 = 256;
    pub const HINT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    pub const HINT_CONNECT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);
    pub const HINT_SERVICE_START_ATTEMPTS: u32 = 10;
    pub const HINT_SERVICE_START_INTERVAL: Duration = Duration::from_secs(1);
    pub const OLLAMA_GENERATE_URL: &'static str = "http://localhost:11434/api/generate";
    pub const OLLAMA_DEFAULT_MODEL: &'static str = "gemma2:2b";
}

/// Defaults for the scan loop.
pub struct ScanDefaults;

impl ScanDefaults {
    pub const MIN_SIZE_BYTES: u64 = 100 * 1024 * 1024;
    pub const MIN_DURATION: Duration = Duration::from_secs(15 * 60);
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(15);
    pub const SCAN_INTERVAL: Duration = Duration::from_secs(60);
    /// Granularity of the cancellable sleep between daemon passes.
    pub const SLEEP_SLICE: Duration = Duration::from_millis(250);
    pub const ALLOWED_EXTENSIONS: &'static str = ".mp4,.mkv,.avi,.mov,.m4v,.ts,.wmv";
    pub const FFPROBE_BINARY: &'static str = "ffprobe";
}

/// Settings for the optional filename hint provider.
#[derive(Debug, Clone)]
pub struct HintConfig {
    pub enabled: bool,
    pub model: String,
    pub endpoint: Url,
    /// Explicit path to the `ollama` binary used to start the service.
    pub binary: Option<PathBuf>,
    pub timeout: Duration,
}

/// Runtime configuration for a scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub source_dir: PathBuf,
    pub fallback_source_dirs: Vec<PathBuf>,
    pub movies_dir: PathBuf,
    pub shows_dir: PathBuf,
    pub unmatched_dir: PathBuf,
    /// Lowercase suffixes including the leading dot.
    pub allowed_extensions: Vec<String>,
    pub state_file: PathBuf,
    pub summary_file: Option<PathBuf>,
    pub scan_interval: Duration,
    pub min_size_bytes: u64,
    pub min_duration: Duration,
    pub ffprobe_path: PathBuf,
    pub tmdb_api_key: Option<String>,
    pub tmdb_api_base: String,
    pub imdb_db_path: Option<PathBuf>,
    pub hint: HintConfig,
    pub prune_missing: bool,
    pub dry_run: bool,
}

impl ScanConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| -> Option<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| -> Result<PathBuf> {
            get(key)
                .map(PathBuf::from)
                .ok_or_else(|| ScanlyError::config(format!("{key} is required")))
        };

        let source_dir = required("SOURCE_DIR")?;
        let fallback_source_dirs = get("FALLBACK_SOURCE_DIRS")
            .map(|raw| {
                raw.split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default();

        let movies_dir = required("DEST_MOVIES_DIR")?;
        let shows_dir = required("DEST_SHOWS_DIR")?;
        let unmatched_dir = required("DEST_UNMATCHED_DIR")?;

        let allowed_extensions = parse_extensions(
            get("ALLOWED_EXTENSIONS")
                .as_deref()
                .unwrap_or(ScanDefaults::ALLOWED_EXTENSIONS),
        );
        if allowed_extensions.is_empty() {
            return Err(ScanlyError::config("ALLOWED_EXTENSIONS is empty"));
        }

        let state_file = match get("STATE_FILE") {
            Some(path) => PathBuf::from(path),
            None => default_state_file(),
        };

        let scan_interval = match get("SCAN_INTERVAL_SECONDS") {
            Some(raw) => Duration::from_secs(parse_number("SCAN_INTERVAL_SECONDS", &raw)?),
            None => ScanDefaults::SCAN_INTERVAL,
        };
        let min_size_bytes = match get("MIN_SIZE_MB") {
            Some(raw) => parse_number::<u64>("MIN_SIZE_MB", &raw)? * 1024 * 1024,
            None => ScanDefaults::MIN_SIZE_BYTES,
        };
        let min_duration = match get("MIN_DURATION_SECONDS") {
            Some(raw) => Duration::from_secs(parse_number("MIN_DURATION_SECONDS", &raw)?),
            None => ScanDefaults::MIN_DURATION,
        };

        let endpoint_raw =
            get("OLLAMA_URL").unwrap_or_else(|| NetworkConfig::OLLAMA_GENERATE_URL.to_string());
        let endpoint = Url::parse(&endpoint_raw)
            .map_err(|e| ScanlyError::config(format!("OLLAMA_URL is not a valid URL: {e}")))?;
        let hint = HintConfig {
            enabled: match get("AI_ENABLED") {
                Some(raw) => parse_bool("AI_ENABLED", &raw)?,
                None => false,
            },
            model: get("AI_MODEL").unwrap_or_else(|| NetworkConfig::OLLAMA_DEFAULT_MODEL.into()),
            endpoint,
            binary: get("OLLAMA_PATH").map(PathBuf::from),
            timeout: match get("AI_TIMEOUT_SECONDS") {
                Some(raw) => Duration::from_secs(parse_number("AI_TIMEOUT_SECONDS", &raw)?),
                None => NetworkConfig::HINT_REQUEST_TIMEOUT,
            },
        };

        Ok(Self {
            source_dir,
            fallback_source_dirs,
            movies_dir,
            shows_dir,
            unmatched_dir,
            allowed_extensions,
            state_file,
            summary_file: get("SUMMARY_FILE").map(PathBuf::from),
            scan_interval,
            min_size_bytes,
            min_duration,
            ffprobe_path: get("FFPROBE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(ScanDefaults::FFPROBE_BINARY)),
            tmdb_api_key: get("TMDB_API_KEY"),
            tmdb_api_base: get("TMDB_API_BASE")
                .unwrap_or_else(|| NetworkConfig::TMDB_API_BASE.to_string()),
            imdb_db_path: get("IMDB_DB_PATH").map(PathBuf::from),
            hint,
            prune_missing: match get("PRUNE_MISSING") {
                Some(raw) => parse_bool("PRUNE_MISSING", &raw)?,
                None => true,
            },
            dry_run: false,
        })
    }

    /// Source roots in priority order.
    pub fn source_roots(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.source_dir.as_path())
            .chain(self.fallback_source_dirs.iter().map(PathBuf::as_path))
    }

    /// Whether a path carries one of the allowed extensions.
    pub fn is_allowed_extension(&self, path: &Path) -> bool {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_lowercase(),
            None => return false,
        };
        self.allowed_extensions
            .iter()
            .any(|ext| name.len() > ext.len() && name.ends_with(ext.as_str()))
    }

    /// Create the destination roots and the state file's parent directory.
    pub fn ensure_directories(&self) -> Result<()> {
        let state_parent = self.state_file.parent().filter(|p| !p.as_os_str().is_empty());
        for dir in [
            Some(self.movies_dir.as_path()),
            Some(self.shows_dir.as_path()),
            Some(self.unmatched_dir.as_path()),
            state_parent,
        ]
        .into_iter()
        .flatten()
        {
            std::fs::create_dir_all(dir).map_err(|e| ScanlyError::io_with_path(e, dir))?;
        }
        Ok(())
    }
}

/// Default state file under the platform's local data directory.
pub fn default_state_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("data"))
        .join(AppConfig::APP_NAME)
        .join(AppConfig::STATE_FILE_NAME)
}

fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|ext| ext.trim().to_lowercase())
        .filter(|ext| !ext.is_empty())
        .map(|ext| {
            if ext.starts_with('.') {
                ext
            } else {
                format!(".{ext}")
            }
        })
        .collect()
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse::<T>().map_err(|_| {
        ScanlyError::config(format!("{key} must be a non-negative integer, got '{raw}'"))
    })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ScanlyError::config(format!("{key} must be a boolean, got '{raw}'"))),
    }
}
