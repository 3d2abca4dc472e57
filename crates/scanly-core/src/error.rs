//! Error types for Scanly.
//!
//! Errors fall into three groups: configuration problems that stop the process,
//! provider failures that are scoped to a single call or capability, and
//! per-file failures that are logged and retried on the next pass.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the Scanly library.
#[derive(Debug, Error)]
pub enum ScanlyError {
    // Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // Provider errors
    #[error("{provider} is unavailable: {message}")]
    ProviderUnavailable { provider: String, message: String },

    #[error("{provider} timed out after {timeout:?}")]
    ProviderTimeout { provider: String, timeout: Duration },

    #[error("Malformed response from {provider}: {message}")]
    MalformedResponse { provider: String, message: String },

    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Optional cause description
        cause: Option<String>,
    },

    // Link errors
    #[error("Failed to link {src} to {dest}: {reason}")]
    LinkCreationFailure {
        src: PathBuf,
        dest: PathBuf,
        reason: String,
    },

    // File system errors
    #[error("File vanished before it could be processed: {0}")]
    FileVanished(PathBuf),

    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type alias for Scanly operations.
pub type Result<T> = std::result::Result<T, ScanlyError>;

// Conversion implementations for common error types

impl From<std::io::Error> for ScanlyError {
    fn from(err: std::io::Error) -> Self {
        ScanlyError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for ScanlyError {
    fn from(err: serde_json::Error) -> Self {
        ScanlyError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for ScanlyError {
    fn from(err: rusqlite::Error) -> Self {
        ScanlyError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for ScanlyError {
    fn from(err: reqwest::Error) -> Self {
        ScanlyError::Network {
            message: err.to_string(),
            cause: err.url().map(|u| u.to_string()),
        }
    }
}

impl ScanlyError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        ScanlyError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        ScanlyError::Configuration {
            message: message.into(),
        }
    }

    /// Whether the file that produced this error should be retried on the next pass.
    ///
    /// Transient errors leave the file out of the persisted scan state.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            ScanlyError::Configuration { .. } | ScanlyError::FileVanished(_)
        )
    }

    /// Whether the error is scoped to one provider call and should be
    /// treated as "no result" by the caller.
    pub fn is_call_scoped(&self) -> bool {
        matches!(
            self,
            ScanlyError::ProviderTimeout { .. } | ScanlyError::MalformedResponse { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScanlyError::ProviderTimeout {
            provider: "tmdb".into(),
            timeout: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "tmdb timed out after 10s");
    }

    #[test]
    fn test_transient_classification() {
        assert!(ScanlyError::LinkCreationFailure {
            src: "a".into(),
            dest: "b".into(),
            reason: "denied".into(),
        }
        .is_transient());
        assert!(!ScanlyError::FileVanished("gone.mkv".into()).is_transient());
        assert!(!ScanlyError::config("missing SOURCE_DIR").is_transient());
    }

    #[test]
    fn test_call_scoped_errors() {
        assert!(ScanlyError::MalformedResponse {
            provider: "ollama".into(),
            message: "not json".into(),
        }
        .is_call_scoped());
        assert!(!ScanlyError::ProviderUnavailable {
            provider: "ollama".into(),
            message: "refused".into(),
        }
        .is_call_scoped());
    }

    #[test]
    fn test_io_with_path() {
        let err = ScanlyError::io_with_path(
            std::io::Error::new(std::io::ErrorKind::NotFound, "nope"),
            "/tmp/x",
        );
        match err {
            ScanlyError::Io { path, .. } => assert_eq!(path, Some(PathBuf::from("/tmp/x"))),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
