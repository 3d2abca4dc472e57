//! Capability breaker for optional collaborators.
//!
//! Unlike a classic circuit breaker this one never half-opens: once the
//! capability is reported unavailable it stays off for the rest of the
//! process. Timeouts and malformed responses are counted but only cost the
//! current call.

use crate::error::ScanlyError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::{debug, warn};

/// How a call to the capability failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection refused or an HTTP-level error. Disables the capability.
    Unavailable,
    /// The call took too long. Scoped to this call.
    Timeout,
    /// The response could not be understood. Scoped to this call.
    Malformed,
}

impl FailureKind {
    /// Classify an error raised by the capability.
    pub fn from_error(err: &ScanlyError) -> Self {
        match err {
            ScanlyError::ProviderTimeout { .. } => FailureKind::Timeout,
            ScanlyError::MalformedResponse { .. } | ScanlyError::Json { .. } => {
                FailureKind::Malformed
            }
            _ => FailureKind::Unavailable,
        }
    }
}

/// Snapshot of breaker counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerStats {
    pub capability: String,
    pub available: bool,
    pub disabled_reason: Option<String>,
    pub successes: u64,
    pub timeouts: u64,
    pub malformed: u64,
}

/// Tracks whether an optional capability may still be called.
#[derive(Debug)]
pub struct CapabilityBreaker {
    capability: String,
    disabled: AtomicBool,
    disabled_reason: RwLock<Option<String>>,
    successes: AtomicU64,
    timeouts: AtomicU64,
    malformed: AtomicU64,
}

impl CapabilityBreaker {
    pub fn new(capability: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            disabled: AtomicBool::new(false),
            disabled_reason: RwLock::new(None),
            successes: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
        }
    }

    /// Whether calls should still be attempted.
    pub fn is_available(&self) -> bool {
        !self.disabled.load(Ordering::SeqCst)
    }

    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_failure(&self, kind: FailureKind, reason: impl Into<String>) {
        let reason = reason.into();
        match kind {
            FailureKind::Unavailable => self.disable(reason),
            FailureKind::Timeout => {
                self.timeouts.fetch_add(1, Ordering::SeqCst);
                debug!("{} timed out: {}", self.capability, reason);
            }
            FailureKind::Malformed => {
                self.malformed.fetch_add(1, Ordering::SeqCst);
                debug!("{} returned a malformed response: {}", self.capability, reason);
            }
        }
    }

    /// Permanently disable the capability.
    pub fn disable(&self, reason: impl Into<String>) {
        let reason = reason.into();
        if !self.disabled.swap(true, Ordering::SeqCst) {
            warn!("Disabling {} for this run: {}", self.capability, reason);
            if let Ok(mut slot) = self.disabled_reason.write() {
                *slot = Some(reason);
            }
        }
    }

    pub fn stats(&self) -> BreakerStats {
        BreakerStats {
            capability: self.capability.clone(),
            available: self.is_available(),
            disabled_reason: self.disabled_reason.read().ok().and_then(|r| r.clone()),
            successes: self.successes.load(Ordering::SeqCst),
            timeouts: self.timeouts.load(Ordering::SeqCst),
            malformed: self.malformed.load(Ordering::SeqCst),
        }
    }
}
