//! Cooperative cancellation for the scan loop.
//!
//! The token is flipped from a signal handler and observed between files and
//! while the daemon sleeps between passes.

use crate::config::ScanDefaults;
use crate::error::{Result, ScanlyError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// A cancellation token shared between the signal handler and the loop.
///
/// Cloning shares the same state; cancelling any clone cancels all of them.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Return [`ScanlyError::Cancelled`] if cancellation has been requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ScanlyError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, waking early once the token is cancelled.
    ///
    /// Returns `true` if the full duration elapsed without cancellation.
    pub async fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            let slice = (deadline - now).min(ScanDefaults::SLEEP_SLICE);
            tokio::time::sleep(slice).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(ScanlyError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes() {
        let token = CancellationToken::new();
        assert!(token.sleep(Duration::from_secs(5)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_wakes_on_cancel() {
        let token = CancellationToken::new();
        let clone = token.clone();
        let sleeper = tokio::spawn(async move { clone.sleep(Duration::from_secs(3600)).await });
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
        assert!(!sleeper.await.unwrap());
    }
}
