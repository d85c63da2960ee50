//! Refresh-token retention job.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use authvault_auth::{CleanupReport, TokenCleanup};
use authvault_core::result::AppResult;

/// Wraps [`TokenCleanup`] so that scheduled runs never overlap.
#[derive(Debug, Clone)]
pub struct TokenCleanupJob {
    cleanup: Arc<TokenCleanup>,
    running: Arc<AtomicBool>,
}

impl TokenCleanupJob {
    /// Create a new job around a cleanup handler.
    pub fn new(cleanup: Arc<TokenCleanup>) -> Self {
        Self {
            cleanup,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run one cycle. Returns `Ok(None)` when a previous cycle is still in
    /// progress.
    pub async fn run(&self) -> AppResult<Option<CleanupReport>> {
        let Some(_guard) = RunningGuard::acquire(&self.running) else {
            tracing::warn!("Token cleanup still running, skipping this tick");
            return Ok(None);
        };

        self.cleanup.run_once().await.map(Some)
    }
}

/// Holds the running flag for one cycle and clears it on drop, including
/// when the cycle's future is cancelled.
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
