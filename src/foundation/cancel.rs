use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::error::{ShortsError, ShortsResult};

/// Shared cancellation flag for a job.
///
/// Render workers check it once per frame; the tool runner polls it while an external process
/// is running and kills the process when it flips.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Return `Err(Cancelled)` once the token has been triggered.
    pub fn check(&self) -> ShortsResult<()> {
        if self.is_cancelled() {
            Err(ShortsError::Cancelled)
        } else {
            Ok(())
        }
    }
}
