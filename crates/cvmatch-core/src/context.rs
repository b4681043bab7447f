use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Deadline and cancellation carried through one request.
///
/// Cloning shares the cancellation flag, so a clone handed to another thread
/// can stop the whole chain.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { deadline: Some(Instant::now() + timeout), cancelled: Arc::default() }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fails if the request was cancelled or ran past its deadline.
    pub fn check(&self, stage: &'static str) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled(stage));
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Error::DeadlineExceeded(stage)),
            _ => Ok(()),
        }
    }
}
