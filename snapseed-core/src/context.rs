//! Deadline and cancellation carrier for store operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::SnapError;

/// Passed to every store call. Clones share the cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Context {
    /// A context that never expires and is not cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context expiring after `timeout`, sharing this one's
    /// cancellation flag.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context with an absolute deadline. The earlier of the two
    /// deadlines wins.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        };
        Self {
            deadline: Some(deadline),
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with `Cancelled` or `DeadlineExceeded` when the caller gave up.
    pub fn check(&self) -> Result<(), SnapError> {
        if self.is_cancelled() {
            return Err(SnapError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(SnapError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_is_live() {
        let cx = Context::background();
        assert!(cx.check().is_ok());
        assert!(cx.deadline().is_none());
    }

    #[test]
    fn test_cancel_is_shared_with_derived_contexts() {
        let parent = Context::background();
        let child = parent.with_timeout(Duration::from_secs(60));
        parent.cancel();

        assert!(child.is_cancelled());
        assert!(matches!(child.check(), Err(SnapError::Cancelled)));
    }

    #[test]
    fn test_expired_deadline() {
        let cx = Context::background().with_deadline(Instant::now());
        assert!(matches!(cx.check(), Err(SnapError::DeadlineExceeded)));
    }

    #[test]
    fn test_earlier_deadline_wins() {
        let soon = Instant::now() + Duration::from_secs(1);
        let cx = Context::background()
            .with_deadline(soon)
            .with_timeout(Duration::from_secs(3600));
        assert_eq!(cx.deadline(), Some(soon));
    }
}
