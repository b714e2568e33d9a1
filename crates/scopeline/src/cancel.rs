//! Cooperative cancellation signal threaded through a pipeline invocation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation flag shared between a caller and the pipeline run it
/// started. Cloning is cheap; all clones observe the same flag.
///
/// Checked at every suspension point (extraction, each gateway call, each
/// store transition). Cancellation aborts remaining work without applying a
/// partial transition.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_uncancelled() {
        assert!(!CancelFlag::new().is_cancelled());
    }

    #[test]
    fn test_cancel_is_visible_to_clones() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        flag.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let flag = CancelFlag::new();
        flag.cancel();
        flag.cancel();
        assert!(flag.is_cancelled());
    }
}
