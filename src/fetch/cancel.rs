use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between a fetch request and the
/// coordinator that issued it.
///
/// Cloning shares the flag. Once any handle cancels, every handle observes
/// `is_cancelled() == true`; there is no way back.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the request as cancelled. Non-blocking; workers check the flag
    /// before doing I/O and the coordinator drops the eventual response.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
