//! Shutdown signals for the follow loop.
//!
//! The first SIGINT/SIGTERM sets a flag the loop polls. A second one while the
//! flag is already set exits immediately with code 1.

use signal_hook::consts::TERM_SIGNALS;
use signal_hook::flag;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Flag raised by a termination signal.
#[derive(Debug, Clone)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    /// Register the handlers for every termination signal.
    pub fn install() -> Result<Self, std::io::Error> {
        let term_now = Arc::new(AtomicBool::new(false));

        for sig in TERM_SIGNALS {
            // Order matters: the conditional exit must see the flag before
            // the plain handler sets it.
            flag::register_conditional_shutdown(*sig, 1, Arc::clone(&term_now))?;
            flag::register(*sig, Arc::clone(&term_now))?;
        }

        Ok(Self(term_now))
    }

    pub fn requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    fn unarmed() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }
}
