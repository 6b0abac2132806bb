//! Cooperative stop signal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cloneable stop flag shared by every consumer in the process.
///
/// Consumers check it before each batch cycle and inside every sleep slice
/// of the decrement delay loop, so a stop is observed within one slice.
/// Nothing checks it mid-commit: a commit that has been issued runs to
/// completion or the process dies.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    stopped: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Requests a stop. Idempotent.
    pub fn trigger(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Arranges for SIGINT/SIGTERM to trigger this flag.
    #[cfg(unix)]
    pub fn register_signals(&self) -> std::io::Result<()> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        signal_hook::flag::register(SIGINT, Arc::clone(&self.stopped))?;
        signal_hook::flag::register(SIGTERM, Arc::clone(&self.stopped))?;
        Ok(())
    }
}
