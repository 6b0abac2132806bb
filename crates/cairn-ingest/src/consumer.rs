//! The consumer trait shared by both ingestion paths.

use std::time::Duration;

use crate::error::IngestError;
use crate::shutdown::Shutdown;

/// A stream consumer driven as a sequential batch loop.
///
/// Implementations own their source, their committer, and a [`Shutdown`]
/// handle; `run` is the whole lifecycle. Dispatch is static per instance:
/// a process builds the variant it was configured with and drives it on a
/// dedicated thread.
pub trait StreamConsumer {
    /// The stop flag this consumer observes.
    fn shutdown(&self) -> &Shutdown;

    /// One consume → accumulate → commit cycle.
    fn process_batch(&mut self, timeout: Duration) -> Result<(), IngestError>;

    /// Drives batch cycles until the stop flag is raised or a fatal error
    /// escapes. Errors are not retried here: every [`IngestError`] means
    /// the process must not continue consuming.
    fn run(&mut self, poll_timeout: Duration) -> Result<(), IngestError> {
        while !self.shutdown().is_stopped() {
            self.process_batch(poll_timeout)?;
        }
        tracing::info!("consumer stopped");
        Ok(())
    }
}
