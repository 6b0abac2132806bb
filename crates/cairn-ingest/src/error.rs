//! Ingestion error types.

use cairn_store::StoreError;
use cairn_types::{RecordDecodeError, UnknownMode};
use thiserror::Error;

use crate::source::SourceError;

/// Errors from a stream consumer.
///
/// Everything here is fatal to the consumer's run loop. Commit failures in
/// particular must terminate the process: a failed atomic commit leaves no
/// way to know whether deltas were applied, and the durable offset is the
/// only recovery point.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The configured mode is not in the timespan registry. Raised at
    /// construction, never at runtime.
    #[error("consumer configuration error: {0}")]
    UnknownMode(#[from] UnknownMode),

    /// The stream source failed.
    #[error("stream source error: {0}")]
    Source(#[from] SourceError),

    /// The atomic delta+offset commit failed.
    #[error("offset commit failed: {0}")]
    Commit(#[from] StoreError),

    /// A stream payload did not decode as a counter record.
    #[error("record decode failed: {0}")]
    Decode(#[from] RecordDecodeError),
}
