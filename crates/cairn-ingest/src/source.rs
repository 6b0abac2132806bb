//! Stream source traits.
//!
//! Real deployments back these with a message-broker client (increment
//! path) and a chunked object-store log reader (decrement path). Those
//! clients are external collaborators; the consumers only rely on the
//! operations here. The [`mem`](crate::mem) module provides deterministic
//! in-memory implementations for tests and local development.

use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

/// A failure in the underlying stream client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SourceError(pub String);

/// One record from the increment stream.
#[derive(Debug, Clone)]
pub struct StreamRecord {
    /// Position in the stream. Strictly increasing within a partition.
    pub offset: i64,
    /// Encoded [`CounterRecord`](cairn_types::CounterRecord).
    pub payload: Bytes,
}

/// One record from the decrement log store.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Position in the stream. Strictly increasing within a partition.
    pub offset: i64,
    /// Broker delivery timestamp, milliseconds since epoch.
    pub timestamp_ms: i64,
    /// Encoded [`CounterRecord`](cairn_types::CounterRecord), or `None`
    /// for a tombstone.
    pub value: Option<Bytes>,
}

/// Ordered, offset-addressed increment stream.
pub trait IncrementSource {
    /// Positions the stream so the next poll starts at `offset`.
    fn seek(&mut self, offset: i64) -> Result<(), SourceError>;

    /// Pulls the records available within `timeout`. May return fewer than
    /// are outstanding; an empty result is a normal idle poll.
    fn poll(&mut self, timeout: Duration) -> Result<Vec<StreamRecord>, SourceError>;

    /// Best-effort acknowledgment to the broker, for its own metrics and
    /// lag reporting. The durable offset in the store is the source of
    /// truth on restart, so a `false` here is logged and ignored.
    fn commit_async(&mut self) -> bool;
}

/// Ordered decrement stream backed by a chunked log store.
///
/// # Precondition: monotonic timestamps
///
/// Within one source, `timestamp_ms` must be non-decreasing with offset.
/// The decrement consumer leans on this: as soon as one record in a scan is
/// found not yet due, every later record is deferred without being looked
/// at. A source that reorders timestamps will have its decrements delayed
/// past their deadline; that is a violated precondition, not a consumer
/// bug, and the consumer does not re-sort to hide it.
pub trait DelayedSource {
    /// Positions the stream at `offset` within the log file starting at
    /// `file_offset`.
    fn seek(&mut self, offset: i64, file_offset: i64) -> Result<(), SourceError>;

    /// Pulls the records available within `timeout`, never spanning a log
    /// file boundary in a single call.
    fn poll(&mut self, timeout: Duration) -> Result<Vec<LogRecord>, SourceError>;

    /// First stream offset of the log file currently being read.
    fn current_file_offset(&self) -> i64;

    /// First stream offset of the next log file (one past the end of the
    /// current file when it is the last).
    fn next_file_offset(&self) -> i64;

    /// Best-effort broker acknowledgment; see
    /// [`IncrementSource::commit_async`].
    fn commit_async(&mut self) -> bool;
}
