//! The delay-buffered decrement consumer.
//!
//! Decrements are withheld for the mode's retention delay before they are
//! applied, so a counter only ever shrinks once the increment it offsets
//! has aged out of the bucket. Each consumer instance is bound to exactly
//! one timespan; a deployment runs one instance per (partition, mode).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cairn_store::{DeltaMap, OffsetCommitter};
use cairn_types::{CounterRecord, TimespanRegistry, counter_key, now_ms};

use crate::consumer::StreamConsumer;
use crate::error::IngestError;
use crate::shutdown::Shutdown;
use crate::source::{DelayedSource, LogRecord};

/// Tuning for the delay loop.
#[derive(Debug, Clone)]
pub struct DecrementOptions {
    /// Extra wait past a record's due time, so slightly-later records in
    /// the same real-time window land in one commit instead of several.
    pub delay_margin_ms: i64,
    /// Upper bound on one uninterruptible sleep. A stop request is
    /// observed within one slice, not after the full remaining delay.
    pub sleep_slice: Duration,
}

impl Default for DecrementOptions {
    fn default() -> Self {
        Self {
            delay_margin_ms: 1000,
            sleep_slice: Duration::from_secs(1),
        }
    }
}

/// Per-batch working state. Built fresh for every scan, consumed by one
/// commit, then discarded.
#[derive(Debug, Default)]
struct ProcessingBuf {
    /// Accumulated deltas from records applied this scan.
    counts: DeltaMap,
    /// Records not yet due, keyed by stream offset.
    pending: BTreeMap<i64, LogRecord>,
    /// Lowest offset not yet durably processed; `None` until some record
    /// is applied or skipped.
    next_offset: Option<i64>,
}

/// Consumes the decrement log store for a single timespan.
pub struct DecrementConsumer<S, C> {
    source: S,
    committer: C,
    registry: Arc<TimespanRegistry>,
    offset_key: Vec<u8>,
    mode: String,
    delay_ms: i64,
    suffix: &'static str,
    mask: i64,
    options: DecrementOptions,
    shutdown: Shutdown,
}

impl<S: DelayedSource, C: OffsetCommitter> DecrementConsumer<S, C> {
    /// Builds the consumer, resolving `mode` against the registry (an
    /// unknown mode is a startup-fatal configuration error) and positioning
    /// the source at the durable offset pair, if one has been committed.
    pub fn new(
        mut source: S,
        committer: C,
        registry: Arc<TimespanRegistry>,
        offset_key: impl Into<Vec<u8>>,
        mode: &str,
        options: DecrementOptions,
        shutdown: Shutdown,
    ) -> Result<Self, IngestError> {
        let timespan = registry.resolve(mode)?.clone();
        let offset_key = offset_key.into();

        if let Some(state) = committer.load_offsets(&offset_key)? {
            source.seek(state.consumed, state.file.unwrap_or(0))?;
            tracing::info!(
                mode,
                consumed = state.consumed,
                file = state.file,
                "resuming decrement consumer"
            );
        }

        Ok(Self {
            source,
            committer,
            registry,
            offset_key,
            mode: mode.to_string(),
            delay_ms: timespan.delay_ms,
            suffix: timespan.suffix,
            mask: timespan.mask,
            options,
            shutdown,
        })
    }

    /// Routes one record into the buffer.
    ///
    /// Relies on the source's monotonic-timestamp precondition: once any
    /// record has been deferred, every later-offset record in the same
    /// scan is deferred without being decoded.
    fn process_record(&self, record: LogRecord, buf: &mut ProcessingBuf) -> Result<(), IngestError> {
        if !buf.pending.is_empty() {
            buf.pending.insert(record.offset, record);
            return Ok(());
        }

        let Some(payload) = record.value.as_ref() else {
            // A tombstone should not appear on this stream; skip it but
            // still advance past it so the offset can be committed.
            tracing::error!(offset = record.offset, mode = %self.mode, "log record has no payload");
            buf.next_offset = Some(record.offset + 1);
            return Ok(());
        };

        if now_ms() - record.timestamp_ms >= self.delay_ms {
            // Overdue: apply the decrement now, if this consumer's
            // timespan is among those the record selects.
            let counter = CounterRecord::decode(payload)?;
            let flags = self.registry.effective_flags(counter.flags);
            if flags & self.mask != 0 {
                let key = counter_key(&counter.key, self.suffix);
                *buf.counts.entry(key).or_insert(0) -= i64::from(counter.by);
            }
            buf.next_offset = Some(record.offset + 1);
        } else {
            buf.pending.insert(record.offset, record);
        }
        Ok(())
    }

    /// Commits one scan's accumulated deltas with the resolved offset pair.
    ///
    /// The consumed offset never advances past a record that was neither
    /// applied nor deferred-and-tracked: it is the applied high-water mark
    /// when anything was applied, else the lowest deferred offset. The file
    /// offset stays at the current file's start while that file still has
    /// unconsumed records, and moves to the next file's start otherwise.
    fn commit_counts(&mut self, buf: &ProcessingBuf) -> Result<(), IngestError> {
        if buf.counts.is_empty() && buf.pending.is_empty() {
            return Ok(());
        }

        let next_offset = match buf.next_offset {
            Some(offset) => offset,
            None => *buf.pending.keys().next().expect("pending is non-empty"),
        };
        let file_offset = if next_offset < self.source.next_file_offset() {
            self.source.current_file_offset()
        } else {
            self.source.next_file_offset()
        };

        self.committer
            .commit(&self.offset_key, &buf.counts, next_offset, Some(file_offset))?;
        if !self.source.commit_async() {
            tracing::warn!(mode = %self.mode, "best-effort broker offset commit failed");
        }
        tracing::debug!(
            mode = %self.mode,
            keys = buf.counts.len(),
            deferred = buf.pending.len(),
            consumed = next_offset,
            file = file_offset,
            "committed decrement scan"
        );
        Ok(())
    }

    /// Sleeps until `timestamp_ms + delay + margin`, in bounded slices.
    ///
    /// Returns false when interrupted by shutdown: the benign early-exit
    /// path, not an error.
    fn delay(&self, timestamp_ms: i64) -> bool {
        let wait_until = timestamp_ms + self.delay_ms + self.options.delay_margin_ms;
        let mut remaining_ms = wait_until - now_ms();
        if remaining_ms <= 0 {
            return true;
        }

        tracing::debug!(remaining_ms, mode = %self.mode, "sleeping until decrements are due");
        while remaining_ms > 0 {
            if self.shutdown.is_stopped() {
                return false;
            }
            let slice_ms = (remaining_ms as u64).min(self.options.sleep_slice.as_millis() as u64);
            thread::sleep(Duration::from_millis(slice_ms));
            remaining_ms = wait_until - now_ms();
        }
        true
    }
}

impl<S: DelayedSource, C: OffsetCommitter> StreamConsumer for DecrementConsumer<S, C> {
    fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// One outer cycle: scan and commit a fresh batch, then keep
    /// re-scanning the deferred set in delayed rounds until it drains or
    /// the process is stopping.
    fn process_batch(&mut self, timeout: Duration) -> Result<(), IngestError> {
        let mut buf = ProcessingBuf::default();
        let records = self.source.poll(timeout)?;
        let message_count = records.len();
        for record in records {
            self.process_record(record, &mut buf)?;
        }
        tracing::info!(messages = message_count, mode = %self.mode, "read decrement batch");
        self.commit_counts(&buf)?;

        let mut pending = std::mem::take(&mut buf.pending);
        while !self.shutdown.is_stopped() && !pending.is_empty() {
            let first_due = pending
                .values()
                .next()
                .expect("pending is non-empty")
                .timestamp_ms;
            if !self.delay(first_due) {
                // Shutdown interrupted the sleep. The deferred records are
                // not yet covered by any committed offset, so a restart
                // re-reads them from the log store.
                break;
            }

            // Clean re-scan: every record is eligible for the apply branch
            // again, and whatever is still not due is freshly re-deferred.
            let mut delayed = ProcessingBuf::default();
            for (_offset, record) in std::mem::take(&mut pending) {
                self.process_record(record, &mut delayed)?;
            }
            self.commit_counts(&delayed)?;
            pending = delayed.pending;
        }
        Ok(())
    }
}
