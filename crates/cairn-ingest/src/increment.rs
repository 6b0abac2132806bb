//! The immediate-apply increment consumer.

use std::sync::Arc;
use std::time::Duration;

use cairn_store::{DeltaMap, OffsetCommitter};
use cairn_types::{CounterRecord, TimespanRegistry, counter_key};

use crate::consumer::StreamConsumer;
use crate::error::IngestError;
use crate::shutdown::Shutdown;
use crate::source::{IncrementSource, StreamRecord};

/// Consumes the increment stream and applies every record immediately.
///
/// Each record fans out to every timespan its effective flags select;
/// deltas accumulate per counter key over the batch and are committed
/// atomically with `high_water + 1` as the new consumed offset. A batch is
/// all-counted-or-uncommitted; this path never defers a record.
pub struct IncrementConsumer<S, C> {
    source: S,
    committer: C,
    registry: Arc<TimespanRegistry>,
    offset_key: Vec<u8>,
    /// Highest stream offset folded into the current or a committed batch.
    last_processed: Option<i64>,
    shutdown: Shutdown,
}

impl<S: IncrementSource, C: OffsetCommitter> IncrementConsumer<S, C> {
    /// Builds the consumer and positions the source at the durable
    /// consumed offset, if one has been committed before.
    pub fn new(
        mut source: S,
        committer: C,
        registry: Arc<TimespanRegistry>,
        offset_key: impl Into<Vec<u8>>,
        shutdown: Shutdown,
    ) -> Result<Self, IngestError> {
        let offset_key = offset_key.into();
        let committed = committer.load_offsets(&offset_key)?;
        if let Some(state) = committed {
            source.seek(state.consumed)?;
            tracing::info!(consumed = state.consumed, "resuming increment consumer");
        }
        Ok(Self {
            source,
            committer,
            registry,
            offset_key,
            last_processed: committed.map(|state| state.consumed - 1),
            shutdown,
        })
    }

    fn process_record(
        &mut self,
        record: &StreamRecord,
        counts: &mut DeltaMap,
    ) -> Result<(), IngestError> {
        let counter = CounterRecord::decode(&record.payload)?;
        let flags = self.registry.effective_flags(counter.flags);
        for timespan in self.registry.selected(flags) {
            let key = counter_key(&counter.key, timespan.suffix);
            *counts.entry(key).or_insert(0) += i64::from(counter.by);
        }
        self.last_processed = Some(record.offset);
        Ok(())
    }
}

impl<S: IncrementSource, C: OffsetCommitter> StreamConsumer for IncrementConsumer<S, C> {
    fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    fn process_batch(&mut self, timeout: Duration) -> Result<(), IngestError> {
        let mut counts = DeltaMap::new();
        let previous_high_water = self.last_processed;

        let records = self.source.poll(timeout)?;
        let message_count = records.len();
        for record in &records {
            self.process_record(record, &mut counts)?;
        }

        // An empty poll (or one that somehow replayed old offsets) commits
        // nothing; empty batches are free.
        if self.last_processed > previous_high_water {
            let high_water = self.last_processed.expect("high-water mark advanced");
            self.committer
                .commit(&self.offset_key, &counts, high_water + 1, None)?;
            if !self.source.commit_async() {
                tracing::warn!("best-effort broker offset commit failed");
            }
            tracing::debug!(
                messages = message_count,
                keys = counts.len(),
                consumed = high_water + 1,
                "processed increment batch"
            );
        }
        Ok(())
    }
}
