//! Increment consumer against a real store and in-memory sources.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use cairn_ingest::mem::MemIncrementSource;
use cairn_ingest::{IncrementConsumer, Shutdown, StreamConsumer, StreamRecord};
use cairn_store::{ConsumedOffsets, CounterStore, DeltaMap, OffsetCommitter, StoreError, StoreOptions};
use cairn_types::{CounterRecord, TimespanRegistry};
use tempfile::TempDir;

const OFFSET_KEY: &[u8] = b"offsets/increments/part-0";
const POLL: Duration = Duration::from_millis(10);

fn open_store() -> (TempDir, Arc<CounterStore>) {
    let dir = TempDir::new().unwrap();
    let store = CounterStore::open(dir.path(), &StoreOptions::default()).unwrap();
    (dir, Arc::new(store))
}

fn record(offset: i64, key: &'static [u8], by: i32, flags: i64) -> StreamRecord {
    let payload = CounterRecord { key: Bytes::from_static(key), by, flags }.encode();
    StreamRecord { offset, payload: Bytes::from(payload) }
}

fn consumer(
    source: MemIncrementSource,
    store: Arc<CounterStore>,
) -> IncrementConsumer<MemIncrementSource, Arc<CounterStore>> {
    IncrementConsumer::new(
        source,
        store,
        Arc::new(TimespanRegistry::standard()),
        OFFSET_KEY,
        Shutdown::new(),
    )
    .unwrap()
}

#[test]
fn default_flags_fan_out_to_hour_day_week_month() {
    let (_dir, store) = open_store();
    let source = MemIncrementSource::new(vec![record(0, b"views:1", 4, 0)]);
    let mut consumer = consumer(source, Arc::clone(&store));

    consumer.process_batch(POLL).unwrap();

    for suffix in ["H", "D", "W", "M"] {
        let key = [b"views:1".as_slice(), suffix.as_bytes()].concat();
        assert_eq!(store.get(&key).unwrap(), Some(4), "suffix {suffix}");
    }
    for suffix in ["T", "D2", "W2", "D8", "M6"] {
        let key = [b"views:1".as_slice(), suffix.as_bytes()].concat();
        assert_eq!(store.get(&key).unwrap(), None, "suffix {suffix}");
    }
}

#[test]
fn explicit_single_flag_hits_one_suffix() {
    let (_dir, store) = open_store();
    let source = MemIncrementSource::new(vec![record(0, b"k", 2, 16)]);
    let mut consumer = consumer(source, Arc::clone(&store));

    consumer.process_batch(POLL).unwrap();

    assert_eq!(store.get(b"kT").unwrap(), Some(2));
    assert_eq!(store.get(b"kH").unwrap(), None);
}

#[test]
fn batch_accumulates_per_key_and_advances_offset() {
    let (_dir, store) = open_store();
    let source = MemIncrementSource::new(vec![
        record(0, b"a", 1, 1),
        record(1, b"a", 2, 1),
        record(2, b"b", 5, 1),
    ]);
    let mut consumer = consumer(source, Arc::clone(&store));

    consumer.process_batch(POLL).unwrap();

    assert_eq!(store.get(b"aH").unwrap(), Some(3));
    assert_eq!(store.get(b"bH").unwrap(), Some(5));
    assert_eq!(
        store.load_offsets(OFFSET_KEY).unwrap(),
        Some(ConsumedOffsets::stream_only(3))
    );
}

#[test]
fn empty_batch_commits_nothing() {
    let (_dir, store) = open_store();
    let source = MemIncrementSource::new(Vec::new());
    let mut consumer = consumer(source, Arc::clone(&store));

    consumer.process_batch(POLL).unwrap();

    assert_eq!(store.load_offsets(OFFSET_KEY).unwrap(), None);
}

#[test]
fn failed_broker_ack_is_not_an_error() {
    let (_dir, store) = open_store();
    let source = MemIncrementSource::new(vec![record(0, b"k", 1, 1)]).with_failing_ack();
    let mut consumer = consumer(source, Arc::clone(&store));

    consumer.process_batch(POLL).unwrap();

    assert_eq!(store.get(b"kH").unwrap(), Some(1));
    assert_eq!(
        store.load_offsets(OFFSET_KEY).unwrap(),
        Some(ConsumedOffsets::stream_only(1))
    );
}

#[test]
fn restart_resumes_from_committed_offset() {
    let (_dir, store) = open_store();
    let records = vec![record(0, b"k", 1, 1), record(1, b"k", 1, 1), record(2, b"k", 1, 1)];

    let source = MemIncrementSource::new(records.clone()).with_batch_size(2);
    let mut first = consumer(source, Arc::clone(&store));
    first.process_batch(POLL).unwrap();
    assert_eq!(store.get(b"kH").unwrap(), Some(2));

    // Simulated restart: a fresh consumer over the full stream seeks to
    // the committed offset and applies only the remainder.
    let source = MemIncrementSource::new(records);
    let mut second = consumer(source, Arc::clone(&store));
    second.process_batch(POLL).unwrap();

    assert_eq!(store.get(b"kH").unwrap(), Some(3));
    assert_eq!(
        store.load_offsets(OFFSET_KEY).unwrap(),
        Some(ConsumedOffsets::stream_only(3))
    );
}

/// Committer that fails every commit while delegating loads.
struct FailingCommitter {
    store: Arc<CounterStore>,
}

impl OffsetCommitter for FailingCommitter {
    fn load_offsets(&self, offset_key: &[u8]) -> Result<Option<ConsumedOffsets>, StoreError> {
        self.store.load_offsets(offset_key)
    }

    fn commit(
        &self,
        _offset_key: &[u8],
        _deltas: &DeltaMap,
        _consumed: i64,
        _file: Option<i64>,
    ) -> Result<(), StoreError> {
        Err(StoreError::MissingColumnFamily("injected commit failure"))
    }
}

#[test]
fn failed_commit_applies_nothing_and_retry_is_idempotent() {
    let (_dir, store) = open_store();
    let records = vec![record(0, b"k", 7, 1)];

    let source = MemIncrementSource::new(records.clone());
    let mut failing = IncrementConsumer::new(
        source,
        FailingCommitter { store: Arc::clone(&store) },
        Arc::new(TimespanRegistry::standard()),
        OFFSET_KEY,
        Shutdown::new(),
    )
    .unwrap();

    assert!(failing.process_batch(POLL).is_err());
    assert_eq!(store.get(b"kH").unwrap(), None);
    assert_eq!(store.load_offsets(OFFSET_KEY).unwrap(), None);

    // Restart against the real committer: the batch is re-read from the
    // prior committed offset and applied exactly once.
    let source = MemIncrementSource::new(records);
    let mut retry = consumer(source, Arc::clone(&store));
    retry.process_batch(POLL).unwrap();

    assert_eq!(store.get(b"kH").unwrap(), Some(7));
    assert_eq!(
        store.load_offsets(OFFSET_KEY).unwrap(),
        Some(ConsumedOffsets::stream_only(1))
    );
}

#[test]
fn run_stops_on_shutdown() {
    let (_dir, store) = open_store();
    let source = MemIncrementSource::new(vec![record(0, b"k", 1, 1)]);
    let shutdown = Shutdown::new();
    let mut consumer = IncrementConsumer::new(
        source,
        Arc::clone(&store),
        Arc::new(TimespanRegistry::standard()),
        OFFSET_KEY,
        shutdown.clone(),
    )
    .unwrap();

    shutdown.trigger();
    consumer.run(POLL).unwrap();

    // Stopped before the first cycle: nothing consumed.
    assert_eq!(store.load_offsets(OFFSET_KEY).unwrap(), None);
}
