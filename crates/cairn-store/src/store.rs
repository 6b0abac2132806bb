//! The counter store: RocksDB with counter semantics installed.
//!
//! # Column families
//!
//! ```text
//! default   <- counters: merge operator + zero-value compaction filter,
//!              every value exactly 8 big-endian bytes
//! offsets   <- per-consumer ConsumedOffsets records (postcard)
//! ```
//!
//! Offsets live in their own family so the counter family's width invariant
//! holds for every key it contains and the compaction filter can assert it.
//!
//! # Consistency
//!
//! A point read concurrent with an uncommitted merge may return a value
//! that does not yet reflect an in-flight delta. The delta is never lost
//! (merge commutativity guarantees every write is reflected exactly once),
//! so the race costs staleness, not correctness.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use cairn_types::{decode_value, encode_value};
use rocksdb::{
    BlockBasedIndexType, BlockBasedOptions, BoundColumnFamily, Cache, ColumnFamilyDescriptor,
    DBWithThreadMode, MultiThreaded, Options, WriteBatch,
};

use crate::error::StoreError;
use crate::merge::{COMPACTION_FILTER_NAME, MERGE_OPERATOR_NAME, counter_merge, zero_value_filter};
use crate::offsets::ConsumedOffsets;

type Db = DBWithThreadMode<MultiThreaded>;

/// Column family holding counter values.
const CF_COUNTERS: &str = "default";

/// Column family holding consumed-offset state.
const CF_OFFSETS: &str = "offsets";

/// Accumulated per-key deltas for one commit.
pub type DeltaMap = HashMap<Vec<u8>, i64>;

/// Tuning knobs for the counter column family.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Block cache capacity in megabytes.
    pub block_cache_mb: usize,
    /// Bloom filter bits per key on the block-based table.
    pub bloom_bits_per_key: f64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            block_cache_mb: 64,
            bloom_bits_per_key: 10.0,
        }
    }
}

/// The atomic apply+commit contract between ingestion and storage.
///
/// One call commits a batch of counter deltas *and* the consumed-offset
/// record that covers them as a single durable write: either all of it
/// lands or none of it does. An `Err` from [`OffsetCommitter::commit`] is
/// fatal to the caller; after a failed commit there is no way to know
/// what was applied, so safe continuation is impossible.
pub trait OffsetCommitter {
    /// Reads the durable offset state for a consumer, if any.
    fn load_offsets(&self, offset_key: &[u8]) -> Result<Option<ConsumedOffsets>, StoreError>;

    /// Atomically applies `deltas` and advances the consumed offset.
    ///
    /// `file` carries the secondary log-file coordinate for the delayed
    /// decrement path; the increment path passes `None`.
    fn commit(
        &self,
        offset_key: &[u8],
        deltas: &DeltaMap,
        consumed: i64,
        file: Option<i64>,
    ) -> Result<(), StoreError>;
}

impl<C: OffsetCommitter + ?Sized> OffsetCommitter for Arc<C> {
    fn load_offsets(&self, offset_key: &[u8]) -> Result<Option<ConsumedOffsets>, StoreError> {
        (**self).load_offsets(offset_key)
    }

    fn commit(
        &self,
        offset_key: &[u8],
        deltas: &DeltaMap,
        consumed: i64,
        file: Option<i64>,
    ) -> Result<(), StoreError> {
        (**self).commit(offset_key, deltas, consumed, file)
    }
}

/// RocksDB with the counter merge operator, the zero-value compaction
/// filter, and the offsets column family installed.
pub struct CounterStore {
    db: Db,
}

impl CounterStore {
    /// Opens (or creates) a store at `path`.
    pub fn open(path: impl AsRef<Path>, options: &StoreOptions) -> Result<Self, StoreError> {
        let path = path.as_ref();

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let mut counter_opts = Options::default();
        counter_opts.set_merge_operator_associative(MERGE_OPERATOR_NAME, counter_merge);
        counter_opts.set_compaction_filter(COMPACTION_FILTER_NAME, zero_value_filter);
        counter_opts.set_memtable_prefix_bloom_ratio(0.02);

        let mut table = BlockBasedOptions::default();
        table.set_index_type(BlockBasedIndexType::BinarySearch);
        table.set_bloom_filter(options.bloom_bits_per_key, false);
        let cache = Cache::new_lru_cache(options.block_cache_mb * 1024 * 1024);
        table.set_block_cache(&cache);
        counter_opts.set_block_based_table_factory(&table);

        let families = vec![
            ColumnFamilyDescriptor::new(CF_COUNTERS, counter_opts),
            ColumnFamilyDescriptor::new(CF_OFFSETS, Options::default()),
        ];
        let db = Db::open_cf_descriptors(&db_opts, path, families)?;

        tracing::info!(path = %path.display(), "opened counter store");
        Ok(Self { db })
    }

    fn cf(&self, name: &'static str) -> Result<Arc<BoundColumnFamily<'_>>, StoreError> {
        self.db
            .cf_handle(name)
            .ok_or(StoreError::MissingColumnFamily(name))
    }

    /// Point read. `None` means "no counter recorded"; zero-valued
    /// counters are reclaimed by compaction, so absence and zero are
    /// observably different only between a zeroing write and the next
    /// compaction pass.
    pub fn get(&self, key: &[u8]) -> Result<Option<i64>, StoreError> {
        let cf = self.cf(CF_COUNTERS)?;
        match self.db.get_cf(&cf, key)? {
            Some(bytes) => decode_value(&bytes).map(Some).map_err(|source| {
                StoreError::CorruptValue {
                    key: key.to_vec(),
                    source,
                }
            }),
            None => Ok(None),
        }
    }

    /// Unconditional overwrite. Used only by the explicit SET operation.
    pub fn put(&self, key: &[u8], value: i64) -> Result<(), StoreError> {
        let cf = self.cf(CF_COUNTERS)?;
        self.db.put_cf(&cf, key, encode_value(value))?;
        Ok(())
    }

    /// Schedules an associative combine of `delta` into the key's value
    /// through the engine write path. Concurrent merges on the same key
    /// are serialized by the engine, not by application locking.
    pub fn merge(&self, key: &[u8], delta: i64) -> Result<(), StoreError> {
        let cf = self.cf(CF_COUNTERS)?;
        self.db.merge_cf(&cf, key, encode_value(delta))?;
        Ok(())
    }

    /// Compacts the full counter range, letting the zero-value filter
    /// reclaim dead keys. Background compaction does this continuously;
    /// this entry point exists for tests and operational tooling.
    pub fn compact_counters(&self) -> Result<(), StoreError> {
        let cf = self.cf(CF_COUNTERS)?;
        self.db
            .compact_range_cf(&cf, None::<&[u8]>, None::<&[u8]>);
        Ok(())
    }
}

impl OffsetCommitter for CounterStore {
    fn load_offsets(&self, offset_key: &[u8]) -> Result<Option<ConsumedOffsets>, StoreError> {
        let cf = self.cf(CF_OFFSETS)?;
        match self.db.get_cf(&cf, offset_key)? {
            Some(bytes) => ConsumedOffsets::decode(&bytes).map(Some).map_err(|source| {
                StoreError::CorruptOffsets {
                    key: offset_key.to_vec(),
                    source,
                }
            }),
            None => Ok(None),
        }
    }

    fn commit(
        &self,
        offset_key: &[u8],
        deltas: &DeltaMap,
        consumed: i64,
        file: Option<i64>,
    ) -> Result<(), StoreError> {
        let counters = self.cf(CF_COUNTERS)?;
        let offsets = self.cf(CF_OFFSETS)?;

        let mut batch = WriteBatch::default();
        for (key, delta) in deltas {
            batch.merge_cf(&counters, key, encode_value(*delta));
        }
        let state = ConsumedOffsets { consumed, file };
        batch.put_cf(&offsets, offset_key, state.encode());

        self.db.write(batch)?;
        tracing::debug!(
            keys = deltas.len(),
            consumed,
            file,
            "committed counter deltas with offsets"
        );
        Ok(())
    }
}
