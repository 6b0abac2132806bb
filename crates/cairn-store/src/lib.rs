//! # cairn-store: durable counter storage
//!
//! A thin, opinionated layer over RocksDB:
//!
//! - Counter updates go through an **associative merge operator** (big-endian
//!   `i64` addition), so concurrent writers never read-modify-write.
//! - A **compaction filter** drops keys whose resolved value is exactly zero,
//!   bounding storage for counters that return to zero without explicit
//!   deletes on the write path.
//! - Consumed stream offsets live in a separate column family and are
//!   committed **atomically with the counter deltas they cover** (the
//!   [`OffsetCommitter`] contract). A crash can lose an uncommitted batch,
//!   never half of one.

mod error;
mod merge;
mod offsets;
mod store;

pub use error::StoreError;
pub use offsets::ConsumedOffsets;
pub use store::{CounterStore, DeltaMap, OffsetCommitter, StoreOptions};
