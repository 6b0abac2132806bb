//! # Cairn
//!
//! Durable, high-throughput counters (per key, per time-bucket) on an
//! embedded ordered key-value engine.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                          Cairn                             │
//! │  ┌───────────┐   ┌───────────┐   ┌─────────┐   ┌────────┐  │
//! │  │ Increment │ → │           │   │         │ ← │ Query  │  │
//! │  │  stream   │   │ Consumers │ → │  Store  │   │(GET/..)│  │
//! │  │ Decrement │ → │           │   │(RocksDB)│   └────────┘  │
//! │  │ log store │   └───────────┘   └─────────┘               │
//! │  └───────────┘                                             │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Counter updates resolve through an associative merge operator, so
//! concurrent writers never read-modify-write; zero-valued counters are
//! reclaimed by a compaction filter; and each consumer's batch of deltas
//! commits atomically with its consumed offset, so a crash never
//! double-applies or loses updates.
//!
//! # Quick Start
//!
//! ```no_run
//! use cairn::{Cairn, ConfigLoader, Reply};
//!
//! # fn main() -> Result<(), cairn::CairnError> {
//! let config = ConfigLoader::new().load_or_default();
//! let db = Cairn::open(&config)?;
//!
//! let handler = db.handler();
//! assert_eq!(handler.handle(&["set", "views:1H", "10"]), Reply::Ok);
//! assert_eq!(handler.handle(&["get", "views:1H"]), Reply::Integer(10));
//! # Ok(())
//! # }
//! ```
//!
//! Consumers are built from the same handle with
//! [`Cairn::increment_consumer`] / [`Cairn::decrement_consumer`], given a
//! stream source, and driven on dedicated threads via
//! [`StreamConsumer::run`].

mod cairn;
mod error;

pub use cairn::Cairn;
pub use error::CairnError;

// Re-export the shared vocabulary
pub use cairn_config::{
    CairnConfig, ConfigError, ConfigLoader, ConsumerConfig, ConsumerKind, DatabaseConfig,
    StoreTuningConfig,
};
pub use cairn_ingest::{
    DecrementConsumer, DecrementOptions, DelayedSource, IncrementConsumer, IncrementSource,
    IngestError, LogRecord, Shutdown, SourceError, StreamConsumer, StreamRecord, mem,
};
pub use cairn_query::{CommandHandler, Reply};
pub use cairn_store::{
    ConsumedOffsets, CounterStore, DeltaMap, OffsetCommitter, StoreError, StoreOptions,
};
pub use cairn_types::{
    CounterRecord, Timespan, TimespanRegistry, UnknownMode, counter_key, decode_value,
    encode_value, now_ms, parse_i64,
};
