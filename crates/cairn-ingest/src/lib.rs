//! # cairn-ingest: stream consumers for the counter store
//!
//! Two ingestion paths feed counters:
//!
//! - [`IncrementConsumer`] applies every record immediately, fanning each
//!   one out to all timespans its flags select, and commits a batch's
//!   accumulated deltas atomically with the consumed offset.
//! - [`DecrementConsumer`] is bound to a single timespan and withholds each
//!   record until its delivery timestamp plus the mode's delay has passed,
//!   re-scanning the deferred set in delayed rounds until it drains.
//!
//! Both run as plain sequential loops, one instance per stream partition
//! (and, for decrements, per mode). The store's merge operator is the only
//! cross-consumer synchronization; nothing here takes a lock around the
//! counter keyspace.

mod consumer;
mod decrement;
mod error;
mod increment;
pub mod mem;
mod shutdown;
mod source;

pub use consumer::StreamConsumer;
pub use decrement::{DecrementConsumer, DecrementOptions};
pub use error::IngestError;
pub use increment::IncrementConsumer;
pub use shutdown::Shutdown;
pub use source::{DelayedSource, IncrementSource, LogRecord, SourceError, StreamRecord};
