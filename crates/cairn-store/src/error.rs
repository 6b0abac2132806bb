//! Store error types.

use cairn_types::InvalidValueWidth;
use thiserror::Error;

/// Errors from the counter store.
///
/// [`StoreError::Engine`] during an offset commit and
/// [`StoreError::CorruptValue`] anywhere are fatal: continuing after either
/// would desynchronize applied deltas from the durable offset, or serve
/// garbage as counter values. Callers propagate them out of their run loops.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage engine rejected an operation.
    #[error("storage engine error: {0}")]
    Engine(#[from] rocksdb::Error),

    /// A stored counter value has the wrong width.
    #[error("corrupt value under key {key:?}: {source}")]
    CorruptValue {
        key: Vec<u8>,
        source: InvalidValueWidth,
    },

    /// Persisted offset state failed to decode.
    #[error("corrupt offset state under key {key:?}: {source}")]
    CorruptOffsets {
        key: Vec<u8>,
        source: postcard::Error,
    },

    /// A required column family is missing from the opened database.
    #[error("missing column family: {0}")]
    MissingColumnFamily(&'static str),
}
