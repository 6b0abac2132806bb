//! Top-level error type.

use thiserror::Error;

/// Errors surfaced by the [`Cairn`](crate::Cairn) handle.
#[derive(Debug, Error)]
pub enum CairnError {
    #[error("store error: {0}")]
    Store(#[from] cairn_store::StoreError),

    #[error("ingest error: {0}")]
    Ingest(#[from] cairn_ingest::IngestError),

    #[error("config error: {0}")]
    Config(#[from] cairn_config::ConfigError),
}
