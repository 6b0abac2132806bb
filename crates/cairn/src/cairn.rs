//! The Cairn handle: store + registry + component wiring.

use std::sync::Arc;

use cairn_config::{CairnConfig, ConfigError, ConsumerConfig};
use cairn_ingest::{
    DecrementConsumer, DecrementOptions, DelayedSource, IncrementConsumer, IncrementSource,
    Shutdown,
};
use cairn_query::CommandHandler;
use cairn_store::{CounterStore, StoreOptions};
use cairn_types::TimespanRegistry;

use crate::error::CairnError;

/// An open counter database plus the process-wide timespan registry.
///
/// Cheap to clone; all clones share the same store and registry. Consumers
/// and command handlers built from one handle funnel every mutation
/// through the store's atomic-write primitives.
#[derive(Clone)]
pub struct Cairn {
    store: Arc<CounterStore>,
    registry: Arc<TimespanRegistry>,
}

impl Cairn {
    /// Opens (or creates) the store described by `config`.
    pub fn open(config: &CairnConfig) -> Result<Self, CairnError> {
        let options = StoreOptions {
            block_cache_mb: config.store.block_cache_mb,
            bloom_bits_per_key: config.store.bloom_bits_per_key,
        };
        let store = CounterStore::open(&config.database.data_dir, &options)?;
        tracing::info!(data_dir = %config.database.data_dir.display(), "cairn open");
        Ok(Self {
            store: Arc::new(store),
            registry: Arc::new(TimespanRegistry::standard()),
        })
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<CounterStore> {
        &self.store
    }

    /// The timespan registry.
    pub fn registry(&self) -> &Arc<TimespanRegistry> {
        &self.registry
    }

    /// A command handler for the GET/SET/INCRBY/ENSURE surface.
    pub fn handler(&self) -> CommandHandler {
        CommandHandler::new(Arc::clone(&self.store))
    }

    /// Builds an increment consumer over `source`, resuming from the
    /// durable offset under the configured offset key.
    pub fn increment_consumer<S: IncrementSource>(
        &self,
        source: S,
        config: &ConsumerConfig,
        shutdown: Shutdown,
    ) -> Result<IncrementConsumer<S, Arc<CounterStore>>, CairnError> {
        Ok(IncrementConsumer::new(
            source,
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            config.offset_key.as_bytes(),
            shutdown,
        )?)
    }

    /// Builds a decrement consumer over `source`, bound to the configured
    /// mode. A missing or unknown mode is a startup-fatal error.
    pub fn decrement_consumer<S: DelayedSource>(
        &self,
        source: S,
        config: &ConsumerConfig,
        shutdown: Shutdown,
    ) -> Result<DecrementConsumer<S, Arc<CounterStore>>, CairnError> {
        let mode = config.mode.as_deref().ok_or_else(|| {
            ConfigError::Validation(format!(
                "decrement consumer for topic {} is missing a mode",
                config.topic
            ))
        })?;
        Ok(DecrementConsumer::new(
            source,
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            config.offset_key.as_bytes(),
            mode,
            DecrementOptions::default(),
            shutdown,
        )?)
    }
}
