//! Configuration management for cairn
//!
//! Hierarchical configuration loading, highest precedence last:
//! 1. Built-in defaults
//! 2. `cairn.toml` (git-tracked, project config)
//! 3. `cairn.local.toml` (gitignored, local overrides)
//! 4. Environment variables (`CAIRN_*` prefix)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

/// Main cairn configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CairnConfig {
    pub database: DatabaseConfig,
    pub store: StoreTuningConfig,
    pub consumers: Vec<ConsumerConfig>,
}

/// Where the store lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub data_dir: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".cairn/data"),
        }
    }
}

/// Counter column family tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreTuningConfig {
    pub block_cache_mb: usize,
    pub bloom_bits_per_key: f64,
}

impl Default for StoreTuningConfig {
    fn default() -> Self {
        Self {
            block_cache_mb: 64,
            bloom_bits_per_key: 10.0,
        }
    }
}

/// Which ingestion path a consumer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsumerKind {
    Increment,
    Decrement,
}

/// One consumer instance: a stream partition plus its commit identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    pub kind: ConsumerKind,
    pub topic: String,
    pub partition: i32,
    pub group_id: String,
    /// Key the consumer's offset state is stored under.
    pub offset_key: String,
    /// Timespan mode; required for (and only meaningful to) decrement
    /// consumers.
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
}

fn default_poll_timeout_ms() -> u64 {
    1000
}

impl CairnConfig {
    /// Rejects configurations that could not produce a working process.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for consumer in &self.consumers {
            if consumer.offset_key.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "consumer for topic {} has an empty offset key",
                    consumer.topic
                )));
            }
            if consumer.kind == ConsumerKind::Decrement && consumer.mode.is_none() {
                return Err(ConfigError::Validation(format!(
                    "decrement consumer for topic {} is missing a mode",
                    consumer.topic
                )));
            }
        }
        Ok(())
    }

    /// Resolves a relative data dir against the project directory.
    pub fn resolve_paths(&mut self, project_dir: &Path) {
        if self.database.data_dir.is_relative() {
            self.database.data_dir = project_dir.join(&self.database.data_dir);
        }
    }
}
