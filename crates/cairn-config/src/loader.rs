//! Configuration loader with multi-source merging.

use std::env;
use std::path::{Path, PathBuf};

use crate::{CairnConfig, ConfigError};

/// Project-level config filename.
const PROJECT_CONFIG: &str = "cairn.toml";

/// Gitignored local-override filename.
const LOCAL_CONFIG: &str = "cairn.local.toml";

/// Configuration loader with builder-style setup.
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    /// Creates a loader rooted at the current directory.
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "CAIRN".to_string(),
        }
    }

    /// Sets the project directory.
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Sets the environment variable prefix (default: `CAIRN`).
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Loads configuration from all sources with proper precedence, then
    /// validates it.
    pub fn load(self) -> Result<CairnConfig, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&CairnConfig::default())?);

        for filename in [PROJECT_CONFIG, LOCAL_CONFIG] {
            let path = self.project_dir.join(filename);
            if path.exists() {
                builder = builder.add_source(
                    config::File::from(path)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .separator("_")
                .try_parsing(true),
        );

        let mut loaded: CairnConfig = builder.build()?.try_deserialize()?;
        loaded.resolve_paths(&self.project_dir);
        loaded.validate()?;
        Ok(loaded)
    }

    /// Loads configuration or falls back to defaults.
    pub fn load_or_default(self) -> CairnConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
