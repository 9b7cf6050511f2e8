//! World configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::generation::GenerationConfig;
use crate::streaming::provider::{DEFAULT_CACHE_CAPACITY, DEFAULT_PREFETCH_CONCURRENCY};

/// Everything needed to open a world. Serialized as JSON; missing fields
/// take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World seed. Drives generation and the world's random stream.
    pub seed: i64,
    /// Display name, also used in log messages.
    pub name: String,
    /// Directory for persisted chunks. `None` keeps everything in memory.
    pub storage_dir: Option<PathBuf>,
    /// Maximum number of resident chunks.
    pub cache_capacity: usize,
    /// Concurrent loads for background prefetching.
    pub prefetch_concurrency: usize,
    pub generation: GenerationConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            name: "world".to_string(),
            storage_dir: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            prefetch_concurrency: DEFAULT_PREFETCH_CONCURRENCY,
            generation: GenerationConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Read a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Write this config as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Reject values the provider cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("world name must not be empty".to_string()));
        }
        if self.cache_capacity == 0 {
            return Err(Error::Config("cache_capacity must be at least 1".to_string()));
        }
        if self.prefetch_concurrency == 0 {
            return Err(Error::Config("prefetch_concurrency must be at least 1".to_string()));
        }

        let params = &self.generation.terrain_params;
        if params.scale <= 0.0 {
            return Err(Error::Config(format!("terrain scale must be positive, got {}", params.scale)));
        }
        if params.octaves == 0 {
            return Err(Error::Config("terrain octaves must be at least 1".to_string()));
        }
        if self.generation.flat_height < 0 {
            return Err(Error::Config(format!("flat_height must not be negative, got {}", self.generation.flat_height)));
        }
        Ok(())
    }
}
