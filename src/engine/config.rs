use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterOptions;
use crate::error::{Error, OptionsError};

/// Which clusterer the engine builds for a point set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum StrategyChoice {
    /// Zoom-level index, built once per data batch
    #[default]
    Hierarchical,
    /// Greedy meters-per-delta clusterer, recomputed on every pass
    Distance,
    /// `Distance` below `auto_distance_below` points, `Hierarchical` above
    Auto,
}

/// Engine settings
///
/// Every field has a default, so a config file only needs the fields it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub options: ClusterOptions,
    /// Quiet period before a viewport change triggers a pass
    pub debounce_ms: u64,
    /// Cap on published entities
    pub max_entities: usize,
    /// Passes over more points than this run on a background thread
    pub background_threshold: usize,
    pub strategy: StrategyChoice,
    pub auto_distance_below: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            options: ClusterOptions::default(),
            debounce_ms: 100,
            max_entities: 500,
            background_threshold: 200,
            strategy: StrategyChoice::default(),
            auto_distance_below: 50,
        }
    }
}

impl EngineConfig {
    /// Loads a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let config_error = |reason: String| Error::Config {
            path: path.to_path_buf(),
            reason,
        };

        let text = fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        let config: EngineConfig =
            serde_json::from_str(&text).map_err(|e| config_error(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        self.options.validate()?;
        if self.max_entities == 0 {
            return Err(OptionsError::InvalidOptions(
                "maxEntities must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
