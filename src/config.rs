//! Configuration for the sampling and inference pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::{InferenceMode, WindowSpec};

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Target sampling rate in Hz
    pub sample_rate: f64,

    /// Nap length inside the timer thread's spin-wait, in microseconds
    pub spin_sleep_us: u64,

    /// Windowed inference parameters
    pub pipeline: PipelineConfig,
}

/// Pipeline parameters: window geometry plus output class names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(flatten)]
    pub window: WindowSpec,
    pub output_names: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: 100.0,
            spin_sleep_us: 1,
            pipeline: PipelineConfig {
                window: WindowSpec {
                    win_size: 50,
                    hop_length: 10,
                    lookback: 1,
                    mode: InferenceMode::FixedStride,
                },
                output_names: vec!["idle".to_string(), "active".to_string()],
            },
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to
    /// defaults when no file exists.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::Io(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::Parse(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(&config_path, content).map_err(|e| ConfigError::Io(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pulseframe")
            .join("config.json")
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}
