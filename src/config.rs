use std::path::{Path, PathBuf};

use tracing::warn;

use crate::ai::AgentConfig;
use crate::checkpoint::CheckpointManagerConfig;
use crate::error::ConfigError;
use crate::game::DEFAULT_MAX_TURNS;
use crate::training::trainer::TrainerConfig;

/// Rules applied to every episode.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub max_turns: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            max_turns: DEFAULT_MAX_TURNS,
        }
    }
}

/// Log level and optional log file, consumed by the binary that installs the
/// subscriber.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            file: Some(PathBuf::from("game.log")),
        }
    }
}

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub training: TrainerConfig,
    pub game: GameConfig,
    pub paths: CheckpointManagerConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.alpha <= 0.0 || self.agent.alpha > 1.0 {
            return Err(ConfigError::Validation(
                "agent.alpha must be in (0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.agent.gamma) {
            return Err(ConfigError::Validation(
                "agent.gamma must be in [0, 1]".into(),
            ));
        }

        let training = &self.training;
        if training.num_episodes == 0 {
            return Err(ConfigError::Validation(
                "training.num_episodes must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&training.initial_epsilon) {
            return Err(ConfigError::Validation(
                "training.initial_epsilon must be in [0, 1]".into(),
            ));
        }
        if training.epsilon_decay <= 0.0 || training.epsilon_decay > 1.0 {
            return Err(ConfigError::Validation(
                "training.epsilon_decay must be in (0, 1]".into(),
            ));
        }
        if training.save_interval == 0 {
            return Err(ConfigError::Validation(
                "training.save_interval must be > 0".into(),
            ));
        }
        if training.checkpoint_interval == 0 {
            return Err(ConfigError::Validation(
                "training.checkpoint_interval must be > 0".into(),
            ));
        }
        if training.log_interval == 0 {
            return Err(ConfigError::Validation(
                "training.log_interval must be > 0".into(),
            ));
        }

        if self.game.max_turns == 0 {
            return Err(ConfigError::Validation(
                "game.max_turns must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&AppConfig::default())?)
    }
}
