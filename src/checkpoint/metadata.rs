use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::PersistenceError;

/// Current layout of `model.json`.
pub const MODEL_VERSION: u32 = 1;

fn default_model_version() -> u32 {
    MODEL_VERSION
}

/// One agent's Q-table as written to disk: state key -> move -> value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    #[serde(rename = "qValues", default)]
    pub q_values: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Both agents' tables. Files without a `version` key are read as version 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    #[serde(default = "default_model_version")]
    pub version: u32,
    #[serde(default)]
    pub player1: TableRecord,
    #[serde(default)]
    pub player2: TableRecord,
}

impl Default for ModelRecord {
    fn default() -> Self {
        ModelRecord::new(TableRecord::default(), TableRecord::default())
    }
}

impl ModelRecord {
    pub fn new(player1: TableRecord, player2: TableRecord) -> Self {
        ModelRecord {
            version: MODEL_VERSION,
            player1,
            player2,
        }
    }

    pub fn check_version(&self) -> Result<(), PersistenceError> {
        if self.version != MODEL_VERSION {
            return Err(PersistenceError::SchemaMismatch(format!(
                "unsupported model version {} (expected {})",
                self.version, MODEL_VERSION
            )));
        }
        Ok(())
    }
}

/// Snapshot that lets training resume at `episode + 1` with the same epsilon.
/// The config snapshot is kept untyped; resuming never depends on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub episode: usize,
    pub epsilon: f64,
    #[serde(default)]
    pub config: serde_json::Value,
    /// RFC 3339 time the checkpoint was written.
    pub timestamp: String,
}

impl CheckpointRecord {
    /// The saved configuration, if the snapshot still parses.
    pub fn app_config(&self) -> Result<AppConfig, PersistenceError> {
        Ok(serde_json::from_value(self.config.clone())?)
    }
}

/// Rolling averages of the two colors' final disk counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AverageScores {
    pub black: f64,
    pub white: f64,
}

/// Progress samples appended every log interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingStats {
    pub episodes: Vec<usize>,
    pub convergence: Vec<f64>,
    #[serde(rename = "averageScores")]
    pub average_scores: Vec<AverageScores>,
}

impl TrainingStats {
    pub fn push(&mut self, episode: usize, convergence: f64, scores: AverageScores) {
        self.episodes.push(episode);
        self.convergence.push(convergence);
        self.average_scores.push(scores);
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }
}
