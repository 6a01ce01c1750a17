use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::checkpoint::metadata::{CheckpointRecord, ModelRecord, TrainingStats};
use crate::config::AppConfig;
use crate::error::PersistenceError;

/// Locations of the three persisted artifacts.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointManagerConfig {
    pub model_file: PathBuf,
    pub stats_file: PathBuf,
    pub checkpoint_file: PathBuf,
}

impl Default for CheckpointManagerConfig {
    fn default() -> Self {
        CheckpointManagerConfig {
            model_file: PathBuf::from("model.json"),
            stats_file: PathBuf::from("training_stats.json"),
            checkpoint_file: PathBuf::from("training_checkpoint.json"),
        }
    }
}

/// Reads and writes the model, stats and checkpoint files. Each file is
/// written independently; there is no transaction across them.
pub struct CheckpointManager {
    config: CheckpointManagerConfig,
}

impl CheckpointManager {
    pub fn new(config: CheckpointManagerConfig) -> Self {
        CheckpointManager { config }
    }

    pub fn config(&self) -> &CheckpointManagerConfig {
        &self.config
    }

    pub fn save_model(&self, model: &ModelRecord) -> Result<PathBuf, PersistenceError> {
        write_json(&self.config.model_file, model)?;
        Ok(self.config.model_file.clone())
    }

    /// `Ok(None)` when no model file exists yet.
    pub fn load_model(&self) -> Result<Option<ModelRecord>, PersistenceError> {
        let Some(model) = read_json::<ModelRecord>(&self.config.model_file)? else {
            return Ok(None);
        };
        model.check_version()?;
        Ok(Some(model))
    }

    pub fn save_stats(&self, stats: &TrainingStats) -> Result<PathBuf, PersistenceError> {
        write_json(&self.config.stats_file, stats)?;
        Ok(self.config.stats_file.clone())
    }

    pub fn load_stats(&self) -> Result<Option<TrainingStats>, PersistenceError> {
        read_json(&self.config.stats_file)
    }

    /// Write a checkpoint stamped with the current UTC time.
    pub fn save_checkpoint(
        &self,
        episode: usize,
        epsilon: f64,
        config: &AppConfig,
    ) -> Result<CheckpointRecord, PersistenceError> {
        let record = CheckpointRecord {
            episode,
            epsilon,
            config: serde_json::to_value(config)?,
            timestamp: OffsetDateTime::now_utc().format(&Rfc3339)?,
        };
        write_json(&self.config.checkpoint_file, &record)?;
        Ok(record)
    }

    pub fn load_checkpoint(&self) -> Result<Option<CheckpointRecord>, PersistenceError> {
        read_json(&self.config.checkpoint_file)
    }
}

/// Serialize to `<path>.tmp`, then rename over `path`.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let write_err = |source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let json = serde_json::to_string_pretty(value)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, json).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(write_err)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistenceError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| PersistenceError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let value = serde_json::from_str(&content).map_err(|e| PersistenceError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::metadata::{AverageScores, TableRecord};

    fn manager_in(dir: &Path) -> CheckpointManager {
        CheckpointManager::new(CheckpointManagerConfig {
            model_file: dir.join("model.json"),
            stats_file: dir.join("training_stats.json"),
            checkpoint_file: dir.join("training_checkpoint.json"),
        })
    }

    #[test]
    fn test_missing_files_load_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        assert!(manager.load_model().unwrap().is_none());
        assert!(manager.load_stats().unwrap().is_none());
        assert!(manager.load_checkpoint().unwrap().is_none());
    }

    #[test]
    fn test_model_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());

        let mut table = TableRecord::default();
        table
            .q_values
            .entry("0".repeat(64))
            .or_default()
            .insert("E6".to_string(), -0.25);
        let model = ModelRecord::new(table, TableRecord::default());

        let path = manager.save_model(&model).unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("model.json.tmp").exists());
        assert_eq!(manager.load_model().unwrap(), Some(model));
    }

    #[test]
    fn test_malformed_model_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        fs::write(dir.path().join("model.json"), "{ not json").unwrap();
        assert!(matches!(
            manager.load_model(),
            Err(PersistenceError::Parse { .. })
        ));
    }

    #[test]
    fn test_wrong_version_is_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        fs::write(dir.path().join("model.json"), r#"{ "version": 9 }"#).unwrap();
        assert!(matches!(
            manager.load_model(),
            Err(PersistenceError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        let config = AppConfig::default();

        let saved = manager.save_checkpoint(42, 0.2875, &config).unwrap();
        assert!(OffsetDateTime::parse(&saved.timestamp, &Rfc3339).is_ok());

        let loaded = manager.load_checkpoint().unwrap().unwrap();
        assert_eq!(loaded.episode, 42);
        assert_eq!(loaded.epsilon, 0.2875);
        assert_eq!(loaded.timestamp, saved.timestamp);
    }

    #[test]
    fn test_stats_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        let mut stats = TrainingStats::default();
        stats.push(10, 0.5, AverageScores { black: 40.0, white: 24.0 });

        manager.save_stats(&stats).unwrap();
        assert_eq!(manager.load_stats().unwrap(), Some(stats));
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(&dir.path().join("nested/run"));
        manager.save_stats(&TrainingStats::default()).unwrap();
        assert!(dir.path().join("nested/run/training_stats.json").exists());
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should go makes the rename fail.
        fs::create_dir(dir.path().join("model.json")).unwrap();
        fs::write(dir.path().join("model.json").join("keep"), "x").unwrap();
        let manager = manager_in(dir.path());
        let err = manager.save_model(&ModelRecord::default()).unwrap_err();
        assert!(matches!(err, PersistenceError::Write { .. }));
    }
}
