use std::path::PathBuf;

/// Errors that can occur while reading or writing persisted artifacts
/// (model, stats, checkpoint).
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("model schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_error_display() {
        let err = PersistenceError::SchemaMismatch("unsupported version 7".to_string());
        assert_eq!(
            err.to_string(),
            "model schema mismatch: unsupported version 7"
        );
    }

    #[test]
    fn test_read_error_display() {
        let err = PersistenceError::Read {
            path: PathBuf::from("model.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "failed to read model.json: denied");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("agent.alpha must be in (0, 1]".to_string());
        assert_eq!(
            err.to_string(),
            "config validation error: agent.alpha must be in (0, 1]"
        );
    }
}
