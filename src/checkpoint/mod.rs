mod manager;
mod metadata;

pub use manager::{CheckpointManager, CheckpointManagerConfig};
pub use metadata::{
    AverageScores, CheckpointRecord, ModelRecord, TableRecord, TrainingStats, MODEL_VERSION,
};
