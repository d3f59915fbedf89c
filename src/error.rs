//! Error taxonomy for the matching core.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("invalid embedding dimension {0}: must be positive")]
    DimensionConfig(i64),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("length mismatch: {vectors} vectors but {ids} ids")]
    LengthMismatch { vectors: usize, ids: usize },

    #[error("invalid candidate id {0:?}: ids must be non-empty and fit on one line")]
    InvalidId(String),

    #[error("failed to load snapshot at '{}': {reason}", .path.display())]
    SnapshotLoad { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

impl MatchError {
    pub(crate) fn snapshot_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        MatchError::SnapshotLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MatchError>;
