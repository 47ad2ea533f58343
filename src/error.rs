// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Camera could not be opened or stopped producing frames.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("failed to open camera {index}: {reason}")]
    Open { index: u32, reason: String },

    #[error("failed to read frame: {0}")]
    Read(String),
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invalid input image: {0}")]
    InvalidInput(String),

    #[error("pose estimator failed: {0}")]
    Estimator(String),

    #[error("expected {expected} landmarks, got {got}")]
    LandmarkCount { expected: usize, got: usize },
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read model file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("malformed model: {0}")]
    Malformed(String),

    #[error("feature width mismatch: model expects {expected}, got {got}")]
    ShapeMismatch { expected: usize, got: usize },
}
