//! Fault taxonomy.
//!
//! - [`StartupError`]: the model artifact cannot be loaded; the process must not
//!   start accepting input.
//! - [`EncodingError`]: a submitted value is outside its declared domain.
//! - [`PredictionError`]: the classifier call failed for this submission.
//!
//! None of these are retried; every per-request fault ends that cycle.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("model artifact not found in {dir} (expected churn_model.json, churn_model.json.gz or churn_model_v<N>.json)")]
    MissingArtifact { dir: PathBuf },

    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("feature schema mismatch at column {index}: artifact has {found:?}, encoder produces {expected:?}")]
    FeatureName {
        index: usize,
        expected: &'static str,
        found: String,
    },

    #[error("feature schema has {found} columns, encoder produces {expected}")]
    FeatureCount { expected: usize, found: usize },

    #[error("incompatible model: {0}")]
    Incompatible(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodingError {
    #[error("{field}: unknown value {value:?} (expected one of {expected:?})")]
    UnknownCategory {
        field: &'static str,
        value: String,
        expected: Vec<&'static str>,
    },

    #[error("{field}: {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field}: value is not a finite number")]
    NotFinite { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("shape mismatch: model expects {expected} features, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("classifier produced a non-finite value")]
    NonFinite,

    #[error("class probabilities sum to {sum}, expected 1.0")]
    InvalidDistribution { sum: f64 },

    #[error("classifier failed: {0}")]
    Backend(String),

    #[error("classifier panicked: {0}")]
    Panicked(String),
}

/// Per-request fault: everything that can end a single submission.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChurnError {
    #[error("invalid input: {0}")]
    Encoding(#[from] EncodingError),

    #[error("An error occurred during prediction: {0}")]
    Prediction(#[from] PredictionError),
}

impl ChurnError {
    /// Short machine-readable tag used by the JSON surface and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ChurnError::Encoding(_) => "encoding_fault",
            ChurnError::Prediction(_) => "prediction_fault",
        }
    }
}

pub type ChurnResult<T> = Result<T, ChurnError>;
