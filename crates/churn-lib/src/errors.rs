//! Error types for artifact loading and the prediction pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading the schema or model artifacts at startup.
///
/// Fatal to readiness only: the service keeps running in an unavailable
/// state and reports the reason through its health endpoints.
#[derive(Error, Debug)]
pub enum ArtifactLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("training schema is empty")]
    EmptySchema,

    #[error("training schema lists column '{0}' more than once")]
    DuplicateColumn(String),

    #[error("unsupported model format for {0} (expected .json or .onnx)")]
    UnsupportedFormat(PathBuf),

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("model is incompatible with the training schema: {0}")]
    Incompatible(String),

    #[error("model checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

/// Failures raised by a model backend while evaluating a feature vector
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("model runtime error: {0}")]
    Runtime(String),

    #[error("model produced {actual} probabilities for {expected} classes")]
    OutputShape { expected: usize, actual: usize },
}

/// Caller-facing failure of a prediction call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Artifacts were never loaded; retried by the caller, not the service
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The record could not be validated or the model rejected it
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl PipelineError {
    /// Stable identifier used in error bodies and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::ServiceUnavailable(_) => "service_unavailable",
            PipelineError::InvalidInput(_) => "invalid_input",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            PipelineError::ServiceUnavailable(msg) | PipelineError::InvalidInput(msg) => msg,
        }
    }
}

impl From<ModelError> for PipelineError {
    fn from(err: ModelError) -> Self {
        PipelineError::InvalidInput(err.to_string())
    }
}

/// Result type for prediction calls
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_maps_to_invalid_input() {
        let err: PipelineError = ModelError::FeatureCount {
            expected: 4,
            actual: 3,
        }
        .into();
        assert_eq!(err.kind(), "invalid_input");
        assert!(err.message().contains("expected 4 features"));
    }

    #[test]
    fn test_unavailable_kind() {
        let err = PipelineError::ServiceUnavailable("model not loaded".to_string());
        assert_eq!(err.kind(), "service_unavailable");
        assert_eq!(err.message(), "model not loaded");
    }
}
