//! Opaque classifier capability and its backends

mod forest;
mod onnx;

pub use forest::{ForestModel, ForestSpec, Node, Tree};
pub use onnx::{metadata_path, OnnxMetadata, OnnxModel};

use crate::errors::{ArtifactLoadError, ModelError};
use crate::models::FeatureVector;
use std::path::Path;

/// Trait for pre-trained classifiers
///
/// Implementations are read-only after load and shared by every request.
pub trait ChurnModel: Send + Sync {
    /// Short backend name for diagnostics
    fn kind(&self) -> &'static str;

    /// Known class labels, in the order used by `predict_proba`
    fn classes(&self) -> &[String];

    /// Width of the input vector
    fn n_features(&self) -> usize;

    /// Predicted class label
    fn predict(&self, features: &FeatureVector) -> Result<String, ModelError>;

    /// One probability per entry of `classes()`
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, ModelError>;

    /// Label and probabilities from a single evaluation
    fn predict_with_proba(
        &self,
        features: &FeatureVector,
    ) -> Result<(String, Vec<f64>), ModelError> {
        Ok((self.predict(features)?, self.predict_proba(features)?))
    }

    /// Global importance weights aligned to input column order, if the model has them
    fn feature_importances(&self) -> Option<&[f64]> {
        None
    }
}

/// Index of the highest probability; the first one wins ties
pub(crate) fn most_probable(proba: &[f64]) -> usize {
    let mut best = 0usize;
    for (idx, p) in proba.iter().enumerate() {
        if *p > proba[best] {
            best = idx;
        }
    }
    best
}

/// Load a model by file extension: `.json` forests or `.onnx` graphs
pub fn load_model(path: &Path, n_features: usize) -> Result<Box<dyn ChurnModel>, ArtifactLoadError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("json") => Ok(Box::new(ForestModel::load(path)?)),
        Some("onnx") => Ok(Box::new(OnnxModel::load(path, n_features)?)),
        _ => Err(ArtifactLoadError::UnsupportedFormat(path.to_path_buf())),
    }
}
