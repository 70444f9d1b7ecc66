//! ONNX classifier inference using tract
//!
//! Runs classifiers exported to ONNX with probability outputs as a plain
//! tensor (no ZipMap). Class labels and importances live in a sidecar
//! `<model>.meta.json` file because the graph does not carry them.

use super::{most_probable, ChurnModel};
use crate::errors::{ArtifactLoadError, ModelError};
use crate::models::FeatureVector;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Inference latency above which a warning is logged
const SLOW_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Sidecar metadata for an ONNX export
#[derive(Debug, Clone, Deserialize)]
pub struct OnnxMetadata {
    pub classes: Vec<String>,
    #[serde(default)]
    pub feature_importances: Option<Vec<f64>>,
    /// Output holding the probability tensor, defaults to the last output
    #[serde(default)]
    pub probability_output: Option<usize>,
}

/// Path of the sidecar metadata for a model file
pub fn metadata_path(model_path: &Path) -> PathBuf {
    let mut name = model_path.as_os_str().to_owned();
    name.push(".meta.json");
    PathBuf::from(name)
}

/// ONNX-backed classifier
pub struct OnnxModel {
    plan: TractModel,
    metadata: OnnxMetadata,
    n_features: usize,
    probability_output: usize,
}

impl OnnxModel {
    /// Load an ONNX model and its sidecar metadata, pinning the input to `[1, n_features]`
    pub fn load(path: &Path, n_features: usize) -> Result<Self, ArtifactLoadError> {
        let bytes = std::fs::read(path).map_err(|source| ArtifactLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let meta_path = metadata_path(path);
        let meta_content =
            std::fs::read_to_string(&meta_path).map_err(|source| ArtifactLoadError::Io {
                path: meta_path.clone(),
                source,
            })?;
        let metadata: OnnxMetadata =
            serde_json::from_str(&meta_content).map_err(|source| ArtifactLoadError::Parse {
                path: meta_path,
                source,
            })?;

        Self::from_bytes(&bytes, metadata, n_features)
    }

    pub fn from_bytes(
        model_bytes: &[u8],
        metadata: OnnxMetadata,
        n_features: usize,
    ) -> Result<Self, ArtifactLoadError> {
        if metadata.classes.is_empty() {
            return Err(ArtifactLoadError::InvalidModel(
                "metadata declares no classes".to_string(),
            ));
        }
        if let Some(importances) = &metadata.feature_importances {
            if importances.len() != n_features || importances.iter().any(|w| !w.is_finite()) {
                return Err(ArtifactLoadError::InvalidModel(format!(
                    "metadata carries {} feature importances for {} features",
                    importances.len(),
                    n_features
                )));
            }
        }

        let plan = Self::load_plan(model_bytes, n_features)
            .map_err(|e| ArtifactLoadError::InvalidModel(format!("{:#}", e)))?;

        let outputs = plan.model().outputs.len();
        let probability_output = metadata
            .probability_output
            .unwrap_or_else(|| outputs.saturating_sub(1));
        if probability_output >= outputs {
            return Err(ArtifactLoadError::InvalidModel(format!(
                "probability output {} does not exist, model has {} outputs",
                probability_output, outputs
            )));
        }

        Ok(Self {
            plan,
            metadata,
            n_features,
            probability_output,
        })
    }

    /// Parse and optimize the graph
    fn load_plan(model_bytes: &[u8], n_features: usize) -> TractResult<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))?
            .with_input_fact(0, f32::fact([1, n_features]).into())?
            .into_optimized()?
            .into_runnable()?;
        Ok(model)
    }

    fn to_tensor(&self, features: &FeatureVector) -> Result<Tensor, ModelError> {
        let data: Vec<f32> = features.as_slice().iter().map(|v| *v as f32).collect();
        let array = tract_ndarray::Array2::from_shape_vec((1, self.n_features), data)
            .map_err(|e| ModelError::Runtime(e.to_string()))?;
        Ok(array.into())
    }
}

impl ChurnModel for OnnxModel {
    fn kind(&self) -> &'static str {
        "onnx"
    }

    fn classes(&self) -> &[String] {
        &self.metadata.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, ModelError> {
        if features.len() != self.n_features {
            return Err(ModelError::FeatureCount {
                expected: self.n_features,
                actual: features.len(),
            });
        }

        let start = Instant::now();
        let input = self.to_tensor(features)?;
        let result = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| ModelError::Runtime(e.to_string()))?;
        let output = result
            .get(self.probability_output)
            .ok_or_else(|| ModelError::Runtime("no probability output from model".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| ModelError::Runtime(e.to_string()))?;
        let proba: Vec<f64> = view.iter().map(|p| *p as f64).collect();

        let elapsed = start.elapsed();
        if elapsed.as_millis() > SLOW_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "ONNX inference exceeded {}ms", SLOW_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "ONNX inference completed");
        }

        if proba.len() != self.metadata.classes.len() {
            return Err(ModelError::OutputShape {
                expected: self.metadata.classes.len(),
                actual: proba.len(),
            });
        }
        Ok(proba)
    }

    fn predict(&self, features: &FeatureVector) -> Result<String, ModelError> {
        self.predict_with_proba(features).map(|(label, _)| label)
    }

    fn predict_with_proba(
        &self,
        features: &FeatureVector,
    ) -> Result<(String, Vec<f64>), ModelError> {
        let proba = self.predict_proba(features)?;
        let label = self.metadata.classes[most_probable(&proba)].clone();
        Ok((label, proba))
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.metadata.feature_importances.as_deref()
    }
}
