//! Model invocation
//!
//! Runs the classifier on a reconciled vector and attributes the probability
//! of the predicted label by looking the label up in the model's own class
//! list. Class order is model-dependent, so no fixed index is ever assumed.

use crate::errors::{PipelineError, PipelineResult};
use crate::model::ChurnModel;
use crate::models::FeatureVector;
use std::time::Instant;
use tracing::debug;

/// Winning label and its confidence
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    pub label: String,
    /// Probability of `label` in percent, rounded to 2 decimals
    pub confidence: f64,
}

/// Scale a probability to a percentage rounded to 2 decimals, bounded to [0, 100]
pub fn to_percent(probability: f64) -> f64 {
    let percent = (probability.clamp(0.0, 1.0) * 100.0 * 100.0).round() / 100.0;
    percent.clamp(0.0, 100.0)
}

/// Predict the label of one vector and attribute its probability
pub fn infer(model: &dyn ChurnModel, features: &FeatureVector) -> PipelineResult<Inference> {
    let start = Instant::now();

    if features.len() != model.n_features() {
        return Err(PipelineError::InvalidInput(format!(
            "reconciled vector has {} columns, model expects {}",
            features.len(),
            model.n_features()
        )));
    }

    let (label, proba) = model.predict_with_proba(features)?;

    let classes = model.classes();
    if proba.len() != classes.len() {
        return Err(PipelineError::InvalidInput(format!(
            "model returned {} probabilities for {} classes",
            proba.len(),
            classes.len()
        )));
    }

    let class_index = classes.iter().position(|c| *c == label).ok_or_else(|| {
        PipelineError::InvalidInput(format!(
            "predicted label '{}' is not one of the model classes {:?}",
            label, classes
        ))
    })?;

    let probability = proba[class_index];
    if !probability.is_finite() {
        return Err(PipelineError::InvalidInput(format!(
            "model returned a non-finite probability for '{}'",
            label
        )));
    }

    let confidence = to_percent(probability);
    debug!(
        label = %label,
        class_index = class_index,
        confidence = confidence,
        elapsed_us = start.elapsed().as_micros(),
        "Inference completed"
    );

    Ok(Inference { label, confidence })
}
