//! Prediction response assembly
//!
//! Turns an inference into the caller-facing result. The label vocabulary is
//! table-driven so new classes get a message without touching inference.

use super::inference::Inference;
use crate::models::{Confidence, ConfidenceFormat, FeatureImportance, PredictionResult};
use serde::{Deserialize, Serialize};

/// Presentation of one class label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMeaning {
    pub message: String,
    /// Whether the label denotes attrition
    #[serde(default)]
    pub churn: bool,
    /// Suggested retention actions
    #[serde(default)]
    pub actions: Vec<String>,
}

/// A vocabulary row bound to a class label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub label: String,
    pub message: String,
    #[serde(default)]
    pub churn: bool,
    #[serde(default)]
    pub actions: Vec<String>,
}

impl LabelEntry {
    fn meaning(&self) -> LabelMeaning {
        LabelMeaning {
            message: self.message.clone(),
            churn: self.churn,
            actions: self.actions.clone(),
        }
    }
}

/// Label to message table with a catch-all entry
///
/// Missing parts fall back to the built-in churn vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelVocabulary {
    pub labels: Vec<LabelEntry>,
    pub fallback: LabelMeaning,
}

impl Default for LabelVocabulary {
    fn default() -> Self {
        Self {
            labels: vec![LabelEntry {
                label: "Yes".to_string(),
                message: "The customer is likely to churn".to_string(),
                churn: true,
                actions: vec![
                    "Offer a plan tailored to the customer's actual usage".to_string(),
                    "Reach out proactively to resolve issues before they escalate".to_string(),
                    "Enroll the customer in a loyalty program".to_string(),
                    "Review competitor offers the customer may be considering".to_string(),
                ],
            }],
            fallback: LabelMeaning {
                message: "The customer is likely to stay".to_string(),
                churn: false,
                actions: vec![
                    "Highlight the benefits of the current subscription".to_string(),
                    "Propose complementary services".to_string(),
                    "Collect feedback through a satisfaction survey".to_string(),
                    "Keep regular contact with newsletters and exclusive offers".to_string(),
                ],
            },
        }
    }
}

impl LabelVocabulary {
    /// Meaning of a label, the fallback when the table has no row for it
    pub fn lookup(&self, label: &str) -> LabelMeaning {
        self.labels
            .iter()
            .find(|entry| entry.label == label)
            .map(LabelEntry::meaning)
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Builds `PredictionResult`s from pipeline outputs
#[derive(Debug, Clone, Default)]
pub struct ResponseAssembler {
    vocabulary: LabelVocabulary,
}

impl ResponseAssembler {
    pub fn new(vocabulary: LabelVocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &LabelVocabulary {
        &self.vocabulary
    }

    pub fn assemble(
        &self,
        inference: &Inference,
        importances: Option<Vec<FeatureImportance>>,
        format: ConfidenceFormat,
        model_version: &str,
    ) -> PredictionResult {
        let meaning = self.vocabulary.lookup(&inference.label);

        PredictionResult {
            label: inference.label.clone(),
            message: meaning.message,
            churn: meaning.churn,
            confidence: Confidence::new(inference.confidence, format),
            importances,
            actions: meaning.actions,
            model_version: model_version.to_string(),
            generated_at: chrono::Utc::now().timestamp(),
        }
    }
}
