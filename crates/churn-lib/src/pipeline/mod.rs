//! Prediction pipeline
//!
//! Validate -> Reconcile -> Infer -> Explain -> Assemble. Every call is a
//! one-shot pure transformation over the shared, read-only artifacts.

mod explain;
mod inference;
mod output;
mod reconcile;

pub use explain::{importances, DEFAULT_TOP_N};
pub use inference::{infer, to_percent, Inference};
pub use output::{LabelEntry, LabelMeaning, LabelVocabulary, ResponseAssembler};
pub use reconcile::{
    Localization, SchemaReconciler, ValueMapping, INTAKE_FORM_FIELDS, TELCO_CATEGORICAL_FIELDS,
};

use crate::artifacts::{Artifacts, ServingState};
use crate::errors::{PipelineError, PipelineResult};
use crate::models::{ClientRecord, ConfidenceFormat, PredictionResult};
use std::sync::Arc;
use tracing::debug;

/// Static pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub categorical_fields: Vec<String>,
    pub localization: Localization,
    pub vocabulary: LabelVocabulary,
    pub top_n: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            categorical_fields: TELCO_CATEGORICAL_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
            localization: Localization::default(),
            vocabulary: LabelVocabulary::default(),
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// Per-call options chosen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictOptions {
    /// Overrides the configured number of ranked importances
    pub top_n: Option<usize>,
    pub explain: bool,
    pub confidence_format: ConfidenceFormat,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            top_n: None,
            explain: true,
            confidence_format: ConfidenceFormat::Number,
        }
    }
}

/// Entry point shared by every transport
///
/// Constructed once from the startup load and then shared immutably.
#[derive(Debug, Clone)]
pub struct PredictionService {
    state: ServingState,
    reconciler: SchemaReconciler,
    assembler: ResponseAssembler,
    top_n: usize,
}

impl PredictionService {
    pub fn new(state: ServingState, config: PipelineConfig) -> Self {
        Self {
            state,
            reconciler: SchemaReconciler::new(config.categorical_fields, config.localization),
            assembler: ResponseAssembler::new(config.vocabulary),
            top_n: config.top_n,
        }
    }

    pub fn state(&self) -> &ServingState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    pub fn reconciler(&self) -> &SchemaReconciler {
        &self.reconciler
    }

    /// Loaded artifacts, or `ServiceUnavailable` with the load failure reason
    pub fn artifacts(&self) -> PipelineResult<&Arc<Artifacts>> {
        match &self.state {
            ServingState::Loaded(artifacts) => Ok(artifacts),
            ServingState::Unavailable { reason } => Err(PipelineError::ServiceUnavailable(
                format!("model or training schema not loaded: {}", reason),
            )),
        }
    }

    /// Classify one record
    pub fn predict(
        &self,
        record: &ClientRecord,
        options: &PredictOptions,
    ) -> PipelineResult<PredictionResult> {
        let artifacts = self.artifacts()?;
        let schema = artifacts.schema();
        let model = artifacts.model();

        self.reconciler.validate(record, schema)?;
        let features = self.reconciler.reconcile(record, schema);
        debug!(fields = record.len(), columns = features.len(), "Record reconciled");

        let inference = infer(model, &features)?;

        let ranked = if options.explain {
            importances(model, schema, options.top_n.unwrap_or(self.top_n))
        } else {
            None
        };

        Ok(self.assembler.assemble(
            &inference,
            ranked,
            options.confidence_format,
            artifacts.version(),
        ))
    }
}
