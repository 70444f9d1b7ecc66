//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcomes by label, failures by kind, model info)
//! - Structured JSON logging with tracing

use crate::artifacts::ServingState;
use crate::errors::PipelineError;
use crate::models::PredictionResult;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter_vec, register_int_gauge,
    GaugeVec, Histogram, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for prediction latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    prediction_failures_total: IntCounterVec,
    artifacts_loaded: IntGauge,
    model_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "churn_service_prediction_latency_seconds",
                "Time spent serving one prediction request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "churn_service_predictions_total",
                "Predictions served, by predicted label",
                &["label"]
            )
            .expect("Failed to register predictions_total"),

            prediction_failures_total: register_int_counter_vec!(
                "churn_service_prediction_failures_total",
                "Rejected prediction requests, by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_failures_total"),

            artifacts_loaded: register_int_gauge!(
                "churn_service_artifacts_loaded",
                "1 when the model and training schema are loaded, 0 otherwise"
            )
            .expect("Failed to register artifacts_loaded"),

            model_info: register_gauge_vec!(
                "churn_service_model_info",
                "Information about the loaded model",
                &["kind", "version"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Handle to the process-wide Prometheus metrics
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, label: &str) {
        self.inner()
            .predictions_total
            .with_label_values(&[label])
            .inc();
    }

    pub fn inc_failures(&self, kind: &str) {
        self.inner()
            .prediction_failures_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Publish readiness and, when loaded, the model identity
    pub fn record_serving_state(&self, state: &ServingState) {
        let inner = self.inner();
        inner.model_info.reset();
        match state.artifacts() {
            Some(artifacts) => {
                inner.artifacts_loaded.set(1);
                inner
                    .model_info
                    .with_label_values(&[artifacts.model().kind(), artifacts.version()])
                    .set(1.0);
            }
            None => inner.artifacts_loaded.set(0),
        }
    }
}

/// Structured logger for service events
///
/// Every line carries an `event` field so log pipelines can filter without
/// parsing messages.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn log_startup(&self, version: &str, port: u16) {
        info!(
            event = "service_started",
            service = %self.service,
            service_version = %version,
            port = port,
            "Churn prediction service started"
        );
    }

    /// Log the outcome of the startup artifact load
    pub fn log_serving_state(&self, state: &ServingState) {
        match state {
            ServingState::Loaded(artifacts) => {
                info!(
                    event = "artifacts_loaded",
                    service = %self.service,
                    model_kind = artifacts.model().kind(),
                    model_version = %artifacts.version(),
                    columns = artifacts.schema().len(),
                    classes = ?artifacts.model().classes(),
                    "Model and training schema loaded"
                );
            }
            ServingState::Unavailable { reason } => {
                error!(
                    event = "artifacts_unavailable",
                    service = %self.service,
                    reason = %reason,
                    "Artifacts failed to load, predictions will be refused"
                );
            }
        }
    }

    pub fn log_prediction(&self, result: &PredictionResult, elapsed_ms: f64) {
        info!(
            event = "prediction_generated",
            service = %self.service,
            label = %result.label,
            churn = result.churn,
            confidence = ?result.confidence.value(),
            model_version = %result.model_version,
            elapsed_ms = elapsed_ms,
            "Generated churn prediction"
        );
    }

    pub fn log_prediction_failure(&self, err: &PipelineError) {
        warn!(
            event = "prediction_failed",
            service = %self.service,
            kind = err.kind(),
            reason = %err.message(),
            "Prediction request rejected"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Churn prediction service shutting down"
        );
    }
}
