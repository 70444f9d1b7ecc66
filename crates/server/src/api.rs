//! HTTP API for predictions, artifact introspection, health checks and metrics

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use churn_lib::{
    health::{ComponentStatus, HealthRegistry},
    models::{ClientRecord, ConfidenceFormat, PredictionResult},
    observability::{ServiceMetrics, StructuredLogger},
    PipelineError, PredictOptions, PredictionService,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        service: Arc<PredictionService>,
        health_registry: HealthRegistry,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            service,
            health_registry,
            metrics,
            logger,
        }
    }
}

/// Pipeline failure rendered as a JSON error body
#[derive(Debug)]
pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PipelineError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.0.kind(),
            "message": self.0.message(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// Query parameters accepted by `POST /predict`
#[derive(Debug, Default, Deserialize)]
pub struct PredictQuery {
    pub top_n: Option<usize>,
    pub explain: Option<bool>,
    pub confidence_format: Option<ConfidenceFormat>,
}

impl From<PredictQuery> for PredictOptions {
    fn from(query: PredictQuery) -> Self {
        let defaults = PredictOptions::default();
        PredictOptions {
            top_n: query.top_n,
            explain: query.explain.unwrap_or(defaults.explain),
            confidence_format: query.confidence_format.unwrap_or(defaults.confidence_format),
        }
    }
}

/// Loaded model description returned by `GET /model`
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub kind: String,
    pub version: String,
    pub classes: Vec<String>,
    pub n_features: usize,
    pub has_importances: bool,
}

/// Training layout returned by `GET /schema`
#[derive(Debug, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub columns: Vec<String>,
    pub categorical_fields: Vec<String>,
}

/// Classify one client record
async fn predict(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PredictQuery>, QueryRejection>,
    body: Bytes,
) -> Result<Json<PredictionResult>, ApiError> {
    let start = Instant::now();
    let outcome = run_prediction(&state, query, &body);

    match outcome {
        Ok(result) => {
            let elapsed = start.elapsed();
            state.metrics.observe_prediction_latency(elapsed.as_secs_f64());
            state.metrics.inc_predictions(&result.label);
            state
                .logger
                .log_prediction(&result, elapsed.as_secs_f64() * 1000.0);
            Ok(Json(result))
        }
        Err(err) => {
            state.metrics.inc_failures(err.kind());
            state.logger.log_prediction_failure(&err);
            Err(err.into())
        }
    }
}

/// Readiness first, then the query, then the body
fn run_prediction(
    state: &AppState,
    query: Result<Query<PredictQuery>, QueryRejection>,
    body: &[u8],
) -> Result<PredictionResult, PipelineError> {
    state.service.artifacts()?;
    let Query(query) = query.map_err(|e| {
        PipelineError::InvalidInput(format!("invalid query string: {}", e.body_text()))
    })?;
    let record = parse_record(body)?;
    state.service.predict(&record, &PredictOptions::from(query))
}

fn parse_record(body: &[u8]) -> Result<ClientRecord, PipelineError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| PipelineError::InvalidInput(format!("malformed JSON body: {}", e)))?;
    ClientRecord::from_json(&value)
}

async fn model_info(State(state): State<Arc<AppState>>) -> Result<Json<ModelInfo>, ApiError> {
    let artifacts = state.service.artifacts()?;
    let model = artifacts.model();

    Ok(Json(ModelInfo {
        kind: model.kind().to_string(),
        version: artifacts.version().to_string(),
        classes: model.classes().to_vec(),
        n_features: model.n_features(),
        has_importances: model.feature_importances().is_some(),
    }))
}

async fn schema_info(State(state): State<Arc<AppState>>) -> Result<Json<SchemaInfo>, ApiError> {
    let artifacts = state.service.artifacts()?;

    Ok(Json(SchemaInfo {
        columns: artifacts.schema().columns().to_vec(),
        categorical_fields: state
            .service
            .reconciler()
            .categorical_fields()
            .into_iter()
            .map(str::to_string)
            .collect(),
    }))
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 once artifacts are loaded, 503 otherwise
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/model", get(model_info))
        .route("/schema", get(schema_info))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
