//! Integration tests for the churn-server HTTP endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use churn_lib::{
    artifacts::{load_artifacts, ArtifactPaths},
    health::{components, HealthRegistry},
    observability::{ServiceMetrics, StructuredLogger},
    PipelineConfig, PredictionService, ServingState,
};
use churn_server::api::{create_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const COLUMNS: &str =
    r#"["tenure", "MonthlyCharges", "Contract_Month-to-month", "Contract_Two year"]"#;

/// Month-to-month contracts with short tenure churn
const FOREST: &str = r#"{
    "classes": ["No", "Yes"],
    "n_features": 4,
    "feature_importances": [0.35, 0.15, 0.35, 0.15],
    "trees": [{"nodes": [
        {"feature": 2, "threshold": 0.5, "left": 1, "right": 2},
        {"value": [0.9, 0.1]},
        {"feature": 0, "threshold": 24.0, "left": 3, "right": 4},
        {"value": [0.2, 0.8]},
        {"value": [0.7, 0.3]}
    ]}]
}"#;

fn write_artifacts(dir: &TempDir) -> ArtifactPaths {
    let model = dir.path().join("churn_forest.json");
    let schema = dir.path().join("training_columns.json");
    std::fs::write(&model, FOREST).unwrap();
    std::fs::write(&schema, COLUMNS).unwrap();
    ArtifactPaths {
        model,
        schema,
        model_sha256: None,
    }
}

async fn setup_app(state: ServingState) -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::API).await;
    health_registry.record_serving_state(&state).await;

    let service = Arc::new(PredictionService::new(state, PipelineConfig::default()));
    let app_state = Arc::new(AppState::new(
        service,
        health_registry,
        ServiceMetrics::new(),
        StructuredLogger::new("churn-server-test"),
    ));

    (create_router(app_state.clone()), app_state)
}

async fn loaded_app() -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let paths = write_artifacts(&dir);
    let state = ServingState::from(load_artifacts(&paths));
    assert!(state.is_ready());
    let (router, _) = setup_app(state).await;
    (router, dir)
}

async fn unavailable_app() -> Router {
    let paths = ArtifactPaths {
        model: PathBuf::from("/nonexistent/churn_forest.json"),
        schema: PathBuf::from("/nonexistent/training_columns.json"),
        model_sha256: None,
    };
    let (router, _) = setup_app(ServingState::from(load_artifacts(&paths))).await;
    router
}

fn post_predict(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

const CHURNER: &str = r#"{"tenure": 5, "MonthlyCharges": 70.0, "Contract": "Month-to-month"}"#;

#[tokio::test]
async fn test_predict_returns_result_with_importances() {
    let (app, _dir) = loaded_app().await;

    let response = app.oneshot(post_predict("/predict", CHURNER)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result = json_body(response).await;
    assert_eq!(result["label"], "Yes");
    assert_eq!(result["churn"], true);
    assert_eq!(result["message"], "The customer is likely to churn");
    assert_eq!(result["confidence"], 80.0);
    assert_eq!(result["importances"].as_array().unwrap().len(), 4);
    assert_eq!(result["importances"][0]["feature"], "tenure");
    assert_eq!(result["model_version"].as_str().unwrap().len(), 12);
}

#[tokio::test]
async fn test_predict_query_options() {
    let (app, _dir) = loaded_app().await;

    let response = app
        .oneshot(post_predict(
            "/predict?top_n=1&confidence_format=percent",
            CHURNER,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result = json_body(response).await;
    assert_eq!(result["confidence"], "80.00%");
    assert_eq!(result["importances"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_predict_without_explanation() {
    let (app, _dir) = loaded_app().await;

    let response = app
        .oneshot(post_predict("/predict?explain=false", CHURNER))
        .await
        .unwrap();
    let result = json_body(response).await;
    assert!(result.get("importances").is_none());
}

#[tokio::test]
async fn test_predict_unseen_category_is_not_an_error() {
    let (app, _dir) = loaded_app().await;

    let body = r#"{"tenure": 5, "MonthlyCharges": 70.0, "Contract": "Three year"}"#;
    let response = app.oneshot(post_predict("/predict", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result = json_body(response).await;
    assert_eq!(result["label"], "No");
    assert_eq!(result["confidence"], 90.0);
}

#[tokio::test]
async fn test_predict_malformed_record_returns_400() {
    let (app, _dir) = loaded_app().await;

    let response = app
        .clone()
        .oneshot(post_predict("/predict", r#"{"tenure": [1, 2]}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = json_body(response).await;
    assert_eq!(error["error"], "invalid_input");
    assert_eq!(error["status"], 400);
    assert!(error.get("label").is_none());

    let response = app
        .clone()
        .oneshot(post_predict("/predict", r#"{"tenure": "a while"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_predict("/predict", "not json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = json_body(response).await;
    assert!(error["message"]
        .as_str()
        .unwrap()
        .starts_with("malformed JSON body"));
}

#[tokio::test]
async fn test_predict_bad_query_returns_json_400() {
    let (app, _dir) = loaded_app().await;

    for uri in ["/predict?top_n=abc", "/predict?confidence_format=fraction"] {
        let response = app
            .clone()
            .oneshot(post_predict(uri, CHURNER))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);

        let error = json_body(response).await;
        assert_eq!(error["error"], "invalid_input");
        assert_eq!(error["status"], 400);
        assert!(error["message"]
            .as_str()
            .unwrap()
            .starts_with("invalid query string"));
    }
}

#[tokio::test]
async fn test_predict_unavailable_wins_over_bad_input() {
    let app = unavailable_app().await;

    for (uri, body) in [("/predict", "not json"), ("/predict?top_n=abc", CHURNER)] {
        let response = app.clone().oneshot(post_predict(uri, body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
        assert_eq!(json_body(response).await["error"], "service_unavailable");
    }
}

#[tokio::test]
async fn test_predict_unavailable_returns_503() {
    let app = unavailable_app().await;

    let response = app.oneshot(post_predict("/predict", CHURNER)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let error = json_body(response).await;
    assert_eq!(error["error"], "service_unavailable");
    assert_eq!(error["status"], 503);
    assert!(error["message"]
        .as_str()
        .unwrap()
        .contains("training_columns.json"));
}

#[tokio::test]
async fn test_readyz_reflects_artifact_load() {
    let (app, _dir) = loaded_app().await;
    let response = app.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["ready"], true);

    let app = unavailable_app().await;
    let response = app.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let readiness = json_body(response).await;
    assert_eq!(readiness["ready"], false);
    assert!(readiness["reason"]
        .as_str()
        .unwrap()
        .starts_with("Artifacts not loaded"));
}

#[tokio::test]
async fn test_healthz_includes_component_details() {
    let (app, _dir) = loaded_app().await;

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health = json_body(response).await;
    assert_eq!(health["status"], "healthy");
    assert!(health["components"]["artifacts"].is_object());
    assert!(health["components"]["api"].is_object());
}

#[tokio::test]
async fn test_healthz_returns_503_when_artifacts_missing() {
    let app = unavailable_app().await;

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["status"], "unhealthy");
}

#[tokio::test]
async fn test_model_and_schema_endpoints() {
    let (app, _dir) = loaded_app().await;

    let response = app.clone().oneshot(get("/model")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let model = json_body(response).await;
    assert_eq!(model["kind"], "forest");
    assert_eq!(model["classes"], serde_json::json!(["No", "Yes"]));
    assert_eq!(model["n_features"], 4);
    assert_eq!(model["has_importances"], true);

    let response = app.oneshot(get("/schema")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let schema = json_body(response).await;
    assert_eq!(schema["columns"].as_array().unwrap().len(), 4);
    assert!(schema["categorical_fields"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("Contract")));
}

#[tokio::test]
async fn test_model_endpoint_unavailable() {
    let app = unavailable_app().await;
    let response = app.clone().oneshot(get("/model")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app.oneshot(get("/schema")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, _dir) = loaded_app().await;

    let response = app
        .clone()
        .oneshot(post_predict("/predict", CHURNER))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("churn_service_prediction_latency_seconds_bucket"));
    assert!(metrics_text.contains("churn_service_predictions_total{label=\"Yes\"}"));
}
