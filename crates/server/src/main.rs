//! Churn Server - HTTP churn prediction service
//!
//! Loads the model and training schema once, then serves predictions until
//! interrupted. A failed load does not stop the process: the service starts
//! unavailable and reports why through `/readyz`.

use anyhow::{Context, Result};
use churn_lib::{
    health::{components, HealthRegistry},
    load_artifacts,
    observability::{ServiceMetrics, StructuredLogger},
    PredictionService, ServingState,
};
use churn_server::{api, config::ServiceConfig};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_NAME: &str = "churn-server";
const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting churn-server");

    let config = ServiceConfig::load().context("failed to load service configuration")?;
    info!(
        port = config.api_port,
        model = %config.model_path.display(),
        schema = %config.schema_path.display(),
        "Service configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::API).await;

    let metrics = ServiceMetrics::new();
    let logger = StructuredLogger::new(SERVICE_NAME);

    // Artifacts are loaded once, before the listener binds
    let state = ServingState::from(load_artifacts(&config.artifact_paths()));
    logger.log_serving_state(&state);
    metrics.record_serving_state(&state);
    health_registry.record_serving_state(&state).await;

    let service = Arc::new(PredictionService::new(state, config.pipeline_config()));
    let app_state = Arc::new(api::AppState::new(
        service,
        health_registry.clone(),
        metrics,
        logger.clone(),
    ));

    logger.log_startup(SERVICE_VERSION, config.api_port);
    let mut api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = &mut api_handle => {
            let reason = match result {
                Ok(Ok(())) => "API server stopped".to_string(),
                Ok(Err(e)) => format!("API server failed: {:#}", e),
                Err(e) => format!("API server task aborted: {}", e),
            };
            health_registry.set_unhealthy(components::API, reason.clone()).await;
            error!(reason = %reason, "API server exited");
            logger.log_shutdown(&reason);
            anyhow::bail!(reason);
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
            api_handle.abort();
        }
    }

    info!("Shutting down");
    Ok(())
}
