//! Health check infrastructure for the prediction service
//!
//! Readiness follows the startup artifact load: a service whose model or
//! schema failed to load stays up for `/healthz` but reports not ready.

use crate::artifacts::ServingState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Unhealthy,
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }

    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    fn is_healthy(&self) -> bool {
        self.status == ComponentStatus::Healthy
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Unhealthy as soon as one component is
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        if components.values().all(ComponentHealth::is_healthy) {
            ComponentStatus::Healthy
        } else {
            ComponentStatus::Unhealthy
        }
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    /// Model and training schema
    pub const ARTIFACTS: &str = "artifacts";
    /// HTTP prediction endpoint
    pub const API: &str = "api";
}

/// Component health shared between the server task and the probe handlers
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components.write().await.insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Reflect the startup load: healthy, or unhealthy with the failure reason
    pub async fn record_serving_state(&self, state: &ServingState) {
        match state.unavailable_reason() {
            None => self.set_healthy(components::ARTIFACTS).await,
            Some(reason) => self.set_unhealthy(components::ARTIFACTS, reason).await,
        }
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    /// Ready once the artifacts are recorded as loaded and nothing else failed
    pub async fn readiness(&self) -> ReadinessResponse {
        let health = self.health().await;

        let reason = match health.components.get(components::ARTIFACTS) {
            None => Some("Service not yet initialized".to_string()),
            Some(artifacts) if !artifacts.is_healthy() => Some(format!(
                "Artifacts not loaded: {}",
                artifacts.message.as_deref().unwrap_or("unknown error")
            )),
            Some(_) if health.status == ComponentStatus::Unhealthy => {
                Some("Critical component unhealthy".to_string())
            }
            Some(_) => None,
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}
