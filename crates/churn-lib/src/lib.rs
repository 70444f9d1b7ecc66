//! Core library for telecom churn prediction
//!
//! This crate provides the core functionality for:
//! - Loading the training schema and a pre-trained tree-ensemble classifier
//! - Reconciling client records into the training feature layout
//! - Inference, feature importance ranking and response assembly
//! - Health checks and observability

pub mod artifacts;
pub mod errors;
pub mod health;
pub mod model;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod schema;

pub use artifacts::{load_artifacts, ArtifactPaths, Artifacts, LoadResult, ServingState};
pub use errors::{ArtifactLoadError, ModelError, PipelineError, PipelineResult};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use model::{load_model, ChurnModel};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use pipeline::{PipelineConfig, PredictOptions, PredictionService};
pub use schema::TrainingSchema;
