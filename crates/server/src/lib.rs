//! Churn prediction HTTP service
//!
//! Exposes the prediction pipeline over HTTP alongside health, readiness and
//! Prometheus endpoints.

pub mod api;
pub mod config;
