//! Health check handler for service monitoring.

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::debug;

use crate::server::AppState;

/// Health check response structure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service health status
    pub status: HealthStatus,
    /// Number of configured forwarding destinations
    pub destinations: usize,
    /// Service version information
    pub version: String,
}

/// Overall health status enumeration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Ready to relay events
    Healthy,
}

/// Liveness endpoint.
///
/// The relay has no backing store, so it is healthy whenever it answers.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let destinations = state.forwarder.destination_count();
    debug!(destinations, "health check");

    Json(HealthResponse {
        status: HealthStatus::Healthy,
        destinations,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
