//! Alert endpoints running the forwarding hooks.
//!
//! The relay owns no alert storage: a received alert is accepted as-is
//! (with an identifier assigned when missing) and forwarded; actions and
//! deletes address alerts by identifier only.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use forwarder_core::{Alert, ForwarderError};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, Span};
use uuid::Uuid;

use crate::{extract::Inbound, server::AppState};

/// Request body for an alert action.
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    /// Action name, e.g. `ack` or `close`
    pub action: String,
    /// Free-form text recorded with the action
    #[serde(default)]
    pub text: String,
}

/// Response for a received alert.
#[derive(Debug, Serialize)]
pub struct AlertResponse {
    /// Always `ok`
    pub status: &'static str,
    /// Identifier of the accepted alert
    pub id: String,
    /// The alert as forwarded
    pub alert: Alert,
}

/// Plain status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Always `ok`
    pub status: &'static str,
    /// Informational message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    fn ok() -> Self {
        Self { status: "ok", message: None }
    }
}

/// Receives an alert and forwards it to every eligible destination.
///
/// Returns `201` with the accepted alert, or `202` if the alert already
/// passed through this node.
#[instrument(name = "receive_alert", skip_all, fields(alert_id))]
pub async fn receive_alert(
    State(state): State<AppState>,
    Inbound(context): Inbound,
    Json(mut alert): Json<Alert>,
) -> Response {
    if alert.id.is_empty() {
        alert.id = Uuid::new_v4().to_string();
    }
    Span::current().record("alert_id", alert.id.as_str());

    let alert = match state.forwarder.pre_receive(alert, &context) {
        Ok(alert) => alert,
        Err(e) => return loop_response(&e),
    };

    let alert = state.forwarder.post_receive(alert, &context).await;
    info!("alert accepted");

    (StatusCode::CREATED, Json(AlertResponse { status: "ok", id: alert.id.clone(), alert }))
        .into_response()
}

/// Forwards an action applied to an alert.
#[instrument(name = "take_action", skip_all, fields(alert_id = %alert_id, action = %request.action))]
pub async fn take_action(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
    Inbound(context): Inbound,
    Json(request): Json<ActionRequest>,
) -> Response {
    let result = state
        .forwarder
        .take_action(Alert::new(alert_id), &request.action, &request.text, &context)
        .await;

    match result {
        Ok(_) => (StatusCode::OK, Json(StatusResponse::ok())).into_response(),
        Err(e) => loop_response(&e),
    }
}

/// Forwards an alert delete.
#[instrument(name = "delete_alert", skip_all, fields(alert_id = %alert_id))]
pub async fn delete_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
    Inbound(context): Inbound,
) -> Response {
    match state.forwarder.delete(&Alert::new(alert_id), &context).await {
        Ok(_) => (StatusCode::OK, Json(StatusResponse::ok())).into_response(),
        Err(e) => loop_response(&e),
    }
}

/// Acknowledges an event that already passed through this node.
fn loop_response(error: &ForwarderError) -> Response {
    let body = StatusResponse { status: "ok", message: Some(error.to_string()) };
    (StatusCode::ACCEPTED, Json(body)).into_response()
}
