//! HTTP server configuration and request routing.
//!
//! Provides the Axum relay that hosts the forwarding hooks. Requests flow
//! through middleware in order:
//! 1. Request ID generation
//! 2. Request/response logging
//! 3. Timeout enforcement
//! 4. Handler execution
//!
//! # Graceful Shutdown
//!
//! The server handles SIGTERM and CTRL+C by stopping accepting new
//! connections and letting in-flight requests, including their fan-out,
//! complete.

use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use forwarder_delivery::{Dispatcher, Forwarder, PeerClient};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

use crate::{config::Config, handlers};

/// Shared state of the relay.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Forwarding hooks of this node.
    pub forwarder: Arc<Forwarder>,
    /// Upper bound for handling one request, fan-out included.
    pub request_timeout: Duration,
}

impl AppState {
    /// Creates state around prepared hooks.
    pub fn new(forwarder: Forwarder, request_timeout: Duration) -> Self {
        Self { forwarder: Arc::new(forwarder), request_timeout }
    }

    /// Builds the peer client, dispatcher and hooks from configuration.
    ///
    /// # Errors
    ///
    /// Fails if the peer HTTP client cannot be constructed.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client =
            PeerClient::new(config.to_client_config()).context("Failed to build peer client")?;
        let dispatcher = Dispatcher::new(Arc::new(client), config.to_dispatch_config());
        let forwarder = Forwarder::new(
            Arc::new(config.destination_table()),
            config.origin_resolver(),
            dispatcher,
        );

        Ok(Self::new(forwarder, Duration::from_secs(config.request_timeout)))
    }
}

/// Creates the Axum router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(handlers::health_check));

    let alert_routes = Router::new()
        .route("/alert", post(handlers::receive_alert))
        .route("/alert/{alert_id}", delete(handlers::delete_alert))
        .route("/alert/{alert_id}/action", put(handlers::take_action));

    Router::new()
        .merge(health_routes)
        .merge(alert_routes)
        .layer(TimeoutLayer::new(state.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(state)
}

/// Middleware to inject request ID into all responses.
///
/// Adds X-Request-Id header for tracing requests across relays.
async fn inject_request_id(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();

    let mut req = req;
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Starts the relay with graceful shutdown support.
///
/// # Errors
///
/// Returns `std::io::Error` if the address cannot be bound.
pub async fn start_server(state: AppState, addr: SocketAddr) -> Result<(), std::io::Error> {
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    serve(listener, state, shutdown_signal()).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Serves the relay on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(
        addr = %listener.local_addr()?,
        destinations = state.forwarder.destination_count(),
        "HTTP server listening"
    );

    axum::serve(listener, create_router(state)).with_graceful_shutdown(shutdown).await
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
