//! HTTP client for the peer alert API.
//!
//! Implements the three remote capabilities the dispatcher needs: send an
//! alert, trigger an action and delete an alert. Every request carries the
//! outbound loop header and the destination's credentials. Responses are
//! categorized into [`DispatchError`] variants for logging.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use forwarder_core::{Credentials, Destination, LOOP_HEADER};
use reqwest::{
    header::{AUTHORIZATION, LOCATION},
    RequestBuilder, Url,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info_span, warn, Instrument};

use crate::error::{DispatchError, Result};

/// Longest peer message kept in an error, in characters.
const MAX_MESSAGE_CHARS: usize = 512;

/// Configuration for the peer client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Transport timeout for a single request.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Whether to verify TLS certificates.
    pub verify_tls: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECONDS),
            user_agent: format!("forwarder/{}", env!("CARGO_PKG_VERSION")),
            verify_tls: true,
        }
    }
}

/// Peer answer to a forwarded alert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteReceipt {
    /// HTTP status code.
    pub status_code: u16,
    /// `Location` header of the created or updated alert.
    pub location: Option<String>,
    /// Identifier the peer assigned to the alert.
    pub id: Option<String>,
    /// Informational message from the peer.
    pub message: Option<String>,
}

/// Remote capabilities of a federated peer.
///
/// The dispatcher only ever talks to peers through this trait, which keeps
/// fan-out logic testable without a network.
#[async_trait]
pub trait RemoteClient: Send + Sync + std::fmt::Debug {
    /// Creates or updates an alert on the peer.
    async fn send_alert(
        &self,
        destination: &Destination,
        body: &Value,
        loop_header: &str,
    ) -> Result<RemoteReceipt>;

    /// Applies an action to an alert on the peer.
    async fn send_action(
        &self,
        destination: &Destination,
        alert_id: &str,
        action: &str,
        text: &str,
        loop_header: &str,
    ) -> Result<Option<String>>;

    /// Deletes an alert on the peer.
    async fn delete_alert(
        &self,
        destination: &Destination,
        alert_id: &str,
        loop_header: &str,
    ) -> Result<Option<String>>;
}

/// JSON envelope returned by the peer API.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiResponse {
    status: Option<String>,
    id: Option<String>,
    message: Option<String>,
}

/// Body of an action request.
#[derive(Debug, Serialize)]
struct ActionRequest<'a> {
    action: &'a str,
    text: &'a str,
}

/// Decoded peer response.
#[derive(Debug)]
struct PeerResponse {
    status_code: u16,
    location: Option<String>,
    body: ApiResponse,
}

/// reqwest-backed [`RemoteClient`].
///
/// One pooled connection set serves every destination; credentials and the
/// loop header are applied per request.
#[derive(Debug, Clone)]
pub struct PeerClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl PeerClient {
    /// Creates a new peer client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::ConfigurationError` if the HTTP client cannot
    /// be configured with the provided settings.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| {
                DispatchError::configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    /// Creates a new peer client with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Sends a prepared request and interprets the peer response.
    async fn execute(&self, request: RequestBuilder) -> Result<PeerResponse> {
        let start_time = Instant::now();

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(duration_ms = start_time.elapsed().as_millis(), "request failed: {}", e);

                if e.is_timeout() {
                    return Err(DispatchError::timeout(duration_millis(self.config.timeout)));
                }
                if e.is_connect() {
                    return Err(DispatchError::network(format!("connection failed: {e}")));
                }
                return Err(DispatchError::network(e.to_string()));
            },
        };

        let status_code = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let text = response.text().await.map_err(|e| {
            DispatchError::invalid_response(format!("failed to read response body: {e}"))
        })?;

        debug!(
            status = status_code,
            duration_ms = start_time.elapsed().as_millis(),
            "received peer response"
        );

        // Peers may answer with an empty or non-JSON body (proxies, 204s).
        let body: ApiResponse = serde_json::from_str(&text).unwrap_or_default();

        match status_code {
            200..=299 => {},
            400..=499 => {
                return Err(DispatchError::client_error(status_code, peer_message(&body, &text)));
            },
            500..=599 => {
                return Err(DispatchError::server_error(status_code, peer_message(&body, &text)));
            },
            _ => {
                return Err(DispatchError::invalid_response(format!(
                    "unexpected status code {status_code}"
                )));
            },
        }

        if body.status.as_deref() == Some("error") {
            return Err(DispatchError::rejected(peer_message(&body, &text)));
        }

        Ok(PeerResponse { status_code, location, body })
    }
}

#[async_trait]
impl RemoteClient for PeerClient {
    async fn send_alert(
        &self,
        destination: &Destination,
        body: &Value,
        loop_header: &str,
    ) -> Result<RemoteReceipt> {
        let url = endpoint_url(&destination.endpoint, &["alert"])?;
        let span = info_span!("peer_request", method = "POST", url = %url);

        async move {
            let request = self.client.post(url).header(LOOP_HEADER, loop_header).json(body);
            let response = self.execute(authorize(request, &destination.credentials)).await?;

            Ok(RemoteReceipt {
                status_code: response.status_code,
                location: response.location,
                id: response.body.id,
                message: response.body.message,
            })
        }
        .instrument(span)
        .await
    }

    async fn send_action(
        &self,
        destination: &Destination,
        alert_id: &str,
        action: &str,
        text: &str,
        loop_header: &str,
    ) -> Result<Option<String>> {
        let url = endpoint_url(&destination.endpoint, &["alert", alert_id, "action"])?;
        let span = info_span!("peer_request", method = "PUT", url = %url);

        async move {
            let request = self
                .client
                .put(url)
                .header(LOOP_HEADER, loop_header)
                .json(&ActionRequest { action, text });
            let response = self.execute(authorize(request, &destination.credentials)).await?;
            Ok(response.body.message)
        }
        .instrument(span)
        .await
    }

    async fn delete_alert(
        &self,
        destination: &Destination,
        alert_id: &str,
        loop_header: &str,
    ) -> Result<Option<String>> {
        let url = endpoint_url(&destination.endpoint, &["alert", alert_id])?;
        let span = info_span!("peer_request", method = "DELETE", url = %url);

        async move {
            let request = self.client.delete(url).header(LOOP_HEADER, loop_header);
            let response = self.execute(authorize(request, &destination.credentials)).await?;
            Ok(response.body.message)
        }
        .instrument(span)
        .await
    }
}

/// Joins path segments onto a destination endpoint, percent-encoding each.
fn endpoint_url(endpoint: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(endpoint).map_err(|e| {
        DispatchError::configuration(format!("invalid endpoint {endpoint}: {e}"))
    })?;

    url.path_segments_mut()
        .map_err(|()| DispatchError::configuration(format!("endpoint {endpoint} cannot be a base")))?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}

/// Applies destination credentials to a request.
fn authorize(request: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
    if let Some(key) = &credentials.key {
        request.header(AUTHORIZATION, format!("Key {key}"))
    } else if let Some(token) = &credentials.token {
        request.bearer_auth(token)
    } else if let Some(username) = &credentials.username {
        request.basic_auth(username, credentials.password.as_ref())
    } else {
        request
    }
}

/// Prefers the peer's JSON message, falling back to the raw body.
fn peer_message(body: &ApiResponse, text: &str) -> String {
    let message = body.message.as_deref().unwrap_or(text);
    if message.chars().count() > MAX_MESSAGE_CHARS {
        let truncated: String = message.chars().take(MAX_MESSAGE_CHARS).collect();
        format!("{truncated}... (truncated)")
    } else {
        message.to_string()
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
