//! Request extractors.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use forwarder_core::RequestContext;

/// Loop-detection context of the inbound request.
///
/// Captures the `X-Alerta-Loop` chain together with the host and proxy
/// headers used to resolve this node's origin. Never rejects: missing
/// headers simply yield an empty chain and default origin inputs.
#[derive(Debug, Clone, Default)]
pub struct Inbound(pub RequestContext);

impl<S> FromRequestParts<S> for Inbound
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(RequestContext::from_headers(&parts.headers)))
    }
}
