//! Origin resolution and inbound request context.
//!
//! A node identifies itself in the loop chain by its externally reachable
//! base URL. When the configured base URL is absolute it is used verbatim;
//! otherwise the origin is rebuilt from the inbound request the same way a
//! reverse proxy presents it, so that a node behind a proxy records the same
//! origin its peers are configured with.

use http::{header::HOST, HeaderMap};

use crate::loop_marker::{LoopChain, LOOP_HEADER};

const FORWARDED_HOST: &str = "x-forwarded-host";
const FORWARDED_PROTO: &str = "x-forwarded-proto";
const DEFAULT_SCHEME: &str = "http";
const DEFAULT_HOST: &str = "localhost";

/// Per-request inputs to loop detection.
///
/// Built by the host from the inbound request and threaded explicitly into
/// every hook; the forwarder never reads ambient request state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Raw `X-Alerta-Loop` header value, if present.
    pub loop_header: Option<String>,
    /// `Host` header.
    pub host: Option<String>,
    /// First `X-Forwarded-Host` value.
    pub forwarded_host: Option<String>,
    /// First `X-Forwarded-Proto` value.
    pub forwarded_proto: Option<String>,
}

impl RequestContext {
    /// Extracts the context from inbound request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        // Non-UTF-8 bytes are replaced rather than dropping the whole value,
        // so the remaining hops still count for loop detection.
        let text = |name: &str| {
            headers.get(name).map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        };

        Self {
            loop_header: text(LOOP_HEADER),
            host: text(HOST.as_str()),
            forwarded_host: text(FORWARDED_HOST).and_then(first_value),
            forwarded_proto: text(FORWARDED_PROTO).and_then(first_value),
        }
    }

    /// Sets the inbound loop header.
    pub fn with_loop_header(mut self, value: impl Into<String>) -> Self {
        self.loop_header = Some(value.into());
        self
    }

    /// Sets the `Host` header.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Decodes the inbound loop chain.
    pub fn chain(&self) -> LoopChain {
        LoopChain::decode(self.loop_header.as_deref())
    }
}

/// First entry of a comma-separated proxy header, as added by proxy chains.
fn first_value(value: String) -> Option<String> {
    value.split(',').next().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Determines this node's identity in the loop chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginResolver {
    /// Same origin for every request.
    Fixed(String),
    /// Origin rebuilt from the request host, under the given base path.
    Request {
        /// Normalized path with a leading slash and no trailing slash, or
        /// empty for the root.
        base_path: String,
    },
}

impl OriginResolver {
    /// Builds a resolver from a configured base URL.
    ///
    /// `http://` and `https://` URLs are fixed origins; anything else is
    /// treated as a path below the request host.
    pub fn from_base_url(base_url: &str) -> Self {
        let base_url = base_url.trim();
        if is_absolute(base_url) {
            return Self::Fixed(base_url.trim_end_matches('/').to_string());
        }

        let path = base_url.trim_matches('/');
        let base_path = if path.is_empty() { String::new() } else { format!("/{path}") };
        Self::Request { base_path }
    }

    /// Creates a resolver that always reports `origin`.
    pub fn fixed(origin: impl Into<String>) -> Self {
        Self::Fixed(origin.into())
    }

    /// Resolves the origin of this node for the given request.
    pub fn resolve(&self, context: &RequestContext) -> String {
        match self {
            Self::Fixed(origin) => origin.clone(),
            Self::Request { base_path } => {
                let scheme = context.forwarded_proto.as_deref().unwrap_or(DEFAULT_SCHEME);
                let host = context
                    .forwarded_host
                    .as_deref()
                    .or(context.host.as_deref())
                    .unwrap_or(DEFAULT_HOST);
                format!("{scheme}://{host}{base_path}")
            },
        }
    }
}

impl Default for OriginResolver {
    fn default() -> Self {
        Self::Request { base_path: String::new() }
    }
}

fn is_absolute(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
