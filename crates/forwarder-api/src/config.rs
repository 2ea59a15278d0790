//! Configuration management for the forwarding relay.

use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use forwarder_core::{loop_marker::SEPARATOR, Destination, DestinationTable, OriginResolver};
use forwarder_delivery::{ClientConfig, DispatchConfig};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "forwarder.toml";

/// Log filter used when neither `RUST_LOG` nor the file sets one.
pub const DEFAULT_LOG_FILTER: &str = "info,forwarder=debug,tower_http=debug";

/// Environment variable holding the destination list as JSON.
pub const DESTINATIONS_ENV: &str = "FWD_DESTINATIONS";

/// Complete relay configuration with defaults, file, and environment
/// overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`forwarder.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// Destinations come from `[[destinations]]` tables in the file, or from
/// `FWD_DESTINATIONS` as a JSON list of records or
/// `[endpoint, credentials, actions]` tuples.
///
/// # Example
///
/// ```no_run
/// use forwarder_api::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
///
/// println!("Relay will bind to {}:{}", config.host, config.port);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server
    /// Server bind address.
    ///
    /// Environment variable: `HOST`
    #[serde(default = "default_host", alias = "HOST")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `PORT`
    #[serde(default = "default_port", alias = "PORT")]
    pub port: u16,
    /// HTTP request timeout in seconds.
    ///
    /// Environment variable: `REQUEST_TIMEOUT`
    #[serde(default = "default_request_timeout", alias = "REQUEST_TIMEOUT")]
    pub request_timeout: u64,
    /// Externally reachable base URL of this node, or a path below the
    /// request host when not absolute.
    ///
    /// Environment variable: `BASE_URL`
    #[serde(default, alias = "BASE_URL")]
    pub base_url: String,

    // Forwarding
    /// Per-destination timeout in seconds.
    ///
    /// Environment variable: `FORWARD_TIMEOUT_SECONDS`
    #[serde(default = "default_forward_timeout", alias = "FORWARD_TIMEOUT_SECONDS")]
    pub forward_timeout_seconds: u64,
    /// Maximum concurrent peer calls per event; 0 means one per destination.
    ///
    /// Environment variable: `FORWARD_MAX_CONCURRENCY`
    #[serde(default, alias = "FORWARD_MAX_CONCURRENCY")]
    pub forward_max_concurrency: usize,
    /// Whether peer TLS certificates are verified.
    ///
    /// Environment variable: `VERIFY_TLS`
    #[serde(default = "default_verify_tls", alias = "VERIFY_TLS")]
    pub verify_tls: bool,
    /// Peers that receive forwarded events.
    ///
    /// Environment variable: `FWD_DESTINATIONS` (JSON)
    #[serde(default)]
    pub destinations: Vec<Destination>,

    // Logging
    /// Log filter directives.
    ///
    /// Environment variable: `RUST_LOG`
    #[serde(default = "default_log_level", alias = "RUST_LOG")]
    pub rust_log: String,
}

impl Config {
    /// Load configuration from defaults, config file, and environment variable
    /// overrides.
    ///
    /// # Errors
    ///
    /// Fails if a source cannot be parsed or the result does not validate.
    pub fn load() -> Result<Self> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed("").ignore(&[DESTINATIONS_ENV]));

        if let Ok(raw) = std::env::var(DESTINATIONS_ENV) {
            let destinations: Vec<Destination> = serde_json::from_str(&raw)
                .with_context(|| format!("{DESTINATIONS_ENV} must be a JSON list"))?;
            figment = figment.merge(Serialized::default("destinations", destinations));
        }

        Self::extract(&figment)
    }

    /// Extracts and validates configuration from a prepared figment.
    pub fn extract(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Convert to peer client configuration.
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.forward_timeout_seconds),
            user_agent: format!("forwarder/{}", env!("CARGO_PKG_VERSION")),
            verify_tls: self.verify_tls,
        }
    }

    /// Convert to dispatcher configuration.
    pub fn to_dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            timeout: Duration::from_secs(self.forward_timeout_seconds),
            max_concurrency: self.forward_max_concurrency,
        }
    }

    /// Resolver for this node's loop-chain identity.
    pub fn origin_resolver(&self) -> OriginResolver {
        OriginResolver::from_base_url(&self.base_url)
    }

    /// Destination table in configuration order.
    pub fn destination_table(&self) -> DestinationTable {
        DestinationTable::new(self.destinations.clone())
    }

    /// Parse server socket address from host and port configuration.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.request_timeout == 0 {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if self.forward_timeout_seconds == 0 {
            anyhow::bail!("forward_timeout_seconds must be greater than 0");
        }

        if self.base_url.contains(SEPARATOR) {
            anyhow::bail!("base_url must not contain '{SEPARATOR}'");
        }

        if !self.base_url.is_ascii() {
            anyhow::bail!("base_url must be ASCII; use the punycode form of the host");
        }

        for destination in &self.destinations {
            let endpoint = destination.endpoint.as_str();
            if endpoint.is_empty() {
                anyhow::bail!("destination endpoint must not be empty");
            }
            if endpoint.contains(SEPARATOR) {
                anyhow::bail!("destination endpoint {endpoint} must not contain '{SEPARATOR}'");
            }
            if !endpoint.is_ascii() {
                anyhow::bail!("destination endpoint {endpoint} must be ASCII");
            }
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                anyhow::bail!("destination endpoint {endpoint} must be an http(s) URL");
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            base_url: String::new(),
            forward_timeout_seconds: default_forward_timeout(),
            forward_max_concurrency: forwarder_delivery::DEFAULT_MAX_CONCURRENCY,
            verify_tls: default_verify_tls(),
            destinations: Vec::new(),
            rust_log: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_forward_timeout() -> u64 {
    forwarder_delivery::DEFAULT_TIMEOUT_SECONDS
}

fn default_verify_tls() -> bool {
    true
}

fn default_log_level() -> String {
    DEFAULT_LOG_FILTER.to_string()
}
