//! Domain models for forwarding destinations and alert events.
//!
//! Destinations are fixed-shape records loaded from host configuration once
//! per request. Alerts are owned by the host; the forwarder only reads their
//! identifier and a serializable body through [`AlertRecord`].

use std::{collections::BTreeSet, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Read access the forwarder needs to a host-owned alert.
pub trait AlertRecord: Send + Sync {
    /// Unique alert identifier.
    fn id(&self) -> &str;

    /// JSON body sent to peers when forwarding the alert.
    fn body(&self) -> Value;
}

/// Alert as received over the wire.
///
/// Only `id` is interpreted; every other attribute is carried through
/// untouched so peers receive the alert exactly as it arrived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Alert identifier; empty until the host assigns one.
    #[serde(default)]
    pub id: String,
    /// Remaining alert attributes.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Alert {
    /// Creates an alert with the given identifier and no attributes.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), attributes: Map::new() }
    }

    /// Adds an attribute, replacing any previous value.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

impl AlertRecord for Alert {
    fn id(&self) -> &str {
        &self.id
    }

    fn body(&self) -> Value {
        let mut body = self.attributes.clone();
        body.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(body)
    }
}

/// Operation being forwarded, as seen by the action gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'a> {
    /// Alert create/update.
    Forward,
    /// Action with the given name.
    Action(&'a str),
    /// Alert delete.
    Delete,
}

impl fmt::Display for Operation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Action(action) => write!(f, "action:{action}"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Set of operation tokens a destination accepts.
///
/// Tokens are compared verbatim: `*` permits everything, `fwd` permits
/// create/update, `actions` permits every action and deletes, `delete`
/// permits deletes, and any other token names a single action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermittedOperations(BTreeSet<String>);

impl PermittedOperations {
    /// Token permitting every operation.
    pub const WILDCARD: &'static str = "*";
    /// Token permitting alert create/update.
    pub const FORWARD: &'static str = "fwd";
    /// Token permitting every action and deletes.
    pub const ACTIONS: &'static str = "actions";
    /// Token permitting deletes.
    pub const DELETE: &'static str = "delete";

    /// Returns `true` if the exact token is present.
    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    /// Returns `true` if any of the tokens is present.
    pub fn contains_any(&self, tokens: &[&str]) -> bool {
        tokens.iter().any(|token| self.contains(token))
    }

    /// Returns `true` if no operation is permitted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the tokens in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PermittedOperations {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Credentials attached to every request sent to a destination.
///
/// Treated as an opaque bundle by the forwarder; only the peer client
/// interprets it.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// API key, sent as `Authorization: Key <key>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Basic auth user name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Basic auth password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Credentials {
    /// Credentials using an API key.
    pub fn api_key(key: impl Into<String>) -> Self {
        Self { key: Some(key.into()), ..Self::default() }
    }

    /// Returns `true` if no credential is configured.
    pub fn is_empty(&self) -> bool {
        self.key.is_none()
            && self.token.is_none()
            && self.username.is_none()
            && self.password.is_none()
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |value: &Option<String>| value.as_ref().map(|_| "***");
        f.debug_struct("Credentials")
            .field("key", &mask(&self.key))
            .field("token", &mask(&self.token))
            .field("username", &self.username)
            .field("password", &mask(&self.password))
            .finish()
    }
}

/// Remote peer eligible to receive forwarded events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DestinationSpec")]
pub struct Destination {
    /// Base URL of the peer API; also the identifier matched against the
    /// loop chain.
    pub endpoint: String,
    /// Credentials for the peer.
    #[serde(default, skip_serializing_if = "Credentials::is_empty")]
    pub credentials: Credentials,
    /// Operations this peer accepts.
    #[serde(rename = "actions")]
    pub operations: PermittedOperations,
}

impl Destination {
    /// Creates a destination without credentials.
    ///
    /// Surrounding whitespace and trailing slashes are removed from the
    /// endpoint so it compares equal to the origin the peer records.
    pub fn new<I, S>(endpoint: impl Into<String>, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let endpoint = endpoint.into();
        Self {
            endpoint: endpoint.trim().trim_end_matches('/').to_string(),
            credentials: Credentials::default(),
            operations: operations.into_iter().collect(),
        }
    }

    /// Attaches credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }
}

/// Accepted configuration shapes for a destination.
///
/// Hosts historically configure destinations as
/// `[endpoint, {credentials}, [actions]]` tuples; the record form is
/// preferred.
#[derive(Deserialize)]
#[serde(untagged)]
enum DestinationSpec {
    Record {
        endpoint: String,
        #[serde(default, alias = "auth")]
        credentials: Credentials,
        #[serde(default, alias = "operations")]
        actions: Vec<String>,
    },
    Tuple(String, Credentials, Vec<String>),
}

impl From<DestinationSpec> for Destination {
    fn from(spec: DestinationSpec) -> Self {
        let (endpoint, credentials, actions) = match spec {
            DestinationSpec::Record { endpoint, credentials, actions } => {
                (endpoint, credentials, actions)
            },
            DestinationSpec::Tuple(endpoint, credentials, actions) => {
                (endpoint, credentials, actions)
            },
        };
        Self::new(endpoint, actions).with_credentials(credentials)
    }
}

/// Ordered, immutable list of forwarding destinations.
///
/// Cloning is cheap; a table is handed out once per request and never
/// mutated while a dispatch is running.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationTable {
    destinations: Arc<[Destination]>,
}

impl DestinationTable {
    /// Creates a table preserving the given order.
    pub fn new(destinations: Vec<Destination>) -> Self {
        Self { destinations: destinations.into() }
    }

    /// Iterates destinations in configuration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Destination> {
        self.destinations.iter()
    }

    /// Number of configured destinations.
    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    /// Returns `true` if forwarding is not configured.
    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}

impl From<Vec<Destination>> for DestinationTable {
    fn from(destinations: Vec<Destination>) -> Self {
        Self::new(destinations)
    }
}

impl<'a> IntoIterator for &'a DestinationTable {
    type Item = &'a Destination;
    type IntoIter = std::slice::Iter<'a, Destination>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Host-provided source of the destination list.
///
/// Consulted at the start of every hook so configuration changes apply to
/// the next event without restarting the forwarder.
pub trait DestinationSource: Send + Sync + fmt::Debug {
    /// Loads the destination table for one request.
    fn load(&self) -> DestinationTable;
}

impl DestinationSource for DestinationTable {
    fn load(&self) -> DestinationTable {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn alert_body_carries_id_and_attributes() {
        let alert = Alert::new("a1").with_attribute("resource", "web01");
        assert_eq!(alert.body(), json!({"id": "a1", "resource": "web01"}));
    }

    #[test]
    fn alert_without_id_deserializes_empty() {
        let alert: Alert = serde_json::from_value(json!({"event": "down"})).unwrap();
        assert!(alert.id.is_empty());
        assert_eq!(alert.attributes.get("event"), Some(&json!("down")));
    }

    #[test]
    fn destination_deserializes_from_record() {
        let destination: Destination = serde_json::from_value(json!({
            "endpoint": "http://peer:8080/api",
            "credentials": {"key": "secret"},
            "actions": ["fwd", "ack"]
        }))
        .unwrap();

        assert_eq!(destination.endpoint, "http://peer:8080/api");
        assert_eq!(destination.credentials, Credentials::api_key("secret"));
        assert!(destination.operations.contains("fwd"));
        assert!(destination.operations.contains("ack"));
    }

    #[test]
    fn destination_deserializes_from_tuple() {
        let destination: Destination =
            serde_json::from_value(json!(["http://peer:8080/api", {"token": "t"}, ["*"]]))
                .unwrap();

        assert_eq!(destination.endpoint, "http://peer:8080/api");
        assert_eq!(destination.credentials.token.as_deref(), Some("t"));
        assert!(destination.operations.contains(PermittedOperations::WILDCARD));
    }

    #[test]
    fn destination_endpoint_drops_trailing_slash() {
        let destination: Destination =
            serde_json::from_value(json!(["http://node-b/api/", {}, ["*"]])).unwrap();
        assert_eq!(destination.endpoint, "http://node-b/api");
        assert_eq!(Destination::new(" http://node-b/ ", ["*"]).endpoint, "http://node-b");
    }

    #[test]
    fn destination_serializes_as_record() {
        let destination = Destination::new("http://peer", ["fwd"]);
        let value = serde_json::to_value(&destination).unwrap();
        assert_eq!(value, json!({"endpoint": "http://peer", "actions": ["fwd"]}));

        let back: Destination = serde_json::from_value(value).unwrap();
        assert_eq!(back, destination);
    }

    #[test]
    fn credentials_debug_masks_secrets() {
        let credentials = Credentials {
            username: Some("ops".to_string()),
            password: Some("hunter2".to_string()),
            ..Credentials::api_key("secret")
        };
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("secret"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("ops"));
    }

    #[test]
    fn table_preserves_configuration_order() {
        let table = DestinationTable::new(vec![
            Destination::new("http://b", ["*"]),
            Destination::new("http://a", ["*"]),
        ]);
        let endpoints: Vec<&str> = table.iter().map(|d| d.endpoint.as_str()).collect();
        assert_eq!(endpoints, vec!["http://b", "http://a"]);
        assert_eq!(table.load(), table);
    }
}
