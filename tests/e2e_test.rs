//! End-to-end tests for federated relays.
//!
//! Runs real relays on ephemeral ports that forward to each other and to a
//! `wiremock` observer, then checks that events cross the federation once
//! and that rings terminate.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use forwarder_api::{serve, AppState, Config};
use forwarder_core::Destination;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use wiremock::{matchers, Mock, MockServer, Request, ResponseTemplate};

/// Relay bound to an ephemeral port, not yet serving.
struct PendingRelay {
    listener: TcpListener,
    origin: String,
}

impl PendingRelay {
    async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let origin = format!("http://{}", listener.local_addr().unwrap());
        Self { listener, origin }
    }

    /// Starts serving with the given destinations; the origin is resolved
    /// from the `Host` header peers send.
    fn start(self, destinations: Vec<Destination>) -> String {
        let config = Config { destinations, forward_timeout_seconds: 5, ..Config::default() };
        let state = AppState::from_config(&config).unwrap();
        tokio::spawn(serve(self.listener, state, std::future::pending()));
        self.origin
    }
}

/// Observer peer mounted below `/observer` so its endpoint never matches a
/// relay origin by prefix.
async fn observer() -> (MockServer, String) {
    let server = MockServer::start().await;
    Mock::given(matchers::any())
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;
    let endpoint = format!("{}/observer", server.uri());
    (server, endpoint)
}

fn loop_header(request: &Request) -> Option<String> {
    request.headers.get("X-Alerta-Loop").map(|v| v.to_str().unwrap().to_string())
}

#[tokio::test]
async fn alert_crosses_two_relays_once() {
    let (observer, observer_endpoint) = observer().await;
    let relay_a = PendingRelay::bind().await;
    let relay_b = PendingRelay::bind().await;
    let (origin_a, origin_b) = (relay_a.origin.clone(), relay_b.origin.clone());

    relay_a.start(vec![Destination::new(origin_b.clone(), ["*"])]);
    relay_b.start(vec![
        Destination::new(origin_a.clone(), ["*"]),
        Destination::new(observer_endpoint, ["fwd"]),
    ]);

    let response = reqwest::Client::new()
        .post(format!("{origin_a}/alert"))
        .json(&json!({"id": "a1", "resource": "web01", "event": "node_down"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let requests = observer.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.path(), "/observer/alert");
    assert_eq!(loop_header(&requests[0]), Some(format!("{origin_a},{origin_b}")));

    let forwarded: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(forwarded, json!({"id": "a1", "resource": "web01", "event": "node_down"}));
}

#[tokio::test]
async fn looped_alert_stops_at_relay() {
    let (observer, observer_endpoint) = observer().await;
    let relay = PendingRelay::bind().await;
    let origin = relay.origin.clone();
    relay.start(vec![Destination::new(observer_endpoint, ["*"])]);

    let response = reqwest::Client::new()
        .post(format!("{origin}/alert"))
        .header("X-Alerta-Loop", format!("http://elsewhere.test,{origin}"))
        .json(&json!({"id": "a1"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 202);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], format!("alert a1 already processed by {origin}"));
    assert!(observer.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn self_destination_cut_after_one_hop() {
    let (observer, observer_endpoint) = observer().await;
    let relay = PendingRelay::bind().await;
    let origin = relay.origin.clone();
    relay.start(vec![
        Destination::new(origin.clone(), ["*"]),
        Destination::new(observer_endpoint, ["*"]),
    ]);

    let response = reqwest::Client::new()
        .post(format!("{origin}/alert"))
        .json(&json!({"id": "a1"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 201);
    let requests = observer.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(loop_header(&requests[0]), Some(origin));
}

#[tokio::test]
async fn action_and_delete_travel_through_ring() {
    let (observer, observer_endpoint) = observer().await;
    let relay_a = PendingRelay::bind().await;
    let relay_b = PendingRelay::bind().await;
    let (origin_a, origin_b) = (relay_a.origin.clone(), relay_b.origin.clone());

    relay_a.start(vec![Destination::new(origin_b.clone(), ["actions"])]);
    relay_b.start(vec![
        Destination::new(origin_a.clone(), ["*"]),
        Destination::new(observer_endpoint, ["ack", "delete"]),
    ]);

    let client = reqwest::Client::new();
    let response = client
        .put(format!("{origin_a}/alert/a1/action"))
        .json(&json!({"action": "ack", "text": "on it"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client.delete(format!("{origin_a}/alert/a1")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let requests = observer.received_requests().await.unwrap();
    let seen: Vec<(String, String)> = requests
        .iter()
        .map(|r| (r.method.as_str().to_string(), r.url.path().to_string()))
        .collect();
    assert_eq!(
        seen,
        vec![
            ("PUT".to_string(), "/observer/alert/a1/action".to_string()),
            ("DELETE".to_string(), "/observer/alert/a1".to_string()),
        ]
    );

    let action: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(action, json!({"action": "ack", "text": "on it"}));
    for request in &requests {
        assert_eq!(loop_header(request), Some(format!("{origin_a},{origin_b}")));
    }
}
