//! Fan-out delivery of local alert events to federated peers.
//!
//! This crate turns a local event (alert create/update, action, delete) into
//! independent remote calls against every configured destination, while
//! extending the `X-Alerta-Loop` chain so a ring of peers never forwards the
//! same event twice.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐   ┌──────────────┐   ┌─────────────┐
//! │ Hook adapters │──▶│ Dispatcher   │──▶│ Peer client │
//! │ (Forwarder)   │   │ (fan-out)    │   │ (reqwest)   │
//! └───────────────┘   └──────────────┘   └─────────────┘
//!        │                   │                   │
//!        ▼                   ▼                   ▼
//! ┌───────────────┐   ┌──────────────┐   ┌─────────────┐
//! │ Loop guard    │   │ Action gate  │   │ Destination │
//! │ (reject)      │   │ (skip)       │   │ peers       │
//! └───────────────┘   └──────────────┘   └─────────────┘
//! ```
//!
//! # Key Features
//!
//! - **Loop safety** - the guard rejects events this node already handled and
//!   the gate skips every destination already in the chain
//! - **Failure isolation** - a failing or slow peer is logged and dropped; it
//!   never fails the hook or delays other peers beyond its own timeout
//! - **Bounded concurrency** - calls run concurrently, results are reported in
//!   destination order
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use forwarder_core::{Alert, Destination, DestinationTable, OriginResolver, RequestContext};
//! use forwarder_delivery::{DispatchConfig, Dispatcher, Forwarder, PeerClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let table = DestinationTable::new(vec![Destination::new("http://peer:8080", ["*"])]);
//! let dispatcher = Dispatcher::new(Arc::new(PeerClient::with_defaults()?), DispatchConfig::default());
//! let forwarder = Forwarder::new(
//!     Arc::new(table),
//!     OriginResolver::fixed("http://node-a:8080"),
//!     dispatcher,
//! );
//!
//! let context = RequestContext::default();
//! let alert = forwarder.pre_receive(Alert::new("a1"), &context)?;
//! let alert = forwarder.post_receive(alert, &context).await;
//! # let _ = alert;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod dispatch;
pub mod error;
pub mod hooks;

pub use client::{ClientConfig, PeerClient, RemoteClient, RemoteReceipt};
pub use dispatch::{
    DispatchConfig, DispatchOutcome, DispatchReport, DispatchResult, Dispatcher, Outbound,
};
pub use error::{DispatchError, ErrorCategory, Result};
pub use hooks::Forwarder;

/// Default per-destination timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Default concurrency limit; zero means one slot per destination.
pub const DEFAULT_MAX_CONCURRENCY: usize = 0;
