//! Forwarding relay HTTP API.
//!
//! Hosts the loop-safe forwarding hooks behind an Axum router so a node can
//! take part in a federation of alert peers: alerts, actions and deletes
//! received here are forwarded to the configured destinations, and events
//! that already passed through this node are acknowledged without
//! forwarding.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod extract;
pub mod handlers;
pub mod server;

pub use config::Config;
pub use server::{create_router, serve, start_server, AppState};
