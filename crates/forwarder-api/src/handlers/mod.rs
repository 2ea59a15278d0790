//! HTTP request handlers for the forwarding relay.
//!
//! Handlers are grouped by functionality:
//! - `alerts` - alert receive, action and delete endpoints that run the
//!   forwarding hooks
//! - `health` - liveness endpoint reporting the configured fan-out
//!
//! A forwarding loop is not a client error: the peer that sent the request
//! already handled the event, so the relay acknowledges with `202` and a
//! message instead of failing the peer's own dispatch.

pub mod alerts;
pub mod health;

pub use alerts::{delete_alert, receive_alert, take_action};
pub use health::health_check;
