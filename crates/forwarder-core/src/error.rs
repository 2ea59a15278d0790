//! Error types for the forwarding hooks.
//!
//! Only one failure originates from the core: a forwarding loop, raised when
//! this node already appears in the inbound loop chain. Remote delivery
//! failures are recoverable and live in the delivery crate; they never reach
//! the host.

use std::fmt;

use thiserror::Error;

/// Result type alias for hook operations.
pub type Result<T> = std::result::Result<T, ForwarderError>;

/// Errors surfaced to the host pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForwarderError {
    /// This node already handled the event; local processing must abort.
    #[error("alert {alert_id} {stage} by {origin}")]
    ForwardingLoop {
        /// Identifier of the rejected alert
        alert_id: String,
        /// Origin of this node as found in the loop chain
        origin: String,
        /// Lifecycle point at which the loop was detected
        stage: LoopStage,
    },
}

impl ForwarderError {
    /// Creates a loop error for an inbound alert.
    pub fn receive_loop(alert_id: impl Into<String>, origin: impl Into<String>) -> Self {
        Self::ForwardingLoop {
            alert_id: alert_id.into(),
            origin: origin.into(),
            stage: LoopStage::Receive,
        }
    }

    /// Creates a loop error for a reflected action.
    pub fn action_loop(
        alert_id: impl Into<String>,
        action: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self::ForwardingLoop {
            alert_id: alert_id.into(),
            origin: origin.into(),
            stage: LoopStage::Action(action.into()),
        }
    }

    /// Creates a loop error for a reflected delete.
    pub fn delete_loop(alert_id: impl Into<String>, origin: impl Into<String>) -> Self {
        Self::ForwardingLoop {
            alert_id: alert_id.into(),
            origin: origin.into(),
            stage: LoopStage::Delete,
        }
    }

    /// Returns `true` if the host should treat the event as a duplicate.
    pub fn is_forwarding_loop(&self) -> bool {
        matches!(self, Self::ForwardingLoop { .. })
    }
}

/// Point in the alert lifecycle where a loop was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopStage {
    /// Inbound alert create/update.
    Receive,
    /// Action with the given name.
    Action(String),
    /// Alert delete.
    Delete,
}

impl fmt::Display for LoopStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Receive => write!(f, "already processed"),
            Self::Action(action) => write!(f, "action {action} already processed"),
            Self::Delete => write!(f, "already deleted"),
        }
    }
}
