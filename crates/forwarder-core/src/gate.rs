//! Per-destination forwarding decisions.
//!
//! Pure functions: given a destination, the operation being forwarded and
//! the inbound loop chain, decide whether the destination receives the
//! event. The loop check wins over permissions; a destination that already
//! handled the event is never contacted again.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    loop_marker::LoopChain,
    models::{Destination, Operation, PermittedOperations},
};

/// Why a destination was not contacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// The destination already appears in the loop chain.
    AlreadyInLoop,
    /// The destination does not accept this operation.
    NotConfigured,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInLoop => write!(f, "already-in-loop"),
            Self::NotConfigured => write!(f, "not-configured"),
        }
    }
}

/// Outcome of gating one destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Send the event to the destination.
    Forward,
    /// Leave the destination out of this dispatch.
    Skip(SkipReason),
}

/// Returns `true` if the destination accepts the operation.
///
/// | operation | accepted tokens                 |
/// |-----------|---------------------------------|
/// | forward   | `*`, `fwd`                      |
/// | action    | `*`, `actions`, the action name |
/// | delete    | `*`, `actions`, `delete`        |
pub fn is_permitted(destination: &Destination, operation: Operation<'_>) -> bool {
    let ops = &destination.operations;
    match operation {
        Operation::Forward => {
            ops.contains_any(&[PermittedOperations::WILDCARD, PermittedOperations::FORWARD])
        },
        Operation::Action(action) => ops.contains_any(&[
            PermittedOperations::WILDCARD,
            PermittedOperations::ACTIONS,
            action,
        ]),
        // `actions` also grants deletes; peers rely on this overlap.
        Operation::Delete => ops.contains_any(&[
            PermittedOperations::WILDCARD,
            PermittedOperations::ACTIONS,
            PermittedOperations::DELETE,
        ]),
    }
}

/// Returns `true` if the endpoint already handled the event.
pub fn is_in_chain(endpoint: &str, chain: &LoopChain) -> bool {
    chain.mentions(endpoint)
}

/// Decides whether a destination receives the operation.
pub fn evaluate(destination: &Destination, operation: Operation<'_>, chain: &LoopChain) -> Verdict {
    if is_in_chain(&destination.endpoint, chain) {
        Verdict::Skip(SkipReason::AlreadyInLoop)
    } else if !is_permitted(destination, operation) {
        Verdict::Skip(SkipReason::NotConfigured)
    } else {
        Verdict::Forward
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_requires_wildcard_or_fwd() {
        assert!(is_permitted(&Destination::new("b", ["fwd"]), Operation::Forward));
        assert!(is_permitted(&Destination::new("b", ["*"]), Operation::Forward));
        assert!(!is_permitted(&Destination::new("b", ["actions"]), Operation::Forward));
        assert!(!is_permitted(&Destination::new("b", ["delete"]), Operation::Forward));
    }

    #[test]
    fn forward_only_destination_rejects_actions() {
        let destination = Destination::new("B", ["fwd"]);
        assert!(!is_permitted(&destination, Operation::Action("ack")));
        assert!(!is_permitted(&destination, Operation::Delete));
    }

    #[test]
    fn action_accepts_generic_or_named_token() {
        assert!(is_permitted(&Destination::new("b", ["actions"]), Operation::Action("ack")));
        assert!(is_permitted(&Destination::new("b", ["ack"]), Operation::Action("ack")));
        assert!(!is_permitted(&Destination::new("b", ["ack"]), Operation::Action("close")));
    }

    #[test]
    fn delete_accepts_actions_token() {
        assert!(is_permitted(&Destination::new("b", ["actions"]), Operation::Delete));
        assert!(is_permitted(&Destination::new("b", ["delete"]), Operation::Delete));
        assert!(!is_permitted(&Destination::new("b", ["ack"]), Operation::Delete));
    }

    #[test]
    fn empty_operation_set_permits_nothing() {
        let destination = Destination::new("b", Vec::<String>::new());
        assert!(!is_permitted(&destination, Operation::Forward));
        assert!(!is_permitted(&destination, Operation::Action("ack")));
        assert!(!is_permitted(&destination, Operation::Delete));
    }

    #[test]
    fn loop_check_wins_over_permission() {
        let destination = Destination::new("http://b", ["*"]);
        let chain = LoopChain::from("http://a,http://b");
        assert_eq!(
            evaluate(&destination, Operation::Forward, &chain),
            Verdict::Skip(SkipReason::AlreadyInLoop)
        );
    }

    #[test]
    fn unpermitted_destination_not_configured() {
        let destination = Destination::new("http://c", ["fwd"]);
        let chain = LoopChain::from("http://a");
        assert_eq!(
            evaluate(&destination, Operation::Delete, &chain),
            Verdict::Skip(SkipReason::NotConfigured)
        );
        assert_eq!(evaluate(&destination, Operation::Forward, &chain), Verdict::Forward);
    }

    #[test]
    fn skip_reason_display() {
        assert_eq!(SkipReason::AlreadyInLoop.to_string(), "already-in-loop");
        assert_eq!(SkipReason::NotConfigured.to_string(), "not-configured");
    }
}
