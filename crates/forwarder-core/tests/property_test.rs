//! Property-based tests for the loop marker and action gate.
//!
//! Tests the protocol rules that must hold regardless of the origins and
//! operation tokens peers are configured with.

#![allow(clippy::unwrap_used)] // Test regex patterns are known to be valid

use forwarder_core::{
    evaluate, is_in_chain, is_permitted, loop_marker, Destination, LoopChain, Operation,
    SkipReason, Verdict,
};
use proptest::{prelude::*, test_runner::Config as ProptestConfig};

/// Deterministic property test configuration for CI stability.
fn proptest_config() -> ProptestConfig {
    ProptestConfig { cases: 128, failure_persistence: None, ..ProptestConfig::default() }
}

/// Origins as peers write them: comma-free, possibly with ports and paths.
fn origin_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("https?://[a-z0-9.-]{1,20}(:[0-9]{2,5})?(/[a-z0-9]{0,8})?")
        .unwrap()
}

/// Arbitrary non-empty, comma-free identifiers, including whitespace.
fn identifier_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[^,]{1,32}").unwrap()
}

fn chain_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(origin_strategy(), 0..6)
}

fn action_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,12}").unwrap()
}

proptest! {
    #![proptest_config(proptest_config())]

    /// Appending then decoding always yields a chain containing the new id.
    #[test]
    fn append_then_decode_contains_id(hops in chain_strategy(), id in identifier_strategy()) {
        let raw = hops.join(",");
        let header = (!raw.is_empty()).then_some(raw.as_str());

        let appended = loop_marker::append(header, &id);
        let chain = LoopChain::decode(Some(&appended));

        prop_assert!(chain.contains(&id));
    }

    /// Appending preserves earlier hops in order, with the new id last.
    #[test]
    fn append_preserves_hop_order(hops in chain_strategy(), id in origin_strategy()) {
        let chain = LoopChain::decode(Some(&hops.join(",")));
        let extended = chain.extended(&id);

        let mut expected = hops.clone();
        expected.push(id);
        let actual: Vec<&str> = extended.hops().collect();
        prop_assert_eq!(actual, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    /// Nothing is ever in an empty chain.
    #[test]
    fn empty_chain_contains_nothing(endpoint in origin_strategy()) {
        let chain = LoopChain::decode(None);
        prop_assert!(!is_in_chain(&endpoint, &chain));
        prop_assert!(!chain.contains(&endpoint));
    }

    /// A destination named anywhere in the chain is skipped for every
    /// operation, whatever it is permitted to receive.
    #[test]
    fn chained_destination_always_skipped(
        mut hops in chain_strategy(),
        endpoint in origin_strategy(),
        position in any::<prop::sample::Index>(),
        action in action_strategy(),
    ) {
        let at = position.index(hops.len() + 1);
        hops.insert(at, endpoint.clone());
        let chain = LoopChain::decode(Some(&hops.join(",")));
        let destination = Destination::new(endpoint, ["*"]);

        for operation in [Operation::Forward, Operation::Action(&action), Operation::Delete] {
            prop_assert_eq!(
                evaluate(&destination, operation, &chain),
                Verdict::Skip(SkipReason::AlreadyInLoop)
            );
        }
    }

    /// The wildcard permits every event kind and every action name.
    #[test]
    fn wildcard_permits_everything(action in action_strategy()) {
        let destination = Destination::new("http://peer", ["*"]);
        prop_assert!(is_permitted(&destination, Operation::Forward));
        prop_assert!(is_permitted(&destination, Operation::Action(&action)));
        prop_assert!(is_permitted(&destination, Operation::Delete));
    }

    /// A forward-only destination never receives actions, and an
    /// action-only destination never receives creates or updates.
    #[test]
    fn forward_and_action_scopes_are_disjoint(action in action_strategy()) {
        prop_assume!(action != "fwd");

        let forward_only = Destination::new("http://b", ["fwd"]);
        prop_assert!(!is_permitted(&forward_only, Operation::Action(&action)));

        let action_only = Destination::new("http://b", [action.clone()]);
        prop_assert!(!is_permitted(&action_only, Operation::Forward));
        prop_assert!(is_permitted(&action_only, Operation::Action(&action)));
    }
}
