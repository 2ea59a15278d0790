//! Hook adapters between the host pipeline and the dispatcher.
//!
//! Each hook follows the same two-phase contract: the loop guard runs first
//! and may reject the event with [`ForwarderError::ForwardingLoop`]; once the
//! guard passes, fan-out is a best-effort side effect whose failures never
//! change what the hook returns.
//!
//! ```text
//! Idle ──▶ Guarding ──┬─▶ Rejected (ForwardingLoop)
//!                     └─▶ Dispatching ──▶ Done
//! ```

use std::sync::Arc;

use forwarder_core::{
    AlertRecord, DestinationSource, ForwarderError, OriginResolver, RequestContext, Result,
};
use tracing::{debug, info};

use crate::dispatch::{DispatchReport, Dispatcher, Outbound};

/// Loop-safe forwarding hooks for one node.
///
/// Stateless across invocations: the destination table is reloaded from the
/// source and the chain is read from the request context on every call.
#[derive(Debug, Clone)]
pub struct Forwarder {
    source: Arc<dyn DestinationSource>,
    resolver: OriginResolver,
    dispatcher: Dispatcher,
}

impl Forwarder {
    /// Creates the hooks for a node.
    pub fn new(
        source: Arc<dyn DestinationSource>,
        resolver: OriginResolver,
        dispatcher: Dispatcher,
    ) -> Self {
        Self { source, resolver, dispatcher }
    }

    /// Number of destinations currently configured.
    pub fn destination_count(&self) -> usize {
        self.source.load().len()
    }

    /// Inbound guard, run before any local processing of a received alert.
    ///
    /// # Errors
    ///
    /// Returns `ForwarderError::ForwardingLoop` if this node already appears
    /// in the inbound chain.
    pub fn pre_receive<A: AlertRecord>(&self, alert: A, context: &RequestContext) -> Result<A> {
        let origin = self.resolver.resolve(context);
        if context.chain().contains(&origin) {
            info!(alert_id = alert.id(), origin = %origin, "alert already processed, ignoring");
            return Err(ForwarderError::receive_loop(alert.id(), origin));
        }
        Ok(alert)
    }

    /// Forwards a locally accepted alert to every eligible destination.
    ///
    /// Always returns the alert unchanged.
    pub async fn post_receive<A: AlertRecord>(&self, alert: A, context: &RequestContext) -> A {
        let body = alert.body();
        self.forward(alert.id(), Outbound::Alert { body: &body }, context).await;
        alert
    }

    /// Status transitions are not forwarded; peers learn about them through
    /// the action that caused them.
    pub fn status_change<A: AlertRecord>(
        &self,
        alert: &A,
        status: &str,
        _text: &str,
        _context: &RequestContext,
    ) {
        debug!(alert_id = alert.id(), status, "status change not forwarded");
    }

    /// Forwards an action applied locally.
    ///
    /// # Errors
    ///
    /// Returns `ForwarderError::ForwardingLoop` if the action was reflected
    /// back to this node.
    pub async fn take_action<A: AlertRecord>(
        &self,
        alert: A,
        action: &str,
        text: &str,
        context: &RequestContext,
    ) -> Result<A> {
        let origin = self.resolver.resolve(context);
        if context.chain().contains(&origin) {
            info!(alert_id = alert.id(), action, origin = %origin, "action already processed");
            return Err(ForwarderError::action_loop(alert.id(), action, origin));
        }

        self.forward(alert.id(), Outbound::Action { action, text }, context).await;
        Ok(alert)
    }

    /// Forwards a local delete.
    ///
    /// Returns `true` whatever the remote outcome so the local delete always
    /// proceeds.
    ///
    /// # Errors
    ///
    /// Returns `ForwarderError::ForwardingLoop` if the delete was reflected
    /// back to this node.
    pub async fn delete<A: AlertRecord>(&self, alert: &A, context: &RequestContext) -> Result<bool> {
        let origin = self.resolver.resolve(context);
        if context.chain().contains(&origin) {
            info!(alert_id = alert.id(), origin = %origin, "alert already deleted");
            return Err(ForwarderError::delete_loop(alert.id(), origin));
        }

        self.forward(alert.id(), Outbound::Delete, context).await;
        Ok(true)
    }

    /// Runs the dispatcher for one event against freshly loaded destinations.
    pub async fn forward(
        &self,
        alert_id: &str,
        outbound: Outbound<'_>,
        context: &RequestContext,
    ) -> DispatchReport {
        let destinations = self.source.load();
        if destinations.is_empty() {
            debug!(alert_id, "no forwarding destinations configured");
            return DispatchReport::default();
        }

        let origin = self.resolver.resolve(context);
        self.dispatcher.dispatch(&destinations, alert_id, outbound, &context.chain(), &origin).await
    }
}

#[cfg(test)]
mod tests {
    use forwarder_core::{Alert, DestinationTable, LoopStage};

    use super::*;
    use crate::{client::PeerClient, dispatch::DispatchConfig};

    fn forwarder(origin: &str) -> Forwarder {
        let client = Arc::new(PeerClient::with_defaults().unwrap());
        Forwarder::new(
            Arc::new(DestinationTable::default()),
            OriginResolver::fixed(origin),
            Dispatcher::new(client, DispatchConfig::default()),
        )
    }

    #[test]
    fn guard_rejects_own_origin_in_chain() {
        let forwarder = forwarder("nodeB");
        let context = RequestContext::default().with_loop_header("nodeA,nodeB");

        let error = forwarder.pre_receive(Alert::new("a1"), &context).unwrap_err();
        assert!(error.is_forwarding_loop());
        assert_eq!(
            error,
            ForwarderError::ForwardingLoop {
                alert_id: "a1".to_string(),
                origin: "nodeB".to_string(),
                stage: LoopStage::Receive,
            }
        );
    }

    #[test]
    fn guard_passes_foreign_chain() {
        let forwarder = forwarder("nodeC");
        let context = RequestContext::default().with_loop_header("nodeA,nodeB");

        let alert = forwarder.pre_receive(Alert::new("a1"), &context).unwrap();
        assert_eq!(alert.id, "a1");
    }

    #[test]
    fn guard_uses_exact_hop_match() {
        let forwarder = forwarder("http://node");
        let context = RequestContext::default().with_loop_header("http://node-a");

        assert!(forwarder.pre_receive(Alert::new("a1"), &context).is_ok());
    }

    #[tokio::test]
    async fn reflected_delete_rejected() {
        let forwarder = forwarder("nodeB");
        let context = RequestContext::default().with_loop_header("nodeB");

        let error = forwarder.delete(&Alert::new("a1"), &context).await.unwrap_err();
        assert_eq!(error.to_string(), "alert a1 already deleted by nodeB");
    }

    #[tokio::test]
    async fn no_destinations_still_succeeds() {
        let forwarder = forwarder("nodeA");
        let context = RequestContext::default();

        assert_eq!(forwarder.delete(&Alert::new("a1"), &context).await, Ok(true));
        let report = forwarder.forward("a1", Outbound::Delete, &context).await;
        assert!(report.results.is_empty());
    }
}
