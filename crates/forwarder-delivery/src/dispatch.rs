//! Fan-out dispatcher.
//!
//! Runs the action gate against every destination, sends the event to the
//! ones that pass and collects one result per destination. Dispatch never
//! fails: remote errors and timeouts are recorded as `Failed` outcomes and
//! logged, and the remaining destinations are still attempted.
//!
//! ```text
//! destinations ──▶ gate ──┬─▶ Skipped(already-in-loop | not-configured)
//!                         └─▶ remote call (timeout) ──┬─▶ Sent
//!                                                     └─▶ Failed(error)
//! ```

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use forwarder_core::{
    evaluate, Destination, DestinationTable, LoopChain, Operation, SkipReason, Verdict,
};
use futures::{stream, StreamExt};
use serde_json::Value;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{
    client::RemoteClient,
    error::{DispatchError, ErrorCategory},
};

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Upper bound for a single remote call.
    pub timeout: Duration,
    /// Maximum concurrent remote calls; zero means one per destination.
    pub max_concurrency: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECONDS),
            max_concurrency: crate::DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Event payload sent to each destination.
#[derive(Debug, Clone, Copy)]
pub enum Outbound<'a> {
    /// Alert create/update with its JSON body.
    Alert {
        /// Serialized alert.
        body: &'a Value,
    },
    /// Action applied to the alert.
    Action {
        /// Action name.
        action: &'a str,
        /// Free-form text accompanying the action.
        text: &'a str,
    },
    /// Alert deletion.
    Delete,
}

impl<'a> Outbound<'a> {
    /// Operation checked against destination permissions.
    pub fn operation(&self) -> Operation<'a> {
        match *self {
            Self::Alert { .. } => Operation::Forward,
            Self::Action { action, .. } => Operation::Action(action),
            Self::Delete => Operation::Delete,
        }
    }
}

/// Outcome for a single destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The peer accepted the event.
    Sent {
        /// Message returned by the peer, kept for logging.
        message: Option<String>,
    },
    /// The destination was not contacted.
    Skipped(SkipReason),
    /// The remote call failed or timed out.
    Failed(DispatchError),
}

/// Result of dispatching to one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    /// Destination endpoint.
    pub endpoint: String,
    /// What happened.
    pub outcome: DispatchOutcome,
}

/// All results of one dispatch, in destination order.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// One entry per configured destination.
    pub results: Vec<DispatchResult>,
    /// Wall time of the whole fan-out.
    pub duration: Duration,
}

impl DispatchReport {
    /// Number of destinations that accepted the event.
    pub fn sent(&self) -> usize {
        self.count(|outcome| matches!(outcome, DispatchOutcome::Sent { .. }))
    }

    /// Number of destinations left out by the gate.
    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, DispatchOutcome::Skipped(_)))
    }

    /// Number of destinations whose call failed.
    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, DispatchOutcome::Failed(_)))
    }

    /// Outcome recorded for the first destination with this endpoint.
    pub fn result_for(&self, endpoint: &str) -> Option<&DispatchOutcome> {
        self.results.iter().find(|r| r.endpoint == endpoint).map(|r| &r.outcome)
    }

    fn count(&self, predicate: impl Fn(&DispatchOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| predicate(&r.outcome)).count()
    }
}

/// Sends events to every eligible destination.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: Arc<dyn RemoteClient>,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Creates a dispatcher over the given remote client.
    pub fn new(client: Arc<dyn RemoteClient>, config: DispatchConfig) -> Self {
        Self { client, config }
    }

    /// Returns the dispatcher configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Dispatches one event to every destination in the table.
    ///
    /// Destinations in `chain` or without permission for the operation are
    /// skipped; the rest receive the event with `chain` extended by
    /// `self_origin`. Results are returned in table order.
    pub async fn dispatch(
        &self,
        destinations: &DestinationTable,
        alert_id: &str,
        outbound: Outbound<'_>,
        chain: &LoopChain,
        self_origin: &str,
    ) -> DispatchReport {
        let operation = outbound.operation();
        let span = info_span!("forward", alert_id, operation = %operation);

        async move {
            let start_time = Instant::now();
            let loop_header = chain.append(self_origin);
            let limit = match self.config.max_concurrency {
                0 => destinations.len(),
                n => n,
            }
            .max(1);

            let results: Vec<DispatchResult> = stream::iter(destinations.iter().map(|destination| {
                let loop_header = loop_header.as_str();
                async move {
                    let outcome = match evaluate(destination, operation, chain) {
                        Verdict::Skip(reason) => {
                            debug!(
                                endpoint = %destination.endpoint,
                                reason = %reason,
                                "skipping destination"
                            );
                            DispatchOutcome::Skipped(reason)
                        },
                        Verdict::Forward => {
                            self.send(destination, alert_id, outbound, loop_header).await
                        },
                    };
                    DispatchResult { endpoint: destination.endpoint.clone(), outcome }
                }
            }).collect::<Vec<_>>())
            .buffered(limit)
            .collect()
            .await;

            let report = DispatchReport { results, duration: start_time.elapsed() };

            info!(
                sent = report.sent(),
                skipped = report.skipped(),
                failed = report.failed(),
                duration_ms = report.duration.as_millis(),
                "dispatch complete"
            );

            report
        }
        .instrument(span)
        .await
    }

    /// Performs one remote call bounded by the dispatch timeout.
    async fn send(
        &self,
        destination: &Destination,
        alert_id: &str,
        outbound: Outbound<'_>,
        loop_header: &str,
    ) -> DispatchOutcome {
        let call = async {
            match outbound {
                Outbound::Alert { body } => {
                    self.client.send_alert(destination, body, loop_header).await.map(|receipt| {
                        PeerReply {
                            message: receipt.message.or(receipt.id),
                            status_code: Some(receipt.status_code),
                            location: receipt.location,
                        }
                    })
                },
                Outbound::Action { action, text } => self
                    .client
                    .send_action(destination, alert_id, action, text, loop_header)
                    .await
                    .map(PeerReply::from_message),
                Outbound::Delete => self
                    .client
                    .delete_alert(destination, alert_id, loop_header)
                    .await
                    .map(PeerReply::from_message),
            }
        };

        let result = match tokio::time::timeout(self.config.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::timeout(
                u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        };

        match result {
            Ok(PeerReply { message, status_code, location }) => {
                info!(
                    endpoint = %destination.endpoint,
                    status_code = ?status_code,
                    location = location.as_deref().unwrap_or(""),
                    message = message.as_deref().unwrap_or(""),
                    "forwarded to peer"
                );
                DispatchOutcome::Sent { message }
            },
            Err(error) => {
                warn!(
                    endpoint = %destination.endpoint,
                    error = %error,
                    status_code = ?error.status_code(),
                    category = %ErrorCategory::from(&error),
                    "failed to forward to peer"
                );
                DispatchOutcome::Failed(error)
            },
        }
    }
}

/// What a peer answered to a successful call, kept for logging.
struct PeerReply {
    message: Option<String>,
    status_code: Option<u16>,
    location: Option<String>,
}

impl PeerReply {
    fn from_message(message: Option<String>) -> Self {
        Self { message, status_code: None, location: None }
    }
}
