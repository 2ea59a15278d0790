//! Core domain types for loop-safe alert forwarding.
//!
//! Provides the loop marker protocol carried in the `X-Alerta-Loop` header,
//! origin resolution for this node, the destination table, and the action
//! gate that decides which destinations receive a given event. Everything in
//! this crate is pure: no I/O, no global state.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod gate;
pub mod loop_marker;
pub mod models;
pub mod origin;

pub use error::{ForwarderError, LoopStage, Result};
pub use gate::{evaluate, is_in_chain, is_permitted, SkipReason, Verdict};
pub use loop_marker::{LoopChain, LOOP_HEADER};
pub use models::{
    Alert, AlertRecord, Credentials, Destination, DestinationSource, DestinationTable, Operation,
    PermittedOperations,
};
pub use origin::{OriginResolver, RequestContext};
