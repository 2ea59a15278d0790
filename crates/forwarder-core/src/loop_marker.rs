//! Loop marker carried between federated peers.
//!
//! Every forwarded request carries an `X-Alerta-Loop` header whose value is
//! the comma-joined, ordered list of origins that already handled the event.
//! Each hop appends its own origin before forwarding onward:
//!
//! ```text
//!   node-a                 node-b                   node-c
//!  ┌──────┐  X-Alerta-Loop ┌──────┐  X-Alerta-Loop  ┌──────┐
//!  │      │ ─────────────▶ │      │ ──────────────▶ │      │
//!  └──────┘    "a"         └──────┘     "a,b"       └──────┘
//! ```
//!
//! No escaping is performed. Identifiers must not contain commas; peers in
//! the wild parse the value with a plain split, so this module must match
//! that behavior byte for byte.

use std::fmt;

/// Name of the header carrying the loop chain.
pub const LOOP_HEADER: &str = "X-Alerta-Loop";

/// Separator between origins in the header value.
pub const SEPARATOR: char = ',';

/// Ordered record of origins that already handled an event.
///
/// Keeps the raw header value so that [`LoopChain::mentions`] can apply the
/// substring match peers use for destination checks, while
/// [`LoopChain::contains`] tests exact hop membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LoopChain {
    raw: String,
}

impl LoopChain {
    /// Decodes a header value. An absent header yields an empty chain.
    pub fn decode(header: Option<&str>) -> Self {
        Self { raw: header.unwrap_or_default().to_string() }
    }

    /// Returns an empty chain.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` if no origin has handled the event yet.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the raw header value.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Iterates the origins in the order they were appended.
    pub fn hops(&self) -> impl Iterator<Item = &str> {
        let raw = if self.raw.is_empty() { None } else { Some(self.raw.as_str()) };
        raw.into_iter().flat_map(|raw| raw.split(SEPARATOR))
    }

    /// Number of hops recorded in the chain.
    pub fn len(&self) -> usize {
        self.hops().count()
    }

    /// Exact membership test for a single origin.
    pub fn contains(&self, id: &str) -> bool {
        self.hops().any(|hop| hop == id)
    }

    /// Returns `true` if `needle` occurs anywhere in the raw chain value.
    ///
    /// Matches a destination endpoint against the origins peers recorded, so
    /// `http://node-b` matches a hop recorded as `http://node-b/api`. Origins
    /// are recorded without a trailing slash, so endpoints must be too.
    pub fn mentions(&self, needle: &str) -> bool {
        !self.raw.is_empty() && !needle.is_empty() && self.raw.contains(needle)
    }

    /// Returns the header value to attach when forwarding from `self_id`.
    pub fn append(&self, self_id: &str) -> String {
        append(Some(self.raw.as_str()), self_id)
    }

    /// Returns the chain extended by `self_id`.
    pub fn extended(&self, self_id: &str) -> Self {
        Self { raw: self.append(self_id) }
    }
}

impl fmt::Display for LoopChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for LoopChain {
    fn from(raw: &str) -> Self {
        Self::decode(Some(raw))
    }
}

/// Appends `self_id` to a raw chain value.
///
/// An empty or absent chain yields `self_id` alone; otherwise the result is
/// `chain + "," + self_id`.
pub fn append(chain: Option<&str>, self_id: &str) -> String {
    match chain {
        Some(chain) if !chain.is_empty() => format!("{chain}{SEPARATOR}{self_id}"),
        _ => self_id.to_string(),
    }
}
