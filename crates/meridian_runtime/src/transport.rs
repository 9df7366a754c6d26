//! The transport seam.
//!
//! The room pushes encoded frames out through this trait and never parses
//! raw socket traffic itself; hosting (WebSocket, QUIC, in-process) lives
//! outside the crate.

use bytes::Bytes;
use meridian_core::SessionId;

/// Outbound frame delivery for one room
pub trait Transport: Send + Sync {
    /// Deliver a frame to one session
    fn send(&self, session: SessionId, frame: Bytes);

    /// Deliver a frame to every connected session
    fn broadcast(&self, frame: Bytes);
}

/// A transport that drops every frame; for rooms nobody watches
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn send(&self, _session: SessionId, _frame: Bytes) {}

    fn broadcast(&self, _frame: Bytes) {}
}
