//! Record of finished server connections.
//!
//! Tests assert on how a connection ended from the client side of the
//! simulation, after the server task has had a chance to observe it.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
};

use sensorlink_server::{ConnectionSummary, listener::CloseHook};

/// Snapshot of one [`ConnectionSummary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedConnection {
    /// Peer address
    pub peer: SocketAddr,
    /// Responses written
    pub responses_sent: u64,
    /// Requests dropped because they failed to decode
    pub requests_rejected: u64,
    /// Whether the peer hung up between frames
    pub clean: bool,
    /// Rendered close reason
    pub reason: String,
}

impl ClosedConnection {
    fn capture(peer: SocketAddr, summary: &ConnectionSummary) -> Self {
        Self {
            peer,
            responses_sent: summary.responses_sent,
            requests_rejected: summary.requests_rejected,
            clean: summary.reason.is_clean(),
            reason: summary.reason.to_string(),
        }
    }
}

/// Shared, cloneable log of closed connections.
#[derive(Debug, Clone, Default)]
pub struct CloseLog {
    entries: Arc<Mutex<Vec<ClosedConnection>>>,
}

impl CloseLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hook to pass to `Server::on_connection_closed`.
    pub fn hook(&self) -> CloseHook {
        let entries = Arc::clone(&self.entries);
        Arc::new(move |peer: SocketAddr, summary: &ConnectionSummary| {
            entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(ClosedConnection::capture(peer, summary));
        })
    }

    /// Copy of everything recorded so far, in close order.
    pub fn entries(&self) -> Vec<ClosedConnection> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
