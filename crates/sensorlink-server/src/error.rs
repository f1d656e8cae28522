//! Server error types.

use std::{io, net::SocketAddr};

use thiserror::Error;

/// Errors that stop the server.
///
/// Per-connection faults never surface here; they end only the connection
/// that hit them (see [`CloseReason`](crate::CloseReason)).
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address we tried to bind
        addr: SocketAddr,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Accepting a connection failed in a way retrying cannot fix.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),
}
