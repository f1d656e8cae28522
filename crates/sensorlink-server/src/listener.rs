//! Accept loop.
//!
//! [`Server`] pulls connections from a [`Listener`] and runs each one as its
//! own task. Production listens on a tokio [`TcpListener`]; the simulation
//! harness plugs in a turmoil listener through the same trait.

use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, TcpStream},
};
use tracing::{Instrument, error, info, info_span, warn};

use crate::{
    config::ServerConfig,
    connection::{Connection, ConnectionSummary},
    error::ServerError,
    policy::DecisionPolicy,
};

/// Source of accepted byte streams.
#[async_trait]
pub trait Listener: Send + 'static {
    /// Stream type for an accepted connection.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Wait for the next incoming connection.
    async fn accept(&mut self) -> io::Result<(Self::Stream, SocketAddr)>;

    /// Address the listener is bound to.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl Listener for TcpListener {
    type Stream = TcpStream;

    async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }
}

/// Pause after an accept error that is not tied to one connection, such as
/// running out of file descriptors.
pub const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Called with the peer address and summary of every finished connection.
pub type CloseHook = Arc<dyn Fn(SocketAddr, &ConnectionSummary) + Send + Sync>;

/// Accept loop that spawns one [`Connection`] per peer.
pub struct Server<L> {
    listener: L,
    policy: Arc<dyn DecisionPolicy>,
    config: ServerConfig,
    on_close: Option<CloseHook>,
}

impl Server<TcpListener> {
    /// Bind a TCP listener on `config.bind_addr`.
    pub async fn bind(
        config: ServerConfig,
        policy: Arc<dyn DecisionPolicy>,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| ServerError::Bind { addr: config.bind_addr, source })?;
        Ok(Self::new(listener, policy, config))
    }
}

impl<L: Listener> Server<L> {
    /// Serve connections from an already bound listener.
    pub fn new(listener: L, policy: Arc<dyn DecisionPolicy>, config: ServerConfig) -> Self {
        Self { listener, policy, config, on_close: None }
    }

    /// Register a hook invoked when each connection finishes.
    #[must_use]
    pub fn on_connection_closed(mut self, hook: CloseHook) -> Self {
        self.on_close = Some(hook);
        self
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the listening socket itself fails.
    ///
    /// Errors about a single pending connection are logged and skipped.
    /// Resource exhaustion (descriptors, buffers, memory) and unrecognized
    /// errors are logged and retried after [`ACCEPT_BACKOFF`]. Only an error
    /// that means the socket is unusable stops the loop; the listener is then
    /// dropped and connections already running are left to finish on their
    /// own.
    pub async fn run(mut self) -> Result<(), ServerError> {
        match self.local_addr() {
            Ok(addr) => info!(%addr, "listening"),
            Err(err) => warn!(%err, "listening on unknown address"),
        }

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => self.spawn_connection(stream, peer),
                Err(err) => match classify(&err) {
                    AcceptFault::Connection => warn!(%err, "accept failed, continuing"),
                    AcceptFault::Exhausted => {
                        warn!(%err, backoff = ?ACCEPT_BACKOFF, "accept failed, backing off");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    },
                    AcceptFault::Listener => {
                        error!(%err, "accept failed, shutting down listener");
                        return Err(ServerError::Accept(err));
                    },
                },
            }
        }
    }

    fn spawn_connection(&self, stream: L::Stream, peer: SocketAddr) {
        info!(%peer, "accepted connection");

        let connection = Connection::new(stream, Arc::clone(&self.policy), &self.config);
        let on_close = self.on_close.clone();
        let span = info_span!("connection", %peer);

        tokio::spawn(
            async move {
                let summary = connection.run().await;
                if let Some(hook) = on_close {
                    hook(peer, &summary);
                }
            }
            .instrument(span),
        );
    }
}

/// How an accept error affects the accept loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AcceptFault {
    /// Concerns only the pending connection; accept again at once
    Connection,
    /// Out of resources or unrecognized; wait, then accept again
    Exhausted,
    /// The listening socket is unusable
    Listener,
}

/// OS error codes meaning the listening socket is gone: EBADF, ENOTSOCK.
#[cfg(any(target_os = "linux", target_os = "android"))]
const BROKEN_LISTENER_CODES: &[i32] = &[9, 88];
#[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
const BROKEN_LISTENER_CODES: &[i32] = &[9, 38];
#[cfg(windows)]
const BROKEN_LISTENER_CODES: &[i32] = &[10009, 10038];
#[cfg(not(any(unix, windows)))]
const BROKEN_LISTENER_CODES: &[i32] = &[];

fn classify(err: &io::Error) -> AcceptFault {
    match err.kind() {
        // EPERM from accept is a firewall verdict on one connection
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::PermissionDenied
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock
        | io::ErrorKind::TimedOut => AcceptFault::Connection,
        io::ErrorKind::InvalidInput => AcceptFault::Listener,
        _ if err.raw_os_error().is_some_and(|code| BROKEN_LISTENER_CODES.contains(&code)) => {
            AcceptFault::Listener
        },
        _ => AcceptFault::Exhausted,
    }
}
