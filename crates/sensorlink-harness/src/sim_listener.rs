//! Turmoil listener.

use std::{io, net::SocketAddr};

use async_trait::async_trait;
use sensorlink_server::Listener;
use turmoil::net::{TcpListener, TcpStream};

/// [`Listener`] over a turmoil simulated TCP socket.
pub struct SimListener {
    inner: TcpListener,
}

impl SimListener {
    /// Bind inside the current simulated host.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let inner = TcpListener::bind(addr).await?;
        tracing::debug!(%addr, "simulated listener bound");
        Ok(Self { inner })
    }
}

#[async_trait]
impl Listener for SimListener {
    type Stream = TcpStream;

    async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)> {
        self.inner.accept().await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}
