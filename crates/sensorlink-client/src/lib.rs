//! Sensorlink client.
//!
//! Sends telemetry [`Message`]s to a sensorlink server and reads back the
//! [`Response`] for each. The client works over any async byte stream; the
//! [`Client::connect`] shortcut opens a TCP connection.
//!
//! # Components
//!
//! - [`Client`]: framed request/response over one stream
//! - [`ClientConfig`]: settings for the probe loop
//! - [`sample`]: the reference telemetry message used by the probe

pub mod sample;

use std::{net::SocketAddr, time::Duration};

use sensorlink_proto::{
    DecodeError, EncodeError, FrameError, Message, Response,
    codec::{decode_response, encode_message},
    read_frame_limited, write_frame,
};
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpStream, ToSocketAddrs},
};
use tracing::debug;

/// Errors surfaced by [`Client`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// TCP connect failed
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),

    /// Sending or receiving a frame failed
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The request could not be encoded
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The response could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Largest response payload accepted by default (16 MiB).
pub const DEFAULT_MAX_RESPONSE_SIZE: u32 = 16 * 1024 * 1024;

/// Probe loop settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server to connect to
    pub server_addr: SocketAddr,
    /// Pause between requests
    pub refresh_interval: Duration,
    /// Largest declared response length the client will read.
    ///
    /// A larger length prefix fails the read before any payload is buffered.
    pub max_response_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 12345)),
            refresh_interval: Duration::from_secs(1),
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }
}

/// Framed request/response client over one stream.
pub struct Client<S> {
    stream: S,
    max_response_size: u32,
}

impl Client<TcpStream> {
    /// Open a TCP connection to `addr`.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await.map_err(ClientError::Connect)?;
        stream.set_nodelay(true).map_err(ClientError::Connect)?;
        Ok(Self::new(stream))
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an established stream, accepting responses up to
    /// [`DEFAULT_MAX_RESPONSE_SIZE`].
    pub fn new(stream: S) -> Self {
        Self { stream, max_response_size: DEFAULT_MAX_RESPONSE_SIZE }
    }

    /// Change the largest response payload accepted.
    #[must_use]
    pub fn with_max_response_size(mut self, max: u32) -> Self {
        self.max_response_size = max;
        self
    }

    /// Encode and send one request.
    pub async fn send_message(&mut self, message: &Message) -> Result<(), ClientError> {
        let payload = encode_message(message)?;
        self.send_payload(&payload).await
    }

    /// Send an already encoded payload as one frame.
    pub async fn send_payload(&mut self, payload: &[u8]) -> Result<(), ClientError> {
        write_frame(&mut self.stream, payload).await?;
        debug!(len = payload.len(), "sent request");
        Ok(())
    }

    /// Wait for the next response.
    ///
    /// A declared length above the configured maximum fails with
    /// [`FrameError::PayloadTooLarge`]. The stream is then mid-frame and
    /// should be dropped.
    pub async fn receive_response(&mut self) -> Result<Response, ClientError> {
        let payload = read_frame_limited(&mut self.stream, self.max_response_size).await?;
        debug!(len = payload.len(), "received response");
        Ok(decode_response(&payload)?)
    }

    /// Send `message` and wait for its response.
    pub async fn request(&mut self, message: &Message) -> Result<Response, ClientError> {
        self.send_message(message).await?;
        self.receive_response().await
    }

    /// Give back the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}
