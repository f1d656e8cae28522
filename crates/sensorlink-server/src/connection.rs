//! Per-connection request/response loop.
//!
//! Each accepted stream gets its own [`Connection`], which owns the stream and
//! runs strictly one request at a time: a response is fully written before the
//! next length prefix is read.
//!
//! # State Machine
//!
//! ```text
//! ┌────────────────┐  prefix   ┌─────────────────┐  payload  ┌──────────┐
//! │ AwaitingLength │──────────>│ AwaitingPayload │──────────>│ Decoding │
//! └────────────────┘           └─────────────────┘           └──────────┘
//!         ↑   ↑                                                 │      │
//!         │   └────────────── decode failed (no reply) ─────────┘      │ ok
//!         │                                                            ↓
//!    ┌─────────┐   written   ┌──────────┐   encoded   ┌────────────┐
//!    │ Sending │<────────────│ Encoding │<────────────│ Processing │
//!    └─────────┘             └──────────┘             └────────────┘
//!
//!   any state ── EOF / read fault / oversized / encode or write fault ──> Closed
//! ```
//!
//! A peer hanging up between frames is the normal way a connection ends and is
//! not logged as a fault. A request that fails to decode gets no reply and the
//! connection keeps reading.

use std::sync::Arc;

use sensorlink_proto::{
    EncodeError, FrameError, Message,
    codec,
    frame::{read_length, read_payload, write_frame},
};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, trace, warn};

use crate::{config::ServerConfig, policy::DecisionPolicy};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the 4-byte length prefix
    AwaitingLength,
    /// Prefix read, waiting for the payload
    AwaitingPayload,
    /// Decoding the payload into a message
    Decoding,
    /// Running the decision policy
    Processing,
    /// Encoding the response
    Encoding,
    /// Writing the response frame
    Sending,
    /// Terminal
    Closed,
}

/// Why a connection loop stopped.
#[derive(Debug, Error)]
pub enum CloseReason {
    /// The peer closed the stream between frames.
    #[error("peer closed the connection")]
    PeerClosed,

    /// The peer declared a payload larger than the configured limit.
    #[error("request rejected: {0}")]
    Oversized(#[source] FrameError),

    /// Reading a frame failed: truncated frame or stream error.
    #[error("read failed: {0}")]
    Read(#[source] FrameError),

    /// The response could not be encoded.
    #[error("encode failed: {0}")]
    Encode(#[source] EncodeError),

    /// Writing the response failed.
    #[error("write failed: {0}")]
    Write(#[source] FrameError),
}

impl CloseReason {
    /// True for an ordinary disconnect.
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::PeerClosed)
    }
}

/// What a finished connection did.
#[derive(Debug)]
pub struct ConnectionSummary {
    /// Responses written
    pub responses_sent: u64,
    /// Requests dropped because they failed to decode
    pub requests_rejected: u64,
    /// Why the loop stopped
    pub reason: CloseReason,
}

/// Request/response loop over one stream.
pub struct Connection<S> {
    stream: S,
    policy: Arc<dyn DecisionPolicy>,
    max_payload_size: u32,
    state: ConnectionState,
    responses_sent: u64,
    requests_rejected: u64,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a connection in `AwaitingLength` state.
    pub fn new(stream: S, policy: Arc<dyn DecisionPolicy>, config: &ServerConfig) -> Self {
        Self {
            stream,
            policy,
            max_payload_size: config.max_payload_size,
            state: ConnectionState::AwaitingLength,
            responses_sent: 0,
            requests_rejected: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Serve requests until the stream closes or a fatal fault occurs.
    pub async fn run(mut self) -> ConnectionSummary {
        let reason = loop {
            if let Err(reason) = self.serve_one().await {
                break reason;
            }
        };
        let last_state = self.state;
        self.transition(ConnectionState::Closed);

        if reason.is_clean() {
            debug!("peer closed connection");
        } else {
            warn!(%reason, state = ?last_state, "closing connection after fault");
        }
        info!(
            responses_sent = self.responses_sent,
            requests_rejected = self.requests_rejected,
            "connection closed"
        );

        ConnectionSummary {
            responses_sent: self.responses_sent,
            requests_rejected: self.requests_rejected,
            reason,
        }
    }

    /// Handle one request.
    ///
    /// `Ok` means the loop continues, whether or not a reply was sent.
    async fn serve_one(&mut self) -> Result<(), CloseReason> {
        self.transition(ConnectionState::AwaitingLength);
        let len = match read_length(&mut self.stream).await {
            Ok(len) => len,
            Err(err) if err.is_clean_close() => return Err(CloseReason::PeerClosed),
            Err(err) => return Err(CloseReason::Read(err)),
        };
        if len > self.max_payload_size {
            return Err(CloseReason::Oversized(FrameError::PayloadTooLarge {
                size: u64::from(len),
                max: u64::from(self.max_payload_size),
            }));
        }

        self.transition(ConnectionState::AwaitingPayload);
        let payload = read_payload(&mut self.stream, len).await.map_err(CloseReason::Read)?;
        debug!(len, "received request");

        self.transition(ConnectionState::Decoding);
        let Some(message) = self.decode(&payload) else {
            return Ok(());
        };

        self.transition(ConnectionState::Processing);
        let response = self.policy.decide(&message);
        if !response.covers(&message) {
            warn!(
                units = message.units.len(),
                actions = response.units.len(),
                "policy response does not match request unit ids"
            );
        }

        self.transition(ConnectionState::Encoding);
        let bytes = codec::encode(&response).map_err(CloseReason::Encode)?;

        self.transition(ConnectionState::Sending);
        write_frame(&mut self.stream, &bytes).await.map_err(CloseReason::Write)?;
        self.responses_sent += 1;
        debug!(len = bytes.len(), units = response.units.len(), "sent response");

        Ok(())
    }

    fn decode(&mut self, payload: &[u8]) -> Option<Message> {
        match codec::decode_message(payload) {
            Ok(message) => Some(message),
            Err(err) => {
                self.requests_rejected += 1;
                warn!(%err, len = payload.len(), "dropping request that failed to decode");
                None
            },
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        trace!(from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }
}
