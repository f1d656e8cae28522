//! Error types for framing, decoding, and encoding.

use std::io;

use thiserror::Error;

use crate::frame::FrameStage;

/// Errors raised while moving frames on or off a stream.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The stream reached EOF before a complete frame was read.
    ///
    /// `read == 0` during [`FrameStage::Length`] is an ordinary disconnect at a
    /// frame boundary; anything else means the peer vanished mid-frame.
    #[error("connection closed while reading {stage}: got {read} of {expected} bytes")]
    ConnectionClosed {
        /// Which part of the frame was being read
        stage: FrameStage,
        /// Bytes of that part received before EOF
        read: usize,
        /// Bytes of that part that were expected
        expected: usize,
    },

    /// Payload length does not fit the prefix or exceeds the configured limit.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Actual or declared payload size
        size: u64,
        /// Largest size accepted
        max: u64,
    },

    /// The underlying stream failed while reading.
    #[error("stream read failed: {0}")]
    StreamReadFailure(#[source] io::Error),

    /// The underlying stream failed while writing or flushing.
    #[error("stream write failed: {0}")]
    StreamWriteFailure(#[source] io::Error),
}

impl FrameError {
    /// True when the peer closed the stream cleanly between frames.
    pub fn is_clean_close(&self) -> bool {
        matches!(self, Self::ConnectionClosed { stage: FrameStage::Length, read: 0, .. })
    }
}

/// Structural errors raised when building a [`Message`](crate::Message) from
/// decoded records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The base record carries fewer than two sensor readings.
    #[error("base record has {found} fields, expected at least 2")]
    InsufficientBaseFields {
        /// Number of fields present
        found: usize,
    },

    /// A unit record lacks an id or one of its two sensor readings.
    #[error("unit record {index} has {found} fields, expected at least 3")]
    InsufficientUnitFields {
        /// Position of the offending unit in the request
        index: usize,
        /// Number of fields present
        found: usize,
    },
}

/// Errors raised while decoding a payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not MessagePack, or not shaped like a request.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Shaped like a request but records are missing fields.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Failure to serialize a payload.
#[derive(Debug, Error)]
#[error("failed to encode payload: {0}")]
pub struct EncodeError(#[from] pub rmp_serde::encode::Error);
