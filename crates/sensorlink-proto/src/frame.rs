//! Length-prefixed framing.
//!
//! ```text
//! ┌──────────────────────┬─────────────────────────┐
//! │ length N (u32, BE)   │ N bytes of payload      │
//! └──────────────────────┴─────────────────────────┘
//! ```
//!
//! A single read on a TCP stream may return any number of bytes, so both the
//! prefix and the payload are accumulated until complete. EOF part way through
//! either is reported as [`FrameError::ConnectionClosed`] with enough detail
//! for the caller to tell a clean disconnect from a truncated frame.

use std::{fmt, io};

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::FrameError;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Part of a frame being read when a stream ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStage {
    /// The 4-byte length prefix
    Length,
    /// The payload that follows it
    Payload,
}

impl fmt::Display for FrameStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length => f.write_str("length prefix"),
            Self::Payload => f.write_str("payload"),
        }
    }
}

/// Read one frame and return its payload.
///
/// Any length a `u32` can express is accepted; see [`read_frame_limited`] for
/// a bounded variant.
pub async fn read_frame<R>(reader: &mut R) -> Result<Bytes, FrameError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    read_frame_limited(reader, u32::MAX).await
}

/// Read one frame, rejecting declared lengths above `max` before allocating.
pub async fn read_frame_limited<R>(reader: &mut R, max: u32) -> Result<Bytes, FrameError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let len = read_length(reader).await?;
    if len > max {
        return Err(FrameError::PayloadTooLarge { size: u64::from(len), max: u64::from(max) });
    }
    read_payload(reader, len).await
}

/// Read the 4-byte length prefix of the next frame.
pub async fn read_length<R>(reader: &mut R) -> Result<u32, FrameError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    read_full(reader, &mut prefix, FrameStage::Length).await?;
    Ok(u32::from_be_bytes(prefix))
}

/// Read exactly `len` payload bytes.
pub async fn read_payload<R>(reader: &mut R, len: u32) -> Result<Bytes, FrameError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut payload = BytesMut::zeroed(len as usize);
    read_full(reader, &mut payload, FrameStage::Payload).await?;
    Ok(payload.freeze())
}

async fn read_full<R>(reader: &mut R, buf: &mut [u8], stage: FrameStage) -> Result<(), FrameError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => {
                return Err(FrameError::ConnectionClosed { stage, read: filled, expected: buf.len() });
            },
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
            Err(e) => return Err(FrameError::StreamReadFailure(e)),
        }
    }
    Ok(())
}

/// Write `payload` as one frame and flush.
///
/// Returns only once the prefix and the whole payload have been handed to the
/// stream and flushed.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let prefix = length_prefix(payload.len())?;
    writer.write_all(&prefix).await.map_err(FrameError::StreamWriteFailure)?;
    writer.write_all(payload).await.map_err(FrameError::StreamWriteFailure)?;
    writer.flush().await.map_err(FrameError::StreamWriteFailure)?;
    Ok(())
}

/// Encode `payload` as a complete frame in memory.
pub fn encode_frame(payload: &[u8]) -> Result<Bytes, FrameError> {
    let prefix = length_prefix(payload.len())?;
    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.extend_from_slice(&prefix);
    buf.extend_from_slice(payload);
    Ok(buf.freeze())
}

fn length_prefix(len: usize) -> Result<[u8; LENGTH_PREFIX_SIZE], FrameError> {
    let len = u32::try_from(len).map_err(|_| FrameError::PayloadTooLarge {
        size: len as u64,
        max: u64::from(u32::MAX),
    })?;
    Ok(len.to_be_bytes())
}

#[cfg(test)]
mod tests {
    use std::{
        pin::Pin,
        task::{Context, Poll},
    };

    use hex_literal::hex;
    use tokio::io::ReadBuf;

    use super::*;

    /// Hands out at most one byte per read.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
    }

    impl AsyncRead for Trickle {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.pos < self.data.len() && buf.remaining() > 0 {
                let byte = self.data[self.pos];
                buf.put_slice(&[byte]);
                self.pos += 1;
            }
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn write_frame_prefixes_big_endian_length() {
        let mut out = Vec::new();
        write_frame(&mut out, b"hello").await.unwrap();
        assert_eq!(out, hex!("00000005 68656c6c6f"));
    }

    #[tokio::test]
    async fn read_frame_strips_prefix() {
        let mut input: &[u8] = &hex!("00000003 010203 ff");
        let payload = read_frame(&mut input).await.unwrap();
        assert_eq!(&payload[..], &[1, 2, 3]);
        // Trailing bytes belong to the next frame
        assert_eq!(input, &[0xff]);
    }

    #[tokio::test]
    async fn read_frame_accumulates_single_byte_reads() {
        let payload: Vec<u8> = (0..=255).collect();
        let mut reader = Trickle { data: encode_frame(&payload).unwrap().to_vec(), pos: 0 };

        let read = read_frame(&mut reader).await.unwrap();
        assert_eq!(&read[..], &payload[..]);
    }

    #[tokio::test]
    async fn zero_length_frame_is_valid() {
        let mut input: &[u8] = &hex!("00000000");
        let payload = read_frame(&mut input).await.unwrap();
        assert!(payload.is_empty());
    }

    #[tokio::test]
    async fn eof_before_any_byte_is_clean_close() {
        let mut input: &[u8] = &[];
        let err = read_frame(&mut input).await.unwrap_err();
        assert!(err.is_clean_close());
    }

    #[tokio::test]
    async fn eof_inside_prefix_is_not_clean() {
        let mut input: &[u8] = &hex!("0000");
        let err = read_frame(&mut input).await.unwrap_err();
        assert!(matches!(
            err,
            FrameError::ConnectionClosed { stage: FrameStage::Length, read: 2, expected: 4 }
        ));
        assert!(!err.is_clean_close());
    }

    #[tokio::test]
    async fn eof_inside_payload_reports_progress() {
        let mut input: &[u8] = &hex!("00000008 0102");
        let err = read_frame(&mut input).await.unwrap_err();
        assert!(matches!(
            err,
            FrameError::ConnectionClosed { stage: FrameStage::Payload, read: 2, expected: 8 }
        ));
    }

    #[tokio::test]
    async fn limited_read_rejects_oversized_declaration() {
        let mut input: &[u8] = &hex!("00010000");
        let err = read_frame_limited(&mut input, 1024).await.unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 65536, max: 1024 }));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn length_prefix_rejects_lengths_beyond_u32() {
        let err = length_prefix(u32::MAX as usize + 1).unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadTooLarge { size: 4_294_967_296, max: 4_294_967_295 }
        ));

        assert_eq!(length_prefix(u32::MAX as usize).unwrap(), hex!("ffffffff"));
        assert_eq!(length_prefix(0).unwrap(), hex!("00000000"));
    }

    #[tokio::test]
    async fn frames_survive_duplex_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(8);

        let writer = tokio::spawn(async move {
            write_frame(&mut client, b"first").await.unwrap();
            write_frame(&mut client, &[0xab; 100]).await.unwrap();
        });

        assert_eq!(&read_frame(&mut server).await.unwrap()[..], b"first");
        assert_eq!(&read_frame(&mut server).await.unwrap()[..], &[0xab; 100][..]);
        writer.await.unwrap();

        let err = read_frame(&mut server).await.unwrap_err();
        assert!(err.is_clean_close());
    }
}
