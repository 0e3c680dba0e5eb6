//! Length-prefixed codec for TCP framing
//!
//! All events are framed as:
//! ```text
//! [ 4 bytes: length (u32, big-endian) ][ N bytes: JSON event ]
//! ```
//!
//! A frame whose JSON body does not parse is consumed and reported as a
//! recoverable error so the stream can keep going.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Maximum frame body size (1 MiB)
pub const MAX_FRAME_SIZE: u32 = 1024 * 1024;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Frame too large: {0} bytes (max: {MAX_FRAME_SIZE})")]
    FrameTooLarge(usize),

    #[error("Invalid frame length prefix: {0}")]
    InvalidLength(u32),

    #[error("JSON decode error: {0}")]
    DecodeError(#[source] serde_json::Error),

    #[error("JSON encode error: {0}")]
    EncodeError(#[source] serde_json::Error),
}

impl CodecError {
    /// Whether the stream is still usable after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CodecError::DecodeError(_))
    }
}

/// Encode an event into a length-prefixed byte buffer
pub fn encode<T: Serialize>(event: &T) -> Result<Bytes, CodecError> {
    let mut buf = BytesMut::new();
    encode_into(event, &mut buf)?;
    Ok(buf.freeze())
}

/// Encode an event directly into a provided buffer
pub fn encode_into<T: Serialize>(event: &T, buf: &mut BytesMut) -> Result<(), CodecError> {
    let body = serde_json::to_vec(event).map_err(CodecError::EncodeError)?;

    if body.len() > MAX_FRAME_SIZE as usize {
        return Err(CodecError::FrameTooLarge(body.len()));
    }

    buf.reserve(4 + body.len());
    buf.put_u32(body.len() as u32);
    buf.put_slice(&body);

    Ok(())
}

/// Try to decode a length-prefixed event from a buffer
///
/// Returns:
/// - `Ok(Some(event))` if a complete frame was decoded
/// - `Ok(None)` if more data is needed
/// - `Err(...)` if the data is invalid; a `DecodeError` has already consumed the frame
pub fn decode<T: DeserializeOwned>(buf: &mut BytesMut) -> Result<Option<T>, CodecError> {
    if buf.len() < 4 {
        return Ok(None);
    }

    // Peek at the length prefix without consuming
    let frame_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);

    if frame_len > MAX_FRAME_SIZE {
        return Err(CodecError::InvalidLength(frame_len));
    }

    let total_len = 4 + frame_len as usize;
    if buf.len() < total_len {
        return Ok(None);
    }

    buf.advance(4);
    let body = buf.split_to(frame_len as usize);

    serde_json::from_slice(&body)
        .map(Some)
        .map_err(CodecError::DecodeError)
}

/// Decoder state for streaming decoding
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Partial frame data being accumulated
    buffer: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Add data to the decoder buffer
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next frame from the buffer
    ///
    /// Call this repeatedly until it returns `Ok(None)` to drain all complete frames
    pub fn decode_next<T: DeserializeOwned>(&mut self) -> Result<Option<T>, CodecError> {
        decode(&mut self.buffer)
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}
