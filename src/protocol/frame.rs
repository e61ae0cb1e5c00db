//! Frame codec
//!
//! ```text
//! +--------+-------------+----------------------+
//! | header | destination | content              |
//! | 5 B    | 5 B         | header - 5 bytes     |
//! +--------+-------------+----------------------+
//!          |<------------- body --------------->|
//! ```
//!
//! The header is the body length in bytes, as zero-padded ASCII decimal.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::constants::{HEADER_WIDTH, MAX_BODY_SIZE, NAME_WIDTH};
use super::name::ServiceName;
use crate::error::FrameError;

/// One complete frame
///
/// Keeps the original wire bytes so the router can relay it untouched.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    raw: Bytes,
}

impl Frame {
    /// Encode a new frame
    pub fn new(destination: &ServiceName, content: &[u8]) -> Result<Self, FrameError> {
        Ok(Self {
            raw: encode(destination, content)?,
        })
    }

    /// Destination field
    pub fn destination(&self) -> ServiceName {
        let mut field = [0u8; NAME_WIDTH];
        field.copy_from_slice(&self.raw[HEADER_WIDTH..HEADER_WIDTH + NAME_WIDTH]);
        ServiceName::from_field(field)
    }

    /// Content following the destination
    pub fn content(&self) -> Bytes {
        self.raw.slice(HEADER_WIDTH + NAME_WIDTH..)
    }

    /// Body length as stated in the header
    pub fn body_len(&self) -> usize {
        self.raw.len() - HEADER_WIDTH
    }

    /// Complete wire bytes
    pub fn as_bytes(&self) -> &Bytes {
        &self.raw
    }

    /// Consume the frame, returning its wire bytes
    pub fn into_bytes(self) -> Bytes {
        self.raw
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("destination", &self.destination())
            .field("content_len", &(self.body_len() - NAME_WIDTH))
            .finish()
    }
}

/// Encode `destination + content` behind a length header
pub fn encode(destination: &ServiceName, content: &[u8]) -> Result<Bytes, FrameError> {
    let body_len = NAME_WIDTH + content.len();
    if body_len > MAX_BODY_SIZE {
        return Err(FrameError::BodyTooLarge(body_len));
    }

    let mut buf = BytesMut::with_capacity(HEADER_WIDTH + body_len);
    buf.put_slice(format!("{:0width$}", body_len, width = HEADER_WIDTH).as_bytes());
    buf.put_slice(destination.as_bytes());
    buf.put_slice(content);
    Ok(buf.freeze())
}

/// Parse a length header
///
/// Only exactly [`HEADER_WIDTH`] ASCII digits are accepted; signs, spaces
/// and other bytes are corruption.
pub fn parse_header(header: &[u8]) -> Result<usize, FrameError> {
    if header.len() != HEADER_WIDTH || !header.iter().all(u8::is_ascii_digit) {
        return Err(FrameError::InvalidHeader(
            String::from_utf8_lossy(header).into_owned(),
        ));
    }

    Ok(header
        .iter()
        .fold(0usize, |acc, digit| acc * 10 + usize::from(digit - b'0')))
}

/// Try to take one frame off the front of `buf`
///
/// Returns `Ok(None)` when more bytes are needed; nothing is consumed in
/// that case. On `InvalidHeader` nothing is consumed either, leaving the
/// recovery decision to the caller. On `BodyTooShort` the malformed frame's
/// bytes have been consumed.
pub fn decode_one(buf: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
    if buf.len() < HEADER_WIDTH {
        return Ok(None);
    }

    let body_len = parse_header(&buf[..HEADER_WIDTH])?;
    if buf.len() < HEADER_WIDTH + body_len {
        return Ok(None);
    }

    if body_len < NAME_WIDTH {
        buf.advance(HEADER_WIDTH + body_len);
        return Err(FrameError::BodyTooShort(body_len));
    }

    let raw = buf.split_to(HEADER_WIDTH + body_len).freeze();
    Ok(Some(Frame { raw }))
}

/// Decode every complete frame in `input`
///
/// Returns the frames in order plus the undecoded remainder. A corrupt
/// header discards everything from that point on; malformed frames with a
/// valid header are skipped.
pub fn decode(input: &[u8]) -> (Vec<Frame>, Bytes) {
    let mut buf = BytesMut::from(input);
    let mut frames = Vec::new();

    loop {
        match decode_one(&mut buf) {
            Ok(Some(frame)) => frames.push(frame),
            Ok(None) => break,
            Err(FrameError::BodyTooShort(_)) => continue,
            Err(_) => {
                buf.clear();
                break;
            }
        }
    }

    (frames, buf.freeze())
}
