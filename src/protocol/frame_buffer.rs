//! Connection buffer
//!
//! Accumulates raw socket reads and yields frames only once every byte of
//! them has arrived, however the transport splits the stream.
//!
//! # Example
//!
//! ```
//! use svcbus::protocol::{encode, FrameBuffer, ServiceName};
//!
//! let dest = ServiceName::new("alpha").unwrap();
//! let bytes = encode(&dest, b"ping").unwrap();
//!
//! let mut buffer = FrameBuffer::new();
//! assert!(buffer.push(&bytes[..7]).unwrap().is_empty());
//! let frames = buffer.push(&bytes[7..]).unwrap();
//! assert_eq!(&frames[0].content()[..], b"ping");
//! ```

use bytes::BytesMut;

use super::frame::{decode_one, Frame};
use crate::error::FrameError;

/// What to do when the stream contains an unparseable header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorruptionPolicy {
    /// Drop everything buffered and wait for the next read
    ///
    /// Bytes are lost; the connection stays up.
    #[default]
    Resync,
    /// Report the corruption so the owner closes the connection
    Close,
}

/// Per-connection frame accumulator
#[derive(Debug)]
pub struct FrameBuffer {
    buffer: BytesMut,
    policy: CorruptionPolicy,
    discarded: u64,
}

impl FrameBuffer {
    /// Create a buffer with the resync policy
    pub fn new() -> Self {
        Self::with_policy(CorruptionPolicy::default())
    }

    /// Create a buffer with an explicit corruption policy
    pub fn with_policy(policy: CorruptionPolicy) -> Self {
        Self {
            buffer: BytesMut::with_capacity(16 * 1024),
            policy,
            discarded: 0,
        }
    }

    /// Append a read and drain every complete frame
    ///
    /// Under [`CorruptionPolicy::Close`] a corrupt header returns an error,
    /// and frames decoded earlier in the same call are lost with the
    /// connection.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>, FrameError> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        loop {
            match decode_one(&mut self.buffer) {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => break,
                Err(err) if self.policy == CorruptionPolicy::Close => return Err(err),
                Err(FrameError::BodyTooShort(len)) => {
                    tracing::warn!(body_len = len, "Skipping frame without destination");
                    self.discarded += (super::constants::HEADER_WIDTH + len) as u64;
                }
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        dropped = self.buffer.len(),
                        "Corrupt frame header, discarding buffer"
                    );
                    self.discarded += self.buffer.len() as u64;
                    self.buffer.clear();
                    break;
                }
            }
        }

        Ok(frames)
    }

    /// Number of bytes waiting for the rest of their frame
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Total bytes thrown away by resyncs and skipped frames
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Forget any partial frame
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode, ServiceName};

    fn frame_bytes(dest: &str, content: &[u8]) -> Vec<u8> {
        encode(&ServiceName::new(dest).unwrap(), content)
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_every_split_point() {
        let bytes = frame_bytes("alpha", "héllo wörld".as_bytes());

        for split in 0..=bytes.len() {
            let mut buffer = FrameBuffer::new();
            let mut frames = buffer.push(&bytes[..split]).unwrap();
            frames.extend(buffer.push(&bytes[split..]).unwrap());

            assert_eq!(frames.len(), 1, "split at {}", split);
            assert_eq!(&frames[0].content()[..], "héllo wörld".as_bytes());
            assert!(buffer.is_empty());
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let bytes = frame_bytes("alpha", b"ping");
        let mut buffer = FrameBuffer::new();

        let mut frames = Vec::new();
        for (i, byte) in bytes.iter().enumerate() {
            let out = buffer.push(std::slice::from_ref(byte)).unwrap();
            if i + 1 < bytes.len() {
                assert!(out.is_empty());
            }
            frames.extend(out);
        }

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes().as_ref(), &bytes[..]);
    }

    #[test]
    fn test_drains_all_buffered_frames() {
        let mut chunk = frame_bytes("alpha", b"1");
        chunk.extend(frame_bytes("alpha", b"2"));
        chunk.extend(frame_bytes("beta", b"3"));
        let tail = frame_bytes("alpha", b"4");
        chunk.extend_from_slice(&tail[..6]);

        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(&chunk).unwrap();
        let contents: Vec<_> = frames.iter().map(|f| f.content()).collect();
        assert_eq!(contents, vec![&b"1"[..], &b"2"[..], &b"3"[..]]);
        assert_eq!(buffer.len(), 6);

        let frames = buffer.push(&tail[6..]).unwrap();
        assert_eq!(&frames[0].content()[..], b"4");
    }

    #[test]
    fn test_resync_discards_and_recovers() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(b"xx!!!garbage").unwrap();
        assert!(frames.is_empty());
        assert!(buffer.is_empty());
        assert_eq!(buffer.discarded(), 12);

        let frames = buffer.push(&frame_bytes("alpha", b"ok")).unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_close_policy_reports_corruption() {
        let mut buffer = FrameBuffer::with_policy(CorruptionPolicy::Close);
        let result = buffer.push(b"abcde12345");
        assert!(matches!(result, Err(FrameError::InvalidHeader(_))));
    }

    #[test]
    fn test_short_body_skipped_under_resync() {
        let mut chunk = b"00003abc".to_vec();
        chunk.extend(frame_bytes("alpha", b"ok"));

        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(&chunk).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(buffer.discarded(), 8);
    }
}
