//! Terminator framing for credential payloads.
//!
//! A payload travels as its raw bytes followed by a single terminator byte:
//!
//! ```text
//! 'S' 'E' 'C' 'R' 'E' 'T' '#'
//! ```
//!
//! The decoder accumulates until the terminator, keeps at most
//! `max_payload` of the preceding bytes and drops the rest. A sender that
//! never terminates is cut off after `max_scan` bytes instead of growing the
//! buffer forever.

use crate::error::{ProtocolError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use twinlock_core::constants::{CREDENTIAL_LENGTH, MAX_PAYLOAD_SCAN, PAYLOAD_TERMINATOR};

/// Codec for terminator-delimited payloads.
///
/// # Example
///
/// ```
/// use bytes::BytesMut;
/// use tokio_util::codec::{Decoder, Encoder};
/// use twinlock_protocol::PayloadCodec;
///
/// let mut codec = PayloadCodec::new();
/// let mut buffer = BytesMut::new();
///
/// codec.encode(&b"SECRET"[..], &mut buffer).unwrap();
/// assert_eq!(&buffer[..], b"SECRET#");
///
/// let payload = codec.decode(&mut buffer).unwrap().unwrap();
/// assert_eq!(&payload[..], b"SECRET");
/// assert!(buffer.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct PayloadCodec {
    terminator: u8,
    max_payload: usize,
    max_scan: usize,
}

impl PayloadCodec {
    /// Codec with the `#` terminator, credential-length payloads and the
    /// default scan bound.
    pub fn new() -> Self {
        Self {
            terminator: PAYLOAD_TERMINATOR,
            max_payload: CREDENTIAL_LENGTH,
            max_scan: MAX_PAYLOAD_SCAN,
        }
    }

    pub fn with_terminator(mut self, terminator: u8) -> Self {
        self.terminator = terminator;
        self
    }

    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    pub fn with_max_scan(mut self, max_scan: usize) -> Self {
        self.max_scan = max_scan;
        self
    }

    pub fn terminator(&self) -> u8 {
        self.terminator
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }
}

impl Default for PayloadCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for PayloadCodec {
    type Item = Bytes;
    type Error = ProtocolError;

    /// Extract the next payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::PayloadOverflow`] once more than `max_scan`
    /// bytes are buffered without a terminator.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        match src.iter().position(|&b| b == self.terminator) {
            Some(position) => {
                let mut frame = src.split_to(position + 1);
                frame.truncate(position.min(self.max_payload));
                Ok(Some(frame.freeze()))
            }
            None if src.len() > self.max_scan => {
                Err(ProtocolError::PayloadOverflow { scanned: src.len() })
            }
            None => Ok(None),
        }
    }
}

impl<'a> Encoder<&'a [u8]> for PayloadCodec {
    type Error = ProtocolError;

    /// Append `item` and the terminator to `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::TerminatorInPayload`] if `item` contains the
    /// terminator, since the receiver would cut the payload short.
    fn encode(&mut self, item: &'a [u8], dst: &mut BytesMut) -> Result<()> {
        if let Some(position) = item.iter().position(|&b| b == self.terminator) {
            return Err(ProtocolError::TerminatorInPayload {
                terminator: self.terminator,
                position,
            });
        }

        dst.reserve(item.len() + 1);
        dst.put_slice(item);
        dst.put_u8(self.terminator);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_decode_needs_terminator() {
        let mut codec = PayloadCodec::new();
        let mut buffer = BytesMut::from(&b"SEC"[..]);

        assert!(codec.decode(&mut buffer).unwrap().is_none());
        assert_eq!(buffer.len(), 3);

        buffer.extend_from_slice(b"RET#");
        let payload = codec.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(&payload[..], b"SECRET");
    }

    #[rstest]
    #[case(&b"#"[..], &b""[..])]
    #[case(&b"AB#"[..], &b"AB"[..])]
    #[case(&b"123456#"[..], &b"123456"[..])]
    #[case(&b"12345678#"[..], &b"123456"[..])]
    fn test_decode_keeps_at_most_credential_length(#[case] wire: &[u8], #[case] expected: &[u8]) {
        let mut codec = PayloadCodec::new();
        let mut buffer = BytesMut::from(wire);
        let payload = codec.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(&payload[..], expected);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_decode_leaves_following_bytes() {
        let mut codec = PayloadCodec::new();
        let mut buffer = BytesMut::from(&b"AAAAAA#\xFF"[..]);

        codec.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(&buffer[..], &[0xFF]);
    }

    #[test]
    fn test_decode_overflow() {
        let mut codec = PayloadCodec::new().with_max_scan(8);
        let mut buffer = BytesMut::from(&b"123456789"[..]);

        assert!(matches!(
            codec.decode(&mut buffer),
            Err(ProtocolError::PayloadOverflow { scanned: 9 })
        ));
    }

    #[test]
    fn test_encode_rejects_terminator() {
        let mut codec = PayloadCodec::new();
        let mut buffer = BytesMut::new();

        let result = codec.encode(&b"AB#C"[..], &mut buffer);
        assert!(matches!(
            result,
            Err(ProtocolError::TerminatorInPayload { position: 2, .. })
        ));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_custom_terminator() {
        let mut codec = PayloadCodec::new().with_terminator(0x00).with_max_payload(16);
        let mut buffer = BytesMut::new();

        codec.encode(&b"hello world"[..], &mut buffer).unwrap();
        assert_eq!(buffer.last(), Some(&0x00));

        let payload = codec.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(&payload[..], b"hello world");
    }
}
