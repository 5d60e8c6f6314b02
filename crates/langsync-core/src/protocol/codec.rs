//! Field codec and frame builder.
//!
//! Wire format:
//! ```text
//! [frame_len:4][code:4][field]...[field]
//! ```
//! `frame_len` counts everything after itself.  Integers are big-endian.
//! A string field is `[byte_len:4][utf8 bytes]`.
//!
//! [`FrameBuilder`] writes fields in order and [`FieldReader`] reads them back
//! from a received frame body.  A reader never invents a value: running out of
//! bytes mid-field is reported as [`ProtocolError::InsufficientData`], which
//! callers treat as fatal for the connection.

use thiserror::Error;

use crate::protocol::codes::MessageCode;

/// Largest frame body accepted from a peer.
pub const MAX_FRAME_LENGTH: usize = 4 * 1024 * 1024;

/// Size of the big-endian length prefix in front of every frame.
pub const FRAME_PREFIX_LEN: usize = 4;

/// Errors that can occur while encoding or decoding wire fields.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The frame ended before the field being read was complete.
    #[error("insufficient data: need {needed} bytes, {available} available")]
    InsufficientData { needed: usize, available: usize },

    /// A string field was not valid UTF-8.
    #[error("string field at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },

    /// The declared frame length exceeds [`MAX_FRAME_LENGTH`].
    #[error("frame of {length} bytes exceeds the {max} byte limit")]
    FrameTooLarge { length: usize, max: usize },

    /// The payload parsed but a field value is out of range.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// Decodes the 4-byte length prefix of a frame.
///
/// # Errors
///
/// Returns [`ProtocolError::FrameTooLarge`] when the declared length is above
/// [`MAX_FRAME_LENGTH`].
pub fn read_frame_length(prefix: [u8; FRAME_PREFIX_LEN]) -> Result<usize, ProtocolError> {
    let length = u32::from_be_bytes(prefix) as usize;
    if length > MAX_FRAME_LENGTH {
        return Err(ProtocolError::FrameTooLarge {
            length,
            max: MAX_FRAME_LENGTH,
        });
    }
    Ok(length)
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Builds one length-prefixed frame field by field.
///
/// # Examples
///
/// ```rust
/// use langsync_core::{FrameBuilder, MessageCode};
///
/// let frame = FrameBuilder::new(MessageCode::LANGUAGE_SET).string("fr").finish();
/// assert_eq!(&frame[..4], &10u32.to_be_bytes());
/// assert_eq!(&frame[4..8], b"LSET");
/// assert_eq!(&frame[8..12], &2u32.to_be_bytes());
/// assert_eq!(&frame[12..], b"fr");
/// ```
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    buf: Vec<u8>,
}

impl FrameBuilder {
    /// Starts a frame whose body begins with `code`.
    pub fn new(code: MessageCode) -> Self {
        Self::with_prefix(code.as_bytes())
    }

    /// Starts a frame whose body begins with an arbitrary tag (the 7-byte hello).
    pub fn with_prefix(prefix: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(FRAME_PREFIX_LEN + prefix.len() + 16);
        buf.extend_from_slice(&[0u8; FRAME_PREFIX_LEN]); // patched in finish()
        buf.extend_from_slice(prefix);
        Self { buf }
    }

    pub fn i16(mut self, value: i16) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn u16(mut self, value: u16) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Appends a length-prefixed UTF-8 string.
    pub fn string(mut self, value: &str) -> Self {
        self.buf
            .extend_from_slice(&(value.len() as u32).to_be_bytes());
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    /// Writes the length prefix and returns the complete frame.
    pub fn finish(mut self) -> Vec<u8> {
        let body_len = (self.buf.len() - FRAME_PREFIX_LEN) as u32;
        self.buf[..FRAME_PREFIX_LEN].copy_from_slice(&body_len.to_be_bytes());
        self.buf
    }
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Sequential reader over one received frame body (without the length prefix).
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < n {
            return Err(ProtocolError::InsufficientData {
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Reads the leading message code.
    pub fn code(&mut self) -> Result<MessageCode, ProtocolError> {
        Ok(MessageCode(self.take_array::<4>()?))
    }

    /// Consumes `tag` if the remaining bytes start with it.
    pub fn expect_tag(&mut self, tag: &[u8]) -> Result<(), ProtocolError> {
        let got = self.take(tag.len())?;
        if got != tag {
            return Err(ProtocolError::MalformedPayload(format!(
                "expected tag {:?}, found {:?}",
                String::from_utf8_lossy(tag),
                String::from_utf8_lossy(got)
            )));
        }
        Ok(())
    }

    pub fn i16(&mut self) -> Result<i16, ProtocolError> {
        Ok(i16::from_be_bytes(self.take_array::<2>()?))
    }

    pub fn u16(&mut self) -> Result<u16, ProtocolError> {
        Ok(u16::from_be_bytes(self.take_array::<2>()?))
    }

    pub fn u32(&mut self) -> Result<u32, ProtocolError> {
        Ok(u32::from_be_bytes(self.take_array::<4>()?))
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn string(&mut self) -> Result<String, ProtocolError> {
        let len = self.u32()? as usize;
        let offset = self.pos;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ProtocolError::InvalidUtf8 { offset })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
