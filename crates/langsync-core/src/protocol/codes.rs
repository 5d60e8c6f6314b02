//! Four-byte message codes.
//!
//! Every frame after the handshake begins with a [`MessageCode`]: four ASCII
//! bytes that name the message and fix the shape of the fields that follow.
//! Codes are compared by exact byte match and are never reused for a
//! different meaning in a later protocol revision.

use std::fmt;

/// A fixed 4-byte tag identifying a message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageCode(pub [u8; 4]);

impl MessageCode {
    /// Size of a code on the wire.
    pub const LEN: usize = 4;

    // ── 1.0 ──────────────────────────────────────────────────────────────────

    /// No operation.
    pub const NOOP: MessageCode = MessageCode(*b"CNOP");
    /// Client acknowledges a screen-info message.
    pub const INFO_ACK: MessageCode = MessageCode(*b"CIAK");
    /// Client reports its screen shape and cursor position.
    pub const CLIENT_INFO: MessageCode = MessageCode(*b"DINF");
    /// Server moves the cursor onto the client screen.
    pub const ENTER: MessageCode = MessageCode(*b"CINN");
    /// Server moves the cursor off the client screen.
    pub const LEAVE: MessageCode = MessageCode(*b"COUT");
    /// Server closes the connection.
    pub const CLOSE: MessageCode = MessageCode(*b"CBYE");
    /// Server rejects the client's protocol version.
    pub const INCOMPATIBLE: MessageCode = MessageCode(*b"EICV");
    /// Server reports a protocol error before disconnecting.
    pub const BAD: MessageCode = MessageCode(*b"EBAD");

    // ── 1.3 ──────────────────────────────────────────────────────────────────

    /// Keep-alive, sent by the server and echoed by the client.
    pub const KEEP_ALIVE: MessageCode = MessageCode(*b"CALV");

    // ── 1.7 ──────────────────────────────────────────────────────────────────

    /// Keyboard-layout catalogue exchange (LANGUAGE_LIST).
    pub const LANGUAGE_LIST: MessageCode = MessageCode(*b"LSYN");
    /// Active-language push (LANGUAGE_SET).
    pub const LANGUAGE_SET: MessageCode = MessageCode(*b"LSET");

    /// Reads a code from the first four bytes of `bytes`, if present.
    pub fn from_prefix(bytes: &[u8]) -> Option<MessageCode> {
        let head: [u8; 4] = bytes.get(..Self::LEN)?.try_into().ok()?;
        Some(MessageCode(head))
    }

    /// Raw bytes of the code.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for MessageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_prefix_reads_first_four_bytes() {
        let code = MessageCode::from_prefix(b"LSYNtrailing").unwrap();
        assert_eq!(code, MessageCode::LANGUAGE_LIST);
    }

    #[test]
    fn test_from_prefix_returns_none_for_short_input() {
        assert!(MessageCode::from_prefix(b"LSY").is_none());
    }

    #[test]
    fn test_display_escapes_non_printable_bytes() {
        let code = MessageCode([b'A', 0x00, b'B', 0xFF]);
        assert_eq!(code.to_string(), "A\\x00B\\xff");
    }

    #[test]
    fn test_language_codes_differ_from_every_older_code() {
        let older = [
            MessageCode::NOOP,
            MessageCode::INFO_ACK,
            MessageCode::CLIENT_INFO,
            MessageCode::ENTER,
            MessageCode::LEAVE,
            MessageCode::CLOSE,
            MessageCode::INCOMPATIBLE,
            MessageCode::BAD,
            MessageCode::KEEP_ALIVE,
        ];
        for code in older {
            assert_ne!(code, MessageCode::LANGUAGE_LIST);
            assert_ne!(code, MessageCode::LANGUAGE_SET);
        }
    }
}
