//! Typed protocol messages.
//!
//! Each message after the handshake implements [`WireMessage`]: a fixed
//! [`MessageCode`] plus the ordered fields that follow it.  The handshake
//! [`Hello`] uses a 7-byte tag instead of a code and is handled separately.

use crate::domain::language::{LayoutCatalogue, LayoutCode};
use crate::protocol::codec::{FieldReader, FrameBuilder, ProtocolError};
use crate::protocol::codes::MessageCode;
use crate::protocol::version::ProtocolVersion;

/// Tag at the start of both hello messages.
pub const HELLO_TAG: &[u8; 7] = b"Synergy";

/// A message identified by a 4-byte code.
pub trait WireMessage: Sized {
    const CODE: MessageCode;

    /// Appends this message's fields after the code.
    fn write_fields(&self, frame: FrameBuilder) -> FrameBuilder;

    /// Reads this message's fields; the code has already been consumed.
    fn read_fields(reader: &mut FieldReader<'_>) -> Result<Self, ProtocolError>;

    /// Encodes a complete length-prefixed frame.
    fn to_frame(&self) -> Vec<u8> {
        self.write_fields(FrameBuilder::new(Self::CODE)).finish()
    }
}

/// Declares a message that carries no fields.
macro_rules! empty_message {
    ($(#[$doc:meta])* $name:ident, $code:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name;

        impl WireMessage for $name {
            const CODE: MessageCode = $code;

            fn write_fields(&self, frame: FrameBuilder) -> FrameBuilder {
                frame
            }

            fn read_fields(_reader: &mut FieldReader<'_>) -> Result<Self, ProtocolError> {
                Ok($name)
            }
        }
    };
}

empty_message!(
    /// CNOP: no operation.
    Noop,
    MessageCode::NOOP
);
empty_message!(
    /// CIAK: client acknowledges screen info.
    InfoAck,
    MessageCode::INFO_ACK
);
empty_message!(
    /// COUT: the cursor left the client screen.
    Leave,
    MessageCode::LEAVE
);
empty_message!(
    /// CBYE: the server is closing the connection.
    Close,
    MessageCode::CLOSE
);
empty_message!(
    /// EBAD: the peer violated the protocol.
    ProtocolBad,
    MessageCode::BAD
);
empty_message!(
    /// CALV: keep-alive.
    KeepAlive,
    MessageCode::KEEP_ALIVE
);

// ── Handshake ─────────────────────────────────────────────────────────────────

/// Hello exchanged at connection start.
///
/// The server's hello carries only the version; the client's reply appends its
/// screen name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hello {
    pub version: ProtocolVersion,
    pub name: Option<String>,
}

impl Hello {
    pub fn server(version: ProtocolVersion) -> Self {
        Self { version, name: None }
    }

    pub fn client(version: ProtocolVersion, name: impl Into<String>) -> Self {
        Self {
            version,
            name: Some(name.into()),
        }
    }

    pub fn to_frame(&self) -> Vec<u8> {
        let frame = FrameBuilder::with_prefix(HELLO_TAG)
            .u16(self.version.major)
            .u16(self.version.minor);
        match &self.name {
            Some(name) => frame.string(name).finish(),
            None => frame.finish(),
        }
    }

    /// Parses a hello frame body.  A name is read when bytes remain after the version.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] when the tag is wrong or the fields are truncated.
    pub fn parse(body: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = FieldReader::new(body);
        reader.expect_tag(HELLO_TAG)?;
        let major = reader.u16()?;
        let minor = reader.u16()?;
        let name = if reader.remaining() > 0 {
            Some(reader.string()?)
        } else {
            None
        };
        Ok(Self {
            version: ProtocolVersion::new(major, minor),
            name,
        })
    }
}

// ── 1.0 messages ──────────────────────────────────────────────────────────────

/// CINN: the cursor enters the client screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enter {
    /// Entry X coordinate on the client screen.
    pub x: i16,
    /// Entry Y coordinate on the client screen.
    pub y: i16,
    /// Sequence number; the client echoes it in later clipboard messages.
    pub sequence: u32,
    /// Toggle-modifier mask (caps/num/scroll lock) at the time of entry.
    pub mask: u16,
}

impl WireMessage for Enter {
    const CODE: MessageCode = MessageCode::ENTER;

    fn write_fields(&self, frame: FrameBuilder) -> FrameBuilder {
        frame
            .i16(self.x)
            .i16(self.y)
            .u32(self.sequence)
            .u16(self.mask)
    }

    fn read_fields(reader: &mut FieldReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            x: reader.i16()?,
            y: reader.i16()?,
            sequence: reader.u32()?,
            mask: reader.u16()?,
        })
    }
}

/// DINF: the client's screen shape and cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientInfo {
    pub x: i16,
    pub y: i16,
    pub width: i16,
    pub height: i16,
    /// Obsolete warp-zone size; always sent as 0 by current clients.
    pub warp: i16,
    pub cursor_x: i16,
    pub cursor_y: i16,
}

impl WireMessage for ClientInfo {
    const CODE: MessageCode = MessageCode::CLIENT_INFO;

    fn write_fields(&self, frame: FrameBuilder) -> FrameBuilder {
        frame
            .i16(self.x)
            .i16(self.y)
            .i16(self.width)
            .i16(self.height)
            .i16(self.warp)
            .i16(self.cursor_x)
            .i16(self.cursor_y)
    }

    fn read_fields(reader: &mut FieldReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            x: reader.i16()?,
            y: reader.i16()?,
            width: reader.i16()?,
            height: reader.i16()?,
            warp: reader.i16()?,
            cursor_x: reader.i16()?,
            cursor_y: reader.i16()?,
        })
    }
}

/// EICV: the server cannot speak the client's protocol major version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncompatibleVersion {
    /// The server's own version.
    pub version: ProtocolVersion,
}

impl WireMessage for IncompatibleVersion {
    const CODE: MessageCode = MessageCode::INCOMPATIBLE;

    fn write_fields(&self, frame: FrameBuilder) -> FrameBuilder {
        frame.u16(self.version.major).u16(self.version.minor)
    }

    fn read_fields(reader: &mut FieldReader<'_>) -> Result<Self, ProtocolError> {
        let major = reader.u16()?;
        let minor = reader.u16()?;
        Ok(Self {
            version: ProtocolVersion::new(major, minor),
        })
    }
}

// ── 1.7 messages ──────────────────────────────────────────────────────────────

/// LSYN: a peer's keyboard-layout catalogue.
///
/// The payload is a single string of two-character codes with no delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageList {
    pub layouts: String,
}

impl LanguageList {
    pub fn from_catalogue(catalogue: &LayoutCatalogue) -> Self {
        Self {
            layouts: catalogue.encode(),
        }
    }

    /// Splits the payload into codes; a dangling odd character is dropped.
    pub fn catalogue(&self) -> LayoutCatalogue {
        LayoutCatalogue::decode(&self.layouts)
    }
}

impl WireMessage for LanguageList {
    const CODE: MessageCode = MessageCode::LANGUAGE_LIST;

    fn write_fields(&self, frame: FrameBuilder) -> FrameBuilder {
        frame.string(&self.layouts)
    }

    fn read_fields(reader: &mut FieldReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            layouts: reader.string()?,
        })
    }
}

/// LSET: the sender's active keyboard language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSet {
    pub language: String,
}

impl LanguageSet {
    pub fn new(code: LayoutCode) -> Self {
        Self {
            language: code.to_string(),
        }
    }
}

impl WireMessage for LanguageSet {
    const CODE: MessageCode = MessageCode::LANGUAGE_SET;

    fn write_fields(&self, frame: FrameBuilder) -> FrameBuilder {
        frame.string(&self.language)
    }

    fn read_fields(reader: &mut FieldReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            language: reader.string()?,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
