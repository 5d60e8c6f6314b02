//! Protocol version numbers exchanged in the hello handshake.

use std::fmt;

/// A `major.minor` protocol revision.
///
/// Ordering compares `major` first, then `minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion {
    pub major: u16,
    pub minor: u16,
}

impl ProtocolVersion {
    /// The base revision every client understands.
    pub const V1_0: ProtocolVersion = ProtocolVersion::new(1, 0);
    /// Adds keep-alive (`CALV`).
    pub const V1_3: ProtocolVersion = ProtocolVersion::new(1, 3);
    /// Adds keyboard-language synchronization (`LSYN`, `LSET`).
    pub const V1_7: ProtocolVersion = ProtocolVersion::new(1, 7);
    /// The newest revision this implementation speaks.
    pub const CURRENT: ProtocolVersion = Self::V1_7;

    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// Chooses the revision both peers can speak, or `None` when the majors differ.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use langsync_core::ProtocolVersion;
    ///
    /// let server = ProtocolVersion::new(1, 7);
    /// assert_eq!(server.negotiate(ProtocolVersion::new(1, 4)), Some(ProtocolVersion::new(1, 4)));
    /// assert_eq!(server.negotiate(ProtocolVersion::new(1, 9)), Some(server));
    /// assert_eq!(server.negotiate(ProtocolVersion::new(2, 0)), None);
    /// ```
    pub fn negotiate(self, peer: ProtocolVersion) -> Option<ProtocolVersion> {
        if self.major != peer.major {
            return None;
        }
        Some(ProtocolVersion::new(self.major, self.minor.min(peer.minor)))
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
