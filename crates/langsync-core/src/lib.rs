//! # langsync-core
//!
//! Shared library for the LangSync server containing the wire codec, the
//! protocol message catalogue, and the keyboard-layout domain types.
//!
//! It has zero dependencies on OS APIs or network sockets.
//!
//! # Architecture overview
//!
//! LangSync is the server half of a keyboard/mouse sharing protocol.  One host
//! (the "server") owns the physical keyboard and mouse; remote machines
//! ("clients") receive the input when the cursor crosses onto their screen.
//! Each protocol revision adds message types while still talking to older
//! clients, and revision 1.7 adds keyboard-language negotiation so that
//! keystrokes are interpreted with the same layout on both ends.
//!
//! This crate defines:
//!
//! - **`protocol`** – How bytes travel over the network.  Every message is a
//!   length-prefixed frame that starts with a 4-byte [`MessageCode`]; the
//!   fields after it are big-endian integers and length-prefixed strings.
//!
//! - **`domain`** – The keyboard-language model: [`LayoutCode`],
//!   [`LayoutCatalogue`] and the reconciliation of a peer's catalogue against
//!   the local one.

pub mod domain;
pub mod protocol;

pub use domain::language::{LayoutCatalogue, LayoutCode, LayoutCodeError, Reconciliation};
pub use protocol::codec::{FieldReader, FrameBuilder, ProtocolError};
pub use protocol::codes::MessageCode;
pub use protocol::version::ProtocolVersion;
