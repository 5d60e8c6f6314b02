//! Network infrastructure for the server.
//!
//! # Sub-modules
//!
//! - **`framing`** – Reads and writes length-prefixed frames on any async
//!   byte stream.
//!
//! - **`handshake`** – Exchanges hellos, negotiates the protocol version, and
//!   rejects clients with an incompatible major version.
//!
//! - **`session`** – One task per client: feeds received frames through the
//!   protocol chain, executes enter/leave commands, sends keep-alives, and
//!   writes the queued frames in order.
//!
//! - **`listener`** – The TCP accept loop and the [`listener::ServerHandle`]
//!   used to address connected clients by name.

pub mod framing;
pub mod handshake;
pub mod listener;
pub mod session;

use std::time::Duration;

use langsync_core::{ProtocolError, ProtocolVersion};
use thiserror::Error;

use crate::application::chain::ChainError;

/// Errors that end a client session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("client speaks incompatible protocol {0}")]
    IncompatibleVersion(ProtocolVersion),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("handshake did not complete within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("no traffic from client for {0:?}")]
    KeepAliveTimeout(Duration),
}
