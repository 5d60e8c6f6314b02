//! Application layer for the server.
//!
//! Everything here is synchronous and free of sockets and OS calls.  The
//! network session feeds received frames in and writes out whatever the
//! handlers queued; platform services are reached through the traits in
//! [`platform`] and [`lifecycle`], implemented in the infrastructure layer.
//!
//! # Sub-modules
//!
//! - **`chain`** – The protocol-version chain: an ordered list of handlers,
//!   newest first, each falling back to the next-older revision for codes it
//!   does not own.
//!
//! - **`protocol_v1_0`**, **`protocol_v1_3`** – The base revision and the
//!   keep-alive revision.
//!
//! - **`language_sync`** – Revision 1.7: keyboard-layout catalogue exchange on
//!   connect and active-language push on every screen enter.
//!
//! - **`lifecycle`** – The "client connected" trigger owned by a session for
//!   as long as it lives.
//!
//! - **`platform`** – Keyboard-layout and user-notification ports.

pub mod chain;
pub mod language_sync;
pub mod lifecycle;
pub mod platform;
pub mod protocol_v1_0;
pub mod protocol_v1_3;
