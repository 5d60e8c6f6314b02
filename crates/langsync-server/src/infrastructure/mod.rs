//! Infrastructure layer for the server.
//!
//! Contains OS-facing adapters: the event queue that fires lifecycle
//! triggers, keyboard-layout backends, desktop notifications, TCP sessions,
//! and file-system configuration storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `langsync_core`, but MUST NOT be imported by the `application` layer.

pub mod events;
pub mod keyboard;
pub mod network;
pub mod notify;
pub mod storage;
