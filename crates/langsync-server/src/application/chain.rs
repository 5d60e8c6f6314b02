//! Protocol-version chain.
//!
//! Each protocol revision is a [`ProtocolHandler`] that wraps the handler for
//! the revision before it.  An incoming message goes to the newest handler
//! first; a handler that does not own the message code hands it to its
//! fallback, all the way down to the 1.0 base.  Outbound operations such as
//! [`ProtocolHandler::enter`] work the same way: a revision may write its own
//! frames and then delegate so that the older revisions' frames follow.
//!
//! Handlers never touch the socket.  They queue frames in an [`Outbox`] held
//! by the [`SessionContext`], and the network session writes them in order.

use std::sync::Arc;

use langsync_core::protocol::messages::{ClientInfo, WireMessage};
use langsync_core::{FieldReader, MessageCode, ProtocolError, ProtocolVersion};
use thiserror::Error;

use super::language_sync::LanguageSync;
use super::lifecycle::{LifecycleEvents, SessionId, TriggerCallback};
use super::platform::{KeyboardHandle, Notify};
use super::protocol_v1_0::ProtocolV1_0;
use super::protocol_v1_3::ProtocolV1_3;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Failures while dispatching one received message.  All are fatal to the session.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("malformed {code} message: {source}")]
    Decode {
        code: MessageCode,
        #[source]
        source: ProtocolError,
    },

    #[error("message {code} is not part of protocol {version}")]
    Unrecognized {
        code: MessageCode,
        version: ProtocolVersion,
    },
}

impl ChainError {
    /// Wraps a field decode failure for the message being handled.
    pub fn decode(code: MessageCode) -> impl FnOnce(ProtocolError) -> ChainError {
        move |source| ChainError::Decode { code, source }
    }
}

// ── Session state shared by all revisions ─────────────────────────────────────

/// Frames queued for the client, in write order.
#[derive(Debug, Default)]
pub struct Outbox {
    frames: Vec<Vec<u8>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<M: WireMessage>(&mut self, message: &M) {
        self.frames.push(message.to_frame());
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Takes every queued frame, leaving the outbox empty.
    pub fn drain(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.frames)
    }

    /// The message code of each queued frame, in order.
    pub fn codes(&self) -> Vec<MessageCode> {
        self.frames
            .iter()
            .filter_map(|frame| frame.get(4..).and_then(MessageCode::from_prefix))
            .collect()
    }
}

/// Per-connection state every revision can read and update.
#[derive(Debug)]
pub struct SessionContext {
    /// The client's screen name from its hello.
    pub name: String,
    /// Last screen shape reported with DINF.
    pub screen: Option<ClientInfo>,
    /// Number of keep-alives received from the client.
    pub keep_alives: u64,
    pub outbox: Outbox,
}

impl SessionContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            screen: None,
            keep_alives: 0,
            outbox: Outbox::new(),
        }
    }
}

/// Parameters of a screen-enter request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnterScreen {
    pub x: i16,
    pub y: i16,
    pub sequence: u32,
    pub mask: u16,
    /// The cursor moved because the screensaver activated, not by user motion.
    pub for_screensaver: bool,
}

// ── Handler trait ─────────────────────────────────────────────────────────────

/// One protocol revision in the chain.
///
/// The default methods forward to [`fallback`](ProtocolHandler::fallback), so
/// a revision only overrides the operations it changes.
pub trait ProtocolHandler: Send {
    fn version(&self) -> ProtocolVersion;

    /// The next-older revision, or `None` for the base.
    fn fallback(&mut self) -> Option<&mut dyn ProtocolHandler>;

    /// Handles the message if this revision owns `code`, otherwise forwards it.
    ///
    /// Returns `Ok(false)` when no revision down the chain recognizes `code`.
    /// A handler that forwards must not have read from `body`.
    fn parse_message(
        &mut self,
        code: MessageCode,
        body: &mut FieldReader<'_>,
        ctx: &mut SessionContext,
    ) -> Result<bool, ChainError> {
        match self.fallback() {
            Some(next) => next.parse_message(code, body, ctx),
            None => Ok(false),
        }
    }

    fn enter(&mut self, enter: &EnterScreen, ctx: &mut SessionContext) {
        if let Some(next) = self.fallback() {
            next.enter(enter, ctx);
        }
    }

    fn leave(&mut self, ctx: &mut SessionContext) {
        if let Some(next) = self.fallback() {
            next.leave(ctx);
        }
    }

    /// Called once the "client connected" trigger fires for this session.
    fn client_connected(&mut self, ctx: &mut SessionContext) {
        if let Some(next) = self.fallback() {
            next.client_connected(ctx);
        }
    }
}

// ── Chain ─────────────────────────────────────────────────────────────────────

/// Services the revisions need when they are constructed.
#[derive(Clone)]
pub struct ChainDeps {
    pub session_id: SessionId,
    pub events: Arc<dyn LifecycleEvents>,
    /// Invoked when the session's "client connected" trigger fires.
    pub on_connected: TriggerCallback,
    pub keyboard: KeyboardHandle,
    pub notifier: Arc<dyn Notify>,
}

/// The assembled handler stack for one session, newest revision on top.
pub struct ProtocolChain {
    head: Box<dyn ProtocolHandler>,
}

impl ProtocolChain {
    pub fn new(head: Box<dyn ProtocolHandler>) -> Self {
        Self { head }
    }

    /// Builds the stack for a negotiated `version`.
    ///
    /// 1.0 is always present; 1.3 and 1.7 are layered on when the version
    /// reaches them.  Versions newer than 1.7 get the 1.7 stack.
    pub fn build(version: ProtocolVersion, deps: &ChainDeps) -> Self {
        let mut head: Box<dyn ProtocolHandler> = Box::new(ProtocolV1_0::new());
        if version >= ProtocolVersion::V1_3 {
            head = Box::new(ProtocolV1_3::new(head));
        }
        if version >= ProtocolVersion::V1_7 {
            head = Box::new(LanguageSync::new(head, deps));
        }
        Self::new(head)
    }

    pub fn version(&self) -> ProtocolVersion {
        self.head.version()
    }

    /// Dispatches one received frame body (code included).
    ///
    /// # Errors
    ///
    /// [`ChainError::Decode`] when the body or its fields are truncated or
    /// malformed, [`ChainError::Unrecognized`] when no revision owns the code.
    pub fn dispatch(
        &mut self,
        body: &[u8],
        ctx: &mut SessionContext,
    ) -> Result<MessageCode, ChainError> {
        let mut reader = FieldReader::new(body);
        let code = reader.code().map_err(|source| ChainError::Decode {
            code: MessageCode::from_prefix(body).unwrap_or(MessageCode([0; 4])),
            source,
        })?;

        if !self.head.parse_message(code, &mut reader, ctx)? {
            return Err(ChainError::Unrecognized {
                code,
                version: self.version(),
            });
        }
        if reader.remaining() > 0 {
            tracing::trace!(%code, trailing = reader.remaining(), "ignoring trailing bytes");
        }
        Ok(code)
    }

    pub fn enter(&mut self, enter: &EnterScreen, ctx: &mut SessionContext) {
        self.head.enter(enter, ctx);
    }

    pub fn leave(&mut self, ctx: &mut SessionContext) {
        self.head.leave(ctx);
    }

    pub fn client_connected(&mut self, ctx: &mut SessionContext) {
        self.head.client_connected(ctx);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
