//! Connection lifecycle hooks.
//!
//! A session that wants to react to "client connected" registers a trigger
//! with the event runtime when it is built and must remove it when it is torn
//! down.  [`ConnectedHook`] ties both halves to one value: registration happens
//! in [`ConnectedHook::register`] and unregistration in `Drop`, so every exit
//! path (normal close, error, or a session abandoned half-way through
//! construction) releases the trigger exactly once.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

/// Identifies one client session; triggers are keyed by it.
pub type SessionId = Uuid;

/// Callback invoked when a trigger fires.
pub type TriggerCallback = Arc<dyn Fn() + Send + Sync>;

/// Lifecycle events a session can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The handshake completed and the session is ready for traffic.
    ClientConnected,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::ClientConnected => f.write_str("client-connected"),
        }
    }
}

/// The event runtime's registration surface.
///
/// Implemented by the infrastructure event queue; mocked in unit tests.
#[cfg_attr(test, mockall::automock)]
pub trait LifecycleEvents: Send + Sync {
    /// Stores `callback` for `(kind, owner)`, replacing any earlier entry.
    fn register_trigger(&self, kind: EventKind, owner: SessionId, callback: TriggerCallback);

    /// Removes the trigger for `(kind, owner)`.  Returns `false` if none was registered.
    fn unregister_trigger(&self, kind: EventKind, owner: SessionId) -> bool;
}

/// Owns the "client connected" trigger of one session.
///
/// Dropping the hook unregisters the trigger.
pub struct ConnectedHook {
    events: Arc<dyn LifecycleEvents>,
    owner: SessionId,
}

impl ConnectedHook {
    pub fn register(
        events: Arc<dyn LifecycleEvents>,
        owner: SessionId,
        callback: TriggerCallback,
    ) -> Self {
        events.register_trigger(EventKind::ClientConnected, owner, callback);
        Self { events, owner }
    }
}

impl Drop for ConnectedHook {
    fn drop(&mut self) {
        if !self
            .events
            .unregister_trigger(EventKind::ClientConnected, self.owner)
        {
            tracing::debug!(owner = %self.owner, "connected trigger was already gone");
        }
    }
}

impl fmt::Debug for ConnectedHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectedHook")
            .field("owner", &self.owner)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
