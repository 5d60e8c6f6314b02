//! Process-wide lifecycle event queue.
//!
//! Sessions register triggers keyed by `(EventKind, SessionId)`; the listener
//! fires them.  Firing never runs a callback while the table lock is held, so
//! a callback may itself register or unregister triggers.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::application::lifecycle::{EventKind, LifecycleEvents, SessionId, TriggerCallback};

#[derive(Default)]
pub struct EventQueue {
    triggers: Mutex<HashMap<(EventKind, SessionId), TriggerCallback>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the trigger registered for `(kind, owner)`.
    ///
    /// Returns `false` when nothing is registered, e.g. because the session
    /// speaks a revision that does not subscribe to `kind`.
    pub fn fire(&self, kind: EventKind, owner: SessionId) -> bool {
        let callback = self.lock().get(&(kind, owner)).cloned();
        match callback {
            Some(callback) => {
                debug!(%kind, %owner, "firing trigger");
                callback();
                true
            }
            None => {
                debug!(%kind, %owner, "no trigger registered");
                false
            }
        }
    }

    pub fn is_registered(&self, kind: EventKind, owner: SessionId) -> bool {
        self.lock().contains_key(&(kind, owner))
    }

    /// Number of registered triggers across all sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(EventKind, SessionId), TriggerCallback>> {
        self.triggers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LifecycleEvents for EventQueue {
    fn register_trigger(&self, kind: EventKind, owner: SessionId, callback: TriggerCallback) {
        if self.lock().insert((kind, owner), callback).is_some() {
            warn!(%kind, %owner, "replaced an existing trigger");
        }
    }

    fn unregister_trigger(&self, kind: EventKind, owner: SessionId) -> bool {
        self.lock().remove(&(kind, owner)).is_some()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
