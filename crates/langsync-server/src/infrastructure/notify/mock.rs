//! Recording notifier for tests.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use super::{Notification, UserNotifier};

/// Records every notification it is asked to show.
///
/// Clones share the record, so a test keeps one clone and hands the other to
/// a [`NotificationQueue`](super::NotificationQueue).
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    shown: Arc<(Mutex<Vec<Notification>>, Condvar)>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications shown so far.
    pub fn shown(&self) -> Vec<Notification> {
        self.shown.0.lock().expect("lock poisoned").clone()
    }

    /// Waits until at least `count` notifications were shown or `timeout`
    /// passes, then returns what was shown.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Notification> {
        let (lock, cvar) = &*self.shown;
        let deadline = Instant::now() + timeout;
        let mut shown = lock.lock().expect("lock poisoned");
        while shown.len() < count {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            shown = cvar
                .wait_timeout(shown, deadline - now)
                .expect("lock poisoned")
                .0;
        }
        shown.clone()
    }
}

impl UserNotifier for RecordingNotifier {
    fn show(&self, notification: &Notification) {
        let (lock, cvar) = &*self.shown;
        lock.lock()
            .expect("lock poisoned")
            .push(notification.clone());
        cvar.notify_all();
    }
}
