//! Desktop notifications.
//!
//! Showing a notification is a blocking OS call (on Linux it spawns
//! `notify-send` and waits for it).  Session handlers must not wait for it, so
//! every notification goes through a [`NotificationQueue`]: a bounded channel
//! drained by one dedicated worker thread.  [`NotificationQueue::notify`]
//! never blocks; if the worker falls behind, new notifications are dropped
//! with a warning.

#[cfg(target_os = "linux")]
pub mod linux;
pub mod mock;

use std::sync::mpsc::{self, SyncSender, TrySendError};

use tracing::{debug, info, warn};

use crate::application::platform::Notify;

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Shows a notification to the user.  May block.
pub trait UserNotifier: Send + 'static {
    fn show(&self, notification: &Notification);
}

/// Writes notifications to the log; used where no desktop service exists.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl UserNotifier for LogNotifier {
    fn show(&self, notification: &Notification) {
        warn!(title = %notification.title, "{}", notification.body);
    }
}

/// The notifier for this platform.
pub fn platform_notifier() -> Box<dyn UserNotifier> {
    #[cfg(target_os = "linux")]
    {
        Box::new(linux::NotifySendNotifier::new())
    }
    #[cfg(not(target_os = "linux"))]
    {
        Box::new(LogNotifier)
    }
}

impl<T: UserNotifier + ?Sized> UserNotifier for Box<T> {
    fn show(&self, notification: &Notification) {
        (**self).show(notification);
    }
}

/// Cloneable, non-blocking front end of the notification worker.
///
/// The worker thread exits once every clone has been dropped.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    sender: SyncSender<Notification>,
}

impl NotificationQueue {
    pub const DEFAULT_CAPACITY: usize = 16;

    /// Starts the worker with [`DEFAULT_CAPACITY`](Self::DEFAULT_CAPACITY).
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the worker thread cannot be spawned.
    pub fn spawn(notifier: impl UserNotifier) -> std::io::Result<Self> {
        Self::with_capacity(notifier, Self::DEFAULT_CAPACITY)
    }

    /// # Errors
    ///
    /// Returns an I/O error if the worker thread cannot be spawned.
    pub fn with_capacity(notifier: impl UserNotifier, capacity: usize) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::sync_channel::<Notification>(capacity);
        std::thread::Builder::new()
            .name("langsync-notify".to_string())
            .spawn(move || {
                for notification in receiver {
                    debug!(title = %notification.title, "showing notification");
                    notifier.show(&notification);
                }
                debug!("notification worker stopped");
            })?;
        Ok(Self { sender })
    }

    /// Queues a notification and returns immediately.
    pub fn notify(&self, title: &str, body: &str) {
        let notification = Notification {
            title: title.to_string(),
            body: body.to_string(),
        };
        match self.sender.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                warn!(title = %dropped.title, "notification queue full; dropping notification");
            }
            Err(TrySendError::Disconnected(dropped)) => {
                info!(title = %dropped.title, body = %dropped.body, "notification worker gone");
            }
        }
    }
}

impl Notify for NotificationQueue {
    fn notify(&self, title: &str, body: &str) {
        NotificationQueue::notify(self, title, body);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
