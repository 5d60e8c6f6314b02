//! Platform ports used by the protocol handlers.
//!
//! The language-sync revision needs three things from the host: the list of
//! installed keyboard layouts, the ability to read and switch the active one,
//! and a way to tell the user that something is missing.  Each is a trait here
//! with concrete implementations in `infrastructure::keyboard` and
//! `infrastructure::notify`.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use langsync_core::{LayoutCatalogue, LayoutCode};

/// Access to the host's keyboard layouts.
///
/// `installed_layouts` is re-queried on every call; the host may add or
/// remove layouts while the server runs.
#[cfg_attr(test, mockall::automock)]
pub trait KeyboardLayoutService: Send {
    /// Layouts currently installed, in the host's order, without duplicates.
    fn installed_layouts(&self) -> LayoutCatalogue;

    /// The layout keystrokes are interpreted with right now.
    fn active_layout(&self) -> LayoutCode;

    /// Switches to `code`.  Returns `false` (leaving the layout unchanged)
    /// when `code` is not installed or the switch fails.
    fn set_active_layout(&mut self, code: LayoutCode) -> bool;
}

/// Shared, serialized handle to the process-wide keyboard service.
///
/// Every session holds a clone; the inner mutex makes layout queries and
/// switches from different connections run one at a time.
#[derive(Clone)]
pub struct KeyboardHandle {
    inner: Arc<Mutex<Box<dyn KeyboardLayoutService>>>,
}

impl KeyboardHandle {
    pub fn new(service: impl KeyboardLayoutService + 'static) -> Self {
        Self::from_boxed(Box::new(service))
    }

    pub fn from_boxed(service: Box<dyn KeyboardLayoutService>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    pub fn installed_layouts(&self) -> LayoutCatalogue {
        self.lock().installed_layouts()
    }

    pub fn active_layout(&self) -> LayoutCode {
        self.lock().active_layout()
    }

    pub fn set_active_layout(&self, code: LayoutCode) -> bool {
        self.lock().set_active_layout(code)
    }

    // A panic inside a service call leaves no partial state worth refusing.
    fn lock(&self) -> MutexGuard<'_, Box<dyn KeyboardLayoutService>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for KeyboardHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyboardHandle").finish_non_exhaustive()
    }
}

/// Fire-and-forget user notification.
///
/// Implementations must return without waiting for the user or the desktop's
/// notification service.
pub trait Notify: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> LayoutCode {
        LayoutCode::try_from(s).expect("valid code")
    }

    #[test]
    fn test_handle_forwards_to_service() {
        // Arrange
        let mut service = MockKeyboardLayoutService::new();
        service
            .expect_installed_layouts()
            .times(1)
            .returning(|| LayoutCatalogue::decode("enfr"));
        service
            .expect_active_layout()
            .times(1)
            .returning(|| LayoutCode::new('e', 'n'));
        service
            .expect_set_active_layout()
            .withf(|c| *c == LayoutCode::new('f', 'r'))
            .times(1)
            .return_const(true);
        let handle = KeyboardHandle::new(service);

        // Act / Assert
        assert_eq!(handle.installed_layouts().encode(), "enfr");
        assert_eq!(handle.active_layout(), code("en"));
        assert!(handle.set_active_layout(code("fr")));
    }

    #[test]
    fn test_cloned_handles_share_one_service() {
        let mut service = MockKeyboardLayoutService::new();
        service
            .expect_set_active_layout()
            .times(2)
            .return_const(false);
        let a = KeyboardHandle::new(service);
        let b = a.clone();

        assert!(!a.set_active_layout(code("de")));
        assert!(!b.set_active_layout(code("de")));
    }
}
