//! Recording keyboard service for tests.
//!
//! Behaves like [`StaticKeyboardService`] and additionally records every call,
//! so integration tests can check how often the catalogue was queried and
//! which switches were requested after handing the service to a session.

use std::sync::{Arc, Mutex};

use langsync_core::{LayoutCatalogue, LayoutCode};

use super::{KeyboardError, StaticKeyboardService};
use crate::application::platform::KeyboardLayoutService;

#[derive(Debug, Default)]
struct Calls {
    installed_queries: usize,
    set_requests: Vec<(LayoutCode, bool)>,
}

/// A [`KeyboardLayoutService`] with an observable call log.
///
/// Clones share the log and the layout state.
#[derive(Debug, Clone)]
pub struct RecordingKeyboard {
    inner: Arc<Mutex<StaticKeyboardService>>,
    calls: Arc<Mutex<Calls>>,
}

impl RecordingKeyboard {
    /// # Errors
    ///
    /// Same as [`StaticKeyboardService::new`].
    pub fn new(
        layouts: impl IntoIterator<Item = LayoutCode>,
        active: Option<LayoutCode>,
    ) -> Result<Self, KeyboardError> {
        Ok(Self {
            inner: Arc::new(Mutex::new(StaticKeyboardService::new(layouts, active)?)),
            calls: Arc::new(Mutex::new(Calls::default())),
        })
    }

    /// Number of `installed_layouts` calls so far.
    pub fn installed_queries(&self) -> usize {
        self.calls.lock().expect("lock poisoned").installed_queries
    }

    /// Every `set_active_layout` request with the result it returned.
    pub fn set_requests(&self) -> Vec<(LayoutCode, bool)> {
        self.calls.lock().expect("lock poisoned").set_requests.clone()
    }

    pub fn current(&self) -> LayoutCode {
        self.inner.lock().expect("lock poisoned").active_layout()
    }
}

impl KeyboardLayoutService for RecordingKeyboard {
    fn installed_layouts(&self) -> LayoutCatalogue {
        self.calls.lock().expect("lock poisoned").installed_queries += 1;
        self.inner.lock().expect("lock poisoned").installed_layouts()
    }

    fn active_layout(&self) -> LayoutCode {
        self.current()
    }

    fn set_active_layout(&mut self, code: LayoutCode) -> bool {
        let accepted = self
            .inner
            .lock()
            .expect("lock poisoned")
            .set_active_layout(code);
        self.calls
            .lock()
            .expect("lock poisoned")
            .set_requests
            .push((code, accepted));
        accepted
    }
}
