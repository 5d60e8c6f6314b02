//! Keyboard-layout backends.
//!
//! - [`StaticKeyboardService`]: layouts listed in the config file.  Switching
//!   only changes which of them is reported as active.  Works everywhere and
//!   is what the tests use.
//! - [`linux::XkbKeyboardService`]: the X11 keyboard groups, read and locked
//!   through XKB (Linux only).
//! - [`mock::RecordingKeyboard`]: wraps the static backend and records calls.

#[cfg(target_os = "linux")]
pub mod linux;
pub mod mock;

use langsync_core::{LayoutCatalogue, LayoutCode};
use thiserror::Error;

use crate::application::platform::{KeyboardHandle, KeyboardLayoutService};
use crate::infrastructure::storage::config::{KeyboardBackend, KeyboardConfig};

#[derive(Debug, Error)]
pub enum KeyboardError {
    #[error("no keyboard layouts are configured")]
    NoLayouts,

    #[error("active layout {0} is not among the installed layouts")]
    ActiveNotInstalled(LayoutCode),

    #[error("X display unavailable: {0}")]
    Display(String),

    #[error("XKB request {0} failed")]
    Xkb(&'static str),

    #[error("keyboard backend {0:?} is not available on this platform")]
    Unsupported(KeyboardBackend),
}

/// Layouts held in memory.
#[derive(Debug, Clone)]
pub struct StaticKeyboardService {
    layouts: LayoutCatalogue,
    active: LayoutCode,
}

impl StaticKeyboardService {
    /// Duplicates in `layouts` are dropped; `active` defaults to the first layout.
    ///
    /// # Errors
    ///
    /// [`KeyboardError::NoLayouts`] for an empty list and
    /// [`KeyboardError::ActiveNotInstalled`] when `active` is not listed.
    pub fn new(
        layouts: impl IntoIterator<Item = LayoutCode>,
        active: Option<LayoutCode>,
    ) -> Result<Self, KeyboardError> {
        let mut catalogue = LayoutCatalogue::new();
        for code in layouts {
            catalogue.push_unique(code);
        }
        let first = catalogue.iter().next().copied().ok_or(KeyboardError::NoLayouts)?;
        let active = active.unwrap_or(first);
        if !catalogue.contains(&active) {
            return Err(KeyboardError::ActiveNotInstalled(active));
        }
        Ok(Self {
            layouts: catalogue,
            active,
        })
    }
}

impl KeyboardLayoutService for StaticKeyboardService {
    fn installed_layouts(&self) -> LayoutCatalogue {
        self.layouts.clone()
    }

    fn active_layout(&self) -> LayoutCode {
        self.active
    }

    fn set_active_layout(&mut self, code: LayoutCode) -> bool {
        if !self.layouts.contains(&code) {
            return false;
        }
        self.active = code;
        true
    }
}

/// Builds the process-wide keyboard handle for `config`.
///
/// # Errors
///
/// Returns [`KeyboardError`] when the static layouts are invalid, the xkb
/// backend cannot read the current layouts, or the backend does not exist on
/// this platform.
pub fn keyboard_from_config(config: &KeyboardConfig) -> Result<KeyboardHandle, KeyboardError> {
    match config.backend {
        KeyboardBackend::Static => Ok(KeyboardHandle::new(StaticKeyboardService::new(
            config.layouts.iter().copied(),
            config.active,
        )?)),
        #[cfg(target_os = "linux")]
        KeyboardBackend::Xkb => Ok(KeyboardHandle::new(linux::XkbKeyboardService::new()?)),
        #[cfg(not(target_os = "linux"))]
        KeyboardBackend::Xkb => Err(KeyboardError::Unsupported(KeyboardBackend::Xkb)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> LayoutCode {
        s.parse().unwrap()
    }

    #[test]
    fn test_static_service_defaults_active_to_first_layout() {
        let service = StaticKeyboardService::new([code("fr"), code("en")], None).unwrap();
        assert_eq!(service.active_layout(), code("fr"));
        assert_eq!(service.installed_layouts().encode(), "fren");
    }

    #[test]
    fn test_static_service_drops_duplicate_layouts() {
        let service =
            StaticKeyboardService::new([code("en"), code("fr"), code("en")], None).unwrap();
        assert_eq!(service.installed_layouts().len(), 2);
    }

    #[test]
    fn test_static_service_rejects_empty_list() {
        let result = StaticKeyboardService::new([], None);
        assert!(matches!(result, Err(KeyboardError::NoLayouts)));
    }

    #[test]
    fn test_static_service_rejects_unlisted_active() {
        let result = StaticKeyboardService::new([code("en")], Some(code("de")));
        assert!(matches!(result, Err(KeyboardError::ActiveNotInstalled(c)) if c == code("de")));
    }

    #[test]
    fn test_set_active_layout_only_accepts_installed() {
        // Arrange
        let mut service = StaticKeyboardService::new([code("en"), code("fr")], None).unwrap();

        // Act / Assert
        assert!(service.set_active_layout(code("fr")));
        assert_eq!(service.active_layout(), code("fr"));

        assert!(!service.set_active_layout(code("de")));
        assert_eq!(service.active_layout(), code("fr"));
    }

    #[test]
    fn test_keyboard_from_default_config_is_static_english() {
        let handle = keyboard_from_config(&KeyboardConfig::default()).unwrap();
        assert_eq!(handle.active_layout(), code("en"));
        assert_eq!(handle.installed_layouts().encode(), "en");
    }
}
