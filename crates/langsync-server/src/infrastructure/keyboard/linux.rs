//! X11 keyboard layouts through the XKB extension of Xlib.
//!
//! An X keyboard has up to four layout groups.  Each group carries a
//! descriptive name atom such as `English (US)` or `Russian`, and exactly one
//! group is locked at a time.  The locked group is the active language; the
//! user's layout-switch hotkey changes it and so does [`XkbLockGroup`].
//!
//! Group names are mapped to two-letter language codes through
//! [`LANGUAGE_NAMES`], falling back to short layout names (`us`, `ua`) for
//! keymaps that name their groups that way.
//!
//! [`XkbLockGroup`]: x11::xlib::XkbLockGroup

use std::ffi::CStr;
use std::mem::MaybeUninit;
use std::os::raw::{c_uint, c_void};

use langsync_core::{LayoutCatalogue, LayoutCode};
use tracing::{debug, warn};
use x11::xlib;

use super::KeyboardError;
use crate::application::platform::KeyboardLayoutService;

const XKB_USE_CORE_KBD: c_uint = 0x0100;
const XKB_GROUP_NAMES_MASK: c_uint = 1 << 12;
const XKB_NUM_KBD_GROUPS: usize = 4;
const SUCCESS: i32 = 0;

/// Leading word of an XKB group name → ISO 639-1 language code.
const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("English", "en"),
    ("German", "de"),
    ("French", "fr"),
    ("Spanish", "es"),
    ("Italian", "it"),
    ("Portuguese", "pt"),
    ("Dutch", "nl"),
    ("Russian", "ru"),
    ("Ukrainian", "uk"),
    ("Belarusian", "be"),
    ("Polish", "pl"),
    ("Czech", "cs"),
    ("Slovak", "sk"),
    ("Hungarian", "hu"),
    ("Romanian", "ro"),
    ("Bulgarian", "bg"),
    ("Greek", "el"),
    ("Turkish", "tr"),
    ("Swedish", "sv"),
    ("Norwegian", "nb"),
    ("Danish", "da"),
    ("Finnish", "fi"),
    ("Estonian", "et"),
    ("Latvian", "lv"),
    ("Lithuanian", "lt"),
    ("Hebrew", "he"),
    ("Arabic", "ar"),
    ("Persian", "fa"),
    ("Hindi", "hi"),
    ("Thai", "th"),
    ("Japanese", "ja"),
    ("Korean", "ko"),
    ("Chinese", "zh"),
    ("Vietnamese", "vi"),
];

/// Short X11 layout name → ISO 639-1 language code.
const LANGUAGE_OF_LAYOUT: &[(&str, &str)] = &[
    ("us", "en"),
    ("gb", "en"),
    ("au", "en"),
    ("ca", "fr"),
    ("at", "de"),
    ("ch", "de"),
    ("be", "fr"),
    ("latam", "es"),
    ("br", "pt"),
    ("ua", "uk"),
    ("by", "be"),
    ("cz", "cs"),
    ("gr", "el"),
    ("se", "sv"),
    ("no", "nb"),
    ("dk", "da"),
    ("ee", "et"),
    ("il", "he"),
    ("ara", "ar"),
    ("ir", "fa"),
    ("in", "hi"),
    ("jp", "ja"),
    ("kr", "ko"),
    ("cn", "zh"),
    ("tw", "zh"),
    ("vn", "vi"),
];

/// The language a group name types, if it maps to a two-letter code.
///
/// `English (US)` and `English (UK)` both give `en`; a bare layout name such
/// as `ua` goes through the short-name table, and any other two-letter
/// lowercase name is taken as the code itself.
pub fn language_of_group(name: &str) -> Option<LayoutCode> {
    let name = name.trim();
    let leading = name.split([' ', '(']).next().unwrap_or_default();
    if let Some((_, language)) = LANGUAGE_NAMES.iter().find(|(n, _)| *n == leading) {
        return LayoutCode::try_from(*language).ok();
    }
    if let Some((_, language)) = LANGUAGE_OF_LAYOUT.iter().find(|(n, _)| *n == name) {
        return LayoutCode::try_from(*language).ok();
    }
    if name.len() == 2 && name.chars().all(|c| c.is_ascii_lowercase()) {
        return LayoutCode::try_from(name).ok();
    }
    None
}

/// The distinct languages of `groups`, in group order.
pub fn languages(groups: &[String]) -> LayoutCatalogue {
    let mut catalogue = LayoutCatalogue::new();
    for code in groups.iter().filter_map(|g| language_of_group(g)) {
        catalogue.push_unique(code);
    }
    catalogue
}

/// Index of the first group typing `code`.
pub fn group_for(groups: &[String], code: LayoutCode) -> Option<usize> {
    groups
        .iter()
        .position(|g| language_of_group(g) == Some(code))
}

/// The keyboard state read in one display round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
struct XkbSnapshot {
    groups: Vec<String>,
    locked: usize,
}

impl XkbSnapshot {
    fn active(&self) -> Option<LayoutCode> {
        self.groups
            .get(self.locked)
            .and_then(|name| language_of_group(name))
    }
}

/// An open X display, closed on drop.
struct Display(*mut xlib::Display);

impl Display {
    fn open() -> Result<Self, KeyboardError> {
        // SAFETY: a null name makes XOpenDisplay use $DISPLAY.  The returned
        // pointer is released by XCloseDisplay in Drop.
        let display = unsafe { xlib::XOpenDisplay(std::ptr::null()) };
        if display.is_null() {
            let display_env = std::env::var("DISPLAY").unwrap_or_else(|_| "<unset>".to_string());
            return Err(KeyboardError::Display(format!(
                "XOpenDisplay failed; DISPLAY={display_env}"
            )));
        }
        Ok(Self(display))
    }

    fn snapshot(&self) -> Result<XkbSnapshot, KeyboardError> {
        Ok(XkbSnapshot {
            groups: self.group_names()?,
            locked: self.locked_group()?,
        })
    }

    fn locked_group(&self) -> Result<usize, KeyboardError> {
        let mut state = MaybeUninit::zeroed();
        // SAFETY: `self.0` is a live display and `state` is a writable,
        // zero-initialised XkbStateRec that XkbGetState fills on success.
        let status = unsafe { xlib::XkbGetState(self.0, XKB_USE_CORE_KBD, state.as_mut_ptr()) };
        if status != SUCCESS {
            return Err(KeyboardError::Xkb("XkbGetState"));
        }
        // SAFETY: zero is a valid bit pattern for every field and XkbGetState
        // succeeded.
        let state = unsafe { state.assume_init() };
        Ok(usize::from(state.group))
    }

    fn group_names(&self) -> Result<Vec<String>, KeyboardError> {
        // SAFETY: XkbAllocKeyboard has no preconditions; the description is
        // freed with XkbFreeKeyboard below on every path.
        let desc = unsafe { xlib::XkbAllocKeyboard() };
        if desc.is_null() {
            return Err(KeyboardError::Xkb("XkbAllocKeyboard"));
        }

        // SAFETY: `desc` is a freshly allocated keyboard description.
        let status = unsafe { xlib::XkbGetNames(self.0, XKB_GROUP_NAMES_MASK, desc) };
        let names = if status == SUCCESS {
            // SAFETY: XkbGetNames succeeded, so `desc.names` points to a names
            // record whose group atoms are filled in; unused groups are 0.
            let atoms = unsafe {
                let names = (*desc).names;
                if names.is_null() {
                    Vec::new()
                } else {
                    (&(*names).groups)[..XKB_NUM_KBD_GROUPS].to_vec()
                }
            };
            Ok(atoms
                .into_iter()
                .take_while(|&atom| atom != 0)
                .filter_map(|atom| self.atom_name(atom))
                .collect())
        } else {
            Err(KeyboardError::Xkb("XkbGetNames"))
        };

        // SAFETY: `desc` came from XkbAllocKeyboard and is not used after this.
        unsafe { xlib::XkbFreeKeyboard(desc, 0, xlib::True) };
        names
    }

    fn atom_name(&self, atom: xlib::Atom) -> Option<String> {
        // SAFETY: `atom` was reported by the server for this display.
        let raw = unsafe { xlib::XGetAtomName(self.0, atom) };
        if raw.is_null() {
            return None;
        }
        // SAFETY: XGetAtomName returns a NUL-terminated string that the caller
        // frees with XFree once it has been copied.
        let name = unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned();
        unsafe { xlib::XFree(raw.cast::<c_void>()) };
        Some(name)
    }

    fn lock_group(&self, index: usize) -> Result<(), KeyboardError> {
        let group = c_uint::try_from(index).map_err(|_| KeyboardError::Xkb("XkbLockGroup"))?;
        // SAFETY: `self.0` is a live display and `group` is below
        // XkbNumKbdGroups because it indexes the group names read from it.
        let sent = unsafe { xlib::XkbLockGroup(self.0, XKB_USE_CORE_KBD, group) };
        if sent == xlib::False {
            return Err(KeyboardError::Xkb("XkbLockGroup"));
        }
        // SAFETY: `self.0` is a live display.
        unsafe { xlib::XFlush(self.0) };
        Ok(())
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        // SAFETY: the pointer came from XOpenDisplay and is not used after this.
        unsafe { xlib::XCloseDisplay(self.0) };
    }
}

/// Reads layouts from the X server on every call.
///
/// The display is opened per call so the service stays `Send` and survives
/// X server restarts.
pub struct XkbKeyboardService {
    last_active: LayoutCode,
}

impl XkbKeyboardService {
    /// # Errors
    ///
    /// Returns [`KeyboardError`] if the X display cannot be opened, XKB
    /// requests fail, or no group maps to a language code.
    pub fn new() -> Result<Self, KeyboardError> {
        let snapshot = Display::open()?.snapshot()?;
        let last_active = snapshot
            .active()
            .or_else(|| languages(&snapshot.groups).iter().next().copied())
            .ok_or(KeyboardError::NoLayouts)?;
        debug!(groups = ?snapshot.groups, locked = snapshot.locked, "xkb keyboard backend ready");
        Ok(Self { last_active })
    }

    fn snapshot(&self) -> Option<XkbSnapshot> {
        Display::open()
            .and_then(|display| display.snapshot())
            .map_err(|e| warn!(error = %e, "could not read keyboard layouts"))
            .ok()
    }
}

impl KeyboardLayoutService for XkbKeyboardService {
    fn installed_layouts(&self) -> LayoutCatalogue {
        self.snapshot()
            .map(|snapshot| languages(&snapshot.groups))
            .unwrap_or_default()
    }

    fn active_layout(&self) -> LayoutCode {
        self.snapshot()
            .and_then(|snapshot| snapshot.active())
            .unwrap_or(self.last_active)
    }

    fn set_active_layout(&mut self, code: LayoutCode) -> bool {
        let result = Display::open().and_then(|display| {
            let groups = display.group_names()?;
            match group_for(&groups, code) {
                Some(index) => display.lock_group(index).map(|()| true),
                None => Ok(false),
            }
        });
        match result {
            Ok(true) => {
                self.last_active = code;
                true
            }
            Ok(false) => false,
            Err(e) => {
                warn!(error = %e, language = %code, "could not lock keyboard group");
                false
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> LayoutCode {
        s.parse().unwrap()
    }

    fn groups(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_descriptive_group_names_map_to_languages() {
        assert_eq!(language_of_group("English (US)"), Some(code("en")));
        assert_eq!(language_of_group("Russian"), Some(code("ru")));
        assert_eq!(language_of_group("German (Switzerland)"), Some(code("de")));
        assert_eq!(language_of_group("Ukrainian"), Some(code("uk")));
    }

    #[test]
    fn test_short_layout_names_map_to_languages() {
        assert_eq!(language_of_group("us"), Some(code("en")));
        assert_eq!(language_of_group("ua"), Some(code("uk")));
        assert_eq!(language_of_group("mk"), Some(code("mk")));
    }

    #[test]
    fn test_unknown_group_name_has_no_language() {
        assert_eq!(language_of_group("Esperanto"), None);
        assert_eq!(language_of_group("dvorak"), None);
        assert_eq!(language_of_group(""), None);
    }

    #[test]
    fn test_languages_deduplicates_in_group_order() {
        let groups = groups(&["English (US)", "Russian", "English (UK)", "Klingon"]);

        assert_eq!(languages(&groups).encode(), "enru");
    }

    #[test]
    fn test_active_language_follows_locked_group() {
        // Arrange: the user switched from the first group to Russian
        let snapshot = XkbSnapshot {
            groups: groups(&["English (US)", "Russian"]),
            locked: 1,
        };

        // Act / Assert
        assert_eq!(snapshot.active(), Some(code("ru")));
    }

    #[test]
    fn test_locked_group_without_language_has_no_active() {
        let snapshot = XkbSnapshot {
            groups: groups(&["English (US)"]),
            locked: 2,
        };
        assert_eq!(snapshot.active(), None);
    }

    #[test]
    fn test_group_for_picks_first_matching_group() {
        let groups = groups(&["Russian", "English (US)", "English (UK)"]);

        assert_eq!(group_for(&groups, code("en")), Some(1));
        assert_eq!(group_for(&groups, code("ru")), Some(0));
        assert_eq!(group_for(&groups, code("de")), None);
    }

    /// Without an X display construction must fail; with one it must report
    /// an installed active language.
    #[test]
    fn test_xkb_service_smoke() {
        let result = XkbKeyboardService::new();

        if std::env::var("DISPLAY").is_ok() {
            if let Ok(service) = result {
                let active = service.active_layout();
                assert!(service.installed_layouts().contains(&active));
            }
        } else {
            assert!(result.is_err(), "construction must fail when DISPLAY is not set");
        }
    }
}
