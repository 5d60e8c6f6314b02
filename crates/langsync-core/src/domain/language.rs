//! Keyboard-language domain types.
//!
//! A [`LayoutCode`] is a two-character language identifier such as `en` or
//! `fr`.  A [`LayoutCatalogue`] is the ordered list of codes installed on one
//! endpoint.  On the wire a catalogue is the codes concatenated with no
//! delimiter; the fixed width makes the split unambiguous.
//!
//! # Odd-length payloads
//!
//! Decoding walks the string in strides of two characters and stops when
//! fewer than two remain.  A payload of `2k + 1` characters therefore yields
//! `k` codes and the last character is dropped without an error:
//!
//! ```rust
//! use langsync_core::LayoutCatalogue;
//!
//! let catalogue = LayoutCatalogue::decode("enfrd");
//! assert_eq!(catalogue.to_string(), "en fr");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a string is not exactly two characters long.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("layout code must be exactly 2 characters, got {0:?}")]
pub struct LayoutCodeError(pub String);

/// A two-character keyboard language identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LayoutCode([char; 2]);

impl LayoutCode {
    pub const fn new(first: char, second: char) -> Self {
        Self([first, second])
    }
}

impl fmt::Display for LayoutCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.0[0], self.0[1])
    }
}

impl TryFrom<&str> for LayoutCode {
    type Error = LayoutCodeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mut chars = value.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(a), Some(b), None) => Ok(Self([a, b])),
            _ => Err(LayoutCodeError(value.to_string())),
        }
    }
}

impl TryFrom<String> for LayoutCode {
    type Error = LayoutCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl FromStr for LayoutCode {
    type Err = LayoutCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

impl From<LayoutCode> for String {
    fn from(code: LayoutCode) -> Self {
        code.to_string()
    }
}

/// Ordered list of layout codes installed on one endpoint.
///
/// Duplicates are kept as given; only [`push_unique`](Self::push_unique)
/// filters them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayoutCatalogue(Vec<LayoutCode>);

impl LayoutCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LayoutCode> {
        self.0.iter()
    }

    pub fn contains(&self, code: &LayoutCode) -> bool {
        self.0.contains(code)
    }

    pub fn push(&mut self, code: LayoutCode) {
        self.0.push(code);
    }

    /// Appends `code` unless it is already present.  Returns whether it was added.
    pub fn push_unique(&mut self, code: LayoutCode) -> bool {
        if self.contains(&code) {
            return false;
        }
        self.0.push(code);
        true
    }

    /// Position of `code` in the catalogue.
    pub fn position(&self, code: &LayoutCode) -> Option<usize> {
        self.0.iter().position(|c| c == code)
    }

    /// Concatenates every code with no delimiter.
    pub fn encode(&self) -> String {
        self.0.iter().map(LayoutCode::to_string).collect()
    }

    /// Splits `payload` into two-character codes.
    ///
    /// Only complete strides are decoded; a trailing odd character is ignored.
    pub fn decode(payload: &str) -> Self {
        let chars: Vec<char> = payload.chars().collect();
        Self(
            chars
                .chunks_exact(2)
                .map(|pair| LayoutCode::new(pair[0], pair[1]))
                .collect(),
        )
    }

    /// Partitions `remote` against this (local) catalogue.
    ///
    /// Order follows `remote` and duplicates are preserved in whichever
    /// partition they fall into.
    pub fn reconcile(&self, remote: &LayoutCatalogue) -> Reconciliation {
        let (supported, missing): (Vec<LayoutCode>, Vec<LayoutCode>) =
            remote.iter().copied().partition(|code| self.contains(code));
        Reconciliation {
            supported: LayoutCatalogue(supported),
            missing: LayoutCatalogue(missing),
        }
    }
}

impl fmt::Display for LayoutCatalogue {
    /// Space-separated codes, e.g. `en fr de`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, code) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{code}")?;
        }
        Ok(())
    }
}

impl FromIterator<LayoutCode> for LayoutCatalogue {
    fn from_iter<I: IntoIterator<Item = LayoutCode>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for LayoutCatalogue {
    type Item = LayoutCode;
    type IntoIter = std::vec::IntoIter<LayoutCode>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a LayoutCatalogue {
    type Item = &'a LayoutCode;
    type IntoIter = std::slice::Iter<'a, LayoutCode>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<LayoutCode>> for LayoutCatalogue {
    fn from(codes: Vec<LayoutCode>) -> Self {
        Self(codes)
    }
}

/// Result of comparing a peer's catalogue with the local one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Peer codes that are installed locally.
    pub supported: LayoutCatalogue,
    /// Peer codes that are not installed locally.
    pub missing: LayoutCatalogue,
}

impl Reconciliation {
    /// `true` when every peer code is installed locally.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> LayoutCode {
        LayoutCode::try_from(s).unwrap()
    }

    fn catalogue(codes: &[&str]) -> LayoutCatalogue {
        codes.iter().map(|c| code(c)).collect()
    }

    // ── LayoutCode ────────────────────────────────────────────────────────────

    #[test]
    fn test_layout_code_accepts_two_characters() {
        assert_eq!(code("en").to_string(), "en");
    }

    #[test]
    fn test_layout_code_rejects_other_lengths() {
        assert!(LayoutCode::try_from("e").is_err());
        assert!(LayoutCode::try_from("eng").is_err());
        assert!(LayoutCode::try_from("").is_err());
    }

    #[test]
    fn test_layout_code_counts_characters_not_bytes() {
        assert_eq!(code("ру").to_string(), "ру");
    }

    // ── decode / encode ───────────────────────────────────────────────────────

    #[test]
    fn test_decode_even_payload_keeps_order() {
        // Arrange / Act
        let decoded = LayoutCatalogue::decode("enfrde");

        // Assert
        assert_eq!(decoded, catalogue(&["en", "fr", "de"]));
    }

    #[test]
    fn test_decode_odd_payload_drops_last_character() {
        assert_eq!(LayoutCatalogue::decode("enf"), catalogue(&["en"]));
        assert_eq!(LayoutCatalogue::decode("enfrd").len(), 2);
    }

    #[test]
    fn test_decode_single_character_yields_nothing() {
        assert!(LayoutCatalogue::decode("e").is_empty());
    }

    #[test]
    fn test_decode_empty_payload_yields_nothing() {
        assert!(LayoutCatalogue::decode("").is_empty());
    }

    #[test]
    fn test_encode_then_decode_returns_same_codes() {
        let original = catalogue(&["en", "ru", "uk", "en"]);
        assert_eq!(LayoutCatalogue::decode(&original.encode()), original);
    }

    #[test]
    fn test_encode_has_no_delimiter() {
        assert_eq!(catalogue(&["en", "fr"]).encode(), "enfr");
    }

    // ── reconcile ─────────────────────────────────────────────────────────────

    #[test]
    fn test_reconcile_splits_supported_and_missing() {
        // Arrange
        let local = catalogue(&["en", "fr"]);
        let remote = LayoutCatalogue::decode("enfrde");

        // Act
        let result = local.reconcile(&remote);

        // Assert
        assert_eq!(result.supported, catalogue(&["en", "fr"]));
        assert_eq!(result.missing, catalogue(&["de"]));
        assert!(!result.is_complete());
    }

    #[test]
    fn test_reconcile_all_supported_is_complete() {
        let local = catalogue(&["en", "fr"]);
        let result = local.reconcile(&catalogue(&["fr", "en"]));
        assert!(result.is_complete());
        assert_eq!(result.supported, catalogue(&["fr", "en"]));
    }

    #[test]
    fn test_reconcile_preserves_duplicates_and_remote_order() {
        let local = catalogue(&["en"]);
        let remote = catalogue(&["de", "en", "de", "en"]);

        let result = local.reconcile(&remote);

        assert_eq!(result.supported, catalogue(&["en", "en"]));
        assert_eq!(result.missing, catalogue(&["de", "de"]));
        assert_eq!(result.supported.len() + result.missing.len(), remote.len());
    }

    #[test]
    fn test_reconcile_against_empty_local_marks_everything_missing() {
        let result = LayoutCatalogue::new().reconcile(&catalogue(&["en", "fr"]));
        assert!(result.supported.is_empty());
        assert_eq!(result.missing.len(), 2);
    }

    // ── misc ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_display_joins_with_spaces() {
        assert_eq!(catalogue(&["en", "fr", "de"]).to_string(), "en fr de");
    }

    #[test]
    fn test_push_unique_skips_existing_code() {
        let mut cat = catalogue(&["en"]);
        assert!(!cat.push_unique(code("en")));
        assert!(cat.push_unique(code("fr")));
        assert_eq!(cat, catalogue(&["en", "fr"]));
    }

    #[test]
    fn test_position_finds_index() {
        let cat = catalogue(&["en", "fr"]);
        assert_eq!(cat.position(&code("fr")), Some(1));
        assert_eq!(cat.position(&code("de")), None);
    }
}
