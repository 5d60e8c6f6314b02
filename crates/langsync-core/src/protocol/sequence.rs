//! Sequence counter for enter messages.
//!
//! Every `CINN` carries a 32-bit sequence number.  Clients echo the number of
//! the most recent enter in later messages, which lets the server discard
//! replies that belong to an earlier visit of the cursor.  One counter is
//! shared by all sessions of a server, so numbers increase across hand-offs
//! between screens.

use std::sync::atomic::{AtomicU32, Ordering};

/// A thread-safe, monotonically increasing `u32` counter.
///
/// Wraps from `u32::MAX` back to 0 without panicking.
///
/// # Examples
///
/// ```rust
/// use langsync_core::protocol::SequenceCounter;
///
/// let counter = SequenceCounter::new();
/// assert_eq!(counter.next(), 0);
/// assert_eq!(counter.next(), 1);
/// ```
#[derive(Debug)]
pub struct SequenceCounter {
    inner: AtomicU32,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates a counter whose first [`next`](Self::next) returns `value`.
    pub fn starting_at(value: u32) -> Self {
        Self {
            inner: AtomicU32::new(value),
        }
    }

    /// Returns the next sequence number and advances the counter.
    ///
    /// `Relaxed` is enough: the value orders messages, it does not publish memory.
    pub fn next(&self) -> u32 {
        self.inner.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the value the next call to [`next`](Self::next) would produce.
    pub fn current(&self) -> u32 {
        self.inner.load(Ordering::Relaxed)
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}
