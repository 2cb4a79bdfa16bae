//! Text delivery — clipboard-based paste into the focused application.
//!
//! # Overview
//!
//! Transcripts are mostly CJK text with combining characters that raw key
//! events handle badly, so delivery goes through the clipboard:
//!
//! 1. **Save** the original clipboard content.
//! 2. **Set** the finished text into the clipboard.
//! 3. **Simulate** Ctrl+V (or ⌘V on macOS) to paste into the focused window.
//! 4. **Restore** the original clipboard content (best-effort).
//!
//! The pipeline drives this through the [`TextDelivery`] trait so tests can
//! swap in a recorder that never touches the OS.

pub mod clipboard;
pub mod keyboard;

pub use clipboard::{restore_clipboard, save_clipboard, set_clipboard};
pub use keyboard::simulate_paste;

use thiserror::Error;

// ---------------------------------------------------------------------------
// InjectError
// ---------------------------------------------------------------------------

/// All errors that can surface during text delivery.
///
/// Delivery failures never fail the cycle — the orchestrator logs them and
/// completes anyway, since the text is still available in the history.
#[derive(Debug, Error)]
pub enum InjectError {
    /// Could not open or read the system clipboard.
    #[error("cannot access clipboard: {0}")]
    ClipboardAccess(String),

    /// Could not write text to the system clipboard.
    #[error("cannot set clipboard text: {0}")]
    ClipboardSet(String),

    /// Could not simulate a key press/release event.
    #[error("cannot simulate key press: {0}")]
    KeySimulation(String),
}

// ---------------------------------------------------------------------------
// TextDelivery trait
// ---------------------------------------------------------------------------

/// Object-safe interface for handing the finished text to the user.
pub trait TextDelivery: Send + Sync {
    /// Deliver `text` to wherever the user expects it to appear.
    fn deliver(&self, text: &str) -> Result<(), InjectError>;
}

// Compile-time assertion: Box<dyn TextDelivery> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn TextDelivery>) {}
};

// ---------------------------------------------------------------------------
// ClipboardInjector
// ---------------------------------------------------------------------------

/// Production delivery: clipboard swap plus a simulated paste keystroke.
///
/// The default delays (50 ms before the paste, 100 ms before the restore)
/// give clipboard managers and the target app time to settle; raise them
/// when targeting apps with sluggish clipboard handling.
///
/// # Example
///
/// ```no_run
/// use voxscribe::inject::{ClipboardInjector, TextDelivery};
///
/// let injector = ClipboardInjector::new();
/// injector.deliver("今天的會議改到三點。").expect("delivery failed");
/// ```
#[derive(Debug, Clone)]
pub struct ClipboardInjector {
    /// Milliseconds to wait after setting the clipboard before simulating
    /// the paste.
    pub delay_ms: u64,
    /// Milliseconds to wait after the paste before restoring the original
    /// clipboard.
    pub restore_delay_ms: u64,
}

impl Default for ClipboardInjector {
    fn default() -> Self {
        Self {
            delay_ms: 50,
            restore_delay_ms: 100,
        }
    }
}

impl ClipboardInjector {
    /// Create an injector with the default delays (50 ms / 100 ms).
    pub fn new() -> Self {
        Self::default()
    }
}

impl TextDelivery for ClipboardInjector {
    /// Full clipboard-paste sequence.
    ///
    /// Steps (in order):
    /// 1. Save the current clipboard plain-text content.
    /// 2. Write `text` into the clipboard.
    /// 3. Wait `delay_ms` (clipboard flush).
    /// 4. Simulate Ctrl+V / ⌘V.
    /// 5. Wait `restore_delay_ms` (let the target app complete the paste).
    /// 6. Restore the original clipboard content (best-effort; errors
    ///    ignored).
    fn deliver(&self, text: &str) -> Result<(), InjectError> {
        let saved = save_clipboard()?;
        set_clipboard(text)?;
        std::thread::sleep(std::time::Duration::from_millis(self.delay_ms));
        simulate_paste()?;
        std::thread::sleep(std::time::Duration::from_millis(self.restore_delay_ms));
        let _ = restore_clipboard(saved);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockDelivery  (test-only)
// ---------------------------------------------------------------------------

/// Recording [`TextDelivery`] for pipeline tests.
#[cfg(test)]
pub struct MockDelivery {
    /// Every text delivered, in order.
    pub delivered: std::sync::Mutex<Vec<String>>,
    fail: bool,
}

#[cfg(test)]
impl MockDelivery {
    /// A delivery that records and succeeds.
    pub fn new() -> Self {
        Self {
            delivered: std::sync::Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A delivery that records but always fails.
    pub fn failing() -> Self {
        Self {
            delivered: std::sync::Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[cfg(test)]
impl TextDelivery for MockDelivery {
    fn deliver(&self, text: &str) -> Result<(), InjectError> {
        self.delivered.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(InjectError::ClipboardAccess("mock clipboard".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
