//! Clipboard save / set / restore helpers backed by the `arboard` crate.
//!
//! Each function opens a short-lived [`arboard::Clipboard`] handle instead
//! of sharing one across calls — `arboard::Clipboard` is not `Send` on all
//! platforms and the handle is cheap to create.

use arboard::Clipboard;

use super::InjectError;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Capture the current clipboard plain-text content so it can be restored
/// after the paste.
///
/// Returns `Ok(None)` when the clipboard is empty or holds non-text data
/// (an image, say) — that is not an error.
///
/// # Errors
///
/// Returns [`InjectError::ClipboardAccess`] if the OS clipboard cannot be
/// opened.
pub fn save_clipboard() -> Result<Option<String>, InjectError> {
    let mut clipboard = open_clipboard()?;
    // `get_text` errors on empty or non-text content — treat both as None.
    Ok(clipboard.get_text().ok())
}

/// Write `text` into the system clipboard, replacing whatever was there.
///
/// # Errors
///
/// Returns [`InjectError::ClipboardAccess`] if the clipboard cannot be
/// opened, or [`InjectError::ClipboardSet`] if writing fails.
pub fn set_clipboard(text: &str) -> Result<(), InjectError> {
    let mut clipboard = open_clipboard()?;
    clipboard
        .set_text(text)
        .map_err(|e| InjectError::ClipboardSet(e.to_string()))
}

/// Restore the clipboard to a previously saved value.
///
/// * `Some(text)` — writes `text` back to the clipboard.
/// * `None` — the clipboard held nothing restorable before the paste;
///   returns `Ok(())` without touching it.
///
/// # Errors
///
/// Propagates errors from [`set_clipboard`].
pub fn restore_clipboard(saved: Option<String>) -> Result<(), InjectError> {
    match saved {
        Some(text) => set_clipboard(&text),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Open an `arboard::Clipboard` handle, mapping the error to [`InjectError`].
fn open_clipboard() -> Result<Clipboard, InjectError> {
    Clipboard::new().map_err(|e| InjectError::ClipboardAccess(e.to_string()))
}
