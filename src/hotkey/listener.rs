//! Dedicated OS-thread hotkey listener using `rdev::listen`.
//!
//! `rdev::listen` is a blocking call that must live on its own OS thread.
//! [`HotkeyListener`] owns that thread and a stop flag; dropping it sets the
//! flag so the callback silently ignores further events.
//!
//! # Shutdown caveat
//!
//! `rdev::listen` has **no graceful shutdown API**.  Setting the stop flag
//! prevents events from being forwarded, but the OS thread itself will remain
//! blocked in the rdev event loop until the process exits.  This is safe and
//! expected — rdev holds no resources that need explicit cleanup.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::mpsc;

use super::HotkeyEvent;

// ---------------------------------------------------------------------------
// HotkeyListener
// ---------------------------------------------------------------------------

/// Handle to a running hotkey listener thread.
///
/// Construct one with [`HotkeyListener::start`].  Drop it to stop forwarding
/// events.
///
/// The underlying OS thread will continue to exist until the process exits
/// because `rdev::listen` cannot be interrupted, but it will silently discard
/// all events once the stop flag is set.
pub struct HotkeyListener {
    /// Shared stop flag — set `true` on [`Drop`].
    stop: Arc<AtomicBool>,
    /// The thread handle.  Kept alive so the thread is not detached
    /// prematurely; we never `join` it because `rdev::listen` never returns.
    _thread: std::thread::JoinHandle<()>,
}

impl HotkeyListener {
    /// Spawn a dedicated OS thread that listens for global key events and
    /// forwards one [`HotkeyEvent::Toggle`] per physical press of `key`.
    ///
    /// While the key is held the OS delivers a stream of repeat `KeyPress`
    /// events; the listener tracks the key's down state and forwards only
    /// the first press, so holding the toggle key cannot start and stop a
    /// recording in the same gesture.
    ///
    /// # Arguments
    ///
    /// * `key` — The [`rdev::Key`] to watch (e.g. `rdev::Key::F9`).
    ///   Use [`crate::hotkey::parse_key`] to obtain this from a config string.
    /// * `tx`  — A `tokio::sync::mpsc` sender.  The background thread uses
    ///   `blocking_send` so it works correctly from a non-async context.
    ///
    /// # Returns
    ///
    /// A [`HotkeyListener`] whose drop will stop event forwarding.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to create the thread (extremely unlikely).
    pub fn start(key: rdev::Key, tx: mpsc::Sender<HotkeyEvent>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                // Held-down state for repeat suppression; only this thread
                // touches it, so a plain bool captured by the FnMut is enough.
                let mut key_down = false;

                let result = rdev::listen(move |event| {
                    // Bail out if the listener has been stopped.
                    if stop_clone.load(Ordering::Relaxed) {
                        return;
                    }

                    if toggles(&event.event_type, key, &mut key_down) {
                        log::debug!("Hotkey: {key:?} pressed");
                        // blocking_send is safe to call from non-async threads.
                        let _ = tx.blocking_send(HotkeyEvent::Toggle);
                    }
                });

                if let Err(e) = result {
                    log::error!("Hotkey: rdev::listen exited with error: {e:?}");
                }
            })
            .expect("failed to spawn hotkey-listener thread");

        Self {
            stop,
            _thread: thread,
        }
    }
}

impl Drop for HotkeyListener {
    /// Set the stop flag so the rdev callback stops forwarding events.
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        // The OS thread continues to exist blocked inside rdev::listen until
        // the process exits — this is safe and requires no further cleanup.
    }
}

// ---------------------------------------------------------------------------
// Repeat suppression
// ---------------------------------------------------------------------------

/// Whether this event should emit a toggle.
///
/// `key_down` tracks whether the watched key is currently held; a `KeyPress`
/// while already held is OS key-repeat and emits nothing.
fn toggles(event: &rdev::EventType, watched: rdev::Key, key_down: &mut bool) -> bool {
    match event {
        rdev::EventType::KeyPress(k) if *k == watched => {
            let was_down = std::mem::replace(key_down, true);
            !was_down
        }
        rdev::EventType::KeyRelease(k) if *k == watched => {
            *key_down = false;
            false
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
