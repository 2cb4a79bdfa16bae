//! Audible feedback cues for the transcription cycle.
//!
//! Four moments get a cue: capture start, capture stop, cycle completion
//! and cycle failure.  [`TonePlayer`] renders each as a short sine tone via
//! `rodio`; [`SilentCues`] is the no-op used when sound cues are disabled
//! in the settings (and in tests).
//!
//! Playback is fire-and-forget on a throwaway thread — the rodio output
//! stream is not `Send`, and a missing output device must never stall a
//! transcription.

use rodio::source::{SineWave, Source};
use rodio::{OutputStream, Sink};
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// SoundCue
// ---------------------------------------------------------------------------

/// The four pipeline moments that get audible feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    /// Recording has started.
    Started,
    /// Recording has stopped; processing begins.
    Stopped,
    /// The cycle finished and text was delivered.
    Completed,
    /// The cycle failed.
    Failed,
}

/// A single sine tone: pitch plus length.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Tone {
    frequency: f32,
    duration: Duration,
}

impl SoundCue {
    /// Tone for this cue.  Pitches are spread far enough apart to be told
    /// apart without looking at the screen; `Failed` is low and long.
    fn tone(self) -> Tone {
        match self {
            SoundCue::Started => Tone {
                frequency: 880.0,
                duration: Duration::from_millis(120),
            },
            SoundCue::Stopped => Tone {
                frequency: 660.0,
                duration: Duration::from_millis(120),
            },
            SoundCue::Completed => Tone {
                frequency: 1047.0,
                duration: Duration::from_millis(180),
            },
            SoundCue::Failed => Tone {
                frequency: 220.0,
                duration: Duration::from_millis(300),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// CuePlayer trait
// ---------------------------------------------------------------------------

/// Object-safe cue playback interface.
///
/// `play` must return immediately; implementations do their work
/// asynchronously and swallow playback failures (cues are decorative).
pub trait CuePlayer: Send + Sync {
    fn play(&self, cue: SoundCue);
}

// Compile-time assertion: Box<dyn CuePlayer> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn CuePlayer>) {}
};

// ---------------------------------------------------------------------------
// CueError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
enum CueError {
    #[error("no audio output available: {0}")]
    Output(#[from] rodio::StreamError),

    #[error("cue playback failed: {0}")]
    Play(#[from] rodio::PlayError),
}

// ---------------------------------------------------------------------------
// TonePlayer
// ---------------------------------------------------------------------------

/// Production cue player: one short sine tone per cue on the default
/// output device.
pub struct TonePlayer;

impl TonePlayer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TonePlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl CuePlayer for TonePlayer {
    fn play(&self, cue: SoundCue) {
        std::thread::spawn(move || {
            if let Err(e) = play_tone(cue.tone()) {
                // Decorative only; a machine without speakers is fine.
                log::debug!("Sound: {cue:?} cue not played: {e}");
            }
        });
    }
}

/// Blocking tone playback; runs on the throwaway cue thread.
fn play_tone(tone: Tone) -> Result<(), CueError> {
    let (_stream, handle) = OutputStream::try_default()?;
    let sink = Sink::try_new(&handle)?;

    sink.append(
        SineWave::new(tone.frequency)
            .take_duration(tone.duration)
            .amplify(0.20),
    );
    sink.sleep_until_end();
    Ok(())
}

// ---------------------------------------------------------------------------
// SilentCues
// ---------------------------------------------------------------------------

/// No-op player used when sound cues are disabled in the settings.
pub struct SilentCues;

impl CuePlayer for SilentCues {
    fn play(&self, _cue: SoundCue) {}
}

// ---------------------------------------------------------------------------
// MockCues  (test-only)
// ---------------------------------------------------------------------------

/// Recording player for pipeline tests.
#[cfg(test)]
pub struct MockCues {
    /// Every cue played, in order.
    pub played: std::sync::Mutex<Vec<SoundCue>>,
}

#[cfg(test)]
impl MockCues {
    pub fn new() -> Self {
        Self {
            played: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
impl CuePlayer for MockCues {
    fn play(&self, cue: SoundCue) {
        self.played.lock().unwrap().push(cue);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
