//! Pipeline state machine shared between the orchestrator and its cycle tasks.
//!
//! [`PipelineState`] drives the orchestrator's state machine.  Exactly one
//! transcription cycle is in flight at any time; the toggle handler inspects
//! the current state to decide whether a toggle starts a capture, stops one,
//! or is ignored.
//!
//! [`SharedState`] is a type alias for `Arc<Mutex<PipelineState>>` — cheap to
//! clone and safe to share between the toggle handler, the spawned cycle task
//! and the dwell timer.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// States of the transcription pipeline.
///
/// The state machine transitions are:
///
/// ```text
/// Idle ──toggle──▶ Recording ──toggle──▶ Transcribing
///                                        ──STT done──▶ Refining
///                                                      ──refine done──▶ Completed
/// Recording / Transcribing ──error──▶ Failed
/// Completed ──3 s dwell──▶ Idle
/// Completed / Failed ──toggle──▶ Recording   (next cycle)
/// Transcribing / Refining ──toggle──▶ ignored
/// ```
///
/// Too-short clips and too-short transcripts skip straight back to `Idle`
/// without passing through `Completed` or `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    /// Waiting for the user to toggle a new recording.
    Idle,

    /// Microphone is active; audio is accumulating on the capture thread.
    Recording {
        /// When the capture started; used to log the cycle duration.
        started: Instant,
    },

    /// The clip has been finalised and uploaded to the STT service.
    Transcribing {
        /// Path of the temp WAV file being transcribed.
        audio: PathBuf,
        /// Captured duration of the clip in seconds.
        clip_secs: f32,
    },

    /// STT is complete; the refinement provider is rewriting the transcript.
    Refining {
        /// Raw transcript as returned by the STT service.
        original: String,
        /// Language code detected by the STT service.
        language: String,
    },

    /// The cycle finished; holds the delivered text until the dwell expires.
    Completed(String),

    /// The cycle failed.  The next toggle starts a fresh cycle.
    Failed(String),
}

impl PipelineState {
    /// Returns `true` while a cycle is being processed and toggles must be
    /// ignored.
    ///
    /// `Recording` is deliberately *not* processing: a toggle during
    /// `Recording` is the stop gesture.
    ///
    /// ```
    /// use voxscribe::pipeline::PipelineState;
    ///
    /// assert!(!PipelineState::Idle.is_processing());
    /// assert!(PipelineState::Refining {
    ///     original: "你好".into(),
    ///     language: "zh".into(),
    /// }
    /// .is_processing());
    /// ```
    pub fn is_processing(&self) -> bool {
        matches!(
            self,
            PipelineState::Transcribing { .. } | PipelineState::Refining { .. }
        )
    }

    /// A short human-readable label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Idle => "Idle",
            PipelineState::Recording { .. } => "Recording",
            PipelineState::Transcribing { .. } => "Transcribing",
            PipelineState::Refining { .. } => "Refining",
            PipelineState::Completed(_) => "Completed",
            PipelineState::Failed(_) => "Failed",
        }
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        PipelineState::Idle
    }
}

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

/// Thread-safe handle to the current [`PipelineState`].
///
/// Cheap to clone (`Arc` clone).  Lock with `.lock().unwrap()` for a short
/// critical section; do **not** hold the lock across `.await` points.
pub type SharedState = Arc<Mutex<PipelineState>>;

/// Construct a new [`SharedState`] starting at [`PipelineState::Idle`].
pub fn new_shared_state() -> SharedState {
    Arc::new(Mutex::new(PipelineState::Idle))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
