//! Audio capture — microphone → mono samples → 16-bit WAV temp file.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → downmix to mono (native rate)
//!            → hound WAV encode → RecordedClip (self-deleting temp file)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use voxscribe::audio::{AudioCapture, MicRecorder};
//!
//! let recorder = MicRecorder::new();
//! recorder.start().unwrap();
//! // ... speak ...
//! let clip = recorder.stop().unwrap();
//! let wav_bytes = clip.read_bytes().unwrap(); // ready for upload
//! ```

pub mod capture;
pub mod clip;

pub use capture::{AudioCapture, CaptureError, MicRecorder};
pub use clip::RecordedClip;

// test-only re-export for the pipeline test module.
#[cfg(test)]
pub use capture::MockCapture;
