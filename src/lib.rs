//! voxscribe — hotkey-driven voice transcription for the desktop.
//!
//! Press the global hotkey to start recording, press it again to stop; the
//! clip is transcribed by Groq-hosted Whisper, polished by an LLM, pasted
//! into the focused application and appended to a local history file.
//!
//! # Module map
//!
//! ```text
//! hotkey      rdev listener thread → one Toggle per key press
//! audio       cpal microphone capture → 16-bit WAV temp clips
//! stt         Groq Whisper client (multipart upload)
//! llm         refinement providers (Groq / OpenAI / Claude),
//!             prompt builder, reply sanitizer, refinement validator
//! inject      clipboard save / set / paste-keystroke / restore
//! sound       audible cues for record start/stop and cycle completion
//! stats       JSON-lines transcription history + daily usage totals
//! config      TOML settings under the platform config dir
//! credentials per-provider API keys (file + environment overrides)
//! pipeline    the orchestrator state machine tying it all together
//! ```
//!
//! The pipeline module's docs show how the pieces wire up; `main.rs` is a
//! thin assembly of the same parts.

pub mod audio;
pub mod config;
pub mod credentials;
pub mod hotkey;
pub mod inject;
pub mod llm;
pub mod pipeline;
pub mod sound;
pub mod stats;
pub mod stt;
