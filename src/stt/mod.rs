//! STT (speech-to-text) module.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                SpeechToText (trait)                  │
//! │                                                      │
//! │   recorded WAV bytes ──▶ GroqWhisperClient           │
//! │                           - multipart upload         │
//! │                           - whisper-large-v3         │
//! │                                │                     │
//! │                                ▼                     │
//! │                      ┌──────────────────┐            │
//! │                      │    Transcript    │            │
//! │                      │ text / language  │            │
//! │                      │ duration / model │            │
//! │                      └──────────────────┘            │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voxscribe::credentials::{CredentialStore, FileCredentialStore};
//! use voxscribe::stt::{GroqWhisperClient, SpeechToText};
//!
//! #[tokio::main]
//! async fn main() {
//!     let credentials: Arc<dyn CredentialStore> = Arc::new(FileCredentialStore::new());
//!     let stt = GroqWhisperClient::new(reqwest::Client::new(), credentials);
//!
//!     let wav_bytes = std::fs::read("recording.wav").unwrap();
//!     let transcript = stt.transcribe(wav_bytes, Some("zh")).await.unwrap();
//!     println!("[{}] {}", transcript.language, transcript.text);
//! }
//! ```

pub mod engine;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use engine::{GroqWhisperClient, SpeechToText, SttError, Transcript, WHISPER_MODEL};

// test-only re-export so the pipeline test module can import MockSttEngine
// without `use voxscribe::stt::engine::MockSttEngine`.
#[cfg(test)]
pub use engine::MockSttEngine;
