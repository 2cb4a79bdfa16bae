//! Pipeline orchestrator module.
//!
//! This module wires the full record → STT → refine → deliver cycle and
//! exposes the shared state that drives the toggle dispatch.
//!
//! # Architecture
//!
//! ```text
//! HotkeyEvent::Toggle (mpsc)
//!        │
//!        ▼
//! PipelineOrchestrator::run()  ← async tokio task
//!        │
//!        ├─ Idle/Completed/Failed → capture.start()      [Recording]
//!        │
//!        └─ Recording → capture.stop() → RecordedClip
//!              │
//!              ├─ clip < 0.5 s → discard                 [Idle]
//!              └─ spawn cycle task                       [Transcribing]
//!                    ├─ SpeechToText::transcribe
//!                    ├─ RefineProvider::refine           [Refining]
//!                    │    └─ sanitize → validate → fallback on any error
//!                    ├─ TextDelivery::deliver  (spawn_blocking)
//!                    └─ OutcomeSink::record    (spawn_blocking)
//!                                                        [Completed]
//!                                                           │ 3 s dwell
//!                                                           ▼
//! SharedState (Arc<Mutex<PipelineState>>)                [Idle]
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use voxscribe::config::AppConfig;
//! use voxscribe::credentials::{CredentialStore, FileCredentialStore};
//! use voxscribe::pipeline::{new_shared_state, PipelineOrchestrator};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::load().unwrap_or_default();
//!     let state = new_shared_state();
//!     let http = reqwest::Client::new();
//!     let credentials: Arc<dyn CredentialStore> = Arc::new(FileCredentialStore::new());
//!
//!     let orchestrator = PipelineOrchestrator::new(
//!         state,
//!         config,
//!         Arc::new(voxscribe::audio::MicRecorder::new()),
//!         Arc::new(voxscribe::stt::GroqWhisperClient::new(http.clone(), Arc::clone(&credentials))),
//!         Arc::new(voxscribe::llm::ProviderRegistry::with_default_backends(&http, &credentials)),
//!         Arc::new(voxscribe::inject::ClipboardInjector::new()),
//!         Arc::new(voxscribe::sound::TonePlayer::new()),
//!         Arc::new(voxscribe::stats::HistoryStore::new()),
//!     );
//!
//!     let (hotkey_tx, hotkey_rx) = mpsc::channel(16);
//!     tokio::spawn(async move { orchestrator.run(hotkey_rx).await });
//!
//!     // hotkey_tx is passed to HotkeyListener::start(...)
//! }
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{PipelineOrchestrator, COMPLETED_DWELL, MIN_CLIP_SECS, MIN_TRANSCRIPT_CHARS};
pub use state::{new_shared_state, PipelineState, SharedState};
