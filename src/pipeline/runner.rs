//! Pipeline orchestrator — drives the full record → STT → refine → deliver
//! cycle.
//!
//! [`PipelineOrchestrator`] owns the [`SharedState`] and responds to
//! [`HotkeyEvent`]s received over a `tokio::sync::mpsc` channel.
//!
//! # Cycle flow
//!
//! ```text
//! toggle (Idle / Completed / Failed)
//!   └─▶ capture.start()                       [Recording]
//!
//! toggle (Recording)
//!   └─▶ capture.stop() → RecordedClip
//!         ├─ clip < 0.5 s   → discard          [Idle]
//!         └─▶ spawn cycle task                 [Transcribing]
//!               ├─ STT error → error cue       [Failed]
//!               ├─ transcript < 2 chars        [Idle]
//!               └─▶ refine → sanitize → validate   [Refining]
//!                     ├─ ok       → refined text
//!                     └─ err/rejected → raw transcript (fallback)
//!                   deliver (if auto-paste) + record outcome
//!                                              [Completed] ──3 s──▶ [Idle]
//!
//! toggle (Transcribing / Refining) → ignored, logged
//! ```
//!
//! Exactly one cycle is in flight at a time; the state machine itself
//! enforces it.  The toggle handler never waits on cycle work: transcription
//! and refinement run in a spawned task, and blocking collaborators
//! (capture control, clipboard, history file) go through
//! `tokio::task::spawn_blocking` so the async runtime never stalls.
//!
//! Failure policy: capture-start and STT errors are fatal to the cycle
//! ([`PipelineState::Failed`] plus an error cue).  Refinement errors and
//! rejected refinements fall back to the raw transcript and the cycle still
//! completes.  Delivery and persistence failures are logged only.  There
//! are no retries anywhere.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::audio::{AudioCapture, CaptureError, RecordedClip};
use crate::config::AppConfig;
use crate::hotkey::HotkeyEvent;
use crate::inject::TextDelivery;
use crate::llm::{is_acceptable, sanitize, PromptBuilder, ProviderRegistry};
use crate::sound::{CuePlayer, SoundCue};
use crate::stats::{OutcomeSink, TranscriptionOutcome};
use crate::stt::SpeechToText;

use super::state::{PipelineState, SharedState};

// ---------------------------------------------------------------------------
// Cycle constants
// ---------------------------------------------------------------------------

/// Clips shorter than this are treated as an accidental toggle and
/// discarded without transcribing.
pub const MIN_CLIP_SECS: f64 = 0.5;

/// Transcripts with fewer trimmed code points than this are discarded
/// (Whisper tends to hallucinate one-character fillers on silence).
pub const MIN_TRANSCRIPT_CHARS: usize = 2;

/// How long `Completed` is held before auto-reverting to `Idle`.
pub const COMPLETED_DWELL: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// PipelineOrchestrator
// ---------------------------------------------------------------------------

/// Drives the complete transcription pipeline.
///
/// Create with [`PipelineOrchestrator::new`], then call [`run`](Self::run)
/// inside a tokio task and feed it hotkey events.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use voxscribe::config::AppConfig;
/// use voxscribe::pipeline::{new_shared_state, PipelineOrchestrator};
///
/// # use voxscribe::audio::AudioCapture;
/// # use voxscribe::stt::SpeechToText;
/// # use voxscribe::llm::ProviderRegistry;
/// # use voxscribe::inject::TextDelivery;
/// # use voxscribe::sound::CuePlayer;
/// # use voxscribe::stats::OutcomeSink;
/// # async fn example(
/// #     capture: Arc<dyn AudioCapture>,
/// #     stt: Arc<dyn SpeechToText>,
/// #     providers: Arc<ProviderRegistry>,
/// #     delivery: Arc<dyn TextDelivery>,
/// #     cues: Arc<dyn CuePlayer>,
/// #     sink: Arc<dyn OutcomeSink>,
/// # ) {
/// let state = new_shared_state();
/// let (hotkey_tx, hotkey_rx) = tokio::sync::mpsc::channel(16);
///
/// let orchestrator = PipelineOrchestrator::new(
///     state, AppConfig::default(), capture, stt, providers, delivery, cues, sink,
/// );
/// orchestrator.run(hotkey_rx).await;
/// # }
/// ```
pub struct PipelineOrchestrator {
    state: SharedState,
    config: AppConfig,
    capture: Arc<dyn AudioCapture>,
    stt: Arc<dyn SpeechToText>,
    providers: Arc<ProviderRegistry>,
    delivery: Arc<dyn TextDelivery>,
    cues: Arc<dyn CuePlayer>,
    sink: Arc<dyn OutcomeSink>,
    /// Handle of the most recently spawned cycle task.
    cycle: Mutex<Option<JoinHandle<()>>>,
    /// Pending `Completed` → `Idle` revert; aborted when a new cycle starts.
    /// Shared with cycle tasks, which register the revert on completion.
    dwell: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl PipelineOrchestrator {
    /// Create a new orchestrator.
    ///
    /// # Arguments
    ///
    /// * `state`     — shared pipeline state, also read by the startup logs.
    /// * `config`    — settings; each cycle works on a snapshot taken when
    ///   its capture starts.
    /// * `capture`   — microphone capture (e.g. `MicRecorder`).
    /// * `stt`       — transcription client (e.g. `GroqWhisperClient`).
    /// * `providers` — refinement backend registry.
    /// * `delivery`  — text delivery (e.g. `ClipboardInjector`).
    /// * `cues`      — audible feedback (`TonePlayer` or `SilentCues`).
    /// * `sink`      — transcription history (e.g. `HistoryStore`).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        state: SharedState,
        config: AppConfig,
        capture: Arc<dyn AudioCapture>,
        stt: Arc<dyn SpeechToText>,
        providers: Arc<ProviderRegistry>,
        delivery: Arc<dyn TextDelivery>,
        cues: Arc<dyn CuePlayer>,
        sink: Arc<dyn OutcomeSink>,
    ) -> Self {
        Self {
            state,
            config,
            capture,
            stt,
            providers,
            delivery,
            cues,
            sink,
            cycle: Mutex::new(None),
            dwell: Arc::new(Mutex::new(None)),
        }
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run the orchestrator until `hotkey_rx` is closed.
    ///
    /// This is an `async fn` and should be spawned as a tokio task from
    /// `main()`.  It never returns while the channel is open.
    pub async fn run(self, mut hotkey_rx: mpsc::Receiver<HotkeyEvent>) {
        while let Some(event) = hotkey_rx.recv().await {
            match event {
                HotkeyEvent::Toggle => self.toggle().await,
            }
        }

        log::info!("Pipeline: hotkey channel closed, orchestrator shutting down");
    }

    // -----------------------------------------------------------------------
    // Toggle dispatch
    // -----------------------------------------------------------------------

    /// Handle one toggle press.
    ///
    /// Dispatches on the current state: start a capture, stop one, or ignore
    /// the press while a cycle is in flight.  Never waits on cycle work.
    pub async fn toggle(&self) {
        let current = self.state.lock().unwrap().clone();
        match current {
            PipelineState::Idle | PipelineState::Completed(_) | PipelineState::Failed(_) => {
                self.start_recording().await;
            }
            PipelineState::Recording { started } => {
                self.stop_and_process(started).await;
            }
            PipelineState::Transcribing { .. } | PipelineState::Refining { .. } => {
                log::info!("Pipeline: toggle ignored while {}", current.label());
            }
        }
    }

    /// Begin a new cycle: cancel any pending dwell revert and open the mic.
    async fn start_recording(&self) {
        // A new cycle supersedes the pending Completed→Idle revert.
        if let Some(dwell) = self.dwell.lock().unwrap().take() {
            dwell.abort();
        }

        let capture = Arc::clone(&self.capture);
        let started = match tokio::task::spawn_blocking(move || capture.start()).await {
            Ok(result) => result,
            Err(e) => Err(CaptureError::Worker(format!("start task panicked: {e}"))),
        };

        match started {
            Ok(()) => {
                *self.state.lock().unwrap() = PipelineState::Recording {
                    started: Instant::now(),
                };
                self.cues.play(SoundCue::Started);
                log::info!("Pipeline: recording started");
            }
            Err(e) => enter_failed(
                &self.state,
                self.cues.as_ref(),
                format!("recording could not start: {e}"),
            ),
        }
    }

    /// Stop the capture and, if the clip is long enough, spawn the cycle
    /// task that carries it through STT, refinement and delivery.
    async fn stop_and_process(&self, started: Instant) {
        let capture = Arc::clone(&self.capture);
        let stopped = match tokio::task::spawn_blocking(move || capture.stop()).await {
            Ok(result) => result,
            Err(e) => Err(CaptureError::Worker(format!("stop task panicked: {e}"))),
        };

        let clip = match stopped {
            Ok(clip) => clip,
            Err(e) => {
                enter_failed(
                    &self.state,
                    self.cues.as_ref(),
                    format!("recording could not be finalised: {e}"),
                );
                return;
            }
        };

        self.cues.play(SoundCue::Stopped);
        log::debug!(
            "Pipeline: captured {:.2}s clip ({:.2}s wall time)",
            clip.duration_secs(),
            started.elapsed().as_secs_f64()
        );

        if clip.duration_secs() < MIN_CLIP_SECS {
            // Accidental double-tap, not an error.  Dropping the clip
            // deletes its temp file.
            log::info!(
                "Pipeline: {:.2}s clip below the {MIN_CLIP_SECS}s minimum, discarding",
                clip.duration_secs()
            );
            *self.state.lock().unwrap() = PipelineState::Idle;
            return;
        }

        *self.state.lock().unwrap() = PipelineState::Transcribing {
            audio: clip.path().to_path_buf(),
            clip_secs: clip.duration_secs() as f32,
        };

        let cycle = Cycle {
            state: Arc::clone(&self.state),
            config: self.config.clone(),
            stt: Arc::clone(&self.stt),
            providers: Arc::clone(&self.providers),
            delivery: Arc::clone(&self.delivery),
            cues: Arc::clone(&self.cues),
            sink: Arc::clone(&self.sink),
            dwell: Arc::clone(&self.dwell),
        };
        let handle = tokio::spawn(cycle.process(clip));
        *self.cycle.lock().unwrap() = Some(handle);
    }

    // -----------------------------------------------------------------------
    // Test synchronisation
    // -----------------------------------------------------------------------

    /// Await the most recently spawned cycle task.
    #[cfg(test)]
    pub(crate) async fn wait_for_cycle(&self) {
        let handle = self.cycle.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Await the pending dwell revert, if one is scheduled.
    #[cfg(test)]
    pub(crate) async fn wait_for_dwell(&self) {
        let handle = self.dwell.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

// ---------------------------------------------------------------------------
// Cycle task
// ---------------------------------------------------------------------------

/// One spawned transcription cycle.
///
/// Owns clones of the collaborators and a config snapshot taken when the
/// capture started, so settings changes can never affect a cycle already in
/// flight.
struct Cycle {
    state: SharedState,
    config: AppConfig,
    stt: Arc<dyn SpeechToText>,
    providers: Arc<ProviderRegistry>,
    delivery: Arc<dyn TextDelivery>,
    cues: Arc<dyn CuePlayer>,
    sink: Arc<dyn OutcomeSink>,
    dwell: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Cycle {
    /// Carry `clip` through STT, refinement, delivery and persistence.
    ///
    /// The cycle owns the clip outright; its temp file is deleted when this
    /// function returns, whichever exit path is taken.
    async fn process(self, clip: RecordedClip) {
        let wav = match clip.read_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                self.fail(format!("could not read the recorded clip: {e}"));
                return;
            }
        };

        // ── 1. Transcribe ────────────────────────────────────────────────
        let transcript = match self
            .stt
            .transcribe(wav, self.config.stt.language_param())
            .await
        {
            Ok(transcript) => transcript,
            Err(e) => {
                self.fail(format!("transcription failed: {e}"));
                return;
            }
        };

        if transcript.text.trim().chars().count() < MIN_TRANSCRIPT_CHARS {
            log::info!(
                "Pipeline: transcript {:?} too short, discarding",
                transcript.text.trim()
            );
            *self.state.lock().unwrap() = PipelineState::Idle;
            return;
        }

        log::info!(
            "Pipeline: transcribed {:.2}s of {} speech ({} chars)",
            clip.duration_secs(),
            transcript.language,
            transcript.text.chars().count()
        );

        // ── 2. Refine (with fallback) ────────────────────────────────────
        *self.state.lock().unwrap() = PipelineState::Refining {
            original: transcript.text.clone(),
            language: transcript.language.clone(),
        };

        let (final_text, refine_model) = self.refined_or_original(&transcript.text).await;

        // ── 3. Deliver ───────────────────────────────────────────────────
        if self.config.delivery.auto_paste {
            let delivery = Arc::clone(&self.delivery);
            let text = final_text.clone();
            match tokio::task::spawn_blocking(move || delivery.deliver(&text)).await {
                Ok(Ok(())) => log::debug!("Pipeline: text pasted into the focused app"),
                Ok(Err(e)) => log::warn!("Pipeline: delivery failed: {e}"),
                Err(e) => log::warn!("Pipeline: delivery task panicked: {e}"),
            }
        } else {
            log::debug!("Pipeline: auto-paste is off, text kept in history only");
        }

        // ── 4. Record the outcome ────────────────────────────────────────
        let outcome = TranscriptionOutcome {
            original_text: transcript.text,
            refined_text: Some(final_text.clone()),
            language: transcript.language,
            duration_secs: clip.duration_secs(),
            stt_model: transcript.model,
            refine_model: refine_model.map(str::to_string),
            created_at: Utc::now(),
        };
        let sink = Arc::clone(&self.sink);
        if let Err(e) = tokio::task::spawn_blocking(move || sink.record(outcome)).await {
            log::warn!("Pipeline: history task panicked: {e}");
        }

        // ── 5. Complete ──────────────────────────────────────────────────
        self.complete(final_text);
    }

    /// Ask the configured provider to refine `original`.
    ///
    /// Returns the final text plus the model id when a refinement actually
    /// took effect.  On provider failure or a rejected reply this falls back
    /// to `original` exactly as STT produced it, with no model id.
    async fn refined_or_original(&self, original: &str) -> (String, Option<&'static str>) {
        let provider = self.providers.select(&self.config.refine.provider);
        let prompt = PromptBuilder::from_config(&self.config.refine).build();

        match provider.refine(original, &prompt).await {
            Ok(reply) => {
                let candidate = sanitize(&reply);
                if is_acceptable(original, &candidate) {
                    log::debug!("Pipeline: {} refinement accepted", provider.display_name());
                    (candidate, Some(provider.model_id()))
                } else {
                    log::warn!(
                        "Pipeline: {} reply rejected as off-transcript, keeping the raw text",
                        provider.display_name()
                    );
                    (original.to_string(), None)
                }
            }
            Err(e) => {
                log::warn!(
                    "Pipeline: {} refinement failed ({e}), keeping the raw text",
                    provider.display_name()
                );
                (original.to_string(), None)
            }
        }
    }

    /// Enter `Completed` and schedule the dwell revert back to `Idle`.
    fn complete(&self, text: String) {
        log::info!("Pipeline: completed ({} chars)", text.chars().count());
        *self.state.lock().unwrap() = PipelineState::Completed(text);
        self.cues.play(SoundCue::Completed);

        // The revert re-checks the state under the lock, so a cycle that
        // starts between the abort and the timer firing can never be
        // clobbered back to Idle.
        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(COMPLETED_DWELL).await;
            let mut st = state.lock().unwrap();
            if matches!(*st, PipelineState::Completed(_)) {
                *st = PipelineState::Idle;
                log::debug!("Pipeline: Completed → Idle after dwell");
            }
        });
        *self.dwell.lock().unwrap() = Some(handle);
    }

    fn fail(&self, message: String) {
        enter_failed(&self.state, self.cues.as_ref(), message);
    }
}

/// Enter `Failed` with an error cue.  Shared by the toggle handler (capture
/// failures) and the cycle task (STT failures).
fn enter_failed(state: &SharedState, cues: &dyn CuePlayer, message: String) {
    log::error!("Pipeline: {message}");
    *state.lock().unwrap() = PipelineState::Failed(message);
    cues.play(SoundCue::Failed);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::MockCapture;
    use crate::inject::MockDelivery;
    use crate::llm::{MockRefiner, RefineError, RefineProvider};
    use crate::pipeline::state::new_shared_state;
    use crate::sound::MockCues;
    use crate::stats::MockSink;
    use crate::stt::{MockSttEngine, SttError, Transcript};
    use async_trait::async_trait;

    // -----------------------------------------------------------------------
    // Harness
    // -----------------------------------------------------------------------

    struct Harness {
        orc: PipelineOrchestrator,
        state: SharedState,
        stt: Arc<MockSttEngine>,
        refiner: Arc<MockRefiner>,
        delivery: Arc<MockDelivery>,
        cues: Arc<MockCues>,
        sink: Arc<MockSink>,
    }

    fn build(
        config: AppConfig,
        capture: MockCapture,
        stt: MockSttEngine,
        refiner: MockRefiner,
        delivery: MockDelivery,
    ) -> Harness {
        let state = new_shared_state();
        let stt = Arc::new(stt);
        let refiner = Arc::new(refiner);
        let delivery = Arc::new(delivery);
        let cues = Arc::new(MockCues::new());
        let sink = Arc::new(MockSink::new());

        let providers = Arc::new(ProviderRegistry::new(
            Arc::clone(&refiner) as Arc<dyn RefineProvider>,
            Vec::new(),
        ));

        let orc = PipelineOrchestrator::new(
            Arc::clone(&state),
            config,
            Arc::new(capture),
            Arc::clone(&stt) as Arc<dyn SpeechToText>,
            providers,
            Arc::clone(&delivery) as Arc<dyn TextDelivery>,
            Arc::clone(&cues) as Arc<dyn CuePlayer>,
            Arc::clone(&sink) as Arc<dyn OutcomeSink>,
        );

        Harness {
            orc,
            state,
            stt,
            refiner,
            delivery,
            cues,
            sink,
        }
    }

    fn harness(
        config: AppConfig,
        capture: MockCapture,
        stt: MockSttEngine,
        refiner: MockRefiner,
    ) -> Harness {
        build(config, capture, stt, refiner, MockDelivery::new())
    }

    /// Toggle twice (start + stop) and wait for the spawned cycle.
    async fn run_one_cycle(h: &Harness) {
        h.orc.toggle().await;
        h.orc.toggle().await;
        h.orc.wait_for_cycle().await;
    }

    // -----------------------------------------------------------------------
    // Starting and stopping
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn toggle_from_idle_starts_recording() {
        let h = harness(
            AppConfig::default(),
            MockCapture::with_clip(2.0),
            MockSttEngine::ok("你好嗎"),
            MockRefiner::ok("groq", "你好嗎?"),
        );

        h.orc.toggle().await;

        assert!(matches!(
            *h.state.lock().unwrap(),
            PipelineState::Recording { .. }
        ));
        assert_eq!(*h.cues.played.lock().unwrap(), vec![SoundCue::Started]);
    }

    #[tokio::test]
    async fn run_loop_drives_toggles() {
        let (tx, rx) = mpsc::channel(4);
        let h = harness(
            AppConfig::default(),
            MockCapture::with_clip(2.0),
            MockSttEngine::ok("你好嗎"),
            MockRefiner::ok("groq", "你好嗎?"),
        );
        let state = Arc::clone(&h.state);

        tx.send(HotkeyEvent::Toggle).await.unwrap();
        drop(tx); // close the channel so run() returns

        h.orc.run(rx).await;

        assert!(matches!(
            *state.lock().unwrap(),
            PipelineState::Recording { .. }
        ));
    }

    #[tokio::test]
    async fn capture_start_failure_fails_the_cycle() {
        let h = harness(
            AppConfig::default(),
            MockCapture::failing_start(),
            MockSttEngine::ok("unused"),
            MockRefiner::ok("groq", "unused"),
        );

        h.orc.toggle().await;

        assert!(matches!(
            *h.state.lock().unwrap(),
            PipelineState::Failed(_)
        ));
        assert_eq!(*h.cues.played.lock().unwrap(), vec![SoundCue::Failed]);
        assert!(h.sink.recorded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn short_clip_is_discarded_without_transcription() {
        let h = harness(
            AppConfig::default(),
            MockCapture::with_clip(0.3),
            MockSttEngine::ok("unused"),
            MockRefiner::ok("groq", "unused"),
        );

        run_one_cycle(&h).await;

        assert_eq!(*h.state.lock().unwrap(), PipelineState::Idle);
        assert!(h.stt.calls.lock().unwrap().is_empty());
        assert!(h.delivery.delivered.lock().unwrap().is_empty());
        assert!(h.sink.recorded.lock().unwrap().is_empty());
        // Start and stop cues only; neither Completed nor Failed.
        assert_eq!(
            *h.cues.played.lock().unwrap(),
            vec![SoundCue::Started, SoundCue::Stopped]
        );
    }

    // -----------------------------------------------------------------------
    // The happy path
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn full_cycle_delivers_refined_text() {
        let h = harness(
            AppConfig::default(),
            MockCapture::with_clip(2.0),
            MockSttEngine::ok("今天開會改到三點嗎"),
            MockRefiner::ok("groq", "今天開會改到三點嗎。"),
        );

        run_one_cycle(&h).await;

        assert_eq!(
            *h.state.lock().unwrap(),
            PipelineState::Completed("今天開會改到三點嗎。".into())
        );
        assert_eq!(
            *h.delivery.delivered.lock().unwrap(),
            vec!["今天開會改到三點嗎。".to_string()]
        );
        assert_eq!(
            *h.cues.played.lock().unwrap(),
            vec![SoundCue::Started, SoundCue::Stopped, SoundCue::Completed]
        );

        let recorded = h.sink.recorded.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        let outcome = &recorded[0];
        assert_eq!(outcome.original_text, "今天開會改到三點嗎");
        assert_eq!(outcome.refined_text.as_deref(), Some("今天開會改到三點嗎。"));
        assert_eq!(outcome.language, "zh");
        assert_eq!(outcome.duration_secs, 2.0);
        assert_eq!(outcome.stt_model, "mock-whisper");
        assert_eq!(outcome.refine_model.as_deref(), Some("mock-model"));
    }

    #[tokio::test]
    async fn language_hint_and_prompt_flow_from_config() {
        let mut config = AppConfig::default();
        config.stt.language = "auto".into();
        config.refine.glossary = vec!["Kubernetes".into()];
        config.refine.extra_rules = "保留英文縮寫".into();

        let h = harness(
            config,
            MockCapture::with_clip(2.0),
            MockSttEngine::ok("部署到庫柏柏內提斯"),
            MockRefiner::ok("groq", "部署到 Kubernetes"),
        );

        run_one_cycle(&h).await;

        // "auto" omits the language hint entirely.
        assert_eq!(*h.stt.calls.lock().unwrap(), vec![None]);

        let calls = h.refiner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (transcript, prompt) = &calls[0];
        assert_eq!(transcript, "部署到庫柏柏內提斯");
        assert!(prompt.contains("【自訂字典】Kubernetes"));
        assert!(prompt.contains("【額外規則】保留英文縮寫"));
    }

    #[tokio::test]
    async fn default_config_sends_the_configured_language_hint() {
        let h = harness(
            AppConfig::default(),
            MockCapture::with_clip(2.0),
            MockSttEngine::ok("你好嗎"),
            MockRefiner::ok("groq", "你好嗎?"),
        );

        run_one_cycle(&h).await;

        assert_eq!(
            *h.stt.calls.lock().unwrap(),
            vec![Some("zh".to_string())]
        );
    }

    // -----------------------------------------------------------------------
    // Fallback paths
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn refinement_failure_falls_back_to_the_raw_transcript() {
        let h = harness(
            AppConfig::default(),
            MockCapture::with_clip(2.0),
            MockSttEngine::ok("今天開會改到三點嗎"),
            MockRefiner::err("groq", RefineError::Transport("connection reset".into())),
        );

        run_one_cycle(&h).await;

        // The cycle still completes; the user gets the raw transcript.
        assert_eq!(
            *h.state.lock().unwrap(),
            PipelineState::Completed("今天開會改到三點嗎".into())
        );
        assert_eq!(
            *h.delivery.delivered.lock().unwrap(),
            vec!["今天開會改到三點嗎".to_string()]
        );

        let recorded = h.sink.recorded.lock().unwrap();
        assert_eq!(recorded[0].refined_text.as_deref(), Some("今天開會改到三點嗎"));
        assert_eq!(recorded[0].refine_model, None);
    }

    #[tokio::test]
    async fn rejected_refinement_keeps_the_raw_transcript() {
        // The "refinement" shares no letters with the transcript — the model
        // answered the question instead of polishing it.
        let h = harness(
            AppConfig::default(),
            MockCapture::with_clip(2.0),
            MockSttEngine::ok("今天開會改到三點嗎"),
            MockRefiner::ok("groq", "The meeting moved to three."),
        );

        run_one_cycle(&h).await;

        assert_eq!(
            *h.state.lock().unwrap(),
            PipelineState::Completed("今天開會改到三點嗎".into())
        );
        let recorded = h.sink.recorded.lock().unwrap();
        assert_eq!(recorded[0].refine_model, None);
        // Not a failure: the completion cue plays, not the error cue.
        assert!(h.cues.played.lock().unwrap().contains(&SoundCue::Completed));
    }

    #[tokio::test]
    async fn fallback_preserves_the_unsanitized_transcript() {
        // Whisper sometimes returns text wrapped in quotes.  The fallback
        // must deliver it byte-for-byte, not a sanitized version.
        let h = harness(
            AppConfig::default(),
            MockCapture::with_clip(2.0),
            MockSttEngine::ok("「今天天氣很好嗎」"),
            MockRefiner::err("groq", RefineError::EmptyResponse),
        );

        run_one_cycle(&h).await;

        assert_eq!(
            *h.delivery.delivered.lock().unwrap(),
            vec!["「今天天氣很好嗎」".to_string()]
        );
    }

    // -----------------------------------------------------------------------
    // Fatal and discard paths
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn stt_failure_fails_the_cycle() {
        let h = harness(
            AppConfig::default(),
            MockCapture::with_clip(2.0),
            MockSttEngine::err(SttError::Service {
                status: 500,
                body: "upstream exploded".into(),
            }),
            MockRefiner::ok("groq", "unused"),
        );

        run_one_cycle(&h).await;

        match &*h.state.lock().unwrap() {
            PipelineState::Failed(message) => assert!(message.contains("500")),
            other => panic!("expected Failed, got {other:?}"),
        }
        assert!(h.delivery.delivered.lock().unwrap().is_empty());
        assert!(h.sink.recorded.lock().unwrap().is_empty());
        assert_eq!(
            *h.cues.played.lock().unwrap(),
            vec![SoundCue::Started, SoundCue::Stopped, SoundCue::Failed]
        );
    }

    #[tokio::test]
    async fn short_transcript_is_discarded() {
        let h = harness(
            AppConfig::default(),
            MockCapture::with_clip(2.0),
            MockSttEngine::ok(" 嗯 "),
            MockRefiner::ok("groq", "unused"),
        );

        run_one_cycle(&h).await;

        assert_eq!(*h.state.lock().unwrap(), PipelineState::Idle);
        assert!(h.refiner.calls.lock().unwrap().is_empty());
        assert!(h.delivery.delivered.lock().unwrap().is_empty());
        assert!(h.sink.recorded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn toggle_is_ignored_while_transcribing() {
        /// An STT client whose request never resolves, pinning the cycle in
        /// `Transcribing`.
        struct StallingStt;

        #[async_trait]
        impl SpeechToText for StallingStt {
            async fn transcribe(
                &self,
                _wav_bytes: Vec<u8>,
                _language: Option<&str>,
            ) -> Result<Transcript, SttError> {
                std::future::pending().await
            }
        }

        let state = new_shared_state();
        let cues = Arc::new(MockCues::new());
        let providers = Arc::new(ProviderRegistry::new(
            Arc::new(MockRefiner::ok("groq", "unused")) as Arc<dyn RefineProvider>,
            Vec::new(),
        ));
        let orc = PipelineOrchestrator::new(
            Arc::clone(&state),
            AppConfig::default(),
            Arc::new(MockCapture::with_clip(2.0)),
            Arc::new(StallingStt),
            providers,
            Arc::new(MockDelivery::new()) as Arc<dyn TextDelivery>,
            Arc::clone(&cues) as Arc<dyn CuePlayer>,
            Arc::new(MockSink::new()) as Arc<dyn OutcomeSink>,
        );

        orc.toggle().await; // start
        orc.toggle().await; // stop → Transcribing, cycle task pinned
        orc.toggle().await; // must be a no-op
        orc.toggle().await; // and again

        assert!(matches!(
            *state.lock().unwrap(),
            PipelineState::Transcribing { .. }
        ));
        // No extra Started cue: the ignored toggles never reached capture.
        assert_eq!(
            *cues.played.lock().unwrap(),
            vec![SoundCue::Started, SoundCue::Stopped]
        );
    }

    // -----------------------------------------------------------------------
    // Delivery configuration
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn auto_paste_off_skips_delivery_but_still_records() {
        let mut config = AppConfig::default();
        config.delivery.auto_paste = false;

        let h = harness(
            config,
            MockCapture::with_clip(2.0),
            MockSttEngine::ok("你好嗎"),
            MockRefiner::ok("groq", "你好嗎?"),
        );

        run_one_cycle(&h).await;

        assert!(h.delivery.delivered.lock().unwrap().is_empty());
        assert_eq!(h.sink.recorded.lock().unwrap().len(), 1);
        assert!(matches!(
            *h.state.lock().unwrap(),
            PipelineState::Completed(_)
        ));
    }

    #[tokio::test]
    async fn delivery_failure_still_completes_the_cycle() {
        let h = build(
            AppConfig::default(),
            MockCapture::with_clip(2.0),
            MockSttEngine::ok("你好嗎"),
            MockRefiner::ok("groq", "你好嗎?"),
            MockDelivery::failing(),
        );

        run_one_cycle(&h).await;

        assert!(matches!(
            *h.state.lock().unwrap(),
            PipelineState::Completed(_)
        ));
        assert_eq!(h.sink.recorded.lock().unwrap().len(), 1);
        assert!(!h.cues.played.lock().unwrap().contains(&SoundCue::Failed));
    }

    #[tokio::test]
    async fn unknown_provider_id_uses_the_default_backend() {
        let mut config = AppConfig::default();
        config.refine.provider = "local-llama".into();

        let h = harness(
            config,
            MockCapture::with_clip(2.0),
            MockSttEngine::ok("你好嗎今天好嗎"),
            MockRefiner::ok("groq", "你好嗎?今天好嗎?"),
        );

        run_one_cycle(&h).await;

        assert_eq!(h.refiner.calls.lock().unwrap().len(), 1);
        let recorded = h.sink.recorded.lock().unwrap();
        assert_eq!(recorded[0].refine_model.as_deref(), Some("mock-model"));
    }

    // -----------------------------------------------------------------------
    // Dwell behaviour
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn completed_reverts_to_idle_after_the_dwell() {
        let h = harness(
            AppConfig::default(),
            MockCapture::with_clip(2.0),
            MockSttEngine::ok("你好嗎"),
            MockRefiner::ok("groq", "你好嗎?"),
        );

        run_one_cycle(&h).await;
        assert!(matches!(
            *h.state.lock().unwrap(),
            PipelineState::Completed(_)
        ));

        h.orc.wait_for_dwell().await;
        assert_eq!(*h.state.lock().unwrap(), PipelineState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn a_new_cycle_cancels_the_dwell_revert() {
        let h = harness(
            AppConfig::default(),
            MockCapture::with_clip(2.0),
            MockSttEngine::ok("你好嗎"),
            MockRefiner::ok("groq", "你好嗎?"),
        );

        run_one_cycle(&h).await;
        assert!(matches!(
            *h.state.lock().unwrap(),
            PipelineState::Completed(_)
        ));

        // Start the next cycle before the dwell fires.
        h.orc.toggle().await;
        assert!(matches!(
            *h.state.lock().unwrap(),
            PipelineState::Recording { .. }
        ));

        // Even well past the dwell deadline, the revert must not clobber
        // the new recording.
        tokio::time::sleep(COMPLETED_DWELL * 3).await;
        assert!(matches!(
            *h.state.lock().unwrap(),
            PipelineState::Recording { .. }
        ));
    }
}
