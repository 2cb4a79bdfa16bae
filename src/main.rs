//! Application entry point — voxscribe.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Build the shared HTTP client and credential store.
//! 4. Build the pipeline collaborators (capture, STT, refinement registry,
//!    delivery, cues, history).
//! 5. Spawn the pipeline orchestrator on the tokio runtime.
//! 6. Spawn the hotkey listener thread.
//! 7. Wait for Ctrl-C.

use std::sync::Arc;

use tokio::sync::mpsc;
use voxscribe::{
    audio::{AudioCapture, MicRecorder},
    config::AppConfig,
    credentials::{CredentialStore, FileCredentialStore},
    hotkey::{parse_key, HotkeyListener},
    inject::{ClipboardInjector, TextDelivery},
    llm::ProviderRegistry,
    pipeline::{new_shared_state, PipelineOrchestrator},
    sound::{CuePlayer, SilentCues, TonePlayer},
    stats::{HistoryStore, OutcomeSink},
    stt::{GroqWhisperClient, SpeechToText},
};

#[tokio::main]
async fn main() {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("voxscribe starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    log::info!(
        "Config: provider={}, language={}, auto_paste={}, hotkey={}",
        config.refine.provider,
        config.stt.language,
        config.delivery.auto_paste,
        config.hotkey.toggle_key
    );

    // 3. Shared HTTP client + credential store
    let http = reqwest::Client::new();
    let credentials: Arc<dyn CredentialStore> = Arc::new(FileCredentialStore::new());

    // 4. Pipeline collaborators
    let capture: Arc<dyn AudioCapture> = Arc::new(MicRecorder::new());
    let stt: Arc<dyn SpeechToText> = Arc::new(GroqWhisperClient::new(
        http.clone(),
        Arc::clone(&credentials),
    ));
    let providers = Arc::new(ProviderRegistry::with_default_backends(&http, &credentials));
    let delivery: Arc<dyn TextDelivery> = Arc::new(ClipboardInjector::new());
    let cues: Arc<dyn CuePlayer> = if config.delivery.sound_cues {
        Arc::new(TonePlayer::new())
    } else {
        Arc::new(SilentCues)
    };

    let history = HistoryStore::new();
    match history.today() {
        Ok(today) => log::info!(
            "History: {} transcriptions recorded today ({:.0}s of speech)",
            today.transcriptions,
            today.total_duration_secs
        ),
        Err(e) => log::warn!("History: could not read today's stats: {e}"),
    }
    let sink: Arc<dyn OutcomeSink> = Arc::new(history);

    // 5. Pipeline orchestrator
    let state = new_shared_state();
    let (hotkey_tx, hotkey_rx) = mpsc::channel(16);
    let orchestrator = PipelineOrchestrator::new(
        state,
        config.clone(),
        capture,
        stt,
        providers,
        delivery,
        cues,
        sink,
    );
    tokio::spawn(async move { orchestrator.run(hotkey_rx).await });

    // 6. Hotkey listener thread
    let key = parse_key(&config.hotkey.toggle_key).unwrap_or_else(|| {
        log::warn!(
            "Unknown hotkey '{}' in settings, falling back to F9",
            config.hotkey.toggle_key
        );
        rdev::Key::F9
    });
    let _listener = HotkeyListener::start(key, hotkey_tx);
    log::info!("Ready: press {:?} to toggle recording", key);

    // 7. Run until interrupted
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for the shutdown signal: {e}");
    }
    log::info!("voxscribe shutting down");
}
