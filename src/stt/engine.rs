//! Core speech-to-text trait and the Groq Whisper client.
//!
//! # Overview
//!
//! [`SpeechToText`] is the interface used by the pipeline.  It is
//! object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn SpeechToText>`.
//!
//! [`GroqWhisperClient`] is the production implementation: it uploads the
//! recorded WAV clip to Groq's OpenAI-compatible transcription endpoint
//! (`whisper-large-v3`) and maps the `verbose_json` reply to a
//! [`Transcript`].
//!
//! [`MockSttEngine`] (available under `#[cfg(test)]`) returns a
//! pre-configured response — useful for unit-testing the pipeline without
//! network access.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::credentials::CredentialStore;

const GROQ_STT_URL: &str = "https://api.groq.com/openai/v1/audio/transcriptions";

/// Model id sent with every upload and recorded in the history.
pub const WHISPER_MODEL: &str = "whisper-large-v3";

/// Per-request timeout; uploads carry a whole clip, so this is generous.
pub(crate) const STT_TIMEOUT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// All errors that can arise from the STT subsystem.
///
/// Unlike refinement errors these are fatal to the cycle: there is no text
/// to fall back to without a transcript.
#[derive(Debug, Clone, Error)]
pub enum SttError {
    /// No API key is configured for the transcription service.
    #[error("no API credential configured for {0}")]
    MissingCredential(&'static str),

    /// The recorded clip contained no audio bytes.
    #[error("recorded clip is empty")]
    EmptyAudio,

    /// HTTP transport failure, including request timeouts.
    #[error("transcription request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success HTTP status.
    #[error("transcription service returned HTTP {status}: {body}")]
    Service { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("failed to parse transcription response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for SttError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SttError::Transport("request timed out".into())
        } else {
            SttError::Transport(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// A finished transcription, normalised from the service reply.
#[derive(Debug, Clone)]
pub struct Transcript {
    /// Raw transcript text, exactly as the service returned it.
    pub text: String,
    /// Detected language code; `"unknown"` when the service omits it.
    pub language: String,
    /// Speech duration in seconds as reported by the service; `0` when
    /// omitted.
    pub duration_secs: f64,
    /// Model that produced the text.
    pub model: String,
}

// ---------------------------------------------------------------------------
// SpeechToText trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for speech-to-text backends.
///
/// # Contract
///
/// - `wav_bytes` is a complete WAV file (header + PCM data).
/// - `language` is an ISO-639-1 hint, or `None` to let the service detect
///   the language itself.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe `wav_bytes` and return the normalised [`Transcript`].
    async fn transcribe(
        &self,
        wav_bytes: Vec<u8>,
        language: Option<&str>,
    ) -> Result<Transcript, SttError>;
}

// Compile-time assertion: Box<dyn SpeechToText> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechToText>) {}
};

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Subset of the `verbose_json` transcription response we care about.
#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    text: String,
    language: Option<String>,
    duration: Option<f64>,
}

// ---------------------------------------------------------------------------
// GroqWhisperClient
// ---------------------------------------------------------------------------

/// Production STT client backed by Groq-hosted Whisper.
pub struct GroqWhisperClient {
    client: reqwest::Client,
    credentials: Arc<dyn CredentialStore>,
    endpoint: String,
}

impl GroqWhisperClient {
    pub fn new(client: reqwest::Client, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            client,
            credentials,
            endpoint: GROQ_STT_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (mock server in tests).
    #[cfg(test)]
    pub fn with_endpoint(mut self, url: &str) -> Self {
        self.endpoint = url.to_string();
        self
    }
}

#[async_trait]
impl SpeechToText for GroqWhisperClient {
    async fn transcribe(
        &self,
        wav_bytes: Vec<u8>,
        language: Option<&str>,
    ) -> Result<Transcript, SttError> {
        let api_key = self
            .credentials
            .secret("groq")
            .filter(|key| !key.is_empty())
            .ok_or(SttError::MissingCredential("groq"))?;

        if wav_bytes.is_empty() {
            return Err(SttError::EmptyAudio);
        }

        let file = Part::bytes(wav_bytes)
            .file_name("recording.wav")
            .mime_str("audio/wav")?;

        let mut form = Form::new()
            .text("model", WHISPER_MODEL)
            .text("response_format", "verbose_json")
            .part("file", file);

        // Omitting the field entirely triggers server-side detection.
        if let Some(lang) = language {
            form = form.text("language", lang.to_string());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&api_key)
            .multipart(form)
            .timeout(STT_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SttError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: VerboseTranscription = response
            .json()
            .await
            .map_err(|e| SttError::Malformed(e.to_string()))?;

        Ok(Transcript {
            text: parsed.text,
            language: parsed.language.unwrap_or_else(|| "unknown".to_string()),
            duration_secs: parsed.duration.unwrap_or(0.0),
            model: WHISPER_MODEL.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// MockSttEngine  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a pre-configured response without touching
/// the network.
#[cfg(test)]
pub struct MockSttEngine {
    response: Result<Transcript, SttError>,
    /// Language hint of every call received.
    pub calls: std::sync::Mutex<Vec<Option<String>>>,
}

#[cfg(test)]
impl MockSttEngine {
    /// Create a mock that always returns `Ok` with `text` (language `"zh"`,
    /// duration 1.0 s).
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(Transcript {
                text: text.into(),
                language: "zh".into(),
                duration_secs: 1.0,
                model: "mock-whisper".into(),
            }),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always returns `Err(error)`.
    pub fn err(error: SttError) -> Self {
        Self {
            response: Err(error),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl SpeechToText for MockSttEngine {
    async fn transcribe(
        &self,
        wav_bytes: Vec<u8>,
        language: Option<&str>,
    ) -> Result<Transcript, SttError> {
        // Enforce the non-empty contract even in the mock so that callers
        // are tested against it.
        if wav_bytes.is_empty() {
            return Err(SttError::EmptyAudio);
        }
        self.calls
            .lock()
            .unwrap()
            .push(language.map(str::to_string));
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentials;

    const FAKE_WAV: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt ";

    fn client_with(server: &mockito::Server, key: &str) -> GroqWhisperClient {
        let credentials: Arc<dyn CredentialStore> =
            Arc::new(StaticCredentials::with("groq", key));
        GroqWhisperClient::new(reqwest::Client::new(), credentials)
            .with_endpoint(&format!("{}/transcriptions", server.url()))
    }

    // --- happy path ---

    #[tokio::test]
    async fn maps_verbose_json_to_transcript() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/transcriptions")
            .match_header("authorization", "Bearer gsk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"text":" 今天天氣很好","language":"zh","duration":2.5}"#)
            .create_async()
            .await;

        let client = client_with(&server, "gsk-test");
        let transcript = client
            .transcribe(FAKE_WAV.to_vec(), Some("zh"))
            .await
            .expect("transcription");

        assert_eq!(transcript.text, " 今天天氣很好");
        assert_eq!(transcript.language, "zh");
        assert_eq!(transcript.duration_secs, 2.5);
        assert_eq!(transcript.model, WHISPER_MODEL);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_language_and_duration_fall_back() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/transcriptions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"text":"hello"}"#)
            .create_async()
            .await;

        let client = client_with(&server, "gsk-test");
        let transcript = client
            .transcribe(FAKE_WAV.to_vec(), None)
            .await
            .expect("transcription");

        assert_eq!(transcript.language, "unknown");
        assert_eq!(transcript.duration_secs, 0.0);
    }

    // --- form contents ---

    #[tokio::test]
    async fn language_hint_is_sent_as_a_form_field() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/transcriptions")
            .match_body(mockito::Matcher::Regex(
                "name=\"language\"".to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"text":"ok"}"#)
            .create_async()
            .await;

        let client = client_with(&server, "gsk-test");
        client
            .transcribe(FAKE_WAV.to_vec(), Some("ja"))
            .await
            .expect("transcription");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn no_language_field_when_hint_is_absent() {
        let mut server = mockito::Server::new_async().await;
        // Catch-all first; the stricter mock below takes precedence when
        // its body matcher hits, so zero hits proves the field was omitted.
        server
            .mock("POST", "/transcriptions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"text":"ok"}"#)
            .create_async()
            .await;
        let language_field = server
            .mock("POST", "/transcriptions")
            .match_body(mockito::Matcher::Regex(
                "name=\"language\"".to_string(),
            ))
            .expect(0)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"text":"ok"}"#)
            .create_async()
            .await;

        let client = client_with(&server, "gsk-test");
        client
            .transcribe(FAKE_WAV.to_vec(), None)
            .await
            .expect("transcription");

        language_field.assert_async().await;
    }

    // --- failure paths ---

    #[tokio::test]
    async fn missing_credential_fails_before_any_request() {
        let credentials: Arc<dyn CredentialStore> = Arc::new(StaticCredentials::empty());
        let client = GroqWhisperClient::new(reqwest::Client::new(), credentials)
            .with_endpoint("http://127.0.0.1:1/transcriptions");

        let err = client
            .transcribe(FAKE_WAV.to_vec(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SttError::MissingCredential("groq")));
    }

    #[tokio::test]
    async fn empty_clip_fails_before_any_request() {
        let credentials: Arc<dyn CredentialStore> =
            Arc::new(StaticCredentials::with("groq", "gsk-test"));
        let client = GroqWhisperClient::new(reqwest::Client::new(), credentials)
            .with_endpoint("http://127.0.0.1:1/transcriptions");

        let err = client.transcribe(Vec::new(), None).await.unwrap_err();
        assert!(matches!(err, SttError::EmptyAudio));
    }

    #[tokio::test]
    async fn service_error_carries_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/transcriptions")
            .with_status(401)
            .with_body("invalid api key")
            .create_async()
            .await;

        let client = client_with(&server, "gsk-bad");
        let err = client
            .transcribe(FAKE_WAV.to_vec(), None)
            .await
            .unwrap_err();

        match err {
            SttError::Service { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("expected Service error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unparsable_body_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/transcriptions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("not json at all")
            .create_async()
            .await;

        let client = client_with(&server, "gsk-test");
        let err = client
            .transcribe(FAKE_WAV.to_vec(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SttError::Malformed(_)));
    }

    // --- mock engine ---

    #[tokio::test]
    async fn mock_records_language_hints() {
        let engine = MockSttEngine::ok("こんにちは");
        engine
            .transcribe(FAKE_WAV.to_vec(), Some("ja"))
            .await
            .expect("mock");
        engine.transcribe(FAKE_WAV.to_vec(), None).await.expect("mock");

        let calls = engine.calls.lock().unwrap();
        assert_eq!(*calls, vec![Some("ja".to_string()), None]);
    }

    #[tokio::test]
    async fn mock_err_returns_configured_error() {
        let engine = MockSttEngine::err(SttError::Transport("boom".into()));
        let err = engine
            .transcribe(FAKE_WAV.to_vec(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SttError::Transport(_)));
    }

    // --- error display ---

    #[test]
    fn stt_error_display_service() {
        let e = SttError::Service {
            status: 500,
            body: "oops".into(),
        };
        assert_eq!(
            e.to_string(),
            "transcription service returned HTTP 500: oops"
        );
    }
}
