//! Core `RefineProvider` trait and the shared error taxonomy.
//!
//! Every LLM backend (Groq, OpenAI, Claude) implements [`RefineProvider`]:
//! identity for config lookup and history records, plus a single `refine`
//! operation that rewrites a transcript under a system prompt.  Backends are
//! shared as `Arc<dyn RefineProvider>` and selected at cycle time by the
//! [`ProviderRegistry`](crate::llm::ProviderRegistry).

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::credentials::CredentialStore;

/// Per-request timeout for refinement calls.
pub(crate) const REFINE_TIMEOUT: Duration = Duration::from_secs(30);

/// Token ceiling for refinement replies.
pub(crate) const MAX_TOKENS: u32 = 4096;

// ---------------------------------------------------------------------------
// RefineError
// ---------------------------------------------------------------------------

/// Errors that can occur during transcript refinement.
///
/// All of these are non-fatal to the pipeline: the orchestrator falls back
/// to the raw transcript and completes the cycle.
#[derive(Debug, Clone, Error)]
pub enum RefineError {
    /// No API key is configured for the selected provider.
    #[error("no API credential configured for {0}")]
    MissingCredential(&'static str),

    /// HTTP transport failure, including request timeouts.
    #[error("refinement request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success HTTP status.
    #[error("refinement service returned HTTP {status}: {body}")]
    Service { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("failed to parse refinement response: {0}")]
    Malformed(String),

    /// The service replied without any usable text.
    #[error("refinement service returned no text")]
    EmptyResponse,
}

impl From<reqwest::Error> for RefineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RefineError::Transport("request timed out".into())
        } else {
            RefineError::Transport(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// RefineProvider trait
// ---------------------------------------------------------------------------

/// Async trait for LLM-backed transcript refinement.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks as
/// `Arc<dyn RefineProvider>`.
#[async_trait]
pub trait RefineProvider: Send + Sync {
    /// Stable identifier used for config lookup (`"groq"`, `"openai"`,
    /// `"claude"`).
    fn id(&self) -> &'static str;

    /// Human-readable name for log lines.
    fn display_name(&self) -> &'static str;

    /// Model identifier recorded in the transcription history.
    fn model_id(&self) -> &'static str;

    /// Rewrite `transcript` according to `system_prompt`.
    ///
    /// The transcript is passed exactly as STT returned it; cleanup of the
    /// reply happens in [`sanitize`](crate::llm::sanitize) afterwards.
    async fn refine(&self, transcript: &str, system_prompt: &str) -> Result<String, RefineError>;
}

/// Look up the API key for `provider`, treating empty values as absent.
pub(crate) fn require_key(
    credentials: &dyn CredentialStore,
    provider: &'static str,
) -> Result<String, RefineError> {
    credentials
        .secret(provider)
        .filter(|key| !key.is_empty())
        .ok_or(RefineError::MissingCredential(provider))
}

// ---------------------------------------------------------------------------
// Mock provider (tests)
// ---------------------------------------------------------------------------

/// Canned [`RefineProvider`] for registry and orchestrator tests.
#[cfg(test)]
pub struct MockRefiner {
    id: &'static str,
    reply: Result<String, RefineError>,
    /// `(transcript, system_prompt)` of every call received.
    pub calls: std::sync::Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl MockRefiner {
    /// A provider that always replies with `reply`.
    pub fn ok(id: &'static str, reply: &str) -> Self {
        Self {
            id,
            reply: Ok(reply.to_string()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// A provider that always fails with `error`.
    pub fn err(id: &'static str, error: RefineError) -> Self {
        Self {
            id,
            reply: Err(error),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl RefineProvider for MockRefiner {
    fn id(&self) -> &'static str {
        self.id
    }

    fn display_name(&self) -> &'static str {
        "Mock"
    }

    fn model_id(&self) -> &'static str {
        "mock-model"
    }

    async fn refine(&self, transcript: &str, system_prompt: &str) -> Result<String, RefineError> {
        self.calls
            .lock()
            .unwrap()
            .push((transcript.to_string(), system_prompt.to_string()));
        self.reply.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
