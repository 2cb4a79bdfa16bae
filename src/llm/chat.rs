//! OpenAI-style chat-completions backends: Groq and OpenAI.
//!
//! Both services speak the same wire format, so the request/response plumbing
//! lives in a single [`chat_completion`] helper and each backend contributes
//! only its endpoint, model and credential key.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::credentials::CredentialStore;
use crate::llm::provider::{require_key, RefineError, RefineProvider, MAX_TOKENS, REFINE_TIMEOUT};

const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const GROQ_MODEL: &str = "llama-3.3-70b-versatile";

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_MODEL: &str = "gpt-4o-mini";

/// Sampling temperature for refinement; low values keep the rewrite close to
/// the transcript.
const TEMPERATURE: f32 = 0.3;

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// POST a chat-completions request and extract the first reply text.
async fn chat_completion(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    model: &str,
    system_prompt: &str,
    transcript: &str,
) -> Result<String, RefineError> {
    let body = serde_json::json!({
        "model": model,
        "messages": [
            { "role": "system", "content": system_prompt },
            { "role": "user",   "content": transcript    }
        ],
        "max_tokens": MAX_TOKENS,
        "temperature": TEMPERATURE
    });

    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(&body)
        .timeout(REFINE_TIMEOUT)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RefineError::Service {
            status: status.as_u16(),
            body,
        });
    }

    let parsed: ChatResponse = response
        .json()
        .await
        .map_err(|e| RefineError::Malformed(e.to_string()))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    if content.is_empty() {
        return Err(RefineError::EmptyResponse);
    }
    Ok(content)
}

// ---------------------------------------------------------------------------
// GroqRefiner
// ---------------------------------------------------------------------------

/// Refinement via Groq's OpenAI-compatible chat endpoint.
pub struct GroqRefiner {
    client: reqwest::Client,
    credentials: Arc<dyn CredentialStore>,
    endpoint: String,
}

impl GroqRefiner {
    pub fn new(client: reqwest::Client, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            client,
            credentials,
            endpoint: GROQ_CHAT_URL.to_string(),
        }
    }

    /// Point the backend at a different endpoint (mock server in tests).
    #[cfg(test)]
    pub fn with_endpoint(mut self, url: &str) -> Self {
        self.endpoint = url.to_string();
        self
    }
}

#[async_trait]
impl RefineProvider for GroqRefiner {
    fn id(&self) -> &'static str {
        "groq"
    }

    fn display_name(&self) -> &'static str {
        "Groq"
    }

    fn model_id(&self) -> &'static str {
        GROQ_MODEL
    }

    async fn refine(&self, transcript: &str, system_prompt: &str) -> Result<String, RefineError> {
        let key = require_key(self.credentials.as_ref(), "groq")?;
        chat_completion(
            &self.client,
            &self.endpoint,
            &key,
            GROQ_MODEL,
            system_prompt,
            transcript,
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// OpenAiRefiner
// ---------------------------------------------------------------------------

/// Refinement via OpenAI chat completions.
pub struct OpenAiRefiner {
    client: reqwest::Client,
    credentials: Arc<dyn CredentialStore>,
    endpoint: String,
}

impl OpenAiRefiner {
    pub fn new(client: reqwest::Client, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            client,
            credentials,
            endpoint: OPENAI_CHAT_URL.to_string(),
        }
    }

    /// Point the backend at a different endpoint (mock server in tests).
    #[cfg(test)]
    pub fn with_endpoint(mut self, url: &str) -> Self {
        self.endpoint = url.to_string();
        self
    }
}

#[async_trait]
impl RefineProvider for OpenAiRefiner {
    fn id(&self) -> &'static str {
        "openai"
    }

    fn display_name(&self) -> &'static str {
        "OpenAI GPT"
    }

    fn model_id(&self) -> &'static str {
        OPENAI_MODEL
    }

    async fn refine(&self, transcript: &str, system_prompt: &str) -> Result<String, RefineError> {
        let key = require_key(self.credentials.as_ref(), "openai")?;
        chat_completion(
            &self.client,
            &self.endpoint,
            &key,
            OPENAI_MODEL,
            system_prompt,
            transcript,
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentials;

    fn groq_with(server: &mockito::Server, key: &str) -> GroqRefiner {
        let credentials: Arc<dyn CredentialStore> =
            Arc::new(StaticCredentials::with("groq", key));
        GroqRefiner::new(reqwest::Client::new(), credentials)
            .with_endpoint(&format!("{}/chat", server.url()))
    }

    // ---- success path ---

    #[tokio::test]
    async fn groq_refine_returns_the_reply_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .match_header("authorization", "Bearer gsk-test")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "llama-3.3-70b-versatile",
                "max_tokens": 4096
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"今天天氣很好。"}}]}"#)
            .create_async()
            .await;

        let refiner = groq_with(&server, "gsk-test");
        let reply = refiner.refine("今天 天氣 很好", "潤飾").await.unwrap();

        assert_eq!(reply, "今天天氣很好。");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn openai_refine_uses_its_own_model() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4o-mini"
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"Hello."}}]}"#)
            .create_async()
            .await;

        let credentials: Arc<dyn CredentialStore> =
            Arc::new(StaticCredentials::with("openai", "sk-test"));
        let refiner = OpenAiRefiner::new(reqwest::Client::new(), credentials)
            .with_endpoint(&format!("{}/chat", server.url()));

        assert_eq!(refiner.refine("hello", "polish").await.unwrap(), "Hello.");
        mock.assert_async().await;
    }

    // ---- error paths ---

    #[tokio::test]
    async fn missing_credential_fails_before_any_request() {
        let credentials: Arc<dyn CredentialStore> = Arc::new(StaticCredentials::empty());
        // Endpoint deliberately unroutable: the call must not get that far.
        let refiner = GroqRefiner::new(reqwest::Client::new(), credentials)
            .with_endpoint("http://127.0.0.1:1/chat");

        let err = refiner.refine("text", "prompt").await.unwrap_err();
        assert!(matches!(err, RefineError::MissingCredential("groq")));
    }

    #[tokio::test]
    async fn service_error_carries_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let err = groq_with(&server, "gsk-test")
            .refine("text", "prompt")
            .await
            .unwrap_err();

        match err {
            RefineError::Service { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("expected Service error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn undecodable_body_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat")
            .with_status(200)
            .with_body("not json at all")
            .create_async()
            .await;

        let err = groq_with(&server, "gsk-test")
            .refine("text", "prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, RefineError::Malformed(_)));
    }

    #[tokio::test]
    async fn missing_choices_is_an_empty_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = groq_with(&server, "gsk-test")
            .refine("text", "prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, RefineError::EmptyResponse));
    }

    #[tokio::test]
    async fn empty_content_is_an_empty_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":""}}]}"#)
            .create_async()
            .await;

        let err = groq_with(&server, "gsk-test")
            .refine("text", "prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, RefineError::EmptyResponse));
    }
}
