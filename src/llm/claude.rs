//! Claude backend via the Anthropic messages API.
//!
//! Unlike the chat-completions services this API takes the system prompt as
//! a top-level field and expects custom headers (`x-api-key`,
//! `anthropic-version`).  The transcript is wrapped in `<transcription>`
//! tags so the model treats it as data rather than conversation.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::credentials::CredentialStore;
use crate::llm::provider::{require_key, RefineError, RefineProvider, MAX_TOKENS, REFINE_TIMEOUT};

const CLAUDE_URL: &str = "https://api.anthropic.com/v1/messages";
const CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

// ---------------------------------------------------------------------------
// ClaudeRefiner
// ---------------------------------------------------------------------------

/// Refinement via the Anthropic messages API.
pub struct ClaudeRefiner {
    client: reqwest::Client,
    credentials: Arc<dyn CredentialStore>,
    endpoint: String,
}

impl ClaudeRefiner {
    pub fn new(client: reqwest::Client, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            client,
            credentials,
            endpoint: CLAUDE_URL.to_string(),
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
impl RefineProvider for ClaudeRefiner {
    fn id(&self) -> &'static str {
        "claude"
    }

    fn display_name(&self) -> &'static str {
        "Claude"
    }

    fn model_id(&self) -> &'static str {
        CLAUDE_MODEL
    }

    async fn refine(&self, transcript: &str, system_prompt: &str) -> Result<String, RefineError> {
        let key = require_key(self.credentials.as_ref(), "claude")?;

        let body = serde_json::json!({
            "model": CLAUDE_MODEL,
            "max_tokens": MAX_TOKENS,
            "system": system_prompt,
            "messages": [
                {
                    "role": "user",
                    "content": format!("<transcription>{transcript}</transcription>")
                }
            ]
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", key)
            .header("anthropic-version", ANTHROPIC_VERSION)
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

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| RefineError::Malformed(e.to_string()))?;

        let text = parsed
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .unwrap_or_default();

        if text.is_empty() {
            return Err(RefineError::EmptyResponse);
        }
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
