//! LLM refinement layer.
//!
//! This module provides:
//! * [`RefineProvider`] — async trait implemented by all refinement backends.
//! * [`GroqRefiner`] / [`OpenAiRefiner`] — OpenAI-style chat-completions
//!   backends.
//! * [`ClaudeRefiner`] — Anthropic messages API backend.
//! * [`ProviderRegistry`] — id → backend lookup with a safe default.
//! * [`PromptBuilder`] — assembles the refinement system prompt.
//! * [`sanitize`] — strips conversational wrapping from replies.
//! * [`is_acceptable`] — rejects replies that answer instead of rewrite.
//! * [`RefineError`] — error variants for refinement operations.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voxscribe::credentials::{CredentialStore, FileCredentialStore};
//! use voxscribe::llm::{is_acceptable, sanitize, PromptBuilder, ProviderRegistry};
//!
//! #[tokio::main]
//! async fn main() {
//!     let credentials: Arc<dyn CredentialStore> = Arc::new(FileCredentialStore::new());
//!     let registry = ProviderRegistry::with_default_backends(&reqwest::Client::new(), &credentials);
//!
//!     let raw = "今天 開會 改到 三點";
//!     let prompt = PromptBuilder::new(Vec::new(), String::new()).build();
//!     let provider = registry.select("groq");
//!
//!     let final_text = match provider.refine(raw, &prompt).await {
//!         Ok(reply) => {
//!             let candidate = sanitize(&reply);
//!             if is_acceptable(raw, &candidate) {
//!                 candidate
//!             } else {
//!                 raw.to_string()
//!             }
//!         }
//!         Err(_) => raw.to_string(),
//!     };
//!     println!("{final_text}");
//! }
//! ```

pub mod chat;
pub mod claude;
pub mod prompt;
pub mod provider;
pub mod registry;
pub mod sanitize;
pub mod validate;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use chat::{GroqRefiner, OpenAiRefiner};
pub use claude::ClaudeRefiner;
pub use prompt::PromptBuilder;
pub use provider::{RefineError, RefineProvider};
pub use registry::ProviderRegistry;
pub use sanitize::sanitize;
pub use validate::is_acceptable;

// test-only re-export so the pipeline test module can import MockRefiner
// without `use voxscribe::llm::provider::MockRefiner`.
#[cfg(test)]
pub use provider::MockRefiner;
