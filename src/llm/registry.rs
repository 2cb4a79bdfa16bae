//! Provider registry — maps the configured provider id to a backend.
//!
//! Selection never fails: an unrecognised id (stale config, typo) logs a
//! warning and falls back to the default provider, so a bad setting can cost
//! the user at most a different model, never a broken cycle.

use std::sync::Arc;

use crate::credentials::CredentialStore;
use crate::llm::chat::{GroqRefiner, OpenAiRefiner};
use crate::llm::claude::ClaudeRefiner;
use crate::llm::provider::RefineProvider;

// ---------------------------------------------------------------------------
// ProviderRegistry
// ---------------------------------------------------------------------------

/// Fixed set of refinement backends with a designated default.
pub struct ProviderRegistry {
    default: Arc<dyn RefineProvider>,
    alternates: Vec<Arc<dyn RefineProvider>>,
}

impl ProviderRegistry {
    /// Build a registry from an explicit default and any number of
    /// alternates.
    pub fn new(default: Arc<dyn RefineProvider>, alternates: Vec<Arc<dyn RefineProvider>>) -> Self {
        Self {
            default,
            alternates,
        }
    }

    /// The standard production registry: Groq (default), OpenAI, Claude.
    pub fn with_default_backends(
        client: &reqwest::Client,
        credentials: &Arc<dyn CredentialStore>,
    ) -> Self {
        Self::new(
            Arc::new(GroqRefiner::new(client.clone(), Arc::clone(credentials))),
            vec![
                Arc::new(OpenAiRefiner::new(client.clone(), Arc::clone(credentials))),
                Arc::new(ClaudeRefiner::new(client.clone(), Arc::clone(credentials))),
            ],
        )
    }

    /// Resolve a provider id from config.
    ///
    /// Unknown ids log a warning and resolve to the default provider.
    pub fn select(&self, id: &str) -> Arc<dyn RefineProvider> {
        if self.default.id() == id {
            return Arc::clone(&self.default);
        }
        for provider in &self.alternates {
            if provider.id() == id {
                return Arc::clone(provider);
            }
        }
        log::warn!(
            "unknown refinement provider '{}', falling back to '{}'",
            id,
            self.default.id()
        );
        Arc::clone(&self.default)
    }

    /// The default backend.
    pub fn default_provider(&self) -> Arc<dyn RefineProvider> {
        Arc::clone(&self.default)
    }

    /// Ids of every registered backend, default first.
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids = vec![self.default.id()];
        ids.extend(self.alternates.iter().map(|p| p.id()));
        ids
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
