//! API key storage for the remote STT and refinement services.
//!
//! Keys live in `credentials.toml` next to `settings.toml` — a flat
//! `provider = "key"` map, one entry per backend:
//!
//! ```toml
//! groq   = "gsk-..."
//! openai = "sk-..."
//! claude = "sk-ant-..."
//! ```
//!
//! Environment variables take precedence over the file so keys never have to
//! touch disk: `GROQ_API_KEY`, `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`.
//! Empty values count as absent.  Secret values are never logged.

use std::collections::HashMap;
use std::path::Path;

use crate::config::AppPaths;

// ---------------------------------------------------------------------------
// CredentialStore trait
// ---------------------------------------------------------------------------

/// Read-only lookup of per-provider API keys.
///
/// Shared as `Arc<dyn CredentialStore>` between the STT client and the
/// refinement backends, which resolve their key on every request so an
/// exported environment variable is picked up without a restart.
pub trait CredentialStore: Send + Sync {
    /// The secret configured for `provider` (`"groq"`, `"openai"`,
    /// `"claude"`), or `None` when nothing is configured.
    fn secret(&self, provider: &str) -> Option<String>;
}

// ---------------------------------------------------------------------------
// FileCredentialStore
// ---------------------------------------------------------------------------

/// [`CredentialStore`] backed by `credentials.toml` with environment
/// variable overrides.
///
/// The file is read once at construction; a missing or unparsable file
/// degrades to an empty store (the affected providers then fail with a
/// missing-credential error at request time rather than at startup).
pub struct FileCredentialStore {
    keys: HashMap<String, String>,
}

/// Environment variable consulted before the file for each provider id.
fn env_override_for(provider: &str) -> Option<&'static str> {
    match provider {
        "groq" => Some("GROQ_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        "claude" => Some("ANTHROPIC_API_KEY"),
        _ => None,
    }
}

impl FileCredentialStore {
    /// Load from the platform-appropriate `credentials.toml`.
    pub fn new() -> Self {
        Self::from_path(&AppPaths::new().credentials_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn from_path(path: &Path) -> Self {
        let keys = match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<HashMap<String, String>>(&content) {
                Ok(keys) => keys,
                Err(e) => {
                    log::warn!(
                        "Credentials: {} is not a flat string table ({}), ignoring it",
                        path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(_) => {
                // First run, or keys supplied purely via environment.
                log::debug!("Credentials: no file at {}", path.display());
                HashMap::new()
            }
        };

        if !keys.is_empty() {
            let mut providers: Vec<&str> = keys.keys().map(String::as_str).collect();
            providers.sort_unstable();
            log::info!("Credentials: loaded keys for {}", providers.join(", "));
        }

        Self { keys }
    }
}

impl Default for FileCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for FileCredentialStore {
    fn secret(&self, provider: &str) -> Option<String> {
        let from_env = env_override_for(provider)
            .and_then(|name| std::env::var(name).ok())
            .filter(|value| !value.is_empty());

        from_env.or_else(|| {
            self.keys
                .get(provider)
                .filter(|value| !value.is_empty())
                .cloned()
        })
    }
}

// ---------------------------------------------------------------------------
// StaticCredentials (tests)
// ---------------------------------------------------------------------------

/// In-memory [`CredentialStore`] for tests — no file, no environment.
#[cfg(test)]
pub struct StaticCredentials {
    keys: HashMap<String, String>,
}

#[cfg(test)]
impl StaticCredentials {
    /// A store with no keys at all.
    pub fn empty() -> Self {
        Self {
            keys: HashMap::new(),
        }
    }

    /// A store holding exactly one `provider = secret` entry.
    pub fn with(provider: &str, secret: &str) -> Self {
        let mut keys = HashMap::new();
        keys.insert(provider.to_string(), secret.to_string());
        Self { keys }
    }
}

#[cfg(test)]
impl CredentialStore for StaticCredentials {
    fn secret(&self, provider: &str) -> Option<String> {
        self.keys.get(provider).cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
