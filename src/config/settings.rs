//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and snapshotted per
//! transcription cycle.  API keys live separately in
//! [`credentials.toml`](crate::credentials).

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

/// Language codes offered for transcription, `"auto"` first.
pub const SUPPORTED_LANGUAGES: [&str; 5] = ["auto", "zh", "en", "ja", "ko"];

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the remote Whisper transcription service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// Expected speech language as an ISO-639-1 code, or `"auto"` to let
    /// Whisper detect the language itself.
    pub language: String,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            language: "zh".into(),
        }
    }
}

impl SttConfig {
    /// The language hint to send upstream — `None` for `"auto"`, which
    /// omits the field so the service runs its own detection.
    pub fn language_param(&self) -> Option<&str> {
        if self.language == "auto" {
            None
        } else {
            Some(&self.language)
        }
    }
}

// ---------------------------------------------------------------------------
// RefineConfig
// ---------------------------------------------------------------------------

/// Settings for the LLM refinement step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineConfig {
    /// Backend id: `"groq"`, `"openai"` or `"claude"`.  Unknown ids fall
    /// back to the registry default at cycle time.
    pub provider: String,
    /// Domain terms appended to the system prompt as a custom dictionary.
    pub glossary: Vec<String>,
    /// Free-form extra instructions appended after the dictionary.
    pub extra_rules: String,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            provider: "groq".into(),
            glossary: Vec::new(),
            extra_rules: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// DeliveryConfig
// ---------------------------------------------------------------------------

/// Settings for delivering the finished text to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Paste the result into the focused application (clipboard + paste
    /// keystroke).  When off, the text is only logged and recorded.
    pub auto_paste: bool,
    /// Play audible cues on record start/stop and cycle completion/failure.
    pub sound_cues: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            auto_paste: true,
            sound_cues: true,
        }
    }
}

// ---------------------------------------------------------------------------
// HotkeyConfig
// ---------------------------------------------------------------------------

/// Global hotkey binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotkeyConfig {
    /// Toggle key name (e.g. `"F9"`).  One press starts recording, the
    /// next stops it.
    pub toggle_key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            toggle_key: "F9".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voxscribe::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote transcription settings.
    pub stt: SttConfig,
    /// LLM refinement settings.
    pub refine: RefineConfig,
    /// Text delivery / feedback settings.
    pub delivery: DeliveryConfig,
    /// Global hotkey binding.
    pub hotkey: HotkeyConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
