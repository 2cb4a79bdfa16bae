//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout (config dir — settings, credentials, history):
//!   Windows: %APPDATA%\voxscribe\
//!   macOS:   ~/Library/Application Support/voxscribe/
//!   Linux:   ~/.config/voxscribe/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`, `credentials.toml` and `history.jsonl`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Full path to `credentials.toml` (per-provider API keys).
    pub credentials_file: PathBuf,
    /// Full path to `history.jsonl` (one transcription outcome per line).
    pub history_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "voxscribe";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path (should be extremely rare in practice).
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let credentials_file = config_dir.join("credentials.toml");
        let history_file = config_dir.join("history.jsonl");

        Self {
            config_dir,
            settings_file,
            credentials_file,
            history_file,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.toml"));
        assert!(paths
            .credentials_file
            .file_name()
            .is_some_and(|n| n == "credentials.toml"));
        assert!(paths
            .history_file
            .file_name()
            .is_some_and(|n| n == "history.jsonl"));
    }

    #[test]
    fn all_files_live_under_the_config_dir() {
        let paths = AppPaths::new();
        assert!(paths.settings_file.starts_with(&paths.config_dir));
        assert!(paths.credentials_file.starts_with(&paths.config_dir));
        assert!(paths.history_file.starts_with(&paths.config_dir));
    }
}
