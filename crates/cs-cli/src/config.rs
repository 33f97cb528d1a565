//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration. Command-line flags take precedence over
/// anything loaded here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// IANA timezone the analysis localizes into.
    pub timezone: String,

    /// Follow-up stitch window in seconds.
    pub stitch_window_seconds: i64,

    /// Maximum characters kept in the events.csv text excerpt.
    pub text_trunc_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        let defaults = cs_core::AnalyzeConfig::default();
        Self {
            timezone: defaults.timezone.name().to_string(),
            stitch_window_seconds: defaults.stitch_window_seconds,
            text_trunc_len: defaults.text_trunc_len,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("CS_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for checkstats.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("checkstats"))
}
