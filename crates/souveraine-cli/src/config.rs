//! Configuration file support

use serde::{Deserialize, Serialize};
use souveraine_api::{GatewayConfig, http::DEFAULT_BASE_URL};
use souveraine_core::{Category, Language, ThemePreference, status::DEFAULT_STATUS_INTERVAL};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the backend base URL
pub const BASE_URL_ENV: &str = "SOUVERAINE_API_BASE_URL";

/// Configuration for souveraine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL
    pub base_url: Option<String>,
    /// Default category id (general, agriculture, sante, ...)
    pub category: Option<String>,
    /// Default language code (fr, mo, di)
    pub language: Option<String>,
    /// Whether to use TUI mode by default
    pub tui: Option<bool>,
    /// Theme used when none has been persisted yet
    pub theme: Option<String>,
    /// Where conversations and session data are stored
    pub data_dir: Option<PathBuf>,
    /// Seconds between two liveness probes
    pub status_interval_secs: Option<u64>,
    #[serde(default)]
    pub timeouts: Timeouts,
}

/// Per-request time budgets, in seconds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub status_secs: Option<u64>,
    pub chat_secs: Option<u64>,
    pub upload_secs: Option<u64>,
}

impl Config {
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("souveraine")
    }

    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SOUVERAINE_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, falling back to defaults on any failure
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), "failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            category: Some(Category::General.id().to_string()),
            language: Some(Language::Fr.code().to_string()),
            tui: Some(true),
            theme: Some(ThemePreference::Dark.as_str().to_string()),
            data_dir: None,
            status_interval_secs: Some(DEFAULT_STATUS_INTERVAL.as_secs()),
            timeouts: Timeouts::default(),
        };

        default_config.save_to(&path)?;
        Ok(path)
    }

    /// Base URL, with `SOUVERAINE_API_BASE_URL` taking precedence
    pub fn base_url(&self) -> String {
        self.base_url_with_env(std::env::var(BASE_URL_ENV).ok())
    }

    fn base_url_with_env(&self, env: Option<String>) -> String {
        env.filter(|s| !s.trim().is_empty())
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn category(&self) -> Category {
        self.category
            .as_deref()
            .and_then(Category::parse)
            .unwrap_or_default()
    }

    pub fn language(&self) -> Language {
        self.language
            .as_deref()
            .and_then(Language::parse)
            .unwrap_or_default()
    }

    pub fn theme(&self) -> Option<ThemePreference> {
        self.theme.as_deref().and_then(ThemePreference::parse)
    }

    pub fn status_interval(&self) -> Duration {
        self.status_interval_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_STATUS_INTERVAL)
    }

    /// Gateway configuration for `base_url`, applying configured timeouts
    pub fn gateway_config(&self, base_url: String) -> GatewayConfig {
        let defaults = GatewayConfig::default();
        let secs = |v: Option<u64>, fallback: Duration| v.map(Duration::from_secs).unwrap_or(fallback);
        GatewayConfig {
            base_url,
            status_timeout: secs(self.timeouts.status_secs, defaults.status_timeout),
            chat_timeout: secs(self.timeouts.chat_secs, defaults.chat_timeout),
            upload_timeout: secs(self.timeouts.upload_secs, defaults.upload_timeout),
            endpoints: defaults.endpoints,
        }
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# souveraine configuration file
# Place at ~/.config/souveraine/config.toml (Linux) or set SOUVERAINE_CONFIG_PATH

# Backend base URL (SOUVERAINE_API_BASE_URL overrides it)
base_url = "http://localhost:8000"

# Default category: general, agriculture, sante, education, culture,
# technologie, economie, droit
category = "general"

# Default language: fr, mo (Mooré), di (Dioula)
language = "fr"

# Whether to use TUI mode by default
tui = true

# Theme used until one is chosen in the app (dark, light)
theme = "dark"

# Where conversations are stored (defaults to the user data directory)
# data_dir = "/home/me/.local/share/souveraine"

# Seconds between backend liveness checks
status_interval_secs = 30

[timeouts]
# status_secs = 5
# chat_secs = 60
# upload_secs = 30
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml"));
        assert!(config.base_url.is_none());
        assert_eq!(config.category(), Category::General);
        assert_eq!(config.language(), Language::Fr);
        assert_eq!(config.status_interval(), DEFAULT_STATUS_INTERVAL);
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "base_url = [not toml").unwrap();
        let config = Config::load_from(&path);
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:8000"));
        assert_eq!(config.language(), Language::Fr);
        assert_eq!(config.theme(), Some(ThemePreference::Dark));
        assert_eq!(config.tui, Some(true));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            category: Some("sante".into()),
            language: Some("mo".into()),
            timeouts: Timeouts {
                chat_secs: Some(90),
                ..Default::default()
            },
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded.category(), Category::Health);
        assert_eq!(loaded.language(), Language::Moore);
        assert_eq!(loaded.timeouts.chat_secs, Some(90));
    }

    #[test]
    fn test_env_overrides_base_url() {
        let config = Config {
            base_url: Some("http://config:8000".into()),
            ..Default::default()
        };
        assert_eq!(
            config.base_url_with_env(Some("http://env:9000".into())),
            "http://env:9000"
        );
        assert_eq!(config.base_url_with_env(Some("  ".into())), "http://config:8000");
        assert_eq!(Config::default().base_url_with_env(None), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_gateway_config_applies_timeouts() {
        let config = Config {
            timeouts: Timeouts {
                status_secs: Some(2),
                ..Default::default()
            },
            ..Default::default()
        };
        let gateway = config.gateway_config("http://localhost:8000".into());
        assert_eq!(gateway.status_timeout, Duration::from_secs(2));
        assert_eq!(gateway.chat_timeout, GatewayConfig::default().chat_timeout);
    }
}
