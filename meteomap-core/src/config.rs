use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::model::Language;

/// Environment variable that takes precedence over the stored API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Base URLs of the external collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub geocode_url: String,
    pub ip_url: String,
    pub weather_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            geocode_url: "https://nominatim.openstreetmap.org".to_string(),
            ip_url: "http://ip-api.com".to_string(),
            weather_url: "https://api.openweathermap.org".to_string(),
        }
    }
}

/// Per-collaborator request timeouts, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub geocode_secs: u64,
    pub ip_secs: u64,
    pub weather_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { geocode_secs: 10, ip_secs: 8, weather_secs: 10 }
    }
}

impl Timeouts {
    pub fn geocode(&self) -> Duration {
        Duration::from_secs(self.geocode_secs)
    }

    pub fn ip(&self) -> Duration {
        Duration::from_secs(self.ip_secs)
    }

    pub fn weather(&self) -> Duration {
        Duration::from_secs(self.weather_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Pause before answering, so the reply does not appear instantly.
    pub thinking_delay_ms: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self { thinking_delay_ms: 500 }
    }
}

impl AssistantConfig {
    pub fn thinking_delay(&self) -> Duration {
        Duration::from_millis(self.thinking_delay_ms)
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// language = "uk"
/// api_key = "..."
/// backgrounds_dir = "/home/me/backgrounds"
///
/// [timeouts]
/// geocode_secs = 10
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub language: Language,
    pub api_key: Option<String>,
    pub backgrounds_dir: Option<PathBuf>,
    pub endpoints: Endpoints,
    pub timeouts: Timeouts,
    pub assistant: AssistantConfig,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid configuration TOML")
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "meteomap", "meteomap")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// API key from the environment or the config file, in that order.
    pub fn api_key(&self) -> Result<String> {
        self.api_key_with_env(std::env::var(API_KEY_ENV).ok())
    }

    fn api_key_with_env(&self, env_value: Option<String>) -> Result<String> {
        env_value
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|key| !key.trim().is_empty()))
            .ok_or_else(|| {
                anyhow!(
                    "No OpenWeather API key configured.\n\
                     Hint: run `meteomap configure` or set {API_KEY_ENV}."
                )
            })
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key.trim().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_has_hint() {
        let cfg = Config::default();
        let err = cfg.api_key_with_env(None).unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("No OpenWeather API key configured"));
        assert!(msg.contains("meteomap configure"));
    }

    #[test]
    fn env_key_overrides_stored_key() {
        let mut cfg = Config::default();
        cfg.set_api_key("STORED".into());

        assert_eq!(cfg.api_key_with_env(Some("FROM_ENV".into())).unwrap(), "FROM_ENV");
        assert_eq!(cfg.api_key_with_env(Some("  ".into())).unwrap(), "STORED");
        assert_eq!(cfg.api_key_with_env(None).unwrap(), "STORED");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg = Config::from_toml(
            r#"
            language = "uk"

            [timeouts]
            geocode_secs = 3
            "#,
        )
        .expect("config should parse");

        assert_eq!(cfg.language, Language::Uk);
        assert_eq!(cfg.timeouts.geocode(), Duration::from_secs(3));
        assert_eq!(cfg.timeouts.weather(), Duration::from_secs(10));
        assert_eq!(cfg.assistant.thinking_delay(), Duration::from_millis(500));
        assert_eq!(cfg.endpoints, Endpoints::default());
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let mut cfg = Config { language: Language::Uk, ..Config::default() };
        cfg.set_api_key("KEY".into());

        let text = toml::to_string_pretty(&cfg).expect("serialize");
        assert_eq!(Config::from_toml(&text).expect("parse"), cfg);
    }
}
