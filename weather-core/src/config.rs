use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const FALLBACK_CITY: &str = "Colombo";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// default_city = "Colombo"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub api_key: Option<String>,

    /// City requested when the dashboard starts without one.
    pub default_city: Option<String>,

    /// Override for the provider endpoint, mostly useful for proxies.
    pub base_url: Option<String>,
}

impl Config {
    /// Load config from the platform config dir, or an empty default on first run.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Write as TOML, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-dashboard", "weather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// API key from `OPENWEATHER_API_KEY`, falling back to the stored one.
    pub fn api_key(&self) -> Result<String> {
        self.resolve_api_key(std::env::var(API_KEY_ENV).ok())
    }

    fn resolve_api_key(&self, from_env: Option<String>) -> Result<String> {
        from_env
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|key| !key.trim().is_empty()))
            .ok_or_else(|| {
                anyhow!(
                    "No OpenWeather API key configured.\n\
                     Hint: run `weather configure` or set {API_KEY_ENV}."
                )
            })
    }

    pub fn default_city(&self) -> &str {
        self.default_city
            .as_deref()
            .filter(|city| !city.trim().is_empty())
            .unwrap_or(FALLBACK_CITY)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_errors_when_not_set() {
        let cfg = Config::default();
        let err = cfg.resolve_api_key(None).unwrap_err();

        assert!(err.to_string().contains("No OpenWeather API key configured"));
        assert!(err.to_string().contains("weather configure"));
    }

    #[test]
    fn env_key_overrides_stored_key() {
        let cfg = Config {
            api_key: Some("STORED".into()),
            ..Config::default()
        };

        assert_eq!(cfg.resolve_api_key(Some("ENV".into())).unwrap(), "ENV");
        assert_eq!(cfg.resolve_api_key(None).unwrap(), "STORED");
        assert_eq!(cfg.resolve_api_key(Some("  ".into())).unwrap(), "STORED");
    }

    #[test]
    fn defaults_apply_when_fields_missing() {
        let cfg = Config::default();

        assert_eq!(cfg.default_city(), FALLBACK_CITY);
        assert_eq!(cfg.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn parses_toml() {
        let cfg = Config::from_toml(
            r#"
            api_key = "KEY"
            default_city = "Kandy"
            "#,
        )
        .expect("valid config");

        assert_eq!(cfg.api_key.as_deref(), Some("KEY"));
        assert_eq!(cfg.default_city(), "Kandy");
        assert_eq!(cfg.base_url, None);
    }

    #[test]
    fn toml_roundtrip_preserves_fields() {
        let cfg = Config {
            api_key: Some("KEY".into()),
            default_city: Some("Galle".into()),
            base_url: Some("http://localhost:9000".into()),
        };

        let text = toml::to_string_pretty(&cfg).unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), cfg);
    }

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("weather-config-{}-{name}", std::process::id()))
            .join("config.toml")
    }

    #[test]
    fn save_then_load_from_disk() {
        let path = scratch_path("roundtrip");
        let cfg = Config {
            api_key: Some("KEY".into()),
            default_city: Some("Jaffna".into()),
            base_url: None,
        };

        cfg.save_to(&path).expect("config saved");
        let loaded = Config::load_from(&path).expect("config loaded");
        let _ = fs::remove_dir_all(path.parent().unwrap());

        assert_eq!(loaded, cfg);
    }

    #[test]
    fn load_from_missing_file_is_default() {
        let path = scratch_path("missing");

        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }

    #[test]
    fn load_from_reports_bad_toml() {
        let path = scratch_path("broken");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "api_key = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        let _ = fs::remove_dir_all(path.parent().unwrap());

        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
