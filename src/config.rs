use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Backend base URL used when neither the config file nor the environment sets one.
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub suggestions: SuggestionsConfig,
  #[serde(default)]
  pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  /// 401 messages that indicate a backend fault rather than an expired session
  /// (matched case-insensitively as substrings).
  #[serde(default = "default_transient_401_messages")]
  pub transient_401_messages: Vec<String>,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      timeout_secs: default_timeout_secs(),
      transient_401_messages: default_transient_401_messages(),
    }
  }
}

impl ApiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default = "default_stale_secs")]
  pub stale_secs: u64,
  #[serde(default = "default_gc_secs")]
  pub gc_secs: u64,
  /// Notification history goes stale much faster than cards.
  #[serde(default = "default_history_stale_secs")]
  pub history_stale_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_secs: default_stale_secs(),
      gc_secs: default_gc_secs(),
      history_stale_secs: default_history_stale_secs(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionsConfig {
  #[serde(default = "default_debounce_ms")]
  pub debounce_ms: u64,
  #[serde(default = "default_suggestion_limit")]
  pub limit: u32,
}

impl Default for SuggestionsConfig {
  fn default() -> Self {
    Self {
      debounce_ms: default_debounce_ms(),
      limit: default_suggestion_limit(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
  /// SQLite file for persisted session, cards and settings.
  pub path: Option<PathBuf>,
}

fn default_base_url() -> String {
  DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
  10
}

fn default_transient_401_messages() -> Vec<String> {
  vec!["User identity not found".to_string()]
}

fn default_stale_secs() -> u64 {
  5 * 60
}

fn default_gc_secs() -> u64 {
  10 * 60
}

fn default_history_stale_secs() -> u64 {
  30
}

fn default_debounce_ms() -> u64 {
  500
}

fn default_suggestion_limit() -> u32 {
  10
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./flashdeck.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/flashdeck/config.yaml
  ///
  /// Unlike an explicit path, a missing default file is not an error.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    Ok(config.with_env_overrides())
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("flashdeck.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("flashdeck").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty file deserializes to unit, not to a mapping.
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(contents)?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    url::Url::parse(&self.api.base_url)
      .map_err(|e| eyre!("Invalid api.base_url '{}': {}", self.api.base_url, e))?;
    if self.api.timeout_secs == 0 {
      return Err(eyre!("api.timeout_secs must be greater than zero"));
    }
    if self.cache.gc_secs < self.cache.stale_secs {
      return Err(eyre!("cache.gc_secs must not be shorter than cache.stale_secs"));
    }
    Ok(())
  }

  /// `FLASHDECK_API_URL` replaces the configured base URL.
  fn with_env_overrides(mut self) -> Self {
    if let Ok(url) = std::env::var("FLASHDECK_API_URL") {
      if !url.trim().is_empty() {
        self.api.base_url = url;
      }
    }
    self
  }

  /// Where persisted state lives when the config does not say.
  pub fn storage_path(&self) -> Result<PathBuf> {
    if let Some(path) = &self.storage.path {
      return Ok(path.clone());
    }
    Ok(data_dir()?.join("state.db"))
  }
}

/// `<data_dir>/flashdeck`, falling back to `~/.local/share/flashdeck`.
pub fn data_dir() -> Result<PathBuf> {
  let base = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;
  Ok(base.join("flashdeck"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_file_uses_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.api.base_url, DEFAULT_API_URL);
    assert_eq!(config.api.timeout(), Duration::from_secs(10));
    assert_eq!(config.cache.stale_secs, 300);
    assert_eq!(config.cache.gc_secs, 600);
    assert_eq!(
      config.api.transient_401_messages,
      vec!["User identity not found".to_string()]
    );
  }

  #[test]
  fn test_partial_file_keeps_other_defaults() {
    let yaml = r#"
api:
  base_url: https://cards.example.com/api
suggestions:
  debounce_ms: 250
"#;
    let config = Config::parse(yaml).unwrap();
    assert_eq!(config.api.base_url, "https://cards.example.com/api");
    assert_eq!(config.api.timeout_secs, 10);
    assert_eq!(config.suggestions.debounce_ms, 250);
    assert_eq!(config.suggestions.limit, 10);
  }

  #[test]
  fn test_invalid_base_url_is_rejected() {
    assert!(Config::parse("api:\n  base_url: not a url\n").is_err());
  }

  #[test]
  fn test_gc_shorter_than_stale_is_rejected() {
    assert!(Config::parse("cache:\n  stale_secs: 60\n  gc_secs: 30\n").is_err());
  }
}
