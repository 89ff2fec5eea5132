use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use tracing::warn;

use crate::api::types::normalize_clock_time;
use crate::cache::KeyValueStorage;
use crate::error::ApiError;

const SETTINGS_NAMESPACE: &str = "settings-storage";
const SETTINGS_KEY: &str = "settings";

pub const MIN_CARDS_PER_SESSION: u32 = 1;
pub const MAX_CARDS_PER_SESSION: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
  Light,
  Dark,
  #[default]
  Auto,
}

impl fmt::Display for Theme {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Theme::Light => "light",
      Theme::Dark => "dark",
      Theme::Auto => "auto",
    };
    f.write_str(name)
  }
}

impl FromStr for Theme {
  type Err = ApiError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "light" => Ok(Theme::Light),
      "dark" => Ok(Theme::Dark),
      "auto" | "system" => Ok(Theme::Auto),
      other => Err(ApiError::validation(format!(
        "Unknown theme '{}' (light, dark or auto)",
        other
      ))),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
  pub theme: Theme,
  pub notifications_enabled: bool,
  pub daily_reminder_time: String,
  pub cards_per_session: u32,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      theme: Theme::Auto,
      notifications_enabled: true,
      daily_reminder_time: "09:00".to_string(),
      cards_per_session: 10,
    }
  }
}

impl Settings {
  /// Normalizes the reminder time and range-checks the session size.
  pub fn validated(mut self) -> Result<Self, ApiError> {
    self.daily_reminder_time = normalize_clock_time(&self.daily_reminder_time)?;
    if !(MIN_CARDS_PER_SESSION..=MAX_CARDS_PER_SESSION).contains(&self.cards_per_session) {
      return Err(ApiError::validation(format!(
        "Cards per session must be between {} and {}",
        MIN_CARDS_PER_SESSION, MAX_CARDS_PER_SESSION
      )));
    }
    Ok(self)
  }
}

/// Local preferences, changed directly by the user and never synced.
#[derive(Clone)]
pub struct SettingsStore {
  current: Arc<RwLock<Settings>>,
  storage: Arc<dyn KeyValueStorage>,
}

impl SettingsStore {
  pub fn restore(storage: Arc<dyn KeyValueStorage>) -> Self {
    let settings = match storage.get::<Settings>(SETTINGS_NAMESPACE, SETTINGS_KEY) {
      Ok(Some(stored)) => stored.validated().unwrap_or_else(|e| {
        warn!(error = %e, "persisted settings out of range, using defaults");
        Settings::default()
      }),
      Ok(None) => Settings::default(),
      Err(e) => {
        warn!(error = %e, "failed to load settings");
        Settings::default()
      }
    };
    Self {
      current: Arc::new(RwLock::new(settings)),
      storage,
    }
  }

  pub fn get(&self) -> Settings {
    self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
  }

  /// Apply a change; the stored record is untouched if the result is invalid.
  pub fn update(&self, f: impl FnOnce(&mut Settings)) -> Result<Settings, ApiError> {
    let mut next = self.get();
    f(&mut next);
    let next = next.validated()?;
    *self.current.write().unwrap_or_else(|e| e.into_inner()) = next.clone();
    if let Err(e) = self.storage.put(SETTINGS_NAMESPACE, SETTINGS_KEY, &next) {
      warn!(error = %e, "failed to persist settings");
    }
    Ok(next)
  }

  pub fn reset(&self) -> Settings {
    *self.current.write().unwrap_or_else(|e| e.into_inner()) = Settings::default();
    if let Err(e) = self.storage.remove(SETTINGS_NAMESPACE, SETTINGS_KEY) {
      warn!(error = %e, "failed to clear settings");
    }
    Settings::default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStorage;

  #[test]
  fn test_defaults() {
    let settings = Settings::default();
    assert_eq!(settings.theme, Theme::Auto);
    assert!(settings.notifications_enabled);
    assert_eq!(settings.daily_reminder_time, "09:00");
    assert_eq!(settings.cards_per_session, 10);
  }

  #[test]
  fn test_update_validates_and_persists() {
    let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
    let store = SettingsStore::restore(Arc::clone(&storage));

    let updated = store
      .update(|s| {
        s.theme = Theme::Dark;
        s.daily_reminder_time = "7:5".into();
      })
      .unwrap();
    assert_eq!(updated.daily_reminder_time, "07:05");

    let err = store.update(|s| s.cards_per_session = 0).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(store.get().cards_per_session, 10);

    let restored = SettingsStore::restore(storage);
    assert_eq!(restored.get().theme, Theme::Dark);
    assert_eq!(restored.get().daily_reminder_time, "07:05");
  }

  #[test]
  fn test_theme_parse() {
    assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
    assert_eq!("system".parse::<Theme>().unwrap(), Theme::Auto);
    assert!("neon".parse::<Theme>().is_err());
    assert_eq!(Theme::Light.to_string(), "light");
  }

  #[test]
  fn test_out_of_range_storage_falls_back() {
    let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
    storage
      .put_raw(SETTINGS_NAMESPACE, SETTINGS_KEY, r#"{"cardsPerSession":500}"#)
      .unwrap();
    assert_eq!(SettingsStore::restore(storage).get(), Settings::default());
  }
}
