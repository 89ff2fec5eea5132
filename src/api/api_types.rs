//! Serde types matching the backend's JSON.
//!
//! These are separate from domain types to keep backend naming (`_id`,
//! `dailyReminder`, `reminderTime`) at the boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{
  normalize_clock_time, DictionaryEntry, Flashcard, NotificationPreferences, UploadedFile, User,
};
use crate::error::ApiError;

/// Wrapper used by every response.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
  #[serde(default)]
  pub success: bool,
  pub data: Option<T>,
  #[serde(default)]
  pub message: Option<String>,
}

impl<T> Envelope<T> {
  /// The payload, or a server error carrying the envelope's message.
  pub fn into_data(self) -> Result<T, ApiError> {
    if !self.success {
      return Err(ApiError::Server {
        status: None,
        message: self.message,
      });
    }
    self
      .data
      .ok_or_else(|| ApiError::Decode("response carried no data".to_string()))
  }
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiUser {
  #[serde(rename = "_id", alias = "id")]
  pub id: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub avatar: Option<String>,
  /// Present only when the backend issues bearer tokens.
  #[serde(default)]
  pub token: Option<String>,
}

impl From<ApiUser> for User {
  fn from(api: ApiUser) -> Self {
    User {
      id: api.id,
      email: api.email,
      name: api.name,
      avatar: api.avatar,
    }
  }
}

/// `/auth/me` and `/auth/profile` wrap the user in some backend versions.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiUserPayload {
  Wrapped { user: ApiUser },
  Bare(ApiUser),
}

impl ApiUserPayload {
  pub fn into_user(self) -> ApiUser {
    match self {
      Self::Wrapped { user } => user,
      Self::Bare(user) => user,
    }
  }
}

/// Login/register payload: either `{user, token}` or the user with the token inline.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiAuthPayload {
  Wrapped {
    user: ApiUser,
    #[serde(default)]
    token: Option<String>,
  },
  Bare(ApiUser),
}

impl ApiAuthPayload {
  /// The identity plus the bearer token, if the backend issued one.
  pub fn into_parts(self) -> (User, Option<String>) {
    let (user, token) = match self {
      Self::Wrapped { mut user, token } => {
        let token = token.or_else(|| user.token.take());
        (user, token)
      }
      Self::Bare(mut user) => {
        let token = user.token.take();
        (user, token)
      }
    };
    (user.into(), token.filter(|t| !t.is_empty()))
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiForgotPassword {
  #[serde(default)]
  pub reset_token: Option<String>,
}

// ============================================================================
// Flashcards
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFlashcard {
  #[serde(rename = "_id", alias = "id")]
  pub id: String,
  #[serde(default)]
  pub word: String,
  #[serde(default)]
  pub meaning: String,
  #[serde(default)]
  pub example: Option<String>,
  #[serde(default)]
  pub image_url: Option<String>,
  #[serde(default)]
  pub audio_url: Option<String>,
  #[serde(default)]
  pub is_favorite: Option<bool>,
  /// Owner id, or the populated owner document.
  #[serde(default, alias = "userId", alias = "owner")]
  pub user: Option<Value>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub updated_at: Option<DateTime<Utc>>,
}

impl From<ApiFlashcard> for Flashcard {
  fn from(api: ApiFlashcard) -> Self {
    let owner_id = match api.user {
      Some(Value::String(id)) => Some(id),
      Some(Value::Object(map)) => map
        .get("_id")
        .or_else(|| map.get("id"))
        .and_then(Value::as_str)
        .map(String::from),
      _ => None,
    };
    Flashcard {
      id: api.id,
      word: api.word,
      meaning: api.meaning,
      example: api.example,
      image_url: api.image_url,
      audio_url: api.audio_url,
      is_favorite: api.is_favorite.unwrap_or(false),
      owner_id,
      created_at: api.created_at,
      updated_at: api.updated_at,
    }
  }
}

/// Suggestions arrive as `{suggestions: [...]}` or as a bare list of words.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiSuggestions {
  Wrapped { suggestions: Vec<String> },
  List(Vec<String>),
}

impl ApiSuggestions {
  pub fn into_words(self) -> Vec<String> {
    match self {
      Self::Wrapped { suggestions } => suggestions,
      Self::List(words) => words,
    }
  }
}

/// Dictionary lookups may return every matching entry; the first one wins.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiDictionary {
  List(Vec<DictionaryEntry>),
  Entry(DictionaryEntry),
}

impl ApiDictionary {
  pub fn into_entry(self) -> Option<DictionaryEntry> {
    match self {
      Self::List(entries) => entries.into_iter().next(),
      Self::Entry(entry) => Some(entry),
    }
  }
}

// ============================================================================
// Notifications
// ============================================================================

/// Preferences as the backend names them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiNotificationPreferences {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub push: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sms: Option<bool>,
  #[serde(default)]
  pub daily_reminder: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reminder_time: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub types: Option<Value>,
}

impl ApiNotificationPreferences {
  /// Outbound rename; the reminder time is normalized to `HH:mm`.
  pub fn from_client(prefs: &NotificationPreferences) -> Result<Self, ApiError> {
    let reminder_time = prefs
      .daily_reminder_time
      .as_deref()
      .map(normalize_clock_time)
      .transpose()?;
    Ok(Self {
      email: prefs.email,
      push: prefs.push,
      sms: prefs.sms,
      daily_reminder: prefs.enabled,
      reminder_time,
      types: prefs.types.clone(),
    })
  }

  /// Inbound rename. A malformed time from the server is passed through as-is.
  pub fn into_client(self) -> NotificationPreferences {
    let daily_reminder_time = self
      .reminder_time
      .map(|t| normalize_clock_time(&t).unwrap_or(t));
    NotificationPreferences {
      email: self.email,
      push: self.push,
      sms: self.sms,
      enabled: self.daily_reminder,
      daily_reminder_time,
      types: self.types,
    }
  }
}

/// `/upload/files` answers with `{files: [...]}` or a bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiUploadedFiles {
  Wrapped { files: Vec<UploadedFile> },
  List(Vec<UploadedFile>),
}

impl ApiUploadedFiles {
  pub fn into_files(self) -> Vec<UploadedFile> {
    match self {
      Self::Wrapped { files } => files,
      Self::List(files) => files,
    }
  }
}
