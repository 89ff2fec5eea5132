//! Domain types, in the shape the rest of the client works with.
//!
//! Wire formats live in `api_types`; these are what stores persist and
//! queries cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cache::Cacheable;
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id: String,
  pub email: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
  pub id: String,
  pub word: String,
  pub meaning: String,
  #[serde(default)]
  pub example: Option<String>,
  #[serde(default)]
  pub image_url: Option<String>,
  #[serde(default)]
  pub audio_url: Option<String>,
  #[serde(default)]
  pub is_favorite: bool,
  #[serde(default)]
  pub owner_id: Option<String>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub updated_at: Option<DateTime<Utc>>,
}

impl Cacheable for Flashcard {
  fn cache_key(&self) -> &str {
    &self.id
  }

  fn updated_at(&self) -> Option<DateTime<Utc>> {
    self.updated_at
  }
}

/// Body of a create request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFlashcard {
  pub word: String,
  pub meaning: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub example: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub audio_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_favorite: Option<bool>,
}

impl NewFlashcard {
  pub fn new(word: impl Into<String>, meaning: impl Into<String>) -> Self {
    Self {
      word: word.into(),
      meaning: meaning.into(),
      ..Default::default()
    }
  }

  /// Trims text fields and rejects a card without a word or meaning.
  pub fn validated(mut self) -> Result<Self, ApiError> {
    self.word = self.word.trim().to_string();
    self.meaning = self.meaning.trim().to_string();
    if self.word.is_empty() {
      return Err(ApiError::validation("Word is required"));
    }
    if self.meaning.is_empty() {
      return Err(ApiError::validation("Meaning is required"));
    }
    self.example = non_blank(self.example);
    self.image_url = non_blank(self.image_url);
    self.audio_url = non_blank(self.audio_url);
    Ok(self)
  }
}

/// Partial update; only present fields are sent, the server merges the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub word: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub meaning: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub example: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub audio_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_favorite: Option<bool>,
}

impl FlashcardPatch {
  pub fn is_empty(&self) -> bool {
    *self == Self::default()
  }

  /// A patch may omit word and meaning, but must not blank them.
  pub fn validated(mut self) -> Result<Self, ApiError> {
    if let Some(word) = self.word.as_mut() {
      *word = word.trim().to_string();
      if word.is_empty() {
        return Err(ApiError::validation("Word is required"));
      }
    }
    if let Some(meaning) = self.meaning.as_mut() {
      *meaning = meaning.trim().to_string();
      if meaning.is_empty() {
        return Err(ApiError::validation("Meaning is required"));
      }
    }
    if self.is_empty() {
      return Err(ApiError::validation("Nothing to update"));
    }
    Ok(self)
  }
}

fn non_blank(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
}

/// Server-side filters for the card list; each combination is cached separately.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CardFilter {
  pub search: Option<String>,
  pub favorites_only: bool,
}

impl CardFilter {
  pub fn is_empty(&self) -> bool {
    self.search.as_deref().map_or(true, |s| s.trim().is_empty()) && !self.favorites_only
  }

  pub fn pairs(&self) -> [(&'static str, Option<String>); 2] {
    [
      (
        "search",
        self
          .search
          .as_deref()
          .map(str::trim)
          .filter(|s| !s.is_empty())
          .map(String::from),
      ),
      ("favorite", self.favorites_only.then(|| "true".to_string())),
    ]
  }

  pub fn to_query(&self) -> Vec<(&'static str, String)> {
    self
      .pairs()
      .into_iter()
      .filter_map(|(k, v)| v.map(|v| (k, v)))
      .collect()
  }

  /// Local approximation of the server filter, used when serving offline.
  pub fn matches(&self, card: &Flashcard) -> bool {
    if self.favorites_only && !card.is_favorite {
      return false;
    }
    match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
      Some(needle) => {
        let needle = needle.to_lowercase();
        card.word.to_lowercase().contains(&needle) || card.meaning.to_lowercase().contains(&needle)
      }
      None => true,
    }
  }
}

/// A card being composed locally, possibly with media not uploaded yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlashcardDraft {
  pub word: String,
  pub meaning: String,
  pub example: Option<String>,
  pub image_url: Option<String>,
  pub audio_url: Option<String>,
  pub image_path: Option<PathBuf>,
  pub audio_path: Option<PathBuf>,
  pub is_favorite: bool,
}

impl FlashcardDraft {
  /// Fill blanks from a dictionary entry; anything the user typed is kept.
  pub fn autofill(&mut self, entry: &DictionaryEntry) {
    if self.meaning.trim().is_empty() {
      if let Some(definition) = entry.first_definition() {
        self.meaning = definition.to_string();
      }
    }
    if self.example.as_deref().map_or(true, |e| e.trim().is_empty()) {
      if let Some(example) = entry.first_example() {
        self.example = Some(example.to_string());
      }
    }
    if self.audio_url.is_none() && self.audio_path.is_none() {
      if let Some(audio) = entry.pronunciation.as_deref().filter(|a| !a.is_empty()) {
        self.audio_url = Some(audio.to_string());
      }
    }
  }

  /// The create body, once media URLs are known.
  pub fn into_new_card(self) -> NewFlashcard {
    NewFlashcard {
      word: self.word,
      meaning: self.meaning,
      example: self.example,
      image_url: self.image_url,
      audio_url: self.audio_url,
      is_favorite: self.is_favorite.then_some(true),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryEntry {
  #[serde(default)]
  pub word: String,
  #[serde(default)]
  pub phonetic: Option<String>,
  /// Audio URL of the pronunciation
  #[serde(default)]
  pub pronunciation: Option<String>,
  #[serde(default)]
  pub meanings: Vec<DictionaryMeaning>,
}

impl DictionaryEntry {
  pub fn first_definition(&self) -> Option<&str> {
    self
      .meanings
      .first()
      .and_then(|m| m.definitions.first())
      .map(|d| d.definition.as_str())
  }

  /// First example among the first meaning's definitions.
  pub fn first_example(&self) -> Option<&str> {
    self
      .meanings
      .first()?
      .definitions
      .iter()
      .find_map(|d| d.example.as_deref())
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryMeaning {
  #[serde(default)]
  pub part_of_speech: Option<String>,
  #[serde(default)]
  pub definitions: Vec<DictionaryDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryDefinition {
  pub definition: String,
  #[serde(default)]
  pub example: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
  pub url: String,
  #[serde(default)]
  pub filename: Option<String>,
  #[serde(default, rename = "mimetype")]
  pub mime_type: Option<String>,
  #[serde(default)]
  pub size: Option<u64>,
}

/// Notification preferences as the client names them.
///
/// The backend calls `enabled` `dailyReminder` and `daily_reminder_time`
/// `reminderTime`; the rename happens in `api_types`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
  #[serde(default)]
  pub email: Option<bool>,
  #[serde(default)]
  pub push: Option<bool>,
  #[serde(default)]
  pub sms: Option<bool>,
  #[serde(default)]
  pub enabled: bool,
  #[serde(default)]
  pub daily_reminder_time: Option<String>,
  /// Per-type switches, carried through untouched.
  #[serde(default)]
  pub types: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
  Info,
  Success,
  Warning,
  Error,
  #[serde(other)]
  Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
  #[serde(rename = "_id", alias = "id")]
  pub id: String,
  #[serde(default)]
  pub title: String,
  #[serde(default, alias = "body")]
  pub message: String,
  #[serde(rename = "type", default = "default_kind")]
  pub kind: NotificationKind,
  #[serde(default)]
  pub read: bool,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}

fn default_kind() -> NotificationKind {
  NotificationKind::Info
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationHistory {
  #[serde(default = "first_page")]
  pub current_page: u32,
  #[serde(default)]
  pub notifications: Vec<Notification>,
  #[serde(default)]
  pub total_items: u32,
  #[serde(default)]
  pub total_pages: u32,
}

fn first_page() -> u32 {
  1
}

impl Default for NotificationHistory {
  fn default() -> Self {
    Self {
      current_page: 1,
      notifications: Vec::new(),
      total_items: 0,
      total_pages: 0,
    }
  }
}

impl NotificationHistory {
  pub fn unread_count(&self) -> usize {
    self.notifications.iter().filter(|n| !n.read).count()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NotificationHistoryParams {
  pub limit: Option<u32>,
  pub page: Option<u32>,
  pub kind: Option<String>,
  pub read: Option<bool>,
}

impl NotificationHistoryParams {
  /// Query-string pairs, skipping unset filters.
  pub fn to_query(&self) -> Vec<(&'static str, String)> {
    self
      .pairs()
      .into_iter()
      .filter_map(|(k, v)| v.map(|v| (k, v)))
      .collect()
  }

  pub fn pairs(&self) -> [(&'static str, Option<String>); 4] {
    [
      ("limit", self.limit.map(|v| v.to_string())),
      ("page", self.page.map(|v| v.to_string())),
      ("type", self.kind.clone()),
      ("read", self.read.map(|v| v.to_string())),
    ]
  }
}

/// Outcome of a forgot-password request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordResetRequested {
  pub message: Option<String>,
  /// Development backends hand the reset token back instead of mailing it.
  pub reset_token: Option<String>,
}

/// Normalize a clock time to `HH:mm`.
///
/// Accepts unpadded components (`9:5` becomes `09:05`) and rejects anything
/// outside `00:00`..=`23:59`.
pub fn normalize_clock_time(input: &str) -> Result<String, ApiError> {
  let invalid = || ApiError::validation("Enter a valid time (HH:mm, e.g. 09:00, 14:30)");
  let (hours, minutes) = input.trim().split_once(':').ok_or_else(invalid)?;
  let parse = |part: &str| -> Result<u32, ApiError> {
    if part.is_empty() || part.len() > 2 || !part.chars().all(|c| c.is_ascii_digit()) {
      return Err(invalid());
    }
    part.parse().map_err(|_| invalid())
  };
  let (h, m) = (parse(hours)?, parse(minutes)?);
  if h > 23 || m > 59 {
    return Err(ApiError::validation("Enter a time between 00:00 and 23:59"));
  }
  Ok(format!("{:02}:{:02}", h, m))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_normalize_clock_time() {
    assert_eq!(normalize_clock_time("9:5").unwrap(), "09:05");
    assert_eq!(normalize_clock_time(" 14:30 ").unwrap(), "14:30");
    assert_eq!(normalize_clock_time("00:00").unwrap(), "00:00");
    assert!(normalize_clock_time("24:00").is_err());
    assert!(normalize_clock_time("12:60").is_err());
    assert!(normalize_clock_time("1230").is_err());
    assert!(normalize_clock_time("ab:cd").is_err());
    assert!(normalize_clock_time("123:00").is_err());
  }

  #[test]
  fn test_new_flashcard_validation() {
    assert_eq!(
      NewFlashcard::new("  ", "x").validated(),
      Err(ApiError::validation("Word is required"))
    );
    assert_eq!(
      NewFlashcard::new("word", " ").validated(),
      Err(ApiError::validation("Meaning is required"))
    );

    let card = NewFlashcard {
      example: Some("   ".into()),
      ..NewFlashcard::new(" apple ", " elma ")
    }
    .validated()
    .unwrap();
    assert_eq!(card.word, "apple");
    assert_eq!(card.meaning, "elma");
    assert_eq!(card.example, None);
  }

  #[test]
  fn test_patch_serializes_only_present_fields() {
    let patch = FlashcardPatch {
      meaning: Some("new".into()),
      is_favorite: Some(true),
      ..Default::default()
    };
    let json = serde_json::to_value(&patch).unwrap();
    assert_eq!(json, serde_json::json!({"meaning": "new", "isFavorite": true}));
    assert!(FlashcardPatch::default().validated().is_err());
  }

  #[test]
  fn test_dictionary_helpers() {
    let entry: DictionaryEntry = serde_json::from_value(serde_json::json!({
      "word": "run",
      "meanings": [{
        "partOfSpeech": "verb",
        "definitions": [
          {"definition": "move fast"},
          {"definition": "operate", "example": "run the engine"}
        ]
      }]
    }))
    .unwrap();
    assert_eq!(entry.first_definition(), Some("move fast"));
    assert_eq!(entry.first_example(), Some("run the engine"));
  }

  #[test]
  fn test_draft_autofill_keeps_user_input() {
    let entry = DictionaryEntry {
      word: "run".into(),
      phonetic: None,
      pronunciation: Some("https://audio/run.mp3".into()),
      meanings: vec![DictionaryMeaning {
        part_of_speech: Some("verb".into()),
        definitions: vec![DictionaryDefinition {
          definition: "move fast".into(),
          example: Some("run home".into()),
        }],
      }],
    };

    let mut blank = FlashcardDraft {
      word: "run".into(),
      ..Default::default()
    };
    blank.autofill(&entry);
    assert_eq!(blank.meaning, "move fast");
    assert_eq!(blank.example.as_deref(), Some("run home"));
    assert_eq!(blank.audio_url.as_deref(), Some("https://audio/run.mp3"));

    let mut typed = FlashcardDraft {
      word: "run".into(),
      meaning: "koşmak".into(),
      ..Default::default()
    };
    typed.autofill(&entry);
    assert_eq!(typed.meaning, "koşmak");
  }

  #[test]
  fn test_card_filter_matches_locally() {
    let card: Flashcard = serde_json::from_value(serde_json::json!({
      "id": "1", "word": "Apple", "meaning": "elma", "isFavorite": false
    }))
    .unwrap();
    assert!(CardFilter::default().matches(&card));
    assert!(CardFilter {
      search: Some("app".into()),
      favorites_only: false
    }
    .matches(&card));
    assert!(!CardFilter {
      search: None,
      favorites_only: true
    }
    .matches(&card));
  }

  #[test]
  fn test_history_params_skip_unset() {
    let params = NotificationHistoryParams {
      limit: Some(20),
      read: Some(false),
      ..Default::default()
    };
    assert_eq!(
      params.to_query(),
      vec![("limit", "20".to_string()), ("read", "false".to_string())]
    );
  }
}
