use reqwest::Method;

use super::api_types::{ApiDictionary, ApiFlashcard, ApiSuggestions};
use super::gateway::{HttpGateway, RequestBody};
use super::types::{CardFilter, DictionaryEntry, Flashcard, FlashcardPatch, NewFlashcard};
use crate::error::{ApiError, ApiResult};

pub const MIN_SUGGESTION_LEN: usize = 2;

/// A suggestion lookup that has already passed the minimum-length check.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SuggestionQuery {
  text: String,
  limit: u32,
}

impl SuggestionQuery {
  /// Rejects input shorter than two characters without touching the network.
  pub fn new(text: &str, limit: u32) -> ApiResult<Self> {
    let text = text.trim();
    if text.chars().count() < MIN_SUGGESTION_LEN {
      return Err(ApiError::validation(format!(
        "Type at least {} characters",
        MIN_SUGGESTION_LEN
      )));
    }
    Ok(Self {
      text: text.to_string(),
      limit: limit.max(1),
    })
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn limit(&self) -> u32 {
    self.limit
  }
}

/// Raw flashcard endpoints. Cache bookkeeping lives in `queries::flashcards`.
#[derive(Clone)]
pub struct FlashcardApi {
  gateway: HttpGateway,
}

impl FlashcardApi {
  pub fn new(gateway: HttpGateway) -> Self {
    Self { gateway }
  }

  pub async fn list(&self, filter: &CardFilter) -> ApiResult<Vec<Flashcard>> {
    let cards: Vec<ApiFlashcard> = self
      .gateway
      .get_with_query("/flashcards", &filter.to_query())
      .await?;
    Ok(cards.into_iter().map(Flashcard::from).collect())
  }

  pub async fn get(&self, id: &str) -> ApiResult<Flashcard> {
    let card: ApiFlashcard = self.gateway.get(&format!("/flashcards/{}", id)).await?;
    Ok(card.into())
  }

  pub async fn create(&self, card: &NewFlashcard) -> ApiResult<Flashcard> {
    let created: ApiFlashcard = self.gateway.post("/flashcards", card).await?;
    Ok(created.into())
  }

  pub async fn update(&self, id: &str, patch: &FlashcardPatch) -> ApiResult<Flashcard> {
    let updated: ApiFlashcard = self
      .gateway
      .put(&format!("/flashcards/{}", id), patch)
      .await?;
    Ok(updated.into())
  }

  pub async fn delete(&self, id: &str) -> ApiResult<()> {
    self
      .gateway
      .command(
        Method::DELETE,
        &format!("/flashcards/{}", id),
        RequestBody::Empty,
      )
      .await?;
    Ok(())
  }

  pub async fn suggestions(&self, query: &SuggestionQuery) -> ApiResult<Vec<String>> {
    let params = [
      ("q", query.text.clone()),
      ("limit", query.limit.to_string()),
    ];
    let words: Option<ApiSuggestions> = self
      .gateway
      .get_optional("/flashcards/suggestions", &params)
      .await?;
    Ok(words.map(ApiSuggestions::into_words).unwrap_or_default())
  }

  pub async fn dictionary(&self, word: &str) -> ApiResult<Option<DictionaryEntry>> {
    let word = word.trim();
    if word.is_empty() {
      return Err(ApiError::validation("Enter a word to look up"));
    }
    let entry: Option<ApiDictionary> = self
      .gateway
      .get_optional("/flashcards/dictionary", &[("word", word.to_string())])
      .await?;
    Ok(entry.and_then(ApiDictionary::into_entry))
  }
}
