//! Flashcard reads through the query cache, and the mutation pipeline.
//!
//! Mutations never invalidate-and-refetch the list. Once the server confirms a
//! change, its response is written straight into every affected entry (list and
//! detail) and into the persisted card store.

use tokio::time::Instant;
use tracing::{debug, warn};

use super::keys;
use crate::api::types::{
  CardFilter, DictionaryEntry, Flashcard, FlashcardDraft, FlashcardPatch, NewFlashcard,
};
use crate::api::{FlashcardApi, UploadApi};
use crate::cache::{remove_by_key, replace_by_key, CacheResult};
use crate::error::{ApiError, ApiResult};
use crate::query::{QueryCache, QueryOptions};
use crate::store::CardStore;

#[derive(Clone)]
pub struct FlashcardQueries {
  cache: QueryCache,
  api: FlashcardApi,
  uploads: UploadApi,
  cards: CardStore,
  options: QueryOptions,
}

impl FlashcardQueries {
  pub fn new(
    cache: QueryCache,
    api: FlashcardApi,
    uploads: UploadApi,
    cards: CardStore,
    options: QueryOptions,
  ) -> Self {
    Self {
      cache,
      api,
      uploads,
      cards,
      options,
    }
  }

  // ==========================================================================
  // Reads
  // ==========================================================================

  /// The card list for a filter.
  ///
  /// When the server can't be reached and nothing is cached in memory, the
  /// persisted card store is served instead (marked offline).
  pub async fn list(&self, filter: &CardFilter) -> ApiResult<CacheResult<Vec<Flashcard>>> {
    let key = keys::flashcard_list(filter);
    let started = Instant::now();
    let api = self.api.clone();
    let fetch_filter = filter.clone();
    let snapshot = self
      .cache
      .query(&key, self.options, move || async move {
        api.list(&fetch_filter).await
      })
      .await;

    if let Some(cards) = snapshot.data {
      let fetched_now = snapshot.updated_at.is_some_and(|at| at >= started);
      if !fetched_now {
        return Ok(CacheResult::from_cache(cards, snapshot.is_fetching));
      }
      if filter.is_empty() {
        self.cards.set_cards(cards.clone());
      }
      return Ok(CacheResult::from_network(cards));
    }

    let err = snapshot.error.unwrap_or(ApiError::Server {
      status: None,
      message: None,
    });
    match self.cards.synced_at() {
      Some(synced_at) if err.is_transport() => {
        warn!(error = %err, "card list unavailable, serving stored cards");
        let offline = self
          .cards
          .cards()
          .into_iter()
          .filter(|c| filter.matches(c))
          .collect();
        Ok(CacheResult::offline(offline, Some(synced_at)))
      }
      _ => Err(err),
    }
  }

  /// Force a network read of the list, even if the cache is fresh.
  pub async fn refresh(&self, filter: &CardFilter) -> ApiResult<Vec<Flashcard>> {
    let api = self.api.clone();
    let fetch_filter = filter.clone();
    let cards = self
      .cache
      .refetch(&keys::flashcard_list(filter), self.options, move || async move {
        api.list(&fetch_filter).await
      })
      .await?;
    if filter.is_empty() {
      self.cards.set_cards(cards.clone());
    }
    Ok(cards)
  }

  pub async fn detail(&self, id: &str) -> ApiResult<Flashcard> {
    let id = id.trim();
    if id.is_empty() {
      return Err(ApiError::validation("Card id is required"));
    }
    let api = self.api.clone();
    let fetch_id = id.to_string();
    self
      .cache
      .fetch_query(&keys::flashcard_detail(id), self.options, move || async move {
        api.get(&fetch_id).await
      })
      .await
  }

  /// Dictionary lookup. Failures are logged and read as "no entry".
  pub async fn dictionary(&self, word: &str) -> Option<DictionaryEntry> {
    match self.api.dictionary(word).await {
      Ok(entry) => entry,
      Err(e) => {
        warn!(word, error = %e, "dictionary lookup failed");
        None
      }
    }
  }

  /// Fill the draft's blanks from the dictionary, when the word is known.
  pub async fn autofill(&self, mut draft: FlashcardDraft) -> FlashcardDraft {
    if draft.word.trim().is_empty() {
      return draft;
    }
    if let Some(entry) = self.dictionary(&draft.word).await {
      draft.autofill(&entry);
    }
    draft
  }

  // ==========================================================================
  // Mutations
  // ==========================================================================

  pub async fn create(&self, card: NewFlashcard) -> ApiResult<Flashcard> {
    let card = card.validated()?;
    let created = self.api.create(&card).await?;
    self.apply_created(&created);
    Ok(created)
  }

  /// Upload any local media, then create the card with the returned URLs.
  pub async fn submit_draft(&self, mut draft: FlashcardDraft) -> ApiResult<Flashcard> {
    // Reject bad input before spending time on uploads.
    draft.clone().into_new_card().validated()?;

    if let Some(path) = draft.image_path.take() {
      draft.image_url = Some(self.uploads.upload_image(&path).await?.url);
    }
    if let Some(path) = draft.audio_path.take() {
      draft.audio_url = Some(self.uploads.upload_audio(&path).await?.url);
    }
    self.create(draft.into_new_card()).await
  }

  pub async fn update(&self, id: &str, patch: FlashcardPatch) -> ApiResult<Flashcard> {
    let patch = patch.validated()?;
    let updated = self.api.update(id, &patch).await?;
    self.apply_updated(&updated);
    Ok(updated)
  }

  pub async fn toggle_favorite(&self, id: &str) -> ApiResult<Flashcard> {
    let current = match self.known_card(id) {
      Some(card) => card,
      None => self.detail(id).await?,
    };
    let patch = FlashcardPatch {
      is_favorite: Some(!current.is_favorite),
      ..Default::default()
    };
    self.update(id, patch).await
  }

  pub async fn delete(&self, id: &str) -> ApiResult<()> {
    self.api.delete(id).await?;
    self.apply_deleted(id);
    Ok(())
  }

  fn apply_created(&self, card: &Flashcard) {
    let lists = keys::flashcard_lists();
    if let Some(mut list) = self.cache.get_query_data::<Vec<Flashcard>>(&lists) {
      remove_by_key(&mut list, &card.id);
      list.insert(0, card.clone());
      self.cache.set_query_data(&lists, list);
    }
    self
      .cache
      .set_query_data(&keys::flashcard_detail(&card.id), card.clone());
    // Membership of filtered lists is decided by the server.
    self.cache.invalidate(&keys::filtered_flashcard_lists());
    self.cards.add_card(card.clone());
    debug!(id = %card.id, "card created");
  }

  fn apply_updated(&self, card: &Flashcard) {
    let lists = self
      .cache
      .update_matching::<Vec<Flashcard>, _>(&keys::flashcard_lists(), |list| {
        replace_by_key(list, card);
      });
    self
      .cache
      .set_query_data(&keys::flashcard_detail(&card.id), card.clone());
    self.cache.invalidate(&keys::filtered_flashcard_lists());
    self.cards.update_card(card);
    debug!(id = %card.id, lists, "card updated");
  }

  fn apply_deleted(&self, id: &str) {
    self
      .cache
      .update_matching::<Vec<Flashcard>, _>(&keys::flashcard_lists(), |list| {
        remove_by_key(list, id)
      });
    self.cache.remove(&keys::flashcard_detail(id));
    self.cards.delete_card(id);
    debug!(id, "card deleted");
  }

  fn known_card(&self, id: &str) -> Option<Flashcard> {
    self
      .cache
      .get_query_data::<Flashcard>(&keys::flashcard_detail(id))
      .or_else(|| {
        self
          .cache
          .get_query_data::<Vec<Flashcard>>(&keys::flashcard_lists())
          .and_then(|list| list.into_iter().find(|c| c.id == id))
      })
      .or_else(|| self.cards.get(id))
  }
}
