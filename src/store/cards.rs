//! Card store: the last card list the server confirmed, kept on disk for
//! offline display.
//!
//! The snapshot records which user it belongs to. Another session never sees
//! it, and the first write made for another user starts from empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use crate::api::types::Flashcard;
use crate::cache::{remove_by_key, replace_by_key, KeyValueStorage};
use crate::store::SessionStore;

const CARD_NAMESPACE: &str = "card-storage";
const CARDS_KEY: &str = "cards";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardSnapshot {
  /// User id of the session the cards were fetched for.
  #[serde(default)]
  owner: Option<String>,
  cards: Vec<Flashcard>,
  synced_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct CardStore {
  state: Arc<RwLock<CardSnapshot>>,
  storage: Arc<dyn KeyValueStorage>,
  session: SessionStore,
}

impl CardStore {
  pub fn restore(storage: Arc<dyn KeyValueStorage>, session: SessionStore) -> Self {
    let snapshot = storage
      .get::<CardSnapshot>(CARD_NAMESPACE, CARDS_KEY)
      .unwrap_or_else(|e| {
        warn!(error = %e, "failed to load persisted cards");
        None
      })
      .unwrap_or_default();
    Self {
      state: Arc::new(RwLock::new(snapshot)),
      storage,
      session,
    }
  }

  pub fn cards(&self) -> Vec<Flashcard> {
    self.read(|s| s.cards.clone())
  }

  pub fn get(&self, id: &str) -> Option<Flashcard> {
    self.read(|s| s.cards.iter().find(|c| c.id == id).cloned())
  }

  pub fn is_empty(&self) -> bool {
    self.read(|s| s.cards.is_empty())
  }

  /// When the list was last replaced by a full server fetch.
  pub fn synced_at(&self) -> Option<DateTime<Utc>> {
    self.read(|s| s.synced_at)
  }

  /// Replace the whole list with a fresh server copy.
  pub fn set_cards(&self, cards: Vec<Flashcard>) {
    self.mutate(|s| {
      s.cards = cards;
      s.synced_at = Some(Utc::now());
    });
  }

  /// Add a newly created card at the head, replacing any copy with the same id.
  pub fn add_card(&self, card: Flashcard) {
    self.mutate(|s| {
      remove_by_key(&mut s.cards, &card.id);
      s.cards.insert(0, card);
    });
  }

  /// Swap in the server's version of a card. Unknown ids are ignored.
  pub fn update_card(&self, card: &Flashcard) {
    self.mutate(|s| {
      replace_by_key(&mut s.cards, card);
    });
  }

  pub fn delete_card(&self, id: &str) {
    self.mutate(|s| remove_by_key(&mut s.cards, id));
  }

  /// Forget every card (logout).
  pub fn clear(&self) {
    self.mutate(|s| {
      s.cards.clear();
      s.synced_at = None;
    });
  }

  fn current_owner(&self) -> Option<String> {
    self.session.user().map(|u| u.id)
  }

  fn read<R>(&self, f: impl FnOnce(&CardSnapshot) -> R) -> R {
    let guard = self.state.read().unwrap_or_else(|e| e.into_inner());
    if guard.owner == self.current_owner() {
      f(&guard)
    } else {
      f(&CardSnapshot::default())
    }
  }

  fn mutate(&self, f: impl FnOnce(&mut CardSnapshot)) {
    let owner = self.current_owner();
    let snapshot = {
      let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
      if guard.owner != owner {
        if !guard.cards.is_empty() {
          debug!("card store belonged to another user, starting over");
        }
        *guard = CardSnapshot {
          owner,
          ..CardSnapshot::default()
        };
      }
      f(&mut guard);
      guard.clone()
    };
    if let Err(e) = self.storage.put(CARD_NAMESPACE, CARDS_KEY, &snapshot) {
      warn!(error = %e, "failed to persist cards");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::User;
  use crate::store::SessionToken;
  use crate::test_support::session;

  fn card(id: &str, word: &str) -> Flashcard {
    Flashcard {
      id: id.into(),
      word: word.into(),
      meaning: format!("{} meaning", word),
      example: None,
      image_url: None,
      audio_url: None,
      is_favorite: false,
      owner_id: None,
      created_at: None,
      updated_at: None,
    }
  }

  fn store() -> (CardStore, Arc<dyn KeyValueStorage>) {
    let (storage, session) = session();
    (CardStore::restore(Arc::clone(&storage), session), storage)
  }

  fn user(id: &str) -> User {
    User {
      id: id.into(),
      email: format!("{}@example.com", id),
      name: id.into(),
      avatar: None,
    }
  }

  #[test]
  fn test_add_prepends_and_persists() {
    let (cards, storage) = store();
    cards.set_cards(vec![card("1", "one")]);
    cards.add_card(card("2", "two"));

    let ids: Vec<_> = cards.cards().into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec!["2", "1"]);

    let restored = CardStore::restore(Arc::clone(&storage), cards.session.clone());
    assert_eq!(restored.cards().len(), 2);
    assert!(restored.synced_at().is_some());
  }

  #[test]
  fn test_update_replaces_in_place() {
    let (cards, _) = store();
    cards.set_cards(vec![card("1", "one"), card("2", "two")]);
    cards.update_card(&Flashcard {
      example: Some("one example".into()),
      ..card("1", "uno")
    });

    let all = cards.cards();
    assert_eq!(all[0].word, "uno");
    assert_eq!(all[0].example.as_deref(), Some("one example"));
    assert_eq!(all[1].id, "2");

    cards.update_card(&card("9", "nine"));
    assert_eq!(cards.cards().len(), 2);
  }

  #[test]
  fn test_delete_and_clear() {
    let (cards, _) = store();
    cards.set_cards(vec![card("1", "one"), card("2", "two")]);
    cards.update_card(&Flashcard {
      is_favorite: true,
      ..card("2", "two")
    });
    assert!(cards.get("2").unwrap().is_favorite);

    cards.delete_card("1");
    assert!(cards.get("1").is_none());
    assert_eq!(cards.cards().len(), 1);

    cards.clear();
    assert!(cards.is_empty());
  }

  #[test]
  fn test_cards_are_private_to_their_owner() {
    let (storage, session) = session();
    let cards = CardStore::restore(Arc::clone(&storage), session.clone());
    session.login(user("ada"), Some(SessionToken::Bearer("a".into())));
    cards.set_cards(vec![card("1", "one")]);

    // A new login replaces the identity without a logout in between.
    session.login(user("bob"), Some(SessionToken::Bearer("b".into())));
    assert!(cards.is_empty());
    assert!(cards.get("1").is_none());
    assert_eq!(cards.synced_at(), None);

    let restored = CardStore::restore(Arc::clone(&storage), session.clone());
    assert!(restored.is_empty());

    cards.add_card(card("2", "two"));
    let ids: Vec<_> = cards.cards().into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec!["2"]);

    session.login(user("ada"), Some(SessionToken::Bearer("a".into())));
    assert!(cards.is_empty());
  }
}
