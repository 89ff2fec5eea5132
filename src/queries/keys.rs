//! Key hierarchy for every cached query.
//!
//! ```text
//! flashcards
//!   list                      unfiltered list
//!   list/filtered/{..}        one entry per filter
//!   detail/<id>
//! notification-preferences
//! notification-history/{..}   one entry per page/filter
//! ```

use crate::api::types::{CardFilter, NotificationHistoryParams};
use crate::query::QueryKey;

pub fn flashcards() -> QueryKey {
  QueryKey::root("flashcards")
}

/// Prefix of every list entry, filtered or not.
pub fn flashcard_lists() -> QueryKey {
  flashcards().child("list")
}

pub fn filtered_flashcard_lists() -> QueryKey {
  flashcard_lists().child("filtered")
}

pub fn flashcard_list(filter: &CardFilter) -> QueryKey {
  if filter.is_empty() {
    flashcard_lists()
  } else {
    filtered_flashcard_lists().with_params(filter.pairs())
  }
}

pub fn flashcard_details() -> QueryKey {
  flashcards().child("detail")
}

pub fn flashcard_detail(id: &str) -> QueryKey {
  flashcard_details().child(id)
}

pub fn notification_preferences() -> QueryKey {
  QueryKey::root("notification-preferences")
}

pub fn notification_history_all() -> QueryKey {
  QueryKey::root("notification-history")
}

pub fn notification_history(params: &NotificationHistoryParams) -> QueryKey {
  notification_history_all().with_params(params.pairs())
}
