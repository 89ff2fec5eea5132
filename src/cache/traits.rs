//! Core traits and types shared by the persisted and in-memory caches.

use chrono::{DateTime, Utc};

/// Trait for entities that are cached by identity.
///
/// Lists of cacheable entities can be spliced by key, which is how mutations
/// apply server results without refetching.
pub trait Cacheable: Clone + Send + Sync + 'static {
  /// Unique identifier for this entity (e.g., flashcard id)
  fn cache_key(&self) -> &str;

  /// Last modification timestamp, if the entity tracks one.
  fn updated_at(&self) -> Option<DateTime<Utc>>;
}

/// Replace the entity whose key matches `entity` in place. Returns whether one was found.
pub fn replace_by_key<T: Cacheable>(list: &mut [T], entity: &T) -> bool {
  match list
    .iter_mut()
    .find(|existing| existing.cache_key() == entity.cache_key())
  {
    Some(existing) => {
      *existing = entity.clone();
      true
    }
    None => false,
  }
}

/// Drop every entity with the given key.
pub fn remove_by_key<T: Cacheable>(list: &mut Vec<T>, key: &str) {
  list.retain(|existing| existing.cache_key() != key);
}

/// Result of a read, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was last confirmed by the server (if known)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: Some(Utc::now()),
    }
  }

  /// Data served from the in-memory query cache.
  pub fn from_cache(data: T, is_stale: bool) -> Self {
    Self {
      data,
      source: if is_stale {
        CacheSource::CacheStale
      } else {
        CacheSource::CacheFresh
      },
      cached_at: None,
    }
  }

  /// Network unavailable, serving the persisted copy.
  pub fn offline(data: T, cached_at: Option<DateTime<Utc>>) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
      cached_at,
    }
  }

  pub fn is_offline(&self) -> bool {
    self.source == CacheSource::Offline
  }
}

/// Indicates where served data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still considered fresh
  CacheFresh,
  /// Data from cache, considered stale; a background refetch is in progress
  CacheStale,
  /// Offline mode - network unavailable, serving persisted data
  Offline,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Clone, PartialEq)]
  struct Item {
    id: String,
    label: &'static str,
  }

  impl Cacheable for Item {
    fn cache_key(&self) -> &str {
      &self.id
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
      None
    }
  }

  fn item(id: &str, label: &'static str) -> Item {
    Item {
      id: id.to_string(),
      label,
    }
  }

  #[test]
  fn test_replace_by_key_keeps_position() {
    let mut list = vec![item("a", "one"), item("b", "two"), item("c", "three")];
    assert!(replace_by_key(&mut list, &item("b", "TWO")));
    assert_eq!(list[1], item("b", "TWO"));
    assert_eq!(list.len(), 3);
    assert!(!replace_by_key(&mut list, &item("z", "none")));
  }

  #[test]
  fn test_remove_by_key() {
    let mut list = vec![item("a", "one"), item("b", "two")];
    remove_by_key(&mut list, "a");
    assert_eq!(list, vec![item("b", "two")]);
  }
}
