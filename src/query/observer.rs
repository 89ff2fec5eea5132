//! Long-lived view of one query, for callers that re-render on change.
//!
//! Inspired by TanStack Query's observers: a `QueryObserver<T>` binds a key,
//! its options and a fetcher together, so the caller only decides *when* to
//! look. Toggling `enabled` from false to true kicks off the initial fetch.
//!
//! # Example
//!
//! ```ignore
//! let api = flashcards.clone();
//! let mut prefs = QueryObserver::new(cache.clone(), keys::preferences(), options, move || {
//!   let api = api.clone();
//!   async move { api.get_preferences().await }
//! });
//!
//! prefs.set_enabled(session.is_authenticated());
//! match prefs.status() {
//!   QueryStatus::Loading => render_spinner(),
//!   QueryStatus::Success(data) => render(data),
//!   QueryStatus::Error(e) => render_error(&e),
//!   QueryStatus::Idle => {}
//! }
//! ```

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;

use super::cache::{QueryCache, QueryOptions, QuerySnapshot};
use super::key::QueryKey;
use crate::error::{ApiError, ApiResult};

/// Coarse state of an observed query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryStatus<T> {
  /// Disabled, or never fetched
  Idle,
  /// First fetch is running
  Loading,
  /// Data is available (possibly being revalidated)
  Success(T),
  /// The last fetch failed and there is no data to show
  Error(ApiError),
}

impl<T> QueryStatus<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryStatus::Loading)
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryStatus::Success(data) => Some(data),
      _ => None,
    }
  }
}

impl<T> From<QuerySnapshot<T>> for QueryStatus<T> {
  fn from(snapshot: QuerySnapshot<T>) -> Self {
    match snapshot {
      QuerySnapshot {
        data: Some(data), ..
      } => QueryStatus::Success(data),
      QuerySnapshot {
        is_loading: true, ..
      } => QueryStatus::Loading,
      QuerySnapshot {
        error: Some(err), ..
      } => QueryStatus::Error(err),
      _ => QueryStatus::Idle,
    }
  }
}

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Arc<dyn Fn() -> BoxFuture<'static, ApiResult<T>> + Send + Sync>;

pub struct QueryObserver<T> {
  cache: QueryCache,
  key: QueryKey,
  options: QueryOptions,
  fetcher: FetcherFn<T>,
}

impl<T: Clone + Send + Sync + 'static> QueryObserver<T> {
  /// The fetcher is called each time the cache decides a request is needed.
  pub fn new<F, Fut>(cache: QueryCache, key: QueryKey, options: QueryOptions, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ApiResult<T>> + Send + 'static,
  {
    Self {
      cache,
      key,
      options,
      fetcher: Arc::new(move || fetcher().boxed()),
    }
  }

  pub fn is_enabled(&self) -> bool {
    self.options.enabled
  }

  /// Enable or disable the query. Enabling starts the initial fetch in the
  /// background if there is nothing fresh cached; returns whether it did.
  pub fn set_enabled(&mut self, enabled: bool) -> bool {
    let was_enabled = self.options.enabled;
    self.options.enabled = enabled;
    if enabled && !was_enabled {
      let fetcher = Arc::clone(&self.fetcher);
      return self.cache.prefetch(&self.key, self.options, move || fetcher());
    }
    false
  }

  /// Current cache contents for this key. Never fetches.
  pub fn snapshot(&self) -> QuerySnapshot<T> {
    self.cache.peek(&self.key)
  }

  pub fn status(&self) -> QueryStatus<T> {
    if !self.options.enabled && self.snapshot().data.is_none() {
      return QueryStatus::Idle;
    }
    self.snapshot().into()
  }

  /// Read through the cache, fetching if the data is missing or stale.
  pub async fn fetch(&self) -> QuerySnapshot<T> {
    let fetcher = Arc::clone(&self.fetcher);
    self
      .cache
      .query(&self.key, self.options, move || fetcher())
      .await
  }

  /// Force a new request even if the data is fresh.
  pub async fn refetch(&self) -> ApiResult<T> {
    if !self.options.enabled {
      return self.snapshot().into_result();
    }
    let fetcher = Arc::clone(&self.fetcher);
    self
      .cache
      .refetch(&self.key, self.options, move || fetcher())
      .await
  }
}

impl<T> std::fmt::Debug for QueryObserver<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QueryObserver")
      .field("key", &self.key)
      .field("options", &self.options)
      .finish_non_exhaustive()
  }
}
