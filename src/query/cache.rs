//! Process-wide remote query cache.
//!
//! Entries are keyed by [`QueryKey`] and hold the last payload a fetch produced.
//! Reads follow a stale-while-revalidate policy:
//!
//! - younger than `stale_time`: served from memory, no request
//! - younger than `gc_time`: served from memory, revalidated in the background
//! - older than `gc_time` (or absent): evicted, the caller waits for a cold fetch
//!
//! At most one fetch per key is in flight; concurrent readers share it. Every
//! fetch and every direct write takes a number from one global sequence, and a
//! result is applied only if nothing newer has been written to its entry.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::key::QueryKey;
use crate::error::{ApiError, ApiResult};

type Payload = Arc<dyn Any + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, ApiResult<Payload>>>;

/// Per-query freshness settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
  pub stale_time: Duration,
  pub gc_time: Duration,
  /// A disabled query never fetches; it only reports what is already cached.
  pub enabled: bool,
}

impl Default for QueryOptions {
  fn default() -> Self {
    Self {
      stale_time: Duration::from_secs(5 * 60),
      gc_time: Duration::from_secs(10 * 60),
      enabled: true,
    }
  }
}

impl QueryOptions {
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
    self.gc_time = gc_time;
    self
  }

  pub fn enabled(mut self, enabled: bool) -> Self {
    self.enabled = enabled;
    self
  }
}

/// What a reader sees for one key at one moment.
#[derive(Debug, Clone)]
pub struct QuerySnapshot<T> {
  pub data: Option<T>,
  pub error: Option<ApiError>,
  /// No data yet and a fetch is running.
  pub is_loading: bool,
  /// Any fetch for this key is running (cold or background).
  pub is_fetching: bool,
  pub updated_at: Option<Instant>,
}

impl<T> QuerySnapshot<T> {
  fn empty() -> Self {
    Self {
      data: None,
      error: None,
      is_loading: false,
      is_fetching: false,
      updated_at: None,
    }
  }

  /// Data if present, otherwise the error (or a generic one for an idle key).
  pub fn into_result(self) -> ApiResult<T> {
    match (self.data, self.error) {
      (Some(data), _) => Ok(data),
      (None, Some(err)) => Err(err),
      (None, None) => Err(ApiError::Server {
        status: None,
        message: None,
      }),
    }
  }
}

struct InFlight {
  seq: u64,
  fetch: SharedFetch,
}

struct Entry {
  data: Option<Payload>,
  updated_at: Option<Instant>,
  gc_time: Duration,
  error: Option<ApiError>,
  invalidated: bool,
  inflight: Option<InFlight>,
  /// Sequence number of the last write that landed in this entry.
  applied_seq: u64,
}

impl Entry {
  /// A fresh entry ignores anything that started before it existed.
  fn new(current_seq: u64, gc_time: Duration) -> Self {
    Self {
      data: None,
      updated_at: None,
      gc_time,
      error: None,
      invalidated: false,
      inflight: None,
      applied_seq: current_seq,
    }
  }

  fn age(&self, now: Instant) -> Option<Duration> {
    self.updated_at.map(|at| now.saturating_duration_since(at))
  }

  fn is_expired(&self, now: Instant) -> bool {
    self.age(now).is_some_and(|age| age >= self.gc_time)
  }

  fn is_stale(&self, now: Instant, stale_time: Duration) -> bool {
    self.invalidated || self.age(now).map_or(true, |age| age >= stale_time)
  }

  /// Drop the payload but keep any running fetch so it can still be joined.
  fn evict_data(&mut self) {
    self.data = None;
    self.updated_at = None;
    self.error = None;
    self.invalidated = false;
  }

  fn write(&mut self, seq: u64, payload: Payload, now: Instant) {
    self.data = Some(payload);
    self.updated_at = Some(now);
    self.error = None;
    self.invalidated = false;
    self.applied_seq = seq;
  }
}

struct Inner {
  entries: Mutex<HashMap<QueryKey, Entry>>,
  seq: AtomicU64,
}

impl Inner {
  fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
    // The map is never left half-updated, so a poisoned lock is still usable.
    self.entries.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn next_seq(&self) -> u64 {
    self.seq.fetch_add(1, Ordering::SeqCst) + 1
  }

  fn current_seq(&self) -> u64 {
    self.seq.load(Ordering::SeqCst)
  }

  /// Apply a finished fetch, unless the entry moved on while it ran.
  fn settle(&self, key: &QueryKey, seq: u64, result: &ApiResult<Payload>) {
    let mut entries = self.lock();
    let Some(entry) = entries.get_mut(key) else {
      debug!(%key, seq, "dropping fetch result for evicted query");
      return;
    };

    if entry.inflight.as_ref().is_some_and(|f| f.seq == seq) {
      entry.inflight = None;
    }

    if seq <= entry.applied_seq {
      debug!(%key, seq, applied = entry.applied_seq, "discarding out-of-order fetch result");
      return;
    }

    match result {
      Ok(payload) => entry.write(seq, Arc::clone(payload), Instant::now()),
      Err(err) => {
        debug!(%key, seq, error = %err, "query fetch failed");
        entry.error = Some(err.clone());
      }
    }
  }
}

enum Plan {
  Fresh(Payload, Instant),
  Stale(Payload, Instant),
  Cold(SharedFetch),
}

/// Shared handle to the query cache. Cloning is cheap; all clones see the same entries.
#[derive(Clone)]
pub struct QueryCache {
  inner: Arc<Inner>,
}

impl Default for QueryCache {
  fn default() -> Self {
    Self::new()
  }
}

impl QueryCache {
  pub fn new() -> Self {
    Self {
      inner: Arc::new(Inner {
        entries: Mutex::new(HashMap::new()),
        seq: AtomicU64::new(0),
      }),
    }
  }

  /// Read a key, fetching according to its freshness.
  ///
  /// Fresh data returns without a request. Stale data returns immediately while a
  /// background revalidation runs. Missing or expired data waits for the fetch.
  pub async fn query<T, F, Fut>(
    &self,
    key: &QueryKey,
    options: QueryOptions,
    fetcher: F,
  ) -> QuerySnapshot<T>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ApiResult<T>> + Send + 'static,
  {
    if !options.enabled {
      return self.peek(key);
    }

    let now = Instant::now();
    let (plan, spawn) = {
      let mut entries = self.inner.lock();
      let current_seq = self.inner.current_seq();
      let entry = entries
        .entry(key.clone())
        .or_insert_with(|| Entry::new(current_seq, options.gc_time));
      entry.gc_time = options.gc_time;

      if entry.is_expired(now) {
        debug!(%key, "query entry expired, evicting");
        entry.evict_data();
      }

      match (&entry.data, entry.updated_at) {
        (Some(data), Some(at)) if !entry.is_stale(now, options.stale_time) => {
          (Plan::Fresh(Arc::clone(data), at), None)
        }
        (Some(data), Some(at)) => {
          let data = Arc::clone(data);
          let spawn = if entry.inflight.is_none() {
            Some(self.start_fetch(key, entry, fetcher))
          } else {
            None
          };
          (Plan::Stale(data, at), spawn)
        }
        _ => match &entry.inflight {
          Some(inflight) => (Plan::Cold(inflight.fetch.clone()), None),
          None => {
            let fetch = self.start_fetch(key, entry, fetcher);
            (Plan::Cold(fetch.clone()), Some(fetch))
          }
        },
      }
    };

    if let Some(fetch) = spawn {
      spawn_fetch(fetch);
    }

    match plan {
      Plan::Fresh(data, at) => snapshot_from(key, data, at, false),
      Plan::Stale(data, at) => snapshot_from(key, data, at, true),
      Plan::Cold(fetch) => match fetch.await {
        Ok(payload) => snapshot_from(key, payload, Instant::now(), false),
        Err(err) => QuerySnapshot {
          error: Some(err),
          ..QuerySnapshot::empty()
        },
      },
    }
  }

  /// Like [`query`](Self::query), but yields the data or the error.
  pub async fn fetch_query<T, F, Fut>(
    &self,
    key: &QueryKey,
    options: QueryOptions,
    fetcher: F,
  ) -> ApiResult<T>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ApiResult<T>> + Send + 'static,
  {
    self.query(key, options, fetcher).await.into_result()
  }

  /// Start a fetch for `key` if it has no data and none is running, without waiting.
  ///
  /// Must be called from within a tokio runtime.
  pub fn prefetch<T, F, Fut>(&self, key: &QueryKey, options: QueryOptions, fetcher: F) -> bool
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ApiResult<T>> + Send + 'static,
  {
    if !options.enabled {
      return false;
    }
    let now = Instant::now();
    let fetch = {
      let mut entries = self.inner.lock();
      let current_seq = self.inner.current_seq();
      let entry = entries
        .entry(key.clone())
        .or_insert_with(|| Entry::new(current_seq, options.gc_time));
      entry.gc_time = options.gc_time;
      if entry.is_expired(now) {
        entry.evict_data();
      }
      if entry.inflight.is_some() || !entry.is_stale(now, options.stale_time) {
        return false;
      }
      self.start_fetch(key, entry, fetcher)
    };
    spawn_fetch(fetch);
    true
  }

  /// Start a new fetch even if one is running. The older fetch's result is discarded
  /// if it lands after this one.
  pub async fn refetch<T, F, Fut>(
    &self,
    key: &QueryKey,
    options: QueryOptions,
    fetcher: F,
  ) -> ApiResult<T>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ApiResult<T>> + Send + 'static,
  {
    let fetch = {
      let mut entries = self.inner.lock();
      let current_seq = self.inner.current_seq();
      let entry = entries
        .entry(key.clone())
        .or_insert_with(|| Entry::new(current_seq, options.gc_time));
      entry.gc_time = options.gc_time;
      self.start_fetch(key, entry, fetcher)
    };
    spawn_fetch(fetch.clone());
    let payload = fetch.await?;
    downcast::<T>(key, payload).ok_or_else(|| type_mismatch(key))
  }

  /// Current state of a key without triggering any fetch.
  pub fn peek<T: Clone + Send + Sync + 'static>(&self, key: &QueryKey) -> QuerySnapshot<T> {
    let now = Instant::now();
    let entries = self.inner.lock();
    let Some(entry) = entries.get(key) else {
      return QuerySnapshot::empty();
    };
    let is_fetching = entry.inflight.is_some();
    let data = if entry.is_expired(now) {
      None
    } else {
      entry.data.clone().and_then(|p| downcast::<T>(key, p))
    };
    QuerySnapshot {
      is_loading: is_fetching && data.is_none(),
      is_fetching,
      updated_at: data.as_ref().and(entry.updated_at),
      data,
      error: entry.error.clone(),
    }
  }

  /// Cached data for a key, if present and not expired.
  pub fn get_query_data<T: Clone + Send + Sync + 'static>(&self, key: &QueryKey) -> Option<T> {
    self.peek::<T>(key).data
  }

  /// Write data for a key directly, as if a fetch had just returned it.
  pub fn set_query_data<T: Clone + Send + Sync + 'static>(&self, key: &QueryKey, data: T) {
    let seq = self.inner.next_seq();
    let mut entries = self.inner.lock();
    let entry = entries
      .entry(key.clone())
      .or_insert_with(|| Entry::new(seq - 1, QueryOptions::default().gc_time));
    entry.write(seq, Arc::new(data), Instant::now());
  }

  /// Rewrite the payload of every entry under `prefix` that holds a `T`.
  ///
  /// Entries without data are left alone; the next read fetches them cold anyway.
  /// Returns the number of entries changed.
  pub fn update_matching<T, F>(&self, prefix: &QueryKey, mut update: F) -> usize
  where
    T: Clone + Send + Sync + 'static,
    F: FnMut(&mut T),
  {
    let now = Instant::now();
    let mut entries = self.inner.lock();
    let mut changed = 0;
    for (key, entry) in entries.iter_mut().filter(|(k, _)| k.starts_with(prefix)) {
      if entry.is_expired(now) {
        continue;
      }
      let Some(mut value) = entry.data.clone().and_then(|p| downcast::<T>(key, p)) else {
        continue;
      };
      update(&mut value);
      let seq = self.inner.next_seq();
      entry.write(seq, Arc::new(value), now);
      changed += 1;
    }
    changed
  }

  /// Mark every entry under `prefix` stale. The next read revalidates it.
  pub fn invalidate(&self, prefix: &QueryKey) -> usize {
    let mut entries = self.inner.lock();
    let mut count = 0;
    for (_, entry) in entries.iter_mut().filter(|(k, _)| k.starts_with(prefix)) {
      entry.invalidated = true;
      count += 1;
    }
    count
  }

  /// Evict every entry under `prefix`. Running fetches for them are ignored on completion.
  pub fn remove(&self, prefix: &QueryKey) -> usize {
    let mut entries = self.inner.lock();
    let before = entries.len();
    entries.retain(|k, _| !k.starts_with(prefix));
    before - entries.len()
  }

  /// Evict everything.
  pub fn clear(&self) {
    self.inner.lock().clear();
  }

  /// Evict entries older than their GC window that have no fetch running.
  pub fn sweep(&self) -> usize {
    let now = Instant::now();
    let mut entries = self.inner.lock();
    let before = entries.len();
    entries.retain(|_, e| e.inflight.is_some() || !(e.is_expired(now) || e.data.is_none()));
    before - entries.len()
  }

  pub fn contains(&self, key: &QueryKey) -> bool {
    self.inner.lock().contains_key(key)
  }

  fn start_fetch<T, F, Fut>(&self, key: &QueryKey, entry: &mut Entry, fetcher: F) -> SharedFetch
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ApiResult<T>> + Send + 'static,
  {
    let seq = self.inner.next_seq();
    let inner = Arc::clone(&self.inner);
    let settle_key = key.clone();
    let future = fetcher();
    debug!(%key, seq, "starting query fetch");

    let fetch = async move {
      let result = future.await.map(|data| Arc::new(data) as Payload);
      inner.settle(&settle_key, seq, &result);
      result
    }
    .boxed()
    .shared();

    entry.inflight = Some(InFlight {
      seq,
      fetch: fetch.clone(),
    });
    fetch
  }
}

/// Drive a fetch to completion whether or not anyone is waiting on it.
fn spawn_fetch(fetch: SharedFetch) {
  tokio::spawn(fetch.map(|_| ()));
}

fn downcast<T: Clone + Send + Sync + 'static>(key: &QueryKey, payload: Payload) -> Option<T> {
  match payload.downcast_ref::<T>() {
    Some(value) => Some(value.clone()),
    None => {
      warn!(%key, "query data has an unexpected type");
      None
    }
  }
}

fn type_mismatch(key: &QueryKey) -> ApiError {
  ApiError::Decode(format!("cached data for {} has an unexpected type", key))
}

fn snapshot_from<T: Clone + Send + Sync + 'static>(
  key: &QueryKey,
  payload: Payload,
  at: Instant,
  is_fetching: bool,
) -> QuerySnapshot<T> {
  match downcast::<T>(key, payload) {
    Some(data) => QuerySnapshot {
      data: Some(data),
      error: None,
      is_loading: false,
      is_fetching,
      updated_at: Some(at),
    },
    None => QuerySnapshot {
      error: Some(type_mismatch(key)),
      ..QuerySnapshot::empty()
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::AtomicU32;

  fn key(name: &str) -> QueryKey {
    QueryKey::root("test").child(name)
  }

  fn counting_fetcher(
    counter: &Arc<AtomicU32>,
    value: i32,
  ) -> impl FnOnce() -> BoxFuture<'static, ApiResult<i32>> {
    let counter = Arc::clone(counter);
    move || {
      async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(value)
      }
      .boxed()
    }
  }

  /// Let spawned background fetches run.
  async fn settle_tasks() {
    for _ in 0..10 {
      tokio::task::yield_now().await;
    }
  }

  #[tokio::test]
  async fn test_cold_fetch_then_fresh_hit() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));

    let first = cache
      .query(&key("a"), QueryOptions::default(), counting_fetcher(&calls, 1))
      .await;
    assert_eq!(first.data, Some(1));
    assert!(!first.is_fetching);

    let second = cache
      .query(&key("a"), QueryOptions::default(), counting_fetcher(&calls, 2))
      .await;
    assert_eq!(second.data, Some(1));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_stale_entry_served_and_revalidated() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));
    let options = QueryOptions::default()
      .with_stale_time(Duration::from_secs(60))
      .with_gc_time(Duration::from_secs(600));

    cache
      .query(&key("a"), options, counting_fetcher(&calls, 1))
      .await;
    tokio::time::advance(Duration::from_secs(61)).await;

    let stale = cache
      .query(&key("a"), options, counting_fetcher(&calls, 2))
      .await;
    assert_eq!(stale.data, Some(1));
    assert!(stale.is_fetching);

    settle_tasks().await;
    assert_eq!(cache.get_query_data::<i32>(&key("a")), Some(2));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_expired_entry_is_cold_fetched() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));
    let options = QueryOptions::default()
      .with_stale_time(Duration::from_secs(60))
      .with_gc_time(Duration::from_secs(120));

    cache
      .query(&key("a"), options, counting_fetcher(&calls, 1))
      .await;
    tokio::time::advance(Duration::from_secs(121)).await;

    assert!(cache.peek::<i32>(&key("a")).data.is_none());
    let snapshot = cache
      .query(&key("a"), options, counting_fetcher(&calls, 2))
      .await;
    assert_eq!(snapshot.data, Some(2));
    assert!(!snapshot.is_fetching);
  }

  #[tokio::test]
  async fn test_concurrent_queries_share_one_fetch() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));

    let make = || {
      let calls = Arc::clone(&calls);
      move || {
        async move {
          calls.fetch_add(1, Ordering::SeqCst);
          tokio::time::sleep(Duration::from_millis(20)).await;
          Ok::<_, ApiError>(vec!["shared".to_string()])
        }
        .boxed()
      }
    };

    let k = key("list");
    let (a, b, c) = tokio::join!(
      cache.query(&k, QueryOptions::default(), make()),
      cache.query(&k, QueryOptions::default(), make()),
      cache.query(&k, QueryOptions::default(), make()),
    );

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(a.data, Some(vec!["shared".to_string()]));
    assert_eq!(a.data, b.data);
    assert_eq!(b.data, c.data);
  }

  #[tokio::test]
  async fn test_disabled_query_never_fetches() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));

    let snapshot = cache
      .query(
        &key("a"),
        QueryOptions::default().enabled(false),
        counting_fetcher(&calls, 1),
      )
      .await;
    assert!(snapshot.data.is_none());
    assert!(!snapshot.is_loading);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_error_is_reported_and_shared() {
    let cache = QueryCache::new();
    let snapshot = cache
      .query(&key("a"), QueryOptions::default(), || async {
        Err::<i32, _>(ApiError::Timeout)
      })
      .await;
    assert_eq!(snapshot.error, Some(ApiError::Timeout));
    assert!(snapshot.data.is_none());
    assert_eq!(cache.peek::<i32>(&key("a")).error, Some(ApiError::Timeout));
  }

  #[tokio::test]
  async fn test_slow_older_fetch_does_not_overwrite_newer() {
    let cache = QueryCache::new();
    let k = key("a");
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

    // First fetch blocks until released.
    let slow = cache.clone();
    let slow_key = k.clone();
    let slow_task = tokio::spawn(async move {
      slow
        .query(&slow_key, QueryOptions::default(), move || async move {
          let _ = release_rx.await;
          Ok::<_, ApiError>("old")
        })
        .await
    });
    settle_tasks().await;

    // A forced refetch starts later and finishes first.
    let newer = cache
      .refetch(&k, QueryOptions::default(), || async { Ok::<_, ApiError>("new") })
      .await;
    assert_eq!(newer, Ok("new"));

    let _ = release_tx.send(());
    let _ = slow_task.await;
    settle_tasks().await;

    assert_eq!(cache.get_query_data::<&str>(&k), Some("new"));
  }

  #[tokio::test]
  async fn test_direct_write_beats_inflight_fetch() {
    let cache = QueryCache::new();
    let k = key("a");
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

    let started = cache.prefetch(&k, QueryOptions::default(), move || async move {
      let _ = release_rx.await;
      Ok::<_, ApiError>(1)
    });
    assert!(started);
    assert!(cache.peek::<i32>(&k).is_loading);

    cache.set_query_data(&k, 99);
    let _ = release_tx.send(());
    settle_tasks().await;

    assert_eq!(cache.get_query_data::<i32>(&k), Some(99));
    assert!(!cache.peek::<i32>(&k).is_fetching);
  }

  #[tokio::test]
  async fn test_removed_entry_ignores_late_result() {
    let cache = QueryCache::new();
    let k = key("a");
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

    cache.prefetch(&k, QueryOptions::default(), move || async move {
      let _ = release_rx.await;
      Ok::<_, ApiError>(1)
    });
    assert_eq!(cache.remove(&k), 1);
    let _ = release_tx.send(());
    settle_tasks().await;

    assert!(!cache.contains(&k));
  }

  #[tokio::test]
  async fn test_update_matching_and_invalidate() {
    let cache = QueryCache::new();
    let lists = QueryKey::root("cards").child("list");
    cache.set_query_data(&lists, vec![1, 2]);
    cache.set_query_data(&lists.child("favorites"), vec![2]);
    cache.set_query_data(&QueryKey::root("other"), vec![7]);

    let changed = cache.update_matching::<Vec<i32>, _>(&lists, |v| v.retain(|x| *x != 2));
    assert_eq!(changed, 2);
    assert_eq!(cache.get_query_data::<Vec<i32>>(&lists), Some(vec![1]));
    assert_eq!(
      cache.get_query_data::<Vec<i32>>(&QueryKey::root("other")),
      Some(vec![7])
    );

    assert_eq!(cache.invalidate(&QueryKey::root("cards")), 2);
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = Arc::clone(&calls);
    let snapshot = cache
      .query(&lists, QueryOptions::default(), move || async move {
        calls_clone.fetch_add(1, Ordering::SeqCst);
        Ok::<_, ApiError>(vec![1, 3])
      })
      .await;
    // Invalidated data is still served while the refetch runs.
    assert_eq!(snapshot.data, Some(vec![1]));
    assert!(snapshot.is_fetching);
    settle_tasks().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.get_query_data::<Vec<i32>>(&lists), Some(vec![1, 3]));
  }

  #[tokio::test(start_paused = true)]
  async fn test_sweep_evicts_expired_entries() {
    let cache = QueryCache::new();
    let options = QueryOptions::default().with_gc_time(Duration::from_secs(10));
    cache
      .query(&key("a"), options, || async { Ok::<_, ApiError>(1) })
      .await;
    assert_eq!(cache.sweep(), 0);

    tokio::time::advance(Duration::from_secs(11)).await;
    assert_eq!(cache.sweep(), 1);
    assert!(!cache.contains(&key("a")));
  }
}
