use std::time::Duration;
use tracing::debug;

use super::keys;
use crate::api::types::{NotificationHistory, NotificationHistoryParams, NotificationPreferences};
use crate::api::NotificationApi;
use crate::error::ApiResult;
use crate::query::{QueryCache, QueryObserver, QueryOptions, QuerySnapshot};
use crate::store::{PushTokenStore, SessionStore};

const PREFERENCES_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Notification preferences, history and push registration.
///
/// Every read is gated on the session: while logged out nothing is fetched
/// and the snapshot only reports what is cached.
#[derive(Clone)]
pub struct NotificationQueries {
  cache: QueryCache,
  api: NotificationApi,
  session: SessionStore,
  push: PushTokenStore,
  options: QueryOptions,
  history_stale_time: Duration,
}

impl NotificationQueries {
  pub fn new(
    cache: QueryCache,
    api: NotificationApi,
    session: SessionStore,
    push: PushTokenStore,
    options: QueryOptions,
    history_stale_time: Duration,
  ) -> Self {
    Self {
      cache,
      api,
      session,
      push,
      options,
      history_stale_time,
    }
  }

  fn preference_options(&self) -> QueryOptions {
    self
      .options
      .with_stale_time(PREFERENCES_STALE_TIME)
      .enabled(self.session.is_authenticated())
  }

  fn history_options(&self) -> QueryOptions {
    self
      .options
      .with_stale_time(self.history_stale_time)
      .enabled(self.session.is_authenticated())
  }

  pub async fn preferences(&self) -> QuerySnapshot<NotificationPreferences> {
    let api = self.api.clone();
    self
      .cache
      .query(
        &keys::notification_preferences(),
        self.preference_options(),
        move || async move { api.preferences().await },
      )
      .await
  }

  /// A long-lived handle on the preferences query. Its enabled flag starts out
  /// matching the session; flip it as the session changes.
  pub fn preferences_observer(&self) -> QueryObserver<NotificationPreferences> {
    let api = self.api.clone();
    QueryObserver::new(
      self.cache.clone(),
      keys::notification_preferences(),
      self.preference_options(),
      move || {
        let api = api.clone();
        async move { api.preferences().await }
      },
    )
  }

  /// Save preferences; the cached copy is marked stale so the next read
  /// comes from the server.
  pub async fn update_preferences(
    &self,
    prefs: &NotificationPreferences,
  ) -> ApiResult<NotificationPreferences> {
    let saved = self.api.update_preferences(prefs).await?;
    let marked = self.cache.invalidate(&keys::notification_preferences());
    debug!(marked, "notification preferences saved");
    Ok(saved)
  }

  pub async fn history(
    &self,
    params: &NotificationHistoryParams,
  ) -> QuerySnapshot<NotificationHistory> {
    let api = self.api.clone();
    let fetch_params = params.clone();
    self
      .cache
      .query(
        &keys::notification_history(params),
        self.history_options(),
        move || async move { api.history(&fetch_params).await },
      )
      .await
  }

  /// Unread notifications on the given page; zero when nothing is loaded.
  pub async fn unread_count(&self, params: &NotificationHistoryParams) -> usize {
    self
      .history(params)
      .await
      .data
      .map_or(0, |history| history.unread_count())
  }

  /// Register this device for push. Remembers the token on success.
  pub async fn register_push(&self, token: &str, platform: &str) -> bool {
    let registered = self.api.register_push_token(token, platform).await;
    if registered {
      self.push.set(token.trim());
    }
    registered
  }

  /// Unregister the remembered token. The local copy is forgotten either way.
  pub async fn unregister_push(&self) -> bool {
    let Some(token) = self.push.current() else {
      return false;
    };
    let removed = self.api.unregister_push_token(&token).await;
    self.push.clear();
    removed
  }

  pub fn push_token(&self) -> Option<String> {
    self.push.current()
  }
}
