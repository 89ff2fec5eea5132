//! Session store: the single source of truth for "is logged in".
//!
//! Reads are synchronous so the gateway can inspect the session on every
//! request without awaiting. Every change is persisted best-effort and
//! broadcast on the event bus.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

use super::cookies::SessionCookies;
use crate::api::types::User;
use crate::cache::KeyValueStorage;
use crate::event::{EventBus, LogoutReason, SessionEvent};

const AUTH_NAMESPACE: &str = "auth-storage";
const STATE_KEY: &str = "state";

/// Persisted stand-in for "the session lives in an HTTP cookie".
pub const COOKIE_SESSION_MARKER: &str = "cookie";

/// How the backend recognizes this session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SessionToken {
  /// Sent as `Authorization: Bearer <token>`
  Bearer(String),
  /// Carried by the cookie jar; no header is attached
  Cookie,
}

impl From<String> for SessionToken {
  fn from(value: String) -> Self {
    if value == COOKIE_SESSION_MARKER {
      SessionToken::Cookie
    } else {
      SessionToken::Bearer(value)
    }
  }
}

impl From<SessionToken> for String {
  fn from(token: SessionToken) -> Self {
    match token {
      SessionToken::Bearer(value) => value,
      SessionToken::Cookie => COOKIE_SESSION_MARKER.to_string(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
  pub user: Option<User>,
  pub token: Option<SessionToken>,
  pub is_authenticated: bool,
}

impl SessionState {
  fn authenticated(user: User, token: Option<SessionToken>) -> Self {
    Self {
      user: Some(user),
      token,
      is_authenticated: true,
    }
  }

  /// `is_authenticated` holds exactly when there is an identity.
  fn normalized(self) -> Self {
    match self.user {
      Some(user) => Self::authenticated(user, self.token),
      None => Self::default(),
    }
  }
}

struct SessionInner {
  state: RwLock<SessionState>,
  storage: Arc<dyn KeyValueStorage>,
  cookies: Arc<SessionCookies>,
  events: EventBus,
}

#[derive(Clone)]
pub struct SessionStore {
  inner: Arc<SessionInner>,
}

impl SessionStore {
  /// Build the store from whatever was persisted last run.
  pub fn restore(storage: Arc<dyn KeyValueStorage>, events: EventBus) -> Self {
    let state = storage
      .get::<SessionState>(AUTH_NAMESPACE, STATE_KEY)
      .unwrap_or_else(|e| {
        warn!(error = %e, "failed to load persisted session");
        None
      })
      .unwrap_or_default()
      .normalized();
    let cookies = Arc::new(SessionCookies::restore(Arc::clone(&storage)));

    if let Some(user) = &state.user {
      info!(user = %user.email, "restored session");
    }

    Self {
      inner: Arc::new(SessionInner {
        state: RwLock::new(state),
        storage,
        cookies,
        events,
      }),
    }
  }

  fn read(&self) -> RwLockReadGuard<'_, SessionState> {
    self.inner.state.read().unwrap_or_else(|e| e.into_inner())
  }

  fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
    self.inner.state.write().unwrap_or_else(|e| e.into_inner())
  }

  pub fn get_state(&self) -> SessionState {
    self.read().clone()
  }

  pub fn is_authenticated(&self) -> bool {
    self.read().is_authenticated
  }

  pub fn user(&self) -> Option<User> {
    self.read().user.clone()
  }

  /// Token to attach as a bearer header. `None` for cookie-backed or anonymous sessions.
  pub fn bearer_token(&self) -> Option<String> {
    match &self.read().token {
      Some(SessionToken::Bearer(token)) if !token.is_empty() => Some(token.clone()),
      _ => None,
    }
  }

  pub fn cookies(&self) -> Arc<SessionCookies> {
    Arc::clone(&self.inner.cookies)
  }

  pub fn events(&self) -> &EventBus {
    &self.inner.events
  }

  /// Replace the session with a new identity in one step.
  pub fn login(&self, user: User, token: Option<SessionToken>) {
    let state = SessionState::authenticated(user.clone(), token);
    {
      let mut guard = self.write();
      *guard = state.clone();
    }
    self.persist(&state);
    info!(user = %user.email, "logged in");
    self.inner.events.emit(SessionEvent::LoggedIn(user));
  }

  /// Refresh identity details of the current session. Ignored when logged out.
  pub fn update_user(&self, user: User) {
    let state = {
      let mut guard = self.write();
      if !guard.is_authenticated {
        return;
      }
      guard.user = Some(user.clone());
      guard.clone()
    };
    self.persist(&state);
    self.inner.events.emit(SessionEvent::UserUpdated(user));
  }

  /// Clear the session. Safe to call when already logged out: state stays empty,
  /// persisted state and cookies are cleared regardless. Returns whether a
  /// session was actually ended.
  pub fn logout(&self, reason: LogoutReason) -> bool {
    let was_authenticated = {
      let mut guard = self.write();
      let was = guard.is_authenticated;
      *guard = SessionState::default();
      was
    };

    if let Err(e) = self.inner.storage.remove(AUTH_NAMESPACE, STATE_KEY) {
      warn!(error = %e, "failed to clear persisted session");
    }
    self.inner.cookies.clear();

    if was_authenticated {
      info!(?reason, "logged out");
      self.inner.events.emit(SessionEvent::LoggedOut(reason));
    }
    was_authenticated
  }

  fn persist(&self, state: &SessionState) {
    if let Err(e) = self.inner.storage.put(AUTH_NAMESPACE, STATE_KEY, state) {
      warn!(error = %e, "failed to persist session");
    }
  }
}
