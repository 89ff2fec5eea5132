use tokio::sync::broadcast;

use crate::api::types::User;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
  /// The user asked to log out
  UserRequested,
  /// The backend rejected the session with a 401
  Unauthorized,
}

/// Session lifecycle events
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
  LoggedIn(User),
  /// Identity details changed (profile edit, `/auth/me` refresh)
  UserUpdated(User),
  LoggedOut(LogoutReason),
}

/// Fan-out channel for session events. Lagging receivers lose old events, never block senders.
#[derive(Debug, Clone)]
pub struct EventBus {
  tx: broadcast::Sender<SessionEvent>,
}

impl Default for EventBus {
  fn default() -> Self {
    Self::new()
  }
}

impl EventBus {
  pub fn new() -> Self {
    let (tx, _rx) = broadcast::channel(32);
    Self { tx }
  }

  /// Publish an event. Having no subscribers is fine.
  pub fn emit(&self, event: SessionEvent) {
    let _ = self.tx.send(event);
  }

  pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
    self.tx.subscribe()
  }
}
