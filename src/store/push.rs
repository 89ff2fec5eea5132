use std::sync::Arc;
use tracing::warn;

use crate::cache::KeyValueStorage;

const PUSH_NAMESPACE: &str = "push-storage";
const TOKEN_KEY: &str = "token";

/// Remembers the device token last registered with the backend, so it can be
/// unregistered on logout.
#[derive(Clone)]
pub struct PushTokenStore {
  storage: Arc<dyn KeyValueStorage>,
}

impl PushTokenStore {
  pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
    Self { storage }
  }

  pub fn current(&self) -> Option<String> {
    self
      .storage
      .get::<String>(PUSH_NAMESPACE, TOKEN_KEY)
      .unwrap_or_else(|e| {
        warn!(error = %e, "failed to read push token");
        None
      })
  }

  pub fn set(&self, token: &str) {
    if let Err(e) = self.storage.put(PUSH_NAMESPACE, TOKEN_KEY, &token) {
      warn!(error = %e, "failed to persist push token");
    }
  }

  pub fn clear(&self) {
    if let Err(e) = self.storage.remove(PUSH_NAMESPACE, TOKEN_KEY) {
      warn!(error = %e, "failed to clear push token");
    }
  }
}
