//! Cookie jar that outlives the process and can be emptied on logout.

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, RwLock};
use tracing::warn;

use crate::cache::KeyValueStorage;

const COOKIE_NAMESPACE: &str = "cookie-storage";
const COOKIE_KEY: &str = "cookies";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredCookie {
  url: String,
  header: String,
}

impl StoredCookie {
  fn name(&self) -> &str {
    self.header.split('=').next().unwrap_or("").trim()
  }
}

/// Wraps reqwest's `Jar` (which does the parsing and matching) and records raw
/// `Set-Cookie` values so a cookie-backed session can be restored after restart.
pub struct SessionCookies {
  jar: RwLock<Arc<Jar>>,
  stored: Mutex<Vec<StoredCookie>>,
  storage: Arc<dyn KeyValueStorage>,
}

impl SessionCookies {
  /// Load previously persisted cookies into a fresh jar.
  pub fn restore(storage: Arc<dyn KeyValueStorage>) -> Self {
    let stored: Vec<StoredCookie> = storage
      .get(COOKIE_NAMESPACE, COOKIE_KEY)
      .unwrap_or_else(|e| {
        warn!(error = %e, "failed to load persisted cookies");
        None
      })
      .unwrap_or_default();

    let jar = Jar::default();
    for cookie in &stored {
      match Url::parse(&cookie.url) {
        Ok(url) => jar.add_cookie_str(&cookie.header, &url),
        Err(e) => warn!(url = %cookie.url, error = %e, "skipping persisted cookie"),
      }
    }

    Self {
      jar: RwLock::new(Arc::new(jar)),
      stored: Mutex::new(stored),
      storage,
    }
  }

  /// Forget every cookie, in memory and on disk.
  pub fn clear(&self) {
    *self.jar.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(Jar::default());
    self.stored.lock().unwrap_or_else(|e| e.into_inner()).clear();
    if let Err(e) = self.storage.remove(COOKIE_NAMESPACE, COOKIE_KEY) {
      warn!(error = %e, "failed to clear persisted cookies");
    }
  }

  pub fn is_empty(&self) -> bool {
    self
      .stored
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .is_empty()
  }

  fn current_jar(&self) -> Arc<Jar> {
    Arc::clone(&self.jar.read().unwrap_or_else(|e| e.into_inner()))
  }

  fn remember(&self, headers: &[HeaderValue], url: &Url) {
    let mut stored = self.stored.lock().unwrap_or_else(|e| e.into_inner());
    for header in headers {
      let Ok(text) = header.to_str() else {
        continue;
      };
      let cookie = StoredCookie {
        url: url.to_string(),
        header: text.to_string(),
      };
      stored.retain(|c| c.name() != cookie.name());
      stored.push(cookie);
    }
    if let Err(e) = self.storage.put(COOKIE_NAMESPACE, COOKIE_KEY, &*stored) {
      warn!(error = %e, "failed to persist cookies");
    }
  }
}

impl CookieStore for SessionCookies {
  fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
    let headers: Vec<HeaderValue> = cookie_headers.cloned().collect();
    if headers.is_empty() {
      return;
    }
    self
      .current_jar()
      .set_cookies(&mut headers.iter(), url);
    self.remember(&headers, url);
  }

  fn cookies(&self, url: &Url) -> Option<HeaderValue> {
    self.current_jar().cookies(url)
  }
}
