//! Debounced word suggestions.
//!
//! Each keystroke re-arms a timer; only input that sits still for the debounce
//! window reaches the server. Results come back over a channel and are picked
//! up with [`WordSuggester::poll`] or [`WordSuggester::next`].

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::{FlashcardApi, SuggestionQuery};

/// A cancellable scheduled task. Scheduling again, cancelling, or dropping the
/// debouncer aborts whatever was pending.
pub struct Debouncer {
  delay: Duration,
  pending: Option<JoinHandle<()>>,
}

impl Debouncer {
  pub fn new(delay: Duration) -> Self {
    Self {
      delay,
      pending: None,
    }
  }

  /// Run `task` after the delay, replacing anything already scheduled.
  pub fn schedule<F>(&mut self, task: F)
  where
    F: Future<Output = ()> + Send + 'static,
  {
    self.cancel();
    let delay = self.delay;
    self.pending = Some(tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      task.await;
    }));
  }

  pub fn cancel(&mut self) {
    if let Some(handle) = self.pending.take() {
      handle.abort();
    }
  }

  pub fn is_pending(&self) -> bool {
    self.pending.as_ref().is_some_and(|h| !h.is_finished())
  }
}

impl Drop for Debouncer {
  fn drop(&mut self) {
    self.cancel();
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Suggestions {
  /// The input these words were fetched for.
  pub input: String,
  pub words: Vec<String>,
}

pub struct WordSuggester {
  api: FlashcardApi,
  limit: u32,
  debouncer: Debouncer,
  tx: mpsc::UnboundedSender<Suggestions>,
  rx: mpsc::UnboundedReceiver<Suggestions>,
  current: Suggestions,
}

impl WordSuggester {
  pub fn new(api: FlashcardApi, debounce: Duration, limit: u32) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      api,
      limit,
      debouncer: Debouncer::new(debounce),
      tx,
      rx,
      current: Suggestions::default(),
    }
  }

  /// Feed the latest input. Input too short to search clears the suggestions
  /// at once and never reaches the network.
  pub fn input(&mut self, text: &str) {
    let query = match SuggestionQuery::new(text, self.limit) {
      Ok(query) => query,
      Err(_) => {
        self.debouncer.cancel();
        self.current = Suggestions {
          input: text.to_string(),
          words: Vec::new(),
        };
        return;
      }
    };

    let api = self.api.clone();
    let tx = self.tx.clone();
    self.debouncer.schedule(async move {
      let words = match api.suggestions(&query).await {
        Ok(words) => words,
        Err(e) => {
          warn!(input = query.text(), error = %e, "suggestion lookup failed");
          Vec::new()
        }
      };
      debug!(input = query.text(), count = words.len(), "suggestions");
      // Receiver gone means the suggester was dropped; nothing to deliver to.
      let _ = tx.send(Suggestions {
        input: query.text().to_string(),
        words,
      });
    });
  }

  /// Pick up any delivered result without waiting. Returns whether it changed.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Ok(next) = self.rx.try_recv() {
      self.current = next;
      changed = true;
    }
    changed
  }

  /// Wait for the next delivered result. `None` when nothing is scheduled.
  pub async fn next(&mut self) -> Option<&Suggestions> {
    let pending = self.debouncer.is_pending();
    let next = match self.rx.try_recv() {
      Ok(next) => next,
      Err(_) if !pending => return None,
      Err(_) => self.rx.recv().await?,
    };
    self.current = next;
    Some(&self.current)
  }

  pub fn current(&self) -> &Suggestions {
    &self.current
  }

  pub fn is_pending(&self) -> bool {
    self.debouncer.is_pending()
  }
}
