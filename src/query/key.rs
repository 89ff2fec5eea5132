//! Structured query keys.
//!
//! A key is a path of segments, e.g. `flashcards / detail / <id>`. Prefixes name
//! whole families of entries so they can be invalidated or evicted together.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeySegment {
  Name(String),
  /// Filter parameters. Sorted, so parameter order never splits a cache entry.
  Params(BTreeMap<String, String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<KeySegment>);

impl QueryKey {
  pub fn root(name: &str) -> Self {
    Self(vec![KeySegment::Name(name.to_string())])
  }

  /// Extend the key with a named segment.
  pub fn child(&self, name: &str) -> Self {
    let mut segments = self.0.clone();
    segments.push(KeySegment::Name(name.to_string()));
    Self(segments)
  }

  /// Extend the key with a parameter segment. `None` values are left out.
  pub fn with_params<I, K>(&self, params: I) -> Self
  where
    I: IntoIterator<Item = (K, Option<String>)>,
    K: Into<String>,
  {
    let map = params
      .into_iter()
      .filter_map(|(k, v)| v.map(|v| (k.into(), v)))
      .collect();
    let mut segments = self.0.clone();
    segments.push(KeySegment::Params(map));
    Self(segments)
  }

  /// True when `prefix` names this key or one of its ancestors.
  pub fn starts_with(&self, prefix: &QueryKey) -> bool {
    self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, segment) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str("/")?;
      }
      match segment {
        KeySegment::Name(name) => f.write_str(name)?,
        KeySegment::Params(params) => {
          f.write_str("{")?;
          for (j, (k, v)) in params.iter().enumerate() {
            if j > 0 {
              f.write_str(",")?;
            }
            write!(f, "{}={}", k, v)?;
          }
          f.write_str("}")?;
        }
      }
    }
    Ok(())
  }
}
