//! Core traits and types for the caching system.

use std::fmt::Debug;
use std::hash::Hash;

/// Key identifying one cached query result.
///
/// Every key belongs to a tag. Invalidation can address a whole tag or one key.
pub trait QueryKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {
  type Tag: Copy + Eq + Debug + Send + Sync + 'static;

  /// The tag this key is cached under
  fn tag(&self) -> Self::Tag;

  /// Human readable description for logs
  fn description(&self) -> String;
}

/// What a successful mutation marks stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation<K: QueryKey> {
  /// Every key carrying this tag
  Tag(K::Tag),
  /// Exactly this key
  Key(K),
}

impl<K: QueryKey> Invalidation<K> {
  pub fn matches(&self, key: &K) -> bool {
    match self {
      Invalidation::Tag(tag) => key.tag() == *tag,
      Invalidation::Key(k) => k == key,
    }
  }
}

/// Something a view holds to learn that its data went stale.
pub trait Watch: Send {
  /// Returns true once per invalidation since the last call.
  fn take_invalidated(&mut self) -> bool;
}
