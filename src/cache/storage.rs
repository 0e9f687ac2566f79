//! In-memory entry table behind the query cache.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::traits::{Invalidation, QueryKey};

/// Type-erased cached payload
pub type Payload = Arc<dyn Any + Send + Sync>;

/// A single cache entry.
#[derive(Clone)]
pub struct Entry {
  /// Last successful result, if any
  pub payload: Option<Payload>,
  /// Set by invalidation, cleared by a fetch that started after it
  pub stale: bool,
  /// Bumped on every invalidation that hits this entry
  pub generation: u64,
  /// Number of live subscriptions
  pub subscribers: usize,
  /// When the payload was stored
  pub fetched_at: Option<Instant>,
  /// Generation the stored payload's request started at
  payload_generation: Option<u64>,
  /// When the last subscriber went away (or the entry was created without one)
  pub unobserved_since: Option<Instant>,
}

impl Entry {
  fn new() -> Self {
    Self {
      payload: None,
      stale: false,
      generation: 0,
      subscribers: 0,
      fetched_at: None,
      payload_generation: None,
      unobserved_since: Some(Instant::now()),
    }
  }

  /// Payload that can be served without a network call
  pub fn fresh_payload(&self) -> Option<Payload> {
    if self.stale {
      None
    } else {
      self.payload.clone()
    }
  }
}

/// Entry table keyed by query key.
///
/// Not synchronized on its own; `QueryCache` guards it with a mutex.
pub struct Storage<K: QueryKey> {
  entries: HashMap<K, Entry>,
}

impl<K: QueryKey> Default for Storage<K> {
  fn default() -> Self {
    Self {
      entries: HashMap::new(),
    }
  }
}

impl<K: QueryKey> Storage<K> {
  pub fn get(&self, key: &K) -> Option<&Entry> {
    self.entries.get(key)
  }

  fn entry_mut(&mut self, key: &K) -> &mut Entry {
    self.entries.entry(key.clone()).or_insert_with(Entry::new)
  }

  /// Current generation for a key (0 if never seen)
  pub fn generation(&self, key: &K) -> u64 {
    self.entries.get(key).map(|e| e.generation).unwrap_or(0)
  }

  /// Make sure an entry exists so invalidations during a fetch are recorded,
  /// and return its generation.
  pub fn track(&mut self, key: &K) -> u64 {
    self.entry_mut(key).generation
  }

  /// Store a fetch result.
  ///
  /// `started_at_generation` is the generation observed when the fetch began; if the
  /// entry was invalidated while the request was in flight, the result is kept but
  /// stays stale. A result older than the stored one is dropped.
  pub fn store(&mut self, key: &K, payload: Payload, started_at_generation: u64) {
    let entry = self.entry_mut(key);
    if entry
      .payload_generation
      .is_some_and(|stored| stored > started_at_generation)
    {
      return;
    }
    entry.payload = Some(payload);
    entry.payload_generation = Some(started_at_generation);
    entry.fetched_at = Some(Instant::now());
    entry.stale = entry.generation != started_at_generation;
  }

  /// Mark every matching entry stale. Returns the keys that were hit.
  pub fn invalidate(&mut self, invalidations: &[Invalidation<K>]) -> Vec<K> {
    let mut hit = Vec::new();
    for (key, entry) in self.entries.iter_mut() {
      if invalidations.iter().any(|inv| inv.matches(key)) {
        entry.stale = true;
        entry.generation += 1;
        hit.push(key.clone());
      }
    }
    hit
  }

  pub fn subscribe(&mut self, key: &K) -> u64 {
    let entry = self.entry_mut(key);
    entry.subscribers += 1;
    entry.unobserved_since = None;
    entry.generation
  }

  pub fn unsubscribe(&mut self, key: &K) {
    if let Some(entry) = self.entries.get_mut(key) {
      entry.subscribers = entry.subscribers.saturating_sub(1);
      if entry.subscribers == 0 {
        entry.unobserved_since = Some(Instant::now());
      }
    }
  }

  /// Drop entries nobody has observed for longer than `keep_unused_for`,
  /// skipping keys in `pinned`.
  pub fn collect_garbage(&mut self, keep_unused_for: Duration, pinned: &[K]) -> usize {
    let before = self.entries.len();
    self.entries.retain(|key, entry| {
      if entry.subscribers > 0 || pinned.contains(key) {
        return true;
      }
      match entry.unobserved_since {
        Some(since) => since.elapsed() < keep_unused_for,
        None => true,
      }
    });
    before - self.entries.len()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }
}

#[cfg(test)]
mod tests {
  use super::super::traits::test_keys::{Key, Kind};
  use super::*;

  fn payload(v: u32) -> Payload {
    Arc::new(v)
  }

  #[test]
  fn test_store_then_fresh() {
    let mut storage = Storage::default();
    let key = Key(Kind::List, None);
    storage.store(&key, payload(1), 0);

    let entry = storage.get(&key).unwrap();
    let fresh = entry.fresh_payload().unwrap();
    assert_eq!(fresh.downcast_ref::<u32>(), Some(&1));
  }

  #[test]
  fn test_invalidate_marks_stale_and_bumps_generation() {
    let mut storage = Storage::default();
    let key = Key(Kind::List, None);
    storage.store(&key, payload(1), 0);

    let hit = storage.invalidate(&[Invalidation::Tag(Kind::List)]);
    assert_eq!(hit, vec![key.clone()]);
    let entry = storage.get(&key).unwrap();
    assert!(entry.stale);
    assert!(entry.fresh_payload().is_none());
    assert_eq!(storage.generation(&key), 1);
  }

  #[test]
  fn test_result_landing_after_invalidation_stays_stale() {
    let mut storage = Storage::default();
    let key = Key(Kind::Item, Some(1));
    let started = storage.track(&key);

    storage.invalidate(&[Invalidation::Key(key.clone())]);
    storage.store(&key, payload(7), started);

    assert!(storage.get(&key).unwrap().stale);
  }

  #[test]
  fn test_older_result_does_not_replace_newer_one() {
    let mut storage = Storage::default();
    let key = Key(Kind::List, None);
    let first = storage.track(&key);
    storage.invalidate(&[Invalidation::Tag(Kind::List)]);
    let second = storage.track(&key);

    storage.store(&key, payload(2), second);
    storage.store(&key, payload(1), first);

    let entry = storage.get(&key).unwrap();
    assert!(!entry.stale);
    assert_eq!(entry.fresh_payload().unwrap().downcast_ref::<u32>(), Some(&2));
  }

  #[test]
  fn test_keyed_invalidation_spares_other_items() {
    let mut storage = Storage::default();
    let one = Key(Kind::Item, Some(1));
    let two = Key(Kind::Item, Some(2));
    storage.store(&one, payload(1), 0);
    storage.store(&two, payload(2), 0);

    storage.invalidate(&[Invalidation::Key(one.clone())]);

    assert!(storage.get(&one).unwrap().stale);
    assert!(!storage.get(&two).unwrap().stale);
  }

  #[test]
  fn test_garbage_collection_spares_subscribed_and_pinned() {
    let mut storage = Storage::default();
    let watched = Key(Kind::Item, Some(1));
    let pinned = Key(Kind::Item, Some(2));
    let unused = Key(Kind::Item, Some(3));
    storage.subscribe(&watched);
    storage.store(&pinned, payload(2), 0);
    storage.store(&unused, payload(3), 0);

    let removed = storage.collect_garbage(Duration::ZERO, &[pinned.clone()]);

    assert_eq!(removed, 1);
    assert!(storage.get(&watched).is_some());
    assert!(storage.get(&pinned).is_some());
    assert!(storage.get(&unused).is_none());
  }

  #[test]
  fn test_unsubscribe_starts_unobserved_clock() {
    let mut storage = Storage::default();
    let key = Key(Kind::List, None);
    storage.subscribe(&key);
    assert!(storage.get(&key).unwrap().unobserved_since.is_none());

    storage.unsubscribe(&key);
    assert!(storage.get(&key).unwrap().unobserved_since.is_some());
  }
}
