//! Query cache that orchestrates cached reads, request coalescing and invalidation.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::storage::{Payload, Storage};
use super::traits::{Invalidation, QueryKey, Watch};

/// A cached payload was read back as a different type than it was stored with.
#[derive(Debug, Clone)]
pub struct TypeMismatch {
  pub key: String,
}

type SharedFetch<E> = Shared<BoxFuture<'static, Result<Payload, E>>>;

struct InFlight<E> {
  id: u64,
  /// Entry generation when the request started
  generation: u64,
  request: SharedFetch<E>,
}

struct State<K: QueryKey, E> {
  storage: Storage<K>,
  in_flight: HashMap<K, InFlight<E>>,
}

struct Inner<K: QueryKey, E> {
  state: Mutex<State<K, E>>,
  keep_unused_for: Duration,
  next_request_id: AtomicU64,
}

/// Process-wide query cache.
///
/// Cheap to clone; every clone shares the same entries. Only the data access layer
/// should call `fetch` and `invalidate`; views hold `Subscription`s.
pub struct QueryCache<K: QueryKey, E> {
  inner: Arc<Inner<K, E>>,
}

impl<K, E> QueryCache<K, E>
where
  K: QueryKey,
  E: Clone + Display + From<TypeMismatch> + Send + Sync + 'static,
{
  /// Create a cache that drops unobserved entries after `keep_unused_for`.
  pub fn new(keep_unused_for: Duration) -> Self {
    Self {
      inner: Arc::new(Inner {
        state: Mutex::new(State {
          storage: Storage::default(),
          in_flight: HashMap::new(),
        }),
        keep_unused_for,
        next_request_id: AtomicU64::new(1),
      }),
    }
  }

  fn lock(&self) -> MutexGuard<'_, State<K, E>> {
    // Entries are plain data; a panic elsewhere can't leave them half-written
    self
      .inner
      .state
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
  }

  /// Read `key`, going to the network only when needed.
  ///
  /// 1. Fresh entry: return it, no request
  /// 2. Identical request in flight since the last invalidation: wait for that one
  /// 3. Otherwise call `fetcher` and store the result on success
  ///
  /// Errors are returned to every waiter and never cached.
  pub async fn fetch<T, F, Fut>(&self, key: K, fetcher: F) -> Result<T, E>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
  {
    let request = {
      let mut state = self.lock();

      if let Some(entry) = state.storage.get(&key) {
        if let Some(payload) = entry.fresh_payload() {
          trace!(
            key = %key.description(),
            age = ?entry.fetched_at.map(|at| at.elapsed()),
            "cache hit"
          );
          return downcast(payload, &key);
        }
      }

      let generation = state.storage.track(&key);
      // A request that started before an invalidation can't satisfy this read
      match state
        .in_flight
        .get(&key)
        .filter(|flight| flight.generation == generation)
      {
        Some(flight) => {
          trace!(key = %key.description(), "joining in-flight request");
          flight.request.clone()
        }
        None => {
          let id = self.inner.next_request_id.fetch_add(1, Ordering::Relaxed);
          debug!(key = %key.description(), generation, "cache miss, fetching");

          let cache = self.clone();
          let flight_key = key.clone();
          let pending = fetcher();
          let request = async move {
            let result = pending.await.map(|data| Arc::new(data) as Payload);
            cache.finish(&flight_key, id, generation, &result);
            result
          }
          .boxed()
          .shared();

          state.in_flight.insert(
            key.clone(),
            InFlight {
              id,
              generation,
              request: request.clone(),
            },
          );
          request
        }
      }
    };

    let payload = request.await?;
    downcast(payload, &key)
  }

  fn finish(&self, key: &K, id: u64, generation: u64, result: &Result<Payload, E>) {
    let mut state = self.lock();
    if state.in_flight.get(key).map(|f| f.id) == Some(id) {
      state.in_flight.remove(key);
    }
    match result {
      Ok(payload) => state.storage.store(key, Arc::clone(payload), generation),
      Err(e) => warn!(key = %key.description(), error = %e, "fetch failed"),
    }
  }

  /// Mark matching entries stale so subscribers refetch.
  pub fn invalidate(&self, invalidations: &[Invalidation<K>]) {
    let hit = self.lock().storage.invalidate(invalidations);
    debug!(
      invalidations = ?invalidations,
      hit = hit.len(),
      "invalidated cache entries"
    );
  }

  /// Start observing `key`. The entry is kept alive while the subscription lives.
  pub fn subscribe(&self, key: K) -> Subscription<K, E> {
    let seen_generation = self.lock().storage.subscribe(&key);
    Subscription {
      cache: self.clone(),
      key,
      seen_generation,
    }
  }

  /// Drop entries that nobody has observed for `keep_unused_for`.
  pub fn collect_garbage(&self) -> usize {
    let mut state = self.lock();
    let pinned: Vec<K> = state.in_flight.keys().cloned().collect();
    let removed = state
      .storage
      .collect_garbage(self.inner.keep_unused_for, &pinned);
    if removed > 0 {
      debug!(
        removed,
        remaining = state.storage.len(),
        "collected unused cache entries"
      );
    }
    removed
  }

  /// Whether `key` can currently be served without a request
  #[cfg(test)]
  pub fn is_fresh(&self, key: &K) -> bool {
    self
      .lock()
      .storage
      .get(key)
      .map(|e| !e.stale && e.payload.is_some())
      .unwrap_or(false)
  }

  fn unsubscribe(&self, key: &K) {
    self.lock().storage.unsubscribe(key);
  }

  fn generation(&self, key: &K) -> u64 {
    self.lock().storage.generation(key)
  }
}

impl<K: QueryKey, E> Clone for QueryCache<K, E> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

fn downcast<T, K, E>(payload: Payload, key: &K) -> Result<T, E>
where
  T: Clone + 'static,
  K: QueryKey,
  E: From<TypeMismatch>,
{
  payload.downcast_ref::<T>().cloned().ok_or_else(|| {
    E::from(TypeMismatch {
      key: key.description(),
    })
  })
}

/// A view's interest in one cache key.
///
/// Dropping it releases the entry for garbage collection.
pub struct Subscription<K, E>
where
  K: QueryKey,
  E: Clone + Display + From<TypeMismatch> + Send + Sync + 'static,
{
  cache: QueryCache<K, E>,
  key: K,
  seen_generation: u64,
}

impl<K, E> Watch for Subscription<K, E>
where
  K: QueryKey,
  E: Clone + Display + From<TypeMismatch> + Send + Sync + 'static,
{
  fn take_invalidated(&mut self) -> bool {
    let current = self.cache.generation(&self.key);
    if current != self.seen_generation {
      self.seen_generation = current;
      true
    } else {
      false
    }
  }
}

impl<K, E> Drop for Subscription<K, E>
where
  K: QueryKey,
  E: Clone + Display + From<TypeMismatch> + Send + Sync + 'static,
{
  fn drop(&mut self) {
    self.cache.unsubscribe(&self.key);
  }
}
