//! FIFO-windowed memoization for job factories
//!
//! [`FifoCache`] wraps a `key -> Job` factory. Successful values are stored
//! with an insertion sequence number; a stored value is served without calling
//! the factory again. Each successful insert evicts every entry whose sequence
//! number is at or below `counter - limit`, so retention follows insertion
//! order, not access recency. Eviction only happens on insert, which means the
//! live set may briefly hold more than `limit` entries. Failures are never
//! cached.

use crate::config::CacheConfig;
use crate::error::ConfigError;
use crate::job::{lock, Job};
use crate::outcome::Outcome;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

type Factory<K, E, A> = dyn Fn(K) -> Job<E, A> + Send + Sync;

struct CacheEntry<A> {
    sequence: u64,
    value: A,
}

struct CacheState<K, A> {
    counter: u64,
    entries: HashMap<K, CacheEntry<A>>,
    /// Insertion log in sequence order; may hold stale records for keys that
    /// were re-inserted later.
    order: VecDeque<(u64, K)>,
}

impl<K, A> CacheState<K, A>
where
    K: Eq + Hash + Clone,
    A: Clone,
{
    fn new() -> Self {
        Self {
            counter: 0,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, key: &K) -> Option<A> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert and evict as a single step
    fn insert(&mut self, key: K, value: A, limit: u64) {
        self.counter += 1;
        let sequence = self.counter;
        self.entries.insert(key.clone(), CacheEntry { sequence, value });
        self.order.push_back((sequence, key));

        let threshold = self.counter.saturating_sub(limit);
        let mut evicted = 0usize;
        while let Some((oldest, _)) = self.order.front() {
            if *oldest > threshold {
                break;
            }
            let Some((oldest, key)) = self.order.pop_front() else {
                break;
            };
            let current = self.entries.get(&key).map(|entry| entry.sequence);
            if current == Some(oldest) {
                self.entries.remove(&key);
                evicted += 1;
            }
        }

        trace!(sequence, evicted, live = self.entries.len(), "fifo cache insert");
    }
}

/// A job factory decorated with a FIFO-windowed cache of successful values
pub struct FifoCache<K, E, A> {
    factory: Arc<Factory<K, E, A>>,
    limit: u64,
    state: Arc<Mutex<CacheState<K, A>>>,
}

impl<K, E, A> Clone for FifoCache<K, E, A> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            limit: self.limit,
            state: Arc::clone(&self.state),
        }
    }
}

impl<K, E, A> fmt::Debug for FifoCache<K, E, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FifoCache")
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl<K, E, A> FifoCache<K, E, A>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    E: Send + 'static,
    A: Clone + Send + 'static,
{
    /// Decorate `factory`, retaining the values of the last `limit` inserts
    pub fn new(factory: impl Fn(K) -> Job<E, A> + Send + Sync + 'static, limit: usize) -> Self {
        Self {
            factory: Arc::new(factory),
            limit: limit as u64,
            state: Arc::new(Mutex::new(CacheState::new())),
        }
    }

    /// Decorate `factory` using a validated [`CacheConfig`]
    pub fn from_config(
        factory: impl Fn(K) -> Job<E, A> + Send + Sync + 'static,
        config: &CacheConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(factory, config.limit))
    }

    /// The job for `key`
    ///
    /// The cache is consulted when the job runs: a stored value resolves
    /// synchronously without touching the factory, otherwise the factory's
    /// job runs and a success is stored.
    pub fn job(&self, key: K) -> Job<E, A> {
        let factory = Arc::clone(&self.factory);
        let state = Arc::clone(&self.state);
        let limit = self.limit;

        Job::new(move |resolver| {
            let cached = lock(&state).get(&key);
            if let Some(value) = cached {
                debug!("fifo cache hit");
                resolver.succeed(value);
                return;
            }

            debug!("fifo cache miss");
            let state = Arc::clone(&state);
            let key = key.clone();
            factory(key.clone()).run_with(move |outcome| {
                if let Outcome::Success(value) = &outcome {
                    lock(&state).insert(key, value.clone(), limit);
                }
                resolver.complete(outcome);
            });
        })
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &K) -> bool {
        lock(&self.state).entries.contains_key(key)
    }

    pub fn limit(&self) -> usize {
        self.limit as usize
    }
}

/// Decorate `factory` with a FIFO cache, returning the `key -> Job` function
pub fn with_fifo_cache<K, E, A>(
    factory: impl Fn(K) -> Job<E, A> + Send + Sync + 'static,
    limit: usize,
) -> impl Fn(K) -> Job<E, A> + Clone + Send + Sync + 'static
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    E: Send + 'static,
    A: Clone + Send + 'static,
{
    let cache = FifoCache::new(factory, limit);
    move |key| cache.job(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::counting_factory;

    #[test]
    fn test_fetches_once_then_serves_from_cache() {
        let (factory, calls) = counting_factory(|k: u32| format!("Hello, {k}"));
        let cached = with_fifo_cache(factory, 10);

        let mut outcomes = Vec::new();
        for _ in 0..3 {
            let job: Job<String, String> = cached(1);
            let (tx, rx) = std::sync::mpsc::channel();
            job.run_with(move |outcome| tx.send(outcome).unwrap());
            outcomes.push(rx.recv().unwrap());
        }

        assert_eq!(outcomes[0], outcomes[1]);
        assert_eq!(outcomes[0], Outcome::Success("Hello, 1".to_string()));
        assert_eq!(calls.count(), 1);
    }

    #[test]
    fn test_eviction_follows_insertion_order() {
        let (factory, calls) = counting_factory(|k: u32| k * 2);
        let cache: FifoCache<u32, String, u32> = FifoCache::new(factory, 3);

        for key in 0..5 {
            cache.job(key).run_with(|_| {});
        }

        // Sequences 1 and 2 fall out of a window of 3 once the counter reaches 5.
        assert!(!cache.contains(&0));
        assert!(!cache.contains(&1));
        assert!(cache.contains(&2));
        assert!(cache.contains(&4));
        assert_eq!(cache.len(), 3);
        assert_eq!(calls.count(), 5);
    }

    #[test]
    fn test_hits_do_not_refresh_position() {
        let (factory, _calls) = counting_factory(|k: u32| k);
        let cache: FifoCache<u32, String, u32> = FifoCache::new(factory, 2);

        cache.job(1).run_with(|_| {});
        cache.job(2).run_with(|_| {});
        // A hit on 1 must not make it younger than 2.
        cache.job(1).run_with(|_| {});
        cache.job(3).run_with(|_| {});

        assert!(!cache.contains(&1));
        assert!(cache.contains(&2));
        assert!(cache.contains(&3));
    }

    #[test]
    fn test_failures_are_not_cached() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache: FifoCache<u32, String, u32> = FifoCache::new(
            move |_key| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Job::fail("unavailable".to_string())
            },
            10,
        );

        cache.job(7).run_with(|_| {});
        cache.job(7).run_with(|_| {});

        assert!(cache.is_empty());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reinserted_key_survives_stale_log_record() {
        let mut state: CacheState<&str, u32> = CacheState::new();
        state.insert("a", 1, 2);
        state.insert("a", 2, 2);
        state.insert("b", 3, 2);

        // The stale record for "a" (sequence 1) must not remove the newer value.
        assert_eq!(state.get(&"a"), Some(2));
        assert_eq!(state.get(&"b"), Some(3));
    }

    #[test]
    fn test_from_config_rejects_zero_limit() {
        let (factory, _calls) = counting_factory(|k: u32| k);
        let result: Result<FifoCache<u32, String, u32>, _> =
            FifoCache::from_config(factory, &CacheConfig { limit: 0 });
        assert!(matches!(result, Err(ConfigError::ZeroCacheLimit)));
    }
}
