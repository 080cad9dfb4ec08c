//! Keyed TTL cache with single-flight load deduplication.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::RandomState;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::{CacheError, CacheResult};

/// The capability set of a result cache backend.
///
/// The in-process implementation is [`KeyedTtlCache`]. A distributed
/// backend (an external key-value store client) implements the same trait
/// out of crate; note that the single-flight guarantee of such a variant
/// holds per process only; no cross-instance coordination is assumed.
pub trait ResultCache<K, V, E> {
    /// Returns the cached value for `key`, or runs `loader` to populate it.
    fn get_or_load<F>(&self, key: K, loader: F) -> CacheResult<V, E>
    where
        F: FnOnce() -> Result<V, E>;

    /// Removes the entry for `key` immediately.
    fn invalidate(&self, key: &K);

    /// Removes all entries immediately.
    fn clear(&self);
}

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// One in-flight load per key. The leader sets the cell exactly once;
/// waiters block on it and share the result.
type FlightCell<V, E> = Arc<OnceCell<Result<V, E>>>;

struct Maps<K, V, E> {
    entries: HashMap<K, Entry<V>, RandomState>,
    flights: HashMap<K, FlightCell<V, E>, RandomState>,
}

struct CacheInner<K, V, E> {
    maps: Mutex<Maps<K, V, E>>,
    ttl: Duration,
}

/// Maps a key to a cached value with expiration and single-flight
/// deduplication of concurrent misses.
///
/// Entries expire `ttl` after they were stored. Expiration is lazy: a read
/// that finds a stale entry evicts it and proceeds as a miss, and no
/// background sweep runs. At most one loader invocation per key is in flight at a
/// time: concurrent callers for a loading key block until that load
/// resolves and share its result. A failed load is propagated to every
/// waiting caller and nothing is stored (no negative caching).
///
/// Cloning shares the underlying cache.
pub struct KeyedTtlCache<K, V, E> {
    inner: Arc<CacheInner<K, V, E>>,
}

enum Role<V, E> {
    Waiter(FlightCell<V, E>),
    Leader(FlightCell<V, E>),
}

impl<K, V, E> KeyedTtlCache<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    /// Creates an empty cache whose entries live for `ttl` after storage.
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                maps: Mutex::new(Maps {
                    entries: HashMap::with_hasher(RandomState::new()),
                    flights: HashMap::with_hasher(RandomState::new()),
                }),
                ttl,
            }),
        }
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Number of stored entries, counting stale ones not yet lazily evicted.
    pub fn len(&self) -> usize {
        self.inner.maps.lock().entries.len()
    }

    /// Whether the cache currently stores no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cached value for `key`, or runs `loader` to populate it.
    ///
    /// Exactly one loader runs per key at a time; concurrent callers block
    /// until it resolves and receive its value (or its error as
    /// [`CacheError::Load`]). The loader runs outside the cache's lock, so
    /// it may block or take arbitrary time without stalling other keys. A
    /// loader that panics unwinds its flight so later callers retry, but
    /// callers already waiting on that flight are not woken; loaders are
    /// expected to report failure through their `Result`.
    pub fn get_or_load<F>(&self, key: K, loader: F) -> CacheResult<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let role = {
            let mut maps = self.inner.maps.lock();

            let expired = match maps.entries.get(&key) {
                Some(entry) if entry.stored_at.elapsed() <= self.inner.ttl => {
                    return Ok(entry.value.clone());
                }
                Some(_) => true,
                None => false,
            };
            if expired {
                maps.entries.remove(&key);
            }

            match maps.flights.get(&key) {
                Some(cell) => Role::Waiter(Arc::clone(cell)),
                None => {
                    let cell: FlightCell<V, E> = Arc::new(OnceCell::new());
                    maps.flights.insert(key.clone(), Arc::clone(&cell));
                    Role::Leader(cell)
                }
            }
        };

        match role {
            Role::Waiter(cell) => cell.wait().clone().map_err(CacheError::Load),
            Role::Leader(cell) => self.lead(key, loader, cell),
        }
    }

    fn lead<F>(&self, key: K, loader: F, cell: FlightCell<V, E>) -> CacheResult<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let mut guard = FlightGuard {
            maps: &self.inner.maps,
            key: &key,
            armed: true,
        };

        // Runs outside the lock.
        let result = loader();
        guard.armed = false;

        {
            let mut maps = self.inner.maps.lock();
            maps.flights.remove(&key);
            if let Ok(value) = &result {
                maps.entries.insert(
                    key.clone(),
                    Entry {
                        value: value.clone(),
                        stored_at: Instant::now(),
                    },
                );
            }
        }

        // Wake waiters last: by now a fresh caller already sees either the
        // stored entry or a clean miss.
        let _ = cell.set(result.clone());
        result.map_err(CacheError::Load)
    }
}

impl<K, V, E> KeyedTtlCache<K, V, E>
where
    K: Eq + Hash,
{
    /// Removes the entry for `key` immediately. A load already in flight
    /// for the key still completes and stores its result.
    pub fn invalidate(&self, key: &K) {
        self.inner.maps.lock().entries.remove(key);
    }

    /// Removes all entries immediately.
    pub fn clear(&self) {
        self.inner.maps.lock().entries.clear();
    }
}

/// Removes the flight marker if the leader unwinds before completing, so
/// later callers start a fresh load instead of waiting forever.
struct FlightGuard<'a, K, V, E>
where
    K: Eq + Hash,
{
    maps: &'a Mutex<Maps<K, V, E>>,
    key: &'a K,
    armed: bool,
}

impl<K, V, E> Drop for FlightGuard<'_, K, V, E>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        if self.armed {
            self.maps.lock().flights.remove(self.key);
        }
    }
}

impl<K, V, E> ResultCache<K, V, E> for KeyedTtlCache<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    fn get_or_load<F>(&self, key: K, loader: F) -> CacheResult<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        KeyedTtlCache::get_or_load(self, key, loader)
    }

    fn invalidate(&self, key: &K) {
        KeyedTtlCache::invalidate(self, key)
    }

    fn clear(&self) {
        KeyedTtlCache::clear(self)
    }
}

// Cloning shares the underlying cache state.
impl<K, V, E> Clone for KeyedTtlCache<K, V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
