//! Named-instance registry for breakers and caches.

use std::collections::HashMap;
use std::hash::Hash;

use ahash::RandomState;
use parking_lot::RwLock;

use crate::breaker::CircuitBreaker;
use crate::cache::KeyedTtlCache;

/// Instances that can be returned to their initial state by an operator.
pub trait Resettable {
    /// Restores the instance to its initial state.
    fn reset(&self);
}

impl Resettable for CircuitBreaker {
    fn reset(&self) {
        CircuitBreaker::reset(self)
    }
}

impl<K, V, E> Resettable for KeyedTtlCache<K, V, E>
where
    K: Eq + Hash,
{
    fn reset(&self) {
        self.clear()
    }
}

/// An explicit lookup of named instances.
///
/// Owned by the composition root and passed where needed; nothing here is
/// process-global. Instances are registered once at startup and retrieved
/// by name; `Clone`-able handles (breakers and caches share state through
/// an inner `Arc`) come back by value.
pub struct Registry<T> {
    slots: RwLock<HashMap<String, T, RandomState>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Registry<T> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::with_hasher(RandomState::new())),
        }
    }

    /// Registers `instance` under `name`, returning the previous holder of
    /// that name if any.
    pub fn register(&self, name: impl Into<String>, instance: T) -> Option<T> {
        self.slots.write().insert(name.into(), instance)
    }

    /// Number of registered instances.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Whether the registry holds no instances.
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

impl<T: Clone> Registry<T> {
    /// Returns a handle to the instance registered under `name`.
    pub fn get(&self, name: &str) -> Option<T> {
        self.slots.read().get(name).cloned()
    }
}

impl<T: Resettable> Registry<T> {
    /// Resets the instance registered under `name`. Returns `false` if the
    /// name is unknown.
    pub fn reset(&self, name: &str) -> bool {
        match self.slots.read().get(name) {
            Some(instance) => {
                instance.reset();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BreakerBuilder;
    use crate::metrics::CallOutcome;
    use crate::state::State;
    use std::time::Duration;

    #[test]
    fn registered_breakers_are_shared_handles() {
        let registry = Registry::new();
        let breaker = BreakerBuilder::new()
            .window_size(2)
            .minimum_calls(2)
            .build()
            .unwrap();
        registry.register("external-api", breaker.clone());

        let handle = registry.get("external-api").unwrap();
        handle.force_open();
        assert_eq!(breaker.current_state(), State::Open);
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn reset_by_name() {
        let registry = Registry::new();
        let breaker = BreakerBuilder::new()
            .window_size(2)
            .minimum_calls(2)
            .build()
            .unwrap();
        registry.register("external-api", breaker.clone());

        for _ in 0..2 {
            assert!(breaker.try_acquire());
            breaker.record(CallOutcome::Failure, Duration::ZERO);
        }
        assert_eq!(breaker.current_state(), State::Open);

        assert!(registry.reset("external-api"));
        assert_eq!(breaker.current_state(), State::Closed);
        assert!(!registry.reset("unknown"));
    }

    #[test]
    fn cache_registry_resets_by_clearing() {
        let registry: Registry<KeyedTtlCache<u64, String, String>> = Registry::new();
        let cache = KeyedTtlCache::new(Duration::from_secs(60));
        registry.register("products", cache.clone());

        cache.get_or_load(1, || Ok("a".to_string())).unwrap();
        assert_eq!(cache.len(), 1);

        assert!(registry.reset("products"));
        assert!(cache.is_empty());
    }
}
