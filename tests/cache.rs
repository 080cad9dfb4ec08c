use resilient_call::{BreakerError, CacheError, CircuitBreaker, KeyedTtlCache, ResilientInvoker};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

type Cache = KeyedTtlCache<u64, String, String>;

#[test]
fn concurrent_same_key_misses_share_one_load() {
    const CALLERS: usize = 10;

    let cache = Cache::new(Duration::from_secs(60));
    let loads = Arc::new(AtomicU32::new(0));
    let barrier = Arc::new(Barrier::new(CALLERS));
    let mut handles = Vec::with_capacity(CALLERS);

    for _ in 0..CALLERS {
        let cache = cache.clone();
        let loads = Arc::clone(&loads);
        let barrier = Arc::clone(&barrier);

        handles.push(thread::spawn(move || {
            barrier.wait();
            cache.get_or_load(7, || {
                loads.fetch_add(1, Ordering::SeqCst);
                // Keep the load in flight while the other callers arrive.
                thread::sleep(Duration::from_millis(50));
                Ok("product-7".to_string())
            })
        }));
    }

    for handle in handles {
        let value = handle.join().unwrap().unwrap();
        assert_eq!(value, "product-7");
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_same_key_callers_share_the_leaders_error() {
    const CALLERS: usize = 6;

    let cache = Cache::new(Duration::from_secs(60));
    let loads = Arc::new(AtomicU32::new(0));
    let barrier = Arc::new(Barrier::new(CALLERS));
    let mut handles = Vec::with_capacity(CALLERS);

    for _ in 0..CALLERS {
        let cache = cache.clone();
        let loads = Arc::clone(&loads);
        let barrier = Arc::clone(&barrier);

        handles.push(thread::spawn(move || {
            barrier.wait();
            cache.get_or_load(7, || {
                loads.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                Err("db down".to_string())
            })
        }));
    }

    for handle in handles {
        let result = handle.join().unwrap();
        match result {
            Err(CacheError::Load(msg)) => assert_eq!(msg, "db down"),
            other => panic!("expected a shared load error, got {:?}", other.map(|_| ())),
        }
    }
    // Exactly one loader ran; its failure was not cached.
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(cache.is_empty());
}

#[test]
fn expired_entry_triggers_exactly_one_fresh_load() {
    const CALLERS: usize = 8;

    let cache = Cache::new(Duration::from_millis(30));
    cache.get_or_load(7, || Ok("stale".to_string())).unwrap();
    thread::sleep(Duration::from_millis(50));

    let loads = Arc::new(AtomicU32::new(0));
    let barrier = Arc::new(Barrier::new(CALLERS));
    let mut handles = Vec::with_capacity(CALLERS);

    for _ in 0..CALLERS {
        let cache = cache.clone();
        let loads = Arc::clone(&loads);
        let barrier = Arc::clone(&barrier);

        handles.push(thread::spawn(move || {
            barrier.wait();
            cache.get_or_load(7, || {
                loads.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                Ok("fresh".to_string())
            })
        }));
    }

    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), "fresh");
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[test]
fn a_blocked_key_does_not_stall_other_keys() {
    let cache = Cache::new(Duration::from_secs(60));

    let slow_cache = cache.clone();
    let slow = thread::spawn(move || {
        slow_cache.get_or_load(1, || {
            thread::sleep(Duration::from_millis(100));
            Ok("slow".to_string())
        })
    });

    // Give the slow load time to take the flight for key 1.
    thread::sleep(Duration::from_millis(20));

    let start = std::time::Instant::now();
    let other = cache.get_or_load(2, || Ok("quick".to_string())).unwrap();
    assert_eq!(other, "quick");
    assert!(start.elapsed() < Duration::from_millis(50));

    assert_eq!(slow.join().unwrap().unwrap(), "slow");
}

#[test]
fn cache_loader_composes_with_an_invoker() {
    let breaker = CircuitBreaker::builder()
        .window_size(4)
        .minimum_calls(4)
        .failure_rate_threshold(50.0)
        .build()
        .unwrap();
    let invoker: Arc<ResilientInvoker<String, String>> = Arc::new(
        ResilientInvoker::new(breaker, |_: &BreakerError<String>| {
            Ok("fallback".to_string())
        }),
    );
    let cache = Cache::new(Duration::from_secs(60));

    let downstream_up = Arc::new(AtomicU32::new(0));

    // The loader goes through the breaker. The integrator surfaces a
    // fallback answer as a load error so it never lands in the cache.
    let load = |invoker: Arc<ResilientInvoker<String, String>>, up: Arc<AtomicU32>| {
        move || {
            let value = invoker
                .execute(|| {
                    if up.load(Ordering::SeqCst) == 1 {
                        Ok("live data".to_string())
                    } else {
                        Err("downstream unavailable".to_string())
                    }
                })
                .map_err(|e| e.to_string())?;
            if value == "fallback" {
                Err("degraded, not caching".to_string())
            } else {
                Ok(value)
            }
        }
    };

    // Downstream down: the fallback answer is never cached.
    let result = cache.get_or_load(1, load(Arc::clone(&invoker), Arc::clone(&downstream_up)));
    assert!(result.is_err());
    assert!(cache.is_empty());

    // Downstream recovers: the live value is cached.
    downstream_up.store(1, Ordering::SeqCst);
    let result = cache
        .get_or_load(1, load(Arc::clone(&invoker), Arc::clone(&downstream_up)))
        .unwrap();
    assert_eq!(result, "live data");
    assert_eq!(cache.len(), 1);
}
