//! Advanced Example
//!
//! This example demonstrates:
//! 1. Hooks for monitoring circuit breaker events
//! 2. Ignoring client-side errors so they never trip the circuit
//! 3. A single-flight TTL cache in front of a breaker-protected loader
//! 4. A named-instance registry owned by the composition root

use resilient_call::{
    BreakerError, CircuitBreaker, HookRegistry, KeyedTtlCache, Registry, ResilientInvoker,
};
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// Custom error type carrying an HTTP-like status
#[derive(Debug, Clone)]
struct ApiError {
    status: u16,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API error: status {}", self.status)
    }
}

impl Error for ApiError {}

fn main() {
    println!("=== Advanced Example ===\n");

    // 1. Set up a hook registry for observability
    let hooks = HookRegistry::new();
    hooks.set_on_open(|| println!("[hook] circuit OPENED, failing fast"));
    hooks.set_on_close(|| println!("[hook] circuit CLOSED, traffic restored"));
    hooks.set_on_half_open(|| println!("[hook] circuit HALF-OPEN, probing"));
    hooks.set_on_reject(|| println!("[hook] call rejected without a downstream attempt"));

    // 2. Create a circuit breaker; 4xx responses never count as failures
    let breaker = CircuitBreaker::builder()
        .window_size(4)
        .minimum_calls(4)
        .failure_rate_threshold(50.0)
        .wait_duration_in_open(Duration::from_secs(2))
        .permitted_calls_in_half_open(2)
        .hooks(hooks)
        .build()
        .expect("valid configuration");

    let invoker = Arc::new(
        ResilientInvoker::new(breaker.clone(), |cause: &BreakerError<ApiError>| {
            Ok(match cause {
                BreakerError::Ignored(_) => "fallback (client error)".to_string(),
                _ => "fallback".to_string(),
            })
        })
        .ignore_errors(|e: &ApiError| (400..500).contains(&e.status)),
    );

    // 3. The registry belongs to the composition root; handlers look the
    //    breaker up by name
    let breakers: Registry<CircuitBreaker> = Registry::new();
    breakers.register("external-api", breaker);

    // A downstream that fails with 500s for a while, then recovers
    let attempt = Arc::new(AtomicU32::new(0));
    let call_api = {
        let attempt = Arc::clone(&attempt);
        move || {
            let n = attempt.fetch_add(1, Ordering::SeqCst) + 1;
            match n {
                1 => Err(ApiError { status: 404 }),
                2..=7 => Err(ApiError { status: 500 }),
                _ => Ok("live payload".to_string()),
            }
        }
    };

    for i in 1..=10 {
        println!("\n--- Call {} ---", i);
        match invoker.execute(call_api.clone()) {
            Ok(response) => println!("response: {}", response),
            Err(err) => println!("fatal: {}", err),
        }
        let state = breakers.get("external-api").map(|b| b.current_state());
        println!("state via registry: {:?}", state);
        thread::sleep(Duration::from_millis(400));
    }

    // 4. Cache product lookups; concurrent misses for one key share a load
    let cache: KeyedTtlCache<u64, String, String> = KeyedTtlCache::new(Duration::from_secs(30));
    let loads = Arc::new(AtomicU32::new(0));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let cache = cache.clone();
        let loads = Arc::clone(&loads);
        handles.push(thread::spawn(move || {
            cache.get_or_load(42, || {
                loads.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(200));
                Ok("product 42".to_string())
            })
        }));
    }
    for handle in handles {
        let value = handle.join().unwrap().unwrap();
        println!("cache answer: {}", value);
    }
    println!(
        "loader ran {} time(s) for 4 concurrent callers",
        loads.load(Ordering::SeqCst)
    );

    println!("\n=== Example Completed ===");
}
