use criterion::{black_box, criterion_group, criterion_main, Criterion};
use resilient_call::{BreakerError, CircuitBreaker, KeyedTtlCache, ResilientInvoker};
use std::error::Error;
use std::fmt;
use std::time::Duration;

// Custom error type that implements Error trait
#[derive(Debug, Clone)]
struct BenchError(String);

impl BenchError {
    fn new(msg: &str) -> Self {
        BenchError(msg.to_string())
    }
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Benchmark error: {}", self.0)
    }
}

impl Error for BenchError {}

fn successful_operation() -> Result<(), BenchError> {
    Ok(())
}

fn failing_operation() -> Result<(), BenchError> {
    Err(BenchError::new("Simulated failure"))
}

fn bench_invoker(breaker: CircuitBreaker) -> ResilientInvoker<(), BenchError> {
    ResilientInvoker::new(breaker, |_: &BreakerError<BenchError>| Ok(()))
}

fn bench_closed_path(c: &mut Criterion) {
    let breaker = CircuitBreaker::builder()
        .window_size(100)
        .minimum_calls(100)
        .failure_rate_threshold(50.0)
        .wait_duration_in_open(Duration::from_secs(30))
        .build()
        .unwrap();
    let invoker = bench_invoker(breaker);

    c.bench_function("invoker_closed_success", |b| {
        b.iter(|| black_box(invoker.execute(successful_operation)));
    });
}

fn bench_trip_cycle(c: &mut Criterion) {
    let breaker = CircuitBreaker::builder()
        .window_size(10)
        .minimum_calls(10)
        .failure_rate_threshold(50.0)
        .wait_duration_in_open(Duration::from_secs(30))
        .build()
        .unwrap();
    let invoker = bench_invoker(breaker.clone());

    c.bench_function("invoker_trip_cycle", |b| {
        b.iter_custom(|iters| {
            let start = std::time::Instant::now();

            for _ in 0..iters {
                // Consistent starting point for each cycle.
                breaker.reset();

                // 10 failing calls to trip the breaker.
                for _ in 0..10 {
                    let _ = black_box(invoker.execute(failing_operation));
                }

                // One open-circuit rejection.
                let _ = black_box(invoker.execute(successful_operation));
            }

            start.elapsed()
        });
    });
}

fn bench_concurrent_closed(c: &mut Criterion) {
    use std::sync::{Arc, Barrier};
    use std::thread;

    let breaker = CircuitBreaker::builder()
        .window_size(100)
        .minimum_calls(100)
        .failure_rate_threshold(50.0)
        .wait_duration_in_open(Duration::from_secs(30))
        .build()
        .unwrap();
    let invoker = Arc::new(bench_invoker(breaker));

    const THREAD_COUNT: usize = 4;
    const ITERATIONS_PER_THREAD: usize = 1000;

    c.bench_function("invoker_concurrent", |b| {
        b.iter(|| {
            let barrier = Arc::new(Barrier::new(THREAD_COUNT + 1));
            let mut handles = Vec::with_capacity(THREAD_COUNT);

            for _ in 0..THREAD_COUNT {
                let thread_invoker = Arc::clone(&invoker);
                let thread_barrier = Arc::clone(&barrier);

                handles.push(thread::spawn(move || {
                    thread_barrier.wait();
                    for _ in 0..ITERATIONS_PER_THREAD {
                        let _ = black_box(thread_invoker.execute(successful_operation));
                    }
                }));
            }

            // Start all threads simultaneously
            barrier.wait();

            // Wait for all threads to complete
            for handle in handles {
                handle.join().unwrap();
            }
        });
    });
}

fn bench_cache_hit(c: &mut Criterion) {
    let cache: KeyedTtlCache<u64, String, BenchError> =
        KeyedTtlCache::new(Duration::from_secs(3600));
    cache
        .get_or_load(1, || Ok("cached value".to_string()))
        .unwrap();

    c.bench_function("cache_hit", |b| {
        b.iter(|| black_box(cache.get_or_load(1, || Ok("never loaded".to_string()))));
    });
}

criterion_group!(
    benches,
    bench_closed_path,
    bench_trip_cycle,
    bench_concurrent_closed,
    bench_cache_hit
);
criterion_main!(benches);
