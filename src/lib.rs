//! # resilient-call
//!
//! A resilient remote-call engine for Rust applications: a count-based
//! sliding-window circuit breaker with half-open probing, and a keyed TTL
//! cache with single-flight load deduplication. Together they form the
//! "protect + accelerate" layer a service wraps around an unreliable
//! downstream dependency.
//!
//! ## Circuit breaker
//!
//! The breaker operates in three states:
//!
//! - **Closed**: normal operation, calls pass through. Each recorded outcome
//!   re-evaluates the failure rate and slow-call rate over the last N calls;
//!   crossing either threshold opens the circuit.
//! - **Open**: calls are rejected immediately without reaching the
//!   downstream, until a wait duration elapses.
//! - **Half-Open**: a bounded set of probe calls is let through; their
//!   aggregate outcome decides whether the circuit closes again or reopens.
//!
//! ## Basic usage
//!
//! ```rust
//! use resilient_call::{BreakerError, CircuitBreaker, ResilientInvoker};
//! use std::error::Error;
//! use std::fmt;
//! use std::time::Duration;
//!
//! // Define a custom error type that implements the Error trait
//! #[derive(Debug)]
//! struct ServiceError {
//!     status: u16,
//! }
//!
//! impl fmt::Display for ServiceError {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         write!(f, "service responded with status {}", self.status)
//!     }
//! }
//!
//! impl Error for ServiceError {}
//!
//! // Create a circuit breaker with custom settings
//! let breaker = CircuitBreaker::builder()
//!     .window_size(10)
//!     .minimum_calls(10)
//!     .failure_rate_threshold(50.0) // trip when 50% of calls fail
//!     .wait_duration_in_open(Duration::from_secs(30))
//!     .build()
//!     .expect("valid configuration");
//!
//! // Wrap it in an invoker with a fallback; 4xx responses are not
//! // counted as breaker failures.
//! let invoker = ResilientInvoker::new(breaker, |_cause: &BreakerError<ServiceError>| {
//!     Ok("fallback".to_string())
//! })
//! .ignore_errors(|e: &ServiceError| (400..500).contains(&e.status));
//!
//! let result = invoker.execute(|| {
//!     // The downstream call that might fail
//!     Ok("payload".to_string())
//! });
//! assert_eq!(result.unwrap(), "payload");
//! ```
//!
//! ## Caching lookups
//!
//! ```rust
//! use resilient_call::KeyedTtlCache;
//! use std::time::Duration;
//!
//! let cache: KeyedTtlCache<u64, String, String> =
//!     KeyedTtlCache::new(Duration::from_secs(60));
//!
//! // Only the first lookup for a key runs the loader; concurrent callers
//! // for the same key share one in-flight load.
//! let product = cache.get_or_load(42, || Ok("product 42".to_string()));
//! assert_eq!(product.unwrap(), "product 42");
//! ```
//!
//! The cache and the breaker are independent and composable: a cache loader
//! may itself be a [`ResilientInvoker::execute`] call.
//!
//! ## Async support
//!
//! With the `async` feature enabled, [`ResilientInvoker::execute_async`]
//! wraps async operations:
//!
//! ```rust,ignore
//! let result = invoker.execute_async(|| async {
//!     // Your async service call
//!     Ok("payload".to_string())
//! }).await;
//! ```
//!
//! ## Features
//!
//! - `std` - Standard library support (default)
//! - `async` - Async support with Tokio
//! - `tracing` - A [`TracingMetricSink`] emitting tracing events

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod breaker;
mod cache;
mod config;
mod error;
mod hook;
mod invoker;
mod metrics;
pub mod prelude;
mod registry;
mod state;

// Re-exports
pub use breaker::CircuitBreaker;
pub use cache::{KeyedTtlCache, ResultCache};
pub use config::{BreakerBuilder, BreakerConfig};
pub use error::{BreakerError, BreakerResult, CacheError, CacheResult, ConfigError};
pub use hook::HookRegistry;
pub use invoker::ResilientInvoker;
#[cfg(feature = "tracing")]
pub use metrics::TracingMetricSink;
pub use metrics::{CallOutcome, MetricSink, NullMetricSink, SlidingWindow, WindowSnapshot};
pub use registry::{Registry, Resettable};
pub use state::State;
