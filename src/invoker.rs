//! The resilient invoker: admission, classification, recording, fallback.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::breaker::CircuitBreaker;
use crate::error::{BreakerError, BreakerResult};
use crate::metrics::CallOutcome;

type IgnorePredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync + 'static>;
type Fallback<T, E> = Arc<dyn Fn(&BreakerError<E>) -> Result<T, E> + Send + Sync + 'static>;

/// Wraps an arbitrary downstream call with a circuit breaker and a fallback.
///
/// On each [`execute`](Self::execute) the invoker asks the breaker for
/// admission, runs the call while measuring its duration, classifies the
/// result into a [`CallOutcome`], records it, and substitutes the fallback
/// result whenever the call was rejected or failed. Errors matching the
/// ignore predicate (typically client-side errors such as HTTP 4xx) are not
/// counted by the breaker, but still receive the fallback: failing to obtain
/// data still requires a usable response.
///
/// The fallback must not call back into the same invoker; reentrancy is the
/// integrator's responsibility to avoid.
pub struct ResilientInvoker<T, E> {
    breaker: CircuitBreaker,
    ignore: Option<IgnorePredicate<E>>,
    fallback: Fallback<T, E>,
}

impl<T, E> ResilientInvoker<T, E> {
    /// Creates an invoker around `breaker`.
    ///
    /// `fallback` receives the triggering error and produces a best-effort
    /// substitute result. A fallback failure has no further degradation path
    /// and surfaces to the caller as [`BreakerError::Fallback`].
    pub fn new<F>(breaker: CircuitBreaker, fallback: F) -> Self
    where
        F: Fn(&BreakerError<E>) -> Result<T, E> + Send + Sync + 'static,
    {
        Self {
            breaker,
            ignore: None,
            fallback: Arc::new(fallback),
        }
    }

    /// Classifies errors matched by `predicate` as ignored: they bypass
    /// breaker accounting entirely while still triggering the fallback.
    pub fn ignore_errors<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.ignore = Some(Arc::new(predicate));
        self
    }

    /// The breaker guarding this invoker.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Executes a downstream call under the breaker's protection.
    pub fn execute<F>(&self, call: F) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if !self.breaker.try_acquire() {
            return self.run_fallback(BreakerError::Open);
        }

        let start = Instant::now();
        let result = call();
        self.settle(result, start.elapsed())
    }

    /// Executes an async downstream call under the breaker's protection.
    #[cfg(feature = "async")]
    #[cfg_attr(docsrs, doc(cfg(feature = "async")))]
    pub async fn execute_async<F, Fut>(&self, call: F) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        if !self.breaker.try_acquire() {
            return self.run_fallback(BreakerError::Open);
        }

        let start = Instant::now();
        let result = call().await;
        self.settle(result, start.elapsed())
    }

    fn settle(&self, result: Result<T, E>, elapsed: Duration) -> BreakerResult<T, E> {
        let slow = elapsed >= self.breaker.config().slow_call_duration_threshold;

        match result {
            Ok(value) => {
                let outcome = if slow {
                    CallOutcome::SlowSuccess
                } else {
                    CallOutcome::Success
                };
                self.breaker.record(outcome, elapsed);
                Ok(value)
            }
            Err(err) => {
                if self.ignore.as_ref().is_some_and(|p| p(&err)) {
                    self.breaker.record(CallOutcome::Ignored, elapsed);
                    self.run_fallback(BreakerError::Ignored(err))
                } else {
                    let outcome = if slow {
                        CallOutcome::SlowFailure
                    } else {
                        CallOutcome::Failure
                    };
                    self.breaker.record(outcome, elapsed);
                    self.run_fallback(BreakerError::Downstream(err))
                }
            }
        }
    }

    fn run_fallback(&self, cause: BreakerError<E>) -> BreakerResult<T, E> {
        (self.fallback)(&cause).map_err(BreakerError::Fallback)
    }
}

// Cloning shares the breaker, predicate and fallback.
impl<T, E> Clone for ResilientInvoker<T, E> {
    fn clone(&self) -> Self {
        Self {
            breaker: self.breaker.clone(),
            ignore: self.ignore.clone(),
            fallback: Arc::clone(&self.fallback),
        }
    }
}
