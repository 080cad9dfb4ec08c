//! Error types for the resilient-call engine.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

/// Result type for breaker-wrapped operations.
pub type BreakerResult<T, E> = Result<T, BreakerError<E>>;

/// Result type for cache lookups.
pub type CacheResult<V, E> = Result<V, CacheError<E>>;

/// Error type for breaker-wrapped operations.
#[derive(Debug)]
pub enum BreakerError<E> {
    /// The circuit is open; the call was rejected without reaching the downstream.
    Open,

    /// The downstream call failed with an error that counts toward the breaker.
    Downstream(E),

    /// The downstream call failed with an error matching the ignore predicate.
    /// Not recorded by the breaker, but still surfaced to the fallback.
    Ignored(E),

    /// The fallback itself failed. No further degradation path exists, so this
    /// is surfaced to the caller as-is.
    Fallback(E),
}

impl<E> Display for BreakerError<E>
where
    E: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BreakerError::Open => write!(f, "Circuit breaker is open"),
            BreakerError::Downstream(e) => write!(f, "Downstream call failed: {}", e),
            BreakerError::Ignored(e) => write!(f, "Downstream call failed (ignored class): {}", e),
            BreakerError::Fallback(e) => write!(f, "Fallback failed: {}", e),
        }
    }
}

impl<E: Error + 'static> Error for BreakerError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BreakerError::Open => None,
            BreakerError::Downstream(e) | BreakerError::Ignored(e) | BreakerError::Fallback(e) => {
                Some(e)
            }
        }
    }
}

/// Error type for cache lookups.
///
/// The cache performs no fallback substitution of its own; a failed load is
/// propagated to the caller, who may wrap the loader in a
/// [`ResilientInvoker`](crate::ResilientInvoker) if degradation is wanted.
#[derive(Debug)]
pub enum CacheError<E> {
    /// The loader failed; nothing was cached.
    Load(E),
}

impl<E> Display for CacheError<E>
where
    E: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Load(e) => write!(f, "Cache load failed: {}", e),
        }
    }
}

impl<E: Error + 'static> Error for CacheError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CacheError::Load(e) => Some(e),
        }
    }
}

/// Invalid construction parameters, reported by
/// [`BreakerBuilder::build`](crate::BreakerBuilder::build). Never raised at
/// call time.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The sliding window must hold at least one call.
    WindowSize(usize),

    /// `minimum_calls` must be at least 1 and no larger than the window size.
    MinimumCalls {
        /// Configured minimum number of calls.
        minimum_calls: usize,
        /// Configured window size.
        window_size: usize,
    },

    /// Rate thresholds are percentages in the range (0, 100].
    RateThreshold {
        /// Which threshold was rejected.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// At least one probe call must be permitted in the half-open state.
    PermittedCalls(u32),

    /// Durations must be non-zero.
    ZeroDuration {
        /// Which duration was rejected.
        name: &'static str,
        /// The rejected value.
        value: Duration,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::WindowSize(size) => {
                write!(f, "window_size must be at least 1, got {}", size)
            }
            ConfigError::MinimumCalls {
                minimum_calls,
                window_size,
            } => write!(
                f,
                "minimum_calls must be in 1..={}, got {}",
                window_size, minimum_calls
            ),
            ConfigError::RateThreshold { name, value } => {
                write!(f, "{} must be in (0, 100], got {}", name, value)
            }
            ConfigError::PermittedCalls(count) => write!(
                f,
                "permitted_calls_in_half_open must be at least 1, got {}",
                count
            ),
            ConfigError::ZeroDuration { name, value } => {
                write!(f, "{} must be non-zero, got {:?}", name, value)
            }
        }
    }
}

impl Error for ConfigError {}
