//! Re-exports common types for convenient usage.
//!
//! # Example
//! ```rust,no_run
//! use resilient_call::prelude::*;
//! ```

pub use crate::{
    BreakerBuilder, BreakerConfig, BreakerError, BreakerResult, CacheError, CacheResult,
    CallOutcome, CircuitBreaker, ConfigError, HookRegistry, KeyedTtlCache, Registry,
    ResilientInvoker, Resettable, ResultCache, State,
};
