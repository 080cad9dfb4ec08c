//! Configuration for circuit breakers.

use std::sync::Arc;
use std::time::Duration;

use crate::breaker::CircuitBreaker;
use crate::error::ConfigError;
use crate::hook::HookRegistry;
use crate::metrics::{MetricSink, NullMetricSink};

/// Immutable circuit breaker configuration.
///
/// Supplied at construction and never reloaded mid-run; build a new breaker
/// to change it.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Length of the count-based sliding window.
    pub window_size: usize,

    /// Calls required in the window before rate thresholds are evaluated.
    pub minimum_calls: usize,

    /// Failure percentage at or above which the circuit opens.
    pub failure_rate_threshold: f64,

    /// Slow-call percentage at or above which the circuit opens.
    pub slow_call_rate_threshold: f64,

    /// Duration at or above which a call is classified as slow.
    pub slow_call_duration_threshold: Duration,

    /// Time the circuit stays open before the next call may probe.
    pub wait_duration_in_open: Duration,

    /// Number of probe calls permitted per half-open episode.
    pub permitted_calls_in_half_open: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            minimum_calls: 10,
            failure_rate_threshold: 50.0,
            slow_call_rate_threshold: 100.0,
            slow_call_duration_threshold: Duration::from_secs(60),
            wait_duration_in_open: Duration::from_secs(30),
            permitted_calls_in_half_open: 5,
        }
    }
}

impl BreakerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::WindowSize(self.window_size));
        }
        if self.minimum_calls == 0 || self.minimum_calls > self.window_size {
            return Err(ConfigError::MinimumCalls {
                minimum_calls: self.minimum_calls,
                window_size: self.window_size,
            });
        }
        for (name, value) in [
            ("failure_rate_threshold", self.failure_rate_threshold),
            ("slow_call_rate_threshold", self.slow_call_rate_threshold),
        ] {
            if !(value > 0.0 && value <= 100.0) {
                return Err(ConfigError::RateThreshold { name, value });
            }
        }
        if self.permitted_calls_in_half_open == 0 {
            return Err(ConfigError::PermittedCalls(
                self.permitted_calls_in_half_open,
            ));
        }
        for (name, value) in [
            (
                "slow_call_duration_threshold",
                self.slow_call_duration_threshold,
            ),
            ("wait_duration_in_open", self.wait_duration_in_open),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration { name, value });
            }
        }
        Ok(())
    }
}

/// Builder for creating circuit breakers with custom configurations.
pub struct BreakerBuilder {
    config: BreakerConfig,
    metric_sink: Arc<dyn MetricSink>,
    hook_registry: Arc<HookRegistry>,
}

impl Default for BreakerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: BreakerConfig::default(),
            metric_sink: Arc::new(NullMetricSink),
            hook_registry: Arc::new(HookRegistry::new()),
        }
    }

    /// Sets the length of the count-based sliding window.
    pub fn window_size(mut self, size: usize) -> Self {
        self.config.window_size = size;
        self
    }

    /// Sets the number of calls required before rate thresholds are evaluated.
    pub fn minimum_calls(mut self, calls: usize) -> Self {
        self.config.minimum_calls = calls;
        self
    }

    /// Sets the failure percentage that will trip the circuit.
    pub fn failure_rate_threshold(mut self, percent: f64) -> Self {
        self.config.failure_rate_threshold = percent;
        self
    }

    /// Sets the slow-call percentage that will trip the circuit.
    pub fn slow_call_rate_threshold(mut self, percent: f64) -> Self {
        self.config.slow_call_rate_threshold = percent;
        self
    }

    /// Sets the duration at or above which a call counts as slow.
    pub fn slow_call_duration_threshold(mut self, duration: Duration) -> Self {
        self.config.slow_call_duration_threshold = duration;
        self
    }

    /// Sets how long the circuit stays open before half-open probing begins.
    pub fn wait_duration_in_open(mut self, duration: Duration) -> Self {
        self.config.wait_duration_in_open = duration;
        self
    }

    /// Sets the number of probe calls permitted per half-open episode.
    pub fn permitted_calls_in_half_open(mut self, calls: u32) -> Self {
        self.config.permitted_calls_in_half_open = calls;
        self
    }

    /// Sets a metric sink for the circuit breaker.
    pub fn metric_sink<M: MetricSink>(mut self, sink: M) -> Self {
        self.metric_sink = Arc::new(sink);
        self
    }

    /// Sets a hook registry for the circuit breaker.
    pub fn hooks(mut self, hooks: HookRegistry) -> Self {
        self.hook_registry = Arc::new(hooks);
        self
    }

    /// Validates the configuration and builds the circuit breaker.
    pub fn build(self) -> Result<CircuitBreaker, ConfigError> {
        self.config.validate()?;
        Ok(CircuitBreaker::new(
            self.config,
            self.metric_sink,
            self.hook_registry,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(BreakerBuilder::new().build().is_ok());
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = BreakerBuilder::new().window_size(0).build().unwrap_err();
        assert_eq!(err, ConfigError::WindowSize(0));
    }

    #[test]
    fn minimum_calls_must_fit_in_window() {
        let err = BreakerBuilder::new()
            .window_size(5)
            .minimum_calls(6)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::MinimumCalls { .. }));
    }

    #[test]
    fn out_of_range_thresholds_are_rejected() {
        for bad in [0.0, -1.0, 100.5] {
            let err = BreakerBuilder::new()
                .failure_rate_threshold(bad)
                .build()
                .unwrap_err();
            assert!(matches!(err, ConfigError::RateThreshold { .. }));
        }
    }

    #[test]
    fn zero_probes_are_rejected() {
        let err = BreakerBuilder::new()
            .permitted_calls_in_half_open(0)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::PermittedCalls(0));
    }

    #[test]
    fn zero_durations_are_rejected() {
        let err = BreakerBuilder::new()
            .wait_duration_in_open(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroDuration { .. }));
    }
}
