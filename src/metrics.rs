//! Call outcomes, the sliding window, and metric sinks.

use smallvec::SmallVec;
use std::time::Duration;

use crate::state::State;

/// Classification of one completed downstream attempt.
///
/// Produced once per attempt by the [`ResilientInvoker`](crate::ResilientInvoker)
/// and immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// The call succeeded within the slow-call duration threshold.
    Success,

    /// The call failed within the slow-call duration threshold.
    Failure,

    /// The call succeeded but took at least the slow-call duration threshold.
    SlowSuccess,

    /// The call failed and took at least the slow-call duration threshold.
    SlowFailure,

    /// The call failed with an error matching the ignore predicate. Never
    /// recorded into any window; it neither counts toward the minimum-calls
    /// gate nor affects rates.
    Ignored,
}

impl CallOutcome {
    /// Whether this outcome counts as a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, CallOutcome::Failure | CallOutcome::SlowFailure)
    }

    /// Whether this outcome counts as a slow call.
    pub fn is_slow(&self) -> bool {
        matches!(self, CallOutcome::SlowSuccess | CallOutcome::SlowFailure)
    }

    /// Whether this outcome is excluded from breaker accounting.
    pub fn is_ignored(&self) -> bool {
        matches!(self, CallOutcome::Ignored)
    }
}

/// Read-only view of a sliding window, taken at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSnapshot {
    /// Number of outcomes currently held in the window.
    pub filled: usize,

    /// Number of held outcomes classified as failures.
    pub failures: u32,

    /// Number of held outcomes classified as slow calls.
    pub slow_calls: u32,

    /// Failure percentage over the held outcomes; 0.0 while empty.
    pub failure_rate: f64,

    /// Slow-call percentage over the held outcomes; 0.0 while empty.
    pub slow_call_rate: f64,

    /// Whether enough calls have been recorded for the rates to be
    /// meaningful (`filled >= minimum_calls`).
    pub is_evaluable: bool,
}

/// Count-based ring buffer over the most recent call outcomes.
///
/// Eviction is FIFO: once `capacity` outcomes are held, each record replaces
/// the oldest. Failure and slow-call counts are maintained incrementally so
/// both [`record`](Self::record) and [`snapshot`](Self::snapshot) are O(1).
#[derive(Debug)]
pub struct SlidingWindow {
    slots: SmallVec<[CallOutcome; 16]>,
    capacity: usize,
    minimum_calls: usize,
    head: usize,
    failures: u32,
    slow_calls: u32,
}

impl SlidingWindow {
    /// Creates an empty window.
    ///
    /// `capacity` is the window length; rates are not evaluable until at
    /// least `minimum_calls` outcomes are held.
    pub fn new(capacity: usize, minimum_calls: usize) -> Self {
        Self {
            slots: SmallVec::with_capacity(capacity.min(64)),
            capacity,
            minimum_calls,
            head: 0,
            failures: 0,
            slow_calls: 0,
        }
    }

    /// Appends an outcome, evicting the oldest entry if the window is full.
    ///
    /// [`CallOutcome::Ignored`] is not recorded.
    pub fn record(&mut self, outcome: CallOutcome) {
        if outcome.is_ignored() {
            return;
        }

        if self.slots.len() < self.capacity {
            self.slots.push(outcome);
        } else {
            let evicted = std::mem::replace(&mut self.slots[self.head], outcome);
            self.head = (self.head + 1) % self.capacity;

            if evicted.is_failure() {
                self.failures -= 1;
            }
            if evicted.is_slow() {
                self.slow_calls -= 1;
            }
        }

        if outcome.is_failure() {
            self.failures += 1;
        }
        if outcome.is_slow() {
            self.slow_calls += 1;
        }
    }

    /// Number of outcomes currently held.
    pub fn filled(&self) -> usize {
        self.slots.len()
    }

    /// Whether the window holds its full `capacity` of outcomes.
    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    /// Takes a read-only snapshot of the window.
    pub fn snapshot(&self) -> WindowSnapshot {
        let filled = self.slots.len();
        let (failure_rate, slow_call_rate) = if filled == 0 {
            (0.0, 0.0)
        } else {
            (
                self.failures as f64 / filled as f64 * 100.0,
                self.slow_calls as f64 / filled as f64 * 100.0,
            )
        };

        WindowSnapshot {
            filled,
            failures: self.failures,
            slow_calls: self.slow_calls,
            failure_rate,
            slow_call_rate,
            is_evaluable: filled >= self.minimum_calls,
        }
    }

    /// Clears the window and its counters.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.head = 0;
        self.failures = 0;
        self.slow_calls = 0;
    }
}

/// Trait for metric sinks that receive engine events.
pub trait MetricSink: Send + Sync + 'static {
    /// Records a state transition event.
    fn record_state_transition(&self, from: State, to: State);

    /// Records a completed call's outcome and duration.
    fn record_call(&self, outcome: CallOutcome, duration: Duration);

    /// Records an admission decision in the half-open state.
    fn record_probe_attempt(&self, permitted: bool);

    /// Records a call rejected without reaching the downstream.
    fn record_rejection(&self);
}

/// A null metric sink that discards all events.
pub struct NullMetricSink;

impl MetricSink for NullMetricSink {
    fn record_state_transition(&self, _from: State, _to: State) {}
    fn record_call(&self, _outcome: CallOutcome, _duration: Duration) {}
    fn record_probe_attempt(&self, _permitted: bool) {}
    fn record_rejection(&self) {}
}

/// A metric sink that emits [`tracing`] events.
#[cfg(feature = "tracing")]
#[cfg_attr(docsrs, doc(cfg(feature = "tracing")))]
pub struct TracingMetricSink;

#[cfg(feature = "tracing")]
impl MetricSink for TracingMetricSink {
    fn record_state_transition(&self, from: State, to: State) {
        tracing::warn!(from = from.as_str(), to = to.as_str(), "breaker state transition");
    }

    fn record_call(&self, outcome: CallOutcome, duration: Duration) {
        tracing::debug!(?outcome, ?duration, "breaker call completed");
    }

    fn record_probe_attempt(&self, permitted: bool) {
        tracing::debug!(permitted, "half-open probe attempt");
    }

    fn record_rejection(&self) {
        tracing::debug!("call rejected by open circuit");
    }
}
