//! Core circuit breaker state machine.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::BreakerConfig;
use crate::hook::HookRegistry;
use crate::metrics::{CallOutcome, MetricSink, SlidingWindow, WindowSnapshot};
use crate::state::State;

/// Mutable breaker core. State, both windows, the open timestamp and the
/// half-open permit count form one mutual-exclusion domain: admission and
/// recording are serialized, while the downstream call body runs outside
/// the lock.
struct Core {
    state: State,
    window: SlidingWindow,
    probe_window: SlidingWindow,
    opened_at: Option<Instant>,
    probe_permits: u32,
    // Calls admitted while closed that have not reported an outcome yet.
    // Survives trips so a late outcome is never mistaken for a probe.
    closed_inflight: usize,
}

impl Core {
    fn trip_open(&mut self, from: State) -> Transition {
        self.state = State::Open;
        self.opened_at = Some(Instant::now());
        self.probe_window.reset();
        self.probe_permits = 0;
        Some((from, State::Open))
    }

    fn close(&mut self, from: State) -> Transition {
        self.state = State::Closed;
        self.opened_at = None;
        self.window.reset();
        self.probe_window.reset();
        self.probe_permits = 0;
        Some((from, State::Closed))
    }
}

type Transition = Option<(State, State)>;

/// Inner state of the circuit breaker, shared between clones.
struct BreakerInner {
    config: BreakerConfig,
    core: Mutex<Core>,
    metric_sink: Arc<dyn MetricSink>,
    hooks: Arc<HookRegistry>,
}

/// A count-based sliding-window circuit breaker.
///
/// Starts `Closed` and cycles between `Closed`, `Open` and `HalfOpen` for
/// the life of the process. Tripping is driven by the failure rate and
/// slow-call rate over the last [`window_size`](BreakerConfig::window_size)
/// recorded outcomes; recovery goes through a bounded half-open probe
/// episode after [`wait_duration_in_open`](BreakerConfig::wait_duration_in_open)
/// has elapsed. The `Open` → `HalfOpen` transition is lazy: it happens on
/// the first admission request after the wait, no background timer runs.
///
/// Most callers wrap a breaker in a [`ResilientInvoker`](crate::ResilientInvoker)
/// rather than driving [`try_acquire`](Self::try_acquire) and
/// [`record`](Self::record) by hand.
pub struct CircuitBreaker {
    inner: Arc<BreakerInner>,
}

impl CircuitBreaker {
    pub(crate) fn new(
        config: BreakerConfig,
        metric_sink: Arc<dyn MetricSink>,
        hooks: Arc<HookRegistry>,
    ) -> Self {
        let probes = config.permitted_calls_in_half_open as usize;
        let core = Core {
            state: State::Closed,
            window: SlidingWindow::new(config.window_size, config.minimum_calls),
            probe_window: SlidingWindow::new(probes, probes),
            opened_at: None,
            probe_permits: 0,
            closed_inflight: 0,
        };

        Self {
            inner: Arc::new(BreakerInner {
                config,
                core: Mutex::new(core),
                metric_sink,
                hooks,
            }),
        }
    }

    /// Creates a new builder for customizing a circuit breaker.
    pub fn builder() -> crate::config::BreakerBuilder {
        crate::config::BreakerBuilder::new()
    }

    /// Gets the current state of the circuit breaker.
    pub fn current_state(&self) -> State {
        self.inner.core.lock().state
    }

    /// The configuration this breaker was built with.
    pub fn config(&self) -> &BreakerConfig {
        &self.inner.config
    }

    /// Snapshot of the window currently driving decisions: the probe window
    /// while half-open, the main window otherwise. Read-only.
    pub fn metrics(&self) -> WindowSnapshot {
        let core = self.inner.core.lock();
        match core.state {
            State::HalfOpen => core.probe_window.snapshot(),
            _ => core.window.snapshot(),
        }
    }

    /// Requests admission for one downstream call.
    ///
    /// Returns `true` if the call may proceed. Every admitted call must be
    /// followed by exactly one [`record`](Self::record); in the half-open
    /// state an admission consumes a probe permit that only `record` can
    /// settle.
    pub fn try_acquire(&self) -> bool {
        let cfg = &self.inner.config;
        let (permitted, transition, probe_attempt) = {
            let mut core = self.inner.core.lock();
            match core.state {
                State::Closed => {
                    core.closed_inflight += 1;
                    (true, None, None)
                }
                State::Open => {
                    let waited = core
                        .opened_at
                        .map_or(true, |at| at.elapsed() >= cfg.wait_duration_in_open);
                    if waited {
                        core.state = State::HalfOpen;
                        core.probe_window.reset();
                        // This call is the first probe of the episode.
                        core.probe_permits = 1;
                        (true, Some((State::Open, State::HalfOpen)), Some(true))
                    } else {
                        (false, None, None)
                    }
                }
                State::HalfOpen => {
                    if core.probe_permits < cfg.permitted_calls_in_half_open {
                        core.probe_permits += 1;
                        (true, None, Some(true))
                    } else {
                        (false, None, Some(false))
                    }
                }
            }
        };

        // Hooks and sinks run outside the lock.
        if let Some((from, to)) = transition {
            self.inner.hooks.execute_state_transition_hook(to);
            self.inner.metric_sink.record_state_transition(from, to);
        }
        if let Some(probe_permitted) = probe_attempt {
            self.inner.metric_sink.record_probe_attempt(probe_permitted);
        }
        if !permitted {
            self.inner.metric_sink.record_rejection();
            self.inner.hooks.execute_reject_hook();
        }

        permitted
    }

    /// Records the outcome of an admitted call.
    ///
    /// An [`Ignored`](CallOutcome::Ignored) outcome is never added to a
    /// window; in the half-open state it returns its probe permit so another
    /// probe may run in its place. An outcome belonging to a call that was
    /// admitted while closed, landing after the circuit has tripped and
    /// re-entered half-open, goes to the main window and cannot resolve the
    /// probe episode.
    pub fn record(&self, outcome: CallOutcome, duration: Duration) {
        self.inner.metric_sink.record_call(outcome, duration);
        let cfg = &self.inner.config;

        let transition = {
            let mut core = self.inner.core.lock();
            match core.state {
                State::Closed => {
                    core.closed_inflight = core.closed_inflight.saturating_sub(1);
                    if outcome.is_ignored() {
                        None
                    } else {
                        core.window.record(outcome);
                        let snap = core.window.snapshot();
                        if snap.is_evaluable && self.thresholds_breached(&snap) {
                            core.trip_open(State::Closed)
                        } else {
                            None
                        }
                    }
                }
                State::HalfOpen => {
                    if core.closed_inflight > 0 {
                        // Late outcome of a call admitted before the trip: it
                        // holds no probe permit, so it must not fill a probe
                        // slot or resolve the episode. Keep it in the history.
                        core.closed_inflight -= 1;
                        core.window.record(outcome);
                        None
                    } else if outcome.is_ignored() {
                        core.probe_permits = core.probe_permits.saturating_sub(1);
                        None
                    } else {
                        core.probe_window.record(outcome);
                        if core.probe_window.filled()
                            == cfg.permitted_calls_in_half_open as usize
                        {
                            // The final probe outcome resolves the episode.
                            let snap = core.probe_window.snapshot();
                            if self.thresholds_breached(&snap) {
                                core.trip_open(State::HalfOpen)
                            } else {
                                core.close(State::HalfOpen)
                            }
                        } else {
                            None
                        }
                    }
                }
                State::Open => {
                    // Outcome of a call admitted before the trip. Kept in the
                    // history; no evaluation happens while open.
                    core.closed_inflight = core.closed_inflight.saturating_sub(1);
                    core.window.record(outcome);
                    None
                }
            }
        };

        if !outcome.is_ignored() {
            if outcome.is_failure() {
                self.inner.hooks.execute_failure_hook();
            } else {
                self.inner.hooks.execute_success_hook();
            }
        }
        if let Some((from, to)) = transition {
            self.inner.hooks.execute_state_transition_hook(to);
            self.inner.metric_sink.record_state_transition(from, to);
        }
    }

    fn thresholds_breached(&self, snap: &WindowSnapshot) -> bool {
        let cfg = &self.inner.config;
        snap.failure_rate >= cfg.failure_rate_threshold
            || snap.slow_call_rate >= cfg.slow_call_rate_threshold
    }

    /// Forces the circuit to the open state. Returns `false` if it was
    /// already open.
    pub fn force_open(&self) -> bool {
        let transition = {
            let mut core = self.inner.core.lock();
            let from = core.state;
            if from == State::Open {
                None
            } else {
                core.trip_open(from)
            }
        };

        if let Some((from, to)) = transition {
            self.inner.hooks.execute_state_transition_hook(to);
            self.inner.metric_sink.record_state_transition(from, to);
            true
        } else {
            false
        }
    }

    /// Forces the circuit to the closed state, clearing all windows.
    /// Returns `false` if it was already closed.
    pub fn force_closed(&self) -> bool {
        let transition = {
            let mut core = self.inner.core.lock();
            let from = core.state;
            if from == State::Closed {
                None
            } else {
                core.close(from)
            }
        };

        if let Some((from, to)) = transition {
            self.inner.hooks.execute_state_transition_hook(to);
            self.inner.metric_sink.record_state_transition(from, to);
            true
        } else {
            false
        }
    }

    /// Forces the closed state and clears all windows, firing no hooks.
    /// Operator override and test isolation.
    pub fn reset(&self) {
        let mut core = self.inner.core.lock();
        let from = core.state;
        core.close(from);
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker").finish_non_exhaustive()
    }
}

// Cloning shares the underlying breaker state.
impl Clone for CircuitBreaker {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
