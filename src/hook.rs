//! Hook registry for circuit breaker events.

use crate::state::State;
use parking_lot::RwLock;
use std::sync::Arc;

type HookFn = Arc<dyn Fn() + Send + Sync + 'static>;

/// A registry for circuit breaker event hooks.
///
/// Hooks run synchronously after the breaker releases its internal lock, so
/// they may safely read the breaker's state but should stay short.
pub struct HookRegistry {
    on_open: RwLock<Option<HookFn>>,
    on_close: RwLock<Option<HookFn>>,
    on_half_open: RwLock<Option<HookFn>>,
    on_success: RwLock<Option<HookFn>>,
    on_failure: RwLock<Option<HookFn>>,
    on_reject: RwLock<Option<HookFn>>,
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HookRegistry {
    /// Creates a new empty hook registry.
    pub fn new() -> Self {
        Self {
            on_open: RwLock::new(None),
            on_close: RwLock::new(None),
            on_half_open: RwLock::new(None),
            on_success: RwLock::new(None),
            on_failure: RwLock::new(None),
            on_reject: RwLock::new(None),
        }
    }

    /// Sets the hook to call when the circuit opens.
    pub fn set_on_open<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.on_open.write() = Some(Arc::new(f));
    }

    /// Sets the hook to call when the circuit closes.
    pub fn set_on_close<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.on_close.write() = Some(Arc::new(f));
    }

    /// Sets the hook to call when the circuit half-opens.
    pub fn set_on_half_open<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.on_half_open.write() = Some(Arc::new(f));
    }

    /// Sets the hook to call when a recorded call succeeded.
    pub fn set_on_success<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.on_success.write() = Some(Arc::new(f));
    }

    /// Sets the hook to call when a recorded call failed.
    pub fn set_on_failure<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.on_failure.write() = Some(Arc::new(f));
    }

    /// Sets the hook to call when a call is rejected without reaching the
    /// downstream.
    pub fn set_on_reject<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.on_reject.write() = Some(Arc::new(f));
    }

    /// Executes the appropriate hook for a state transition.
    pub(crate) fn execute_state_transition_hook(&self, to: State) {
        let slot = match to {
            State::Open => &self.on_open,
            State::Closed => &self.on_close,
            State::HalfOpen => &self.on_half_open,
        };
        if let Some(hook) = slot.read().as_ref() {
            hook();
        }
    }

    /// Executes the success hook.
    pub(crate) fn execute_success_hook(&self) {
        if let Some(hook) = self.on_success.read().as_ref() {
            hook();
        }
    }

    /// Executes the failure hook.
    pub(crate) fn execute_failure_hook(&self) {
        if let Some(hook) = self.on_failure.read().as_ref() {
            hook();
        }
    }

    /// Executes the rejection hook.
    pub(crate) fn execute_reject_hook(&self) {
        if let Some(hook) = self.on_reject.read().as_ref() {
            hook();
        }
    }
}
