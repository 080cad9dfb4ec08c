//! Circuit breaker states.

use std::fmt::{self, Display, Formatter};

/// Represents the possible states of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Circuit is closed and calls are permitted.
    Closed,

    /// Circuit is open and calls are rejected without reaching the downstream.
    Open,

    /// Circuit is allowing a limited number of probe calls to test recovery.
    HalfOpen,
}

impl State {
    /// Returns the lowercase name used in metric labels and hooks.
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::Open => "open",
            State::HalfOpen => "half-open",
        }
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
