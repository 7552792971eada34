//! Trailing-edge throttle
//!
//! Limits an action to at most one run per `interval`. The first request
//! after a quiet period fires immediately; requests arriving inside the
//! interval collapse into a single trailing run at `last_fire + interval`.
//! A request is never dropped, only delayed.
//!
//! The throttle holds no clock of its own: callers pass `now`, so the
//! snapshot store can drive it from its rotation loop and tests can drive it
//! with synthetic instants.

use std::time::{Duration, Instant};

/// Outcome of polling a [`Throttle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Run the action now
    Fire,
    /// A request is pending; poll again after this long
    Wait(Duration),
    /// Nothing requested
    Idle,
}

/// Minimum-interval rate limiter with a guaranteed trailing call
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_fired: Option<Instant>,
    requested: bool,
}

impl Throttle {
    /// Create a throttle allowing one run per `interval`
    pub fn new(interval: Duration) -> Self {
        Throttle {
            interval,
            last_fired: None,
            requested: false,
        }
    }

    /// Configured interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Ask for the action to run
    pub fn request(&mut self) {
        self.requested = true;
    }

    /// Withdraw a pending request
    pub fn cancel(&mut self) {
        self.requested = false;
    }

    /// True while a request waits to fire
    pub fn is_requested(&self) -> bool {
        self.requested
    }

    /// Decide whether the pending request may fire at `now`
    ///
    /// Returning [`ThrottleDecision::Fire`] consumes the request and starts
    /// a new interval.
    pub fn poll(&mut self, now: Instant) -> ThrottleDecision {
        if !self.requested {
            return ThrottleDecision::Idle;
        }
        if let Some(last) = self.last_fired {
            let due = last + self.interval;
            if now < due {
                return ThrottleDecision::Wait(due - now);
            }
        }
        self.requested = false;
        self.last_fired = Some(now);
        ThrottleDecision::Fire
    }
}
