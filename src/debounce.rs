//! Trailing-edge debouncing driven by an explicit clock.
//!
//! Nothing here owns a timer. The caller passes the current [Instant] to
//! both [Debouncer::call] and [Debouncer::poll], which keeps the
//! behavior deterministic and lets the render loop act as the scheduler.

use std::time::{Duration, Instant};

/// Holds the latest value until `delay` has passed without another call.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replaces any pending value and restarts the quiet period.
    pub fn call(&mut self, now: Instant, value: T) {
        self.pending = Some((now + self.delay, value));
    }

    /// Returns the pending value once its deadline is reached.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.pending.take() {
            Some((deadline, value)) if now >= deadline => Some(value),
            pending => {
                self.pending = pending;
                None
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drops the pending value without firing.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// A callback wrapped in a [Debouncer].
pub struct Debounced<T, F>
where
    F: FnMut(T),
{
    inner: Debouncer<T>,
    callback: F,
}

impl<T, F> Debounced<T, F>
where
    F: FnMut(T),
{
    pub fn new(delay: Duration, callback: F) -> Self {
        Self {
            inner: Debouncer::new(delay),
            callback,
        }
    }

    pub fn call(&mut self, now: Instant, value: T) {
        self.inner.call(now, value);
    }

    /// Drops the pending value without firing.
    pub fn cancel(&mut self) {
        self.inner.cancel();
    }

    /// Fires the callback if the quiet period is over. Returns whether it
    /// fired.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.inner.poll(now) {
            Some(value) => {
                (self.callback)(value);
                true
            }
            None => false,
        }
    }
}

/// Wraps `callback` so that bursts of calls collapse into one trailing call.
pub fn debounce<T, F>(callback: F, delay: Duration) -> Debounced<T, F>
where
    F: FnMut(T),
{
    Debounced::new(delay, callback)
}
