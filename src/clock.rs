//! # Monotonic Clock
//!
//! All receive and transmit timing goes through [`Clock`] so the busy waits
//! can be driven deterministically in tests.

use std::time::Instant;

/// Millisecond monotonic time source
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin
    fn now_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Wall clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock for tests
///
/// Every reading advances time by `step` milliseconds, so a busy loop that
/// polls the clock always makes progress.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ManualClock {
    now: std::cell::Cell<u64>,
    step: u64,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new(step: u64) -> Self {
        Self {
            now: std::cell::Cell::new(0),
            step,
        }
    }

    pub(crate) fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub(crate) fn peek(&self) -> u64 {
        self.now.get()
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }

    #[test]
    fn test_manual_clock_steps_on_read() {
        let clock = ManualClock::new(2);
        assert_eq!(clock.now_ms(), 0);
        assert_eq!(clock.now_ms(), 2);

        clock.advance(100);
        assert_eq!(clock.peek(), 104);
        assert_eq!(clock.now_ms(), 104);
    }
}
