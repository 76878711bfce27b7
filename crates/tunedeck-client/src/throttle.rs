//! Trailing-edge coalescing for high-frequency controls.
//!
//! A volume slider or seek bar fires many events per second. Each event
//! re-arms the throttler with the latest action; only when the control has
//! been quiet for the full delay does that last action come out of `poll`.
//!
//! The throttler never sleeps itself. The owning loop asks for `deadline()`
//! and calls `poll(now)` when it passes.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Throttler<A> {
    delay: Duration,
    pending: Option<(Instant, A)>,
}

impl<A> Throttler<A> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `action` for `now + delay`, replacing whatever was pending.
    pub fn arm(&mut self, action: A, now: Instant) {
        self.pending = Some((now + self.delay, action));
    }

    /// Take the pending action if its deadline has been reached.
    pub fn poll(&mut self, now: Instant) -> Option<A> {
        match &self.pending {
            Some((due, _)) if now >= *due => self.pending.take().map(|(_, action)| action),
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(due, _)| *due)
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// The action that would fire next, if any.
    pub fn peek(&self) -> Option<&A> {
        self.pending.as_ref().map(|(_, action)| action)
    }

    /// Drop the pending action without running it.
    pub fn cancel(&mut self) -> Option<A> {
        self.pending.take().map(|(_, action)| action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const D: Duration = Duration::from_millis(80);

    #[test]
    fn test_burst_yields_last_action_once() {
        let t0 = Instant::now();
        let mut throttler = Throttler::new(D);
        for (i, step) in [0u64, 20, 40, 60, 79].iter().enumerate() {
            throttler.arm(i, t0 + Duration::from_millis(*step));
        }
        let last = t0 + Duration::from_millis(79);

        // Each re-arm pushes the deadline out from the latest call.
        assert_eq!(throttler.deadline(), Some(last + D));
        assert_eq!(throttler.poll(t0 + Duration::from_millis(100)), None);
        assert_eq!(throttler.poll(last + D), Some(4));
        assert_eq!(throttler.poll(last + D * 10), None);
        assert!(!throttler.is_armed());
    }

    #[test]
    fn test_separated_calls_fire_separately() {
        let t0 = Instant::now();
        let mut throttler = Throttler::new(D);
        throttler.arm("a", t0);
        assert_eq!(throttler.poll(t0 + D), Some("a"));

        throttler.arm("b", t0 + D * 2);
        assert_eq!(throttler.peek(), Some(&"b"));
        assert_eq!(throttler.poll(t0 + D * 3), Some("b"));
    }

    #[test]
    fn test_cancel_discards() {
        let t0 = Instant::now();
        let mut throttler = Throttler::new(D);
        throttler.arm(7, t0);
        assert_eq!(throttler.cancel(), Some(7));
        assert_eq!(throttler.poll(t0 + D * 2), None);
        assert_eq!(throttler.deadline(), None);
    }
}
