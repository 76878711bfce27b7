//! Optimistic seek with stale-echo suppression.
//!
//! After the user releases the seek bar the server keeps pushing the *old*
//! position until the seek lands. While a seek is pending those echoes are
//! swallowed so the bar doesn't jump back.
//!
//! # States
//! ```text
//!  Idle                      — offsets apply normally
//!  Pending { target, since } — offsets suppressed until one equals `target`
//!                              or `grace` has passed since `since`
//! ```

use std::time::{Duration, Instant};

/// What to do with an incoming `Offset` push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetGate {
    /// Show it (if it differs from what is shown).
    Apply,
    /// Keep showing the optimistic target.
    Suppress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSeek {
    pub target: i64,
    pub issued_at: Instant,
}

#[derive(Debug, Clone)]
pub struct SeekCoordinator {
    grace: Duration,
    pending: Option<PendingSeek>,
}

impl SeekCoordinator {
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            pending: None,
        }
    }

    /// The user released the bar at `target`. A later seek replaces an
    /// earlier one that hasn't resolved yet.
    pub fn begin(&mut self, target: i64, now: Instant) {
        self.pending = Some(PendingSeek {
            target,
            issued_at: now,
        });
    }

    pub fn on_offset(&mut self, offset: i64, now: Instant) -> OffsetGate {
        let Some(pending) = self.pending else {
            return OffsetGate::Apply;
        };
        if offset == pending.target || now.duration_since(pending.issued_at) >= self.grace {
            self.pending = None;
            OffsetGate::Apply
        } else {
            OffsetGate::Suppress
        }
    }

    /// The seek request failed; go back to trusting the server.
    pub fn seek_failed(&mut self) {
        self.pending = None;
    }

    pub fn pending(&self) -> Option<PendingSeek> {
        self.pending
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRACE: Duration = Duration::from_millis(1000);

    #[test]
    fn test_idle_applies_everything() {
        let mut seek = SeekCoordinator::new(GRACE);
        assert_eq!(seek.on_offset(10, Instant::now()), OffsetGate::Apply);
    }

    #[test]
    fn test_matching_echo_clears_pending() {
        let t0 = Instant::now();
        let mut seek = SeekCoordinator::new(GRACE);
        seek.begin(42, t0);

        assert_eq!(seek.on_offset(7, t0 + Duration::from_millis(100)), OffsetGate::Suppress);
        assert_eq!(seek.on_offset(8, t0 + Duration::from_millis(500)), OffsetGate::Suppress);
        assert_eq!(seek.on_offset(42, t0 + Duration::from_millis(600)), OffsetGate::Apply);
        assert!(!seek.is_pending());
        assert_eq!(seek.on_offset(43, t0 + Duration::from_millis(700)), OffsetGate::Apply);
    }

    #[test]
    fn test_grace_expiry_resumes_display() {
        let t0 = Instant::now();
        let mut seek = SeekCoordinator::new(GRACE);
        seek.begin(42, t0);

        assert_eq!(seek.on_offset(9, t0 + Duration::from_millis(999)), OffsetGate::Suppress);
        assert_eq!(seek.on_offset(9, t0 + GRACE), OffsetGate::Apply);
        assert_eq!(seek.pending(), None);
    }

    #[test]
    fn test_failure_clears_immediately() {
        let t0 = Instant::now();
        let mut seek = SeekCoordinator::new(GRACE);
        seek.begin(42, t0);
        seek.seek_failed();
        assert_eq!(seek.on_offset(3, t0 + Duration::from_millis(1)), OffsetGate::Apply);
    }
}
