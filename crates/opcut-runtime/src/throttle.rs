#![forbid(unsafe_code)]

//! Render-rate limiting.
//!
//! [`FrameThrottle`] owns the single outstanding render timer. It is pure:
//! every method takes the current time, so the scheduling rules can be
//! tested without a clock.

use std::time::Duration;

/// Single-timer frame throttle.
#[derive(Debug, Clone, Default)]
pub struct FrameThrottle {
    interval: Option<Duration>,
    last_render: Option<Duration>,
    deadline: Option<Duration>,
}

impl FrameThrottle {
    /// `interval` is the minimum spacing between renders; `None` disables
    /// throttling.
    #[must_use]
    pub const fn new(interval: Option<Duration>) -> Self {
        Self {
            interval,
            last_render: None,
            deadline: None,
        }
    }

    /// Ask for a render.
    ///
    /// Returns the deadline of a newly armed timer, or `None` when a timer is
    /// already outstanding (the pending render will pick up the latest state).
    pub fn request(&mut self, now: Duration) -> Option<Duration> {
        if self.deadline.is_some() {
            return None;
        }
        let deadline = now + self.delay(now);
        self.deadline = Some(deadline);
        Some(deadline)
    }

    /// `max(0, interval - (now - last_render))`; zero before the first render.
    #[must_use]
    pub fn delay(&self, now: Duration) -> Duration {
        match (self.interval, self.last_render) {
            (Some(interval), Some(last)) => interval.saturating_sub(now.saturating_sub(last)),
            _ => Duration::ZERO,
        }
    }

    #[must_use]
    pub fn is_due(&self, now: Duration) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    #[must_use]
    pub const fn last_render(&self) -> Option<Duration> {
        self.last_render
    }

    /// Record that the timer fired and a render happened at `now`.
    pub fn fired(&mut self, now: Duration) {
        self.deadline = None;
        self.last_render = Some(now);
    }

    /// Drop the pending timer and render history.
    pub fn reset(&mut self) {
        self.deadline = None;
        self.last_render = None;
    }
}
