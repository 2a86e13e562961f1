//! Single-shot debounce timer.
//!
//! Panning and zooming emit a stream of extent-changed events. Each event
//! restarts the slot; the slot fires once when [`DEBOUNCE_INTERVAL`]
//! passes without another event. A continuous drag therefore renders only
//! when the user pauses, never once per event.
//!
//! The slot does not own a thread or a timer. The host calls
//! [`DebounceSlot::poll`] from its own loop (or from a timer armed at
//! [`DebounceSlot::deadline`]), which keeps every render on the host thread.

use std::time::{Duration, Instant};

/// Quiet time after the last extent change before a render.
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(150);

/// At most one pending deadline per family.
#[derive(Debug, Clone)]
pub struct DebounceSlot {
    interval: Duration,
    deadline: Option<Instant>,
}

impl Default for DebounceSlot {
    fn default() -> Self {
        Self::new(DEBOUNCE_INTERVAL)
    }
}

impl DebounceSlot {
    /// Create a slot with a custom interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Arm the slot, or push an armed deadline back to `now + interval`.
    pub fn restart(&mut self, now: Instant) {
        self.deadline = Some(now + self.interval);
    }

    /// Fire if the deadline has passed.
    ///
    /// # Returns
    ///
    /// `true` exactly once per quiet period; the slot is disarmed after
    /// firing.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Disarm without firing.
    pub fn stop(&mut self) {
        self.deadline = None;
    }

    /// Whether a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Pending deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline, zero once it has passed.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
