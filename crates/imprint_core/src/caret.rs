//! Blinking caret hint shown while the overlay is not being edited
//!
//! Tick-driven: the host calls [`CaretBlink::tick`] from its frame loop (or
//! from a timer task) and reads the visibility back. Purely cosmetic.

use std::time::{Duration, Instant};

/// Toggle interval of the caret hint
pub const CARET_BLINK_INTERVAL: Duration = Duration::from_millis(530);

#[derive(Debug, Clone)]
pub struct CaretBlink {
    interval: Duration,
    visible: bool,
    /// Time of the last toggle while running
    last_toggle: Option<Instant>,
}

impl CaretBlink {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            visible: true,
            last_toggle: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.last_toggle.is_some()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Start blinking from `now`. No-op when already running.
    pub fn start(&mut self, now: Instant) {
        if self.last_toggle.is_none() {
            self.last_toggle = Some(now);
        }
    }

    /// Stop blinking; the caret is left visible for the next start
    pub fn stop(&mut self) {
        self.last_toggle = None;
        self.visible = true;
    }

    /// Advance to `now`, toggling once per elapsed interval
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(last) = self.last_toggle else {
            return self.visible;
        };

        let elapsed = now.saturating_duration_since(last);
        let toggles = (elapsed.as_nanos() / self.interval.as_nanos()) as u64;
        if toggles > 0 {
            if toggles % 2 == 1 {
                self.visible = !self.visible;
            }
            self.last_toggle = Some(last + self.interval * toggles as u32);
        }
        self.visible
    }
}

impl Default for CaretBlink {
    fn default() -> Self {
        Self::new(CARET_BLINK_INTERVAL)
    }
}
