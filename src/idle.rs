use std::time::{Duration, Instant};

use crate::schedule::{Scheduler, TimerId};

/// Shows transport controls while the pointer is active.
#[derive(Debug, Clone)]
pub struct IdleTracker {
    hide_delay: Duration,
    visible: bool,
}

impl IdleTracker {
    pub fn new(hide_delay: Duration) -> Self {
        Self {
            hide_delay,
            visible: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Shows the controls and restarts the single hide countdown.
    pub fn pointer_moved(&mut self, now: Instant, scheduler: &mut Scheduler) {
        self.visible = true;
        scheduler.start_once(TimerId::IdleHide, now, self.hide_delay);
    }

    pub fn pointer_left(&mut self, scheduler: &mut Scheduler) {
        self.visible = false;
        scheduler.cancel(TimerId::IdleHide);
    }

    pub fn expire(&mut self) {
        self.visible = false;
    }
}
