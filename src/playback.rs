use std::time::{Duration, Instant};

use crate::goodvibes::Reply;

pub fn wrap_next(index: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        (index + 1) % len
    }
}

pub fn wrap_prev(index: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        (index + len - 1) % len
    }
}

/// Auto-advance state and the countdown shown while it runs.
#[derive(Debug, Clone)]
pub struct Playback {
    interval: Duration,
    enabled: bool,
    started: Option<Instant>,
    progress: f64,
}

impl Playback {
    pub fn new(interval: Duration, enabled: bool) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            enabled,
            started: None,
            progress: 0.0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Percentage in `[0, 100]` of the current interval that has elapsed.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn restart(&mut self, now: Instant) {
        self.started = Some(now);
        self.progress = 0.0;
    }

    pub fn stop(&mut self) {
        self.started = None;
        self.progress = 0.0;
    }

    pub fn update_progress(&mut self, now: Instant) {
        let Some(started) = self.started else {
            self.progress = 0.0;
            return;
        };
        let elapsed = now.saturating_duration_since(started).as_secs_f64();
        self.progress = (elapsed / self.interval.as_secs_f64() * 100.0).clamp(0.0, 100.0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStep {
    Advanced,
    Completed,
}

/// Sliding window over the displayed vibe's replies.
///
/// The window moves one reply at a time and stops on the last full page;
/// it never wraps back to the start.
#[derive(Debug, Clone)]
pub struct ReplyRotator {
    max_visible: usize,
    start: usize,
    total: usize,
    completed: bool,
}

impl ReplyRotator {
    pub fn new(max_visible: usize) -> Self {
        Self {
            max_visible: max_visible.max(1),
            start: 0,
            total: 0,
            completed: false,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn has_completed_cycle(&self) -> bool {
        self.completed
    }

    pub fn reset(&mut self, total: usize) {
        self.start = 0;
        self.total = total;
        self.completed = false;
    }

    /// True while there are more replies than fit and the last page has not been shown.
    pub fn needs_rotation(&self) -> bool {
        self.total > self.max_visible && !self.completed
    }

    pub fn last_start(&self) -> usize {
        self.total.saturating_sub(self.max_visible)
    }

    pub fn step(&mut self) -> RotationStep {
        if self.completed || self.start >= self.last_start() {
            self.completed = true;
            return RotationStep::Completed;
        }
        self.start += 1;
        RotationStep::Advanced
    }

    pub fn visible<'a>(&self, replies: &'a [Reply]) -> &'a [Reply] {
        let start = self.start.min(replies.len());
        let end = (start + self.max_visible).min(replies.len());
        &replies[start..end]
    }

    /// `(current, total)` page numbers, both 1-based.
    pub fn page(&self) -> (usize, usize) {
        let total = self.total.div_ceil(self.max_visible).max(1);
        let current = (self.start / self.max_visible + 1).min(total);
        (current, total)
    }
}
