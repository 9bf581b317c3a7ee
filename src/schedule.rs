//! Named, individually cancellable timers driven by a caller-supplied clock.
//!
//! Nothing here sleeps or spawns: the event loop asks for the next deadline,
//! waits for input up to that point, then drains whatever is due with
//! [`Scheduler::pop_due`]. Tests drive the same API with synthetic instants.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Declaration order breaks ties between timers due at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerId {
    CacheRetry,
    BackgroundWindow,
    HourlyRefresh,
    ReplyRotation,
    Advance,
    Progress,
    IdleHide,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    due: Instant,
    period: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    entries: BTreeMap<TimerId, Entry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `id` to fire once after `delay`, replacing any pending deadline.
    pub fn start_once(&mut self, id: TimerId, now: Instant, delay: Duration) {
        self.entries.insert(
            id,
            Entry {
                due: now + delay,
                period: None,
            },
        );
    }

    /// Arms `id` to fire every `period`, the first time one period from `now`.
    pub fn start_repeating(&mut self, id: TimerId, now: Instant, period: Duration) {
        let period = period.max(Duration::from_millis(1));
        self.entries.insert(
            id,
            Entry {
                due: now + period,
                period: Some(period),
            },
        );
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn deadline(&self, id: TimerId) -> Option<Instant> {
        self.entries.get(&id).map(|entry| entry.due)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.values().map(|entry| entry.due).min()
    }

    /// Removes or reschedules the earliest timer due at or before `now`.
    ///
    /// Returns the timer and the instant it was scheduled for. A repeating
    /// timer that fell more than a period behind fires once and resumes one
    /// period after `now`; missed periods are dropped, not replayed.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerId, Instant)> {
        let (id, entry) = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.due <= now)
            .min_by_key(|(id, entry)| (entry.due, **id))
            .map(|(id, entry)| (*id, *entry))?;

        match entry.period {
            Some(period) => {
                if let Some(slot) = self.entries.get_mut(&id) {
                    let next = entry.due + period;
                    slot.due = if next <= now { now + period } else { next };
                }
            }
            None => {
                self.entries.remove(&id);
            }
        }
        Some((id, entry.due))
    }
}
