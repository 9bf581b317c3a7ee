//! The carousel controller: loader, playback, reply rotation and idle
//! visibility over one shared vibe collection.
//!
//! The controller never performs I/O. Every operation takes the current
//! instant and returns the fetches it wants made; results come back through
//! [`Controller::apply`]. Timers live in a [`Scheduler`] that the caller
//! drains with [`Controller::tick`].

use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::collection::VibeCollection;
use crate::goodvibes::{Reply, Vibe, VibesPage};
use crate::idle::IdleTracker;
use crate::loader::{LoadKind, Loader, LoaderSettings, Outcome, VibesRequest};
use crate::playback::{wrap_next, wrap_prev, Playback, ReplyRotator, RotationStep};
use crate::schedule::{Scheduler, TimerId};

const LATE_TIMER: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct Settings {
    pub interval: Duration,
    pub progress_tick: Duration,
    pub auto_play: bool,
    pub max_visible_replies: usize,
    pub reply_interval: Duration,
    pub hide_delay: Duration,
    pub refresh_interval: Duration,
    pub loader: LoaderSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5000),
            progress_tick: Duration::from_millis(50),
            auto_play: false,
            max_visible_replies: 2,
            reply_interval: Duration::from_millis(4000),
            hide_delay: Duration::from_millis(7000),
            refresh_interval: Duration::from_secs(60 * 60),
            loader: LoaderSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Vibes(VibesRequest),
    Replies { vibe_id: String },
}

#[derive(Debug)]
pub enum Response {
    Vibes {
        generation: u64,
        kind: LoadKind,
        result: Result<VibesPage>,
    },
    Replies {
        vibe_id: String,
        result: Result<Vibe>,
    },
}

/// The parts of the display that derived timers depend on.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    index: Option<usize>,
    vibe_id: Option<String>,
    len: usize,
    auto_play: bool,
    reply_total: usize,
}

pub struct Controller {
    settings: Settings,
    collection: VibeCollection,
    current: usize,
    playback: Playback,
    rotator: ReplyRotator,
    idle: IdleTracker,
    loader: Loader,
    scheduler: Scheduler,
    started: bool,
    closed: bool,
}

impl Controller {
    pub fn new(settings: Settings) -> Self {
        Self {
            collection: VibeCollection::new(),
            current: 0,
            playback: Playback::new(settings.interval, settings.auto_play),
            rotator: ReplyRotator::new(settings.max_visible_replies),
            idle: IdleTracker::new(settings.hide_delay),
            loader: Loader::new(settings.loader.clone()),
            scheduler: Scheduler::new(),
            started: false,
            closed: false,
            settings,
        }
    }

    /// Kicks off the first load and the hourly refresh.
    pub fn start(&mut self, now: Instant) -> Vec<Request> {
        if self.started || self.closed {
            return Vec::new();
        }
        self.started = true;
        self.scheduler
            .start_repeating(TimerId::HourlyRefresh, now, self.settings.refresh_interval);
        self.load_initial()
    }

    pub fn load_initial(&mut self) -> Vec<Request> {
        if self.closed {
            return Vec::new();
        }
        self.scheduler.cancel(TimerId::CacheRetry);
        self.scheduler.cancel(TimerId::BackgroundWindow);
        vec![Request::Vibes(self.loader.begin())]
    }

    pub fn refresh(&mut self) -> Vec<Request> {
        info!("refreshing good vibes");
        self.load_initial()
    }

    /// Cancels every timer and makes late responses no-ops.
    pub fn shutdown(&mut self) {
        self.closed = true;
        self.scheduler.cancel_all();
        self.loader.invalidate();
        self.playback.stop();
    }

    pub fn next(&mut self, now: Instant) -> Vec<Request> {
        self.navigate(now, wrap_next)
    }

    pub fn prev(&mut self, now: Instant) -> Vec<Request> {
        self.navigate(now, wrap_prev)
    }

    pub fn jump_to(&mut self, index: usize, now: Instant) -> Vec<Request> {
        if index >= self.collection.len() {
            return Vec::new();
        }
        self.navigate(now, |_, _| index)
    }

    /// Jumps to the vibe at `fraction` of the way through the collection.
    pub fn jump_to_fraction(&mut self, fraction: f64, now: Instant) -> Vec<Request> {
        let len = self.collection.len();
        if len == 0 || !fraction.is_finite() {
            return Vec::new();
        }
        let target = (fraction.clamp(0.0, 1.0) * len as f64).floor() as usize;
        self.jump_to(target.min(len - 1), now)
    }

    pub fn set_auto_play(&mut self, enabled: bool, now: Instant) -> Vec<Request> {
        if self.closed {
            return Vec::new();
        }
        let before = self.snapshot();
        self.playback.set_enabled(enabled);
        info!(enabled, "auto-play toggled");
        self.settle(before, now, false)
    }

    pub fn toggle_auto_play(&mut self, now: Instant) -> Vec<Request> {
        self.set_auto_play(!self.playback.is_enabled(), now)
    }

    pub fn pointer_moved(&mut self, now: Instant) {
        if !self.closed {
            self.idle.pointer_moved(now, &mut self.scheduler);
        }
    }

    pub fn pointer_left(&mut self) {
        self.idle.pointer_left(&mut self.scheduler);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Fires every timer due at or before `now`, in deadline order. Each
    /// timer fires at most once per call however late the call is.
    pub fn tick(&mut self, now: Instant) -> Vec<Request> {
        let mut requests = Vec::new();
        if self.closed {
            return requests;
        }
        // Timers act at `now` so anything they re-arm lands after it.
        while let Some((id, due)) = self.scheduler.pop_due(now) {
            let late = now.saturating_duration_since(due);
            if late >= LATE_TIMER {
                debug!(?id, late_ms = late.as_millis() as u64, "timer fired late");
            }
            requests.extend(self.fire(id, now));
        }
        requests
    }

    pub fn apply(&mut self, response: Response, now: Instant) -> Vec<Request> {
        if self.closed {
            return Vec::new();
        }
        match response {
            Response::Vibes {
                generation,
                kind,
                result,
            } => self.apply_vibes(generation, kind, result, now),
            Response::Replies { vibe_id, result } => self.apply_replies(vibe_id, result, now),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn vibes(&self) -> &[Vibe] {
        self.collection.as_slice()
    }

    pub fn len(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        (!self.collection.is_empty()).then_some(self.current)
    }

    pub fn current_vibe(&self) -> Option<&Vibe> {
        self.collection.get(self.current)
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.loader.error()
    }

    pub fn total_count(&self) -> Option<usize> {
        self.loader.total_count()
    }

    pub fn auto_play(&self) -> bool {
        self.playback.is_enabled()
    }

    pub fn progress(&self) -> f64 {
        self.playback.progress()
    }

    pub fn controls_visible(&self) -> bool {
        self.idle.is_visible()
    }

    pub fn reply_start(&self) -> usize {
        self.rotator.start()
    }

    pub fn has_completed_cycle(&self) -> bool {
        self.rotator.has_completed_cycle()
    }

    pub fn reply_page(&self) -> (usize, usize) {
        self.rotator.page()
    }

    pub fn visible_replies(&self) -> &[Reply] {
        self.current_vibe()
            .and_then(|vibe| vibe.replies.as_deref())
            .map(|replies| self.rotator.visible(replies))
            .unwrap_or(&[])
    }

    pub fn is_loading_replies(&self) -> bool {
        self.current_vibe()
            .is_some_and(|vibe| vibe.replies.is_none() && self.loader.replies_in_flight(&vibe.id))
    }

    fn fire(&mut self, id: TimerId, now: Instant) -> Vec<Request> {
        match id {
            TimerId::CacheRetry => self.load_initial(),
            TimerId::BackgroundWindow => self
                .loader
                .take_next()
                .map(Request::Vibes)
                .into_iter()
                .collect(),
            TimerId::HourlyRefresh => self.refresh(),
            TimerId::ReplyRotation => self.rotate_replies(now),
            TimerId::Advance => self.auto_advance(now),
            TimerId::Progress => {
                self.playback.update_progress(now);
                Vec::new()
            }
            TimerId::IdleHide => {
                self.idle.expire();
                Vec::new()
            }
        }
    }

    fn auto_advance(&mut self, at: Instant) -> Vec<Request> {
        if self.collection.len() <= 1 {
            return Vec::new();
        }
        if self.rotator.needs_rotation() {
            debug!(
                start = self.rotator.start(),
                total = self.rotator.total(),
                "holding playback for reply rotation"
            );
            return Vec::new();
        }
        self.navigate(at, wrap_next)
    }

    fn rotate_replies(&mut self, at: Instant) -> Vec<Request> {
        match self.rotator.step() {
            RotationStep::Advanced => Vec::new(),
            RotationStep::Completed => {
                self.scheduler.cancel(TimerId::ReplyRotation);
                debug!("reply rotation cycle complete");
                if self.playback.is_enabled() && self.collection.len() > 1 {
                    self.navigate(at, wrap_next)
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn navigate(&mut self, now: Instant, step: impl FnOnce(usize, usize) -> usize) -> Vec<Request> {
        if self.closed || self.collection.is_empty() {
            return Vec::new();
        }
        let before = self.snapshot();
        self.current = step(self.current, self.collection.len());
        self.settle(before, now, true)
    }

    fn apply_vibes(
        &mut self,
        generation: u64,
        kind: LoadKind,
        result: Result<VibesPage>,
        now: Instant,
    ) -> Vec<Request> {
        let before = self.snapshot();
        let replaced = match self.loader.on_response(generation, kind, result) {
            Outcome::Stale | Outcome::Failed | Outcome::Empty | Outcome::Stopped => {
                return Vec::new();
            }
            Outcome::RetryLater => {
                let delay = self.loader.settings().cache_retry;
                self.scheduler.start_once(TimerId::CacheRetry, now, delay);
                return Vec::new();
            }
            Outcome::Replace(vibes) => {
                self.collection = VibeCollection::from_vibes(vibes);
                self.current = 0;
                info!(count = self.collection.len(), "good vibes loaded");
                true
            }
            Outcome::Merge(vibes) => {
                let anchor = self.current_vibe().map(|vibe| vibe.id.clone());
                let added = self.collection.merge(vibes);
                if let Some(position) = anchor.and_then(|id| self.collection.position(&id)) {
                    self.current = position;
                }
                self.current = self.current.min(self.collection.len().saturating_sub(1));
                info!(added, count = self.collection.len(), "merged older good vibes");
                false
            }
        };

        if self.loader.plan_next(self.collection.len()) {
            let pacing = self.loader.settings().pacing;
            self.scheduler
                .start_once(TimerId::BackgroundWindow, now, pacing);
        }
        self.settle(before, now, replaced)
    }

    fn apply_replies(&mut self, vibe_id: String, result: Result<Vibe>, now: Instant) -> Vec<Request> {
        self.loader.release_replies(&vibe_id);
        let vibe = match result {
            Ok(vibe) => vibe,
            Err(err) => {
                warn!(vibe_id, "failed to load replies: {err:#}");
                return Vec::new();
            }
        };
        let before = self.snapshot();
        let replies = vibe.replies.unwrap_or_default();
        let count = replies.len();
        if self.collection.attach_replies(&vibe_id, replies) {
            debug!(vibe_id, count, "replies attached");
        }
        self.settle(before, now, false)
    }

    fn snapshot(&self) -> Snapshot {
        let vibe = self.current_vibe();
        Snapshot {
            index: self.current_index(),
            vibe_id: vibe.map(|vibe| vibe.id.clone()),
            len: self.collection.len(),
            auto_play: self.playback.is_enabled(),
            reply_total: vibe
                .and_then(|vibe| vibe.replies.as_ref())
                .map_or(0, Vec::len),
        }
    }

    /// Re-derives timers from what changed since `before`.
    ///
    /// `displayed_changed` forces a reset even when the snapshot looks the
    /// same, e.g. manual navigation within a single-vibe collection.
    fn settle(&mut self, before: Snapshot, now: Instant, displayed_changed: bool) -> Vec<Request> {
        let after = self.snapshot();

        if displayed_changed
            || after.index != before.index
            || after.len != before.len
            || after.auto_play != before.auto_play
        {
            self.restart_playback(now);
        }

        if displayed_changed
            || after.index != before.index
            || after.vibe_id != before.vibe_id
            || after.reply_total != before.reply_total
        {
            self.reset_rotation(now);
        }

        self.request_replies()
    }

    fn restart_playback(&mut self, now: Instant) {
        if self.playback.is_enabled() && self.collection.len() > 1 {
            self.scheduler
                .start_repeating(TimerId::Advance, now, self.settings.interval);
            self.scheduler
                .start_repeating(TimerId::Progress, now, self.settings.progress_tick);
            self.playback.restart(now);
        } else {
            self.scheduler.cancel(TimerId::Advance);
            self.scheduler.cancel(TimerId::Progress);
            self.playback.stop();
        }
    }

    fn reset_rotation(&mut self, now: Instant) {
        let total = self
            .current_vibe()
            .and_then(|vibe| vibe.replies.as_ref())
            .map_or(0, Vec::len);
        self.rotator.reset(total);
        self.scheduler.cancel(TimerId::ReplyRotation);
        if self.rotator.needs_rotation() {
            self.scheduler
                .start_repeating(TimerId::ReplyRotation, now, self.settings.reply_interval);
        }
    }

    fn request_replies(&mut self) -> Vec<Request> {
        let Some(vibe) = self.collection.get(self.current) else {
            return Vec::new();
        };
        if vibe.reply_count == 0 || vibe.replies.is_some() {
            return Vec::new();
        }
        let vibe_id = vibe.id.clone();
        if self.loader.claim_replies(&vibe_id) {
            debug!(vibe_id, "requesting replies");
            vec![Request::Replies { vibe_id }]
        } else {
            Vec::new()
        }
    }
}
