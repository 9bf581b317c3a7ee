use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::goodvibes::{VibesPage, Window};

pub const NO_VIBES_MESSAGE: &str = "No Good Vibes found";
/// Upper bound on token pages fetched per load, initial page included.
pub const MAX_PAGES: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Days,
    Months,
    Paged,
}

impl Strategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "days" => Some(Strategy::Days),
            "months" => Some(Strategy::Months),
            "paged" => Some(Strategy::Paged),
            _ => None,
        }
    }

    /// Window length used when none is configured: days or months per step.
    pub fn default_window_size(self) -> u32 {
        match self {
            Strategy::Months => 1,
            Strategy::Days | Strategy::Paged => 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub strategy: Strategy,
    pub window_size: u32,
    pub pacing: Duration,
    pub cache_retry: Duration,
    pub max_windows: u32,
    pub avatar_size: String,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            strategy: Strategy::Days,
            window_size: 30,
            pacing: Duration::from_millis(1500),
            cache_retry: Duration::from_secs(2),
            max_windows: 24,
            avatar_size: "128x128".into(),
        }
    }
}

/// Where a vibes request reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    Window(Window),
    Page(Option<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    Initial,
    Background,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VibesRequest {
    pub generation: u64,
    pub kind: LoadKind,
    pub cursor: Cursor,
    pub avatar_size: String,
}

/// What the controller should do with a vibes response.
#[derive(Debug)]
pub enum Outcome {
    /// Response belongs to a superseded load.
    Stale,
    Replace(Vec<crate::goodvibes::Vibe>),
    Merge(Vec<crate::goodvibes::Vibe>),
    Empty,
    Failed,
    RetryLater,
    /// Background step failed or was refused; continuation is over.
    Stopped,
}

#[derive(Debug)]
pub struct Loader {
    settings: LoaderSettings,
    generation: u64,
    loading: bool,
    error: Option<String>,
    steps: u32,
    total_count: Option<usize>,
    token: Option<String>,
    next: Option<Cursor>,
    replies_in_flight: HashSet<String>,
}

impl Loader {
    pub fn new(settings: LoaderSettings) -> Self {
        Self {
            settings,
            generation: 0,
            loading: false,
            error: None,
            steps: 0,
            total_count: None,
            token: None,
            next: None,
            replies_in_flight: HashSet::new(),
        }
    }

    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn total_count(&self) -> Option<usize> {
        self.total_count
    }

    /// Starts a new load generation and returns its first request.
    pub fn begin(&mut self) -> VibesRequest {
        self.generation += 1;
        self.loading = true;
        self.error = None;
        self.steps = 0;
        self.total_count = None;
        self.token = None;
        self.next = None;
        let cursor = match self.settings.strategy {
            Strategy::Days => Cursor::Window(Window::Days(self.settings.window_size)),
            Strategy::Months => Cursor::Window(Window::Months(self.settings.window_size)),
            Strategy::Paged => Cursor::Page(None),
        };
        info!(generation = self.generation, ?cursor, "loading good vibes");
        self.request(LoadKind::Initial, cursor)
    }

    /// Drops every in-flight load so late responses are ignored.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.loading = false;
        self.next = None;
    }

    pub fn on_response(
        &mut self,
        generation: u64,
        kind: LoadKind,
        result: anyhow::Result<VibesPage>,
    ) -> Outcome {
        if generation != self.generation {
            debug!(generation, current = self.generation, "dropping stale vibes response");
            return Outcome::Stale;
        }

        match (kind, result) {
            (LoadKind::Initial, Err(err)) => {
                warn!("initial load failed: {err:#}");
                self.loading = false;
                self.error = Some(format!("{err:#}"));
                Outcome::Failed
            }
            (LoadKind::Initial, Ok(page)) if !page.cache_ready() => {
                info!("backend cache not ready, retrying");
                Outcome::RetryLater
            }
            (LoadKind::Initial, Ok(page)) => {
                self.loading = false;
                self.steps = 1;
                self.absorb_metadata(&page);
                if page.data.is_empty() {
                    self.error = Some(NO_VIBES_MESSAGE.to_string());
                    Outcome::Empty
                } else {
                    self.error = None;
                    Outcome::Replace(page.data)
                }
            }
            (LoadKind::Background, Err(err)) => {
                warn!("background load stopped: {err:#}");
                self.next = None;
                Outcome::Stopped
            }
            (LoadKind::Background, Ok(page)) if !page.cache_ready() => {
                debug!("background window not cached yet");
                self.next = None;
                Outcome::Stopped
            }
            (LoadKind::Background, Ok(page)) => {
                self.steps += 1;
                self.absorb_metadata(&page);
                Outcome::Merge(page.data)
            }
        }
    }

    fn absorb_metadata(&mut self, page: &VibesPage) {
        if let Some(total) = page.total_count() {
            self.total_count = Some(total);
        }
        self.token = page.continuation_token().map(str::to_string);
    }

    /// Decides whether another background step is needed given how many
    /// vibes are now loaded. The step is held until [`Loader::take_next`].
    pub fn plan_next(&mut self, loaded: usize) -> bool {
        self.next = match self.settings.strategy {
            Strategy::Paged => self
                .token
                .clone()
                .filter(|_| self.steps < MAX_PAGES)
                .map(|token| Cursor::Page(Some(token))),
            Strategy::Days | Strategy::Months => {
                let wants_more = self.total_count.is_some_and(|total| loaded < total);
                if wants_more && self.steps < self.settings.max_windows {
                    let span = self.settings.window_size.saturating_mul(self.steps + 1);
                    Some(Cursor::Window(match self.settings.strategy {
                        Strategy::Months => Window::Months(span),
                        _ => Window::Days(span),
                    }))
                } else {
                    None
                }
            }
        };
        if self.next.is_none() && self.steps > 0 {
            debug!(loaded, total = ?self.total_count, "background loading complete");
        }
        self.next.is_some()
    }

    pub fn take_next(&mut self) -> Option<VibesRequest> {
        let cursor = self.next.take()?;
        Some(self.request(LoadKind::Background, cursor))
    }

    fn request(&self, kind: LoadKind, cursor: Cursor) -> VibesRequest {
        VibesRequest {
            generation: self.generation,
            kind,
            cursor,
            avatar_size: self.settings.avatar_size.clone(),
        }
    }

    /// Marks a reply fetch as started; false if one is already running.
    pub fn claim_replies(&mut self, vibe_id: &str) -> bool {
        self.replies_in_flight.insert(vibe_id.to_string())
    }

    pub fn release_replies(&mut self, vibe_id: &str) {
        self.replies_in_flight.remove(vibe_id);
    }

    pub fn replies_in_flight(&self, vibe_id: &str) -> bool {
        self.replies_in_flight.contains(vibe_id)
    }
}
