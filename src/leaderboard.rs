use anyhow::Result;
use chrono::{DateTime, Datelike, TimeZone};
use tracing::{debug, warn};

use crate::format::month_name;
use crate::goodvibes::MonthlyStandings;

pub const EMPTY_SECTION: &str = "No data for this month";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of<Tz: TimeZone>(date: &DateTime<Tz>) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// `"October 2026"`.
    pub fn label(&self) -> String {
        format!("{} {}", month_name(self.month), self.year)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Recipients,
    Senders,
    Collections,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Recipients, Section::Senders, Section::Collections];

    pub fn title(self) -> &'static str {
        match self {
            Section::Recipients => "Most Appreciated",
            Section::Senders => "Top Praisers",
            Section::Collections => "Most Popular Collections",
        }
    }

    fn slot(self) -> usize {
        match self {
            Section::Recipients => 0,
            Section::Senders => 1,
            Section::Collections => 2,
        }
    }
}

/// Monthly "All-Stars" panel that follows the displayed vibe's month.
#[derive(Debug, Clone)]
pub struct Leaderboard {
    visible: bool,
    limit: u32,
    month: Option<MonthKey>,
    requested: Option<MonthKey>,
    loading: bool,
    standings: Option<MonthlyStandings>,
    collapsed: [bool; 3],
}

impl Leaderboard {
    pub fn new(visible: bool, limit: u32) -> Self {
        Self {
            visible,
            limit: limit.max(1),
            month: None,
            requested: None,
            loading: false,
            standings: None,
            collapsed: [false; 3],
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Month of the displayed vibe, which is what the header shows.
    pub fn month(&self) -> Option<MonthKey> {
        self.month
    }

    pub fn standings(&self) -> Option<&MonthlyStandings> {
        self.standings.as_ref()
    }

    pub fn is_collapsed(&self, section: Section) -> bool {
        self.collapsed[section.slot()]
    }

    pub fn toggle_section(&mut self, section: Section) {
        let slot = &mut self.collapsed[section.slot()];
        *slot = !*slot;
    }

    /// Tracks the displayed vibe's month; returns a month to fetch when it changed.
    pub fn follow(&mut self, month: Option<MonthKey>) -> Option<MonthKey> {
        self.month = month;
        self.request_if_needed()
    }

    pub fn toggle_visible(&mut self) -> Option<MonthKey> {
        self.visible = !self.visible;
        self.request_if_needed()
    }

    fn request_if_needed(&mut self) -> Option<MonthKey> {
        if !self.visible || self.month.is_none() || self.month == self.requested {
            return None;
        }
        self.requested = self.month;
        self.loading = true;
        self.month
    }

    /// Applies a fetch result; results for a month no longer wanted are dropped.
    pub fn apply(&mut self, month: MonthKey, result: Result<MonthlyStandings>) -> bool {
        if self.requested != Some(month) {
            debug!(year = month.year, month = month.month, "dropping stale leaderboard");
            return false;
        }
        self.loading = false;
        match result {
            Ok(standings) => {
                self.standings = Some(standings);
                true
            }
            Err(err) => {
                warn!(
                    year = month.year,
                    month = month.month,
                    "failed to load leaderboard: {err:#}"
                );
                false
            }
        }
    }
}
