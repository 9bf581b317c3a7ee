use std::cell::Cell;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Local;
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{
    self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event,
    KeyCode, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Borders, Gauge, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use tracing::debug;
use unicode_width::UnicodeWidthStr;

use crate::carousel::{Controller, Request, Response, Settings};
use crate::data::{LeaderboardService, VibeService};
use crate::format;
use crate::goodvibes::{MonthlyStandings, RankedCollection, RankedUser, Reply, Vibe};
use crate::leaderboard::{Leaderboard, MonthKey, Section, EMPTY_SECTION};
use crate::loader::{Cursor, NO_VIBES_MESSAGE};

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
/// Above this many vibes the position dots become a clickable bar.
const DOTS_LIMIT: usize = 50;
const LEADERBOARD_WIDTH: u16 = 38;
const LEADERBOARD_MIN_TOTAL_WIDTH: u16 = 90;
const IDLE_TICK: Duration = Duration::from_millis(120);

pub struct Options {
    pub settings: Settings,
    pub vibe_service: Arc<dyn VibeService>,
    pub leaderboard_service: Option<Arc<dyn LeaderboardService>>,
    pub show_leaderboard: bool,
    pub leaderboard_limit: u32,
    pub api_base_url: String,
    pub status_message: String,
}

enum AsyncResponse {
    Carousel(Response),
    Leaderboard {
        month: MonthKey,
        result: Result<MonthlyStandings>,
    },
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_tick) >= IDLE_TICK {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

/// Where the position indicator was drawn, so clicks can be mapped back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Indicator {
    Dots(Rect),
    Bar(Rect),
}

pub struct Model {
    controller: Controller,
    leaderboard: Leaderboard,
    vibe_service: Arc<dyn VibeService>,
    leaderboard_service: Option<Arc<dyn LeaderboardService>>,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
    spinner: Spinner,
    api_base_url: String,
    status_message: String,
    indicator: Cell<Option<Indicator>>,
    needs_redraw: bool,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        let show_leaderboard = opts.show_leaderboard && opts.leaderboard_service.is_some();
        Self {
            controller: Controller::new(opts.settings),
            leaderboard: Leaderboard::new(show_leaderboard, opts.leaderboard_limit),
            vibe_service: opts.vibe_service,
            leaderboard_service: opts.leaderboard_service,
            response_tx,
            response_rx,
            spinner: Spinner::new(),
            api_base_url: opts.api_base_url,
            status_message: opts.status_message,
            indicator: Cell::new(None),
            needs_redraw: true,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        stdout.execute(EnableFocusChange)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);
        self.controller.shutdown();

        disable_raw_mode()?;
        terminal.backend_mut().execute(DisableFocusChange)?;
        terminal.backend_mut().execute(DisableMouseCapture)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let requests = self.controller.start(Instant::now());
        self.dispatch(requests);

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }
            self.fire_timers(Instant::now());

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            if event::poll(self.poll_timeout(Instant::now()))? {
                let now = Instant::now();
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key.code, now)? {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse, now),
                    Event::FocusLost => {
                        self.controller.pointer_left();
                        self.mark_dirty();
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            let now = Instant::now();
            if self.is_busy() {
                if self.spinner.advance(now) {
                    self.mark_dirty();
                }
            } else {
                self.spinner.reset();
            }
        }

        Ok(())
    }

    fn poll_timeout(&self, now: Instant) -> Duration {
        let until_timer = self
            .controller
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
            .unwrap_or(IDLE_TICK);
        until_timer.min(IDLE_TICK)
    }

    fn is_busy(&self) -> bool {
        self.controller.is_loading()
            || self.controller.is_loading_replies()
            || self.leaderboard.is_loading()
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn fire_timers(&mut self, now: Instant) {
        let due = self
            .controller
            .next_deadline()
            .is_some_and(|deadline| deadline <= now);
        if due {
            let requests = self.controller.tick(now);
            self.dispatch(requests);
            self.mark_dirty();
        }
    }

    /// Runs fetches on worker threads and keeps the leaderboard on the shown month.
    fn dispatch(&mut self, requests: Vec<Request>) {
        for request in requests {
            let service = Arc::clone(&self.vibe_service);
            let tx = self.response_tx.clone();
            match request {
                Request::Vibes(request) => {
                    thread::spawn(move || {
                        let result = match &request.cursor {
                            Cursor::Window(window) => {
                                service.load_window(*window, &request.avatar_size)
                            }
                            Cursor::Page(token) => service.load_page(token.as_deref()),
                        };
                        let _ = tx.send(AsyncResponse::Carousel(Response::Vibes {
                            generation: request.generation,
                            kind: request.kind,
                            result,
                        }));
                    });
                }
                Request::Replies { vibe_id } => {
                    thread::spawn(move || {
                        let result = service.load_vibe(&vibe_id);
                        let _ = tx.send(AsyncResponse::Carousel(Response::Replies {
                            vibe_id,
                            result,
                        }));
                    });
                }
            }
        }
        self.sync_leaderboard();
    }

    fn displayed_month(&self) -> Option<MonthKey> {
        self.controller
            .current_vibe()
            .map(|vibe| MonthKey::of(&vibe.creation_date.with_timezone(&Local)))
    }

    fn sync_leaderboard(&mut self) {
        let month = self.displayed_month();
        let fetch = self.leaderboard.follow(month);
        self.fetch_leaderboard(fetch);
    }

    fn fetch_leaderboard(&mut self, month: Option<MonthKey>) {
        let (Some(month), Some(service)) = (month, self.leaderboard_service.as_ref()) else {
            return;
        };
        let service = Arc::clone(service);
        let limit = self.leaderboard.limit();
        let tx = self.response_tx.clone();
        debug!(year = month.year, month = month.month, "requesting leaderboard");
        thread::spawn(move || {
            let result = service.load_month(month.year, month.month, limit);
            let _ = tx.send(AsyncResponse::Leaderboard { month, result });
        });
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message, Instant::now());
            changed = true;
        }
        changed
    }

    fn handle_async_response(&mut self, message: AsyncResponse, now: Instant) {
        match message {
            AsyncResponse::Carousel(response) => {
                let requests = self.controller.apply(response, now);
                self.dispatch(requests);
            }
            AsyncResponse::Leaderboard { month, result } => {
                self.leaderboard.apply(month, result);
            }
        }
    }

    fn handle_key(&mut self, code: KeyCode, now: Instant) -> Result<bool> {
        self.controller.pointer_moved(now);
        let requests = match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Left | KeyCode::Char('h') => self.controller.prev(now),
            KeyCode::Right | KeyCode::Char('l') => self.controller.next(now),
            KeyCode::Char(' ') | KeyCode::Char('p') => self.controller.toggle_auto_play(now),
            KeyCode::Char('r') => {
                self.status_message = "Refreshing Good Vibes…".to_string();
                self.controller.refresh()
            }
            KeyCode::Home | KeyCode::Char('g') => self.controller.jump_to(0, now),
            KeyCode::End | KeyCode::Char('G') => {
                let last = self.controller.len().saturating_sub(1);
                self.controller.jump_to(last, now)
            }
            KeyCode::Char('b') => {
                let fetch = self.leaderboard.toggle_visible();
                self.fetch_leaderboard(fetch);
                Vec::new()
            }
            KeyCode::Char('1') => self.toggle_section(Section::Recipients),
            KeyCode::Char('2') => self.toggle_section(Section::Senders),
            KeyCode::Char('3') => self.toggle_section(Section::Collections),
            _ => Vec::new(),
        };
        self.dispatch(requests);
        self.mark_dirty();
        Ok(false)
    }

    fn toggle_section(&mut self, section: Section) -> Vec<Request> {
        self.leaderboard.toggle_section(section);
        Vec::new()
    }

    fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        self.controller.pointer_moved(now);
        self.mark_dirty();
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let Some(indicator) = self.indicator.get() else {
            return;
        };
        let requests = match indicator {
            Indicator::Bar(area) if contains(area, mouse.column, mouse.row) => {
                let offset = f64::from(mouse.column - area.x);
                self.controller
                    .jump_to_fraction(offset / f64::from(area.width.max(1)), now)
            }
            Indicator::Dots(area) if contains(area, mouse.column, mouse.row) => {
                let index = usize::from((mouse.column - area.x) / 2);
                self.controller.jump_to(index, now)
            }
            _ => Vec::new(),
        };
        self.dispatch(requests);
    }

    fn draw(&self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let controls_height = if self.controller.controls_visible() { 4 } else { 0 };
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(controls_height),
                Constraint::Length(1),
            ])
            .split(full);

        self.draw_header(frame, layout[0]);

        let show_board =
            self.leaderboard.is_visible() && full.width >= LEADERBOARD_MIN_TOTAL_WIDTH;
        let body = if show_board {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(0), Constraint::Length(LEADERBOARD_WIDTH)])
                .split(layout[1])
        } else {
            Layout::default()
                .constraints([Constraint::Min(0)])
                .split(layout[1])
        };

        self.indicator.set(None);
        match self.controller.current_vibe() {
            Some(vibe) => self.draw_card(frame, body[0], vibe),
            None if self.controller.error().is_some() => self.draw_error(frame, body[0]),
            None => self.draw_loading(frame, body[0]),
        }
        if show_board {
            self.draw_leaderboard(frame, body[1]);
        }
        if controls_height > 0 && !self.controller.is_empty() {
            self.draw_controls(frame, layout[2]);
        }
        self.draw_status(frame, layout[3]);
    }

    fn draw_header(&self, frame: &mut Frame<'_>, area: Rect) {
        let title = Paragraph::new(Line::from(vec![
            Span::styled("✨ ", Style::default().fg(COLOR_ACCENT)),
            Span::styled(
                "Good Vibes",
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(" ✨", Style::default().fg(COLOR_ACCENT)),
        ]))
        .alignment(Alignment::Center)
        .style(Style::default().bg(COLOR_PANEL_FOCUSED_BG));
        frame.render_widget(title, area);
    }

    fn draw_loading(&self, frame: &mut Frame<'_>, area: Rect) {
        let text = format!("{} Loading Good Vibes...", self.spinner.frame());
        let paragraph = Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(Style::default().fg(COLOR_TEXT_SECONDARY));
        frame.render_widget(paragraph, vertical_center(area, 1));
    }

    fn draw_error(&self, frame: &mut Frame<'_>, area: Rect) {
        let error = self.controller.error().unwrap_or_default();
        let mut lines = vec![Line::from(Span::styled(
            format!("Error: {error}"),
            Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
        ))];
        if error != NO_VIBES_MESSAGE {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                format!(
                    "Make sure the backend server is accessible at {}",
                    self.api_base_url
                ),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            )));
        }
        let height = lines.len() as u16 + 2;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(COLOR_ERROR));
        let paragraph = Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, vertical_center(area, height));
    }

    fn draw_card(&self, frame: &mut Frame<'_>, area: Rect, vibe: &Vibe) {
        let index = self.controller.current_index().unwrap_or_default();
        let accent = format::vibe_color(index);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(COLOR_BORDER_IDLE))
            .style(Style::default().bg(COLOR_PANEL_BG))
            .title(Span::styled(
                format!(" {} ", format::position_label(index, self.controller.len())),
                Style::default().fg(accent),
            ));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        // Accent stripe on the left edge of the card.
        let stripe = Rect {
            width: inner.width.min(1),
            ..inner
        };
        let content = Rect {
            x: inner.x.saturating_add(2).min(inner.right()),
            width: inner.width.saturating_sub(3),
            ..inner
        };
        frame.render_widget(
            Paragraph::new(vec![Line::from("▌"); stripe.height as usize])
                .style(Style::default().fg(accent)),
            stripe,
        );

        let mut lines: Vec<Line<'static>> = Vec::new();
        if let Some(error) = self.controller.error() {
            lines.push(Line::from(Span::styled(
                format!("⚠ {error}"),
                Style::default().fg(COLOR_ERROR),
            )));
            lines.push(Line::default());
        }
        if let Some(prompt) = format::prompt_text(vibe) {
            lines.push(Line::from(Span::styled(
                format!("✨ {prompt}"),
                Style::default().fg(accent).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::default());
        }
        lines.push(Line::from(Span::styled(
            format::display_message(vibe),
            Style::default().fg(COLOR_TEXT_PRIMARY),
        )));
        lines.push(Line::default());

        if !vibe.reactions.is_empty() {
            let mut spans = Vec::new();
            for reaction in &vibe.reactions {
                spans.push(Span::styled(
                    format!("{} {}", reaction.emoji, reaction.count),
                    Style::default().fg(COLOR_TEXT_PRIMARY),
                ));
                spans.push(Span::raw("   "));
            }
            lines.push(Line::from(spans));
            lines.push(Line::default());
        }

        lines.push(person_line("From", &[vibe.sender_user.display_name.as_str()]));
        if !vibe.recipients.is_empty() {
            let names: Vec<&str> = vibe
                .recipients
                .iter()
                .map(|user| user.display_name.as_str())
                .collect();
            lines.push(person_line("To", &names));
        }
        let mut meta = format::format_date(&vibe.creation_date.with_timezone(&Local));
        if let Some(collection) = format::collection_label(vibe) {
            meta.push_str(" · ");
            meta.push_str(collection);
        }
        lines.push(Line::from(Span::styled(
            meta,
            Style::default()
                .fg(COLOR_TEXT_SECONDARY)
                .add_modifier(Modifier::ITALIC),
        )));

        if vibe.reply_count > 0 {
            lines.push(Line::default());
            lines.extend(self.reply_lines(vibe, content.width as usize));
        }

        let paragraph = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, content);
    }

    fn reply_lines(&self, vibe: &Vibe, width: usize) -> Vec<Line<'static>> {
        let total = vibe
            .replies
            .as_ref()
            .map_or(vibe.reply_count as usize, Vec::len);
        let mut header = vec![Span::styled(
            format!("💬 {}", format::reply_count_label(total)),
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        )];
        let (page, pages) = self.controller.reply_page();
        if pages > 1 {
            header.push(Span::styled(
                format!("  {page}/{pages}"),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ));
        }
        let mut lines = vec![Line::from(header)];

        if self.controller.is_loading_replies() {
            lines.push(Line::from(Span::styled(
                format!("{} Loading replies...", self.spinner.frame()),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )));
            return lines;
        }
        for reply in self.controller.visible_replies() {
            lines.extend(reply_entry(reply, width));
        }
        lines
    }

    fn draw_controls(&self, frame: &mut Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(area);

        if self.controller.auto_play() && self.controller.len() > 1 {
            let ratio = (self.controller.progress() / 100.0).clamp(0.0, 1.0);
            let gauge = Gauge::default()
                .gauge_style(Style::default().fg(COLOR_ACCENT).bg(COLOR_PANEL_BG))
                .ratio(ratio)
                .label("")
                .use_unicode(true);
            frame.render_widget(gauge, inset(rows[0], 4));
        }

        let len = self.controller.len();
        let index = self.controller.current_index().unwrap_or_default();
        if len > DOTS_LIMIT {
            let bar = inset(rows[1], 4);
            let ratio = (index + 1) as f64 / len as f64;
            let gauge = Gauge::default()
                .gauge_style(Style::default().fg(COLOR_SUCCESS).bg(COLOR_PANEL_FOCUSED_BG))
                .ratio(ratio.clamp(0.0, 1.0))
                .label("")
                .use_unicode(true);
            frame.render_widget(gauge, bar);
            self.indicator.set(Some(Indicator::Bar(bar)));
        } else if len > 1 {
            let dots = dot_line(index, len);
            let width = (UnicodeWidthStr::width(dots.as_str()) as u16).min(rows[1].width);
            let dots_area = Rect {
                x: rows[1].x + (rows[1].width - width) / 2,
                width,
                ..rows[1]
            };
            frame.render_widget(
                Paragraph::new(dots).style(Style::default().fg(COLOR_ACCENT)),
                dots_area,
            );
            self.indicator.set(Some(Indicator::Dots(dots_area)));
        }

        let count = Paragraph::new(format::position_label(index, len))
            .alignment(Alignment::Center)
            .style(Style::default().fg(COLOR_TEXT_SECONDARY));
        frame.render_widget(count, rows[2]);

        let play = if self.controller.auto_play() {
            "space pause"
        } else {
            "space play"
        };
        let hints = format!("←/→ browse · {play} · r refresh · b leaderboard · q quit");
        frame.render_widget(
            Paragraph::new(hints)
                .alignment(Alignment::Center)
                .style(
                    Style::default()
                        .fg(COLOR_TEXT_SECONDARY)
                        .add_modifier(Modifier::ITALIC),
                ),
            rows[3],
        );
    }

    fn draw_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let mut text = if self.controller.is_loading() {
            format!("{} {}", self.spinner.frame(), self.status_message)
        } else {
            let total = self.controller.total_count().unwrap_or(self.controller.len());
            if total > self.controller.len() {
                format!("{} of {} Good Vibes loaded", self.controller.len(), total)
            } else {
                format!("{} Good Vibes", self.controller.len())
            }
        };
        if !self.controller.auto_play() {
            text.push_str(" · paused");
        }
        let status = Paragraph::new(text.trim().to_string()).style(
            Style::default()
                .fg(COLOR_TEXT_SECONDARY)
                .bg(COLOR_PANEL_BG),
        );
        frame.render_widget(status, area);
    }

    fn draw_leaderboard(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(COLOR_ACCENT))
            .style(Style::default().bg(COLOR_PANEL_BG))
            .title(Span::styled(
                " ★ All-Stars ",
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            ));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut lines: Vec<Line<'static>> = Vec::new();
        let month = self
            .leaderboard
            .month()
            .map(|month| month.label())
            .unwrap_or_default();
        let mut heading = vec![Span::styled(
            month,
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )];
        if self.leaderboard.is_loading() {
            heading.push(Span::styled(
                format!(" {}", self.spinner.frame()),
                Style::default().fg(COLOR_ACCENT),
            ));
        }
        lines.push(Line::from(heading));
        lines.push(Line::default());

        let standings = self.leaderboard.standings();
        for (slot, section) in Section::ALL.into_iter().enumerate() {
            let collapsed = self.leaderboard.is_collapsed(section);
            let marker = if collapsed { "▸" } else { "▾" };
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{marker} {}", section.title()),
                    Style::default()
                        .fg(COLOR_ACCENT)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  [{}]", slot + 1),
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                ),
            ]));
            if !collapsed {
                let entries = standings.map(|standings| section_entries(standings, section));
                match entries {
                    Some(entries) if !entries.is_empty() => lines.extend(entries),
                    _ => lines.push(Line::from(Span::styled(
                        format!("  {EMPTY_SECTION}"),
                        Style::default()
                            .fg(COLOR_TEXT_SECONDARY)
                            .add_modifier(Modifier::ITALIC),
                    ))),
                }
            }
            lines.push(Line::default());
        }

        frame.render_widget(
            Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false }),
            inner,
        );
    }
}

fn person_line(label: &str, names: &[&str]) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{label}: "),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        ),
        Span::styled(
            names.join(", "),
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .add_modifier(Modifier::BOLD),
        ),
    ])
}

fn reply_entry(reply: &Reply, width: usize) -> Vec<Line<'static>> {
    let name = &reply.author_user.display_name;
    let date = format::format_date(&reply.reply_date.with_timezone(&Local));
    let mut header = vec![
        Span::styled(
            format!("  {} ", format::initials(name)),
            Style::default().fg(COLOR_BG).bg(COLOR_TEXT_SECONDARY),
        ),
        Span::styled(
            format!(" {name}"),
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .add_modifier(Modifier::BOLD),
        ),
    ];
    let used = UnicodeWidthStr::width(name.as_str()) + 8;
    if used + date.len() + 3 <= width {
        header.push(Span::styled(
            format!(" · {date}"),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        ));
    }
    vec![
        Line::from(header),
        Line::from(Span::styled(
            format!("    {}", reply.message.trim()),
            Style::default().fg(COLOR_TEXT_PRIMARY),
        )),
    ]
}

fn ranked_user_line(rank: usize, entry: &RankedUser) -> Line<'static> {
    ranked_line(rank, &entry.user.display_name, entry.count)
}

fn ranked_collection_line(rank: usize, entry: &RankedCollection) -> Line<'static> {
    ranked_line(rank, &entry.name, entry.count)
}

fn ranked_line(rank: usize, name: &str, count: u32) -> Line<'static> {
    let medal = match rank {
        0 => "🥇",
        1 => "🥈",
        2 => "🥉",
        _ => "  ",
    };
    Line::from(vec![
        Span::raw(format!("  {medal} ")),
        Span::styled(name.to_string(), Style::default().fg(COLOR_TEXT_PRIMARY)),
        Span::styled(
            format!("  {count}"),
            Style::default().fg(COLOR_SUCCESS),
        ),
    ])
}

fn section_entries(standings: &MonthlyStandings, section: Section) -> Vec<Line<'static>> {
    match section {
        Section::Recipients => standings
            .top_recipients
            .iter()
            .enumerate()
            .map(|(rank, entry)| ranked_user_line(rank, entry))
            .collect(),
        Section::Senders => standings
            .top_senders
            .iter()
            .enumerate()
            .map(|(rank, entry)| ranked_user_line(rank, entry))
            .collect(),
        Section::Collections => standings
            .top_collections
            .iter()
            .enumerate()
            .map(|(rank, entry)| ranked_collection_line(rank, entry))
            .collect(),
    }
}

fn dot_line(index: usize, len: usize) -> String {
    (0..len)
        .map(|idx| if idx == index { "● " } else { "○ " })
        .collect::<String>()
        .trim_end()
        .to_string()
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x && column < area.right() && row >= area.y && row < area.bottom()
}

fn inset(area: Rect, margin: u16) -> Rect {
    let margin = margin.min(area.width / 4);
    Rect {
        x: area.x + margin,
        width: area.width - margin * 2,
        ..area
    }
}

fn vertical_center(area: Rect, height: u16) -> Rect {
    let height = height.min(area.height);
    Rect {
        y: area.y + (area.height - height) / 2,
        height,
        ..area
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    use crate::collection::tests::{replies, vibe};
    use crate::data::{MockLeaderboardService, MockVibeService};
    use crate::goodvibes::{PageMetadata, VibesPage};
    use crate::loader::{LoadKind, VibesRequest};

    fn model(show_leaderboard: bool) -> Model {
        Model::new(Options {
            settings: Settings::default(),
            vibe_service: Arc::new(MockVibeService::default()),
            leaderboard_service: Some(Arc::new(MockLeaderboardService)),
            show_leaderboard,
            leaderboard_limit: 3,
            api_base_url: "http://localhost:5000/api".into(),
            status_message: "Loading Good Vibes…".into(),
        })
    }

    fn initial(model: &mut Model) -> VibesRequest {
        model
            .controller
            .load_initial()
            .into_iter()
            .find_map(|request| match request {
                Request::Vibes(request) => Some(request),
                _ => None,
            })
            .expect("initial request")
    }

    fn deliver(model: &mut Model, request: &VibesRequest, result: Result<VibesPage>) {
        let now = Instant::now();
        let requests = model.controller.apply(
            Response::Vibes {
                generation: request.generation,
                kind: LoadKind::Initial,
                result,
            },
            now,
        );
        assert!(requests.iter().all(|request| matches!(request, Request::Replies { .. })));
    }

    fn render(model: &Model, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| model.draw(frame)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content
            .chunks(width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn page(vibes: Vec<Vibe>) -> VibesPage {
        let total = vibes.len();
        VibesPage {
            data: vibes,
            metadata: Some(PageMetadata {
                total_count: Some(total),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn renders_loading_state() {
        let mut model = model(false);
        initial(&mut model);
        let screen = render(&model, 80, 24);
        assert!(screen.contains("Loading Good Vibes..."));
    }

    #[test]
    fn renders_empty_result_without_panicking() {
        let mut model = model(true);
        let request = initial(&mut model);
        deliver(&mut model, &request, Ok(page(Vec::new())));
        model.controller.pointer_moved(Instant::now());
        let screen = render(&model, 100, 30);
        assert!(screen.contains(NO_VIBES_MESSAGE));
        assert!(!screen.contains("Make sure the backend"));
        render(&model, 10, 3);
    }

    #[test]
    fn renders_backend_hint_on_failure() {
        let mut model = model(false);
        let request = initial(&mut model);
        deliver(&mut model, &request, Err(anyhow::anyhow!("connection refused")));
        let screen = render(&model, 120, 24);
        assert!(screen.contains("connection refused"));
        assert!(screen.contains("Make sure the backend server is accessible at"));
    }

    #[test]
    fn renders_card_with_replies_and_controls() {
        let mut model = model(false);
        let request = initial(&mut model);
        let mut first = vibe("a", 1, 3);
        first.replies = Some(replies(3));
        deliver(&mut model, &request, Ok(page(vec![first, vibe("b", 2, 0)])));
        model.controller.pointer_moved(Instant::now());

        let screen = render(&model, 100, 40);
        assert!(screen.contains("message a"));
        assert!(screen.contains("3 Replies"));
        assert!(screen.contains("reply 0"));
        assert!(screen.contains("reply 1"));
        assert!(!screen.contains("reply 2"));
        assert!(screen.contains("1 of 2"));
        assert!(screen.contains("●"));
        assert!(matches!(model.indicator.get(), Some(Indicator::Dots(_))));
    }

    #[test]
    fn controls_hide_when_idle() {
        let mut model = model(false);
        let request = initial(&mut model);
        deliver(&mut model, &request, Ok(page(vec![vibe("a", 1, 0), vibe("b", 2, 0)])));
        let screen = render(&model, 100, 30);
        assert!(!screen.contains("q quit"));
        assert!(model.indicator.get().is_none());
    }

    #[test]
    fn large_collections_use_clickable_bar() {
        let mut model = model(false);
        let request = initial(&mut model);
        let vibes = (0..60).map(|n| vibe(&format!("v{n}"), n, 0)).collect();
        deliver(&mut model, &request, Ok(page(vibes)));
        let now = Instant::now();
        model.controller.pointer_moved(now);
        render(&model, 100, 30);

        let Some(Indicator::Bar(bar)) = model.indicator.get() else {
            panic!("expected progress bar");
        };
        model.handle_mouse(
            MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column: bar.x + bar.width / 2,
                row: bar.y,
                modifiers: crossterm::event::KeyModifiers::NONE,
            },
            now,
        );
        let index = model.controller.current_index().unwrap();
        assert!((28..=32).contains(&index), "jumped to {index}");
    }

    #[test]
    fn keys_navigate_and_quit() {
        let mut model = model(false);
        let request = initial(&mut model);
        deliver(
            &mut model,
            &request,
            Ok(page(vec![vibe("a", 1, 0), vibe("b", 2, 0), vibe("c", 3, 0)])),
        );
        let now = Instant::now();
        assert!(!model.handle_key(KeyCode::Left, now).unwrap());
        assert_eq!(model.controller.current_index(), Some(2));
        model.handle_key(KeyCode::Char('g'), now).unwrap();
        assert_eq!(model.controller.current_index(), Some(0));
        assert!(model.controller.controls_visible());
        model.handle_key(KeyCode::Char('2'), now).unwrap();
        assert!(model.leaderboard.is_collapsed(Section::Senders));
        assert!(model.handle_key(KeyCode::Char('q'), now).unwrap());
    }

    #[test]
    fn leaderboard_panel_shows_sections() {
        let mut model = model(true);
        let request = initial(&mut model);
        deliver(&mut model, &request, Ok(page(vec![vibe("a", 1, 0)])));
        let month = model.displayed_month().unwrap();
        model.leaderboard.follow(Some(month));
        model.handle_async_response(
            AsyncResponse::Leaderboard {
                month,
                result: Ok(MonthlyStandings {
                    year: month.year,
                    month: month.month,
                    top_collections: vec![RankedCollection {
                        name: "Kudos".into(),
                        count: 9,
                    }],
                    ..Default::default()
                }),
            },
            Instant::now(),
        );
        let screen = render(&model, 130, 40);
        assert!(screen.contains("All-Stars"));
        assert!(screen.contains(&month.label()));
        assert!(screen.contains("Most Appreciated"));
        assert!(screen.contains("Kudos"));
        assert!(screen.contains(EMPTY_SECTION));
    }

    #[test]
    fn dots_mark_current_position() {
        assert_eq!(dot_line(1, 3), "○ ● ○");
        assert_eq!(dot_line(0, 1), "●");
    }
}
