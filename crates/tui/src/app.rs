use std::{io, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::{spawn, sync::mpsc};
use tracing::{error, info, warn};

use steamlib_core::{
    compare::Comparison,
    config::AppConfig,
    error::FetchError,
    export,
    listview::{AchievementSlot, DetailsAction, ListViewModel, Row},
    models::{AchievementSummary, GameRecord, LibraryPage, LibrarySnapshot, Platform},
    prefs::{FavoritesSet, PrefsStore, ThemePrefs},
    query::{QueryCommand, QueryStore},
    stats::{self, LibraryStats},
    LibraryClient, LibraryTarget,
};

const TICK_RATE: Duration = Duration::from_millis(250);
const SEARCH_DEBOUNCE: Duration = Duration::from_millis(1000);
const SUBMIT_DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
struct Theme {
    bg: Color,
    fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
}

impl Theme {
    fn dark() -> Self {
        Self {
            bg: Color::Black,
            fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
        }
    }

    fn light() -> Self {
        Self {
            bg: Color::White,
            fg: Color::Black,
            accent: Color::Blue,
            muted: Color::Gray,
            selection_bg: Color::Gray,
            success: Color::Green,
            warning: Color::Magenta,
        }
    }

    fn for_prefs(prefs: ThemePrefs) -> Self {
        if prefs.dark_mode {
            Theme::dark()
        } else {
            Theme::light()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Welcome,
    Library,
    Stats,
    Compare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Search,
    PageJump,
    FriendInput,
}

enum AppEvent {
    Input(Event),
    Tick,
    SearchReady(u64),
    SubmitReady(u64),
    SnapshotLoaded(Result<LibrarySnapshot, FetchError>),
    PageLoaded(Result<LibraryPage, FetchError>),
    FriendLoaded(Result<LibrarySnapshot, FetchError>),
    AchievementsLoaded {
        app_id: u64,
        result: Result<AchievementSummary, String>,
    },
}

/// High-level application state for the terminal UI.
pub struct SteamlibApp {
    config: AppConfig,
    client: LibraryClient,
    prefs: PrefsStore,
    favorites: FavoritesSet,
    theme_prefs: ThemePrefs,
    theme: Theme,

    screen: Screen,
    mode: Mode,
    identifier_input: String,
    search_draft: String,
    page_draft: String,
    friend_draft: String,
    search_gen: u64,
    submit_gen: u64,

    target: Option<LibraryTarget>,
    steam_id: String,
    query: QueryStore,
    model: ListViewModel,
    total_games: u32,
    stats: Option<LibraryStats>,
    monthly: Vec<(String, u64)>,
    top: Vec<GameRecord>,
    recent: Vec<GameRecord>,
    snapshot_games: Vec<GameRecord>,
    snapshot_max: u32,
    comparison: Option<Comparison>,

    loading_snapshot: bool,
    loading_page: bool,
    loading_friend: bool,

    state: UiState,
    event_tx: Option<mpsc::Sender<AppEvent>>,
}

impl SteamlibApp {
    pub fn new(
        config: AppConfig,
        client: LibraryClient,
        prefs: PrefsStore,
        share_query: Option<String>,
    ) -> Self {
        let favorites = prefs.load_favorites();
        let theme_prefs = prefs.load_theme();
        let theme = Theme::for_prefs(theme_prefs);
        let mut view = prefs.load_view();
        if let Some(raw) = share_query {
            view.apply_share_query(&raw);
        }
        let identifier_input = view.steam_id.clone().unwrap_or_default();
        let query = QueryStore::new(view);
        Self {
            config,
            client,
            prefs,
            favorites,
            theme_prefs,
            theme,
            screen: Screen::Welcome,
            mode: Mode::Browse,
            identifier_input,
            search_draft: String::new(),
            page_draft: String::new(),
            friend_draft: String::new(),
            search_gen: 0,
            submit_gen: 0,
            target: None,
            steam_id: String::new(),
            query,
            model: ListViewModel::default(),
            total_games: 0,
            stats: None,
            monthly: Vec::new(),
            top: Vec::new(),
            recent: Vec::new(),
            snapshot_games: Vec::new(),
            snapshot_max: 0,
            comparison: None,
            loading_snapshot: false,
            loading_page: false,
            loading_friend: false,
            state: UiState::default(),
            event_tx: None,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        // A remembered or shared identifier loads without being re-typed.
        if !self.identifier_input.is_empty() {
            self.submit_identifier();
        }

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) {
                break;
            }
            if self.state.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Event::Key(key) = event {
                    if let Err(err) = self.handle_key(key) {
                        self.state.set_status(format!("Error: {err}"));
                    }
                }
                true
            }
            Some(AppEvent::Tick) => true,
            Some(AppEvent::SearchReady(generation)) => {
                if generation == self.search_gen {
                    self.apply_command(QueryCommand::SetSearch(self.search_draft.clone()));
                }
                true
            }
            Some(AppEvent::SubmitReady(generation)) => {
                if generation == self.submit_gen {
                    self.submit_identifier();
                }
                true
            }
            Some(AppEvent::SnapshotLoaded(result)) => {
                self.handle_snapshot(result);
                true
            }
            Some(AppEvent::PageLoaded(result)) => {
                self.handle_page(result);
                true
            }
            Some(AppEvent::FriendLoaded(result)) => {
                self.handle_friend(result);
                true
            }
            Some(AppEvent::AchievementsLoaded { app_id, result }) => {
                self.model.set_achievements(app_id, result);
                true
            }
            None => false,
        }
    }

    // --- key handling ---

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.state.should_quit = true;
            return Ok(());
        }
        match self.screen {
            Screen::Welcome => self.handle_welcome_key(key),
            Screen::Library => match self.mode {
                Mode::Browse => self.handle_browse_key(key),
                Mode::Search => self.handle_search_key(key),
                Mode::PageJump => self.handle_page_jump_key(key),
                Mode::FriendInput => self.handle_friend_key(key),
            },
            Screen::Stats => self.handle_stats_key(key),
            Screen::Compare => self.handle_compare_key(key),
        }
    }

    fn handle_welcome_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char(c) => self.identifier_input.push(c),
            KeyCode::Backspace => {
                self.identifier_input.pop();
            }
            KeyCode::Enter => self.schedule_submit(),
            KeyCode::Esc => self.state.should_quit = true,
            _ => {}
        }
        Ok(())
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('q') => self.state.should_quit = true,
            KeyCode::Esc => {
                if self.model.open_details().is_some() {
                    self.model.close_details();
                } else {
                    self.screen = Screen::Welcome;
                }
            }
            KeyCode::Down | KeyCode::Char('j') => self.state.move_cursor(1, self.model.len()),
            KeyCode::Up | KeyCode::Char('k') => self.state.move_cursor(-1, self.model.len()),
            KeyCode::PageDown => self.state.page_down(self.model.len()),
            KeyCode::PageUp => self.state.page_up(self.model.len()),
            KeyCode::Char('g') => self.state.move_to(0, self.model.len()),
            KeyCode::Char('G') => self.state.move_to_end(self.model.len()),
            KeyCode::Right | KeyCode::Char('l') => {
                self.apply_command(QueryCommand::NextPage);
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.apply_command(QueryCommand::PrevPage);
            }
            KeyCode::Char(':') => {
                self.page_draft.clear();
                self.mode = Mode::PageJump;
            }
            KeyCode::Char('/') => {
                self.search_draft = self.query.state().search.clone();
                self.mode = Mode::Search;
            }
            KeyCode::Char('s') => {
                let next = self.query.state().sort_by.next();
                self.apply_command(QueryCommand::SetSort(next));
            }
            KeyCode::Char('d') => {
                let next = self.query.state().date_range.next();
                self.apply_command(QueryCommand::SetDateRange(next));
            }
            KeyCode::Char('o') => {
                self.apply_command(QueryCommand::TogglePlayedOnly);
            }
            KeyCode::Char('1') => {
                self.apply_command(QueryCommand::TogglePlatform(Platform::Windows));
            }
            KeyCode::Char('2') => {
                self.apply_command(QueryCommand::TogglePlatform(Platform::Mac));
            }
            KeyCode::Char('3') => {
                self.apply_command(QueryCommand::TogglePlatform(Platform::Linux));
            }
            KeyCode::Char('4') => {
                self.apply_command(QueryCommand::TogglePlatform(Platform::Deck));
            }
            KeyCode::Char('f') => self.toggle_favorite(),
            KeyCode::Enter => self.toggle_details(),
            KeyCode::Char('e') => self.export_csv(),
            KeyCode::Char('u') => self.show_share_link(),
            KeyCode::Char('c') => {
                self.friend_draft.clear();
                self.mode = Mode::FriendInput;
            }
            KeyCode::Char('t') => self.screen = Screen::Stats,
            KeyCode::Char('D') => self.toggle_dark_mode(),
            KeyCode::Char('r') => self.spawn_page_fetch(),
            _ => {}
        }
        Ok(())
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char(c) => {
                self.search_draft.push(c);
                self.schedule_search();
            }
            KeyCode::Backspace => {
                self.search_draft.pop();
                self.schedule_search();
            }
            KeyCode::Enter => {
                self.mode = Mode::Browse;
                self.search_gen += 1;
                self.apply_command(QueryCommand::SetSearch(self.search_draft.clone()));
            }
            KeyCode::Esc => {
                self.mode = Mode::Browse;
                self.search_gen += 1;
                self.search_draft = self.query.state().search.clone();
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_page_jump_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() => self.page_draft.push(c),
            KeyCode::Backspace => {
                self.page_draft.pop();
            }
            KeyCode::Enter => {
                self.mode = Mode::Browse;
                if let Ok(page) = self.page_draft.parse::<u32>() {
                    self.apply_command(QueryCommand::SetPage(page));
                }
            }
            KeyCode::Esc => self.mode = Mode::Browse,
            _ => {}
        }
        Ok(())
    }

    fn handle_friend_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char(c) => self.friend_draft.push(c),
            KeyCode::Backspace => {
                self.friend_draft.pop();
            }
            KeyCode::Enter => {
                self.mode = Mode::Browse;
                self.submit_friend();
            }
            KeyCode::Esc => self.mode = Mode::Browse,
            _ => {}
        }
        Ok(())
    }

    fn handle_stats_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('q') => self.state.should_quit = true,
            KeyCode::Esc | KeyCode::Char('t') => self.screen = Screen::Library,
            KeyCode::Char('D') => self.toggle_dark_mode(),
            _ => {}
        }
        Ok(())
    }

    fn handle_compare_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('q') => self.state.should_quit = true,
            KeyCode::Esc | KeyCode::Char('c') => self.screen = Screen::Library,
            _ => {}
        }
        Ok(())
    }

    // --- actions ---

    // Rapid Enter presses collapse into one fetch; only the latest
    // generation is allowed to submit.
    fn schedule_submit(&mut self) {
        self.submit_gen += 1;
        let generation = self.submit_gen;
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        self.state.set_status("Loading library...".to_string());
        spawn(async move {
            tokio::time::sleep(SUBMIT_DEBOUNCE).await;
            let _ = tx.send(AppEvent::SubmitReady(generation)).await;
        });
    }

    fn submit_identifier(&mut self) {
        if self.loading_snapshot {
            return;
        }
        let target = match LibraryTarget::parse(&self.identifier_input) {
            Ok(target) => target,
            Err(err) => {
                self.state.set_status(err.to_string());
                return;
            }
        };
        self.query
            .set_identifier(Some(self.identifier_input.trim().to_string()));
        if let Err(err) = self.prefs.save_view(self.query.state()) {
            warn!(%err, "failed to persist view preferences");
        }
        self.target = Some(target.clone());
        self.loading_snapshot = true;
        self.state.set_status("Loading library...".to_string());
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let client = self.client.clone();
        let aggregate = self.config.aggregate_page_size;
        spawn(async move {
            let result = client.fetch_snapshot(&target, aggregate).await;
            let _ = tx.send(AppEvent::SnapshotLoaded(result)).await;
        });
    }

    fn handle_snapshot(&mut self, result: Result<LibrarySnapshot, FetchError>) {
        self.loading_snapshot = false;
        match result {
            Ok(snapshot) => {
                info!(
                    steam_id = %snapshot.steam_id,
                    games = snapshot.games.len(),
                    "library loaded"
                );
                self.steam_id = snapshot.steam_id.clone();
                self.stats = Some(stats::compute_stats(&snapshot.games));
                self.monthly = stats::monthly_series(&snapshot.games);
                self.top = stats::top_games(&snapshot.games);
                self.recent = stats::recently_played(&snapshot.games, Utc::now().timestamp());
                self.snapshot_max = snapshot
                    .games
                    .iter()
                    .map(|game| game.playtime_forever)
                    .max()
                    .unwrap_or(0);
                self.snapshot_games = snapshot.games;
                self.screen = Screen::Library;
                self.state.set_status("Library loaded".to_string());
                self.spawn_page_fetch();
            }
            Err(err) => {
                error!(%err, "library fetch failed");
                self.state.set_status(err.to_string());
            }
        }
    }

    fn spawn_page_fetch(&mut self) {
        let Some(target) = self.target.clone() else {
            return;
        };
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        self.loading_page = true;
        let client = self.client.clone();
        let query = self.query.state().clone();
        let per_page = self.config.page_size;
        spawn(async move {
            let result = client.fetch_page(&target, &query, per_page).await;
            let _ = tx.send(AppEvent::PageLoaded(result)).await;
        });
    }

    fn handle_page(&mut self, result: Result<LibraryPage, FetchError>) {
        self.loading_page = false;
        match result {
            Ok(page) => {
                self.query.set_total_pages(page.total_pages);
                self.total_games = page.total_games;
                self.model = ListViewModel::new(page.games, self.snapshot_max);
                self.state.cursor = 0;
                self.state.offset = 0;
                self.state.set_status(format!(
                    "Page {}/{} • {} games",
                    self.query.state().page,
                    self.query.total_pages().max(1),
                    self.total_games
                ));
            }
            Err(err) => {
                warn!(%err, "page fetch failed");
                self.state.set_status(err.to_string());
            }
        }
    }

    fn submit_friend(&mut self) {
        if self.loading_friend {
            return;
        }
        let target = match LibraryTarget::parse(&self.friend_draft) {
            Ok(target) => target,
            Err(err) => {
                self.state.set_status(err.to_string());
                return;
            }
        };
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        self.loading_friend = true;
        self.state.set_status("Loading friend's library...".to_string());
        let client = self.client.clone();
        let aggregate = self.config.aggregate_page_size;
        spawn(async move {
            let result = client.fetch_snapshot(&target, aggregate).await;
            let _ = tx.send(AppEvent::FriendLoaded(result)).await;
        });
    }

    fn handle_friend(&mut self, result: Result<LibrarySnapshot, FetchError>) {
        self.loading_friend = false;
        match result {
            Ok(friend) => {
                self.comparison = Some(Comparison::between(&self.snapshot_games, &friend.games));
                self.screen = Screen::Compare;
                self.state.set_status("Comparison ready".to_string());
            }
            Err(err) => {
                // A failed friend fetch never disturbs the loaded library.
                warn!(%err, "friend fetch failed");
                self.state.set_status(err.to_string());
            }
        }
    }

    fn apply_command(&mut self, command: QueryCommand) {
        if !self.query.apply(command) {
            return;
        }
        if let Err(err) = self.prefs.save_view(self.query.state()) {
            warn!(%err, "failed to persist view preferences");
        }
        self.spawn_page_fetch();
    }

    fn schedule_search(&mut self) {
        self.search_gen += 1;
        let generation = self.search_gen;
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        spawn(async move {
            tokio::time::sleep(SEARCH_DEBOUNCE).await;
            let _ = tx.send(AppEvent::SearchReady(generation)).await;
        });
    }

    fn toggle_favorite(&mut self) {
        let Some(record) = self.model.record(self.state.cursor) else {
            return;
        };
        let app_id = record.app_id;
        let name = record.name.clone();
        let now_favorite = self.favorites.toggle(app_id);
        if let Err(err) = self.prefs.save_favorites(&self.favorites) {
            warn!(%err, "failed to persist favourites");
        }
        self.model.refresh_favorites(&self.favorites);
        self.state.set_status(if now_favorite {
            format!("Added {name} to favourites")
        } else {
            format!("Removed {name} from favourites")
        });
    }

    fn toggle_details(&mut self) {
        let cursor = self.state.cursor;
        match self.model.toggle_details(cursor) {
            Some(DetailsAction::FetchAchievements(app_id)) => {
                let Some(tx) = self.event_tx.clone() else {
                    return;
                };
                let client = self.client.clone();
                let steam_id = self.steam_id.clone();
                spawn(async move {
                    let result = client
                        .fetch_achievements(&steam_id, app_id)
                        .await
                        .map_err(|err| err.to_string());
                    let _ = tx
                        .send(AppEvent::AchievementsLoaded { app_id, result })
                        .await;
                });
            }
            Some(DetailsAction::Opened) | Some(DetailsAction::Closed) | None => {}
        }
    }

    fn export_csv(&mut self) {
        let games = self.model.records();
        if games.is_empty() {
            self.state.set_status("Nothing to export".to_string());
            return;
        }
        let file_name = if self.steam_id.is_empty() {
            "steam_library.csv".to_string()
        } else {
            format!("steam_library_{}.csv", self.steam_id)
        };
        let path = match std::env::current_dir() {
            Ok(dir) => dir.join(file_name),
            Err(err) => {
                self.state.set_status(format!("Export failed: {err}"));
                return;
            }
        };
        match export::write_csv(games, &path) {
            Ok(()) => {
                info!(path = %path.display(), rows = games.len(), "exported CSV");
                self.state
                    .set_status(format!("Exported {} games to {}", games.len(), path.display()));
            }
            Err(err) => self.state.set_status(format!("Export failed: {err}")),
        }
    }

    fn show_share_link(&mut self) {
        let query = self.query.state().to_share_query();
        if query.is_empty() {
            self.state
                .set_status("View matches the defaults; nothing to share".to_string());
        } else {
            self.state.set_status(format!("Share: ?{query}"));
        }
    }

    fn toggle_dark_mode(&mut self) {
        self.theme_prefs.dark_mode = !self.theme_prefs.dark_mode;
        self.theme = Theme::for_prefs(self.theme_prefs);
        if let Err(err) = self.prefs.save_theme(&self.theme_prefs) {
            warn!(%err, "failed to persist theme");
        }
    }

    // --- drawing ---

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        frame.render_widget(
            Block::default().style(Style::default().bg(self.theme.bg).fg(self.theme.fg)),
            area,
        );
        match self.screen {
            Screen::Welcome => self.draw_welcome(frame, area),
            Screen::Library => self.draw_library(frame, area),
            Screen::Stats => self.draw_stats(frame, area),
            Screen::Compare => self.draw_compare(frame, area),
        }
    }

    fn draw_welcome(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(area);

        let title = Paragraph::new("steamlib — Steam library viewer")
            .style(Style::default().fg(self.theme.accent).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(title, chunks[0]);

        let input = Paragraph::new(self.identifier_input.as_str())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Steam username or SteamID64"),
            );
        frame.render_widget(input, chunks[1]);

        let help = Paragraph::new(vec![
            Line::raw(""),
            Line::raw("Enter a vanity name, a 17-digit SteamID64, or a"),
            Line::raw("steamcommunity.com/id/ URL, then press Enter."),
            Line::raw(""),
            Line::from(Span::styled(
                if self.loading_snapshot { "Loading..." } else { "" },
                Style::default().fg(self.theme.warning),
            )),
        ])
        .wrap(Wrap { trim: true });
        frame.render_widget(help, chunks[2]);

        self.draw_status(frame, chunks[3]);
    }

    fn draw_library(&mut self, frame: &mut Frame, area: Rect) {
        let details_height = if self.model.open_details().is_some() { 10 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(3),
                Constraint::Length(details_height),
                Constraint::Length(1),
            ])
            .split(area);

        self.draw_header(frame, chunks[0]);
        self.draw_game_list(frame, chunks[1]);
        if details_height > 0 {
            self.draw_details(frame, chunks[2]);
        }
        self.draw_status(frame, chunks[3]);
    }

    fn draw_header(&mut self, frame: &mut Frame, area: Rect) {
        let query = self.query.state();
        let mut filters = Vec::new();
        if query.show_played_only {
            filters.push("played".to_string());
        }
        for platform in Platform::ALL {
            if query.platform(platform) {
                filters.push(platform.label().to_string());
            }
        }
        if !query.search.is_empty() {
            filters.push(format!("search:\"{}\"", query.search));
        }
        let filters = if filters.is_empty() {
            "none".to_string()
        } else {
            filters.join(", ")
        };

        let line = Line::from(vec![
            Span::styled(
                format!(" {} ", self.steam_id),
                Style::default().fg(self.theme.accent).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                "page {}/{} • {} games • sort: {} • range: {} • filters: {}",
                query.page,
                self.query.total_pages().max(1),
                self.total_games,
                query.sort_by.label(),
                query.date_range.label(),
                filters,
            )),
        ]);
        let header = Paragraph::new(line).block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(header, area);
    }

    fn draw_game_list(&mut self, frame: &mut Frame, area: Rect) {
        let height = area.height.saturating_sub(2) as usize;
        self.state.list_height = height;
        self.state.clamp_cursor(self.model.len());
        self.state.ensure_cursor_visible(self.model.len());
        self.model
            .promote_viewport(self.state.offset, height, &self.favorites);

        if self.model.is_empty() {
            let message = if self.loading_page {
                "Loading games..."
            } else {
                "No games match your criteria."
            };
            let empty = Paragraph::new(message)
                .style(Style::default().fg(self.theme.muted))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("Games"));
            frame.render_widget(empty, area);
            return;
        }

        let items: Vec<ListItem> = self
            .model
            .rows(self.state.offset, height)
            .into_iter()
            .enumerate()
            .map(|(idx, row)| {
                let global_index = self.state.offset + idx;
                let is_selected = self.state.cursor == global_index;
                let marker = if is_selected {
                    Span::styled(
                        "▶ ",
                        Style::default().fg(self.theme.accent).add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::raw("  ")
                };
                let line = match row {
                    Row::Full(content) => {
                        let star = if content.favorite {
                            Span::styled("★ ", Style::default().fg(self.theme.warning))
                        } else {
                            Span::raw("  ")
                        };
                        let bar = playtime_bar(content.bar_percent);
                        Line::from(vec![
                            marker,
                            star,
                            Span::styled(
                                format!("{:<40}", truncate(&content.name, 40)),
                                Style::default().add_modifier(Modifier::BOLD),
                            ),
                            Span::styled(bar, Style::default().fg(self.theme.success)),
                            Span::raw(format!(
                                " {:>6}h  {}  {:>4}h/2wk",
                                content.hours, content.last_played, content.two_week_hours
                            )),
                        ])
                    }
                    Row::Placeholder { name } => Line::from(vec![
                        marker,
                        Span::raw("  "),
                        Span::styled(
                            format!("{:<40}", truncate(name, 40)),
                            Style::default().fg(self.theme.muted),
                        ),
                        Span::styled("…", Style::default().fg(self.theme.muted)),
                    ]),
                };
                let item = ListItem::new(line);
                if is_selected {
                    item.style(Style::default().bg(self.theme.selection_bg))
                } else {
                    item
                }
            })
            .collect();

        let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Games"));
        frame.render_widget(list, area);
    }

    fn draw_details(&mut self, frame: &mut Frame, area: Rect) {
        let Some(app_id) = self.model.open_details() else {
            return;
        };
        let Some(record) = self
            .model
            .records()
            .iter()
            .find(|record| record.app_id == app_id)
        else {
            return;
        };

        let mut lines = vec![Line::from(vec![
            Span::styled(
                record.name.clone(),
                Style::default().fg(self.theme.accent).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  (app {})", record.app_id)),
        ])];
        lines.push(Line::raw(format!(
            "Playtime: {}h total • {}h last 2 weeks • last played {}",
            record.hours_forever(),
            record.two_week_hours(),
            record.last_played_label(),
        )));
        let platforms: Vec<String> = Platform::ALL
            .iter()
            .filter(|p| record.platform_minutes(**p) > 0)
            .map(|p| format!("{}: {}h", p.label(), u64::from(record.platform_minutes(*p)) / 60))
            .collect();
        lines.push(Line::raw(format!(
            "Platforms: {}",
            if platforms.is_empty() {
                "none recorded".to_string()
            } else {
                platforms.join(" • ")
            }
        )));
        if let Some(details) = &record.details {
            if !details.genres.is_empty() {
                lines.push(Line::raw(format!("Genres: {}", details.genres.join(", "))));
            }
            if !details.categories.is_empty() {
                lines.push(Line::raw(format!(
                    "Categories: {}",
                    details.categories.join(", ")
                )));
            }
            if let Some(release) = &details.release_date {
                lines.push(Line::raw(format!("Released: {release}")));
            }
        }
        if let Some(descriptors) = &record.content_descriptors {
            if !descriptors.is_empty() {
                lines.push(Line::raw(format!(
                    "Content descriptors: {}",
                    descriptors.join(", ")
                )));
            }
        }
        let achievements = match self.model.achievements(app_id) {
            AchievementSlot::NotRequested => "Achievements: —".to_string(),
            AchievementSlot::Pending => "Achievements: loading...".to_string(),
            AchievementSlot::Loaded(summary) => {
                format!("Achievements: {}/{}", summary.achieved, summary.total)
            }
            AchievementSlot::Failed(message) => format!("Achievements: {message}"),
        };
        lines.push(Line::from(Span::styled(
            achievements,
            Style::default().fg(self.theme.muted),
        )));

        let details = Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Details"));
        frame.render_widget(details, area);
    }

    fn draw_stats(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(7),
                Constraint::Min(8),
                Constraint::Length(1),
            ])
            .split(area);

        let lines = match &self.stats {
            Some(stats) => vec![
                Line::raw(format!("Total games:        {}", stats.total_games)),
                Line::raw(format!("Played games:       {}", stats.played_games)),
                Line::raw(format!("Total hours:        {}", stats.total_hours)),
                Line::raw(format!("Avg hours/played:   {}", stats.avg_hours_per_played)),
                Line::raw(format!("Most active:        {}", stats.most_active.label())),
            ],
            None => vec![Line::raw("No library loaded.")],
        };
        let summary = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Statistics"));
        frame.render_widget(summary, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);

        let chart_data: Vec<(&str, u64)> = self
            .monthly
            .iter()
            .map(|(label, hours)| (label.as_str(), *hours))
            .collect();
        let chart = BarChart::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Hours by last-played month"),
            )
            .data(&chart_data)
            .bar_width(7)
            .bar_gap(1)
            .bar_style(Style::default().fg(self.theme.accent))
            .value_style(Style::default().fg(self.theme.fg));
        frame.render_widget(chart, body[0]);

        let side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(body[1]);
        self.draw_highlight_list(frame, side[0], "Top by playtime", &self.top, true);
        self.draw_highlight_list(frame, side[1], "Recently played", &self.recent, false);

        self.draw_status(frame, chunks[2]);
    }

    fn draw_highlight_list(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: &str,
        games: &[GameRecord],
        show_hours: bool,
    ) {
        let items: Vec<ListItem> = games
            .iter()
            .map(|game| {
                let detail = if show_hours {
                    format!("{}h", game.hours_forever())
                } else {
                    game.last_played_label()
                };
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{:<32}", truncate(&game.name, 32))),
                    Span::styled(detail, Style::default().fg(self.theme.muted)),
                ]))
            })
            .collect();
        let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title.to_string()));
        frame.render_widget(list, area);
    }

    fn draw_compare(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);

        let Some(comparison) = self.comparison.clone() else {
            let empty = Paragraph::new("No comparison loaded. Press c in the library view.")
                .alignment(Alignment::Center);
            frame.render_widget(empty, chunks[0]);
            self.draw_status(frame, chunks[1]);
            return;
        };

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(34),
                Constraint::Percentage(33),
                Constraint::Percentage(33),
            ])
            .split(chunks[0]);

        let render_column = |frame: &mut Frame, area: Rect, title: String, games: &[GameRecord]| {
            let items: Vec<ListItem> = games
                .iter()
                .map(|game| ListItem::new(truncate(&game.name, (area.width as usize).saturating_sub(4))))
                .collect();
            let list =
                List::new(items).block(Block::default().borders(Borders::ALL).title(title));
            frame.render_widget(list, area);
        };

        render_column(
            frame,
            columns[0],
            format!("Both ({})", comparison.common.len()),
            &comparison.common,
        );
        render_column(
            frame,
            columns[1],
            format!("Only yours ({})", comparison.only_a.len()),
            &comparison.only_a,
        );
        render_column(
            frame,
            columns[2],
            format!("Only theirs ({})", comparison.only_b.len()),
            &comparison.only_b,
        );

        self.draw_status(frame, chunks[1]);
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        let text = match self.mode {
            Mode::Search => format!("Search: {}", self.search_draft),
            Mode::PageJump => format!("Go to page: {}", self.page_draft),
            Mode::FriendInput => format!("Compare with: {}", self.friend_draft),
            Mode::Browse => self.state.status.clone(),
        };
        let style = if matches!(self.mode, Mode::Browse) {
            Style::default().fg(self.theme.muted)
        } else {
            Style::default().fg(self.theme.warning)
        };
        let status = Paragraph::new(text).style(style);
        frame.render_widget(status, area);
    }
}

fn truncate(input: &str, max: usize) -> String {
    if input.chars().count() <= max {
        input.to_string()
    } else {
        let mut out: String = input.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

fn playtime_bar(percent: u8) -> String {
    const WIDTH: usize = 10;
    let filled = (usize::from(percent) * WIDTH) / 100;
    let mut bar = String::with_capacity(WIDTH);
    for i in 0..WIDTH {
        bar.push(if i < filled { '█' } else { '░' });
    }
    bar
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

struct UiState {
    cursor: usize,
    offset: usize,
    list_height: usize,
    status: String,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            cursor: 0,
            offset: 0,
            list_height: 1,
            status: "Ready".to_string(),
            should_quit: false,
        }
    }
}

impl UiState {
    fn move_cursor(&mut self, delta: isize, total: usize) {
        if total == 0 {
            return;
        }
        let len = total as isize;
        let mut idx = self.cursor as isize + delta;
        if idx < 0 {
            idx = 0;
        } else if idx >= len {
            idx = len - 1;
        }
        self.cursor = idx as usize;
        self.ensure_cursor_visible(total);
    }

    fn move_to(&mut self, index: usize, total: usize) {
        if total == 0 {
            return;
        }
        self.cursor = index.min(total - 1);
        self.ensure_cursor_visible(total);
    }

    fn move_to_end(&mut self, total: usize) {
        if total == 0 {
            return;
        }
        self.cursor = total - 1;
        self.ensure_cursor_visible(total);
    }

    fn page_down(&mut self, total: usize) {
        if total == 0 || self.list_height == 0 {
            return;
        }
        let delta = self.list_height.min(total);
        self.move_cursor(delta as isize, total);
    }

    fn page_up(&mut self, total: usize) {
        if total == 0 || self.list_height == 0 {
            return;
        }
        let delta = self.list_height.min(total);
        self.move_cursor(-(delta as isize), total);
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
    }

    fn clamp_cursor(&mut self, total: usize) {
        if total == 0 {
            self.cursor = 0;
            self.offset = 0;
        } else if self.cursor >= total {
            self.cursor = total - 1;
        }
    }

    fn ensure_cursor_visible(&mut self, total: usize) {
        if total == 0 || self.list_height == 0 {
            self.offset = 0;
            return;
        }
        let height = self.list_height;
        let max_offset = total.saturating_sub(height);

        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + height {
            self.offset = self.cursor + 1 - height;
        }

        if self.offset > max_offset {
            self.offset = max_offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use steamlib_core::{net::Throttler, query::QueryState};
    use tempfile::tempdir;

    fn test_app(prefs_root: &Path, share_query: Option<String>) -> SteamlibApp {
        let config = AppConfig {
            api_base_url: "http://127.0.0.1:9".to_string(),
            page_size: 50,
            aggregate_page_size: 2000,
            request_timeout_secs: 5,
        };
        let client = LibraryClient::new(&config, Throttler::new()).unwrap();
        let prefs = PrefsStore::new(prefs_root);
        SteamlibApp::new(config, client, prefs, share_query)
    }

    #[test]
    fn remembered_view_prefills_identifier_and_page() {
        let dir = tempdir().unwrap();
        let prefs = PrefsStore::new(dir.path());
        let saved = QueryState {
            steam_id: Some("gaben".to_string()),
            page: 4,
            ..QueryState::default()
        };
        prefs.save_view(&saved).unwrap();

        let app = test_app(dir.path(), None);
        assert_eq!(app.identifier_input, "gaben");
        assert_eq!(app.query.state().page, 4);
    }

    #[test]
    fn share_query_argument_overrides_saved_view() {
        let dir = tempdir().unwrap();
        let prefs = PrefsStore::new(dir.path());
        let saved = QueryState {
            page: 2,
            ..QueryState::default()
        };
        prefs.save_view(&saved).unwrap();

        let app = test_app(
            dir.path(),
            Some("?steamid=76561197960435530&sortBy=playtime&page=7".to_string()),
        );
        assert_eq!(app.identifier_input, "76561197960435530");
        assert_eq!(app.query.state().page, 7);
        assert_eq!(
            app.query.state().sort_by,
            steamlib_core::models::SortKey::Playtime
        );
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_latest_submit_generation_fires() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path(), None);
        app.identifier_input = "76561197960435530".to_string();
        let (tx, mut rx) = mpsc::channel::<AppEvent>(8);
        app.event_tx = Some(tx);

        app.schedule_submit();
        app.schedule_submit();

        let mut generations = Vec::new();
        for _ in 0..2 {
            match rx.recv().await.unwrap() {
                AppEvent::SubmitReady(generation) => generations.push(generation),
                _ => panic!("expected a submit event"),
            }
        }
        generations.sort_unstable();
        assert_eq!(generations, vec![1, 2]);

        app.process_app_event(Some(AppEvent::SubmitReady(1)));
        assert!(app.target.is_none());
        app.process_app_event(Some(AppEvent::SubmitReady(2)));
        assert!(app.target.is_some());
        assert!(app.loading_snapshot);
    }

    #[test]
    fn cursor_stays_within_bounds() {
        let mut state = UiState::default();
        state.list_height = 5;
        state.move_cursor(-3, 10);
        assert_eq!(state.cursor, 0);
        state.move_cursor(20, 10);
        assert_eq!(state.cursor, 9);
        assert_eq!(state.offset, 5);
    }

    #[test]
    fn clamp_resets_on_empty_list() {
        let mut state = UiState::default();
        state.cursor = 7;
        state.offset = 3;
        state.clamp_cursor(0);
        assert_eq!(state.cursor, 0);
        assert_eq!(state.offset, 0);
    }

    #[test]
    fn page_movement_uses_list_height() {
        let mut state = UiState::default();
        state.list_height = 4;
        state.page_down(20);
        assert_eq!(state.cursor, 4);
        state.page_up(20);
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn truncate_appends_ellipsis() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long name", 8), "a very …");
    }

    #[test]
    fn playtime_bar_scales_with_percent() {
        assert_eq!(playtime_bar(0), "░░░░░░░░░░");
        assert_eq!(playtime_bar(100), "██████████");
        assert_eq!(playtime_bar(50), "█████░░░░░");
    }
}
