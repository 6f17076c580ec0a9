//! Filter, sort, and pagination state.
//!
//! The view layer never mutates [`QueryState`] directly; it applies
//! [`QueryCommand`]s through a [`QueryStore`], which reports whether the
//! change requires a refetch.

use serde::{Deserialize, Serialize};

use crate::models::{DateRange, Platform, SortKey};

/// The full set of parameters describing one library view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryState {
    /// Hide never-played titles.
    #[serde(default)]
    pub show_played_only: bool,
    /// Keep only titles with Windows playtime.
    #[serde(default)]
    pub filter_windows: bool,
    /// Keep only titles with macOS playtime.
    #[serde(default)]
    pub filter_mac: bool,
    /// Keep only titles with Linux playtime.
    #[serde(default)]
    pub filter_linux: bool,
    /// Keep only titles with Steam Deck playtime.
    #[serde(default)]
    pub filter_deck: bool,
    /// Case-insensitive name substring.
    #[serde(default)]
    pub search: String,
    /// Active sort order.
    #[serde(default)]
    pub sort_by: SortKey,
    /// Active last-played window.
    #[serde(default)]
    pub date_range: DateRange,
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Profile identifier the view belongs to, as typed by the user.
    #[serde(default)]
    pub steam_id: Option<String>,
}

fn default_page() -> u32 {
    1
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            show_played_only: false,
            filter_windows: false,
            filter_mac: false,
            filter_linux: false,
            filter_deck: false,
            search: String::new(),
            sort_by: SortKey::default(),
            date_range: DateRange::default(),
            page: default_page(),
            steam_id: None,
        }
    }
}

impl QueryState {
    /// Whether the given platform filter is on.
    pub fn platform(&self, platform: Platform) -> bool {
        match platform {
            Platform::Windows => self.filter_windows,
            Platform::Mac => self.filter_mac,
            Platform::Linux => self.filter_linux,
            Platform::Deck => self.filter_deck,
        }
    }

    fn platform_mut(&mut self, platform: Platform) -> &mut bool {
        match platform {
            Platform::Windows => &mut self.filter_windows,
            Platform::Mac => &mut self.filter_mac,
            Platform::Linux => &mut self.filter_linux,
            Platform::Deck => &mut self.filter_deck,
        }
    }

    /// Request parameters for the library endpoint, excluding the identifier.
    pub fn to_params(&self, per_page: u32) -> Vec<(String, String)> {
        let mut params = vec![
            ("page".to_string(), self.page.to_string()),
            ("per_page".to_string(), per_page.to_string()),
            ("sortBy".to_string(), self.sort_by.wire_value().to_string()),
            (
                "showPlayedOnly".to_string(),
                self.show_played_only.to_string(),
            ),
            (
                "dateRange".to_string(),
                self.date_range.wire_value().to_string(),
            ),
        ];
        for platform in Platform::ALL {
            params.push((
                platform.filter_param().to_string(),
                self.platform(platform).to_string(),
            ));
        }
        if !self.search.is_empty() {
            params.push(("search".to_string(), self.search.clone()));
        }
        params
    }

    /// Encode the identifier and the non-default fields as a shareable
    /// query string.
    pub fn to_share_query(&self) -> String {
        let mut pairs = Vec::new();
        if let Some(steam_id) = &self.steam_id {
            pairs.push(("steamid".to_string(), steam_id.clone()));
        }
        if self.show_played_only {
            pairs.push(("showPlayedOnly".to_string(), "true".to_string()));
        }
        for platform in Platform::ALL {
            if self.platform(platform) {
                pairs.push((platform.filter_param().to_string(), "true".to_string()));
            }
        }
        if !self.search.is_empty() {
            pairs.push(("search".to_string(), self.search.clone()));
        }
        if self.sort_by != SortKey::default() {
            pairs.push(("sortBy".to_string(), self.sort_by.wire_value().to_string()));
        }
        if self.date_range != DateRange::default() {
            pairs.push((
                "dateRange".to_string(),
                self.date_range.wire_value().to_string(),
            ));
        }
        if self.page > 1 {
            pairs.push(("page".to_string(), self.page.to_string()));
        }
        pairs
            .iter()
            .map(|(key, value)| format!("{key}={}", percent_encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Apply fields present in a shared query string over this state.
    ///
    /// Only recognised keys with parseable values take effect; everything
    /// else keeps its current value, so a partial link merges instead of
    /// wiping unrelated settings.
    pub fn apply_share_query(&mut self, query: &str) {
        for pair in query.trim_start_matches('?').split('&') {
            let (key, raw) = match pair.split_once('=') {
                Some((key, raw)) => (key, raw),
                None => continue,
            };
            let value = percent_decode(raw);
            match key {
                "steamid" => {
                    if !value.is_empty() {
                        self.steam_id = Some(value);
                    }
                }
                "page" => {
                    if let Ok(page) = value.parse::<u32>() {
                        self.page = page.max(1);
                    }
                }
                "showPlayedOnly" => self.show_played_only = value == "true",
                "filterWindows" => self.filter_windows = value == "true",
                "filterMac" => self.filter_mac = value == "true",
                "filterLinux" => self.filter_linux = value == "true",
                "filterDeck" => self.filter_deck = value == "true",
                "search" => self.search = value,
                "sortBy" => {
                    if let Some(sort) = SortKey::from_wire(&value) {
                        self.sort_by = sort;
                    }
                }
                "dateRange" => {
                    if let Some(range) = DateRange::from_wire(&value) {
                        self.date_range = range;
                    }
                }
                _ => {}
            }
        }
    }
}

/// Mutations the view layer can request against the query state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryCommand {
    /// Advance one page, saturating at the last.
    NextPage,
    /// Go back one page, saturating at the first.
    PrevPage,
    /// Jump to a specific page, clamped into range.
    SetPage(u32),
    /// Replace the search text.
    SetSearch(String),
    /// Replace the sort order.
    SetSort(SortKey),
    /// Replace the last-played window.
    SetDateRange(DateRange),
    /// Flip the played-only filter.
    TogglePlayedOnly,
    /// Flip one platform filter.
    TogglePlatform(Platform),
}

/// Owns the query state and the page bounds it is clamped against.
#[derive(Debug, Default)]
pub struct QueryStore {
    state: QueryState,
    total_pages: u32,
}

impl QueryStore {
    /// Store seeded with the given state.
    pub fn new(state: QueryState) -> Self {
        Self {
            state,
            total_pages: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Known page count, zero before the first response.
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Remember which profile the view belongs to.
    pub fn set_identifier(&mut self, steam_id: Option<String>) {
        self.state.steam_id = steam_id;
    }

    /// Record the page count from the latest response and clamp the
    /// current page into range.
    pub fn set_total_pages(&mut self, total_pages: u32) {
        self.total_pages = total_pages;
        if total_pages > 0 && self.state.page > total_pages {
            self.state.page = total_pages;
        }
    }

    /// Apply a command. Returns true when the state changed and the view
    /// needs a refetch; boundary no-ops return false.
    pub fn apply(&mut self, command: QueryCommand) -> bool {
        match command {
            QueryCommand::NextPage => {
                if self.total_pages > 0 && self.state.page < self.total_pages {
                    self.state.page += 1;
                    true
                } else {
                    false
                }
            }
            QueryCommand::PrevPage => {
                if self.state.page > 1 {
                    self.state.page -= 1;
                    true
                } else {
                    false
                }
            }
            QueryCommand::SetPage(page) => {
                let upper = self.total_pages.max(1);
                let clamped = page.clamp(1, upper);
                if clamped != self.state.page {
                    self.state.page = clamped;
                    true
                } else {
                    false
                }
            }
            QueryCommand::SetSearch(search) => {
                if self.state.search != search {
                    self.state.search = search;
                    self.state.page = 1;
                    true
                } else {
                    false
                }
            }
            QueryCommand::SetSort(sort) => {
                if self.state.sort_by != sort {
                    self.state.sort_by = sort;
                    self.state.page = 1;
                    true
                } else {
                    false
                }
            }
            QueryCommand::SetDateRange(range) => {
                if self.state.date_range != range {
                    self.state.date_range = range;
                    self.state.page = 1;
                    true
                } else {
                    false
                }
            }
            QueryCommand::TogglePlayedOnly => {
                self.state.show_played_only = !self.state.show_played_only;
                self.state.page = 1;
                true
            }
            QueryCommand::TogglePlatform(platform) => {
                let flag = self.state.platform_mut(platform);
                *flag = !*flag;
                self.state.page = 1;
                true
            }
        }
    }
}

const UNRESERVED: &str = "-_.~";

fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' => out.push(byte as char),
            _ if UNRESERVED.contains(byte as char) => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                if let Some(hex) = input.get(i + 1..i + 3) {
                    if let Ok(byte) = u8::from_str_radix(hex, 16) {
                        out.push(byte);
                        i += 3;
                        continue;
                    }
                }
                out.push(b'%');
                i += 1;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
