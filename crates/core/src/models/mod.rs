//! Shared domain models for library data.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// One owned title in a Steam library, as returned by the catalog API.
///
/// All playtimes are cumulative minutes. Fields other than `app_id` and
/// `name` default to absent/zero; a record missing either of those two is
/// invalid and gets dropped before it reaches any consumer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameRecord {
    /// Stable numeric identifier, unique per title.
    #[serde(rename = "appid", default)]
    pub app_id: u64,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Total minutes across all platforms.
    #[serde(rename = "playtime_forever", default)]
    pub playtime_forever: u32,
    /// Total minutes on Windows.
    #[serde(rename = "playtime_windows_forever", default)]
    pub playtime_windows: u32,
    /// Total minutes on macOS.
    #[serde(rename = "playtime_mac_forever", default)]
    pub playtime_mac: u32,
    /// Total minutes on Linux.
    #[serde(rename = "playtime_linux_forever", default)]
    pub playtime_linux: u32,
    /// Total minutes on Steam Deck.
    #[serde(rename = "playtime_deck_forever", default)]
    pub playtime_deck: u32,
    /// Minutes played within the trailing two weeks.
    #[serde(rename = "playtime_2weeks", default)]
    pub playtime_two_weeks: Option<u32>,
    /// Epoch seconds of the most recent session.
    #[serde(rename = "rtime_last_played", default)]
    pub last_played: Option<i64>,
    /// Icon asset id used to build the media URL.
    #[serde(rename = "img_icon_url", default)]
    pub icon_id: Option<String>,
    /// Content descriptor ids, in upstream order.
    #[serde(rename = "content_descriptorids", default)]
    pub content_descriptors: Option<Vec<String>>,
    /// Store metadata, present only when detail fetching was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<GameDetails>,
}

impl GameRecord {
    /// A record is usable only with both identity fields present.
    pub fn is_valid(&self) -> bool {
        self.app_id != 0 && !self.name.is_empty()
    }

    /// Whole hours played, floor rounded.
    pub fn hours_forever(&self) -> u64 {
        u64::from(self.playtime_forever) / 60
    }

    /// Whole hours played in the trailing two weeks.
    pub fn two_week_hours(&self) -> u64 {
        u64::from(self.playtime_two_weeks.unwrap_or(0)) / 60
    }

    /// Last-played date as `YYYY-MM-DD`, or `Never` without a timestamp.
    pub fn last_played_label(&self) -> String {
        self.last_played
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|when| when.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "Never".to_string())
    }

    /// Minutes on the given platform.
    pub fn platform_minutes(&self, platform: Platform) -> u32 {
        match platform {
            Platform::Windows => self.playtime_windows,
            Platform::Mac => self.playtime_mac,
            Platform::Linux => self.playtime_linux,
            Platform::Deck => self.playtime_deck,
        }
    }
}

/// Optional per-title store metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameDetails {
    /// Genre labels.
    #[serde(default)]
    pub genres: Vec<String>,
    /// Store category labels.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Human-readable release date.
    #[serde(default)]
    pub release_date: Option<String>,
}

/// The four platforms a playtime split is reported for.
///
/// Enumeration order doubles as the tie-break priority for the
/// most-active-platform statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    /// Windows.
    Windows,
    /// macOS.
    Mac,
    /// Linux.
    Linux,
    /// Steam Deck.
    Deck,
}

impl Platform {
    /// All platforms in priority order.
    pub const ALL: [Platform; 4] = [
        Platform::Windows,
        Platform::Mac,
        Platform::Linux,
        Platform::Deck,
    ];

    /// User-facing label.
    pub fn label(&self) -> &'static str {
        match self {
            Platform::Windows => "Windows",
            Platform::Mac => "Mac",
            Platform::Linux => "Linux",
            Platform::Deck => "Steam Deck",
        }
    }

    /// Query-parameter key for the matching platform filter.
    pub fn filter_param(&self) -> &'static str {
        match self {
            Platform::Windows => "filterWindows",
            Platform::Mac => "filterMac",
            Platform::Linux => "filterLinux",
            Platform::Deck => "filterDeck",
        }
    }
}

/// Sort orders understood by the catalog API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    /// Alphabetical by name.
    #[default]
    #[serde(rename = "name")]
    Name,
    /// Total playtime, descending.
    #[serde(rename = "playtime")]
    Playtime,
    /// Most recently played first.
    #[serde(rename = "lastPlayed")]
    LastPlayed,
    /// Two-week playtime, descending.
    #[serde(rename = "playtime2Weeks")]
    TwoWeeks,
}

impl SortKey {
    /// Wire value used in query parameters.
    pub fn wire_value(&self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::Playtime => "playtime",
            SortKey::LastPlayed => "lastPlayed",
            SortKey::TwoWeeks => "playtime2Weeks",
        }
    }

    /// Parse a wire value; unknown input yields `None`.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "name" => Some(SortKey::Name),
            "playtime" => Some(SortKey::Playtime),
            "lastPlayed" => Some(SortKey::LastPlayed),
            "playtime2Weeks" => Some(SortKey::TwoWeeks),
            _ => None,
        }
    }

    /// Cycle to the next sort order.
    pub fn next(&self) -> Self {
        match self {
            SortKey::Name => SortKey::Playtime,
            SortKey::Playtime => SortKey::LastPlayed,
            SortKey::LastPlayed => SortKey::TwoWeeks,
            SortKey::TwoWeeks => SortKey::Name,
        }
    }

    /// User-facing label.
    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Name => "Name",
            SortKey::Playtime => "Playtime",
            SortKey::LastPlayed => "Last Played",
            SortKey::TwoWeeks => "2-Week Playtime",
        }
    }
}

/// Last-played window filters understood by the catalog API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateRange {
    /// No window.
    #[default]
    #[serde(rename = "all")]
    All,
    /// Played within the trailing 30 days.
    #[serde(rename = "last30Days")]
    Last30Days,
    /// Played within the trailing year.
    #[serde(rename = "lastYear")]
    LastYear,
}

impl DateRange {
    /// Wire value used in query parameters.
    pub fn wire_value(&self) -> &'static str {
        match self {
            DateRange::All => "all",
            DateRange::Last30Days => "last30Days",
            DateRange::LastYear => "lastYear",
        }
    }

    /// Parse a wire value; unknown input yields `None`.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "all" => Some(DateRange::All),
            "last30Days" => Some(DateRange::Last30Days),
            "lastYear" => Some(DateRange::LastYear),
            _ => None,
        }
    }

    /// Cycle to the next window.
    pub fn next(&self) -> Self {
        match self {
            DateRange::All => DateRange::Last30Days,
            DateRange::Last30Days => DateRange::LastYear,
            DateRange::LastYear => DateRange::All,
        }
    }

    /// User-facing label.
    pub fn label(&self) -> &'static str {
        match self {
            DateRange::All => "All Time",
            DateRange::Last30Days => "Last 30 Days",
            DateRange::LastYear => "Last Year",
        }
    }
}

/// Raw library response payload: either data fields or an error message.
#[derive(Debug, Default, Deserialize)]
pub struct LibraryEnvelope {
    /// Returned records; may contain invalid entries.
    #[serde(default)]
    pub games: Vec<GameRecord>,
    /// Resolved 64-bit id of the queried profile.
    #[serde(default)]
    pub steam_id: Option<String>,
    /// Page count for the applied filters.
    #[serde(default)]
    pub total_pages: Option<u32>,
    /// Record count for the applied filters.
    #[serde(default)]
    pub total_games: Option<u32>,
    /// Server-reported failure; presence overrides the data fields.
    #[serde(default)]
    pub error: Option<String>,
}

/// Unpaginated snapshot used for aggregates (stats, chart, top/recent).
#[derive(Debug, Clone, Default)]
pub struct LibrarySnapshot {
    /// Resolved 64-bit profile id.
    pub steam_id: String,
    /// All valid records the aggregate fetch returned.
    pub games: Vec<GameRecord>,
}

/// One page of the filtered, sorted library view.
#[derive(Debug, Clone, Default)]
pub struct LibraryPage {
    /// Resolved 64-bit profile id.
    pub steam_id: String,
    /// Valid records on this page.
    pub games: Vec<GameRecord>,
    /// Page count for the applied filters.
    pub total_pages: u32,
    /// Record count for the applied filters.
    pub total_games: u32,
}

/// Raw achievements response payload.
#[derive(Debug, Default, Deserialize)]
pub struct AchievementEnvelope {
    /// Per-achievement unlock state.
    #[serde(default)]
    pub achievements: Option<Vec<AchievementEntry>>,
    /// Server-reported failure.
    #[serde(default)]
    pub error: Option<String>,
}

/// One achievement row from the stats endpoint.
#[derive(Debug, Deserialize)]
pub struct AchievementEntry {
    /// 1 when unlocked, 0 otherwise.
    #[serde(default)]
    pub achieved: u8,
}

/// Completion count shown in a details panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AchievementSummary {
    /// Unlocked achievements.
    pub achieved: usize,
    /// Total achievements.
    pub total: usize,
}

impl AchievementSummary {
    /// Collapse the raw response into an `achieved / total` pair.
    pub fn from_entries(entries: &[AchievementEntry]) -> Self {
        Self {
            achieved: entries.iter().filter(|entry| entry.achieved == 1).count(),
            total: entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_requires_both_identity_fields() {
        let record: GameRecord = serde_json::from_value(json!({"appid": 10, "name": "Half-Life"}))
            .expect("minimal record parses");
        assert!(record.is_valid());
        assert_eq!(record.playtime_forever, 0);
        assert_eq!(record.last_played, None);

        let nameless: GameRecord =
            serde_json::from_value(json!({"appid": 10})).expect("partial record parses");
        assert!(!nameless.is_valid());

        let idless: GameRecord =
            serde_json::from_value(json!({"name": "Mystery"})).expect("partial record parses");
        assert!(!idless.is_valid());
    }

    #[test]
    fn upstream_field_names_are_mapped() {
        let record: GameRecord = serde_json::from_value(json!({
            "appid": 620,
            "name": "Portal 2",
            "playtime_forever": 125,
            "playtime_windows_forever": 100,
            "playtime_deck_forever": 25,
            "playtime_2weeks": 61,
            "rtime_last_played": 1_700_000_000i64,
            "img_icon_url": "abcdef"
        }))
        .expect("record parses");
        assert_eq!(record.playtime_windows, 100);
        assert_eq!(record.playtime_deck, 25);
        assert_eq!(record.two_week_hours(), 1);
        assert_eq!(record.hours_forever(), 2);
        assert_eq!(record.last_played_label(), "2023-11-14");
    }

    #[test]
    fn missing_timestamp_reads_never() {
        let record = GameRecord {
            app_id: 1,
            name: "x".to_string(),
            ..GameRecord::default()
        };
        assert_eq!(record.last_played_label(), "Never");
    }

    #[test]
    fn achievement_summary_counts_unlocked() {
        let entries = vec![
            AchievementEntry { achieved: 1 },
            AchievementEntry { achieved: 0 },
            AchievementEntry { achieved: 1 },
        ];
        let summary = AchievementSummary::from_entries(&entries);
        assert_eq!(summary.achieved, 2);
        assert_eq!(summary.total, 3);
    }

    #[test]
    fn envelope_error_variant_parses() {
        let envelope: LibraryEnvelope =
            serde_json::from_value(json!({"error": "Profile is private."}))
                .expect("error envelope parses");
        assert_eq!(envelope.error.as_deref(), Some("Profile is private."));
        assert!(envelope.games.is_empty());
    }
}
