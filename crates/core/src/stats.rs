//! Library-wide aggregates: headline stats, monthly activity, highlight lists.

use std::collections::BTreeMap;

use chrono::DateTime;
use serde::Serialize;

use crate::models::{GameRecord, Platform};

/// Trailing window that counts as "recently played".
pub const RECENT_WINDOW_SECS: i64 = 31 * 86_400;
/// Row cap for the top-games list.
pub const TOP_GAMES_LIMIT: usize = 20;
/// Row cap for the recently-played fallback list.
pub const RECENT_FALLBACK_LIMIT: usize = 10;

/// Headline numbers for one library snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LibraryStats {
    /// Titles owned.
    pub total_games: usize,
    /// Titles with any recorded playtime.
    pub played_games: usize,
    /// Whole hours across the library.
    pub total_hours: u64,
    /// Whole hours per played title, floor rounded.
    pub avg_hours_per_played: u64,
    /// Platform with the largest summed playtime.
    pub most_active: Platform,
}

/// Compute headline stats over a snapshot.
///
/// An empty snapshot yields all zeroes with Windows as the placeholder
/// most-active platform.
pub fn compute_stats(games: &[GameRecord]) -> LibraryStats {
    let total_games = games.len();
    let played: Vec<_> = games.iter().filter(|g| g.playtime_forever > 0).collect();
    let played_games = played.len();
    let total_minutes: u64 = games.iter().map(|g| u64::from(g.playtime_forever)).sum();
    let avg_hours_per_played = if played_games > 0 {
        total_minutes / (played_games as u64 * 60)
    } else {
        0
    };

    let mut most_active = Platform::Windows;
    let mut best = 0u64;
    for platform in Platform::ALL {
        let sum: u64 = games
            .iter()
            .map(|g| u64::from(g.platform_minutes(platform)))
            .sum();
        // Strictly greater: ties keep the earlier platform in priority order.
        if sum > best {
            best = sum;
            most_active = platform;
        }
    }

    LibraryStats {
        total_games,
        played_games,
        total_hours: total_minutes / 60,
        avg_hours_per_played,
        most_active,
    }
}

/// Hours bucketed by last-played month, as `(label, hours)` pairs in
/// ascending `YYYY-MM` order. Titles without a timestamp are skipped.
pub fn monthly_series(games: &[GameRecord]) -> Vec<(String, u64)> {
    let mut buckets: BTreeMap<String, u64> = BTreeMap::new();
    for game in games {
        let Some(secs) = game.last_played else {
            continue;
        };
        let Some(when) = DateTime::from_timestamp(secs, 0) else {
            continue;
        };
        *buckets.entry(when.format("%Y-%m").to_string()).or_insert(0) +=
            u64::from(game.playtime_forever);
    }
    buckets
        .into_iter()
        .map(|(label, minutes)| (label, minutes / 60))
        .collect()
}

/// Top titles by total playtime, capped at [`TOP_GAMES_LIMIT`].
///
/// The sort is stable, so equal playtimes keep their snapshot order.
pub fn top_games(games: &[GameRecord]) -> Vec<GameRecord> {
    let mut ranked = games.to_vec();
    ranked.sort_by(|a, b| b.playtime_forever.cmp(&a.playtime_forever));
    ranked.truncate(TOP_GAMES_LIMIT);
    ranked
}

/// Fallback chain for the recently-played list. Strategies run in order
/// and the first non-empty result wins.
const RECENT_STRATEGIES: [fn(&[GameRecord], i64) -> Vec<GameRecord>; 2] =
    [within_recent_window, most_recent_fallback];

/// Recently-played titles, most recent first.
pub fn recently_played(games: &[GameRecord], now_secs: i64) -> Vec<GameRecord> {
    for strategy in RECENT_STRATEGIES {
        let picked = strategy(games, now_secs);
        if !picked.is_empty() {
            return picked;
        }
    }
    Vec::new()
}

fn within_recent_window(games: &[GameRecord], now_secs: i64) -> Vec<GameRecord> {
    let cutoff = now_secs - RECENT_WINDOW_SECS;
    let mut recent: Vec<_> = games
        .iter()
        .filter(|g| {
            g.playtime_two_weeks.unwrap_or(0) > 0
                || g.last_played.is_some_and(|secs| secs >= cutoff)
        })
        .cloned()
        .collect();
    recent.sort_by(|a, b| b.last_played.cmp(&a.last_played));
    recent
}

fn most_recent_fallback(games: &[GameRecord], _now_secs: i64) -> Vec<GameRecord> {
    let mut played: Vec<_> = games
        .iter()
        .filter(|g| g.last_played.is_some())
        .cloned()
        .collect();
    played.sort_by(|a, b| b.last_played.cmp(&a.last_played));
    played.truncate(RECENT_FALLBACK_LIMIT);
    played
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(name: &str, minutes: u32) -> GameRecord {
        GameRecord {
            app_id: 1,
            name: name.to_string(),
            playtime_forever: minutes,
            ..GameRecord::default()
        }
    }

    #[test]
    fn empty_snapshot_yields_zeroes() {
        let stats = compute_stats(&[]);
        assert_eq!(stats.total_games, 0);
        assert_eq!(stats.played_games, 0);
        assert_eq!(stats.total_hours, 0);
        assert_eq!(stats.avg_hours_per_played, 0);
        assert_eq!(stats.most_active, Platform::Windows);
    }

    #[test]
    fn unplayed_titles_are_excluded_from_average() {
        let games = vec![game("a", 600), game("b", 0), game("c", 120)];
        let stats = compute_stats(&games);
        assert_eq!(stats.total_games, 3);
        assert_eq!(stats.played_games, 2);
        assert_eq!(stats.total_hours, 12);
        // 720 minutes over 2 played titles.
        assert_eq!(stats.avg_hours_per_played, 6);
    }

    #[test]
    fn most_active_breaks_ties_by_priority_order() {
        let mut a = game("a", 100);
        a.playtime_mac = 50;
        a.playtime_linux = 50;
        let stats = compute_stats(&[a]);
        assert_eq!(stats.most_active, Platform::Mac);
    }

    #[test]
    fn month_labels_are_unique_and_ascending() {
        let mut games = Vec::new();
        for (secs, minutes) in [
            (1_700_000_000i64, 120u32), // 2023-11
            (1_672_617_600, 60),        // 2023-01
            (1_700_100_000, 60),        // 2023-11 again
        ] {
            let mut g = game("x", minutes);
            g.last_played = Some(secs);
            games.push(g);
        }
        let series = monthly_series(&games);
        let labels: Vec<_> = series.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["2023-01", "2023-11"]);
        assert_eq!(series[1].1, 3);
        let mut sorted = labels.clone();
        sorted.sort();
        assert_eq!(labels, sorted);
    }

    #[test]
    fn recent_falls_back_to_most_recent_ten() {
        let now = 2_000_000_000i64;
        let mut games = Vec::new();
        for i in 0..15 {
            let mut g = game(&format!("g{i}"), 60);
            // Everything far older than the 31-day window.
            g.last_played = Some(now - RECENT_WINDOW_SECS - 1_000 - i);
            games.push(g);
        }
        let recent = recently_played(&games, now);
        assert_eq!(recent.len(), RECENT_FALLBACK_LIMIT);
        assert_eq!(recent[0].name, "g0");
    }

    #[test]
    fn two_week_playtime_counts_as_recent() {
        let now = 2_000_000_000i64;
        let mut g = game("fresh-ish", 10);
        g.playtime_two_weeks = Some(30);
        g.last_played = Some(now - RECENT_WINDOW_SECS - 100);
        let recent = recently_played(&[g], now);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].name, "fresh-ish");
    }

    #[test]
    fn recent_window_takes_priority_over_fallback() {
        let now = 2_000_000_000i64;
        let mut fresh = game("fresh", 10);
        fresh.last_played = Some(now - 100);
        let mut stale = game("stale", 10);
        stale.last_played = Some(now - RECENT_WINDOW_SECS - 100);
        let recent = recently_played(&[stale, fresh], now);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].name, "fresh");
    }

    #[test]
    fn fallback_is_min_of_ten_and_library_size() {
        let now = 2_000_000_000i64;
        let mut g = game("only", 10);
        g.last_played = Some(now - RECENT_WINDOW_SECS - 100);
        assert_eq!(recently_played(&[g], now).len(), 1);
        assert!(recently_played(&[game("never", 10)], now).is_empty());
    }

    #[test]
    fn top_games_is_capped_and_stable() {
        let mut games: Vec<_> = (0..25).map(|i| game(&format!("g{i}"), 100)).collect();
        games.push(game("big", 1000));
        let top = top_games(&games);
        assert_eq!(top.len(), TOP_GAMES_LIMIT);
        assert_eq!(top[0].name, "big");
        // Equal playtimes keep input order.
        assert_eq!(top[1].name, "g0");
    }
}
