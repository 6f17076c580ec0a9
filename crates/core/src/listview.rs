//! Incremental list rendering.
//!
//! A freshly loaded page starts as placeholder rows; rows are promoted to
//! fully rendered content as the viewport approaches them, each exactly
//! once. The view layer queries [`ListViewModel::rows`] for whatever range
//! it is about to draw and reports scroll position back through
//! [`ListViewModel::pending_promotions`].

use std::collections::HashMap;

use crate::models::{AchievementSummary, GameRecord};
use crate::prefs::FavoritesSet;

/// Rows ahead of the viewport edge that are promoted eagerly.
pub const PROMOTION_LOOKAHEAD: usize = 8;

/// Fully rendered row content, computed once at promotion time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowContent {
    /// Title identifier.
    pub app_id: u64,
    /// Display name.
    pub name: String,
    /// Whole hours played.
    pub hours: u64,
    /// Last-played date label.
    pub last_played: String,
    /// Whole hours in the trailing two weeks.
    pub two_week_hours: u64,
    /// Playtime bar fill, 0..=100, relative to the library maximum.
    pub bar_percent: u8,
    /// Whether the title is favourited.
    pub favorite: bool,
}

/// One row as the view layer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row<'a> {
    /// Not yet promoted; draw a lightweight placeholder.
    Placeholder {
        /// Display name, available before promotion.
        name: &'a str,
    },
    /// Promoted; draw the full content.
    Full(&'a RowContent),
}

/// Achievement panel state for one title.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AchievementSlot {
    /// Details never opened for this title.
    #[default]
    NotRequested,
    /// Fetch in flight.
    Pending,
    /// Summary available.
    Loaded(AchievementSummary),
    /// Fetch failed; the message is shown inline.
    Failed(String),
}

/// What the caller must do after toggling a details panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailsAction {
    /// Panel opened and an achievements fetch is needed.
    FetchAchievements(u64),
    /// Panel opened with already known achievement state.
    Opened,
    /// Panel closed.
    Closed,
}

/// View model for one loaded page.
#[derive(Debug, Default)]
pub struct ListViewModel {
    records: Vec<GameRecord>,
    promoted: Vec<Option<RowContent>>,
    achievements: HashMap<u64, AchievementSlot>,
    open_details: Option<u64>,
    max_playtime: u32,
}

impl ListViewModel {
    /// Build a model over a page of records, all rows starting as
    /// placeholders. `scale_max` is the library-wide playtime maximum the
    /// bars are drawn against, so a page of short titles still reads
    /// short. Falls back to the page maximum when zero.
    pub fn new(records: Vec<GameRecord>, scale_max: u32) -> Self {
        let page_max = records.iter().map(|g| g.playtime_forever).max().unwrap_or(0);
        let max_playtime = if scale_max > 0 { scale_max } else { page_max };
        let promoted = vec![None; records.len()];
        Self {
            records,
            promoted,
            achievements: HashMap::new(),
            open_details: None,
            max_playtime,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the page is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at the given row, if in range.
    pub fn record(&self, index: usize) -> Option<&GameRecord> {
        self.records.get(index)
    }

    /// All records on the page, in display order.
    pub fn records(&self) -> &[GameRecord] {
        &self.records
    }

    /// Indices that should be promoted for a viewport at `offset` showing
    /// `height` rows, including the lookahead margin past the bottom edge.
    pub fn pending_promotions(&self, offset: usize, height: usize) -> Vec<usize> {
        let end = offset
            .saturating_add(height)
            .saturating_add(PROMOTION_LOOKAHEAD)
            .min(self.records.len());
        (offset..end)
            .filter(|&index| self.promoted[index].is_none())
            .collect()
    }

    /// Promote one row, computing its content. Promoting an already
    /// promoted row is a no-op.
    pub fn promote(&mut self, index: usize, favorites: &FavoritesSet) {
        let Some(record) = self.records.get(index) else {
            return;
        };
        if self.promoted[index].is_some() {
            return;
        }
        let bar_percent = if self.max_playtime == 0 {
            0
        } else {
            ((u64::from(record.playtime_forever) * 100) / u64::from(self.max_playtime)) as u8
        };
        self.promoted[index] = Some(RowContent {
            app_id: record.app_id,
            name: record.name.clone(),
            hours: record.hours_forever(),
            last_played: record.last_played_label(),
            two_week_hours: record.two_week_hours(),
            bar_percent,
            favorite: favorites.contains(record.app_id),
        });
    }

    /// Promote every pending row in the given viewport.
    pub fn promote_viewport(&mut self, offset: usize, height: usize, favorites: &FavoritesSet) {
        for index in self.pending_promotions(offset, height) {
            self.promote(index, favorites);
        }
    }

    /// Rows for the given viewport, placeholders included.
    pub fn rows(&self, offset: usize, height: usize) -> Vec<Row<'_>> {
        let end = offset.saturating_add(height).min(self.records.len());
        (offset..end)
            .map(|index| match &self.promoted[index] {
                Some(content) => Row::Full(content),
                None => Row::Placeholder {
                    name: &self.records[index].name,
                },
            })
            .collect()
    }

    /// Re-read favourite flags on already promoted rows after a toggle.
    pub fn refresh_favorites(&mut self, favorites: &FavoritesSet) {
        for content in self.promoted.iter_mut().flatten() {
            content.favorite = favorites.contains(content.app_id);
        }
    }

    /// Row index whose details panel is open, if any.
    pub fn open_details(&self) -> Option<u64> {
        self.open_details
    }

    /// Close any open details panel.
    pub fn close_details(&mut self) {
        self.open_details = None;
    }

    /// Toggle the details panel for the row at `index`.
    ///
    /// Opening a panel whose achievements were never fetched requests the
    /// fetch exactly once; reopening reuses the cached slot.
    pub fn toggle_details(&mut self, index: usize) -> Option<DetailsAction> {
        let record = self.records.get(index)?;
        let app_id = record.app_id;
        if self.open_details == Some(app_id) {
            self.open_details = None;
            return Some(DetailsAction::Closed);
        }
        self.open_details = Some(app_id);
        let slot = self.achievements.entry(app_id).or_default();
        if matches!(slot, AchievementSlot::NotRequested) {
            *slot = AchievementSlot::Pending;
            Some(DetailsAction::FetchAchievements(app_id))
        } else {
            Some(DetailsAction::Opened)
        }
    }

    /// Achievement state for a title.
    pub fn achievements(&self, app_id: u64) -> AchievementSlot {
        self.achievements
            .get(&app_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Record a finished achievements fetch.
    pub fn set_achievements(&mut self, app_id: u64, result: Result<AchievementSummary, String>) {
        let slot = match result {
            Ok(summary) => AchievementSlot::Loaded(summary),
            Err(message) => AchievementSlot::Failed(message),
        };
        self.achievements.insert(app_id, slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(count: usize) -> ListViewModel {
        let records = (0..count)
            .map(|i| GameRecord {
                app_id: (i + 1) as u64,
                name: format!("game {i}"),
                playtime_forever: (i as u32) * 60,
                ..GameRecord::default()
            })
            .collect();
        ListViewModel::new(records, 0)
    }

    #[test]
    fn rows_start_as_placeholders() {
        let model = page(5);
        let rows = model.rows(0, 5);
        assert_eq!(rows.len(), 5);
        assert!(rows
            .iter()
            .all(|row| matches!(row, Row::Placeholder { .. })));
    }

    #[test]
    fn viewport_promotion_covers_lookahead() {
        let mut model = page(50);
        let favorites = FavoritesSet::default();
        model.promote_viewport(0, 10, &favorites);
        assert_eq!(model.pending_promotions(0, 10), Vec::<usize>::new());
        // Lookahead rows past the bottom edge were promoted too.
        assert!(matches!(model.rows(10, 1)[0], Row::Full(_)));
        assert!(matches!(
            model.rows(10 + PROMOTION_LOOKAHEAD, 1)[0],
            Row::Placeholder { .. }
        ));
    }

    #[test]
    fn promotion_happens_once_per_row() {
        let mut model = page(3);
        let mut favorites = FavoritesSet::default();
        model.promote(0, &favorites);
        favorites.toggle(1);
        // Second promote is a no-op, so the stale favourite flag stays.
        model.promote(0, &favorites);
        match model.rows(0, 1)[0] {
            Row::Full(content) => assert!(!content.favorite),
            _ => panic!("row should be promoted"),
        }
        model.refresh_favorites(&favorites);
        match model.rows(0, 1)[0] {
            Row::Full(content) => assert!(content.favorite),
            _ => panic!("row should be promoted"),
        }
    }

    #[test]
    fn bar_percent_is_relative_to_page_maximum() {
        let mut model = page(3);
        let favorites = FavoritesSet::default();
        model.promote_viewport(0, 3, &favorites);
        let percents: Vec<u8> = model
            .rows(0, 3)
            .iter()
            .map(|row| match row {
                Row::Full(content) => content.bar_percent,
                _ => panic!("promoted"),
            })
            .collect();
        assert_eq!(percents, vec![0, 50, 100]);
    }

    #[test]
    fn all_zero_playtimes_render_empty_bars() {
        let mut model = ListViewModel::new(
            vec![GameRecord {
                app_id: 1,
                name: "idle".to_string(),
                ..GameRecord::default()
            }],
            0,
        );
        model.promote(0, &FavoritesSet::default());
        match model.rows(0, 1)[0] {
            Row::Full(content) => assert_eq!(content.bar_percent, 0),
            _ => panic!("promoted"),
        }
    }

    #[test]
    fn bars_scale_against_library_maximum() {
        let mut model = ListViewModel::new(
            vec![GameRecord {
                app_id: 1,
                name: "mid".to_string(),
                playtime_forever: 120,
                ..GameRecord::default()
            }],
            480,
        );
        model.promote(0, &FavoritesSet::default());
        // 120 of a library-wide 480 maximum, not 100% of the page.
        match model.rows(0, 1)[0] {
            Row::Full(content) => assert_eq!(content.bar_percent, 25),
            _ => panic!("promoted"),
        }
    }

    #[test]
    fn details_fetch_is_requested_exactly_once() {
        let mut model = page(2);
        assert_eq!(
            model.toggle_details(0),
            Some(DetailsAction::FetchAchievements(1))
        );
        assert_eq!(model.toggle_details(0), Some(DetailsAction::Closed));
        // Reopening reuses the pending slot instead of refetching.
        assert_eq!(model.toggle_details(0), Some(DetailsAction::Opened));
        assert_eq!(model.achievements(1), AchievementSlot::Pending);

        model.set_achievements(1, Ok(AchievementSummary { achieved: 3, total: 10 }));
        assert_eq!(
            model.achievements(1),
            AchievementSlot::Loaded(AchievementSummary { achieved: 3, total: 10 })
        );
    }

    #[test]
    fn opening_one_panel_closes_the_other() {
        let mut model = page(2);
        model.toggle_details(0);
        assert_eq!(model.open_details(), Some(1));
        model.toggle_details(1);
        assert_eq!(model.open_details(), Some(2));
    }

    #[test]
    fn out_of_range_toggle_is_ignored() {
        let mut model = page(1);
        assert_eq!(model.toggle_details(5), None);
    }
}
