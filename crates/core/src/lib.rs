#![warn(clippy::all, missing_docs)]

//! Core domain logic for the steamlib viewer.
//!
//! This crate hosts the data models, configuration handling, throttled
//! API client, query state machine, aggregation, comparison, export,
//! and preference persistence used by the terminal UI and any future
//! frontends.

pub mod compare;
pub mod config;
pub mod error;
pub mod export;
pub mod listview;
pub mod models;
pub mod net;
pub mod prefs;
pub mod query;
pub mod stats;

pub use compare::Comparison;
pub use config::AppConfig;
pub use error::{AttemptError, FetchError};
pub use listview::{AchievementSlot, DetailsAction, ListViewModel, Row, RowContent};
pub use models::{
    AchievementSummary, DateRange, GameRecord, LibraryPage, LibrarySnapshot, Platform, SortKey,
};
pub use net::{LibraryClient, LibraryTarget, Throttler};
pub use prefs::{FavoritesSet, PrefsStore, ThemePrefs};
pub use query::{QueryCommand, QueryState, QueryStore};
