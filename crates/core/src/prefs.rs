//! Local persistence for favourites and view preferences.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::warn;

use crate::query::QueryState;

/// Root directory under `~/.config` used for preference files.
pub const DEFAULT_PREFS_DIR: &str = "steamlib";

const FAVORITES_FILE: &str = "favorites.json";
const VIEW_FILE: &str = "view.json";
const THEME_FILE: &str = "theme.json";

/// Favourited titles, kept in the order they were first favourited.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FavoritesSet(Vec<u64>);

impl FavoritesSet {
    /// Whether a title is favourited.
    pub fn contains(&self, app_id: u64) -> bool {
        self.0.contains(&app_id)
    }

    /// Flip a title's favourite state. Returns the new state.
    pub fn toggle(&mut self, app_id: u64) -> bool {
        if let Some(pos) = self.0.iter().position(|&id| id == app_id) {
            self.0.remove(pos);
            false
        } else {
            self.0.push(app_id);
            true
        }
    }

    /// Number of favourited titles.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is favourited.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Visual theme flag, persisted alongside the view preferences.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThemePrefs {
    /// Render with the dark palette.
    #[serde(default)]
    pub dark_mode: bool,
}

/// Loads and writes preference files under one root directory.
///
/// A corrupt or unreadable file is logged and replaced with defaults
/// rather than failing the caller.
pub struct PrefsStore {
    root: PathBuf,
}

impl PrefsStore {
    /// Store rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default location under the user's config directory.
    pub fn default_root() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_PREFS_DIR)
    }

    /// Load the favourites list.
    pub fn load_favorites(&self) -> FavoritesSet {
        self.read_or_default(FAVORITES_FILE)
    }

    /// Persist the favourites list.
    pub fn save_favorites(&self, favorites: &FavoritesSet) -> Result<()> {
        self.write(FAVORITES_FILE, favorites)
    }

    /// Load the remembered view (identifier, filters, sort, page).
    pub fn load_view(&self) -> QueryState {
        self.read_or_default(VIEW_FILE)
    }

    /// Persist the current view.
    pub fn save_view(&self, state: &QueryState) -> Result<()> {
        self.write(VIEW_FILE, state)
    }

    /// Load the theme flag.
    pub fn load_theme(&self) -> ThemePrefs {
        self.read_or_default(THEME_FILE)
    }

    /// Persist the theme flag.
    pub fn save_theme(&self, theme: &ThemePrefs) -> Result<()> {
        self.write(THEME_FILE, theme)
    }

    fn read_or_default<T: DeserializeOwned + Default>(&self, file: &str) -> T {
        let path = self.root.join(file);
        if !path.exists() {
            return T::default();
        }
        match read_json(&path) {
            Ok(value) => value,
            Err(err) => {
                warn!("Failed to read {}: {err}", path.display());
                T::default()
            }
        }
    }

    fn write<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let path = self.root.join(file);
        let serialised = serde_json::to_vec_pretty(value)?;
        fs::write(&path, serialised).with_context(|| format!("failed to write {}", path.display()))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}
