//! Configuration management

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

use crate::error::Result;
use crate::models::ContentKind;

const APP_DIR: &str = "xtream_catalog";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub external_player: String,
    #[serde(default)]
    pub user_agent: String,
    /// Catalog database location, empty for the default under the config dir
    #[serde(default)]
    pub database_path: String,
    #[serde(default = "default_recents_limit")]
    pub recents_limit: usize,
    #[serde(default)]
    pub parental_control: bool,
    #[serde(default)]
    pub parental_pin: Option<String>,
    #[serde(default)]
    pub blocked_live_categories: BTreeSet<String>,
    #[serde(default)]
    pub blocked_vod_categories: BTreeSet<String>,
    #[serde(default)]
    pub blocked_series_categories: BTreeSet<String>,
}

fn default_recents_limit() -> usize { 25 }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            external_player: String::new(),
            user_agent: String::new(),
            database_path: String::new(),
            recents_limit: default_recents_limit(),
            parental_control: false,
            parental_pin: None,
            blocked_live_categories: BTreeSet::new(),
            blocked_vod_categories: BTreeSet::new(),
            blocked_series_categories: BTreeSet::new(),
        }
    }
}

impl AppConfig {
    pub fn config_dir() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        fs::create_dir_all(&path).ok();
        path
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    pub fn database_path(&self) -> PathBuf {
        if self.database_path.is_empty() {
            Self::config_dir().join("catalog.db")
        } else {
            PathBuf::from(&self.database_path)
        }
    }

    /// Load from `path`, falling back to defaults on a missing or corrupt file
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => warn!("Ignoring corrupt config {}: {}", path.display(), e),
                }
            }
        }

        Self::default()
    }

    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn blocked_categories(&self, kind: ContentKind) -> &BTreeSet<String> {
        match kind {
            ContentKind::Live => &self.blocked_live_categories,
            ContentKind::Vod => &self.blocked_vod_categories,
            ContentKind::Series => &self.blocked_series_categories,
        }
    }

    fn blocked_categories_mut(&mut self, kind: ContentKind) -> &mut BTreeSet<String> {
        match kind {
            ContentKind::Live => &mut self.blocked_live_categories,
            ContentKind::Vod => &mut self.blocked_vod_categories,
            ContentKind::Series => &mut self.blocked_series_categories,
        }
    }
}

/// Simple settings consumed by the session controller
pub trait SettingsStore: Send + Sync {
    fn recents_limit(&self) -> usize;

    fn parental_control_enabled(&self) -> bool;

    fn parental_pin(&self) -> Option<String>;

    fn blocked_categories(&self, kind: ContentKind) -> BTreeSet<String>;

    fn set_recents_limit(&self, limit: usize);

    fn set_parental_control(&self, enabled: bool);

    fn set_parental_pin(&self, pin: Option<String>);

    fn set_category_blocked(&self, kind: ContentKind, category_id: &str, blocked: bool);

    /// True when no PIN is configured or `pin` matches it
    fn verify_parental_pin(&self, pin: &str) -> bool {
        match self.parental_pin() {
            Some(expected) if !expected.is_empty() => expected == pin,
            _ => true,
        }
    }
}

/// In-memory settings, never persisted
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    config: Mutex<AppConfig>,
}

impl MemorySettingsStore {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AppConfig> {
        self.config.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SettingsStore for MemorySettingsStore {
    fn recents_limit(&self) -> usize {
        self.lock().recents_limit
    }

    fn parental_control_enabled(&self) -> bool {
        self.lock().parental_control
    }

    fn parental_pin(&self) -> Option<String> {
        self.lock().parental_pin.clone()
    }

    fn blocked_categories(&self, kind: ContentKind) -> BTreeSet<String> {
        self.lock().blocked_categories(kind).clone()
    }

    fn set_recents_limit(&self, limit: usize) {
        self.lock().recents_limit = limit;
    }

    fn set_parental_control(&self, enabled: bool) {
        self.lock().parental_control = enabled;
    }

    fn set_parental_pin(&self, pin: Option<String>) {
        self.lock().parental_pin = pin;
    }

    fn set_category_blocked(&self, kind: ContentKind, category_id: &str, blocked: bool) {
        let mut config = self.lock();
        let set = config.blocked_categories_mut(kind);
        if blocked {
            set.insert(category_id.to_string());
        } else {
            set.remove(category_id);
        }
    }
}

/// Settings backed by the JSON config file, saved on every write
#[derive(Debug)]
pub struct JsonSettingsStore {
    path: PathBuf,
    inner: MemorySettingsStore,
}

impl JsonSettingsStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = AppConfig::load_from(&path);
        Self {
            path,
            inner: MemorySettingsStore::new(config),
        }
    }

    pub fn open_default() -> Self {
        Self::open(AppConfig::config_path())
    }

    pub fn snapshot(&self) -> AppConfig {
        self.inner.lock().clone()
    }

    fn save(&self) {
        let config = self.snapshot();
        if let Err(e) = config.save_to(&self.path) {
            warn!("Failed to save settings to {}: {}", self.path.display(), e);
        }
    }
}

impl SettingsStore for JsonSettingsStore {
    fn recents_limit(&self) -> usize {
        self.inner.recents_limit()
    }

    fn parental_control_enabled(&self) -> bool {
        self.inner.parental_control_enabled()
    }

    fn parental_pin(&self) -> Option<String> {
        self.inner.parental_pin()
    }

    fn blocked_categories(&self, kind: ContentKind) -> BTreeSet<String> {
        self.inner.blocked_categories(kind)
    }

    fn set_recents_limit(&self, limit: usize) {
        self.inner.set_recents_limit(limit);
        self.save();
    }

    fn set_parental_control(&self, enabled: bool) {
        self.inner.set_parental_control(enabled);
        self.save();
    }

    fn set_parental_pin(&self, pin: Option<String>) {
        self.inner.set_parental_pin(pin);
        self.save();
    }

    fn set_category_blocked(&self, kind: ContentKind, category_id: &str, blocked: bool) {
        self.inner.set_category_blocked(kind, category_id, blocked);
        self.save();
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
