//! Channel session controller
//!
//! Derives the live category list and the filtered channel list from the
//! cache, tracks what is playing, and steps through the last list the user
//! browsed. Every published value has this controller as its only writer.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::CatalogCache;
use crate::clock::Clock;
use crate::config::SettingsStore;
use crate::error::{CatalogError, Result};
use crate::models::{
    Category, ContentKind, FavoriteMark, LiveChannel, RecentMark, ALL_CATEGORY_ID,
    FAVORITES_CATEGORY_ID, RECENTS_CATEGORY_ID,
};
use crate::player::{PlaybackEngine, SessionKind};
use crate::published::Published;
use crate::session::naming::NameCache;

/// Label provider categories named some variant of "all" are renamed to
pub const CANONICAL_ALL_LABEL: &str = "All";

/// Lower-cased names treated as "all" when they come from the provider
const ALL_ALIASES: [&str; 7] = ["all", "todos", "todas", "tous", "alle", "tutti", "tudo"];

fn is_all_alias(name: &str) -> bool {
    let lowered = name.trim().to_lowercase();
    ALL_ALIASES.contains(&lowered.as_str())
}

/// Rename "all" variants, drop duplicates by (id, lower-cased name), drop
/// blocked ids, then put the synthetic categories in front.
pub fn build_category_list(provider: Vec<Category>, blocked: &HashSet<String>) -> Vec<Category> {
    let mut seen = HashSet::new();
    let mut list = vec![Category::all(), Category::favorites(), Category::recents()];

    for mut category in provider {
        if is_all_alias(&category.category_name) {
            category.category_name = CANONICAL_ALL_LABEL.to_string();
        }
        let key = (
            category.category_id.clone(),
            category.category_name.to_lowercase(),
        );
        if !seen.insert(key) {
            continue;
        }
        if blocked.contains(&category.category_id) {
            continue;
        }
        list.push(category);
    }

    list
}

/// Keep the first row of each content id, in input order
pub fn distinct_by_content_id(channels: Vec<LiveChannel>) -> Vec<LiveChannel> {
    let mut seen = HashSet::new();
    channels
        .into_iter()
        .filter(|channel| seen.insert(channel.content_id))
        .collect()
}

pub struct ChannelSession {
    cache: Arc<CatalogCache>,
    settings: Arc<dyn SettingsStore>,
    engine: Arc<dyn PlaybackEngine>,
    clock: Arc<dyn Clock>,
    names: NameCache,
    categories: Published<Vec<Category>>,
    selected: Published<Option<Category>>,
    channels: Published<Vec<LiveChannel>>,
    current: Published<Option<LiveChannel>>,
    /// List produced by the last filtering pass; navigation walks this one
    ordering: Mutex<Option<Vec<LiveChannel>>>,
    selection: AtomicU64,
    alive: AtomicBool,
}

impl ChannelSession {
    pub fn new(
        cache: Arc<CatalogCache>,
        settings: Arc<dyn SettingsStore>,
        engine: Arc<dyn PlaybackEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache,
            settings,
            engine,
            clock,
            names: NameCache::new(),
            categories: Published::default(),
            selected: Published::default(),
            channels: Published::default(),
            current: Published::default(),
            ordering: Mutex::new(None),
            selection: AtomicU64::new(0),
            alive: AtomicBool::new(true),
        }
    }

    pub fn categories(&self) -> Vec<Category> {
        self.categories.get()
    }

    pub fn selected_category(&self) -> Option<Category> {
        self.selected.get()
    }

    pub fn channels(&self) -> Vec<LiveChannel> {
        self.channels.get()
    }

    pub fn current_channel(&self) -> Option<LiveChannel> {
        self.current.get()
    }

    pub fn subscribe_categories(&self) -> watch::Receiver<Vec<Category>> {
        self.categories.subscribe()
    }

    pub fn subscribe_channels(&self) -> watch::Receiver<Vec<LiveChannel>> {
        self.channels.subscribe()
    }

    pub fn subscribe_current(&self) -> watch::Receiver<Option<LiveChannel>> {
        self.current.subscribe()
    }

    pub fn names(&self) -> &NameCache {
        &self.names
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Stop publishing. Loads still in flight drop their results.
    pub fn shutdown(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            debug!("Channel session shut down");
        }
    }

    fn ordering(&self) -> MutexGuard<'_, Option<Vec<LiveChannel>>> {
        self.ordering.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read live categories, normalize them and auto-select the first entry
    pub async fn load_categories(&self) {
        let provider = match self.cache.categories(ContentKind::Live) {
            Ok(categories) => categories,
            Err(e) => {
                warn!("Failed to load live categories: {}", e);
                Vec::new()
            }
        };
        let blocked: HashSet<String> = self
            .settings
            .blocked_categories(ContentKind::Live)
            .into_iter()
            .collect();
        let list = build_category_list(provider, &blocked);

        if !self.is_alive() {
            debug!("Discarding category load after shutdown");
            return;
        }
        debug!(count = list.len(), "Publishing categories");
        self.categories.set(list.clone());

        if let Some(first) = list.into_iter().next() {
            self.select_category(first).await;
        }
    }

    /// Make `category` active and recompute its channel list. Never plays.
    pub async fn select_category(&self, category: Category) {
        if !self.is_alive() {
            return;
        }
        let selection = self.selection.fetch_add(1, Ordering::SeqCst) + 1;
        self.selected.set(Some(category.clone()));
        self.refilter(&category, selection).await;
    }

    async fn refilter(&self, category: &Category, selection: u64) {
        let filtered = self.filter_channels(category);

        if !self.is_alive() || self.selection.load(Ordering::SeqCst) != selection {
            debug!(category = %category.category_id, "Discarding superseded channel list");
            return;
        }

        match filtered {
            Ok(channels) => {
                debug!(category = %category.category_id, count = channels.len(), "Channels filtered");
                *self.ordering() = Some(channels.clone());
                self.channels.set(channels);
            }
            Err(e) => {
                warn!(category = %category.category_id, "Channel filtering failed: {}", e);
                *self.ordering() = Some(Vec::new());
                self.channels.set(Vec::new());
            }
        }
    }

    fn filter_channels(&self, category: &Category) -> Result<Vec<LiveChannel>> {
        let channels = match category.category_id.as_str() {
            ALL_CATEGORY_ID => {
                let mut channels = distinct_by_content_id(self.cache.live_channels()?);
                self.names.sort_naturally(&mut channels);
                channels
            }
            FAVORITES_CATEGORY_ID => {
                let favorites: HashSet<i64> = self
                    .load_favorites()
                    .into_iter()
                    .map(|mark| mark.content_id)
                    .collect();
                let channels = self
                    .cache
                    .live_channels()?
                    .into_iter()
                    .filter(|channel| favorites.contains(&channel.content_id))
                    .collect();
                distinct_by_content_id(channels)
            }
            RECENTS_CATEGORY_ID => {
                let mut by_id: HashMap<i64, LiveChannel> = HashMap::new();
                for channel in self.cache.live_channels()? {
                    by_id.entry(channel.content_id).or_insert(channel);
                }
                self.load_recents()
                    .into_iter()
                    .filter_map(|mark| by_id.remove(&mark.content_id))
                    .collect()
            }
            id => {
                let mut channels = self.cache.live_channels_in_category(id)?;
                self.names.sort_naturally(&mut channels);
                channels
            }
        };

        let parental = self.settings.parental_control_enabled();
        let blocked = self.settings.blocked_categories(ContentKind::Live);
        Ok(channels
            .into_iter()
            .filter(|channel| !(parental && channel.is_adult))
            .filter(|channel| !blocked.contains(&channel.category_id))
            .collect())
    }

    fn load_favorites(&self) -> Vec<FavoriteMark> {
        self.cache.store().favorites().unwrap_or_else(|e| {
            warn!("Failed to load favorites: {}", e);
            Vec::new()
        })
    }

    fn load_recents(&self) -> Vec<RecentMark> {
        self.cache.store().recents().unwrap_or_else(|e| {
            warn!("Failed to load recents: {}", e);
            Vec::new()
        })
    }

    /// Play `channel` from the start and record it as recently watched
    pub async fn play_channel(&self, channel: &LiveChannel) -> Result<()> {
        let profile = self
            .cache
            .store()
            .profile()?
            .ok_or_else(|| CatalogError::NotFound("user profile".to_string()))?;

        self.current.set(Some(channel.clone()));
        let url = channel.stream_url(&profile);
        info!(content_id = channel.content_id, "[PLAY] {}", channel.name);
        if let Err(e) = self.engine.play_media(&url, SessionKind::Live, true).await {
            warn!(content_id = channel.content_id, "Playback failed to start: {}", e);
            self.current.set(None);
            return Err(e);
        }

        self.record_recent(channel.content_id);
        Ok(())
    }

    fn record_recent(&self, content_id: i64) {
        let store = self.cache.store();
        let mark = RecentMark {
            content_id,
            timestamp_millis: self.clock.now_millis(),
        };
        let limit = self.settings.recents_limit();

        let result = store
            .delete_recent(content_id)
            .and_then(|_| store.insert_recent(&mark))
            .and_then(|_| store.trim_recents(limit));
        match result {
            Ok(trimmed) if trimmed > 0 => debug!(trimmed, "Recents trimmed to {}", limit),
            Ok(_) => {}
            Err(e) => warn!(content_id, "Failed to record recent: {}", e),
        }
    }

    /// Play the entry after the current one. `None` when there is none.
    pub async fn play_next_channel(&self) -> Result<Option<LiveChannel>> {
        self.play_adjacent(1).await
    }

    pub async fn play_previous_channel(&self) -> Result<Option<LiveChannel>> {
        self.play_adjacent(-1).await
    }

    async fn play_adjacent(&self, step: isize) -> Result<Option<LiveChannel>> {
        let Some(target) = self.adjacent_channel(step) else {
            debug!(step, "No adjacent channel");
            return Ok(None);
        };
        self.play_channel(&target).await?;
        Ok(Some(target))
    }

    /// Neighbour of the current channel in the last ordering snapshot
    pub fn adjacent_channel(&self, step: isize) -> Option<LiveChannel> {
        let current = self.current.get()?;
        let snapshot = self
            .ordering()
            .clone()
            .unwrap_or_else(|| self.channels.get());

        let position = snapshot
            .iter()
            .position(|channel| channel.content_id == current.content_id)?;
        let target = position.checked_add_signed(step)?;
        snapshot.get(target).cloned()
    }

    /// Flip favorite membership; returns the new state
    pub async fn toggle_favorite(&self, channel: &LiveChannel) -> Result<bool> {
        let store = self.cache.store();
        let favorited = if store.is_favorite(channel.content_id)? {
            store.remove_favorite(channel.content_id)?;
            false
        } else {
            store.add_favorite(&FavoriteMark {
                content_id: channel.content_id,
                timestamp_millis: self.clock.now_millis(),
            })?;
            true
        };
        debug!(content_id = channel.content_id, favorited, "Favorite toggled");

        if let Some(selected) = self.selected.get() {
            if selected.category_id == FAVORITES_CATEGORY_ID {
                let selection = self.selection.load(Ordering::SeqCst);
                self.refilter(&selected, selection).await;
            }
        }
        Ok(favorited)
    }

    /// Stop playback and clear the now-playing pointer
    pub async fn stop(&self) -> Result<()> {
        self.engine.stop_playback().await?;
        self.current.set(None);
        Ok(())
    }
}

#[cfg(test)]
#[path = "channels_tests.rs"]
mod tests;
