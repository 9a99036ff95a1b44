//! SQLite catalog store
//!
//! Durable storage for live channels, on-demand titles, series and
//! categories, plus the cache metadata, favorites, recents and profile
//! tables. Catalog rows are addressed by `(content_id, category_id)`;
//! de-duplication by `content_id` is left to callers that need it.

mod schema;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Params};
use tracing::debug;

use crate::error::Result;
use crate::models::{
    CacheMetadata, Category, ContentKind, FavoriteMark, LiveChannel, RecentMark, SeriesTitle,
    UserProfile, VodTitle,
};
use schema::*;

/// Database wrapper with thread-safe access
pub struct CatalogStore {
    conn: Mutex<Connection>,
}

impl CatalogStore {
    /// Open or create the database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        debug!("Opened catalog store at {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run raw SQL against the store, for tests that need a broken table
    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<()> {
        self.conn().execute_batch(sql)?;
        Ok(())
    }

    fn query_rows<T, P: Params>(
        &self,
        sql: &str,
        params: P,
        map: fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, map)?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    fn count(&self, table: &str) -> Result<i64> {
        let conn = self.conn();
        let count = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count)
    }

    // ---- live channels ----

    /// Insert rows; a row with the same (content_id, category_id) is replaced
    pub fn insert_live_channels(&self, channels: &[LiveChannel]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO live_channels ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                LIVE_COLUMNS
            ))?;
            for c in channels {
                stmt.execute(params![
                    c.content_id,
                    c.category_id,
                    c.name,
                    c.num,
                    c.stream_icon,
                    c.epg_channel_id,
                    c.tv_archive,
                    c.tv_archive_duration,
                    c.is_adult,
                    c.container_extension,
                    c.added,
                ])?;
            }
        }
        tx.commit()?;
        Ok(channels.len())
    }

    pub fn delete_all_live_channels(&self) -> Result<usize> {
        Ok(self.conn().execute("DELETE FROM live_channels", [])?)
    }

    /// Every stored row, in insertion order
    pub fn live_channels(&self) -> Result<Vec<LiveChannel>> {
        self.query_rows(
            &format!("SELECT {} FROM live_channels ORDER BY rowid", LIVE_COLUMNS),
            [],
            LiveChannel::from_row,
        )
    }

    pub fn live_channels_in_category(&self, category_id: &str) -> Result<Vec<LiveChannel>> {
        self.query_rows(
            &format!(
                "SELECT {} FROM live_channels WHERE category_id = ?1 ORDER BY rowid",
                LIVE_COLUMNS
            ),
            params![category_id],
            LiveChannel::from_row,
        )
    }

    /// All listings of one stream, one per category
    pub fn live_channel_rows(&self, content_id: i64) -> Result<Vec<LiveChannel>> {
        self.query_rows(
            &format!(
                "SELECT {} FROM live_channels WHERE content_id = ?1 ORDER BY rowid",
                LIVE_COLUMNS
            ),
            params![content_id],
            LiveChannel::from_row,
        )
    }

    pub fn count_live_channels(&self) -> Result<i64> {
        self.count("live_channels")
    }

    // ---- on-demand titles ----

    pub fn insert_vod_titles(&self, titles: &[VodTitle]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO vod_titles ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                VOD_COLUMNS
            ))?;
            for t in titles {
                stmt.execute(params![
                    t.content_id,
                    t.category_id,
                    t.name,
                    t.stream_icon,
                    t.rating,
                    t.is_adult,
                    t.container_extension,
                    t.added,
                ])?;
            }
        }
        tx.commit()?;
        Ok(titles.len())
    }

    pub fn delete_all_vod_titles(&self) -> Result<usize> {
        Ok(self.conn().execute("DELETE FROM vod_titles", [])?)
    }

    pub fn vod_titles(&self) -> Result<Vec<VodTitle>> {
        self.query_rows(
            &format!("SELECT {} FROM vod_titles ORDER BY rowid", VOD_COLUMNS),
            [],
            VodTitle::from_row,
        )
    }

    pub fn vod_titles_in_category(&self, category_id: &str) -> Result<Vec<VodTitle>> {
        self.query_rows(
            &format!(
                "SELECT {} FROM vod_titles WHERE category_id = ?1 ORDER BY rowid",
                VOD_COLUMNS
            ),
            params![category_id],
            VodTitle::from_row,
        )
    }

    pub fn count_vod_titles(&self) -> Result<i64> {
        self.count("vod_titles")
    }

    // ---- series ----

    pub fn insert_series(&self, series: &[SeriesTitle]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO series_titles ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                SERIES_COLUMNS
            ))?;
            for s in series {
                stmt.execute(params![
                    s.content_id,
                    s.category_id,
                    s.name,
                    s.cover,
                    s.plot,
                    s.cast,
                    s.genre,
                    s.rating,
                    s.release_date,
                    s.last_modified,
                ])?;
            }
        }
        tx.commit()?;
        Ok(series.len())
    }

    pub fn delete_all_series(&self) -> Result<usize> {
        Ok(self.conn().execute("DELETE FROM series_titles", [])?)
    }

    pub fn series(&self) -> Result<Vec<SeriesTitle>> {
        self.query_rows(
            &format!("SELECT {} FROM series_titles ORDER BY rowid", SERIES_COLUMNS),
            [],
            SeriesTitle::from_row,
        )
    }

    pub fn series_in_category(&self, category_id: &str) -> Result<Vec<SeriesTitle>> {
        self.query_rows(
            &format!(
                "SELECT {} FROM series_titles WHERE category_id = ?1 ORDER BY rowid",
                SERIES_COLUMNS
            ),
            params![category_id],
            SeriesTitle::from_row,
        )
    }

    pub fn count_series(&self) -> Result<i64> {
        self.count("series_titles")
    }

    // ---- categories ----

    pub fn insert_categories(&self, categories: &[Category]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO categories ({}) VALUES (?1, ?2, ?3, ?4, ?5)",
                CATEGORY_COLUMNS
            ))?;
            for c in categories {
                stmt.execute(params![
                    c.category_id,
                    c.kind.as_str(),
                    c.category_name,
                    c.parent_id,
                    c.order_index,
                ])?;
            }
        }
        tx.commit()?;
        Ok(categories.len())
    }

    pub fn delete_categories(&self, kind: ContentKind) -> Result<usize> {
        Ok(self
            .conn()
            .execute("DELETE FROM categories WHERE kind = ?1", params![kind.as_str()])?)
    }

    pub fn delete_all_categories(&self) -> Result<usize> {
        Ok(self.conn().execute("DELETE FROM categories", [])?)
    }

    pub fn categories(&self, kind: ContentKind) -> Result<Vec<Category>> {
        self.query_rows(
            &format!(
                "SELECT {} FROM categories WHERE kind = ?1 ORDER BY order_index, rowid",
                CATEGORY_COLUMNS
            ),
            params![kind.as_str()],
            Category::from_row,
        )
    }

    pub fn count_categories(&self) -> Result<i64> {
        self.count("categories")
    }

    // ---- cache metadata ----

    pub fn cache_metadata(&self, scope_key: &str) -> Result<Option<CacheMetadata>> {
        let conn = self.conn();
        let metadata = conn
            .query_row(
                "SELECT scope_key, last_updated FROM cache_metadata WHERE scope_key = ?1",
                params![scope_key],
                CacheMetadata::from_row,
            )
            .optional()?;
        Ok(metadata)
    }

    pub fn set_cache_metadata(&self, metadata: &CacheMetadata) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO cache_metadata (scope_key, last_updated) VALUES (?1, ?2)",
            params![metadata.scope_key, metadata.last_updated_millis],
        )?;
        Ok(())
    }

    pub fn delete_cache_metadata(&self, scope_key: &str) -> Result<()> {
        self.conn()
            .execute("DELETE FROM cache_metadata WHERE scope_key = ?1", params![scope_key])?;
        Ok(())
    }

    // ---- favorites ----

    pub fn add_favorite(&self, mark: &FavoriteMark) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO favorites (content_id, timestamp) VALUES (?1, ?2)",
            params![mark.content_id, mark.timestamp_millis],
        )?;
        Ok(())
    }

    pub fn remove_favorite(&self, content_id: i64) -> Result<()> {
        self.conn()
            .execute("DELETE FROM favorites WHERE content_id = ?1", params![content_id])?;
        Ok(())
    }

    pub fn is_favorite(&self, content_id: i64) -> Result<bool> {
        let conn = self.conn();
        let found = conn
            .query_row(
                "SELECT 1 FROM favorites WHERE content_id = ?1",
                params![content_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn favorites(&self) -> Result<Vec<FavoriteMark>> {
        self.query_rows(
            "SELECT content_id, timestamp FROM favorites ORDER BY timestamp, seq",
            [],
            FavoriteMark::from_row,
        )
    }

    // ---- recents ----

    pub fn insert_recent(&self, mark: &RecentMark) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO recents (content_id, timestamp) VALUES (?1, ?2)",
            params![mark.content_id, mark.timestamp_millis],
        )?;
        Ok(())
    }

    pub fn delete_recent(&self, content_id: i64) -> Result<()> {
        self.conn()
            .execute("DELETE FROM recents WHERE content_id = ?1", params![content_id])?;
        Ok(())
    }

    /// Keep only the `limit` most recent marks
    pub fn trim_recents(&self, limit: usize) -> Result<usize> {
        let removed = self.conn().execute(
            "DELETE FROM recents WHERE content_id NOT IN (
                 SELECT content_id FROM recents ORDER BY timestamp DESC, seq DESC LIMIT ?1
             )",
            params![limit as i64],
        )?;
        Ok(removed)
    }

    /// Most recent first
    pub fn recents(&self) -> Result<Vec<RecentMark>> {
        self.query_rows(
            "SELECT content_id, timestamp FROM recents ORDER BY timestamp DESC, seq DESC",
            [],
            RecentMark::from_row,
        )
    }

    // ---- profile ----

    pub fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        self.conn().execute(
            &format!(
                "INSERT OR REPLACE INTO user_profile (id, {}) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                PROFILE_COLUMNS
            ),
            params![
                profile.username,
                profile.password,
                profile.server_url,
                profile.status,
                profile.expiry,
                profile.max_connections,
                profile.active_connections,
                profile.is_trial,
                profile.created_at_millis,
            ],
        )?;
        Ok(())
    }

    pub fn profile(&self) -> Result<Option<UserProfile>> {
        let conn = self.conn();
        let profile = conn
            .query_row(
                &format!("SELECT {} FROM user_profile WHERE id = 1", PROFILE_COLUMNS),
                [],
                UserProfile::from_row,
            )
            .optional()?;
        Ok(profile)
    }

    pub fn delete_profile(&self) -> Result<()> {
        self.conn().execute("DELETE FROM user_profile", [])?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
