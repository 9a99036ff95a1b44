//! Table layout and row mapping for the catalog store

use rusqlite::types::Type;
use rusqlite::Row;

use crate::models::{
    CacheMetadata, Category, ContentKind, FavoriteMark, LiveChannel, RecentMark, SeriesTitle,
    UserProfile, VodTitle,
};

/// Catalog rows are keyed by (content_id, category_id): one stream may be
/// listed under several categories and each listing is its own row.
pub(crate) const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS live_channels (
        content_id INTEGER NOT NULL,
        category_id TEXT NOT NULL,
        name TEXT NOT NULL,
        num INTEGER NOT NULL DEFAULT 0,
        stream_icon TEXT,
        epg_channel_id TEXT,
        tv_archive INTEGER NOT NULL DEFAULT 0,
        tv_archive_duration INTEGER NOT NULL DEFAULT 0,
        is_adult INTEGER NOT NULL DEFAULT 0,
        container_extension TEXT,
        added TEXT,
        PRIMARY KEY (content_id, category_id)
    );

    CREATE TABLE IF NOT EXISTS vod_titles (
        content_id INTEGER NOT NULL,
        category_id TEXT NOT NULL,
        name TEXT NOT NULL,
        stream_icon TEXT,
        rating TEXT,
        is_adult INTEGER NOT NULL DEFAULT 0,
        container_extension TEXT,
        added TEXT,
        PRIMARY KEY (content_id, category_id)
    );

    CREATE TABLE IF NOT EXISTS series_titles (
        content_id INTEGER NOT NULL,
        category_id TEXT NOT NULL,
        name TEXT NOT NULL,
        cover TEXT,
        plot TEXT,
        cast_names TEXT,
        genre TEXT,
        rating TEXT,
        release_date TEXT,
        last_modified TEXT,
        PRIMARY KEY (content_id, category_id)
    );

    CREATE TABLE IF NOT EXISTS categories (
        category_id TEXT NOT NULL,
        kind TEXT NOT NULL,
        category_name TEXT NOT NULL,
        parent_id INTEGER NOT NULL DEFAULT 0,
        order_index INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (category_id, kind)
    );

    CREATE TABLE IF NOT EXISTS cache_metadata (
        scope_key TEXT PRIMARY KEY,
        last_updated INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS favorites (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        content_id INTEGER NOT NULL UNIQUE,
        timestamp INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS recents (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        content_id INTEGER NOT NULL UNIQUE,
        timestamp INTEGER NOT NULL
    );

    -- At most one account
    CREATE TABLE IF NOT EXISTS user_profile (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        username TEXT NOT NULL,
        password TEXT NOT NULL,
        server_url TEXT NOT NULL,
        status TEXT NOT NULL,
        expiry INTEGER,
        max_connections INTEGER,
        active_connections INTEGER NOT NULL DEFAULT 0,
        is_trial INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_live_channels_category ON live_channels(category_id);
    CREATE INDEX IF NOT EXISTS idx_vod_titles_category ON vod_titles(category_id);
    CREATE INDEX IF NOT EXISTS idx_series_titles_category ON series_titles(category_id);
"#;

pub(crate) const LIVE_COLUMNS: &str = "content_id, category_id, name, num, stream_icon, \
     epg_channel_id, tv_archive, tv_archive_duration, is_adult, container_extension, added";

pub(crate) const VOD_COLUMNS: &str = "content_id, category_id, name, stream_icon, rating, \
     is_adult, container_extension, added";

pub(crate) const SERIES_COLUMNS: &str = "content_id, category_id, name, cover, plot, \
     cast_names, genre, rating, release_date, last_modified";

pub(crate) const CATEGORY_COLUMNS: &str = "category_id, kind, category_name, parent_id, order_index";

pub(crate) const PROFILE_COLUMNS: &str = "username, password, server_url, status, expiry, \
     max_connections, active_connections, is_trial, created_at";

impl LiveChannel {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            content_id: row.get(0)?,
            category_id: row.get(1)?,
            name: row.get(2)?,
            num: row.get(3)?,
            stream_icon: row.get(4)?,
            epg_channel_id: row.get(5)?,
            tv_archive: row.get(6)?,
            tv_archive_duration: row.get(7)?,
            is_adult: row.get(8)?,
            container_extension: row.get(9)?,
            added: row.get(10)?,
        })
    }
}

impl VodTitle {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            content_id: row.get(0)?,
            category_id: row.get(1)?,
            name: row.get(2)?,
            stream_icon: row.get(3)?,
            rating: row.get(4)?,
            is_adult: row.get(5)?,
            container_extension: row.get(6)?,
            added: row.get(7)?,
        })
    }
}

impl SeriesTitle {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            content_id: row.get(0)?,
            category_id: row.get(1)?,
            name: row.get(2)?,
            cover: row.get(3)?,
            plot: row.get(4)?,
            cast: row.get(5)?,
            genre: row.get(6)?,
            rating: row.get(7)?,
            release_date: row.get(8)?,
            last_modified: row.get(9)?,
        })
    }
}

impl Category {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let kind: String = row.get(1)?;
        let kind = kind
            .parse::<ContentKind>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, e.into()))?;

        Ok(Self {
            category_id: row.get(0)?,
            kind,
            category_name: row.get(2)?,
            parent_id: row.get(3)?,
            order_index: row.get(4)?,
        })
    }
}

impl CacheMetadata {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            scope_key: row.get(0)?,
            last_updated_millis: row.get(1)?,
        })
    }
}

impl FavoriteMark {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            content_id: row.get(0)?,
            timestamp_millis: row.get(1)?,
        })
    }
}

impl RecentMark {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            content_id: row.get(0)?,
            timestamp_millis: row.get(1)?,
        })
    }
}

impl UserProfile {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            username: row.get(0)?,
            password: row.get(1)?,
            server_url: row.get(2)?,
            status: row.get(3)?,
            expiry: row.get(4)?,
            max_connections: row.get(5)?,
            active_connections: row.get(6)?,
            is_trial: row.get(7)?,
            created_at_millis: row.get(8)?,
        })
    }
}
