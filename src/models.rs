//! Data models for the catalog cache and session controllers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scope key of the single "all content" refresh scope
pub const SCOPE_ALL_CONTENT: &str = "all_content";

/// Ids of the synthetic categories injected ahead of provider categories
pub const ALL_CATEGORY_ID: &str = "__all__";
pub const FAVORITES_CATEGORY_ID: &str = "__favorites__";
pub const RECENTS_CATEGORY_ID: &str = "__recents__";

/// Content kind of a catalog row or category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Live,
    Vod,
    Series,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [ContentKind::Live, ContentKind::Vod, ContentKind::Series];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Live => "live",
            ContentKind::Vod => "vod",
            ContentKind::Series => "series",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(ContentKind::Live),
            "vod" | "movie" => Ok(ContentKind::Vod),
            "series" => Ok(ContentKind::Series),
            _ => Err(format!("Unknown content kind: {}", s)),
        }
    }
}

/// Live channel row. Stored once per (content_id, category_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveChannel {
    pub content_id: i64,
    pub name: String,
    pub category_id: String,
    pub num: i64,
    pub stream_icon: Option<String>,
    pub epg_channel_id: Option<String>,
    pub tv_archive: bool,
    pub tv_archive_duration: i64,
    pub is_adult: bool,
    pub container_extension: Option<String>,
    pub added: Option<String>,
}

impl LiveChannel {
    /// Build the playable URL for this channel on the profile's server
    pub fn stream_url(&self, profile: &UserProfile) -> String {
        let ext = self.container_extension.as_deref().unwrap_or("ts");
        format!(
            "{}/live/{}/{}/{}.{}",
            profile.server_url, profile.username, profile.password, self.content_id, ext
        )
    }
}

/// On-demand title row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VodTitle {
    pub content_id: i64,
    pub name: String,
    pub category_id: String,
    pub stream_icon: Option<String>,
    pub rating: Option<String>,
    pub is_adult: bool,
    pub container_extension: Option<String>,
    pub added: Option<String>,
}

impl VodTitle {
    pub fn stream_url(&self, profile: &UserProfile) -> String {
        let ext = self.container_extension.as_deref().unwrap_or("mp4");
        format!(
            "{}/movie/{}/{}/{}.{}",
            profile.server_url, profile.username, profile.password, self.content_id, ext
        )
    }
}

/// Series row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesTitle {
    pub content_id: i64,
    pub name: String,
    pub category_id: String,
    pub cover: Option<String>,
    pub plot: Option<String>,
    pub cast: Option<String>,
    pub genre: Option<String>,
    pub rating: Option<String>,
    pub release_date: Option<String>,
    pub last_modified: Option<String>,
}

/// Provider category, tagged with its content kind at storage time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub category_id: String,
    pub category_name: String,
    pub parent_id: i64,
    pub order_index: i64,
    pub kind: ContentKind,
}

impl Category {
    fn synthetic(id: &str, name: &str, order_index: i64) -> Self {
        Self {
            category_id: id.to_string(),
            category_name: name.to_string(),
            parent_id: 0,
            order_index,
            kind: ContentKind::Live,
        }
    }

    pub fn all() -> Self {
        Self::synthetic(ALL_CATEGORY_ID, "All channels", -3)
    }

    pub fn favorites() -> Self {
        Self::synthetic(FAVORITES_CATEGORY_ID, "Favorites", -2)
    }

    pub fn recents() -> Self {
        Self::synthetic(RECENTS_CATEGORY_ID, "Recently watched", -1)
    }

    /// True for all / favorites / recents
    pub fn is_synthetic(&self) -> bool {
        matches!(
            self.category_id.as_str(),
            ALL_CATEGORY_ID | FAVORITES_CATEGORY_ID | RECENTS_CATEGORY_ID
        )
    }
}

/// Freshness record for one refresh scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheMetadata {
    pub scope_key: String,
    pub last_updated_millis: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteMark {
    pub content_id: i64,
    pub timestamp_millis: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentMark {
    pub content_id: i64,
    pub timestamp_millis: i64,
}

/// Login input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub server: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(server: &str, username: &str, password: &str) -> Self {
        // Ensure server has protocol and no trailing slash
        let server = server.trim().trim_end_matches('/');
        let server = if server.starts_with("http://") || server.starts_with("https://") {
            server.to_string()
        } else {
            format!("http://{}", server)
        };

        Self {
            server,
            username: username.trim().to_string(),
            password: password.to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.server.is_empty() && !self.username.is_empty() && !self.password.is_empty()
    }
}

/// The single stored account
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserProfile {
    pub username: String,
    pub password: String,
    pub server_url: String,
    pub status: String,
    /// Unix seconds, None when unlimited
    pub expiry: Option<i64>,
    /// None when unlimited
    pub max_connections: Option<i64>,
    pub active_connections: i64,
    pub is_trial: bool,
    pub created_at_millis: i64,
}

impl UserProfile {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            server: self.server_url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }
}
