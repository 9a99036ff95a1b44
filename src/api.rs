//! Xtream Codes API client

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::error::{CatalogError, Result};
use crate::models::{Category, ContentKind, Credentials, LiveChannel, SeriesTitle, VodTitle};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Full live catalogs can be tens of megabytes
const MAX_BODY_BYTES: u64 = 256 * 1024 * 1024;

/// Remote catalog provider consumed by the cache manager
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Credential check. Success is judged by HTTP status only.
    async fn account_info(&self, credentials: &Credentials) -> Result<AccountInfo>;

    async fn live_streams(&self, credentials: &Credentials) -> Result<Vec<StreamDto>>;

    async fn vod_streams(&self, credentials: &Credentials) -> Result<Vec<VodDto>>;

    async fn series(&self, credentials: &Credentials) -> Result<Vec<SeriesDto>>;

    async fn categories(
        &self,
        credentials: &Credentials,
        kind: ContentKind,
    ) -> Result<Vec<CategoryDto>>;
}

// Providers disagree on whether ids and flags are strings or numbers

fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

fn lenient_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn de_i64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<i64, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(lenient_i64(&value).unwrap_or(0))
}

fn de_opt_i64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<i64>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(lenient_i64(&value))
}

fn de_bool<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<bool, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(lenient_i64(&value).map(|v| v != 0).unwrap_or(false))
}

fn de_opt_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(lenient_string(value))
}

fn de_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(lenient_string(value).unwrap_or_default())
}

fn de_id_list<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<String>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::Array(items) => items.into_iter().filter_map(lenient_string).collect(),
        _ => Vec::new(),
    })
}

/// Category ids a stream is listed under; `category_ids` wins over `category_id`
fn listed_categories(category_id: Option<String>, category_ids: Vec<String>) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for id in category_ids.into_iter().chain(category_id) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    if ids.is_empty() {
        ids.push(String::new());
    }
    ids
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryDto {
    #[serde(deserialize_with = "de_string")]
    pub category_id: String,
    #[serde(default, deserialize_with = "de_string")]
    pub category_name: String,
    #[serde(default, deserialize_with = "de_i64")]
    pub parent_id: i64,
}

impl CategoryDto {
    /// Tag with the content kind; order follows the provider listing
    pub fn into_category(self, kind: ContentKind, order_index: i64) -> Category {
        Category {
            category_id: self.category_id,
            category_name: self.category_name,
            parent_id: self.parent_id,
            order_index,
            kind,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamDto {
    #[serde(default, deserialize_with = "de_i64")]
    pub num: i64,
    #[serde(default, deserialize_with = "de_string")]
    pub name: String,
    #[serde(deserialize_with = "de_i64")]
    pub stream_id: i64,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub stream_icon: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub epg_channel_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub added: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "de_id_list")]
    pub category_ids: Vec<String>,
    #[serde(default, deserialize_with = "de_bool")]
    pub tv_archive: bool,
    #[serde(default, deserialize_with = "de_i64")]
    pub tv_archive_duration: i64,
    #[serde(default, deserialize_with = "de_bool")]
    pub is_adult: bool,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub container_extension: Option<String>,
}

impl StreamDto {
    /// One row per category the stream is listed under
    pub fn into_rows(self) -> Vec<LiveChannel> {
        listed_categories(self.category_id, self.category_ids)
            .into_iter()
            .map(|category_id| LiveChannel {
                content_id: self.stream_id,
                name: self.name.clone(),
                category_id,
                num: self.num,
                stream_icon: self.stream_icon.clone(),
                epg_channel_id: self.epg_channel_id.clone(),
                tv_archive: self.tv_archive,
                tv_archive_duration: self.tv_archive_duration,
                is_adult: self.is_adult,
                container_extension: self.container_extension.clone(),
                added: self.added.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VodDto {
    #[serde(default, deserialize_with = "de_string")]
    pub name: String,
    #[serde(deserialize_with = "de_i64")]
    pub stream_id: i64,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub stream_icon: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub rating: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub added: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "de_id_list")]
    pub category_ids: Vec<String>,
    #[serde(default, deserialize_with = "de_bool")]
    pub is_adult: bool,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub container_extension: Option<String>,
}

impl VodDto {
    pub fn into_rows(self) -> Vec<VodTitle> {
        listed_categories(self.category_id, self.category_ids)
            .into_iter()
            .map(|category_id| VodTitle {
                content_id: self.stream_id,
                name: self.name.clone(),
                category_id,
                stream_icon: self.stream_icon.clone(),
                rating: self.rating.clone(),
                is_adult: self.is_adult,
                container_extension: self.container_extension.clone(),
                added: self.added.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeriesDto {
    #[serde(deserialize_with = "de_i64")]
    pub series_id: i64,
    #[serde(default, deserialize_with = "de_string")]
    pub name: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub cover: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub plot: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub cast: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub genre: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub rating: Option<String>,
    #[serde(default, alias = "releaseDate", deserialize_with = "de_opt_string")]
    pub release_date: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub last_modified: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "de_id_list")]
    pub category_ids: Vec<String>,
}

impl SeriesDto {
    pub fn into_rows(self) -> Vec<SeriesTitle> {
        listed_categories(self.category_id, self.category_ids)
            .into_iter()
            .map(|category_id| SeriesTitle {
                content_id: self.series_id,
                name: self.name.clone(),
                category_id,
                cover: self.cover.clone(),
                plot: self.plot.clone(),
                cast: self.cast.clone(),
                genre: self.genre.clone(),
                rating: self.rating.clone(),
                release_date: self.release_date.clone(),
                last_modified: self.last_modified.clone(),
            })
            .collect()
    }
}

/// `user_info` block of the credential check response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInfoDto {
    #[serde(default, deserialize_with = "de_string")]
    pub username: String,
    #[serde(default, deserialize_with = "de_string")]
    pub status: String,
    #[serde(default, deserialize_with = "de_opt_i64")]
    pub exp_date: Option<i64>,
    #[serde(default, deserialize_with = "de_opt_i64")]
    pub max_connections: Option<i64>,
    #[serde(default, deserialize_with = "de_i64")]
    pub active_cons: i64,
    #[serde(default, deserialize_with = "de_bool")]
    pub is_trial: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerInfoDto {
    #[serde(default, deserialize_with = "de_string")]
    pub url: String,
    #[serde(default, deserialize_with = "de_string")]
    pub port: String,
    #[serde(default, deserialize_with = "de_string")]
    pub timezone: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub user_info: UserInfoDto,
    #[serde(default)]
    pub server_info: ServerInfoDto,
}

/// Blocking client bound to one account
pub struct XtreamClient {
    agent: ureq::Agent,
    server: String,
    username: String,
    password: String,
    user_agent: String,
}

impl XtreamClient {
    pub fn new(credentials: &Credentials) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(120)))
            .timeout_connect(Some(Duration::from_secs(30)))
            .build()
            .new_agent();

        Self {
            agent,
            server: credentials.server.clone(),
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    fn base_url(&self) -> String {
        format!(
            "{}/player_api.php?username={}&password={}",
            self.server, self.username, self.password
        )
    }

    fn api_url(&self, action: &str) -> String {
        format!("{}&action={}", self.base_url(), action)
    }

    fn make_request(&self, url: &str) -> Result<String> {
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json")
            .call()?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(CatalogError::Status(status));
        }

        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_string()?;
        Ok(body)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, action: &str) -> Result<T> {
        let body = self.make_request(&self.api_url(action))?;
        let parsed = serde_json::from_str(&body)?;
        Ok(parsed)
    }

    pub fn get_account_info(&self) -> Result<AccountInfo> {
        let body = self.make_request(&self.base_url())?;
        // A 200 with an unexpected body still counts as a successful check
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    pub fn get_live_streams(&self) -> Result<Vec<StreamDto>> {
        self.get_json("get_live_streams")
    }

    pub fn get_vod_streams(&self) -> Result<Vec<VodDto>> {
        self.get_json("get_vod_streams")
    }

    pub fn get_series(&self) -> Result<Vec<SeriesDto>> {
        self.get_json("get_series")
    }

    pub fn get_categories(&self, kind: ContentKind) -> Result<Vec<CategoryDto>> {
        let action = match kind {
            ContentKind::Live => "get_live_categories",
            ContentKind::Vod => "get_vod_categories",
            ContentKind::Series => "get_series_categories",
        };
        self.get_json(action)
    }
}

/// `CatalogProvider` over `XtreamClient`, running each call on the blocking pool
#[derive(Debug, Clone)]
pub struct XtreamProvider {
    user_agent: String,
}

impl Default for XtreamProvider {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl XtreamProvider {
    pub fn new(user_agent: &str) -> Self {
        if user_agent.is_empty() {
            return Self::default();
        }
        Self {
            user_agent: user_agent.to_string(),
        }
    }

    async fn run<T, F>(&self, credentials: &Credentials, call: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&XtreamClient) -> Result<T> + Send + 'static,
    {
        let client = XtreamClient::new(credentials).with_user_agent(&self.user_agent);
        tokio::task::spawn_blocking(move || call(&client)).await?
    }
}

#[async_trait]
impl CatalogProvider for XtreamProvider {
    async fn account_info(&self, credentials: &Credentials) -> Result<AccountInfo> {
        debug!(server = %credentials.server, "Checking credentials");
        self.run(credentials, |c| c.get_account_info()).await
    }

    async fn live_streams(&self, credentials: &Credentials) -> Result<Vec<StreamDto>> {
        self.run(credentials, |c| c.get_live_streams()).await
    }

    async fn vod_streams(&self, credentials: &Credentials) -> Result<Vec<VodDto>> {
        self.run(credentials, |c| c.get_vod_streams()).await
    }

    async fn series(&self, credentials: &Credentials) -> Result<Vec<SeriesDto>> {
        self.run(credentials, |c| c.get_series()).await
    }

    async fn categories(
        &self,
        credentials: &Credentials,
        kind: ContentKind,
    ) -> Result<Vec<CategoryDto>> {
        self.run(credentials, move |c| c.get_categories(kind)).await
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
