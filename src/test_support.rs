//! In-test fakes for the external collaborators

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::api::{
    AccountInfo, CatalogProvider, CategoryDto, SeriesDto, StreamDto, UserInfoDto, VodDto,
};
use crate::error::{CatalogError, Result};
use crate::models::{ContentKind, Credentials, LiveChannel};
use crate::player::{PlaybackEngine, PlaybackState, SessionKind};

pub fn stream(id: i64, name: &str, category_id: &str) -> StreamDto {
    StreamDto {
        num: id,
        name: name.to_string(),
        stream_id: id,
        stream_icon: None,
        epg_channel_id: None,
        added: None,
        category_id: Some(category_id.to_string()),
        category_ids: Vec::new(),
        tv_archive: false,
        tv_archive_duration: 0,
        is_adult: false,
        container_extension: None,
    }
}

pub fn vod(id: i64, name: &str, category_id: &str) -> VodDto {
    VodDto {
        name: name.to_string(),
        stream_id: id,
        stream_icon: None,
        rating: None,
        added: None,
        category_id: Some(category_id.to_string()),
        category_ids: Vec::new(),
        is_adult: false,
        container_extension: Some("mp4".to_string()),
    }
}

pub fn series(id: i64, name: &str, category_id: &str) -> SeriesDto {
    SeriesDto {
        series_id: id,
        name: name.to_string(),
        cover: None,
        plot: None,
        cast: None,
        genre: None,
        rating: None,
        release_date: None,
        last_modified: None,
        category_id: Some(category_id.to_string()),
        category_ids: Vec::new(),
    }
}

pub fn category(id: &str, name: &str) -> CategoryDto {
    CategoryDto {
        category_id: id.to_string(),
        category_name: name.to_string(),
        parent_id: 0,
    }
}

pub fn live_channel(content_id: i64, name: &str, category_id: &str) -> LiveChannel {
    stream(content_id, name, category_id)
        .into_rows()
        .remove(0)
}

pub fn credentials() -> Credentials {
    Credentials::new("http://provider.test", "user", "pass")
}

/// Provider answering from canned payloads; `None` answers HTTP 503
#[derive(Default)]
pub struct FakeProvider {
    pub live: Mutex<Option<Vec<StreamDto>>>,
    pub vod: Mutex<Option<Vec<VodDto>>>,
    pub series: Mutex<Option<Vec<SeriesDto>>>,
    pub categories: Mutex<HashMap<ContentKind, Vec<CategoryDto>>>,
    pub account: Mutex<Option<AccountInfo>>,
    pub calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_live(self, streams: Vec<StreamDto>) -> Self {
        *self.live.lock().unwrap() = Some(streams);
        self
    }

    pub fn with_vod(self, titles: Vec<VodDto>) -> Self {
        *self.vod.lock().unwrap() = Some(titles);
        self
    }

    pub fn with_series(self, series: Vec<SeriesDto>) -> Self {
        *self.series.lock().unwrap() = Some(series);
        self
    }

    pub fn with_categories(self, kind: ContentKind, categories: Vec<CategoryDto>) -> Self {
        self.categories.lock().unwrap().insert(kind, categories);
        self
    }

    pub fn with_account(self, status: &str) -> Self {
        *self.account.lock().unwrap() = Some(AccountInfo {
            user_info: UserInfoDto {
                username: "user".to_string(),
                status: status.to_string(),
                exp_date: Some(1_900_000_000),
                max_connections: Some(2),
                active_cons: 0,
                is_trial: false,
            },
            ..AccountInfo::default()
        });
        self
    }

    pub fn fail_live(&self) {
        *self.live.lock().unwrap() = None;
    }
}

fn unavailable<T>() -> Result<T> {
    Err(CatalogError::Status(503))
}

#[async_trait]
impl CatalogProvider for FakeProvider {
    async fn account_info(&self, _credentials: &Credentials) -> Result<AccountInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.account.lock().unwrap().clone() {
            Some(info) => Ok(info),
            None => Err(CatalogError::Status(401)),
        }
    }

    async fn live_streams(&self, _credentials: &Credentials) -> Result<Vec<StreamDto>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.live.lock().unwrap().clone().map_or_else(unavailable, Ok)
    }

    async fn vod_streams(&self, _credentials: &Credentials) -> Result<Vec<VodDto>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.vod.lock().unwrap().clone().map_or_else(unavailable, Ok)
    }

    async fn series(&self, _credentials: &Credentials) -> Result<Vec<SeriesDto>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.series.lock().unwrap().clone().map_or_else(unavailable, Ok)
    }

    async fn categories(
        &self,
        _credentials: &Credentials,
        kind: ContentKind,
    ) -> Result<Vec<CategoryDto>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.categories
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .map_or_else(unavailable, Ok)
    }
}

/// Playback engine that records requests
pub struct FakeEngine {
    pub played: Mutex<Vec<(String, SessionKind, bool)>>,
    pub stopped: AtomicBool,
    /// Refuse every play request
    pub fail: AtomicBool,
    state: watch::Sender<PlaybackState>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        let (state, _) = watch::channel(PlaybackState::Idle);
        Arc::new(Self {
            played: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
            fail: AtomicBool::new(false),
            state,
        })
    }

    pub fn last_url(&self) -> Option<String> {
        self.played.lock().unwrap().last().map(|(url, _, _)| url.clone())
    }
}

#[async_trait]
impl PlaybackEngine for FakeEngine {
    async fn play_media(&self, url: &str, kind: SessionKind, force_prepare: bool) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            let message = "player unavailable".to_string();
            self.state.send_replace(PlaybackState::Error(message.clone()));
            return Err(CatalogError::Player(message));
        }
        self.played
            .lock()
            .unwrap()
            .push((url.to_string(), kind, force_prepare));
        self.state.send_replace(PlaybackState::Playing);
        Ok(())
    }

    async fn stop_playback(&self) -> Result<()> {
        self.stopped.store(true, Ordering::SeqCst);
        self.state.send_replace(PlaybackState::Idle);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }
}
