//! Catalog cache manager
//!
//! Decides whether the stored catalog is fresh and mirrors the provider's
//! full snapshot into the store. Each table is replaced wholesale (delete
//! then bulk insert) because the provider has no delta endpoint.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::api::CatalogProvider;
use crate::clock::Clock;
use crate::error::Result;
use crate::models::{
    CacheMetadata, Category, ContentKind, Credentials, LiveChannel, SeriesTitle, VodTitle,
    SCOPE_ALL_CONTENT,
};
use crate::store::CatalogStore;

/// How long a successful refresh stays valid
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(24 * 3600);

/// What to do with the cache at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupDecision {
    /// Fresh: serve from the store
    UseCache,
    /// Stale but present: serve now, refresh in the background
    UseCacheAndRefresh,
    /// Nothing stored: block on a refresh
    MustRefresh,
}

/// One replaceable table of the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogTable {
    LiveChannels,
    VodTitles,
    Series,
    Categories(ContentKind),
}

/// Outcome of one `refresh_all` pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub refreshed: Vec<CatalogTable>,
    /// Tables whose fetch failed and were left untouched
    pub skipped: Vec<CatalogTable>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn all_failed(&self) -> bool {
        self.refreshed.is_empty() && !self.skipped.is_empty()
    }

    fn record(&mut self, table: CatalogTable, refreshed: bool) {
        if refreshed {
            self.refreshed.push(table);
        } else {
            self.skipped.push(table);
        }
    }
}

/// Rows of one content kind as returned by `read_by_kind`
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogItems {
    Live(Vec<LiveChannel>),
    Vod(Vec<VodTitle>),
    Series(Vec<SeriesTitle>),
}

impl CatalogItems {
    pub fn len(&self) -> usize {
        match self {
            CatalogItems::Live(items) => items.len(),
            CatalogItems::Vod(items) => items.len(),
            CatalogItems::Series(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct CatalogCache {
    store: Arc<CatalogStore>,
    provider: Arc<dyn CatalogProvider>,
    clock: Arc<dyn Clock>,
    freshness_window: Duration,
}

impl CatalogCache {
    pub fn new(
        store: Arc<CatalogStore>,
        provider: Arc<dyn CatalogProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            provider,
            clock,
            freshness_window: FRESHNESS_WINDOW,
        }
    }

    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }

    pub fn store(&self) -> &Arc<CatalogStore> {
        &self.store
    }

    pub fn provider(&self) -> &Arc<dyn CatalogProvider> {
        &self.provider
    }

    /// True iff the all-content scope was refreshed within the freshness window
    pub fn is_cache_fresh(&self) -> bool {
        match self.store.cache_metadata(SCOPE_ALL_CONTENT) {
            Ok(Some(metadata)) => {
                let age = self.clock.now_millis() - metadata.last_updated_millis;
                age < self.freshness_window.as_millis() as i64
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Failed to read cache metadata: {}", e);
                false
            }
        }
    }

    /// True iff any catalog table has rows, regardless of freshness
    pub fn has_any_cached_content(&self) -> bool {
        let counts = [
            self.store.count_live_channels(),
            self.store.count_vod_titles(),
            self.store.count_series(),
        ];
        counts.into_iter().any(|count| match count {
            Ok(n) => n > 0,
            Err(e) => {
                warn!("Failed to count cached rows: {}", e);
                false
            }
        })
    }

    pub fn startup_decision(&self) -> StartupDecision {
        if self.is_cache_fresh() {
            StartupDecision::UseCache
        } else if self.has_any_cached_content() {
            StartupDecision::UseCacheAndRefresh
        } else {
            StartupDecision::MustRefresh
        }
    }

    /// Replace every catalog table from the provider, then stamp freshness.
    ///
    /// A failed fetch leaves that table as it was and keeps the old stamp;
    /// store failures abort the whole pass.
    pub async fn refresh_all(&self, credentials: &Credentials) -> Result<RefreshReport> {
        let mut report = RefreshReport::default();
        info!(server = %credentials.server, "Refreshing catalog");

        let done = self.refresh_live(credentials).await?;
        report.record(CatalogTable::LiveChannels, done);
        let done = self.refresh_vod(credentials).await?;
        report.record(CatalogTable::VodTitles, done);
        let done = self.refresh_series(credentials).await?;
        report.record(CatalogTable::Series, done);
        for kind in ContentKind::ALL {
            let done = self.refresh_categories(credentials, kind).await?;
            report.record(CatalogTable::Categories(kind), done);
        }

        // Only a pass where every table was replaced counts as fresh
        if report.is_complete() {
            self.store.set_cache_metadata(&CacheMetadata {
                scope_key: SCOPE_ALL_CONTENT.to_string(),
                last_updated_millis: self.clock.now_millis(),
            })?;
        } else {
            warn!(skipped = report.skipped.len(), "Catalog refresh incomplete, freshness not updated");
        }

        info!(
            refreshed = report.refreshed.len(),
            skipped = report.skipped.len(),
            "Catalog refresh finished"
        );
        Ok(report)
    }

    async fn refresh_live(&self, credentials: &Credentials) -> Result<bool> {
        let streams = match self.provider.live_streams(credentials).await {
            Ok(streams) => streams,
            Err(e) => {
                warn!(kind = "live", "Fetch failed, keeping cached rows: {}", e);
                return Ok(false);
            }
        };
        let rows: Vec<LiveChannel> = streams.into_iter().flat_map(|s| s.into_rows()).collect();

        self.store.delete_all_live_channels()?;
        let count = self.store.insert_live_channels(&rows)?;
        debug!(kind = "live", count, "Replaced cached rows");
        Ok(true)
    }

    async fn refresh_vod(&self, credentials: &Credentials) -> Result<bool> {
        let titles = match self.provider.vod_streams(credentials).await {
            Ok(titles) => titles,
            Err(e) => {
                warn!(kind = "vod", "Fetch failed, keeping cached rows: {}", e);
                return Ok(false);
            }
        };
        let rows: Vec<VodTitle> = titles.into_iter().flat_map(|t| t.into_rows()).collect();

        self.store.delete_all_vod_titles()?;
        let count = self.store.insert_vod_titles(&rows)?;
        debug!(kind = "vod", count, "Replaced cached rows");
        Ok(true)
    }

    async fn refresh_series(&self, credentials: &Credentials) -> Result<bool> {
        let series = match self.provider.series(credentials).await {
            Ok(series) => series,
            Err(e) => {
                warn!(kind = "series", "Fetch failed, keeping cached rows: {}", e);
                return Ok(false);
            }
        };
        let rows: Vec<SeriesTitle> = series.into_iter().flat_map(|s| s.into_rows()).collect();

        self.store.delete_all_series()?;
        let count = self.store.insert_series(&rows)?;
        debug!(kind = "series", count, "Replaced cached rows");
        Ok(true)
    }

    async fn refresh_categories(&self, credentials: &Credentials, kind: ContentKind) -> Result<bool> {
        let categories = match self.provider.categories(credentials, kind).await {
            Ok(categories) => categories,
            Err(e) => {
                warn!(kind = %kind, "Category fetch failed, keeping cached rows: {}", e);
                return Ok(false);
            }
        };
        let rows: Vec<Category> = categories
            .into_iter()
            .enumerate()
            .map(|(index, dto)| dto.into_category(kind, index as i64))
            .collect();

        self.store.delete_categories(kind)?;
        let count = self.store.insert_categories(&rows)?;
        debug!(kind = %kind, count, "Replaced cached categories");
        Ok(true)
    }

    /// Drop every catalog table and the freshness stamp. Favorites, recents
    /// and the profile are untouched.
    pub fn clear_all(&self) -> Result<()> {
        self.store.delete_all_live_channels()?;
        self.store.delete_all_vod_titles()?;
        self.store.delete_all_series()?;
        self.store.delete_all_categories()?;
        self.store.delete_cache_metadata(SCOPE_ALL_CONTENT)?;
        info!("Catalog cache cleared");
        Ok(())
    }

    pub fn read_by_kind(&self, kind: ContentKind, category_id: Option<&str>) -> Result<CatalogItems> {
        Ok(match (kind, category_id) {
            (ContentKind::Live, None) => CatalogItems::Live(self.store.live_channels()?),
            (ContentKind::Live, Some(id)) => {
                CatalogItems::Live(self.store.live_channels_in_category(id)?)
            }
            (ContentKind::Vod, None) => CatalogItems::Vod(self.store.vod_titles()?),
            (ContentKind::Vod, Some(id)) => CatalogItems::Vod(self.store.vod_titles_in_category(id)?),
            (ContentKind::Series, None) => CatalogItems::Series(self.store.series()?),
            (ContentKind::Series, Some(id)) => {
                CatalogItems::Series(self.store.series_in_category(id)?)
            }
        })
    }

    pub fn live_channels(&self) -> Result<Vec<LiveChannel>> {
        self.store.live_channels()
    }

    pub fn live_channels_in_category(&self, category_id: &str) -> Result<Vec<LiveChannel>> {
        self.store.live_channels_in_category(category_id)
    }

    pub fn categories(&self, kind: ContentKind) -> Result<Vec<Category>> {
        self.store.categories(kind)
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
