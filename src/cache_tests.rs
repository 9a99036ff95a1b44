//! Tests for the catalog cache manager

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use crate::cache::*;
    use crate::clock::ManualClock;
    use crate::models::{ContentKind, SCOPE_ALL_CONTENT};
    use crate::store::CatalogStore;
    use crate::test_support::*;

    const HOUR_MS: i64 = 3600 * 1000;

    fn full_provider() -> FakeProvider {
        FakeProvider::new()
            .with_live(vec![stream(1, "Channel 1", "10"), stream(2, "Channel 2", "10")])
            .with_vod(vec![vod(100, "Film", "20")])
            .with_series(vec![series(200, "Show", "30")])
            .with_categories(ContentKind::Live, vec![category("10", "News")])
            .with_categories(ContentKind::Vod, vec![category("20", "Movies")])
            .with_categories(ContentKind::Series, vec![category("30", "Drama")])
    }

    fn cache_with(provider: FakeProvider) -> (CatalogCache, Arc<ManualClock>, Arc<FakeProvider>) {
        let store = Arc::new(CatalogStore::open_in_memory().unwrap());
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let provider = Arc::new(provider);
        let cache = CatalogCache::new(store, provider.clone(), clock.clone());
        (cache, clock, provider)
    }

    #[tokio::test]
    async fn test_fresh_after_refresh_and_expires() {
        let (cache, clock, _) = cache_with(full_provider());
        assert!(!cache.is_cache_fresh());
        assert_eq!(cache.startup_decision(), StartupDecision::MustRefresh);

        let report = cache.refresh_all(&credentials()).await.unwrap();
        assert!(report.is_complete());
        assert!(cache.is_cache_fresh());
        assert_eq!(cache.startup_decision(), StartupDecision::UseCache);

        clock.advance(23 * HOUR_MS);
        assert!(cache.is_cache_fresh());

        clock.advance(HOUR_MS);
        assert!(!cache.is_cache_fresh());
        assert!(cache.has_any_cached_content());
        assert_eq!(cache.startup_decision(), StartupDecision::UseCacheAndRefresh);
    }

    #[tokio::test]
    async fn test_clear_all_resets_freshness() {
        let (cache, _, _) = cache_with(full_provider());
        cache.refresh_all(&credentials()).await.unwrap();
        cache
            .store()
            .add_favorite(&crate::models::FavoriteMark { content_id: 1, timestamp_millis: 1 })
            .unwrap();

        cache.clear_all().unwrap();
        assert!(!cache.is_cache_fresh());
        assert!(!cache.has_any_cached_content());
        assert!(cache.categories(ContentKind::Live).unwrap().is_empty());
        assert!(cache.store().cache_metadata(SCOPE_ALL_CONTENT).unwrap().is_none());
        // favorites survive
        assert!(cache.store().is_favorite(1).unwrap());
    }

    #[tokio::test]
    async fn test_refresh_replaces_wholesale() {
        let (cache, _, provider) = cache_with(full_provider());
        cache.refresh_all(&credentials()).await.unwrap();
        assert_eq!(cache.live_channels().unwrap().len(), 2);

        *provider.live.lock().unwrap() = Some(vec![stream(3, "Channel 3", "10")]);
        cache.refresh_all(&credentials()).await.unwrap();

        let ids: Vec<i64> = cache.live_channels().unwrap().iter().map(|c| c.content_id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[tokio::test]
    async fn test_failed_kind_keeps_old_rows() {
        let (cache, clock, provider) = cache_with(full_provider());
        cache.refresh_all(&credentials()).await.unwrap();

        provider.fail_live();
        *provider.vod.lock().unwrap() = Some(vec![vod(101, "Other film", "20")]);
        clock.advance(25 * HOUR_MS);

        let report = cache.refresh_all(&credentials()).await.unwrap();
        assert_eq!(report.skipped, vec![CatalogTable::LiveChannels]);
        assert!(!report.all_failed());
        assert_eq!(cache.live_channels().unwrap().len(), 2);
        match cache.read_by_kind(ContentKind::Vod, None).unwrap() {
            CatalogItems::Vod(titles) => assert_eq!(titles[0].content_id, 101),
            other => panic!("unexpected items: {:?}", other),
        }
        // a partial pass does not count as fresh
        assert!(!cache.is_cache_fresh());
        assert_eq!(cache.startup_decision(), StartupDecision::UseCacheAndRefresh);
    }

    #[tokio::test]
    async fn test_every_fetch_failing_is_reported() {
        let (cache, _, _) = cache_with(FakeProvider::new());
        let report = cache.refresh_all(&credentials()).await.unwrap();
        assert!(report.all_failed());
        assert_eq!(report.skipped.len(), 6);
        assert!(!cache.has_any_cached_content());
        assert!(!cache.is_cache_fresh());
        assert_eq!(cache.startup_decision(), StartupDecision::MustRefresh);
    }

    #[tokio::test]
    async fn test_failed_pass_keeps_previous_stamp() {
        let (cache, clock, provider) = cache_with(full_provider());
        cache.refresh_all(&credentials()).await.unwrap();
        let stamped = cache.store().cache_metadata(SCOPE_ALL_CONTENT).unwrap().unwrap();

        provider.fail_live();
        clock.advance(HOUR_MS);
        cache.refresh_all(&credentials()).await.unwrap();

        let after = cache.store().cache_metadata(SCOPE_ALL_CONTENT).unwrap().unwrap();
        assert_eq!(after.last_updated_millis, stamped.last_updated_millis);
        assert!(cache.is_cache_fresh());
    }

    #[tokio::test]
    async fn test_categories_tagged_with_kind() {
        let (cache, _, provider) = cache_with(full_provider());
        cache.refresh_all(&credentials()).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 6);

        let vod = cache.categories(ContentKind::Vod).unwrap();
        assert_eq!(vod.len(), 1);
        assert_eq!(vod[0].kind, ContentKind::Vod);
        assert_eq!(vod[0].category_name, "Movies");
    }

    #[tokio::test]
    async fn test_multi_category_stream_stored_per_category() {
        let mut shared = stream(5, "Arena", "10");
        shared.category_ids = vec!["10".to_string(), "11".to_string()];
        let (cache, _, _) = cache_with(FakeProvider::new().with_live(vec![shared]));
        cache.refresh_all(&credentials()).await.unwrap();

        for id in ["10", "11"] {
            let rows = cache.live_channels_in_category(id).unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].category_id, id);
        }
        match cache.read_by_kind(ContentKind::Live, None).unwrap() {
            CatalogItems::Live(rows) => assert_eq!(rows.len(), 2),
            other => panic!("unexpected items: {:?}", other),
        }
    }
}
