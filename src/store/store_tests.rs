//! Tests for the SQLite catalog store

#[cfg(test)]
mod tests {
    use crate::models::*;
    use crate::store::CatalogStore;

    fn channel(content_id: i64, category_id: &str, name: &str) -> LiveChannel {
        LiveChannel {
            content_id,
            name: name.to_string(),
            category_id: category_id.to_string(),
            num: content_id,
            stream_icon: None,
            epg_channel_id: None,
            tv_archive: false,
            tv_archive_duration: 0,
            is_adult: false,
            container_extension: None,
            added: None,
        }
    }

    #[test]
    fn test_same_content_in_several_categories() {
        let store = CatalogStore::open_in_memory().unwrap();
        store
            .insert_live_channels(&[
                channel(1, "sports", "Arena (sports)"),
                channel(1, "news", "Arena (news)"),
                channel(2, "news", "Daily"),
            ])
            .unwrap();

        assert_eq!(store.count_live_channels().unwrap(), 3);

        let sports = store.live_channels_in_category("sports").unwrap();
        assert_eq!(sports.len(), 1);
        assert_eq!(sports[0].name, "Arena (sports)");

        let news = store.live_channels_in_category("news").unwrap();
        assert_eq!(news.len(), 2);
        assert_eq!(news[0].name, "Arena (news)");

        assert_eq!(store.live_channel_rows(1).unwrap().len(), 2);
    }

    #[test]
    fn test_same_composite_key_replaces_row() {
        let store = CatalogStore::open_in_memory().unwrap();
        store.insert_live_channels(&[channel(1, "a", "Old")]).unwrap();
        store.insert_live_channels(&[channel(1, "a", "New")]).unwrap();

        let rows = store.live_channels().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "New");
    }

    #[test]
    fn test_delete_all_per_kind() {
        let store = CatalogStore::open_in_memory().unwrap();
        store.insert_live_channels(&[channel(1, "a", "One")]).unwrap();
        store
            .insert_vod_titles(&[VodTitle {
                content_id: 5,
                name: "Film".to_string(),
                category_id: "m".to_string(),
                stream_icon: None,
                rating: None,
                is_adult: false,
                container_extension: Some("mkv".to_string()),
                added: None,
            }])
            .unwrap();

        store.delete_all_live_channels().unwrap();
        assert_eq!(store.count_live_channels().unwrap(), 0);
        assert_eq!(store.count_vod_titles().unwrap(), 1);
        assert_eq!(
            store.vod_titles_in_category("m").unwrap()[0].container_extension.as_deref(),
            Some("mkv")
        );
    }

    #[test]
    fn test_categories_by_kind_in_order() {
        let store = CatalogStore::open_in_memory().unwrap();
        let category = |id: &str, name: &str, order: i64, kind: ContentKind| Category {
            category_id: id.to_string(),
            category_name: name.to_string(),
            parent_id: 0,
            order_index: order,
            kind,
        };
        store
            .insert_categories(&[
                category("2", "Second", 1, ContentKind::Live),
                category("1", "First", 0, ContentKind::Live),
                category("1", "Movies", 0, ContentKind::Vod),
            ])
            .unwrap();

        let live = store.categories(ContentKind::Live).unwrap();
        let names: Vec<&str> = live.iter().map(|c| c.category_name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);

        store.delete_categories(ContentKind::Live).unwrap();
        assert!(store.categories(ContentKind::Live).unwrap().is_empty());
        assert_eq!(store.categories(ContentKind::Vod).unwrap()[0].kind, ContentKind::Vod);
    }

    #[test]
    fn test_cache_metadata_round() {
        let store = CatalogStore::open_in_memory().unwrap();
        assert!(store.cache_metadata(SCOPE_ALL_CONTENT).unwrap().is_none());

        let metadata = CacheMetadata {
            scope_key: SCOPE_ALL_CONTENT.to_string(),
            last_updated_millis: 1_000,
        };
        store.set_cache_metadata(&metadata).unwrap();
        assert_eq!(store.cache_metadata(SCOPE_ALL_CONTENT).unwrap(), Some(metadata));

        store.delete_cache_metadata(SCOPE_ALL_CONTENT).unwrap();
        assert!(store.cache_metadata(SCOPE_ALL_CONTENT).unwrap().is_none());
    }

    #[test]
    fn test_recents_trim_keeps_most_recent() {
        let store = CatalogStore::open_in_memory().unwrap();
        for (id, ts) in [(1, 100), (2, 200), (3, 300), (4, 400)] {
            store
                .insert_recent(&RecentMark { content_id: id, timestamp_millis: ts })
                .unwrap();
        }

        assert_eq!(store.trim_recents(2).unwrap(), 2);
        let ids: Vec<i64> = store.recents().unwrap().iter().map(|r| r.content_id).collect();
        assert_eq!(ids, vec![4, 3]);
    }

    #[test]
    fn test_favorites_set() {
        let store = CatalogStore::open_in_memory().unwrap();
        store
            .add_favorite(&FavoriteMark { content_id: 9, timestamp_millis: 1 })
            .unwrap();
        assert!(store.is_favorite(9).unwrap());
        assert!(!store.is_favorite(8).unwrap());

        store.remove_favorite(9).unwrap();
        assert!(store.favorites().unwrap().is_empty());
    }

    #[test]
    fn test_single_profile_row() {
        let store = CatalogStore::open_in_memory().unwrap();
        let mut profile = UserProfile {
            username: "john".to_string(),
            password: "secret".to_string(),
            server_url: "http://example.com".to_string(),
            status: "Active".to_string(),
            expiry: None,
            max_connections: Some(1),
            active_connections: 0,
            is_trial: false,
            created_at_millis: 10,
        };
        store.save_profile(&profile).unwrap();
        profile.username = "jane".to_string();
        store.save_profile(&profile).unwrap();

        assert_eq!(store.profile().unwrap(), Some(profile));

        store.delete_profile().unwrap();
        assert_eq!(store.profile().unwrap(), None);
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("catalog.db");
        {
            let store = CatalogStore::open(&path).unwrap();
            store.insert_live_channels(&[channel(3, "x", "Three")]).unwrap();
        }
        let store = CatalogStore::open(&path).unwrap();
        assert_eq!(store.live_channels().unwrap()[0].name, "Three");
    }
}
