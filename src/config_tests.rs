//! Tests for configuration and settings persistence

#[cfg(test)]
mod tests {
    use crate::config::*;
    use crate::models::ContentKind;

    #[test]
    fn test_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("missing.json"));
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.recents_limit, 25);
    }

    #[test]
    fn test_defaults_when_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"parental_control": true}"#).unwrap();
        let config = AppConfig::load_from(&path);
        assert!(config.parental_control);
        assert_eq!(config.recents_limit, 25);
    }

    #[test]
    fn test_json_store_persists_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let store = JsonSettingsStore::open(&path);
        store.set_recents_limit(5);
        store.set_parental_control(true);
        store.set_category_blocked(ContentKind::Live, "12", true);
        store.set_category_blocked(ContentKind::Vod, "3", true);

        let reopened = JsonSettingsStore::open(&path);
        assert_eq!(reopened.recents_limit(), 5);
        assert!(reopened.parental_control_enabled());
        assert!(reopened.blocked_categories(ContentKind::Live).contains("12"));
        assert!(!reopened.blocked_categories(ContentKind::Live).contains("3"));
        assert!(reopened.blocked_categories(ContentKind::Vod).contains("3"));

        reopened.set_category_blocked(ContentKind::Live, "12", false);
        assert!(JsonSettingsStore::open(&path)
            .blocked_categories(ContentKind::Live)
            .is_empty());
    }

    #[test]
    fn test_verify_parental_pin() {
        let store = MemorySettingsStore::default();
        assert!(store.verify_parental_pin("anything"));

        store.set_parental_pin(Some("1234".to_string()));
        assert!(store.verify_parental_pin("1234"));
        assert!(!store.verify_parental_pin("0000"));

        store.set_parental_pin(Some(String::new()));
        assert!(store.verify_parental_pin("0000"));
    }
}
