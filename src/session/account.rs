//! Login and logout against the provider

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::CatalogCache;
use crate::clock::Clock;
use crate::error::{CatalogError, Result};
use crate::models::{Credentials, UserProfile};

pub struct AccountService {
    cache: Arc<CatalogCache>,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    pub fn new(cache: Arc<CatalogCache>, clock: Arc<dyn Clock>) -> Self {
        Self { cache, clock }
    }

    /// Check the credentials with the provider and store the resulting profile.
    ///
    /// Success is decided by the HTTP status of the check alone; the reported
    /// account status is stored as-is.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile> {
        if !credentials.is_complete() {
            return Err(CatalogError::Auth("server, username and password are required".to_string()));
        }

        let info = match self.cache.provider().account_info(credentials).await {
            Ok(info) => info,
            Err(CatalogError::Status(code @ (401 | 403))) => {
                return Err(CatalogError::Auth(format!("provider rejected credentials (HTTP {})", code)));
            }
            Err(e) => return Err(e),
        };

        let user = info.user_info;
        let profile = UserProfile {
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            server_url: credentials.server.clone(),
            status: user.status,
            expiry: user.exp_date,
            max_connections: user.max_connections,
            active_connections: user.active_cons,
            is_trial: user.is_trial,
            created_at_millis: self.clock.now_millis(),
        };
        if !profile.status.is_empty() && !profile.is_active() {
            warn!(status = %profile.status, "Account is not active");
        }

        self.cache.store().save_profile(&profile)?;
        info!(server = %profile.server_url, user = %profile.username, "Logged in");
        Ok(profile)
    }

    /// Forget the account and the cached catalog. Favorites and recents stay.
    pub fn logout(&self) -> Result<()> {
        self.cache.store().delete_profile()?;
        self.cache.clear_all()?;
        info!("Logged out");
        Ok(())
    }

    pub fn profile(&self) -> Result<Option<UserProfile>> {
        self.cache.store().profile()
    }

    /// Stored profile, or `NotFound` when nobody is logged in
    pub fn require_profile(&self) -> Result<UserProfile> {
        self.profile()?
            .ok_or_else(|| CatalogError::NotFound("user profile".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{FavoriteMark, RecentMark};
    use crate::store::CatalogStore;
    use crate::test_support::*;

    fn service(provider: FakeProvider) -> AccountService {
        let store = Arc::new(CatalogStore::open_in_memory().unwrap());
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let cache = Arc::new(CatalogCache::new(store, Arc::new(provider), clock.clone()));
        AccountService::new(cache, clock)
    }

    #[tokio::test]
    async fn test_login_stores_profile() {
        let service = service(FakeProvider::new().with_account("Active"));
        let profile = service.login(&credentials()).await.unwrap();

        assert_eq!(profile.server_url, "http://provider.test");
        assert_eq!(profile.max_connections, Some(2));
        assert_eq!(profile.created_at_millis, 1_700_000_000_000);
        assert_eq!(service.profile().unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn test_login_rejected_by_status() {
        let service = service(FakeProvider::new());
        let result = service.login(&credentials()).await;

        assert!(matches!(result, Err(CatalogError::Auth(_))));
        assert!(service.profile().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_requires_complete_credentials() {
        let service = service(FakeProvider::new().with_account("Active"));
        let result = service.login(&Credentials::new("provider.test", "user", "")).await;
        assert!(matches!(result, Err(CatalogError::Auth(_))));
    }

    #[tokio::test]
    async fn test_logout_keeps_favorites_and_recents() {
        let service = service(
            FakeProvider::new()
                .with_account("Active")
                .with_live(vec![stream(1, "One", "1")]),
        );
        service.login(&credentials()).await.unwrap();
        service.cache.refresh_all(&credentials()).await.unwrap();
        let store = service.cache.store();
        store.add_favorite(&FavoriteMark { content_id: 1, timestamp_millis: 1 }).unwrap();
        store.insert_recent(&RecentMark { content_id: 1, timestamp_millis: 1 }).unwrap();

        service.logout().unwrap();

        assert!(matches!(service.require_profile(), Err(CatalogError::NotFound(_))));
        assert!(!service.cache.has_any_cached_content());
        assert!(!service.cache.is_cache_fresh());
        assert!(store.is_favorite(1).unwrap());
        assert_eq!(store.recents().unwrap().len(), 1);
    }
}
