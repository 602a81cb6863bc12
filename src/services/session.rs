use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    db::{Cache, CacheKey},
    error::AppResult,
    models::UserProfile,
};

/// Durable slot holding the signed-in profile across restarts
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> AppResult<Option<UserProfile>>;
    async fn save(&self, profile: &UserProfile) -> AppResult<()>;
    async fn clear(&self) -> AppResult<()>;
}

#[async_trait::async_trait]
impl SessionStore for Cache {
    async fn load(&self) -> AppResult<Option<UserProfile>> {
        self.get_from_cache(&CacheKey::CurrentProfile).await
    }

    async fn save(&self, profile: &UserProfile) -> AppResult<()> {
        self.set_in_cache(&CacheKey::CurrentProfile, profile).await
    }

    async fn clear(&self) -> AppResult<()> {
        self.remove_from_cache(&CacheKey::CurrentProfile).await
    }
}

/// Session slot that lives as long as the process
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    slot: Arc<RwLock<Option<UserProfile>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> AppResult<Option<UserProfile>> {
        Ok(self.slot.read().await.clone())
    }

    async fn save(&self, profile: &UserProfile) -> AppResult<()> {
        *self.slot.write().await = Some(profile.clone());
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        *self.slot.write().await = None;
        Ok(())
    }
}

/// Who is signed in
///
/// Persistence is best effort: the in-memory profile is authoritative for the
/// running process, and store failures are logged rather than undoing a
/// sign-in or sign-out. The store calls are associated functions so callers
/// can run them without holding whatever guards the session.
pub struct Session {
    store: Arc<dyn SessionStore>,
    current: Option<UserProfile>,
}

impl Session {
    /// Restores the persisted profile, if any
    pub async fn init(store: Arc<dyn SessionStore>) -> Self {
        let current = match store.load().await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(error = %e, "Stored session unreadable, starting signed out");
                None
            }
        };

        if let Some(profile) = &current {
            tracing::info!(user_id = %profile.id, "Restored session");
        }

        Self { store, current }
    }

    pub fn store(&self) -> Arc<dyn SessionStore> {
        self.store.clone()
    }

    /// Writes the profile to durable storage
    pub async fn persist(store: &dyn SessionStore, profile: &UserProfile) {
        if let Err(e) = store.save(profile).await {
            tracing::warn!(user_id = %profile.id, error = %e, "Failed to persist session");
        }
    }

    /// Removes the profile from durable storage
    pub async fn forget(store: &dyn SessionStore) {
        if let Err(e) = store.clear().await {
            tracing::warn!(error = %e, "Failed to clear persisted session");
        }
    }

    /// Makes the profile current for this process
    pub fn install(&mut self, profile: UserProfile) {
        tracing::info!(user_id = %profile.id, admin = profile.is_admin, "Signed in");
        self.current = Some(profile);
    }

    /// Drops the current profile from memory, returning it
    pub fn clear(&mut self) -> Option<UserProfile> {
        let previous = self.current.take();
        if let Some(profile) = &previous {
            tracing::info!(user_id = %profile.id, "Signed out");
        }
        previous
    }

    pub fn current(&self) -> Option<&UserProfile> {
        self.current.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn artist() -> UserProfile {
        UserProfile::new("artist_1", "Nova", "nova@example.com", false)
    }

    async fn sign_in(session: &mut Session, profile: UserProfile) {
        Session::persist(session.store().as_ref(), &profile).await;
        session.install(profile);
    }

    async fn sign_out(session: &mut Session) {
        session.clear();
        Session::forget(session.store().as_ref()).await;
    }

    #[tokio::test]
    async fn test_sign_in_persists_and_restores() {
        let store = Arc::new(MemorySessionStore::new());

        let mut session = Session::init(store.clone()).await;
        assert!(!session.is_signed_in());
        sign_in(&mut session, artist()).await;

        let restored = Session::init(store).await;
        assert_eq!(restored.current(), Some(&artist()));
    }

    #[tokio::test]
    async fn test_sign_out_clears_storage() {
        let store = Arc::new(MemorySessionStore::new());
        let mut session = Session::init(store.clone()).await;
        sign_in(&mut session, artist()).await;
        sign_out(&mut session).await;

        assert!(session.current().is_none());
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_returns_previous_profile() {
        let mut session = Session::init(Arc::new(MemorySessionStore::new())).await;
        assert!(session.clear().is_none());

        session.install(artist());
        assert_eq!(session.clear(), Some(artist()));
        assert!(!session.is_signed_in());
    }

    #[tokio::test]
    async fn test_unreadable_store_starts_signed_out() {
        let mut store = MockSessionStore::new();
        store
            .expect_load()
            .returning(|| Err(AppError::Internal("Cache deserialization error".to_string())));

        let session = Session::init(Arc::new(store)).await;
        assert!(session.current().is_none());
    }

    #[tokio::test]
    async fn test_failed_persist_still_signs_in() {
        let mut store = MockSessionStore::new();
        store.expect_load().returning(|| Ok(None));
        store
            .expect_save()
            .times(1)
            .returning(|_| Err(AppError::Network("redis down".to_string())));

        let mut session = Session::init(Arc::new(store)).await;
        sign_in(&mut session, artist()).await;
        assert_eq!(session.current().map(|p| p.id.as_str()), Some("artist_1"));
    }

    #[tokio::test]
    async fn test_sign_out_clears_memory_even_if_store_fails() {
        let mut store = MockSessionStore::new();
        store.expect_load().returning(|| Ok(Some(artist())));
        store
            .expect_clear()
            .times(1)
            .returning(|| Err(AppError::Network("redis down".to_string())));

        let mut session = Session::init(Arc::new(store)).await;
        assert!(session.is_signed_in());
        sign_out(&mut session).await;
        assert!(!session.is_signed_in());
    }
}
