use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};

use crate::{
    db::{CatalogStore, ChangeEvent, ChangeFeed, ChangeKind, ProfileStore, CATALOG_TABLE},
    error::{AppError, AppResult},
    models::{normalize_email, CatalogItem, NewCatalogItem, UserProfile},
};

const CHANGE_BUFFER: usize = 64;

/// In-process catalog and profile store
///
/// Used when no database is configured and by tests. Behaves like the
/// Postgres store: newest-first ordering, duplicate ids rejected, one change
/// notification per inserted or deleted row.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
    changes: broadcast::Sender<ChangeEvent>,
    offline: Arc<AtomicBool>,
}

struct MemoryStoreInner {
    /// Newest first
    items: Vec<CatalogItem>,
    /// Keyed by normalized email
    profiles: HashMap<String, UserProfile>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            inner: Arc::new(RwLock::new(MemoryStoreInner {
                items: Vec::new(),
                profiles: HashMap::new(),
            })),
            changes,
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes reads fail with a network error until switched back; writes still land
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> AppResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Network("catalog store unreachable".to_string()));
        }
        Ok(())
    }

    fn notify(&self, kind: ChangeKind) {
        // No receivers just means nobody is subscribed yet
        let _ = self.changes.send(ChangeEvent {
            table: CATALOG_TABLE.to_string(),
            kind,
        });
    }
}

#[async_trait::async_trait]
impl CatalogStore for MemoryStore {
    async fn fetch_all(&self) -> AppResult<Vec<CatalogItem>> {
        self.check_online()?;
        let inner = self.inner.read().await;
        Ok(inner.items.clone())
    }

    async fn insert(&self, item: NewCatalogItem) -> AppResult<()> {
        {
            let mut inner = self.inner.write().await;
            if inner.items.iter().any(|existing| existing.id == item.id) {
                return Err(AppError::Constraint(format!(
                    "Catalog item {} already exists",
                    item.id
                )));
            }
            inner.items.insert(0, item.into_item(Utc::now()));
        }
        self.notify(ChangeKind::Insert);
        Ok(())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let removed = {
            let mut inner = self.inner.write().await;
            let before = inner.items.len();
            inner.items.retain(|item| item.id != id);
            before - inner.items.len()
        };
        for _ in 0..removed {
            self.notify(ChangeKind::Delete);
        }
        Ok(())
    }

    async fn subscribe_to_changes(&self, table: &str) -> AppResult<ChangeFeed> {
        let mut changes = self.changes.subscribe();
        let (tx, rx) = mpsc::unbounded_channel();
        let wanted = table.to_string();

        let forwarder = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(event) => {
                        if event.table == wanted && tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Change feed lagged, forcing refresh");
                        let event = ChangeEvent {
                            table: wanted.clone(),
                            kind: ChangeKind::Other,
                        };
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(ChangeFeed::new(rx, Some(forwarder.abort_handle())))
    }
}

#[async_trait::async_trait]
impl ProfileStore for MemoryStore {
    async fn upsert_profile(&self, profile: &UserProfile) -> AppResult<()> {
        let email = normalize_email(&profile.email);
        let mut inner = self.inner.write().await;

        match inner.profiles.get_mut(&email) {
            Some(existing) => {
                existing.username = profile.username.clone();
                existing.is_admin = profile.is_admin;
            }
            None => {
                if inner.profiles.values().any(|p| p.id == profile.id) {
                    return Err(AppError::Constraint(format!(
                        "Profile id {} already taken",
                        profile.id
                    )));
                }
                let mut stored = profile.clone();
                stored.email = email.clone();
                inner.profiles.insert(email, stored);
            }
        }

        Ok(())
    }

    async fn get_profile_by_email(&self, email: &str) -> AppResult<Option<UserProfile>> {
        self.check_online()?;
        let inner = self.inner.read().await;
        Ok(inner.profiles.get(&normalize_email(email)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn new_item(id: &str) -> NewCatalogItem {
        NewCatalogItem {
            id: id.to_string(),
            title: format!("Title {}", id),
            producer: "Bytebeatz".to_string(),
            genre: "Trap".to_string(),
            mood: vec![],
            tempo: 140,
            price: 100,
            audio_url: format!("memory://audio/{}.mp3", id),
            cover_url: None,
            description: String::new(),
            is_hot: false,
            is_trending: false,
        }
    }

    #[tokio::test]
    async fn test_fetch_all_is_newest_first() {
        let store = MemoryStore::new();
        assert_ok!(store.insert(new_item("a")).await);
        assert_ok!(store.insert(new_item("b")).await);

        let ids: Vec<String> = store.fetch_all().await.unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_constraint_error() {
        let store = MemoryStore::new();
        assert_ok!(store.insert(new_item("a")).await);
        let err = store.insert(new_item("a")).await.unwrap_err();
        assert!(matches!(err, AppError::Constraint(_)));
    }

    #[tokio::test]
    async fn test_changes_are_forwarded() {
        let store = MemoryStore::new();
        let mut feed = store.subscribe_to_changes(CATALOG_TABLE).await.unwrap();

        store.insert(new_item("a")).await.unwrap();
        store.delete("a").await.unwrap();
        store.delete("missing").await.unwrap();

        assert_eq!(feed.next_event().await.unwrap().kind, ChangeKind::Insert);
        assert_eq!(feed.next_event().await.unwrap().kind, ChangeKind::Delete);
    }

    #[tokio::test]
    async fn test_offline_store_fails_reads() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert_err!(store.fetch_all().await);
        store.set_offline(false);
        assert_ok!(store.fetch_all().await);
    }

    #[tokio::test]
    async fn test_upsert_profile_merges_by_email() {
        let store = MemoryStore::new();
        store
            .upsert_profile(&UserProfile::new("artist_1", "First", "Same@Mail.com", false))
            .await
            .unwrap();
        store
            .upsert_profile(&UserProfile::new("artist_2", "Second", "same@mail.com", false))
            .await
            .unwrap();

        let profile = store.get_profile_by_email("SAME@mail.com").await.unwrap().unwrap();
        assert_eq!(profile.id, "artist_1");
        assert_eq!(profile.username, "Second");
    }
}
