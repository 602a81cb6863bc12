use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    db::{CatalogStore, CATALOG_TABLE},
    error::{AppError, AppResult},
    models::{CatalogItem, CatalogItemDraft, NewCatalogItem},
    storage::{BlobStore, AUDIO_BUCKET, COVER_BUCKET},
};

/// Callback receiving every full, store-ordered snapshot
pub type SnapshotCallback = Arc<dyn Fn(Vec<CatalogItem>) + Send + Sync>;

/// Keeps subscribers in step with the remote catalog
///
/// Every change notification triggers a full re-fetch; the ordered snapshot
/// is handed to the subscriber as-is. Writes go through the same adapter so
/// assets are uploaded before the row that references them.
#[derive(Clone)]
pub struct CatalogSync {
    store: Arc<dyn CatalogStore>,
    blobs: Arc<dyn BlobStore>,
}

/// Handle to a live catalog subscription
///
/// Releasing it (explicitly or by drop) unregisters from the change stream
/// and stops further deliveries. Fetches already in flight run to
/// completion but their results are discarded.
pub struct Subscription {
    listener: Option<JoinHandle<()>>,
    active: Arc<AtomicBool>,
}

impl Subscription {
    /// Releases the change-stream registration; later calls do nothing
    pub fn unsubscribe(&mut self) {
        if let Some(listener) = self.listener.take() {
            self.active.store(false, Ordering::SeqCst);
            listener.abort();
            tracing::info!("Catalog subscription released");
        }
    }

    /// True while the change-stream listener is still running
    pub fn is_active(&self) -> bool {
        self.listener
            .as_ref()
            .is_some_and(|listener| !listener.is_finished())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Raw asset bytes supplied with a new item
#[derive(Debug, Clone)]
pub struct AssetUpload {
    pub bytes: Vec<u8>,
}

impl AssetUpload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl CatalogSync {
    pub fn new(store: Arc<dyn CatalogStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    /// Subscribes to catalog snapshots
    ///
    /// Returns after the first snapshot has been delivered. A failed initial
    /// fetch delivers an empty catalog; failed re-fetches are logged and the
    /// subscriber keeps its previous snapshot.
    pub async fn subscribe<F>(&self, on_snapshot: F) -> Subscription
    where
        F: Fn(Vec<CatalogItem>) + Send + Sync + 'static,
    {
        let on_snapshot: SnapshotCallback = Arc::new(on_snapshot);
        let active = Arc::new(AtomicBool::new(true));

        // Register before the first fetch so a mutation racing it still triggers a refresh
        let feed = self.store.subscribe_to_changes(CATALOG_TABLE).await;

        let initial = match self.store.fetch_all().await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, "Initial catalog fetch failed, starting empty");
                Vec::new()
            }
        };
        tracing::info!(count = initial.len(), "Delivering initial catalog snapshot");
        deliver(&active, &on_snapshot, initial);

        let mut feed = match feed {
            Ok(feed) => feed,
            Err(e) => {
                tracing::error!(error = %e, "Catalog change stream unavailable, snapshot will not refresh");
                return Subscription {
                    listener: None,
                    active,
                };
            }
        };

        let store = self.store.clone();
        let listener_active = active.clone();
        let listener = tokio::spawn(async move {
            while let Some(event) = feed.next_event().await {
                tracing::debug!(table = %event.table, kind = ?event.kind, "Catalog changed");

                // Each event gets its own fetch; overlapping fetches may finish
                // out of order and the last delivery wins.
                let store = store.clone();
                let on_snapshot = on_snapshot.clone();
                let active = listener_active.clone();
                tokio::spawn(async move {
                    match store.fetch_all().await {
                        Ok(items) => deliver(&active, &on_snapshot, items),
                        Err(e) => {
                            tracing::warn!(error = %e, "Catalog refresh failed, keeping previous snapshot");
                        }
                    }
                });
            }
            tracing::warn!("Catalog change stream ended, snapshot will not refresh");
        });

        Subscription {
            listener: Some(listener),
            active,
        }
    }

    /// Creates a catalog item, uploading its assets first
    ///
    /// Nothing is inserted unless every provided asset uploaded. Assets that
    /// uploaded before a failed insert are left in storage.
    pub async fn create_item(
        &self,
        draft: CatalogItemDraft,
        primary_asset: Option<AssetUpload>,
        cover_asset: Option<AssetUpload>,
    ) -> AppResult<String> {
        draft.validate()?;
        if primary_asset.is_none() && draft.audio_url.as_deref().map_or(true, str::is_empty) {
            return Err(AppError::InvalidInput(
                "An audio file or audio locator is required".to_string(),
            ));
        }

        let id = new_item_id();
        let stamp = Utc::now().timestamp_millis();

        let audio_url = match primary_asset {
            Some(asset) => {
                let name = format!("audio_{}_{}.mp3", id, stamp);
                self.blobs
                    .upload(AUDIO_BUCKET, &name, asset.bytes, "audio/mpeg")
                    .await?;
                self.blobs.public_url(AUDIO_BUCKET, &name)
            }
            None => draft.audio_url.clone().unwrap_or_default(),
        };

        let cover_url = match cover_asset {
            Some(asset) => {
                let name = format!("cover_{}_{}.jpg", id, stamp);
                self.blobs
                    .upload(COVER_BUCKET, &name, asset.bytes, "image/jpeg")
                    .await?;
                Some(self.blobs.public_url(COVER_BUCKET, &name))
            }
            None => draft.cover_url.clone().filter(|url| !url.is_empty()),
        };

        let item = NewCatalogItem::from_draft(id.clone(), draft, audio_url, cover_url);
        let title = item.title.clone();

        self.store.insert(item).await.map_err(|e| {
            tracing::error!(item_id = %id, error = %e, "Catalog insert failed after asset upload");
            e
        })?;

        tracing::info!(item_id = %id, title = %title, "Catalog item created");

        Ok(id)
    }

    /// Deletes the catalog row; stored assets are kept
    pub async fn delete_item(&self, id: &str) -> AppResult<()> {
        if id.trim().is_empty() {
            return Err(AppError::InvalidInput("Item id is required".to_string()));
        }

        self.store.delete(id).await?;

        tracing::info!(item_id = %id, "Catalog item deleted");

        Ok(())
    }
}

fn deliver(active: &AtomicBool, on_snapshot: &SnapshotCallback, items: Vec<CatalogItem>) {
    if active.load(Ordering::SeqCst) {
        on_snapshot(items);
    }
}

fn new_item_id() -> String {
    format!("beat_{}", Uuid::new_v4().simple())
}
