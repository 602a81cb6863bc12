use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{error::AppResult, storage::BlobStore};

/// Stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Blob store kept in process memory, for local runs without object storage
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    objects: Arc<RwLock<HashMap<(String, String), StoredBlob>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, bucket: &str, name: &str) -> Option<StoredBlob> {
        let objects = self.objects.read().await;
        objects.get(&(bucket.to_string(), name.to_string())).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> AppResult<()> {
        let mut objects = self.objects.write().await;
        objects.insert(
            (bucket.to_string(), name.to_string()),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, name: &str) -> String {
        format!("memory://{}/{}", bucket, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_overwrites() {
        let store = MemoryBlobStore::new();
        store.upload("audio", "a.mp3", vec![1], "audio/mpeg").await.unwrap();
        store.upload("audio", "a.mp3", vec![2, 3], "audio/mpeg").await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("audio", "a.mp3").await.unwrap().bytes, vec![2, 3]);
        assert_eq!(store.public_url("audio", "a.mp3"), "memory://audio/a.mp3");
    }
}
