use crate::error::AppResult;

pub mod http;
pub mod memory;

pub use http::HttpBlobStore;
pub use memory::MemoryBlobStore;

/// Bucket holding primary audio assets
pub const AUDIO_BUCKET: &str = "audio";

/// Bucket holding cover images
pub const COVER_BUCKET: &str = "covers";

/// Object storage for catalog assets
///
/// Uploads overwrite an existing object of the same name. Locators returned
/// by `public_url` are opaque to the rest of the crate.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> AppResult<()>;

    fn public_url(&self, bucket: &str, name: &str) -> String;
}
