/// Object storage over the storage REST API
///
/// Upload: `POST {base}/storage/v1/object/{bucket}/{name}` with `x-upsert`
/// so re-uploads overwrite. Public objects are served from
/// `{base}/storage/v1/object/public/{bucket}/{name}`.
use crate::{
    error::{AppError, AppResult},
    storage::BlobStore,
};
use reqwest::{Client as HttpClient, StatusCode};

/// Cache lifetime advertised for uploaded assets, in seconds
const ASSET_CACHE_CONTROL: &str = "3600";

#[derive(Clone)]
pub struct HttpBlobStore {
    http_client: HttpClient,
    base_url: String,
    api_key: String,
}

impl HttpBlobStore {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn object_url(&self, bucket: &str, name: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, name)
    }
}

#[async_trait::async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> AppResult<()> {
        let size = bytes.len();

        let response = self
            .http_client
            .post(self.object_url(bucket, name))
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .header("x-upsert", "true")
            .header("cache-control", ASSET_CACHE_CONTROL)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Network(format!("Upload to {} failed: {}", bucket, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                bucket = %bucket,
                object = %name,
                status = %status,
                body = %body,
                "Asset upload rejected"
            );
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    AppError::AuthRejected(format!("Storage rejected credentials for bucket {}", bucket))
                }
                _ => AppError::ExternalApi(format!(
                    "Storage returned status {} for {}/{}: {}",
                    status, bucket, name, body
                )),
            });
        }

        tracing::info!(bucket = %bucket, object = %name, bytes = size, "Asset uploaded");

        Ok(())
    }

    fn public_url(&self, bucket: &str, name: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, name)
    }
}
