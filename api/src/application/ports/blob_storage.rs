use std::path::Path;

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub key: String,
    pub url: String,
    pub size: u64,
}

#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Copies the local file at `source` to `key` and returns its public location.
    async fn put_file(
        &self,
        key: &str,
        source: &Path,
        content_type: &str,
    ) -> anyhow::Result<StoredBlob>;
    /// Deletes by public URL or key. Unknown blobs are not an error.
    async fn delete(&self, url_or_key: &str) -> anyhow::Result<()>;
}
