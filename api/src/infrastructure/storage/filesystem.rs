use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use tracing::debug;

use crate::application::ports::blob_storage::{BlobStorage, StoredBlob};
use crate::infrastructure::storage::{key_from_url, public_url, resolve_key};

/// Blobs as plain files under a root directory, served back at `<base>/<key>`.
pub struct FsBlobStorage {
    root: PathBuf,
    public_base: String,
}

impl FsBlobStorage {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobStorage for FsBlobStorage {
    async fn put_file(
        &self,
        key: &str,
        source: &Path,
        _content_type: &str,
    ) -> anyhow::Result<StoredBlob> {
        let dest = resolve_key(&self.root, key)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let size = tokio::fs::copy(source, &dest)
            .await
            .with_context(|| format!("failed to store blob {key}"))?;
        debug!(key = %key, size, "blob_stored");
        Ok(StoredBlob {
            key: key.to_string(),
            url: public_url(&self.public_base, key),
            size,
        })
    }

    async fn delete(&self, url_or_key: &str) -> anyhow::Result<()> {
        let Some(key) = key_from_url(&self.public_base, url_or_key) else {
            return Ok(());
        };
        let path = resolve_key(&self.root, &key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to delete blob {key}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_delete() {
        let root = tempfile::tempdir().unwrap();
        let store = FsBlobStorage::new(root.path(), "/uploads");
        let src = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(src.path(), b"%PDF-1.4 test").unwrap();

        let blob = store
            .put_file("teacher/Jane-Doe-1/resume/1-resume.pdf", src.path(), "application/pdf")
            .await
            .unwrap();
        assert_eq!(blob.size, 13);
        assert_eq!(blob.url, "/uploads/teacher/Jane-Doe-1/resume/1-resume.pdf");
        let stored = root.path().join("teacher/Jane-Doe-1/resume/1-resume.pdf");
        assert!(stored.exists());

        store.delete(&blob.url).await.unwrap();
        assert!(!stored.exists());
        // second delete of a missing blob is fine
        store.delete(&blob.url).await.unwrap();
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let root = tempfile::tempdir().unwrap();
        let store = FsBlobStorage::new(root.path(), "/uploads");
        let src = tempfile::NamedTempFile::new().unwrap();
        assert!(store.put_file("../x.pdf", src.path(), "application/pdf").await.is_err());
    }
}
