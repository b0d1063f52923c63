use std::path::Path;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, error::SdkError};
use tracing::debug;

use crate::application::ports::blob_storage::{BlobStorage, StoredBlob};
use crate::bootstrap::config::Config;
use crate::infrastructure::storage::{key_from_url, public_url};

pub struct S3BlobStorage {
    client: Client,
    bucket: String,
    public_base: String,
}

impl S3BlobStorage {
    pub async fn new(cfg: &Config) -> anyhow::Result<Self> {
        let bucket = cfg
            .s3_bucket
            .clone()
            .context("S3 bucket must be configured when using S3 storage backend")?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &cfg.s3_region {
            loader = loader.region(Region::new(region.clone()));
        }
        let shared_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if let (Some(access), Some(secret)) = (&cfg.s3_access_key, &cfg.s3_secret_key) {
            let creds = Credentials::new(
                access.clone(),
                secret.clone(),
                None,
                None,
                "ntca-s3-static",
            );
            builder = builder.credentials_provider(creds);
        }
        if let Some(endpoint) = &cfg.s3_endpoint {
            builder = builder.endpoint_url(endpoint.clone());
        }
        if cfg.s3_use_path_style {
            builder = builder.force_path_style(true);
        }
        let client = Client::from_conf(builder.build());

        ensure_bucket(&client, &bucket).await?;

        let public_base = default_public_base(cfg, &bucket);
        Ok(Self {
            client,
            bucket,
            public_base,
        })
    }
}

/// Explicit public URL, else the endpoint (path style) or the AWS virtual-host URL.
fn default_public_base(cfg: &Config, bucket: &str) -> String {
    if let Some(url) = &cfg.s3_public_url {
        return url.clone();
    }
    match &cfg.s3_endpoint {
        Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
        None => {
            let region = cfg.s3_region.as_deref().unwrap_or("us-east-1");
            format!("https://{bucket}.s3.{region}.amazonaws.com")
        }
    }
}

#[async_trait]
impl BlobStorage for S3BlobStorage {
    async fn put_file(
        &self,
        key: &str,
        source: &Path,
        content_type: &str,
    ) -> anyhow::Result<StoredBlob> {
        let size = tokio::fs::metadata(source).await?.len();
        let body = ByteStream::from_path(source)
            .await
            .with_context(|| format!("failed to open {}", source.display()))?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .with_context(|| format!("failed to upload object {key}"))?;
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
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .with_context(|| format!("failed to delete object {key}"))?;
        Ok(())
    }
}

async fn ensure_bucket(client: &Client, bucket: &str) -> anyhow::Result<()> {
    match client.head_bucket().bucket(bucket).send().await {
        Ok(_) => return Ok(()),
        Err(SdkError::ServiceError(service_err)) => {
            if !matches!(service_err.err(), HeadBucketError::NotFound(_)) {
                return Err(anyhow!(service_err.err().to_string()));
            }
        }
        Err(err) => return Err(anyhow!(err.to_string())),
    }

    match client.create_bucket().bucket(bucket).send().await {
        Ok(_) => Ok(()),
        Err(SdkError::ServiceError(service_err)) => match service_err.err() {
            CreateBucketError::BucketAlreadyOwnedByYou(_) => Ok(()),
            CreateBucketError::BucketAlreadyExists(_) => Ok(()),
            other => Err(anyhow!(other.to_string())),
        },
        Err(err) => Err(anyhow!(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_base_prefers_explicit_url() {
        let mut cfg = Config::for_tests();
        cfg.s3_region = Some("eu-central-1".into());
        assert_eq!(
            default_public_base(&cfg, "ntca"),
            "https://ntca.s3.eu-central-1.amazonaws.com"
        );
        cfg.s3_endpoint = Some("http://minio:9000/".into());
        assert_eq!(default_public_base(&cfg, "ntca"), "http://minio:9000/ntca");
        cfg.s3_public_url = Some("https://files.ntca.test".into());
        assert_eq!(default_public_base(&cfg, "ntca"), "https://files.ntca.test");
    }
}
