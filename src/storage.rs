use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    presigning::PresigningConfig,
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use tracing::debug;

use crate::config::StorageConfig;

/// Blob store for uploaded images. Keys are flat file names.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
    /// URL a client can fetch the object from for the next `seconds`.
    async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<String>;
}

pub async fn from_config(config: &StorageConfig) -> anyhow::Result<Arc<dyn StorageClient>> {
    let storage = match config {
        StorageConfig::Local { dir } => {
            Arc::new(LocalStorage::new(dir.clone()).await?) as Arc<dyn StorageClient>
        }
        StorageConfig::S3 {
            endpoint,
            bucket,
            access_key,
            secret_key,
            region,
        } => Arc::new(S3Storage::new(endpoint, bucket, access_key, secret_key, region).await?)
            as Arc<dyn StorageClient>,
    };
    Ok(storage)
}

fn ensure_flat_key(key: &str) -> anyhow::Result<()> {
    anyhow::ensure!(
        !key.is_empty() && !key.contains(['/', '\\']) && key != "." && key != "..",
        "invalid object key {key:?}"
    );
    Ok(())
}

/// Files in a local directory, served by the app under `/uploads`.
#[derive(Clone)]
pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    pub const PUBLIC_PREFIX: &'static str = "/uploads";

    pub async fn new(dir: PathBuf) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("create upload dir {}", dir.display()))?;
        Ok(Self { dir })
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(&self, key: &str, body: Bytes, _content_type: &str) -> anyhow::Result<()> {
        ensure_flat_key(key)?;
        let path = self.dir.join(key);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        debug!(key, bytes = body.len(), "stored object on disk");
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        ensure_flat_key(key)?;
        let path = self.dir.join(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }

    async fn presign_get(&self, key: &str, _seconds: u64) -> anyhow::Result<String> {
        ensure_flat_key(key)?;
        Ok(format!("{}/{}", Self::PUBLIC_PREFIX, key))
    }
}

/// S3 or MinIO bucket.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub async fn new(
        endpoint: &str,
        bucket: &str,
        access_key: &str,
        secret_key: &str,
        region: &str,
    ) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "static",
            ))
            .endpoint_url(endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: bucket.to_string(),
        })
    }
}

#[async_trait]
impl StorageClient for S3Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }

    async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(PresigningConfig::expires_in(
                std::time::Duration::from_secs(seconds),
            )?)
            .await
            .context("s3 presign_get")?;
        Ok(presigned.uri().to_string())
    }
}

#[cfg(test)]
pub use memory::MemoryStorage;


#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("eventhub-storage-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn local_storage_writes_and_removes_files() {
        let dir = scratch_dir();
        let storage = LocalStorage::new(dir.clone()).await.unwrap();
        storage
            .put_object("a.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();
        let path = dir.join("a.png");
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"png");

        storage.delete_object("a.png").await.unwrap();
        assert!(!path.exists());
        // deleting twice is fine
        storage.delete_object("a.png").await.unwrap();

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn local_storage_rejects_nested_keys() {
        let dir = scratch_dir();
        let storage = LocalStorage::new(dir.clone()).await.unwrap();
        let err = storage
            .put_object("../escape.png", Bytes::new(), "image/png")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid object key"));
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn local_presign_points_at_public_prefix() {
        let dir = scratch_dir();
        let storage = LocalStorage::new(dir.clone()).await.unwrap();
        let url = storage.presign_get("x.webp", 600).await.unwrap();
        assert_eq!(url, "/uploads/x.webp");
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
