use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    types::ServerSideEncryption,
    Client,
};
use shared_types::AppError;
use tokio::sync::RwLock;

use crate::config::env_or;

/// Bucket name for report photos (from env or default).
fn report_images_bucket() -> String {
    std::env::var("REPORT_IMAGES_BUCKET").unwrap_or_else(|_| "report-images".to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object '{0}' not found")]
    NotFound(String),
    #[error("invalid object key '{0}'")]
    InvalidKey(String),
    #[error("storage configuration error: {0}")]
    Config(String),
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => AppError::not_found("Report image not found"),
            other => {
                tracing::error!(error = %other, "image storage failure");
                AppError::internal(other.to_string())
            }
        }
    }
}

// ── Trait ────────────────────────────────────────────────────────────

/// Byte storage for uploaded report photos. Reports hold only the key.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn put(&self, key: &str, content_type: &str, body: Vec<u8>)
        -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

// ── S3 implementation ───────────────────────────────────────────────

/// S3-compatible object store (Tigris, MinIO, RustFS).
/// All uploads are encrypted with SSE-S3 (AES256).
pub struct S3ImageStore {
    client: Client,
    bucket: String,
}

impl S3ImageStore {
    /// Build from environment variables. Supports both `AWS_*` and local
    /// `S3_*` naming.
    pub fn from_env() -> Result<Self, StorageError> {
        let endpoint = env_or("AWS_ENDPOINT_URL_S3", "S3_ENDPOINT").ok_or_else(|| {
            StorageError::Config("AWS_ENDPOINT_URL_S3 or S3_ENDPOINT must be set".to_string())
        })?;
        let access_key = env_or("AWS_ACCESS_KEY_ID", "S3_ACCESS_KEY").ok_or_else(|| {
            StorageError::Config("AWS_ACCESS_KEY_ID or S3_ACCESS_KEY must be set".to_string())
        })?;
        let secret_key = env_or("AWS_SECRET_ACCESS_KEY", "S3_SECRET_KEY").ok_or_else(|| {
            StorageError::Config(
                "AWS_SECRET_ACCESS_KEY or S3_SECRET_KEY must be set".to_string(),
            )
        })?;
        let region =
            env_or("AWS_REGION", "S3_REGION").unwrap_or_else(|| "us-east-1".to_string());

        let creds = Credentials::new(&access_key, &secret_key, None, None, "env");

        let config = aws_sdk_s3::Config::builder()
            .endpoint_url(&endpoint)
            .region(Region::new(region))
            .credentials_provider(creds)
            .force_path_style(true)
            .behavior_version_latest()
            .build();

        Ok(Self {
            client: Client::from_conf(config),
            bucket: report_images_bucket(),
        })
    }

    /// Ensure the report images bucket exists (no public-read policy).
    pub async fn ensure_bucket(&self) {
        let exists = self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok();

        if !exists {
            tracing::info!("Creating report images bucket '{}'...", self.bucket);
            match self.client.create_bucket().bucket(&self.bucket).send().await {
                Ok(_) => tracing::info!("Report images bucket '{}' created", self.bucket),
                Err(e) => tracing::warn!(
                    "Failed to create report images bucket '{}': {}",
                    self.bucket,
                    e
                ),
            }
        }
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .server_side_encryption(ServerSideEncryption::Aes256)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                let svc = e.into_service_error();
                tracing::error!("S3 PutObject failed for key '{}': {:?}", key, svc);
                StorageError::Backend(format!("S3 upload failed: {}", svc))
            })?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let svc = e.into_service_error();
                if svc.is_no_such_key() {
                    return StorageError::NotFound(key.to_string());
                }
                tracing::error!("S3 GetObject failed for key '{}': {:?}", key, svc);
                StorageError::Backend(format!("S3 download failed: {}", svc))
            })?;

        resp.body
            .collect()
            .await
            .map(|data| data.into_bytes().to_vec())
            .map_err(|e| StorageError::Backend(format!("Failed to read S3 response body: {}", e)))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("DELETE failed: {}", e)))?;
        Ok(())
    }
}

// ── Local filesystem implementation ─────────────────────────────────

/// Stores photos as files under a root directory (`UPLOAD_DIR`).
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()))
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn put(
        &self,
        key: &str,
        _content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, body).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ── In-memory implementation ────────────────────────────────────────

#[derive(Default)]
pub struct MemoryImageStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn put(
        &self,
        key: &str,
        _content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), StorageError> {
        self.objects.write().await.insert(key.to_string(), body);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.write().await.remove(key);
        Ok(())
    }
}
