//! Storage abstraction layer
//!
//! Provides a unified key/value interface over S3, the local filesystem and
//! process memory. Keys are `/`-separated paths; values are opaque bytes.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;

use crate::Result;

pub mod local;
pub mod memory;
pub mod s3;

/// Storage backend trait
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read object from storage, `Error::NotFound` when the key is absent
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Write object to storage, replacing any previous value
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Delete object from storage; deleting a missing key succeeds
    async fn delete(&self, key: &str) -> Result<()>;

    /// List object keys directly under a prefix
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq)]
pub enum StorageConfig {
    S3 {
        bucket: String,
        region: String,
        endpoint: Option<String>,
        credentials_file: Option<PathBuf>,
    },
    Local {
        root_path: String,
    },
    Memory,
}

/// Create storage backend from config
pub async fn create_storage(config: StorageConfig) -> Result<Box<dyn StorageBackend>> {
    match config {
        StorageConfig::S3 {
            bucket,
            region,
            endpoint,
            credentials_file,
        } => {
            let backend =
                s3::S3Storage::new(bucket, region, endpoint, credentials_file.as_deref()).await?;
            Ok(Box::new(backend))
        }
        StorageConfig::Local { root_path } => {
            let backend = local::LocalStorage::new(root_path)?;
            Ok(Box::new(backend))
        }
        StorageConfig::Memory => Ok(Box::new(memory::MemoryStorage::new())),
    }
}
