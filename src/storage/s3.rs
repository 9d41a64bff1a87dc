//! S3 storage backend
//!
//! This is the remote document store used in production deployments. Any
//! S3-compatible service works when `endpoint` is set (path-style addressing
//! is forced in that case).

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use serde::Deserialize;

use crate::{Error, Result};

use super::StorageBackend;

/// Static credentials read from the file given at startup
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    access_key_id: String,
    secret_access_key: String,
    #[serde(default)]
    session_token: Option<String>,
}

/// Load credentials from a JSON file
pub async fn load_credentials(path: &Path) -> Result<Credentials> {
    let raw = tokio::fs::read(path).await.map_err(|e| {
        Error::storage(format!(
            "failed to read credentials file {}: {}",
            path.display(),
            e
        ))
    })?;
    let file: CredentialsFile = serde_json::from_slice(&raw)?;

    Ok(Credentials::new(
        file.access_key_id,
        file.secret_access_key,
        file.session_token,
        None,
        "itemstore-credentials-file",
    ))
}

/// S3 storage backend
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub async fn new(
        bucket: String,
        region: String,
        endpoint: Option<String>,
        credentials_file: Option<&Path>,
    ) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region));

        if let Some(path) = credentials_file {
            tracing::info!(path = %path.display(), "Using credentials file");
            loader = loader.credentials_provider(load_credentials(path).await?);
        }

        let config = loader.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&config);

        if let Some(endpoint_url) = endpoint {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint_url)
                .force_path_style(true);
        }

        let s3_config = s3_config_builder.build();
        let client = Client::from_conf(s3_config);

        Ok(Self { client, bucket })
    }
}

#[async_trait]
impl StorageBackend for S3Storage {
    async fn get(&self, key: &str) -> Result<Bytes> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    Error::not_found(key)
                } else {
                    Error::storage(format!("S3 get failed: {}", e))
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::storage(format!("S3 body read failed: {}", e)))?;

        Ok(data.into_bytes())
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| Error::storage(format!("S3 put failed: {}", e)))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        // S3 reports success for missing keys
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Error::storage(format!("S3 delete failed: {}", e)))?;

        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", prefix.trim_end_matches('/'));
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&prefix)
            .delimiter("/")
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| Error::storage(format!("S3 list failed: {}", e)))?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(|k| k.to_string())),
            );
        }

        Ok(keys)
    }
}
