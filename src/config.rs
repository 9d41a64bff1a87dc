use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::storage::StorageConfig;

const DEFAULT_COLLECTION: &str = "items";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Top-level application configuration loaded from file + environment.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageSection,
    pub repository: RepositorySection,
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Load configuration from disk and environment.
    ///
    /// Environment variables use the `ITEMSTORE_` prefix and `__` between
    /// nested keys, e.g. `ITEMSTORE_SERVER__PORT=9000`.
    pub fn load() -> Result<Self> {
        let config_path =
            env::var("ITEMSTORE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

        let mut builder = config::Config::builder();

        if Path::new(&config_path).exists() {
            builder = builder.add_source(config::File::from(PathBuf::from(&config_path)));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("ITEMSTORE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build()?;
        let mut config: Self = settings.try_deserialize()?;

        if config.logging.level.trim().is_empty() {
            config.logging.level = "info".to_string();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let collection = self.repository.collection.trim();
        if collection.is_empty() {
            bail!("repository.collection must not be empty");
        }
        if collection.contains('/') {
            bail!("repository.collection must not contain '/'");
        }
        if self.repository.timeout_ms == 0 {
            bail!("repository.timeout_ms must be greater than zero");
        }
        Ok(())
    }

    /// Resolve the storage section into a backend configuration.
    pub fn storage_runtime(&self) -> Result<StorageConfig> {
        self.storage.to_runtime()
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Include the underlying error text in 5xx response bodies
    pub expose_internal_errors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            expose_internal_errors: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub backend: StorageBackendKind,
    pub local: Option<LocalStorageSection>,
    pub s3: Option<S3StorageSection>,
}

impl StorageSection {
    pub fn to_runtime(&self) -> Result<StorageConfig> {
        match self.backend {
            StorageBackendKind::Local => {
                let local = self.local.clone().unwrap_or_default();
                Ok(StorageConfig::Local {
                    root_path: local.root_path,
                })
            }
            StorageBackendKind::Memory => Ok(StorageConfig::Memory),
            StorageBackendKind::S3 => {
                let s3 = self
                    .s3
                    .clone()
                    .context("storage.s3 configuration required when backend is 's3'")?;

                if s3.bucket.trim().is_empty() {
                    bail!("storage.s3.bucket must be specified");
                }
                if s3.region.trim().is_empty() {
                    bail!("storage.s3.region must be specified");
                }

                Ok(StorageConfig::S3 {
                    bucket: s3.bucket,
                    region: s3.region,
                    endpoint: s3.endpoint.filter(|e| !e.trim().is_empty()),
                    credentials_file: s3.credentials_file,
                })
            }
        }
    }
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::Local,
            local: Some(LocalStorageSection::default()),
            s3: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    #[default]
    Local,
    S3,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalStorageSection {
    pub root_path: String,
}

impl Default for LocalStorageSection {
    fn default() -> Self {
        Self {
            root_path: "./data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct S3StorageSection {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    /// JSON file with `access_key_id`, `secret_access_key` and an optional
    /// `session_token`; the default AWS provider chain is used when unset
    pub credentials_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RepositorySection {
    pub collection: String,
    pub timeout_ms: u64,
}

impl RepositorySection {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RepositorySection {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_listen_on_8080() {
        let config = AppConfig::default();
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
        assert_eq!(config.repository.collection, "items");
        assert_eq!(config.repository.timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_sections_are_parsed() {
        let raw = r#"
            [server]
            port = 9000
            expose_internal_errors = false

            [storage]
            backend = "memory"

            [repository]
            collection = "todos"
            timeout_ms = 250

            [logging]
            format = "text"
        "#;

        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert!(!config.server.expose_internal_errors);
        assert_eq!(config.storage_runtime().unwrap(), StorageConfig::Memory);
        assert_eq!(config.repository.collection, "todos");
        assert_eq!(config.repository.timeout(), Duration::from_millis(250));
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn invalid_repository_settings_are_rejected() {
        let mut config = AppConfig::default();
        config.repository.collection = "  ".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.repository.collection = "a/b".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.repository.timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
