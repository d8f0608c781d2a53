//! Storage configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// Azure Blob Storage
    AzureBlob {
        /// Azure storage account name.
        account: String,
        /// Azure storage access key.
        access_key: String,
        /// Azure container name.
        container: String,
        /// Endpoint override (Azurite, sovereign clouds).
        #[serde(default)]
        endpoint: Option<String>,
    },
    /// S3-compatible storage: AWS S3, MinIO, Cloudflare R2
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// S3 bucket name.
        bucket: String,
        /// Access key ID.
        access_key_id: String,
        /// Secret access key.
        secret_access_key: String,
        /// Region.
        region: String,
    },
    /// Local filesystem (development only)
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
    /// Process memory (tests and dry runs)
    Memory,
}

impl StorageProvider {
    /// Create Azure Blob Storage provider with the default endpoint.
    #[must_use]
    pub fn azure_blob(
        account: impl Into<String>,
        access_key: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self::AzureBlob {
            account: account.into(),
            access_key: access_key.into(),
            container: container.into(),
            endpoint: None,
        }
    }

    /// Create S3-compatible provider.
    #[must_use]
    pub fn s3(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self::S3 {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
        }
    }

    /// Create local filesystem provider (development only).
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Get the provider name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AzureBlob { .. } => "azure_blob",
            Self::S3 { .. } => "s3",
            Self::LocalFs { .. } => "local",
            Self::Memory => "memory",
        }
    }

    /// Get the bucket/container name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        match self {
            Self::AzureBlob { container, .. } => container,
            Self::S3 { bucket, .. } => bucket,
            Self::LocalFs { root } => root.to_str().unwrap_or("local"),
            Self::Memory => "memory",
        }
    }

    /// Endpoint used for Azure, falling back to the public cloud endpoint.
    #[must_use]
    pub fn azure_endpoint(account: &str, endpoint: Option<&str>) -> String {
        endpoint.map_or_else(
            || format!("https://{account}.blob.core.windows.net"),
            str::to_string,
        )
    }
}

/// Storage configuration for one blob container.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
}

impl StorageConfig {
    /// Create a new storage config.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self { provider }
    }

    /// Reads the `storage` section of a configuration source.
    ///
    /// # Errors
    ///
    /// Returns an error if the section is missing or malformed.
    pub fn from_source(source: &config::Config) -> Result<Self, config::ConfigError> {
        let provider = source.get::<StorageProvider>("storage")?;
        Ok(Self::new(provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    #[test]
    fn test_storage_provider_azure() {
        let provider = StorageProvider::azure_blob("blobdiskdev", "access_key", "parts");
        assert_eq!(provider.name(), "azure_blob");
        assert_eq!(provider.bucket(), "parts");
    }

    #[test]
    fn test_storage_provider_s3() {
        let provider = StorageProvider::s3(
            "http://127.0.0.1:9000",
            "parts",
            "access_key",
            "secret_key",
            "us-east-1",
        );
        assert_eq!(provider.name(), "s3");
        assert_eq!(provider.bucket(), "parts");
    }

    #[test]
    fn test_storage_provider_local() {
        let provider = StorageProvider::local_fs("./storage");
        assert_eq!(provider.name(), "local");
    }

    #[test]
    fn test_azure_endpoint_default_and_override() {
        assert_eq!(
            StorageProvider::azure_endpoint("acct", None),
            "https://acct.blob.core.windows.net"
        );
        assert_eq!(
            StorageProvider::azure_endpoint("acct", Some("http://127.0.0.1:10000/acct")),
            "http://127.0.0.1:10000/acct"
        );
    }

    #[test]
    fn test_storage_config_from_source() {
        let source = Config::builder()
            .add_source(File::from_str(
                r#"
                [storage]
                type = "azure_blob"
                account = "devstoreaccount1"
                access_key = "key"
                container = "parts"
                endpoint = "http://127.0.0.1:10000/devstoreaccount1"
                "#,
                FileFormat::Toml,
            ))
            .build()
            .expect("valid toml");

        let config = StorageConfig::from_source(&source).expect("parses");
        assert_eq!(config.provider.name(), "azure_blob");
        assert_eq!(config.provider.bucket(), "parts");
    }

    #[test]
    fn test_storage_config_memory() {
        let source = Config::builder()
            .add_source(File::from_str("[storage]\ntype = \"memory\"", FileFormat::Toml))
            .build()
            .expect("valid toml");

        let config = StorageConfig::from_source(&source).expect("parses");
        assert_eq!(config.provider.name(), "memory");
    }
}
