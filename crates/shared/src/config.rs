//! Application configuration management.

use std::path::PathBuf;

use serde::Deserialize;

/// Environment variable prefix for overrides, e.g. `BLOBDISK__DISK__NAME`.
pub const ENV_PREFIX: &str = "BLOBDISK";

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Disk configuration.
    #[serde(default)]
    pub disk: DiskConfig,
}

/// Local side of a remote disk.
#[derive(Debug, Clone, Deserialize)]
pub struct DiskConfig {
    /// Disk name, used to find the disk's tuning section.
    #[serde(default = "default_disk_name")]
    pub name: String,
    /// Directory holding the local metadata records.
    #[serde(default = "default_metadata_path")]
    pub metadata_path: PathBuf,
    /// Working buffer size for writes, in bytes.
    #[serde(default = "default_buffer_size")]
    pub write_buffer_size: usize,
    /// Chunk size for reads, in bytes.
    #[serde(default = "default_buffer_size")]
    pub read_buffer_size: usize,
}

fn default_disk_name() -> String {
    "blob_storage_disk".to_string()
}

fn default_metadata_path() -> PathBuf {
    PathBuf::from("./metadata")
}

fn default_buffer_size() -> usize {
    1024 * 1024 // 1 MiB
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            name: default_disk_name(),
            metadata_path: default_metadata_path(),
            write_buffer_size: default_buffer_size(),
            read_buffer_size: default_buffer_size(),
        }
    }
}

impl AppConfig {
    /// Builds the layered configuration source.
    ///
    /// Layers, lowest priority first: `config/default`, `config/{RUN_MODE}`,
    /// then `BLOBDISK__*` environment variables. The raw source is also what
    /// the disk reads its tuning section from on reconfiguration.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file cannot be parsed.
    pub fn source() -> Result<config::Config, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
    }

    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::from_source(&Self::source()?)
    }

    /// Deserializes the application sections out of an already built source.
    ///
    /// # Errors
    ///
    /// Returns an error if a section has the wrong shape.
    pub fn from_source(source: &config::Config) -> Result<Self, config::ConfigError> {
        source.clone().try_deserialize()
    }
}
