//! Disk settings snapshots and the cell that hot-swaps them.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;

use super::error::DiskError;

/// Configuration key holding per-disk sections.
pub const DISKS_CONFIG_PREFIX: &str = "storage_configuration.disks";

/// Immutable tuning snapshot for one remote disk.
///
/// Replaced wholesale on reconfiguration. Operations that picked up a
/// snapshot keep using it to completion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiskSettings {
    /// Upper bound for one staged block, in bytes.
    #[serde(default = "default_max_single_part_upload_size")]
    pub max_single_part_upload_size: usize,
    /// Forward seeks shorter than this are served by skipping bytes.
    #[serde(default = "default_min_bytes_for_seek")]
    pub min_bytes_for_seek: u64,
    /// Re-requests of a chunk that came back short.
    #[serde(default = "default_retries")]
    pub max_single_read_retries: u32,
    /// Attempts at a failing range download.
    #[serde(default = "default_retries")]
    pub max_single_download_retries: u32,
    /// Worker permits of the read executor.
    #[serde(default = "default_thread_pool_size")]
    pub thread_pool_size: usize,
}

fn default_max_single_part_upload_size() -> usize {
    DiskSettings::DEFAULT_MAX_SINGLE_PART_UPLOAD_SIZE
}

fn default_min_bytes_for_seek() -> u64 {
    DiskSettings::DEFAULT_MIN_BYTES_FOR_SEEK
}

fn default_retries() -> u32 {
    DiskSettings::DEFAULT_RETRIES
}

fn default_thread_pool_size() -> usize {
    DiskSettings::DEFAULT_THREAD_POOL_SIZE
}

impl DiskSettings {
    /// Default part size: 100 MiB.
    pub const DEFAULT_MAX_SINGLE_PART_UPLOAD_SIZE: usize = 100 * 1024 * 1024;
    /// Default seek threshold: 1 MiB.
    pub const DEFAULT_MIN_BYTES_FOR_SEEK: u64 = 1024 * 1024;
    /// Default retry budget for reads and downloads.
    pub const DEFAULT_RETRIES: u32 = 3;
    /// Default read executor size.
    pub const DEFAULT_THREAD_POOL_SIZE: usize = 16;

    /// Create a snapshot from explicit values.
    #[must_use]
    pub const fn new(
        max_single_part_upload_size: usize,
        min_bytes_for_seek: u64,
        max_single_read_retries: u32,
        max_single_download_retries: u32,
        thread_pool_size: usize,
    ) -> Self {
        Self {
            max_single_part_upload_size,
            min_bytes_for_seek,
            max_single_read_retries,
            max_single_download_retries,
            thread_pool_size,
        }
    }

    /// Set the maximum part size.
    #[must_use]
    pub const fn with_max_single_part_upload_size(mut self, size: usize) -> Self {
        self.max_single_part_upload_size = size;
        self
    }

    /// Set the seek threshold.
    #[must_use]
    pub const fn with_min_bytes_for_seek(mut self, bytes: u64) -> Self {
        self.min_bytes_for_seek = bytes;
        self
    }

    /// Set both retry budgets.
    #[must_use]
    pub const fn with_retries(mut self, read: u32, download: u32) -> Self {
        self.max_single_read_retries = read;
        self.max_single_download_retries = download;
        self
    }

    /// Set the read executor size.
    #[must_use]
    pub const fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = size;
        self
    }

    /// Check the values a disk cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error if the part size or the thread pool size is zero.
    pub fn validate(&self) -> Result<(), DiskError> {
        if self.max_single_part_upload_size == 0 {
            return Err(DiskError::configuration(
                "max_single_part_upload_size must be greater than zero",
            ));
        }
        if self.thread_pool_size == 0 {
            return Err(DiskError::configuration(
                "thread_pool_size must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Reads the section `storage_configuration.disks.<disk_name>`.
    ///
    /// A missing section yields the defaults; missing fields inside a
    /// present section take their defaults too.
    ///
    /// # Errors
    ///
    /// Returns an error if the section is malformed or fails validation.
    pub fn from_config(source: &config::Config, disk_name: &str) -> Result<Self, DiskError> {
        let key = format!("{DISKS_CONFIG_PREFIX}.{disk_name}");
        let settings = match source.get::<Self>(&key) {
            Ok(settings) => settings,
            Err(config::ConfigError::NotFound(_)) => Self::default(),
            Err(e) => return Err(DiskError::configuration(format!("{key}: {e}"))),
        };
        settings.validate()?;
        Ok(settings)
    }
}

impl Default for DiskSettings {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_MAX_SINGLE_PART_UPLOAD_SIZE,
            Self::DEFAULT_MIN_BYTES_FOR_SEEK,
            Self::DEFAULT_RETRIES,
            Self::DEFAULT_RETRIES,
            Self::DEFAULT_THREAD_POOL_SIZE,
        )
    }
}

/// Atomically replaceable holder of the current [`DiskSettings`].
///
/// `get` always returns one complete snapshot; `set` swaps the pointer and
/// never mutates a published snapshot.
#[derive(Debug)]
pub struct SettingsCell {
    current: RwLock<Arc<DiskSettings>>,
}

impl SettingsCell {
    /// Create a cell holding `settings`.
    #[must_use]
    pub fn new(settings: DiskSettings) -> Self {
        Self {
            current: RwLock::new(Arc::new(settings)),
        }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn get(&self) -> Arc<DiskSettings> {
        Arc::clone(&self.current.read())
    }

    /// Publishes a new snapshot.
    pub fn set(&self, settings: DiskSettings) {
        let next = Arc::new(settings);
        *self.current.write() = next;
    }
}

impl Default for SettingsCell {
    fn default() -> Self {
        Self::new(DiskSettings::default())
    }
}
