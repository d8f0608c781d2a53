//! Remote disk service.
//!
//! Turns logical file operations into blob container calls plus metadata
//! bookkeeping.

use std::fmt;
use std::sync::Arc;

use blobdisk_shared::RemoteObjectId;
use tracing::{debug, trace, warn};

use super::error::DiskError;
use super::executor::ReadExecutor;
use super::path_keeper::PathKeeper;
use super::reader::{GatherReader, ReadOptions, RemoteReader, create_reader};
use super::settings::{DiskSettings, SettingsCell};
use super::upload::BlockUploadBuffer;
use super::writer::RemoteFileWriter;
use crate::metadata::{MetadataStore, WriteMode};
use crate::storage::BlobContainer;

/// Kind of disk, as reported to the storage engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskType {
    /// Objects in a blob storage container.
    BlobStorage,
}

impl DiskType {
    /// Engine-facing name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BlobStorage => "blob_storage",
        }
    }
}

impl fmt::Display for DiskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Disk whose files live as objects in a blob container.
pub struct RemoteDisk<C: BlobContainer, M: MetadataStore> {
    name: String,
    container: Arc<C>,
    metadata: Arc<M>,
    settings: Arc<SettingsCell>,
    executor: ReadExecutor,
}

impl<C: BlobContainer, M: MetadataStore> RemoteDisk<C, M> {
    /// Create a disk. The read executor is sized from the current settings.
    pub fn new(
        name: impl Into<String>,
        container: Arc<C>,
        metadata: Arc<M>,
        settings: Arc<SettingsCell>,
    ) -> Self {
        let executor = ReadExecutor::new(settings.get().thread_pool_size);
        Self {
            name: name.into(),
            container,
            metadata,
            settings,
            executor,
        }
    }

    /// Disk name, also the key of its configuration section.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Disk kind.
    pub fn disk_type(&self) -> DiskType {
        DiskType::BlobStorage
    }

    /// Always true.
    pub fn is_remote(&self) -> bool {
        true
    }

    /// Always true: replicas can share the remote objects.
    pub fn supports_zero_copy_replication(&self) -> bool {
        true
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> Arc<DiskSettings> {
        self.settings.get()
    }

    /// Read executor used by prefetching readers.
    pub fn executor(&self) -> &ReadExecutor {
        &self.executor
    }

    /// Open a logical file for reading.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the path has no metadata record.
    pub async fn open_for_read(
        &self,
        path: &str,
        options: &ReadOptions,
    ) -> Result<RemoteReader<C>, DiskError> {
        let objects = self.metadata.resolve(path).await?;
        let settings = self.settings.get();
        trace!(disk = %self.name, path, objects = objects.len(), method = ?options.method, "Opening file for read");

        let inner = GatherReader::new(
            Arc::clone(&self.container),
            objects,
            options.buffer_size,
            &settings,
        );
        Ok(create_reader(
            inner,
            options.threadpool(),
            settings.min_bytes_for_seek,
            &self.executor,
        ))
    }

    /// Open a logical file for writing into one fresh remote object.
    ///
    /// Nothing becomes visible until the writer is finalized.
    ///
    /// # Errors
    ///
    /// Returns the metadata store's error.
    pub async fn open_for_write(
        &self,
        path: &str,
        mode: WriteMode,
        buffer_size: usize,
    ) -> Result<RemoteFileWriter<C, M>, DiskError> {
        let handle = self.metadata.create_or_append(path, mode).await?;
        let blob = RemoteObjectId::generate(path);
        let settings = self.settings.get();
        trace!(disk = %self.name, path, %blob, ?mode, "Opening file for write");

        let upload = BlockUploadBuffer::new(
            Arc::clone(&self.container),
            blob,
            settings.max_single_part_upload_size,
            buffer_size.min(settings.max_single_part_upload_size),
        );
        Ok(RemoteFileWriter::new(
            upload,
            Arc::clone(&self.metadata),
            handle,
        ))
    }

    /// Whether a committed object named exactly `id` exists.
    ///
    /// # Errors
    ///
    /// Returns the container error if listing fails.
    pub async fn exists_remotely(&self, id: &str) -> Result<bool, DiskError> {
        let names = self.container.list_blobs(id, 1).await.inspect_err(|e| {
            warn!(disk = %self.name, blob = id, error = %e, "Failed to list remote objects");
        })?;
        Ok(names.iter().any(|name| name == id))
    }

    /// Fresh batch for [`remove_batch`](Self::remove_batch).
    pub fn create_path_keeper(&self) -> PathKeeper {
        PathKeeper::new()
    }

    /// Delete every object of `keeper` in order.
    ///
    /// The first failure aborts the rest of the batch.
    ///
    /// # Errors
    ///
    /// Returns `DeletionNotConfirmed` if the backend did not confirm a
    /// delete, or the container error unchanged.
    pub async fn remove_batch(&self, keeper: PathKeeper) -> Result<(), DiskError> {
        for id in keeper {
            match self.container.delete_blob(id.as_str()).await {
                Ok(true) => trace!(disk = %self.name, blob = %id, "Deleted remote object"),
                Ok(false) => {
                    warn!(disk = %self.name, blob = %id, "Deletion not confirmed");
                    return Err(DiskError::deletion_not_confirmed(id.into_inner()));
                }
                Err(e) => {
                    warn!(disk = %self.name, blob = %id, error = %e, "Failed to delete remote object");
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    /// Reload this disk's settings from `source`.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the section is malformed or invalid; the
    /// current settings are then left in place.
    pub fn reconfigure(&self, source: &config::Config) -> Result<(), DiskError> {
        let settings = DiskSettings::from_config(source, &self.name)?;
        self.apply_settings(settings)
    }

    /// Swap in `settings` and resize the read executor.
    ///
    /// Operations already running keep the snapshot they started with.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if `settings` fails validation.
    pub fn apply_settings(&self, settings: DiskSettings) -> Result<(), DiskError> {
        settings.validate()?;
        let threads = settings.thread_pool_size;
        debug!(disk = %self.name, ?settings, "Applying disk settings");
        self.settings.set(settings);
        self.executor.set_max_threads(threads);
        Ok(())
    }

    /// Whether the logical file exists.
    ///
    /// # Errors
    ///
    /// Returns the metadata store's error.
    pub async fn exists(&self, path: &str) -> Result<bool, DiskError> {
        self.metadata.exists(path).await
    }

    /// Size of the logical file.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the path has no metadata record.
    pub async fn file_size(&self, path: &str) -> Result<u64, DiskError> {
        let objects = self.metadata.resolve(path).await?;
        Ok(objects.iter().map(|object| object.size).sum())
    }

    /// Remove the logical file and its remote objects.
    ///
    /// The metadata record goes first, so a failed deletion leaves
    /// unreferenced objects rather than dangling references.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the path has no record, or the
    /// [`remove_batch`](Self::remove_batch) error.
    pub async fn remove_file(&self, path: &str) -> Result<(), DiskError> {
        let objects = self.metadata.remove(path).await?;
        let mut keeper = self.create_path_keeper();
        keeper.extend(objects.into_iter().map(|object| object.id));
        debug!(disk = %self.name, path, objects = keeper.len(), "Removing file");
        self.remove_batch(keeper).await
    }
}
