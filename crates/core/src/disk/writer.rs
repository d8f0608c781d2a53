//! Logical file writer.

use std::sync::Arc;

use blobdisk_shared::RemoteObjectId;
use tracing::{debug, error};

use super::error::DiskError;
use super::upload::BlockUploadBuffer;
use crate::metadata::{FileMetadata, MetadataStore, RemoteObjectRef};
use crate::storage::BlobContainer;

/// Writer returned by [`RemoteDisk::open_for_write`](super::RemoteDisk::open_for_write).
///
/// Bytes go to one fresh remote object. `finalize` commits that object and
/// only then registers it in the metadata store.
pub struct RemoteFileWriter<C: BlobContainer, M: MetadataStore> {
    upload: BlockUploadBuffer<C>,
    metadata: Arc<M>,
    handle: FileMetadata,
    registered: bool,
}

impl<C: BlobContainer, M: MetadataStore> RemoteFileWriter<C, M> {
    pub(crate) fn new(upload: BlockUploadBuffer<C>, metadata: Arc<M>, handle: FileMetadata) -> Self {
        Self {
            upload,
            metadata,
            handle,
            registered: false,
        }
    }

    /// Logical path being written.
    #[must_use]
    pub fn path(&self) -> &str {
        self.handle.path()
    }

    /// Remote object receiving the bytes.
    #[must_use]
    pub fn remote_id(&self) -> &RemoteObjectId {
        self.upload.blob()
    }

    /// Bytes accepted so far.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.upload.bytes_written()
    }

    /// Append bytes.
    ///
    /// # Errors
    ///
    /// Returns an error after finalize or when staging a block fails.
    pub async fn write(&mut self, data: &[u8]) -> Result<(), DiskError> {
        self.upload.write(data).await
    }

    /// Stage every buffered byte without committing.
    ///
    /// # Errors
    ///
    /// Returns an error after finalize or when staging a block fails.
    pub async fn flush(&mut self) -> Result<(), DiskError> {
        self.upload.flush().await
    }

    /// Commit the remote object, then register it for the logical path.
    ///
    /// When the commit succeeded but the registration failed, calling
    /// `finalize` again retries only the registration.
    ///
    /// # Errors
    ///
    /// Returns the upload error if the commit fails, or the metadata error
    /// if the registration fails.
    pub async fn finalize(&mut self) -> Result<u64, DiskError> {
        let size = self.upload.finalize().await?;
        if self.registered {
            return Ok(size);
        }

        let object = RemoteObjectRef::new(self.upload.blob().clone(), size);
        if let Err(e) = self.metadata.commit(&self.handle, object).await {
            error!(
                path = %self.handle.path(),
                blob = %self.upload.blob(),
                error = %e,
                "Remote object committed but not registered"
            );
            return Err(e);
        }

        self.registered = true;
        debug!(path = %self.handle.path(), blob = %self.upload.blob(), size, "Registered file");
        Ok(size)
    }
}
