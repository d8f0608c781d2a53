//! Metadata store contract.
//!
//! The metadata store maps a logical file path to the remote objects that
//! back it. The disk consults it but never persists metadata itself; the
//! local filesystem implementation lives in the `blobdisk-metadata` crate.

use std::collections::HashMap;
use std::future::Future;

use blobdisk_shared::RemoteObjectId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::disk::DiskError;

/// How a write treats an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Replace the file's object list with the new object.
    Rewrite,
    /// Add the new object after the existing ones.
    Append,
}

/// One remote object backing part of a logical file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObjectRef {
    /// Remote object id.
    pub id: RemoteObjectId,
    /// Object size in bytes.
    pub size: u64,
}

impl RemoteObjectRef {
    /// Create an object reference.
    #[must_use]
    pub fn new(id: impl Into<RemoteObjectId>, size: u64) -> Self {
        Self {
            id: id.into(),
            size,
        }
    }
}

/// Handle for one in-progress write, returned by
/// [`MetadataStore::create_or_append`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    path: String,
    mode: WriteMode,
    objects: Vec<RemoteObjectRef>,
}

impl FileMetadata {
    /// Create a handle. In `Rewrite` mode existing objects are ignored.
    #[must_use]
    pub fn new(path: impl Into<String>, mode: WriteMode, existing: Vec<RemoteObjectRef>) -> Self {
        let objects = match mode {
            WriteMode::Rewrite => Vec::new(),
            WriteMode::Append => existing,
        };
        Self {
            path: path.into(),
            mode,
            objects,
        }
    }

    /// Logical path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Write mode.
    #[must_use]
    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Objects the file keeps after the write.
    #[must_use]
    pub fn objects(&self) -> &[RemoteObjectRef] {
        &self.objects
    }

    /// Object list to persist once `object` has been committed remotely.
    #[must_use]
    pub fn objects_after(&self, object: RemoteObjectRef) -> Vec<RemoteObjectRef> {
        let mut objects = self.objects.clone();
        objects.push(object);
        objects
    }
}

/// Repository trait for logical file metadata.
pub trait MetadataStore: Send + Sync + 'static {
    /// Objects backing `path`, in file order.
    ///
    /// Fails with `NotFound` if the path has no record.
    fn resolve(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<Vec<RemoteObjectRef>, DiskError>> + Send;

    /// Start a write to `path`. Nothing is persisted until `commit`.
    fn create_or_append(
        &self,
        path: &str,
        mode: WriteMode,
    ) -> impl Future<Output = Result<FileMetadata, DiskError>> + Send;

    /// Record `object` for the write described by `handle`.
    fn commit(
        &self,
        handle: &FileMetadata,
        object: RemoteObjectRef,
    ) -> impl Future<Output = Result<(), DiskError>> + Send;

    /// Whether `path` has a record.
    fn exists(&self, path: &str) -> impl Future<Output = Result<bool, DiskError>> + Send;

    /// Remove the record of `path`, returning the objects it referenced.
    ///
    /// Fails with `NotFound` if the path has no record.
    fn remove(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<Vec<RemoteObjectRef>, DiskError>> + Send;
}

/// Metadata store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    records: Mutex<HashMap<String, Vec<RemoteObjectRef>>>,
    fail_commits: Mutex<bool>,
}

impl InMemoryMetadataStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following commit fail.
    pub fn fail_commits(&self, fail: bool) {
        *self.fail_commits.lock() = fail;
    }

    /// Logical paths with a record.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.records.lock().keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl MetadataStore for InMemoryMetadataStore {
    async fn resolve(&self, path: &str) -> Result<Vec<RemoteObjectRef>, DiskError> {
        self.records
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| DiskError::not_found(path))
    }

    async fn create_or_append(
        &self,
        path: &str,
        mode: WriteMode,
    ) -> Result<FileMetadata, DiskError> {
        let existing = self.records.lock().get(path).cloned().unwrap_or_default();
        Ok(FileMetadata::new(path, mode, existing))
    }

    async fn commit(
        &self,
        handle: &FileMetadata,
        object: RemoteObjectRef,
    ) -> Result<(), DiskError> {
        if *self.fail_commits.lock() {
            return Err(DiskError::metadata(format!(
                "injected commit failure for {}",
                handle.path()
            )));
        }
        self.records
            .lock()
            .insert(handle.path().to_string(), handle.objects_after(object));
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, DiskError> {
        Ok(self.records.lock().contains_key(path))
    }

    async fn remove(&self, path: &str) -> Result<Vec<RemoteObjectRef>, DiskError> {
        self.records
            .lock()
            .remove(path)
            .ok_or_else(|| DiskError::not_found(path))
    }
}
