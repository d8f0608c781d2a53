//! Filesystem-backed metadata store.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use blobdisk_core::{DiskError, FileMetadata, MetadataStore, RemoteObjectRef, WriteMode};
use blobdisk_shared::types::random_ascii;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Current on-disk record version.
pub const RECORD_VERSION: u32 = 1;

/// On-disk record of one logical file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Record format version.
    pub version: u32,
    /// Objects backing the file, in file order.
    pub objects: Vec<RemoteObjectRef>,
}

impl MetadataRecord {
    /// Create a current-version record.
    #[must_use]
    pub fn new(objects: Vec<RemoteObjectRef>) -> Self {
        Self {
            version: RECORD_VERSION,
            objects,
        }
    }
}

/// Metadata store keeping one JSON record per logical path under `root`.
#[derive(Debug, Clone)]
pub struct LocalMetadataStore {
    root: PathBuf,
}

impl LocalMetadataStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the record of `path`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` for empty or absolute paths and for paths
    /// leaving the root.
    pub fn record_path(&self, path: &str) -> Result<PathBuf, DiskError> {
        if path.is_empty() {
            return Err(DiskError::invalid_path("empty path"));
        }
        let logical = Path::new(path);
        for component in logical.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => {
                    return Err(DiskError::invalid_path(format!("{path}: contains '..'")));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(DiskError::invalid_path(format!("{path}: absolute path")));
                }
            }
        }
        Ok(self.root.join(logical))
    }

    async fn read_record(&self, path: &str) -> Result<Option<MetadataRecord>, DiskError> {
        let file = self.record_path(path)?;
        let raw = match tokio::fs::read(&file).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(path, &e)),
        };

        let record: MetadataRecord = serde_json::from_slice(&raw)
            .map_err(|e| DiskError::metadata(format!("{path}: malformed record: {e}")))?;
        if record.version != RECORD_VERSION {
            return Err(DiskError::metadata(format!(
                "{path}: unsupported record version {}",
                record.version
            )));
        }
        Ok(Some(record))
    }

    /// Replace the record of `path` through a temporary sibling and a
    /// rename.
    async fn write_record(&self, path: &str, record: &MetadataRecord) -> Result<(), DiskError> {
        let file = self.record_path(path)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(path, &e))?;
        }

        let body = serde_json::to_vec_pretty(record)
            .map_err(|e| DiskError::metadata(format!("{path}: {e}")))?;
        let mut tmp = file.clone().into_os_string();
        tmp.push(format!(".tmp-{}", random_ascii(8)));
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| io_error(path, &e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &file).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                warn!(
                    path,
                    tmp = %tmp.display(),
                    error = %cleanup,
                    "Failed to remove temporary metadata record"
                );
            }
            return Err(io_error(path, &e));
        }
        Ok(())
    }
}

fn io_error(path: &str, e: &std::io::Error) -> DiskError {
    DiskError::metadata(format!("{path}: {e}"))
}

impl MetadataStore for LocalMetadataStore {
    async fn resolve(&self, path: &str) -> Result<Vec<RemoteObjectRef>, DiskError> {
        let record = self
            .read_record(path)
            .await?
            .ok_or_else(|| DiskError::not_found(path))?;
        trace!(path, objects = record.objects.len(), "Resolved metadata");
        Ok(record.objects)
    }

    async fn create_or_append(
        &self,
        path: &str,
        mode: WriteMode,
    ) -> Result<FileMetadata, DiskError> {
        let existing = match mode {
            WriteMode::Rewrite => {
                self.record_path(path)?;
                Vec::new()
            }
            WriteMode::Append => self
                .read_record(path)
                .await?
                .map(|record| record.objects)
                .unwrap_or_default(),
        };
        Ok(FileMetadata::new(path, mode, existing))
    }

    async fn commit(
        &self,
        handle: &FileMetadata,
        object: RemoteObjectRef,
    ) -> Result<(), DiskError> {
        let record = MetadataRecord::new(handle.objects_after(object));
        self.write_record(handle.path(), &record).await?;
        debug!(path = handle.path(), objects = record.objects.len(), "Wrote metadata record");
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, DiskError> {
        let file = self.record_path(path)?;
        let metadata = match tokio::fs::metadata(&file).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(io_error(path, &e)),
        };
        Ok(metadata.is_file())
    }

    async fn remove(&self, path: &str) -> Result<Vec<RemoteObjectRef>, DiskError> {
        let objects = self.resolve(path).await?;
        let file = self.record_path(path)?;
        tokio::fs::remove_file(&file)
            .await
            .map_err(|e| io_error(path, &e))?;
        debug!(path, objects = objects.len(), "Removed metadata record");
        Ok(objects)
    }
}
