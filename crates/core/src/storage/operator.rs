//! Blob container implementation using Apache OpenDAL.
//!
//! OpenDAL does not expose stage-block / commit-block-list directly. Its
//! writers do the equivalent themselves (Put Block + Put Block List on Azure,
//! multipart upload on S3), so staged blocks are streamed into one OpenDAL
//! writer per blob and the commit closes it. The block ids submitted at
//! commit must match the staged sequence exactly; anything else aborts the
//! upload.
//!
//! The local filesystem backend writes through a staging directory under
//! its root and renames into place on close, so a staged blob is never
//! visible under its final name.

use std::ops::Range;
use std::sync::Arc;

use blobdisk_shared::BlockId;
use bytes::Bytes;
use dashmap::DashMap;
use futures::TryStreamExt;
use opendal::{ErrorKind, Operator, Writer, services};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::config::{StorageConfig, StorageProvider};
use super::container::BlobContainer;
use super::error::StorageError;

/// Directory under a local filesystem root holding in-flight uploads.
pub const FS_STAGING_DIR: &str = ".staging";

struct StagedUpload {
    writer: Writer,
    block_ids: Vec<BlockId>,
}

/// Blob container backed by an OpenDAL operator.
pub struct OperatorContainer {
    operator: Operator,
    config: StorageConfig,
    staged: DashMap<String, Arc<Mutex<StagedUpload>>>,
}

impl OperatorContainer {
    /// Create a new container from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        Ok(Self {
            operator,
            config,
            staged: DashMap::new(),
        })
    }

    /// Create OpenDAL operator from provider config.
    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        let operator = match provider {
            StorageProvider::AzureBlob {
                account,
                access_key,
                container,
                endpoint,
            } => {
                let builder = services::Azblob::default()
                    .endpoint(&StorageProvider::azure_endpoint(account, endpoint.as_deref()))
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
            StorageProvider::LocalFs { root } => {
                let staging = root.join(FS_STAGING_DIR);
                let builder = services::Fs::default()
                    .root(
                        root.to_str()
                            .ok_or_else(|| StorageError::configuration("invalid path"))?,
                    )
                    .atomic_write_dir(
                        staging
                            .to_str()
                            .ok_or_else(|| StorageError::configuration("invalid path"))?,
                    );

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
            StorageProvider::Memory => Operator::new(services::Memory::default())
                .map_err(|e| StorageError::configuration(e.to_string()))?
                .finish(),
        };
        Ok(operator)
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.config.provider.name()
    }

    /// Get the bucket/container name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        self.config.provider.bucket()
    }

    /// Number of blobs with staged, uncommitted blocks.
    #[must_use]
    pub fn staged_uploads(&self) -> usize {
        self.staged.len()
    }

    async fn staged_upload(
        &self,
        blob: &str,
        chunk: usize,
    ) -> Result<Arc<Mutex<StagedUpload>>, StorageError> {
        let existing = self.staged.get(blob).map(|upload| Arc::clone(upload.value()));
        if let Some(upload) = existing {
            return Ok(upload);
        }

        // One writer per blob; writers for the same blob never race because
        // an upload buffer is single-writer.
        let writer = self.operator.writer_with(blob).chunk(chunk).await?;
        let upload = self
            .staged
            .entry(blob.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(StagedUpload {
                    writer,
                    block_ids: Vec::new(),
                }))
            })
            .clone();
        Ok(upload)
    }
}

impl BlobContainer for OperatorContainer {
    async fn stage_block(
        &self,
        blob: &str,
        block_id: &BlockId,
        data: Bytes,
    ) -> Result<(), StorageError> {
        let upload = self.staged_upload(blob, data.len().max(1)).await?;
        let mut guard = upload.lock().await;
        if let Err(e) = guard.writer.write(data).await {
            drop(guard);
            self.discard(blob);
            return Err(e.into());
        }
        guard.block_ids.push(block_id.clone());
        Ok(())
    }

    async fn commit_block_list(
        &self,
        blob: &str,
        block_ids: &[BlockId],
    ) -> Result<(), StorageError> {
        let Some((_, upload)) = self.staged.remove(blob) else {
            if block_ids.is_empty() {
                self.operator.write(blob, Vec::<u8>::new()).await?;
                return Ok(());
            }
            return Err(StorageError::invalid_block_list(blob));
        };

        let mut upload = upload.lock().await;
        if upload.block_ids != block_ids {
            warn!(blob, "Block list does not match staged blocks, aborting upload");
            if let Err(e) = upload.writer.abort().await {
                warn!(blob, error = %e, "Failed to abort upload");
            }
            return Err(StorageError::invalid_block_list(blob));
        }

        upload.writer.close().await?;
        debug!(blob, blocks = block_ids.len(), "Committed block list");
        Ok(())
    }

    fn discard(&self, blob: &str) {
        let Some((_, upload)) = self.staged.remove(blob) else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(blob, "No runtime to abort discarded upload, dropping writer");
            return;
        };

        let blob = blob.to_string();
        handle.spawn(async move {
            let mut upload = upload.lock().await;
            match upload.writer.abort().await {
                Ok(()) => debug!(blob = %blob, "Aborted discarded upload"),
                Err(e) => warn!(blob = %blob, error = %e, "Failed to abort discarded upload"),
            }
        });
    }

    async fn delete_blob(&self, blob: &str) -> Result<bool, StorageError> {
        match self.operator.stat(blob).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::not_found(blob));
            }
            Err(e) => return Err(e.into()),
        }

        self.operator.delete(blob).await?;
        let still_there = self.operator.exists(blob).await?;
        Ok(!still_there)
    }

    async fn list_blobs(
        &self,
        prefix: &str,
        page_size_hint: usize,
    ) -> Result<Vec<String>, StorageError> {
        let mut lister = self.operator.lister_with(prefix).recursive(true).await?;
        let mut names = Vec::new();
        while let Some(entry) = lister.try_next().await? {
            if entry.metadata().is_dir() || is_staging_entry(entry.path()) {
                continue;
            }
            names.push(entry.path().to_string());
            if names.len() >= page_size_hint.max(1) {
                break;
            }
        }
        Ok(names)
    }

    async fn read_range(&self, blob: &str, range: Range<u64>) -> Result<Bytes, StorageError> {
        let buffer = self.operator.read_with(blob).range(range).await?;
        Ok(buffer.to_bytes())
    }
}

fn is_staging_entry(path: &str) -> bool {
    path.strip_prefix(FS_STAGING_DIR)
        .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fs_container(root: &std::path::Path) -> OperatorContainer {
        OperatorContainer::from_config(StorageConfig::new(StorageProvider::local_fs(root)))
            .expect("should create container")
    }

    #[test]
    fn test_provider_metadata() {
        let container =
            OperatorContainer::from_config(StorageConfig::new(StorageProvider::Memory))
                .expect("should create container");
        assert_eq!(container.provider_name(), "memory");
        assert_eq!(container.bucket(), "memory");
    }

    #[tokio::test]
    async fn test_stage_and_commit_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let container = fs_container(tmp.path());
        let first = BlockId::generate();
        let second = BlockId::generate();
        container
            .stage_block("parts/a", &first, Bytes::from_static(b"hello "))
            .await
            .unwrap();
        container
            .stage_block("parts/a", &second, Bytes::from_static(b"world"))
            .await
            .unwrap();
        container
            .commit_block_list("parts/a", &[first, second])
            .await
            .unwrap();

        let data = container.read_range("parts/a", 0..11).await.unwrap();
        assert_eq!(data, Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn test_commit_with_reordered_list_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let container = fs_container(tmp.path());
        let first = BlockId::generate();
        let second = BlockId::generate();
        container
            .stage_block("parts/b", &first, Bytes::from_static(b"1"))
            .await
            .unwrap();
        container
            .stage_block("parts/b", &second, Bytes::from_static(b"2"))
            .await
            .unwrap();

        let err = container
            .commit_block_list("parts/b", &[second, first])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidBlockList { .. }));
    }

    #[tokio::test]
    async fn test_commit_without_staged_blocks() {
        let tmp = tempfile::tempdir().unwrap();
        let container = fs_container(tmp.path());

        let err = container
            .commit_block_list("parts/none", &[BlockId::generate()])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidBlockList { .. }));

        container.commit_block_list("parts/empty", &[]).await.unwrap();
        assert!(tmp.path().join("parts/empty").exists());
    }

    #[tokio::test]
    async fn test_delete_confirms_and_missing_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let container = fs_container(tmp.path());
        container.commit_block_list("parts/c", &[]).await.unwrap();

        assert!(container.delete_blob("parts/c").await.unwrap());
        let err = container.delete_blob("parts/c").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_staged_blocks_invisible_until_commit() {
        let tmp = tempfile::tempdir().unwrap();
        let container = fs_container(tmp.path());
        let id = BlockId::generate();
        container
            .stage_block("parts/d", &id, Bytes::from_static(b"partial"))
            .await
            .unwrap();

        assert!(!tmp.path().join("parts/d").exists());
        assert!(container.list_blobs("parts/d", 1).await.unwrap().is_empty());
        assert!(container.list_blobs("", 100).await.unwrap().is_empty());

        container.commit_block_list("parts/d", &[id]).await.unwrap();
        assert_eq!(container.list_blobs("parts/d", 1).await.unwrap(), vec!["parts/d"]);
        assert_eq!(container.staged_uploads(), 0);
    }

    #[tokio::test]
    async fn test_discard_releases_staged_upload() {
        let tmp = tempfile::tempdir().unwrap();
        let container = fs_container(tmp.path());
        let id = BlockId::generate();
        container
            .stage_block("parts/e", &id, Bytes::from_static(b"abandoned"))
            .await
            .unwrap();
        assert_eq!(container.staged_uploads(), 1);

        container.discard("parts/e");
        container.discard("parts/unknown");

        assert_eq!(container.staged_uploads(), 0);
        assert!(!tmp.path().join("parts/e").exists());
        let err = container.commit_block_list("parts/e", &[id]).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidBlockList { .. }));
    }

    #[test]
    fn test_staging_entries_are_recognised() {
        assert!(is_staging_entry(".staging/data.bin.1234"));
        assert!(!is_staging_entry(".staging_data"));
        assert!(!is_staging_entry("parts/.staging/x"));
    }
}
