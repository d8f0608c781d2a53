//! In-memory blob container.
//!
//! Follows block blob semantics: staged blocks are invisible until a commit
//! references them, and a commit discards the blob's other staged blocks.
//! Every call is logged and several failure modes can be injected, which
//! makes this the test double for everything above the container layer.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;

use blobdisk_shared::BlockId;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;

use super::container::BlobContainer;
use super::error::StorageError;

/// One recorded `stage_block` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedBlock {
    /// Blob the block was staged for.
    pub blob: String,
    /// Block id.
    pub block_id: BlockId,
    /// Block length in bytes.
    pub len: usize,
}

/// One recorded `commit_block_list` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitCall {
    /// Blob the list was committed for.
    pub blob: String,
    /// Submitted block ids, in order.
    pub block_ids: Vec<BlockId>,
}

#[derive(Default)]
struct State {
    blobs: BTreeMap<String, Bytes>,
    staged: HashMap<String, HashMap<BlockId, Bytes>>,
    stage_log: Vec<StagedBlock>,
    commit_log: Vec<CommitCall>,
    delete_log: Vec<String>,
    discard_log: Vec<String>,
    read_log: Vec<(String, Range<u64>)>,
    refused_deletes: HashSet<String>,
    fail_commits: bool,
    fail_stage_after: Option<usize>,
    failing_reads: usize,
    short_reads: usize,
}

/// Blob container held in process memory.
#[derive(Default)]
pub struct InMemoryContainer {
    state: Mutex<State>,
}

impl InMemoryContainer {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a committed blob directly.
    pub fn insert(&self, name: impl Into<String>, data: impl Into<Bytes>) {
        self.state.lock().blobs.insert(name.into(), data.into());
    }

    /// Returns a committed blob.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Bytes> {
        self.state.lock().blobs.get(name).cloned()
    }

    /// Whether a committed blob named exactly `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.state.lock().blobs.contains_key(name)
    }

    /// Names of all committed blobs.
    #[must_use]
    pub fn blob_names(&self) -> Vec<String> {
        self.state.lock().blobs.keys().cloned().collect()
    }

    /// Number of staged, uncommitted blocks for `blob`.
    #[must_use]
    pub fn uncommitted_blocks(&self, blob: &str) -> usize {
        self.state.lock().staged.get(blob).map_or(0, HashMap::len)
    }

    /// All `stage_block` calls that succeeded, in call order.
    #[must_use]
    pub fn stage_calls(&self) -> Vec<StagedBlock> {
        self.state.lock().stage_log.clone()
    }

    /// All `commit_block_list` calls, including failed ones.
    #[must_use]
    pub fn commit_calls(&self) -> Vec<CommitCall> {
        self.state.lock().commit_log.clone()
    }

    /// All `delete_blob` calls, in call order.
    #[must_use]
    pub fn delete_calls(&self) -> Vec<String> {
        self.state.lock().delete_log.clone()
    }

    /// All `discard` calls, in call order.
    #[must_use]
    pub fn discard_calls(&self) -> Vec<String> {
        self.state.lock().discard_log.clone()
    }

    /// All `read_range` calls, in call order.
    #[must_use]
    pub fn read_calls(&self) -> Vec<(String, Range<u64>)> {
        self.state.lock().read_log.clone()
    }

    /// Make every following commit fail.
    pub fn fail_commits(&self, fail: bool) {
        self.state.lock().fail_commits = fail;
    }

    /// Make deletes of `name` report `deleted = false` without an error.
    pub fn refuse_delete(&self, name: impl Into<String>) {
        self.state.lock().refused_deletes.insert(name.into());
    }

    /// Let `count` more stage calls succeed, then fail the rest.
    pub fn fail_stage_after(&self, count: usize) {
        let mut state = self.state.lock();
        state.fail_stage_after = Some(state.stage_log.len() + count);
    }

    /// Fail the next `count` range reads.
    pub fn fail_next_reads(&self, count: usize) {
        self.state.lock().failing_reads = count;
    }

    /// Return only half of the requested bytes for the next `count` reads.
    pub fn shorten_next_reads(&self, count: usize) {
        self.state.lock().short_reads = count;
    }
}

impl BlobContainer for InMemoryContainer {
    async fn stage_block(
        &self,
        blob: &str,
        block_id: &BlockId,
        data: Bytes,
    ) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        if state
            .fail_stage_after
            .is_some_and(|limit| state.stage_log.len() >= limit)
        {
            return Err(StorageError::operation(format!(
                "injected stage failure for {blob}"
            )));
        }

        state.stage_log.push(StagedBlock {
            blob: blob.to_string(),
            block_id: block_id.clone(),
            len: data.len(),
        });
        state
            .staged
            .entry(blob.to_string())
            .or_default()
            .insert(block_id.clone(), data);
        Ok(())
    }

    async fn commit_block_list(
        &self,
        blob: &str,
        block_ids: &[BlockId],
    ) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        state.commit_log.push(CommitCall {
            blob: blob.to_string(),
            block_ids: block_ids.to_vec(),
        });
        if state.fail_commits {
            return Err(StorageError::operation(format!(
                "injected commit failure for {blob}"
            )));
        }

        let staged = state.staged.get(blob);
        let mut content = BytesMut::new();
        for id in block_ids {
            let block = staged
                .and_then(|blocks| blocks.get(id))
                .ok_or_else(|| StorageError::invalid_block_list(blob))?;
            content.extend_from_slice(block);
        }

        state.staged.remove(blob);
        state.blobs.insert(blob.to_string(), content.freeze());
        Ok(())
    }

    fn discard(&self, blob: &str) {
        let mut state = self.state.lock();
        state.discard_log.push(blob.to_string());
        state.staged.remove(blob);
    }

    async fn delete_blob(&self, blob: &str) -> Result<bool, StorageError> {
        let mut state = self.state.lock();
        state.delete_log.push(blob.to_string());
        if state.refused_deletes.contains(blob) {
            return Ok(false);
        }
        match state.blobs.remove(blob) {
            Some(_) => Ok(true),
            None => Err(StorageError::not_found(blob)),
        }
    }

    async fn list_blobs(
        &self,
        prefix: &str,
        page_size_hint: usize,
    ) -> Result<Vec<String>, StorageError> {
        let state = self.state.lock();
        Ok(state
            .blobs
            .range(prefix.to_string()..)
            .map(|(name, _)| name)
            .take_while(|name| name.starts_with(prefix))
            .take(page_size_hint.max(1))
            .cloned()
            .collect())
    }

    async fn read_range(&self, blob: &str, range: Range<u64>) -> Result<Bytes, StorageError> {
        let mut state = self.state.lock();
        state.read_log.push((blob.to_string(), range.clone()));
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(StorageError::operation(format!(
                "injected read failure for {blob}"
            )));
        }

        let data = state
            .blobs
            .get(blob)
            .cloned()
            .ok_or_else(|| StorageError::not_found(blob))?;
        let len = data.len() as u64;
        let start = usize::try_from(range.start.min(len)).unwrap_or(data.len());
        let end = usize::try_from(range.end.min(len)).unwrap_or(data.len());
        let slice = data.slice(start..end.max(start));

        if state.short_reads > 0 {
            state.short_reads -= 1;
            return Ok(slice.slice(..slice.len() / 2));
        }
        Ok(slice)
    }
}
