//! Chunked upload buffer.
//!
//! Turns an incrementally written byte stream into staged blocks of at most
//! `max_single_part_upload_size` bytes and commits them, in order, as one
//! blob on [`finalize`](BlockUploadBuffer::finalize).
//!
//! ```text
//!  write ──► working buffer (buffer_size) ──full──► pending ──► stage_block × N
//!                                                                   │
//!  finalize ──► stage residual bytes ──► commit_block_list(ids) ◄───┘
//! ```
//!
//! A full working buffer only stages complete parts; the short tail stays
//! pending until more bytes arrive or the buffer is finalized. Memory use is
//! bounded by `buffer_size + max_single_part_upload_size`.

use std::sync::Arc;

use blobdisk_shared::{BlockId, RemoteObjectId};
use bytes::BytesMut;
use tracing::{debug, warn};

use super::error::DiskError;
use crate::storage::BlobContainer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadState {
    Accumulating,
    Finalized,
    Poisoned,
}

/// Write buffer that uploads through stage-block / commit-block-list.
pub struct BlockUploadBuffer<C: BlobContainer> {
    container: Arc<C>,
    blob: RemoteObjectId,
    max_part_size: usize,
    buffer_size: usize,
    /// Bytes accepted but not yet staged.
    pending: BytesMut,
    /// Bytes appended since the working buffer was last spilled.
    working: usize,
    block_ids: Vec<BlockId>,
    bytes_written: u64,
    state: UploadState,
}

impl<C: BlobContainer> BlockUploadBuffer<C> {
    /// Create a buffer uploading to `blob`.
    ///
    /// Zero sizes are raised to one byte.
    #[must_use]
    pub fn new(
        container: Arc<C>,
        blob: RemoteObjectId,
        max_single_part_upload_size: usize,
        buffer_size: usize,
    ) -> Self {
        let max_part_size = max_single_part_upload_size.max(1);
        let buffer_size = buffer_size.max(1);
        Self {
            container,
            blob,
            max_part_size,
            buffer_size,
            pending: BytesMut::with_capacity(buffer_size.min(max_part_size)),
            working: 0,
            block_ids: Vec::new(),
            bytes_written: 0,
            state: UploadState::Accumulating,
        }
    }

    /// Remote id the buffer uploads to.
    #[must_use]
    pub fn blob(&self) -> &RemoteObjectId {
        &self.blob
    }

    /// Total bytes accepted so far.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Block ids staged so far, in order.
    #[must_use]
    pub fn block_ids(&self) -> &[BlockId] {
        &self.block_ids
    }

    /// Whether `finalize` has completed.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.state == UploadState::Finalized
    }

    /// Append bytes.
    ///
    /// Reaches the network only when the working buffer fills up.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` after finalize or after a failed upload, and
    /// the container error if staging a block fails.
    pub async fn write(&mut self, mut data: &[u8]) -> Result<(), DiskError> {
        self.ensure_writable()?;

        while !data.is_empty() {
            let take = (self.buffer_size - self.working).min(data.len());
            self.pending.extend_from_slice(&data[..take]);
            self.working += take;
            self.bytes_written += take as u64;
            data = &data[take..];

            if self.working == self.buffer_size {
                self.working = 0;
                self.stage_pending(false).await?;
            }
        }
        Ok(())
    }

    /// Stage every pending byte, including a short tail part.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` after finalize or after a failed upload, and
    /// the container error if staging a block fails.
    pub async fn flush(&mut self) -> Result<(), DiskError> {
        self.ensure_writable()?;
        self.working = 0;
        self.stage_pending(true).await
    }

    /// Stage residual bytes and commit the block list.
    ///
    /// Runs at most once: after a successful call further calls return the
    /// same size without touching the container. Returns the object size.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` after a failed upload, and the container error
    /// if staging or the commit fails. A failed finalize leaves no object.
    pub async fn finalize(&mut self) -> Result<u64, DiskError> {
        match self.state {
            UploadState::Finalized => return Ok(self.bytes_written),
            UploadState::Poisoned => {
                return Err(DiskError::invalid_state(format!(
                    "upload of {} failed earlier and cannot be finalized",
                    self.blob
                )));
            }
            UploadState::Accumulating => {}
        }

        self.working = 0;
        self.stage_pending(true).await?;

        if let Err(e) = self
            .container
            .commit_block_list(self.blob.as_str(), &self.block_ids)
            .await
        {
            warn!(blob = %self.blob, error = %e, "Failed to commit block list");
            self.poison();
            return Err(e.into());
        }

        self.state = UploadState::Finalized;
        debug!(
            blob = %self.blob,
            blocks = self.block_ids.len(),
            size = self.bytes_written,
            "Committed blob"
        );
        Ok(self.bytes_written)
    }

    fn ensure_writable(&self) -> Result<(), DiskError> {
        match self.state {
            UploadState::Accumulating => Ok(()),
            UploadState::Finalized => Err(DiskError::invalid_state(format!(
                "write to {} after finalize",
                self.blob
            ))),
            UploadState::Poisoned => Err(DiskError::invalid_state(format!(
                "write to {} after a failed upload",
                self.blob
            ))),
        }
    }

    /// Give up on the upload and release whatever the container staged.
    fn poison(&mut self) {
        self.state = UploadState::Poisoned;
        self.pending.clear();
        self.container.discard(self.blob.as_str());
    }

    /// Cut pending bytes into parts and stage them in order. Without
    /// `include_tail` a part shorter than the maximum stays pending.
    async fn stage_pending(&mut self, include_tail: bool) -> Result<(), DiskError> {
        while self.pending.len() >= self.max_part_size
            || (include_tail && !self.pending.is_empty())
        {
            let len = self.pending.len().min(self.max_part_size);
            let part = self.pending.split_to(len).freeze();
            let block_id = BlockId::generate();

            if let Err(e) = self
                .container
                .stage_block(self.blob.as_str(), &block_id, part)
                .await
            {
                warn!(blob = %self.blob, block = self.block_ids.len(), error = %e, "Failed to stage block");
                self.poison();
                return Err(e.into());
            }

            debug!(blob = %self.blob, block = self.block_ids.len(), len, "Staged block");
            self.block_ids.push(block_id);
        }
        Ok(())
    }
}

impl<C: BlobContainer> Drop for BlockUploadBuffer<C> {
    fn drop(&mut self) {
        if self.state != UploadState::Accumulating || self.bytes_written == 0 {
            return;
        }
        warn!(
            blob = %self.blob,
            staged_blocks = self.block_ids.len(),
            "Upload dropped before finalize, discarding staged blocks"
        );
        if !self.block_ids.is_empty() {
            self.container.discard(self.blob.as_str());
        }
    }
}
