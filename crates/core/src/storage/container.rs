//! Blob container abstraction.

use std::future::Future;
use std::ops::Range;

use blobdisk_shared::BlockId;
use bytes::Bytes;

use super::error::StorageError;

/// Primitives a blob container must provide.
///
/// Modelled on block blobs: bytes are staged as blocks under caller-chosen
/// ids and become a readable blob only once an ordered block list is
/// committed. Implementations are shared across readers and writers and must
/// tolerate concurrent independent calls.
pub trait BlobContainer: Send + Sync + 'static {
    /// Stage one block of `blob` under `block_id`. The block stays invisible
    /// until a commit references it.
    fn stage_block(
        &self,
        blob: &str,
        block_id: &BlockId,
        data: Bytes,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Commit `block_ids`, in order, as the content of `blob`.
    fn commit_block_list(
        &self,
        blob: &str,
        block_ids: &[BlockId],
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Drop every uncommitted block staged for `blob`.
    ///
    /// Called from `Drop`, so it must not block. Backends that need a round
    /// trip to release server-side state spawn it on the current runtime.
    /// Unknown blobs are ignored.
    fn discard(&self, blob: &str);

    /// Delete `blob`. Returns the backend's deletion-confirmed flag.
    fn delete_blob(&self, blob: &str) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// List blob names starting with `prefix`, in lexicographic order,
    /// returning at most `page_size_hint` names.
    fn list_blobs(
        &self,
        prefix: &str,
        page_size_hint: usize,
    ) -> impl Future<Output = Result<Vec<String>, StorageError>> + Send;

    /// Read `range` of a committed blob. May return fewer bytes than asked
    /// for when the range runs past the end of the blob.
    fn read_range(
        &self,
        blob: &str,
        range: Range<u64>,
    ) -> impl Future<Output = Result<Bytes, StorageError>> + Send;
}
