//! Readers over the remote objects of one logical file.
//!
//! ```text
//!  RemoteReader ──┬── Direct(SeekAvoidingReader) ──┐
//!                 └── Prefetch(PrefetchReader) ────┴──► GatherReader ──► BlobContainer::read_range
//! ```
//!
//! [`GatherReader`] presents the object list as one byte stream and owns the
//! retry budgets. The two wrappers add a current chunk on top: one skips
//! short forward seeks, the other keeps the next chunk in flight on the
//! [`ReadExecutor`].

use std::io::SeekFrom;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use blobdisk_shared::RemoteObjectId;
use bytes::{Buf, Bytes, BytesMut};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::error::DiskError;
use super::executor::ReadExecutor;
use super::settings::DiskSettings;
use crate::metadata::RemoteObjectRef;
use crate::storage::{BlobContainer, StorageError};

/// Default read buffer size: 1 MiB.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// First pause between retried requests.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// How a reader fetches chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadMethod {
    /// Fetch on the caller's task.
    #[default]
    Read,
    /// Prefetch the next chunk on the read executor.
    Threadpool,
}

/// Options for [`RemoteDisk::open_for_read`](super::RemoteDisk::open_for_read).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Fetch strategy.
    pub method: ReadMethod,
    /// Largest chunk requested at once.
    pub buffer_size: usize,
}

impl ReadOptions {
    /// Create read options.
    #[must_use]
    pub const fn new(method: ReadMethod, buffer_size: usize) -> Self {
        Self {
            method,
            buffer_size,
        }
    }

    /// Whether reads go through the executor.
    #[must_use]
    pub const fn threadpool(&self) -> bool {
        matches!(self.method, ReadMethod::Threadpool)
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self::new(ReadMethod::Read, DEFAULT_READ_BUFFER_SIZE)
    }
}

// ============================================================================
// Gather reader
// ============================================================================

/// Sequential reader over the concatenation of several remote objects.
pub struct GatherReader<C: BlobContainer> {
    container: Arc<C>,
    objects: Vec<RemoteObjectRef>,
    /// Logical offset where each object starts.
    starts: Vec<u64>,
    size: u64,
    position: u64,
    buffer_size: usize,
    max_single_read_retries: u32,
    max_single_download_retries: u32,
    initial_backoff: Duration,
}

impl<C: BlobContainer> GatherReader<C> {
    /// Create a reader taking its retry budgets from `settings`.
    #[must_use]
    pub fn new(
        container: Arc<C>,
        objects: Vec<RemoteObjectRef>,
        buffer_size: usize,
        settings: &DiskSettings,
    ) -> Self {
        let mut starts = Vec::with_capacity(objects.len());
        let mut size = 0u64;
        for object in &objects {
            starts.push(size);
            size += object.size;
        }

        Self {
            container,
            objects,
            starts,
            size,
            position: 0,
            buffer_size: buffer_size.max(1),
            max_single_read_retries: settings.max_single_read_retries,
            max_single_download_retries: settings.max_single_download_retries,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
        }
    }

    /// Override the first retry pause.
    #[must_use]
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Total logical size.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Offset of the next byte `next_chunk` returns.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Move to `position`. Positions past the end read as EOF.
    pub fn set_position(&mut self, position: u64) {
        self.position = position;
    }

    /// Read the next chunk, never crossing an object boundary.
    ///
    /// Returns `None` at end of file.
    ///
    /// # Errors
    ///
    /// Returns the storage error once the download budget is spent, or
    /// `ShortRead` once the short-read budget is spent.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, DiskError> {
        if self.position >= self.size {
            return Ok(None);
        }

        let index = self.starts.partition_point(|&start| start <= self.position) - 1;
        let object = &self.objects[index];
        let offset = self.position - self.starts[index];
        let len = (object.size - offset).min(self.buffer_size as u64);

        let chunk = self.fetch(&object.id, offset, len).await?;
        self.position += chunk.len() as u64;
        Ok(Some(chunk))
    }

    /// Fetch exactly `len` bytes, re-requesting the remainder of short
    /// answers.
    async fn fetch(&self, id: &RemoteObjectId, offset: u64, len: u64) -> Result<Bytes, DiskError> {
        let first = self.download(id, offset..offset + len).await?;
        if first.len() as u64 == len {
            return Ok(first);
        }

        let mut received = BytesMut::from(first.as_ref());
        let mut backoff = self.initial_backoff;
        let mut retries = 0;
        loop {
            let got = received.len() as u64;
            if got == len {
                return Ok(received.freeze());
            }
            if retries >= self.max_single_read_retries {
                return Err(DiskError::ShortRead {
                    id: id.to_string(),
                    offset,
                    expected: len,
                    actual: got,
                });
            }

            retries += 1;
            warn!(blob = %id, offset, expected = len, got, retry = retries, "Short read, requesting remainder");
            tokio::time::sleep(backoff).await;
            backoff *= 2;

            let rest = self.download(id, offset + got..offset + len).await?;
            received.extend_from_slice(&rest);
        }
    }

    async fn download(&self, id: &RemoteObjectId, range: Range<u64>) -> Result<Bytes, DiskError> {
        let attempts = self.max_single_download_retries.max(1);
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;
        loop {
            match self.container.read_range(id.as_str(), range.clone()).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if attempt < attempts && !matches!(e, StorageError::NotFound { .. }) => {
                    warn!(blob = %id, ?range, attempt, error = %e, "Range download failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(blob = %id, ?range, attempt, error = %e, "Range download failed");
                    return Err(e.into());
                }
            }
        }
    }
}

// ============================================================================
// Seek-avoiding reader
// ============================================================================

/// Reader that serves short forward seeks by skipping bytes.
pub struct SeekAvoidingReader<C: BlobContainer> {
    inner: GatherReader<C>,
    /// Unread bytes of the current chunk, starting at `position`.
    chunk: Bytes,
    position: u64,
    min_bytes_for_seek: u64,
}

impl<C: BlobContainer> SeekAvoidingReader<C> {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: GatherReader<C>, min_bytes_for_seek: u64) -> Self {
        let position = inner.position();
        Self {
            inner,
            chunk: Bytes::new(),
            position,
            min_bytes_for_seek,
        }
    }

    /// Current offset.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Total logical size.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.inner.size()
    }

    /// Read into `buf`, returning 0 at end of file.
    ///
    /// # Errors
    ///
    /// Returns the gather reader's error.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, DiskError> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.chunk.is_empty() {
            match self.inner.next_chunk().await? {
                Some(chunk) => self.chunk = chunk,
                None => return Ok(0),
            }
        }

        let n = self.chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&self.chunk[..n]);
        self.chunk.advance(n);
        self.position += n as u64;
        Ok(n)
    }

    /// Move to `target`.
    ///
    /// # Errors
    ///
    /// Returns the gather reader's error while skipping.
    pub async fn seek_to(&mut self, target: u64) -> Result<(), DiskError> {
        let buffered_end = self.position + self.chunk.len() as u64;

        if target >= self.position && target <= buffered_end {
            self.chunk.advance(usize::try_from(target - self.position).unwrap_or(0));
            self.position = target;
            return Ok(());
        }

        if target > self.position
            && target - self.position < self.min_bytes_for_seek
            && target < self.size()
        {
            debug!(from = self.position, to = target, "Skipping instead of seeking");
            self.chunk.clear();
            self.position = buffered_end;
            while self.position < target {
                let Some(mut chunk) = self.inner.next_chunk().await? else {
                    break;
                };
                let skip = (target - self.position).min(chunk.len() as u64);
                chunk.advance(usize::try_from(skip).unwrap_or(chunk.len()));
                self.position += skip;
                self.chunk = chunk;
            }
            if self.position == target {
                return Ok(());
            }
        }

        self.chunk.clear();
        self.inner.set_position(target);
        self.position = target;
        Ok(())
    }
}

// ============================================================================
// Prefetching reader
// ============================================================================

type Fetch<C> = JoinHandle<Result<(GatherReader<C>, Result<Option<Bytes>, DiskError>), DiskError>>;

/// Reader that fetches the next chunk on the executor while the caller
/// consumes the current one.
pub struct PrefetchReader<C: BlobContainer> {
    /// `None` while a fetch owns the gather reader.
    inner: Option<GatherReader<C>>,
    pending: Option<Fetch<C>>,
    executor: ReadExecutor,
    chunk: Bytes,
    position: u64,
    size: u64,
}

impl<C: BlobContainer> PrefetchReader<C> {
    /// Wrap `inner`. No fetch starts before the first read.
    #[must_use]
    pub fn new(inner: GatherReader<C>, executor: ReadExecutor) -> Self {
        Self {
            position: inner.position(),
            size: inner.size(),
            inner: Some(inner),
            pending: None,
            executor,
            chunk: Bytes::new(),
        }
    }

    /// Current offset.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Total logical size.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read into `buf`, returning 0 at end of file.
    ///
    /// # Errors
    ///
    /// Returns the gather reader's error, or `Executor` if the fetch task
    /// died.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, DiskError> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.chunk.is_empty() {
            match self.next_chunk().await? {
                Some(chunk) => self.chunk = chunk,
                None => return Ok(0),
            }
        }

        let n = self.chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&self.chunk[..n]);
        self.chunk.advance(n);
        self.position += n as u64;
        Ok(n)
    }

    /// Move to `target`, waiting for any fetch in flight first.
    ///
    /// # Errors
    ///
    /// Returns `Executor` if the fetch task died.
    pub async fn seek_to(&mut self, target: u64) -> Result<(), DiskError> {
        let buffered_end = self.position + self.chunk.len() as u64;
        if target >= self.position && target <= buffered_end {
            self.chunk.advance(usize::try_from(target - self.position).unwrap_or(0));
            self.position = target;
            return Ok(());
        }

        if let Err(e) = self.settle().await {
            if self.inner.is_none() {
                return Err(e);
            }
            debug!(error = %e, "Discarded failed prefetch");
        }

        let inner = self.inner_mut()?;
        inner.set_position(target);
        self.chunk.clear();
        self.position = target;
        Ok(())
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, DiskError> {
        if self.pending.is_none() {
            self.start_fetch()?;
        }
        let chunk = self.settle().await?;
        if chunk.is_some() {
            self.start_fetch()?;
        }
        Ok(chunk)
    }

    fn start_fetch(&mut self) -> Result<(), DiskError> {
        let mut inner = self
            .inner
            .take()
            .ok_or_else(|| DiskError::Executor("reader lost by a failed fetch".to_string()))?;
        self.pending = Some(self.executor.spawn(async move {
            let result = inner.next_chunk().await;
            Ok((inner, result))
        }));
        Ok(())
    }

    /// Wait for the fetch in flight and take back the gather reader.
    async fn settle(&mut self) -> Result<Option<Bytes>, DiskError> {
        let Some(handle) = self.pending.take() else {
            return Ok(None);
        };
        let (inner, result) = handle
            .await
            .map_err(|e| DiskError::Executor(e.to_string()))??;
        self.inner = Some(inner);
        result
    }

    fn inner_mut(&mut self) -> Result<&mut GatherReader<C>, DiskError> {
        self.inner
            .as_mut()
            .ok_or_else(|| DiskError::Executor("reader lost by a failed fetch".to_string()))
    }
}

impl<C: BlobContainer> Drop for PrefetchReader<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

// ============================================================================
// Reader factory
// ============================================================================

/// Reader over one logical file.
pub enum RemoteReader<C: BlobContainer> {
    /// Fetches on the caller's task.
    Direct(SeekAvoidingReader<C>),
    /// Prefetches on the read executor.
    Prefetch(PrefetchReader<C>),
}

/// Choose the reader variant for `threadpool`.
#[must_use]
pub fn create_reader<C: BlobContainer>(
    inner: GatherReader<C>,
    threadpool: bool,
    min_bytes_for_seek: u64,
    executor: &ReadExecutor,
) -> RemoteReader<C> {
    if threadpool {
        RemoteReader::Prefetch(PrefetchReader::new(inner, executor.clone()))
    } else {
        RemoteReader::Direct(SeekAvoidingReader::new(inner, min_bytes_for_seek))
    }
}

impl<C: BlobContainer> RemoteReader<C> {
    /// Current offset.
    #[must_use]
    pub fn position(&self) -> u64 {
        match self {
            Self::Direct(reader) => reader.position(),
            Self::Prefetch(reader) => reader.position(),
        }
    }

    /// Total logical size.
    #[must_use]
    pub fn size(&self) -> u64 {
        match self {
            Self::Direct(reader) => reader.size(),
            Self::Prefetch(reader) => reader.size(),
        }
    }

    /// Read into `buf`, returning 0 at end of file.
    ///
    /// # Errors
    ///
    /// Returns the underlying reader's error.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, DiskError> {
        match self {
            Self::Direct(reader) => reader.read(buf).await,
            Self::Prefetch(reader) => reader.read(buf).await,
        }
    }

    /// Fill `buf` completely.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedEof` if the file ends first.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), DiskError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..]).await?;
            if n == 0 {
                return Err(DiskError::UnexpectedEof {
                    offset: self.position(),
                });
            }
            filled += n;
        }
        Ok(())
    }

    /// Append everything up to end of file to `out`.
    ///
    /// # Errors
    ///
    /// Returns the underlying reader's error.
    pub async fn read_to_end(&mut self, out: &mut Vec<u8>) -> Result<usize, DiskError> {
        let remaining = self.size().saturating_sub(self.position());
        out.reserve(usize::try_from(remaining).unwrap_or(0));

        let mut buf = vec![0u8; 64 * 1024];
        let mut total = 0;
        loop {
            let n = self.read(&mut buf).await?;
            if n == 0 {
                return Ok(total);
            }
            out.extend_from_slice(&buf[..n]);
            total += n;
        }
    }

    /// Seek like [`std::io::Seek`], returning the new offset.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSeek` for a negative target.
    pub async fn seek(&mut self, pos: SeekFrom) -> Result<u64, DiskError> {
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::Current(delta) => i128::from(self.position()) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(self.size()) + i128::from(delta),
        };
        let target = u64::try_from(target).map_err(|_| DiskError::InvalidSeek { offset: target })?;

        match self {
            Self::Direct(reader) => reader.seek_to(target).await?,
            Self::Prefetch(reader) => reader.seek_to(target).await?,
        }
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryContainer;
    use rstest::rstest;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn gather(
        container: &Arc<InMemoryContainer>,
        objects: Vec<RemoteObjectRef>,
        buffer_size: usize,
        settings: &DiskSettings,
    ) -> GatherReader<InMemoryContainer> {
        GatherReader::new(Arc::clone(container), objects, buffer_size, settings)
            .with_initial_backoff(Duration::ZERO)
    }

    fn single_blob(len: usize) -> (Arc<InMemoryContainer>, Vec<RemoteObjectRef>, Vec<u8>) {
        let container = Arc::new(InMemoryContainer::new());
        let data = pattern(len);
        container.insert("f_00000001", data.clone());
        (container, vec![RemoteObjectRef::new("f_00000001", len as u64)], data)
    }

    #[tokio::test]
    async fn test_chunks_never_cross_object_boundaries() {
        let container = Arc::new(InMemoryContainer::new());
        container.insert("f_aaaaaaaa", &b"hello "[..]);
        container.insert("f_bbbbbbbb", &b"world"[..]);
        let objects = vec![
            RemoteObjectRef::new("f_aaaaaaaa", 6),
            RemoteObjectRef::new("f_bbbbbbbb", 5),
        ];
        let mut reader = gather(&container, objects, 4, &DiskSettings::default());

        let mut chunks = Vec::new();
        while let Some(chunk) = reader.next_chunk().await.unwrap() {
            chunks.push(chunk);
        }

        let chunks: Vec<&[u8]> = chunks.iter().map(AsRef::as_ref).collect();
        assert_eq!(chunks, vec![&b"hell"[..], b"o ", b"worl", b"d"]);
        assert_eq!(reader.position(), 11);
    }

    #[tokio::test]
    async fn test_position_past_end_reads_eof() {
        let (container, objects, _) = single_blob(16);
        let mut reader = gather(&container, objects, 8, &DiskSettings::default());

        reader.set_position(100);
        assert!(reader.next_chunk().await.unwrap().is_none());
        assert!(container.read_calls().is_empty());
    }

    #[rstest]
    #[case::recovers(2, 3, true)]
    #[case::budget_spent(3, 3, false)]
    #[case::single_attempt(1, 1, false)]
    #[tokio::test]
    async fn test_download_retry_budget(
        #[case] failures: usize,
        #[case] download_retries: u32,
        #[case] succeeds: bool,
    ) {
        let (container, objects, data) = single_blob(8);
        container.fail_next_reads(failures);
        let settings = DiskSettings::default().with_retries(3, download_retries);
        let mut reader = gather(&container, objects, 8, &settings);

        let result = reader.next_chunk().await;
        if succeeds {
            assert_eq!(result.unwrap().unwrap().as_ref(), data.as_slice());
            assert_eq!(container.read_calls().len(), failures + 1);
        } else {
            assert!(result.unwrap_err().is_storage());
            assert_eq!(container.read_calls().len(), download_retries as usize);
        }
    }

    #[tokio::test]
    async fn test_short_read_requests_remainder() {
        let (container, objects, data) = single_blob(8);
        container.shorten_next_reads(1);
        let mut reader = gather(&container, objects, 8, &DiskSettings::default());

        let chunk = reader.next_chunk().await.unwrap().unwrap();
        assert_eq!(chunk.as_ref(), data.as_slice());

        let ranges: Vec<Range<u64>> = container.read_calls().into_iter().map(|(_, r)| r).collect();
        assert_eq!(ranges, vec![0..8, 4..8]);
    }

    #[tokio::test]
    async fn test_short_read_budget_spent() {
        let (container, objects, _) = single_blob(8);
        container.shorten_next_reads(5);
        let settings = DiskSettings::default().with_retries(2, 3);
        let mut reader = gather(&container, objects, 8, &settings);

        let err = reader.next_chunk().await.unwrap_err();
        assert!(matches!(
            err,
            DiskError::ShortRead { expected: 8, actual: 7, .. }
        ));
    }

    #[tokio::test]
    async fn test_short_forward_seek_skips_without_new_range() {
        let (container, objects, data) = single_blob(64);
        let inner = gather(&container, objects, 8, &DiskSettings::default());
        let mut reader = SeekAvoidingReader::new(inner, 32);

        let mut buf = [0u8; 4];
        reader.read(&mut buf).await.unwrap();

        // inside the current chunk
        reader.seek_to(6).await.unwrap();
        assert_eq!(container.read_calls().len(), 1);

        // short forward seek: skipped by reading
        reader.seek_to(20).await.unwrap();
        reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf, &data[20..24]);

        // long forward seek: repositions
        reader.seek_to(60).await.unwrap();
        reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf, &data[60..64]);

        let ranges: Vec<Range<u64>> = container.read_calls().into_iter().map(|(_, r)| r).collect();
        assert_eq!(ranges, vec![0..8, 8..16, 16..24, 60..64]);
    }

    #[tokio::test]
    async fn test_backward_seek_rereads() {
        let (container, objects, data) = single_blob(32);
        let inner = gather(&container, objects, 8, &DiskSettings::default());
        let mut reader = SeekAvoidingReader::new(inner, 32);

        let mut buf = [0u8; 8];
        reader.read(&mut buf).await.unwrap();
        reader.read(&mut buf).await.unwrap();
        reader.seek_to(2).await.unwrap();
        reader.read(&mut buf).await.unwrap();

        assert_eq!(&buf, &data[2..10]);
        assert_eq!(reader.position(), 10);
        assert_eq!(container.read_calls().len(), 3);
    }

    #[tokio::test]
    async fn test_prefetch_reader_reads_everything() {
        let (container, objects, data) = single_blob(100);
        let inner = gather(&container, objects, 16, &DiskSettings::default());
        let mut reader = create_reader(inner, true, 0, &ReadExecutor::new(2));
        assert!(matches!(reader, RemoteReader::Prefetch(_)));

        let mut out = Vec::new();
        assert_eq!(reader.read_to_end(&mut out).await.unwrap(), 100);
        assert_eq!(out, data);
        assert_eq!(reader.position(), 100);
    }

    #[tokio::test]
    async fn test_prefetch_reader_seeks_with_fetch_in_flight() {
        let (container, objects, data) = single_blob(100);
        let inner = gather(&container, objects, 16, &DiskSettings::default());
        let mut reader = create_reader(inner, true, 0, &ReadExecutor::new(1));

        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, &data[..4]);

        assert_eq!(reader.seek(SeekFrom::Start(50)).await.unwrap(), 50);
        reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, &data[50..54]);

        assert_eq!(reader.seek(SeekFrom::Start(8)).await.unwrap(), 8);
        reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, &data[8..12]);
    }

    #[rstest]
    #[case::direct(false)]
    #[case::prefetch(true)]
    #[tokio::test]
    async fn test_seek_from_variants(#[case] threadpool: bool) {
        let (container, objects, data) = single_blob(40);
        let inner = gather(&container, objects, 8, &DiskSettings::default());
        let mut reader = create_reader(inner, threadpool, 16, &ReadExecutor::new(2));

        assert_eq!(reader.seek(SeekFrom::End(-5)).await.unwrap(), 35);
        let mut tail = Vec::new();
        reader.read_to_end(&mut tail).await.unwrap();
        assert_eq!(tail, &data[35..]);

        assert_eq!(reader.seek(SeekFrom::Current(-10)).await.unwrap(), 30);
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, &data[30..32]);

        let err = reader.seek(SeekFrom::Current(-100)).await.unwrap_err();
        assert!(matches!(err, DiskError::InvalidSeek { offset: -68 }));

        reader.seek(SeekFrom::Start(38)).await.unwrap();
        let mut buf = [0u8; 4];
        let err = reader.read_exact(&mut buf).await.unwrap_err();
        assert!(matches!(err, DiskError::UnexpectedEof { offset: 40 }));
    }
}
