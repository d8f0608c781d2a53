//! Batch of remote objects pending deletion.

use blobdisk_shared::RemoteObjectId;

/// Remote object ids collected by one remove call.
///
/// Append-only and consumed by value by
/// [`RemoteDisk::remove_batch`](super::RemoteDisk::remove_batch). No
/// deduplication; ids are deleted in insertion order.
#[derive(Debug, Default, Clone)]
pub struct PathKeeper {
    paths: Vec<RemoteObjectId>,
}

impl PathKeeper {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one remote object id.
    pub fn add(&mut self, id: impl Into<RemoteObjectId>) {
        self.paths.push(id.into());
    }

    /// Number of ids in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Ids in insertion order.
    #[must_use]
    pub fn paths(&self) -> &[RemoteObjectId] {
        &self.paths
    }
}

impl IntoIterator for PathKeeper {
    type Item = RemoteObjectId;
    type IntoIter = std::vec::IntoIter<RemoteObjectId>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.into_iter()
    }
}

impl Extend<RemoteObjectId> for PathKeeper {
    fn extend<T: IntoIterator<Item = RemoteObjectId>>(&mut self, iter: T) {
        self.paths.extend(iter);
    }
}
