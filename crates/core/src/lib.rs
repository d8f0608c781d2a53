//! Core of the blob storage disk.
//!
//! # Modules
//!
//! - `storage` - Blob container abstraction and its backends
//! - `disk` - Remote disk, upload buffer, readers and settings
//! - `metadata` - Contract for the logical path to remote object mapping

pub mod disk;
pub mod metadata;
pub mod storage;

pub use disk::{DiskError, DiskSettings, RemoteDisk, SettingsCell};
pub use metadata::{FileMetadata, MetadataStore, RemoteObjectRef, WriteMode};
pub use storage::{BlobContainer, StorageConfig, StorageError};
