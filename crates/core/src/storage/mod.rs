//! Blob containers backing the remote disk.
//!
//! A container offers block blob primitives: stage a block, commit an
//! ordered block list, delete, list by prefix and ranged reads.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        BlobContainer                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ stage_block(blob, id, bytes)   │ delete_blob(blob) -> confirmed │
//! │ commit_block_list(blob, ids)   │ list_blobs(prefix, hint)       │
//! │ read_range(blob, range)        │                                │
//! ├────────────────────────────────┴────────────────────────────────┤
//! │ OperatorContainer (OpenDAL: Azure Blob, S3, fs, memory)         │
//! │ InMemoryContainer (test double with fault injection)            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod container;
mod error;
mod memory;
mod operator;

pub use config::{StorageConfig, StorageProvider};
pub use container::BlobContainer;
pub use error::StorageError;
pub use memory::{CommitCall, InMemoryContainer, StagedBlock};
pub use operator::{FS_STAGING_DIR, OperatorContainer};
