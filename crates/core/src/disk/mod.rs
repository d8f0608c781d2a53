//! Remote disk: logical files stored as blob container objects.
//!
//! ```text
//!  open_for_write ──► RemoteFileWriter ──► BlockUploadBuffer ──► stage / commit
//!        │                    └──────────► MetadataStore::commit (after the remote commit)
//!  open_for_read ───► MetadataStore::resolve ──► RemoteReader ──► read_range
//!  remove_file ─────► MetadataStore::remove ──► PathKeeper ──► remove_batch
//! ```

pub mod error;
pub mod executor;
pub mod path_keeper;
pub mod reader;
pub mod service;
pub mod settings;
pub mod upload;
pub mod writer;

#[cfg(test)]
mod upload_props;

pub use error::DiskError;
pub use executor::{ExecutorPermit, ReadExecutor};
pub use path_keeper::PathKeeper;
pub use reader::{
    GatherReader, PrefetchReader, ReadMethod, ReadOptions, RemoteReader, SeekAvoidingReader,
    create_reader,
};
pub use service::{DiskType, RemoteDisk};
pub use settings::{DiskSettings, SettingsCell};
pub use upload::BlockUploadBuffer;
pub use writer::RemoteFileWriter;
