//! Metadata store persisted on the local filesystem.
//!
//! Each logical path maps to one JSON record under the store root listing
//! the remote objects that back the file.

pub mod local;

pub use local::{LocalMetadataStore, MetadataRecord};
