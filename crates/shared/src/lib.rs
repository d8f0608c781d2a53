//! Shared types and configuration for blobdisk.
//!
//! This crate provides common pieces used across all other crates:
//! - Typed identifiers for remote objects and staged blocks
//! - Layered application configuration

pub mod config;
pub mod types;

pub use config::{AppConfig, DiskConfig};
pub use types::{BlockId, RemoteObjectId};
