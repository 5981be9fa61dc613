//! Two-tier (HOT/COLD) object storage with PUBLIC/PRIVATE visibility and a
//! synchronized metadata record per file.
//!
//! [`services::file_manager::FileManager`] is the entry point. It is built
//! from a [`services::tier_config::StrataConfig`], a
//! [`services::metadata::MetadataPort`] and one
//! [`services::object_store::ObjectBackend`] per tier.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use errors::{AppError, StrataError, StrataResult};
pub use models::{
    physical_file::{FileId, PhysicalFile},
    tier::{FileVisibility, StorageTier},
};
pub use services::file_manager::FileManager;
