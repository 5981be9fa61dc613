pub mod file_manager;
pub mod memory_backend;
pub mod metadata;
pub mod object_store;
pub mod path_codec;
pub mod s3_backend;
pub mod sqlite_metadata;
pub mod tier_config;
