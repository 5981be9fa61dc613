//! Core data models for the tiered file store.
//!
//! These types describe file records, bucket listings and the options and
//! results of file operations. They serialize naturally as JSON via `serde`.

pub mod object;
pub mod options;
pub mod physical_file;
pub mod tier;
