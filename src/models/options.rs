//! Caller-supplied options for file operations and reconciliation batches.

use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

use super::{
    physical_file::FileId,
    tier::{FileVisibility, StorageTier},
};

/// Options for `FileManager::upload`. Every field falls back to a configured
/// or generated default.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct UploadOptions {
    pub tier: Option<StorageTier>,
    pub visibility: Option<FileVisibility>,
    pub filename: Option<String>,
    pub path_suffix: Option<String>,
    /// Seconds the file stays HOT. Ignored for COLD uploads.
    pub hot_duration: Option<u64>,
}

/// Options for `FileManager::set_tier`.
#[derive(Deserialize, Clone, Debug)]
pub struct SetTierOptions {
    pub tier: StorageTier,
    #[serde(default = "default_move_file")]
    pub move_file: bool,
    /// Seconds the file stays HOT after moving there.
    pub hot_duration: Option<u64>,
}

impl SetTierOptions {
    pub fn new(tier: StorageTier) -> Self {
        Self {
            tier,
            move_file: true,
            hot_duration: None,
        }
    }
}

/// Options for `FileManager::set_visibility`.
#[derive(Deserialize, Clone, Debug)]
pub struct SetVisibilityOptions {
    pub visibility: FileVisibility,
    #[serde(default = "default_move_file")]
    pub move_file: bool,
}

impl SetVisibilityOptions {
    pub fn new(visibility: FileVisibility) -> Self {
        Self {
            visibility,
            move_file: true,
        }
    }
}

fn default_move_file() -> bool {
    true
}

/// Options for `FileManager::delete_orphan_objects`.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct DeleteOrphanOptions {
    pub prefix: Option<String>,
    pub tier: Option<StorageTier>,
    #[serde(default)]
    pub dry_run: bool,
}

/// Derives a display filename from an orphan's key.
pub type FilenameExtractor = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Options for `FileManager::adopt_orphan_objects`.
#[derive(Clone, Default)]
pub struct AdoptOrphanOptions {
    pub prefix: Option<String>,
    pub tier: Option<StorageTier>,
    /// Defaults to the last path segment of the key.
    pub extract_filename: Option<FilenameExtractor>,
    pub set_hot_until: bool,
    pub hot_duration: Option<u64>,
}

impl fmt::Debug for AdoptOrphanOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdoptOrphanOptions")
            .field("prefix", &self.prefix)
            .field("tier", &self.tier)
            .field("extract_filename", &self.extract_filename.is_some())
            .field("set_hot_until", &self.set_hot_until)
            .field("hot_duration", &self.hot_duration)
            .finish()
    }
}

/// A failed batch item: the key or id it concerned and why it failed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BatchItemError {
    pub path: String,
    pub error: String,
}

/// Outcome of an orphan deletion batch.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DeleteOrphanResult {
    pub deleted: usize,
    pub failed: usize,
    pub deleted_paths: Vec<String>,
    pub errors: Vec<BatchItemError>,
    pub dry_run: bool,
}

/// Outcome of an orphan adoption batch.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct AdoptOrphanResult {
    pub adopted: usize,
    pub failed: usize,
    pub adopted_file_ids: Vec<FileId>,
    pub errors: Vec<BatchItemError>,
}

/// Outcome of a housekeeping sweep.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ArchiveResult {
    pub archived: usize,
    pub failed: usize,
    pub errors: Vec<BatchItemError>,
    /// Set when the sweep stopped early on cancellation.
    pub cancelled: bool,
}
