//! Represents a file record tracked by the metadata backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::tier::StorageTier;

/// Opaque record identifier assigned by the metadata backend.
///
/// Relational backends hand out integers, document stores tend to use strings;
/// both are accepted and compared as-is.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(untagged)]
pub enum FileId {
    Int(i64),
    Text(String),
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileId::Int(id) => write!(f, "{id}"),
            FileId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for FileId {
    fn from(id: i64) -> Self {
        FileId::Int(id)
    }
}

impl From<String> for FileId {
    fn from(id: String) -> Self {
        FileId::Text(id)
    }
}

impl From<&str> for FileId {
    fn from(id: &str) -> Self {
        FileId::Text(id.to_string())
    }
}

impl FileId {
    /// Parse an identifier received as text, preferring the integer form.
    pub fn parse(raw: &str) -> Self {
        raw.parse::<i64>()
            .map(FileId::Int)
            .unwrap_or_else(|_| FileId::Text(raw.to_string()))
    }
}

/// A file stored in one of the two tiers.
///
/// The visibility is not stored: it is the first segment of `path`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PhysicalFile {
    /// Backend-assigned identifier, immutable after creation.
    pub id: FileId,

    /// Tier whose bucket currently holds the bytes.
    pub storage_tier: StorageTier,

    /// Display name, independent of the object key.
    pub filename: String,

    /// Full object key: `{visibility_prefix}/{suffix}`.
    pub path: String,

    /// When the file becomes eligible for archival. `None` on a HOT file means
    /// it stays hot; always `None` on COLD files.
    pub hot_until: Option<DateTime<Utc>>,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PhysicalFile {
    /// True when the file is HOT and its retention window has passed.
    pub fn is_hot_expired(&self, now: DateTime<Utc>) -> bool {
        self.storage_tier == StorageTier::Hot && self.hot_until.is_some_and(|until| until <= now)
    }
}

/// Fields required to create a record.
#[derive(Clone, Debug, PartialEq)]
pub struct NewPhysicalFile {
    pub storage_tier: StorageTier,
    pub filename: String,
    pub path: String,
    pub hot_until: Option<DateTime<Utc>>,
}

/// Partial update of a record. `None` leaves a field untouched; for
/// `hot_until`, `Some(None)` clears it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileUpdate {
    pub storage_tier: Option<StorageTier>,
    pub path: Option<String>,
    pub hot_until: Option<Option<DateTime<Utc>>>,
}

impl FileUpdate {
    /// Apply the update onto an in-memory record.
    pub fn apply_to(&self, file: &mut PhysicalFile) {
        if let Some(tier) = self.storage_tier {
            file.storage_tier = tier;
        }
        if let Some(path) = &self.path {
            file.path = path.clone();
        }
        if let Some(hot_until) = self.hot_until {
            file.hot_until = hot_until;
        }
    }
}
